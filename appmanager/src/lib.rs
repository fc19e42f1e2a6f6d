// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Application manager for a smartwatch-class embedded OS: discovers
//! installed apps in flash, dynamically loads and relocates a
//! position-independent binary into a fixed RAM arena, spawns it as a
//! preemptively-scheduled task, dispatches UI events to it, and tears it
//! down on request.
//!
//! Five pieces: the manifest registry (`manifest`), the flash scanner
//! (`flash`), the dynamic loader (`loader`), the lifecycle controller
//! (`controller`), and the guest-side event pump (`pump`).

pub mod log;

pub mod arena;
pub mod config;
pub mod controller;
pub mod error;
pub mod flash;
pub mod header;
pub mod loader;
pub mod manifest;
pub mod pump;
pub mod queue;
pub mod symtab;
pub mod task;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use controller::Controller;
pub use error::ErrorCode;
pub use manifest::{AppType, Application, Manifest};
pub use symtab::SymPtr;
