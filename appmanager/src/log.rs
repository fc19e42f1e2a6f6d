//! Minimal level-gated logging: a global level check guarding a
//! `println!`-style macro, rather than pulling in a logging crate. The
//! kernel proper never has an allocator or a terminal to write to; this
//! hosted crate does, so the sink is `eprintln!`.

use core::sync::atomic::{AtomicU8, Ordering};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    None = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn log_level() -> u8 {
    LOG_LEVEL.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! log {
    ($lvl:expr, $($x:expr),*) => {{
        if ($lvl as u8) <= $crate::log::log_level() {
            eprintln!("APPMGR {:?}: {}", $lvl, format!($($x),*));
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($x:expr),*) => { $crate::log!($crate::log::LogLevel::Error, $($x),*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($x:expr),*) => { $crate::log!($crate::log::LogLevel::Warn, $($x),*) };
}

#[macro_export]
macro_rules! log_info {
    ($($x:expr),*) => { $crate::log!($crate::log::LogLevel::Info, $($x),*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($x:expr),*) => { $crate::log!($crate::log::LogLevel::Debug, $($x),*) };
}
