//! C5: the event pump. Runs as the first code of every guest `main`,
//! whether that guest is an internal app's host-linked entry function or a
//! loaded flash app's simulated entry (see `controller::spawn_flash`).

use crate::config;
use crate::manifest::AppType;
use crate::queue::{Msg, MsgQueue};
use crate::log_debug;

/// The reserved `clickref` the window subsystem resolves the hardware
/// select button to. Distinct from any clickref an app registers for its
/// own buttons.
pub const SELECT_BUTTON_CLICKREF: usize = usize::MAX;

/// Whether `run` installs the select-button handler for `kind`: every app
/// except `SYSTEM`, which has no menu above it to return to.
pub fn select_button_installed(kind: AppType) -> bool {
    kind != AppType::System
}

/// Installs window-load hooks, click config, and — for any app that isn't
/// `SYSTEM` — a select-button handler that returns to the system menu.
/// Then receives from `msg_q` with a bounded wait until `APP_QUIT` arrives.
///
/// Callbacks run inline on the calling task: the pump is cooperative by
/// design and blocks further events until a callback returns.
pub fn run(msg_q: &MsgQueue, kind: AppType) {
    let select_button_installed = select_button_installed(kind);
    if select_button_installed {
        log_debug!("select-button handler installed (return to system menu)");
    }

    loop {
        match msg_q.recv_timeout(config::PUMP_RECV_TIMEOUT) {
            Some(Msg::Button { callback, clickref, context }) => {
                if select_button_installed && clickref == SELECT_BUTTON_CLICKREF {
                    log_debug!("select button pressed; returning to system menu");
                    return;
                }
                callback(clickref, context);
            }
            Some(Msg::Tick { callback, tick_time, tick_units }) => callback(tick_time, tick_units),
            Some(Msg::Quit) => {
                log_debug!("APP_QUIT received; unsubscribing and exiting");
                return;
            }
            None => continue,
        }
    }
}
