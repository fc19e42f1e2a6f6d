//! End-to-end lifecycle scenarios driven through the public `Controller`
//! API with the in-tree test doubles: internal-app start, switching apps
//! via a button handler, loading from flash, oversize rejection, a missing
//! app, and an ISR tick burst against the bounded event queue. Requires the
//! `testutil` feature (enabled automatically for `cargo test` via this
//! crate's own `[dev-dependencies]` entry).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use appmanager::config;
use appmanager::flash;
use appmanager::pump;
use appmanager::queue::{Msg, MsgQueue};
use appmanager::testutil::{MockFlash, MockGuestAllocator, MockScheduler};
use appmanager::{AppType, Application, Controller, Manifest, SymPtr};

type TestController = Controller<MockScheduler, MockGuestAllocator>;

static SYSTEM_MAIN_HITS: AtomicUsize = AtomicUsize::new(0);
static SIMPLE_MAIN_HITS: AtomicUsize = AtomicUsize::new(0);

fn systemapp_main(q: &MsgQueue, k: AppType) {
    SYSTEM_MAIN_HITS.fetch_add(1, Ordering::SeqCst);
    pump::run(q, k);
}

fn simple_main(q: &MsgQueue, k: AppType) {
    SIMPLE_MAIN_HITS.fetch_add(1, Ordering::SeqCst);
    pump::run(q, k);
}

fn base_manifest() -> Manifest {
    let mut manifest = Manifest::new();
    manifest.add(Application::internal("System", AppType::System, systemapp_main));
    manifest.add(Application::internal("Simple", AppType::Face, simple_main));
    manifest
}

fn controller_with(manifest: Manifest, flash: MockFlash) -> TestController {
    Controller::new(manifest, Box::new(flash), MockScheduler::new(), MockGuestAllocator::new(), SymPtr::new(0xC0FF_EE00))
}

const SETTLE: Duration = Duration::from_millis(60);

#[test]
fn s1_internal_start() {
    let controller = controller_with(base_manifest(), MockFlash::new());
    controller.start("System");
    controller.process_one_start();
    std::thread::sleep(SETTLE);

    assert_eq!(controller.running_app_name().as_deref(), Some("System"));
    assert!(controller.has_guest_task());
    assert!(SYSTEM_MAIN_HITS.load(Ordering::SeqCst) >= 1);

    // SYSTEM has no select-button handler installed: the reserved clickref
    // is just another button press, delivered to the running app's own
    // callback instead of exiting the pump.
    static HITS: AtomicUsize = AtomicUsize::new(0);
    fn count(_clickref: usize, _context: usize) {
        HITS.fetch_add(1, Ordering::SeqCst);
    }
    let before = HITS.load(Ordering::SeqCst);
    controller.post_button(count, pump::SELECT_BUTTON_CLICKREF, 0).unwrap();
    std::thread::sleep(SETTLE);
    assert_eq!(HITS.load(Ordering::SeqCst), before + 1);
    assert!(controller.has_guest_task());
}

#[test]
fn s2_switch_via_button() {
    let before = SIMPLE_MAIN_HITS.load(Ordering::SeqCst);
    // Leaked to get a `'static` address a bare `fn` callback can recover
    // through its `context: usize` parameter — the same void*-context
    // idiom the window subsystem's real click handlers use.
    let controller: &'static TestController = Box::leak(Box::new(controller_with(base_manifest(), MockFlash::new())));

    controller.start("System");
    controller.process_one_start();
    std::thread::sleep(SETTLE);
    assert!(controller.has_guest_task());

    fn switch_to_simple(_clickref: usize, context: usize) {
        let controller = unsafe { &*(context as *const TestController) };
        controller.start("Simple");
    }

    let ctx = controller as *const TestController as usize;
    controller.post_button(switch_to_simple, 0, ctx).unwrap();
    std::thread::sleep(SETTLE);
    // The button handler (running on the System guest task) already called
    // start("Simple") itself; the controller task just needs to notice it.
    controller.process_one_start();
    std::thread::sleep(SETTLE);

    assert_eq!(controller.running_app_name().as_deref(), Some("Simple"));
    assert!(controller.has_guest_task());
    assert!(SIMPLE_MAIN_HITS.load(Ordering::SeqCst) > before);

    // "Simple" is a Face app: the select-button handler is installed, so the
    // reserved clickref exits the pump (back to the system menu) instead of
    // reaching any app-registered callback.
    fn never_called(_clickref: usize, _context: usize) {
        panic!("select-button press should not reach the app's own callback");
    }
    controller.post_button(never_called, pump::SELECT_BUTTON_CLICKREF, 0).unwrap();
    std::thread::sleep(SETTLE);
    assert!(!controller.has_guest_task());
}

#[test]
fn s3_flash_load_through_controller() {
    let mut mock_flash = MockFlash::new();
    mock_flash.install_app(3, "FlashApp", 0x400, 0x20, 0x10, &[(0x100, 0x80), (0x104, 0x90)], 0x500);
    let mut manifest = Manifest::new();
    flash::scan_slots(&mock_flash, &mut manifest);

    let controller = controller_with(manifest, mock_flash);
    controller.start("FlashApp");
    controller.process_one_start();
    std::thread::sleep(SETTLE);

    assert_eq!(controller.running_app_name().as_deref(), Some("FlashApp"));
    assert!(controller.has_guest_task());
}

#[test]
fn s4_oversize_rejection() {
    let mut mock_flash = MockFlash::new();
    mock_flash.install_app(1, "Big", 0x10, 0, 0, &[], config::MAX_APP_MEMORY_SIZE as u32);
    let mut manifest = base_manifest();
    flash::scan_slots(&mock_flash, &mut manifest);

    let controller = controller_with(manifest, mock_flash);
    controller.start("System");
    controller.process_one_start();
    std::thread::sleep(SETTLE);
    assert!(controller.has_guest_task());

    controller.start("Big");
    controller.process_one_start();
    std::thread::sleep(SETTLE);

    // ETOOBIG: no task spawned. `Big`'s record was found (step 2) and the
    // running-app pointer set (step 3) before the loader rejected it at
    // step 6 — see DESIGN.md for why the pointer still moves here.
    assert_eq!(controller.running_app_name().as_deref(), Some("Big"));
    assert!(!controller.has_guest_task());
}

#[test]
fn s5_missing_app() {
    let controller = controller_with(base_manifest(), MockFlash::new());
    controller.start("System");
    controller.process_one_start();
    std::thread::sleep(SETTLE);
    assert!(controller.has_guest_task());

    controller.start("NoSuch");
    controller.process_one_start();
    std::thread::sleep(SETTLE);

    // ENOAPP short-circuits before step 3: the pointer is left exactly
    // where it was.
    assert_eq!(controller.running_app_name().as_deref(), Some("System"));

    // The system recovers on the next successful start.
    controller.start("Simple");
    controller.process_one_start();
    std::thread::sleep(SETTLE);
    assert_eq!(controller.running_app_name().as_deref(), Some("Simple"));
    assert!(controller.has_guest_task());
}

#[test]
fn s6_isr_tick_burst() {
    static HITS: AtomicUsize = AtomicUsize::new(0);
    fn count_tick(_tick_time: u64, _tick_units: u32) {
        HITS.fetch_add(1, Ordering::SeqCst);
    }
    fn noop_button(_clickref: usize, _context: usize) {}

    // A hand-rolled guest main (standing in for the app's own code) that
    // blocks for 300ms on its first button callback, simulating the "busy
    // in a callback" window the scenario describes.
    fn busy_main(q: &MsgQueue, _k: AppType) {
        loop {
            match q.recv_timeout(Duration::from_secs(2)) {
                Some(Msg::Button { callback, clickref, context }) => {
                    std::thread::sleep(Duration::from_millis(300));
                    callback(clickref, context);
                }
                Some(Msg::Tick { callback, tick_time, tick_units }) => callback(tick_time, tick_units),
                Some(Msg::Quit) => return,
                None => continue,
            }
        }
    }

    let mut manifest = Manifest::new();
    manifest.add(Application::internal("Busy", AppType::Face, busy_main));
    let controller = controller_with(manifest, MockFlash::new());
    controller.start("Busy");
    controller.process_one_start();
    std::thread::sleep(SETTLE);

    controller.post_button(noop_button, 0, 0).unwrap();
    std::thread::sleep(Duration::from_millis(20)); // let the guest enter its busy window

    let mut accepted = 0;
    for i in 0..10u64 {
        if controller.post_tick(count_tick, i, 0) {
            accepted += 1;
        }
    }
    assert_eq!(accepted, config::MSG_Q_CAPACITY);

    std::thread::sleep(Duration::from_millis(600));
    assert_eq!(HITS.load(Ordering::SeqCst), config::MSG_Q_CAPACITY);
}
