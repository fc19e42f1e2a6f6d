//! C4: the lifecycle controller. Serializes start/quit, owns the single
//! guest-task handle, and drains stale events on every transition.

use std::sync::{Arc, Mutex};

use crate::arena::Arena;
use crate::config;
use crate::error::ErrorCode;
use crate::flash::FlashDriver;
use crate::manifest::{Application, Manifest};
use crate::pump;
use crate::queue::{BoundedQueue, Msg, MsgQueue};
use crate::symtab::SymPtr;
use crate::task::{GuestAllocator, Priority, Scheduler, TaskHandle};
use crate::{log_error, log_info, log_warn};

/// Owns the process-wide singletons: the running-app pointer and the
/// arena, behind a controller object with lifecycle `init -> running ...`
/// that is never re-initialized.
pub struct Controller<S: Scheduler, A: GuestAllocator> {
    manifest: Manifest,
    flash: Box<dyn FlashDriver>,
    arena: Mutex<Arena>,
    sym: SymPtr,
    scheduler: S,
    guest_alloc: A,
    thread_q: BoundedQueue<String>,
    msg_q: Arc<MsgQueue>,
    guest_task: Mutex<Option<S::Handle>>,
    running_app: Mutex<Option<String>>,
}

impl<S: Scheduler, A: GuestAllocator> Controller<S, A> {
    pub fn new(manifest: Manifest, flash: Box<dyn FlashDriver>, scheduler: S, guest_alloc: A, sym: SymPtr) -> Self {
        Controller {
            manifest,
            flash,
            arena: Mutex::new(Arena::new()),
            sym,
            scheduler,
            guest_alloc,
            thread_q: BoundedQueue::new(config::THREAD_Q_CAPACITY),
            msg_q: Arc::new(BoundedQueue::new(config::MSG_Q_CAPACITY)),
            guest_task: Mutex::new(None),
            running_app: Mutex::new(None),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn running_app_name(&self) -> Option<String> {
        self.running_app.lock().unwrap().clone()
    }

    pub fn has_guest_task(&self) -> bool {
        self.guest_task.lock().unwrap().as_ref().is_some_and(|h| h.is_alive())
    }

    pub fn msg_queue(&self) -> Arc<MsgQueue> {
        self.msg_q.clone()
    }

    /// Requests a switch to `name`. Asks the currently-running guest to
    /// quit, then hands the request to the controller task. There is a
    /// known partial-failure window here: the quit and the start travel on
    /// different queues, so the controller task may observe the new start
    /// before the old guest drains its quit; the controller's unconditional
    /// force-delete on transition (step 4 of `process_one_start`) covers
    /// that race instead of this method joining on it.
    pub fn start(&self, name: &str) {
        if self.msg_q.send_timeout(Msg::Quit, config::QUIT_TIMEOUT).is_err() {
            log_warn!("EFULL: start({}) couldn't enqueue quit for the running guest", name);
        }
        if self.thread_q.send_timeout(name.to_string(), config::START_TIMEOUT).is_err() {
            log_error!("EFULL: start({}) dropped, thread_q full", name);
        }
    }

    /// Asks the running guest to quit without starting anything new.
    pub fn quit(&self) -> Result<(), ErrorCode> {
        self.msg_q.send_timeout(Msg::Quit, config::QUIT_TIMEOUT)
    }

    /// Posts a recognized gesture from the window subsystem.
    pub fn post_button(&self, callback: crate::queue::ButtonCallback, clickref: usize, context: usize) -> Result<(), ErrorCode> {
        self.msg_q.send_timeout(Msg::Button { callback, clickref, context }, config::QUIT_TIMEOUT)
    }

    /// ISR-safe tick post. Never suspends; writes whether the send woke a
    /// waiter into the return value instead of blocking.
    pub fn post_tick(&self, callback: crate::queue::TickCallback, tick_time: u64, tick_units: u32) -> bool {
        self.msg_q.try_send(Msg::Tick { callback, tick_time, tick_units }).is_ok()
    }

    /// The controller task's body. Runs forever; call this on a dedicated
    /// task/thread.
    pub fn run_forever(&self) {
        loop {
            self.process_one_start();
        }
    }

    /// One iteration of the controller task loop, exposed separately so
    /// tests can drive it deterministically instead of racing a background
    /// thread.
    pub fn process_one_start(&self) {
        let name = self.thread_q.recv_blocking();
        self.msg_q.drain();

        let record = match self.manifest.lookup(&name) {
            Some(r) => r.clone(),
            None => {
                log_error!("{}", ErrorCode::ENoApp);
                return;
            }
        };

        *self.running_app.lock().unwrap() = Some(record.name.clone());

        if let Some(handle) = self.guest_task.lock().unwrap().take() {
            self.scheduler.delete(&handle);
            log_info!("force-deleted stale guest task for {}", name);
        }

        let spawned = if record.is_internal { self.spawn_internal(&record) } else { self.spawn_flash(&record) };

        match spawned {
            Ok(handle) => *self.guest_task.lock().unwrap() = Some(handle),
            Err(e) => log_error!("start({}) failed: {}", name, e),
        }
    }

    fn spawn_internal(&self, record: &Application) -> Result<S::Handle, ErrorCode> {
        let stack_bytes = config::stack_bytes();
        self.guest_alloc.init_heap(0, config::MAX_APP_MEMORY_SIZE - stack_bytes);
        let entry = record.entry.ok_or(ErrorCode::ELoad)?;
        let msg_q = self.msg_q.clone();
        let kind = record.kind;
        let body: Box<dyn FnOnce() + Send> = Box::new(move || entry(&msg_q, kind));
        Ok(self.scheduler.spawn(&record.name, Priority::IdlePlus6, body))
    }

    fn spawn_flash(&self, record: &Application) -> Result<S::Handle, ErrorCode> {
        let mut arena = self.arena.lock().unwrap();
        let image = crate::loader::load(self.flash.as_ref(), record.slot_id, &mut arena, self.sym)?;
        self.guest_alloc.init_heap(image.layout.heap_start, image.layout.heap_size);

        let msg_q = self.msg_q.clone();
        let kind = record.kind;
        let entry_addr = image.entry_addr;
        let name = record.name.clone();
        // The loaded binary isn't real executable code in this hosted
        // crate; the "jump to entry_addr" that a real arch-specific
        // trampoline performs is simulated by directly entering the event
        // pump, exactly as a guest's real `main` would as the first thing
        // it runs.
        let body: Box<dyn FnOnce() + Send> = Box::new(move || {
            crate::log_debug!("guest {} entered at 0x{:x}", name, entry_addr);
            pump::run(&msg_q, kind);
        });
        Ok(self.scheduler.spawn(&record.name, Priority::IdlePlus6, body))
    }
}
