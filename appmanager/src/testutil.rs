//! Test doubles for the RTOS/flash external collaborators, kept in-tree
//! the way Tock capsules keep theirs under `capsules/core/src/test/`
//! rather than reaching for a mocking crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::config;
use crate::error::ErrorCode;
use crate::header::{ApplicationHeader, COMPANY_LEN, ENCODED_LEN, NAME_LEN};
use crate::flash::FlashDriver;
use crate::task::{GuestAllocator, Priority, Scheduler, TaskHandle};

struct StoredSlot {
    header_bytes: Vec<u8>,
    body: Vec<u8>,
}

/// An in-memory stand-in for the flash block driver.
#[derive(Default)]
pub struct MockFlash {
    slots: HashMap<u8, StoredSlot>,
}

impl MockFlash {
    pub fn new() -> Self {
        MockFlash { slots: HashMap::new() }
    }

    /// Installs a well-formed app at `slot`. `relocs` supplies each GOT
    /// entry as `(slot_offset, existing_value)`; the trailing relocation
    /// table is synthesized from it.
    pub fn install_app(
        &mut self,
        slot: u8,
        name: &str,
        app_size: u32,
        offset: u32,
        sym_table_addr: u32,
        relocs: &[(u32, u32)],
        virtual_size: u32,
    ) {
        let mut header = vec![0u8; ENCODED_LEN];
        header[0..6].copy_from_slice(config::APP_HEADER_MAGIC);
        header[6] = 1;
        header[7] = 0;
        header[8] = 1;
        header[9] = 0;
        header[10..14].copy_from_slice(&app_size.to_le_bytes());
        header[14..18].copy_from_slice(&offset.to_le_bytes());
        header[18..22].copy_from_slice(&0u32.to_le_bytes()); // crc (none by default)
        let name_off = 22;
        let name_bytes = name.as_bytes();
        let n = name_bytes.len().min(NAME_LEN - 1);
        header[name_off..name_off + n].copy_from_slice(&name_bytes[..n]);
        let company_off = name_off + NAME_LEN;
        let after_company = company_off + COMPANY_LEN;
        header[after_company..after_company + 2].copy_from_slice(&0u16.to_le_bytes());
        header[after_company + 2..after_company + 6].copy_from_slice(&sym_table_addr.to_le_bytes());
        header[after_company + 6..after_company + 10].copy_from_slice(&0u32.to_le_bytes());
        header[after_company + 10..after_company + 14].copy_from_slice(&(relocs.len() as u32).to_le_bytes());
        header[after_company + 14..after_company + 18].copy_from_slice(&virtual_size.to_le_bytes());

        let mut body = vec![0u8; app_size as usize];
        for (slot_offset, existing) in relocs {
            let o = *slot_offset as usize;
            body[o..o + 4].copy_from_slice(&existing.to_le_bytes());
        }
        for (slot_offset, _existing) in relocs {
            body.extend_from_slice(&slot_offset.to_le_bytes());
        }

        self.slots.insert(slot, StoredSlot { header_bytes: header, body });
    }

    pub fn install_garbage(&mut self, slot: u8) {
        self.slots.insert(slot, StoredSlot { header_bytes: vec![0xFFu8; ENCODED_LEN], body: Vec::new() });
    }

    /// Flips a previously installed app's CRC to a sentinel the scanner
    /// treats as definitely invalid.
    pub fn corrupt_crc(&mut self, slot: u8) {
        if let Some(s) = self.slots.get_mut(&slot) {
            s.header_bytes[18..22].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        }
    }
}

impl FlashDriver for MockFlash {
    fn read_header(&self, slot: u8) -> Result<ApplicationHeader, ErrorCode> {
        let stored = self.slots.get(&slot).ok_or(ErrorCode::ELoad)?;
        ApplicationHeader::parse(&stored.header_bytes)
    }

    fn read_body(&self, slot: u8, len: usize, buf: &mut [u8]) -> Result<(), ErrorCode> {
        let stored = self.slots.get(&slot).ok_or(ErrorCode::ELoad)?;
        if stored.body.len() < len || buf.len() < len {
            return Err(ErrorCode::ELoad);
        }
        buf[..len].copy_from_slice(&stored.body[..len]);
        Ok(())
    }
}

/// A liveness-tracked handle to a real OS thread standing in for a
/// preemptive task. Can't truly be force-killed (std has no such API) —
/// `delete` just flips the flag the controller consults. Real force-delete
/// has the same blind spot: it never runs guest teardown, so whatever the
/// guest was holding leaks.
pub struct MockHandle {
    id: usize,
    alive: std::sync::Arc<AtomicBool>,
    join: Option<std::thread::JoinHandle<()>>,
}

impl TaskHandle for MockHandle {
    fn id(&self) -> usize {
        self.id
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        // Detach rather than join: a force-deleted guest is not waited on.
        if let Some(join) = self.join.take() {
            drop(join);
        }
    }
}

pub struct MockScheduler {
    next_id: AtomicUsize,
}

impl MockScheduler {
    pub fn new() -> Self {
        MockScheduler { next_id: AtomicUsize::new(1) }
    }
}

impl Scheduler for MockScheduler {
    type Handle = MockHandle;

    fn spawn(&self, name: &str, _priority: Priority, body: Box<dyn FnOnce() + Send>) -> MockHandle {
        let alive = std::sync::Arc::new(AtomicBool::new(true));
        let alive2 = alive.clone();
        let join = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                body();
                alive2.store(false, Ordering::SeqCst);
            })
            .expect("spawn guest task thread");
        MockHandle { id: self.next_id.fetch_add(1, Ordering::SeqCst), alive, join: Some(join) }
    }

    fn delete(&self, handle: &MockHandle) {
        handle.alive.store(false, Ordering::SeqCst);
    }
}

/// Records the last heap range it was asked to initialize, so tests can
/// assert the loader handed it the right partition.
#[derive(Default)]
pub struct MockGuestAllocator {
    last_init: Mutex<Option<(usize, usize)>>,
}

impl MockGuestAllocator {
    pub fn new() -> Self {
        MockGuestAllocator::default()
    }

    pub fn last_init(&self) -> Option<(usize, usize)> {
        *self.last_init.lock().unwrap()
    }
}

impl GuestAllocator for MockGuestAllocator {
    fn init_heap(&self, start: usize, size: usize) {
        *self.last_init.lock().unwrap() = Some((start, size));
    }
}
