//! Compile-time configuration, mirroring the role of `kernel/src/config.rs`:
//! constants a board would otherwise need to patch by hand.

use core::time::Duration;

/// Total size, in bytes, of the single process-wide arena. Must be a
/// multiple of [`WORD_SIZE`].
pub const MAX_APP_MEMORY_SIZE: usize = 64 * 1024;

/// Number of words reserved for the guest stack at the top of the arena.
pub const MAX_APP_STACK_SIZE: usize = 512;

/// Bytes per word on the target ABI (32-bit pointers, per the header's
/// little-endian 32-bit fields).
pub const WORD_SIZE: usize = 4;

/// Number of flash slots the scanner enumerates, inclusive range `0..NUM_FLASH_SLOTS`.
pub const NUM_FLASH_SLOTS: usize = 32;

/// Magic string every valid application header must begin with.
pub const APP_HEADER_MAGIC: &[u8; 6] = b"PBLAPP";

/// Capacity of the controller's start-request queue.
pub const THREAD_Q_CAPACITY: usize = 1;

/// Capacity of the UI event queue delivered to the running guest.
pub const MSG_Q_CAPACITY: usize = 5;

/// Send timeout for `start()`'s enqueue onto `thread_q`.
pub const START_TIMEOUT: Duration = Duration::from_millis(100);

/// Send timeout for `quit()` (and button/start-embedded quit) onto `msg_q`.
pub const QUIT_TIMEOUT: Duration = Duration::from_millis(10);

/// Bounded receive timeout the guest task blocks on inside the event pump.
pub const PUMP_RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// Whether the loader verifies the header's CRC before accepting a slot.
/// Defaults to `true`; a board without a stamped CRC can flip this off.
pub const PERFORM_CRC_CHECK: bool = true;

pub const fn stack_bytes() -> usize {
    MAX_APP_STACK_SIZE * WORD_SIZE
}
