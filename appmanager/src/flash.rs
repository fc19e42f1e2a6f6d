//! C2: the flash scanner, and the `FlashDriver` contract the real block
//! driver must satisfy.

use crate::error::ErrorCode;
use crate::header::ApplicationHeader;
use crate::manifest::{Application, Manifest};
use crate::{config, log_error};

/// Raw reads of application headers and bodies by slot. Implemented by the
/// flash block driver in a real build; by [`crate::testutil::MockFlash`] in
/// tests.
pub trait FlashDriver: Send + Sync {
    /// Reads and parses the header stored at `slot`. Returns `ELoad` if the
    /// slot can't be read, or if the bytes don't begin with the app magic.
    fn read_header(&self, slot: u8) -> Result<ApplicationHeader, ErrorCode>;

    /// Reads `len` bytes of the slot's body (binary + relocation table)
    /// into `buf`. Returns `ELoad` on a short or failed read.
    fn read_body(&self, slot: u8, len: usize, buf: &mut [u8]) -> Result<(), ErrorCode>;
}

/// Scans slots `0..NUM_FLASH_SLOTS`, appending a `Face`-typed record for
/// every slot whose header parses and whose magic matches.
/// TODO: refine the record's `AppType` from the header's flags field
/// instead of defaulting every flash app to `Face`.
pub fn scan_slots(flash: &dyn FlashDriver, manifest: &mut Manifest) {
    for slot in 0..config::NUM_FLASH_SLOTS as u8 {
        match flash.read_header(slot) {
            Ok(header) => {
                if config::PERFORM_CRC_CHECK && !crc_ok(&header) {
                    log_error!("slot {} failed crc check, skipping", slot);
                    continue;
                }
                manifest.add(Application::from_flash(slot, header));
            }
            Err(_) => continue,
        }
    }
}

/// Placeholder CRC validator: the actual polynomial is board-specific and
/// left unimplemented here. A header's CRC field defaults to zero when a
/// board doesn't stamp one, so only the explicit sentinel value is treated
/// as "known bad."
fn crc_ok(header: &ApplicationHeader) -> bool {
    header.crc != INVALID_CRC_SENTINEL
}

const INVALID_CRC_SENTINEL: u32 = 0xFFFF_FFFF;
