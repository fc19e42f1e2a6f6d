//! C3: the dynamic loader. Turns a flash-resident binary plus relocation
//! metadata into an executable image in the arena.

use crate::arena::{Arena, ArenaLayout};
use crate::config;
use crate::error::ErrorCode;
use crate::flash::FlashDriver;
use crate::log_debug;
use crate::symtab::SymPtr;

/// Everything the controller needs to hand the freshly loaded image off to
/// the scheduler: where to start executing, and how the arena was
/// partitioned into heap and stack.
#[derive(Clone, Copy, Debug)]
pub struct LoadedImage {
    pub entry_addr: usize,
    pub layout: ArenaLayout,
}

/// Runs the full load algorithm for the app in `slot`, writing into
/// `arena`. `sym` is the opaque host pointer installed at step 5.
pub fn load(flash: &dyn FlashDriver, slot: u8, arena: &mut Arena, sym: SymPtr) -> Result<LoadedImage, ErrorCode> {
    // Step 1: header reload. The manifest's cached header may be stale or
    // absent; re-read from flash so the load reflects what's actually there.
    let header = flash.read_header(slot)?;

    let stack_bytes = config::stack_bytes();
    if header.virtual_size as usize + stack_bytes > arena.len() {
        return Err(ErrorCode::ETooBig);
    }

    // Step 2: payload copy. The binary plus its trailing relocation table
    // land at arena offset 0; the table itself starts at offset `app_size`.
    let app_size = header.app_size as usize;
    let reloc_table_len = header.reloc_entries_count as usize * config::WORD_SIZE;
    let total_len = app_size.checked_add(reloc_table_len).ok_or(ErrorCode::ETooBig)?;
    let mut payload = vec![0u8; total_len];
    flash.read_body(slot, total_len, &mut payload)?;
    arena.copy_from_flash(0, &payload)?;

    // Step 3: relocation. Each GOT entry names a word inside the binary
    // holding a module-relative offset; patch it into an absolute address.
    let reloc_table_offset = app_size;
    for i in 0..header.reloc_entries_count as usize {
        let entry_offset = reloc_table_offset + i * config::WORD_SIZE;
        let slot_offset = arena.read_word(entry_offset)? as usize;
        let slot_end = slot_offset.checked_add(config::WORD_SIZE).ok_or(ErrorCode::ERelocation)?;
        if slot_end > app_size {
            return Err(ErrorCode::ERelocation);
        }
        let existing = arena.read_word(slot_offset)?;
        let patched = (arena.base_addr() as u32).wrapping_add(existing);
        arena.patch_word(slot_offset, patched)?;
    }

    // Step 4: BSS zero. This also wipes the now-unneeded relocation table,
    // since it lives inside [app_size, virtual_size) too.
    arena.zero_range(app_size, header.virtual_size as usize)?;

    // Step 5: symbol pointer install. The guest's sole discovery mechanism
    // for host services.
    arena.patch_word(header.sym_table_addr as usize, sym.as_u32())?;

    // Step 6: partition the arena into heap and stack.
    let layout = arena.partition(header.virtual_size as usize)?;

    log_debug!("loaded slot {} ({}): entry=0x{:x}", slot, header.name_str(), header.offset);

    // Step 7 (entry address only; task spawn is the controller's job).
    Ok(LoadedImage { entry_addr: arena.base_addr() + header.offset as usize, layout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockFlash;

    #[test]
    fn relocation_entries_become_absolute_addresses() {
        // GOT entries at 0x100/0x104 become absolute addresses after load.
        let mut flash = MockFlash::new();
        flash.install_app(3, "Simple", 0x400, 0x20, 0x10, &[(0x100, 0x80), (0x104, 0x90)], 0x500);
        let mut arena = Arena::new();
        let base = arena.base_addr() as u32;

        let image = load(&flash, 3, &mut arena, SymPtr::new(0xCAFEBABE)).unwrap();

        assert_eq!(arena.read_word(0x100).unwrap(), base.wrapping_add(0x80));
        assert_eq!(arena.read_word(0x104).unwrap(), base.wrapping_add(0x90));
        assert_eq!(arena.read_range(0x400, 0x500), &[0u8; 0x100]);
        assert_eq!(arena.read_word(0x10).unwrap(), 0xCAFEBABE);
        assert_eq!(image.entry_addr, arena.base_addr() + 0x20);
    }

    #[test]
    fn oversize_image_rejected_before_any_copy() {
        let mut flash = MockFlash::new();
        flash.install_app(1, "Big", 0x10, 0, 0, &[], config::MAX_APP_MEMORY_SIZE as u32);
        let mut arena = Arena::new();
        assert_eq!(load(&flash, 1, &mut arena, SymPtr::new(0)), Err(ErrorCode::ETooBig));
    }

    #[test]
    fn relocation_out_of_bounds_is_rejected() {
        let mut flash = MockFlash::new();
        // GOT entry points past app_size.
        flash.install_app(2, "Bad", 0x10, 0, 0, &[(0x20, 0)], 0x20);
        let mut arena = Arena::new();
        assert_eq!(load(&flash, 2, &mut arena, SymPtr::new(0)), Err(ErrorCode::ERelocation));
    }

    #[test]
    fn missing_slot_yields_eload() {
        let flash = MockFlash::new();
        let mut arena = Arena::new();
        assert_eq!(load(&flash, 9, &mut arena, SymPtr::new(0)), Err(ErrorCode::ELoad));
    }
}
