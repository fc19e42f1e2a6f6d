//! Error kinds, value-returned everywhere: the core never panics or unwinds
//! on a guest or flash input.

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// Requested app name is not in the manifest.
    ENoApp,
    /// Flash read failed (header unreadable, or body read short).
    ELoad,
    /// Loaded image would overflow the arena.
    ETooBig,
    /// A relocation entry names a word outside the binary payload.
    ERelocation,
    /// A bounded queue send timed out.
    EFull,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ENoApp => "ENOAPP: app not found in manifest",
            ErrorCode::ELoad => "ELOAD: flash read failed",
            ErrorCode::ETooBig => "ETOOBIG: image would overflow arena",
            ErrorCode::ERelocation => "ERELOC: relocation entry out of bounds",
            ErrorCode::EFull => "EFULL: queue send timed out",
        };
        f.write_str(s)
    }
}
