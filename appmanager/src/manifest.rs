//! C1: the manifest registry. Implemented with a `Vec` rather than a literal
//! linked list: the records are append-only and never removed, and nothing
//! holds a reference across a mutation, so an index-based representation
//! sidesteps self-referential-struct pain in safe Rust for no behavioral
//! cost.

use crate::header::ApplicationHeader;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppType {
    System,
    Face,
    WatchApp,
}

/// A direct, host-linked entry point for an internal app. Takes the guest's
/// event-message queue and its own type (System apps skip the select-button
/// install in the pump).
pub type EntryFn = fn(&crate::queue::MsgQueue, AppType);

#[derive(Clone)]
pub struct Application {
    pub name: String,
    pub kind: AppType,
    pub entry: Option<EntryFn>,
    pub is_internal: bool,
    pub slot_id: u8,
    pub header: Option<ApplicationHeader>,
}

impl Application {
    pub fn internal(name: &str, kind: AppType, entry: EntryFn) -> Self {
        Application {
            name: String::from(name),
            kind,
            entry: Some(entry),
            is_internal: true,
            slot_id: 0,
            header: None,
        }
    }

    pub fn from_flash(slot_id: u8, header: ApplicationHeader) -> Self {
        Application {
            name: String::from(header.name_str()),
            kind: AppType::Face,
            entry: None,
            is_internal: false,
            slot_id,
            header: Some(header),
        }
    }
}

/// Append-only, insertion-ordered collection of [`Application`] records.
#[derive(Default)]
pub struct Manifest {
    records: Vec<Application>,
}

impl Manifest {
    pub fn new() -> Self {
        Manifest { records: Vec::new() }
    }

    /// Appends to the tail. Duplicate names are not rejected; first match
    /// wins on lookup.
    pub fn add(&mut self, record: Application) {
        self.records.push(record);
    }

    /// Linear scan, matching when the *stored* name is a prefix of the
    /// query of equal stored-length. This is a known quirk, not a full
    /// substring match — kept because switching to exact-match-only would
    /// silently change which app a short, ambiguous name resolves to.
    pub fn lookup(&self, name: &str) -> Option<&Application> {
        self.records.iter().find(|r| {
            let stored = r.name.as_str();
            name.len() >= stored.len() && &name[..stored.len()] == stored
        })
    }

    pub fn head(&self) -> Option<&Application> {
        self.records.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.records.iter()
    }
}
