//! The logical state of a region entry's value, as seen by capacity accounting.

/// How the storage engine describes a value when asking for its weight.
///
/// Only `Live` carries data. The removed markers (`Destroyed`,
/// `RemovedPhase1`, `RemovedPhase2`, `Tombstone`) stay in the entry map for
/// version reconciliation but never take part in capacity accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryValue<'a> {
    /// Resident value bytes.
    Live(&'a [u8]),
    /// No resident value; under overflow this is a value spilled to disk.
    Absent,
    Invalid,
    LocalInvalid,
    Destroyed,
    RemovedPhase1,
    RemovedPhase2,
    Tombstone,
}

impl<'a> EntryValue<'a> {
    /// Whether this is one of the removed markers.
    pub fn is_removed(&self) -> bool {
        matches!(
            self,
            EntryValue::Destroyed
                | EntryValue::RemovedPhase1
                | EntryValue::RemovedPhase2
                | EntryValue::Tombstone
        )
    }

    /// Whether the entry has no resident value without having been removed.
    pub fn is_absent_or_invalid(&self) -> bool {
        matches!(
            self,
            EntryValue::Absent | EntryValue::Invalid | EntryValue::LocalInvalid
        )
    }

    /// Resident value bytes, if any.
    pub fn live_bytes(&self) -> Option<&'a [u8]> {
        match self {
            EntryValue::Live(bytes) => Some(bytes),
            _ => None,
        }
    }
}
