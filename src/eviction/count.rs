//! Count-based LRU: every resident entry weighs one.
//!
//! The limit is a maximum number of entries. For a partitioned region it is
//! the number of entries allowed across the primary buckets and redundant
//! copies hosted by this member.

use crate::eviction::action::EvictionAction;
use crate::eviction::value::EntryValue;

/// Entries allowed when no limit is configured.
pub const DEFAULT_MAXIMUM_ENTRIES: i64 = 900;

pub(crate) const LIMIT_STAT: &str = "entriesAllowed";
pub(crate) const COUNT_STAT: &str = "entryCount";

/// Weight of one entry under count-based accounting.
///
/// Removed markers weigh nothing so a resurrected entry is accounted as new.
/// Under overflow, a value that was spilled to disk weighs nothing because
/// only its key is still resident.
pub fn entry_size(value: &EntryValue<'_>, action: EvictionAction) -> i64 {
    if value.is_removed() {
        return 0;
    }
    if value.is_absent_or_invalid() && action.is_overflow_to_disk() {
        return 0;
    }
    1
}
