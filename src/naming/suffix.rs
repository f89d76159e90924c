//! Suffix selection for the next run in a name family.

use serde::{Deserialize, Serialize};

use super::NameDiagnostic;
use crate::tracker::TaskRecord;

/// How the next numeric suffix is derived from the existing records.
///
/// Either way, a trailing segment that is an integer too large for `u64`
/// saturates, and a negative one contributes nothing above the count floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixStrategy {
    /// Trust the service's ordering: parse the suffix of the last record
    /// returned and add one.
    #[default]
    LastRecord,
    /// Parse every record's suffix and add one to the largest.
    HighestSuffix,
}

/// Segment after the final `/`, or the whole name when there is none.
pub(super) fn trailing_segment(name: &str) -> &str {
    name.rsplit_once('/').map_or(name, |(_, segment)| segment)
}

/// One past the integer in `name`'s trailing segment, clamped to `u64`.
///
/// An optionally signed run of ASCII digits of any length counts as an
/// integer. Negatives step to 0 (or 1 for `-0`); values past `u64::MAX`
/// saturate.
fn successor(name: &str) -> Option<u64> {
    let segment = trailing_segment(name);
    let (negative, digits) = match segment.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, segment.strip_prefix('+').unwrap_or(segment)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if negative {
        return Some(u64::from(digits.bytes().all(|b| b == b'0')));
    }
    Some(digits.parse::<u64>().map_or(u64::MAX, |n| n.saturating_add(1)))
}

fn unparsable(record: &TaskRecord) -> NameDiagnostic {
    NameDiagnostic::UnparsableSuffix {
        last_name: record.name().to_string(),
        segment: trailing_segment(record.name()).to_string(),
    }
}

/// Pick the suffix for a family with at least one existing record.
///
/// The result is never below the number of existing records.
pub(super) fn next_suffix(
    existing: &[TaskRecord],
    strategy: SuffixStrategy,
) -> (u64, Option<NameDiagnostic>) {
    let count = existing.len() as u64;
    let (suffix, diagnostic) = match (strategy, existing) {
        (_, []) => (1, None),
        (SuffixStrategy::LastRecord, [_]) => (1, None),
        (SuffixStrategy::LastRecord, [.., last]) => match successor(last.name()) {
            Some(n) => (n, None),
            None => (1, Some(unparsable(last))),
        },
        (SuffixStrategy::HighestSuffix, [.., last]) => {
            match existing.iter().filter_map(|r| successor(r.name())).max() {
                Some(n) => (n, None),
                None if existing.len() > 1 => (1, Some(unparsable(last))),
                None => (1, None),
            }
        }
    };
    (count.max(suffix), diagnostic)
}
