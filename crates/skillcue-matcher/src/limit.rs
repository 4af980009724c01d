//! At-most-N selection under a critical floor.

use crate::types::Ranked;
use skillcue_types::Priority;

/// Keep every critical match, then fill the remaining
/// `max_suggestions - critical_count` slots from the non-critical matches in
/// their existing order. Input is expected to be ranked already.
pub fn limit_matches<T: Ranked>(matches: Vec<T>, max_suggestions: usize) -> Vec<T> {
    let (critical, rest): (Vec<T>, Vec<T>) = matches
        .into_iter()
        .partition(|m| m.priority() == Priority::Critical);

    let slots = max_suggestions.saturating_sub(critical.len());
    let dropped = rest.len().saturating_sub(slots);
    if dropped > 0 {
        tracing::debug!("Dropping {dropped} match(es) beyond max_suggestions={max_suggestions}");
    }

    critical
        .into_iter()
        .chain(rest.into_iter().take(slots))
        .collect()
}
