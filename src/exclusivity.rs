//! Exclusivity builder
//!
//! Turns a priority-ordered list of `(condition expression, value)`
//! entries for one style property into entries whose conditions are
//! mutually exclusive: each entry's condition is ANDed with the negation
//! of every higher-priority entry's condition, so at most one entry can
//! match any runtime state. Entries whose exclusive condition simplifies
//! to `false` are unreachable and dropped entirely - this is how
//! `hovered & !hovered` disappears, and how a specific condition strictly
//! implied by a more general higher-priority one is eliminated without
//! manual `:not()` boilerplate.

use crate::condition::Condition;

/// One surviving entry. Created here, consumed once by handler grouping,
/// then discarded.
#[derive(Debug, Clone)]
pub struct ExclusiveStyleEntry {
    /// The original condition expression text.
    pub state_key: String,
    /// The entry's own parsed (and simplified) condition.
    pub condition: Condition,
    /// The condition under which this entry, and no higher-priority one,
    /// applies.
    pub exclusive_condition: Condition,
    pub value: String,
}

/// Build exclusive entries. Input is in ascending declaration priority
/// (the unconditional `''` entry first by convention; later entries
/// override earlier ones). Output preserves the original ascending order
/// of the surviving entries. Duplicate keys resolve last-write-wins, at
/// the position of the first occurrence.
pub fn build_exclusive<P, S>(
    entries: &[(String, String)],
    mut parse: P,
    mut simplify: S,
) -> Vec<ExclusiveStyleEntry>
where
    P: FnMut(&str) -> Condition,
    S: FnMut(&Condition) -> Condition,
{
    let mut ordered: Vec<(String, String)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        match ordered.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.clone(),
            None => ordered.push((key.clone(), value.clone())),
        }
    }

    // Work in descending priority: the last-declared entry wins when
    // several conditions hold at once.
    ordered.reverse();

    let parsed: Vec<(String, String, Condition)> = ordered
        .into_iter()
        .map(|(key, value)| {
            let condition = simplify(&parse(&key));
            (key, value, condition)
        })
        .collect();

    let mut result: Vec<ExclusiveStyleEntry> = Vec::with_capacity(parsed.len());
    for (i, (key, value, condition)) in parsed.iter().enumerate() {
        let mut operands = vec![condition.clone()];
        for (_, _, stronger) in parsed.iter().take(i) {
            // A higher-priority condition already known to be false
            // contributes nothing to exclusivity.
            if !stronger.is_false() {
                operands.push(stronger.clone().not());
            }
        }
        let exclusive = simplify(&Condition::and(operands));
        if exclusive.is_false() {
            log::debug!("dropping unreachable style entry '{}'", key);
            continue;
        }
        result.push(ExclusiveStyleEntry {
            state_key: key.clone(),
            condition: condition.clone(),
            exclusive_condition: exclusive,
            value: value.clone(),
        });
    }

    // Back to declaration order for stable output.
    result.reverse();
    result
}
