//! Merging of the same event reported by several calendars.
//!
//! Shared calendars often show up under more than one source. Events with the
//! same title and the same encoded start are treated as one, and the copy from
//! the highest-priority calendar (earliest in the configured list) wins.

use std::collections::HashMap;

use crate::event::NormalizedEvent;

/// Priority of a calendar: its position in `priority_order`, or `usize::MAX`
/// for calendars not listed.
pub fn priority_index(calendar_id: &str, priority_order: &[String]) -> usize {
    priority_order
        .iter()
        .position(|id| id == calendar_id)
        .unwrap_or(usize::MAX)
}

fn dedupe_key(event: &NormalizedEvent) -> (String, String) {
    (event.title.clone(), event.start.clone())
}

/// Keep one event per `(title, start)`.
///
/// A later duplicate replaces the kept one only if its calendar has a strictly
/// smaller priority index, so ties keep the first seen. Output follows the
/// order in which each key was first seen; it is not re-sorted.
pub fn dedupe(events: Vec<NormalizedEvent>, priority_order: &[String]) -> Vec<NormalizedEvent> {
    let mut slots: Vec<NormalizedEvent> = Vec::with_capacity(events.len());
    let mut seen: HashMap<(String, String), usize> = HashMap::with_capacity(events.len());

    for event in events {
        let key = dedupe_key(&event);
        match seen.get(&key) {
            Some(&slot) => {
                let kept = priority_index(&slots[slot].calendar_id, priority_order);
                let candidate = priority_index(&event.calendar_id, priority_order);
                if candidate < kept {
                    slots[slot] = event;
                }
            }
            None => {
                seen.insert(key, slots.len());
                slots.push(event);
            }
        }
    }

    slots
}
