use std::collections::{BTreeSet, HashMap};

use crate::model::*;

use super::conflict::is_free;

// ── Aggregation ───────────────────────────────────────────────────

/// Count, per distinct slot start, how many eligible managers are free.
///
/// Candidate instants are the distinct starts of every slot passed in, booked
/// or not. Each manager is judged only on its own slots and counted at most
/// once per instant. Instants nobody is free at are left out; the rest come
/// back in ascending order.
pub fn aggregate(eligible: &[SalesManager], slots: &[Slot]) -> Vec<AvailabilityEntry> {
    if eligible.is_empty() {
        return Vec::new();
    }

    let instants: BTreeSet<Ms> = slots.iter().map(|s| s.span.start).collect();
    let by_manager = slots_by_manager(slots);
    let managers: BTreeSet<i64> = eligible.iter().map(|m| m.id).collect();

    let mut result = Vec::new();
    for &start in &instants {
        let count = managers
            .iter()
            .filter(|&&id| {
                by_manager
                    .get(&id)
                    .is_some_and(|own| is_free(own, start))
            })
            .count();
        if count > 0 {
            result.push(AvailabilityEntry::new(start, count as u32));
        }
    }
    result
}

fn slots_by_manager(slots: &[Slot]) -> HashMap<i64, Vec<&Slot>> {
    let mut out: HashMap<i64, Vec<&Slot>> = HashMap::new();
    for slot in slots {
        out.entry(slot.sales_manager_id).or_default().push(slot);
    }
    out
}
