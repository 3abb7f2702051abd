use crate::model::*;

/// Is a manager free for the hour starting at `candidate_start`?
///
/// `slots` must all belong to the same manager. The manager needs an unbooked
/// slot spanning exactly `[start, start + 1h)`, and no booked slot may overlap
/// that hour. A booked slot ending exactly at `start` does not overlap.
pub fn is_free(slots: &[&Slot], candidate_start: Ms) -> bool {
    let wanted = Span::slot_at(candidate_start);
    has_open_slot(slots, &wanted) && !has_blocking_booking(slots, &wanted)
}

fn has_open_slot(slots: &[&Slot], wanted: &Span) -> bool {
    slots.iter().any(|s| !s.booked && s.span == *wanted)
}

fn has_blocking_booking(slots: &[&Slot], wanted: &Span) -> bool {
    slots.iter().any(|s| s.booked && s.span.overlaps(wanted))
}
