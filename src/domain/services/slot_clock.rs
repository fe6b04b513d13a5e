use crate::domain::models::slot::SlotTime;

/// Minutes blocked by a single session: 90 minutes of consultation plus a
/// 30 minute buffer. Independent of the display interval.
pub const BLOCK_MINUTES: u32 = 120;

/// Every slot `t` with `start <= t < end`, stepping by `interval` minutes.
/// Inverted or empty bounds, and a zero interval, give no slots.
pub fn generate_slots(start: SlotTime, end: SlotTime, interval: u32) -> Vec<SlotTime> {
    if interval == 0 || start >= end {
        return Vec::new();
    }

    (start.minutes()..end.minutes())
        .step_by(interval as usize)
        .map(SlotTime::from_minutes)
        .collect()
}

/// Slots occupied by a session starting at `start`: `start + k * interval`
/// for every `k >= 0` that stays below `start + block_minutes`.
///
/// Always contains `start`. When `interval` does not divide
/// `block_minutes` the last slot simply overhangs the boundary.
pub fn coverage_window(start: SlotTime, interval: u32, block_minutes: u32) -> Vec<SlotTime> {
    if interval == 0 {
        return vec![start];
    }

    let end = start.minutes().saturating_add(block_minutes.max(1));
    (start.minutes()..end)
        .step_by(interval as usize)
        .map(SlotTime::from_minutes)
        .collect()
}

/// True when a session at `a` and a session at `b` on the same day would
/// share a slot, in either direction.
pub fn windows_overlap(a: SlotTime, b: SlotTime, interval: u32) -> bool {
    coverage_window(a, interval, BLOCK_MINUTES).contains(&b)
        || coverage_window(b, interval, BLOCK_MINUTES).contains(&a)
}
