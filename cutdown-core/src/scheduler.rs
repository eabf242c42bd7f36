// scheduler.rs

/// Stalls longer than this many seconds abandon catch-up and re-anchor
/// the deadline to the present.
pub const MAX_CATCH_UP_S: u32 = 10;

/// Deadline-based 1 Hz tick generator over a free-running millisecond
/// clock.
///
/// The only source of tick-domain time in the instrument: every counter
/// downstream advances by the `dt_s` this scheduler reports, never by
/// reading the wall clock directly. Deadline advancement (rather than
/// "now - last >= 1000") bounds long-term drift, and comparing with a
/// signed difference survives the 32-bit millisecond wrap (~49.7 days).
pub struct TickScheduler {
    deadline_ms: u32,
    initialized: bool,
}

impl TickScheduler {
    pub const fn new() -> Self {
        Self {
            deadline_ms: 0,
            initialized: false,
        }
    }

    /// Checks whether a 1 Hz tick is due.
    ///
    /// Returns `Some(dt_s)` with the number of whole elapsed seconds to
    /// apply this tick, or `None` when the deadline has not been
    /// reached. After a stall the elapsed seconds are reported in one
    /// tick so downstream counters stay continuous; a stall past
    /// [`MAX_CATCH_UP_S`] additionally snaps the deadline to
    /// `now + 1000` so the scheduler never owes unbounded catch-up.
    pub fn tick(&mut self, now_ms: u32) -> Option<u16> {
        if !self.initialized {
            self.initialized = true;
            self.deadline_ms = now_ms.wrapping_add(1000);
            return None;
        }

        let diff = now_ms.wrapping_sub(self.deadline_ms);
        if (diff as i32) < 0 {
            return None;
        }

        let elapsed_s = 1 + diff / 1000;
        self.deadline_ms = self.deadline_ms.wrapping_add(elapsed_s.wrapping_mul(1000));

        if elapsed_s > MAX_CATCH_UP_S {
            self.deadline_ms = now_ms.wrapping_add(1000);
        }

        Some(elapsed_s.min(u16::MAX as u32) as u16)
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}
