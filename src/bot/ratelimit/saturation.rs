/// Upper bound on the burst a guild config can ask for; keeps the ring allocation bounded.
pub const MAX_BURST: usize = 1024;

/// Guild wide burst limiter: a ring of the most recent command timestamps.
///
/// Physical capacity only ever grows; `burst` is the logical size the ring was last checked with.
#[derive(Debug, Default)]
pub struct SaturationLimiter {
    slots: Vec<Option<i64>>,
    cursor: usize,
    burst: usize,
}

impl SaturationLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Makes sure the ring can hold `2 * burst` timestamps, keeping the recorded ones in recency order.
    pub fn ensure_capacity(&mut self, burst: usize) {
        self.burst = burst;
        let wanted = burst.min(MAX_BURST) * 2;
        if self.slots.len() >= wanted {
            return;
        }

        let mut slots = Vec::with_capacity(wanted);
        // Oldest first: the cursor always points at the next slot to overwrite.
        for i in 0..self.slots.len() {
            let idx = (self.cursor + i) % self.slots.len();
            if let Some(t) = self.slots[idx] {
                slots.push(Some(t));
            }
        }
        self.cursor = slots.len();
        slots.resize(wanted, None);
        if self.cursor == wanted {
            self.cursor = 0;
        }
        self.slots = slots;
    }

    /// Number of recorded timestamps inside `[now - window, now]`.
    pub fn in_window(&self, window: i64, now: i64) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|&&t| t >= now.saturating_sub(window) && t <= now)
            .count()
    }

    /// Returns the seconds left until a slot frees up when `burst` or more commands
    /// already landed inside the window. Never mutates the ring.
    pub fn saturated(&self, burst: usize, window: i64, now: i64) -> Option<i64> {
        let in_window: Vec<i64> = self
            .slots
            .iter()
            .flatten()
            .copied()
            .filter(|&t| t >= now.saturating_sub(window) && t <= now)
            .collect();

        if in_window.len() < burst {
            return None;
        }

        let oldest = in_window.iter().copied().min().unwrap_or(now);
        Some(oldest.saturating_add(window).saturating_sub(now).saturating_add(1).max(1))
    }

    pub fn record(&mut self, now: i64) {
        if self.slots.is_empty() {
            self.ensure_capacity(self.burst.max(1));
        }
        self.slots[self.cursor] = Some(now);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Check and record in one step. `Err` carries the remaining wait in seconds.
    pub fn try_acquire(&mut self, burst: usize, window: i64, now: i64) -> Result<(), i64> {
        let burst = burst.min(MAX_BURST);
        self.ensure_capacity(burst);
        if let Some(remaining) = self.saturated(burst, window, now) {
            return Err(remaining);
        }
        self.record(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_of_three_in_twenty_seconds() {
        let mut limiter = SaturationLimiter::new();
        assert_eq!(limiter.try_acquire(3, 20, 0), Ok(()));
        assert_eq!(limiter.try_acquire(3, 20, 1), Ok(()));
        assert_eq!(limiter.try_acquire(3, 20, 2), Ok(()));
        assert!(limiter.try_acquire(3, 20, 3).is_err());
        assert_eq!(limiter.try_acquire(3, 20, 21), Ok(()));
    }

    #[test]
    fn denial_reports_wait_from_oldest_in_window() {
        let mut limiter = SaturationLimiter::new();
        for t in [10, 12, 14] {
            limiter.try_acquire(3, 20, t).unwrap();
        }
        assert_eq!(limiter.try_acquire(3, 20, 15), Err(16));
        // denial did not record anything
        assert_eq!(limiter.in_window(20, 15), 3);
    }

    #[test]
    fn huge_windows_saturate_instead_of_overflowing() {
        let mut limiter = SaturationLimiter::new();
        for t in 0..3 {
            limiter.try_acquire(3, i64::MAX, 1_700_000_000 + t).unwrap();
        }
        assert_eq!(limiter.try_acquire(3, i64::MAX, 1_700_000_005), Err(i64::MAX - 1_700_000_004));
        assert_eq!(limiter.try_acquire(3, i64::MAX, i64::MIN), Ok(()));
    }

    #[test]
    fn burst_is_capped() {
        let mut limiter = SaturationLimiter::new();
        assert_eq!(limiter.try_acquire(usize::MAX, 20, 0), Ok(()));
        assert_eq!(limiter.capacity(), MAX_BURST * 2);
    }

    #[test]
    fn capacity_tracks_twice_the_burst() {
        let mut limiter = SaturationLimiter::new();
        limiter.ensure_capacity(3);
        assert_eq!(limiter.capacity(), 6);
        limiter.ensure_capacity(2);
        assert_eq!(limiter.capacity(), 6);
        limiter.ensure_capacity(5);
        assert_eq!(limiter.capacity(), 10);
    }

    #[test]
    fn growing_keeps_recent_history() {
        let mut limiter = SaturationLimiter::new();
        for t in 0..8 {
            let _ = limiter.try_acquire(2, 1, t * 10);
        }
        // ring of 4 now holds 40, 50, 60, 70
        limiter.ensure_capacity(4);
        assert_eq!(limiter.capacity(), 8);
        assert_eq!(limiter.in_window(100, 70), 4);

        limiter.record(80);
        limiter.record(90);
        limiter.record(100);
        limiter.record(110);
        limiter.record(120);
        // 40 is overwritten first
        assert_eq!(limiter.in_window(80, 120), 8);
        assert_eq!(limiter.in_window(1000, 120), 8);
    }
}
