use std::time::{Duration, Instant};

use crate::document::TabId;

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed-interval trigger, independent of edit activity.
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    interval: Duration,
    next_due: Option<Instant>,
}

impl AutosaveScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// True when a pass is due. Missed intervals collapse into one pass.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let mut next = due + self.interval;
        while next <= now {
            next += self.interval;
        }
        self.next_due = Some(next);
        true
    }

    /// Stop for good (session teardown).
    pub fn cancel(&mut self) {
        self.next_due = None;
    }
}

impl Default for AutosaveScheduler {
    fn default() -> Self {
        Self::new(AUTOSAVE_INTERVAL)
    }
}

/// Outcome of writing several tabs at once (autosave pass, shutdown).
#[derive(Debug, Default)]
pub struct FlushReport {
    pub saved: Vec<TabId>,
    pub failed: Vec<(TabId, String)>,
}

impl FlushReport {
    pub fn is_empty(&self) -> bool {
        self.saved.is_empty() && self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_until_started() {
        let mut autosave = AutosaveScheduler::default();
        assert!(!autosave.is_running());
        assert!(!autosave.on_tick(Instant::now() + Duration::from_secs(60)));
    }

    #[test]
    fn test_fires_every_interval() {
        let start = Instant::now();
        let mut autosave = AutosaveScheduler::new(Duration::from_secs(10));
        autosave.start(start);
        assert!(!autosave.on_tick(start + Duration::from_secs(9)));
        assert!(autosave.on_tick(start + Duration::from_secs(10)));
        assert!(!autosave.on_tick(start + Duration::from_secs(15)));
        assert!(autosave.on_tick(start + Duration::from_secs(20)));
    }

    #[test]
    fn test_missed_intervals_collapse() {
        let start = Instant::now();
        let mut autosave = AutosaveScheduler::new(Duration::from_secs(10));
        autosave.start(start);
        assert!(autosave.on_tick(start + Duration::from_secs(35)));
        assert!(!autosave.on_tick(start + Duration::from_secs(36)));
        assert_eq!(autosave.next_due(), Some(start + Duration::from_secs(40)));
    }

    #[test]
    fn test_cancel_stops_timer() {
        let start = Instant::now();
        let mut autosave = AutosaveScheduler::default();
        autosave.start(start);
        autosave.cancel();
        assert!(!autosave.is_running());
        assert!(!autosave.on_tick(start + Duration::from_secs(100)));
    }
}
