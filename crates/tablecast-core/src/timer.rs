use std::time::Duration;

/// One-shot deadline on a caller-supplied monotonic clock.
///
/// `arm` replaces any pending deadline, which is how a phase restart cancels
/// an in-flight settle delay. `poll` fires at most once per arming.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettleTimer {
    deadline: Option<Duration>,
}

impl SettleTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, now: Duration, delay: Duration) {
        self.deadline = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// `true` exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_once_after_deadline() {
        let mut t = SettleTimer::new();
        assert!(!t.poll(ms(0)));
        t.arm(ms(100), ms(50));
        assert!(!t.poll(ms(149)));
        assert!(t.poll(ms(150)));
        assert!(!t.poll(ms(500)));
        assert!(!t.is_armed());
    }

    #[test]
    fn rearm_replaces_pending_deadline() {
        let mut t = SettleTimer::new();
        t.arm(ms(0), ms(100));
        t.arm(ms(80), ms(100));
        assert!(!t.poll(ms(120)));
        assert!(t.poll(ms(180)));

        t.arm(ms(200), ms(10));
        t.cancel();
        assert!(!t.poll(ms(1000)));
    }
}
