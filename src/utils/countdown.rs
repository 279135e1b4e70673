use chrono::{DateTime, Utc};
use serde::Serialize;

/// Registration-close countdown. Both instants are fixed at startup from
/// configuration; everything else is recomputed from the current time.
#[derive(Clone, Copy, Debug)]
pub struct CountdownClock {
    pub target: DateTime<Utc>,
    pub window_start: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Counting,
    Finished,
}

impl CountdownClock {
    pub fn from_env() -> Self {
        let target = std::env::var("COUNTDOWN_TARGET")
            .expect("COUNTDOWN_TARGET must be set in environment");
        let target = DateTime::parse_from_rfc3339(&target)
            .expect("COUNTDOWN_TARGET must be an RFC 3339 timestamp")
            .with_timezone(&Utc);
        let window_start = std::env::var("COUNTDOWN_WINDOW_START").ok().map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .expect("COUNTDOWN_WINDOW_START must be an RFC 3339 timestamp")
                .with_timezone(&Utc)
        });
        Self { target, window_start }
    }

    fn ms_left(&self, now: DateTime<Utc>) -> i64 {
        (self.target - now).num_milliseconds().max(0)
    }

    pub fn time_left(&self, now: DateTime<Utc>) -> TimeLeft {
        let total_sec = self.ms_left(now) / 1_000;
        TimeLeft {
            days: total_sec / 86_400,
            hours: (total_sec % 86_400) / 3_600,
            minutes: (total_sec % 3_600) / 60,
            seconds: total_sec % 60,
        }
    }

    /// Percentage of the registration window already elapsed, rounded to the
    /// nearest integer. None when no window start was configured.
    pub fn progress_pct(&self, now: DateTime<Utc>) -> Option<i64> {
        let start = self.window_start?;
        let total = (self.target - start).num_milliseconds();
        if total <= 0 {
            return Some(100);
        }
        let elapsed = (now - start).num_milliseconds().clamp(0, total);
        Some(((elapsed as f64 / total as f64) * 100.0).round() as i64)
    }

    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if self.ms_left(now) == 0 {
            Phase::Finished
        } else {
            Phase::Counting
        }
    }
}

/// One-directional `Counting -> Finished` transition. `tick` reports true
/// only on the tick where the transition happens, so the completion
/// callback cannot fire twice however long ticking continues.
pub struct CountdownTicker {
    clock: CountdownClock,
    phase: Phase,
}

impl CountdownTicker {
    pub fn new(clock: CountdownClock) -> Self {
        Self {
            clock,
            phase: Phase::Counting,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase == Phase::Finished {
            return false;
        }
        if self.clock.phase(now) == Phase::Finished {
            self.phase = Phase::Finished;
            return true;
        }
        false
    }
}

pub async fn run_ticker<F>(clock: CountdownClock, on_finish: F)
where
    F: FnOnce() + Send + 'static,
{
    let mut ticker = CountdownTicker::new(clock);
    let mut on_finish = Some(on_finish);
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        interval.tick().await;
        if ticker.tick(Utc::now()) {
            if let Some(callback) = on_finish.take() {
                callback();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn clock_at(target: DateTime<Utc>) -> CountdownClock {
        CountdownClock {
            target,
            window_start: None,
        }
    }

    #[test]
    fn decomposes_remaining_time() {
        let now = Utc::now();
        let clock = clock_at(now + Duration::milliseconds(3_661_000));
        assert_eq!(
            clock.time_left(now),
            TimeLeft {
                days: 0,
                hours: 1,
                minutes: 1,
                seconds: 1,
            }
        );
    }

    #[test]
    fn remaining_time_clamps_at_zero() {
        let now = Utc::now();
        let clock = clock_at(now - Duration::seconds(30));
        assert_eq!(
            clock.time_left(now),
            TimeLeft {
                days: 0,
                hours: 0,
                minutes: 0,
                seconds: 0,
            }
        );
        assert_eq!(clock.phase(now), Phase::Finished);
    }

    #[test]
    fn progress_halfway_through_window() {
        let now = Utc::now();
        let target = now + Duration::milliseconds(500_000);
        let clock = CountdownClock {
            target,
            window_start: Some(target - Duration::milliseconds(1_000_000)),
        };
        assert_eq!(clock.progress_pct(now), Some(50));
    }

    #[test]
    fn progress_clamps_outside_window() {
        let target = Utc::now();
        let clock = CountdownClock {
            target,
            window_start: Some(target - Duration::milliseconds(1_000_000)),
        };
        let before = target - Duration::milliseconds(2_000_000);
        let after = target + Duration::milliseconds(2_000_000);
        assert_eq!(clock.progress_pct(before), Some(0));
        assert_eq!(clock.progress_pct(after), Some(100));
    }

    #[test]
    fn non_positive_window_reports_full_progress() {
        let target = Utc::now();
        let clock = CountdownClock {
            target,
            window_start: Some(target + Duration::seconds(10)),
        };
        assert_eq!(clock.progress_pct(target), Some(100));
    }

    #[test]
    fn no_window_start_means_no_progress() {
        let now = Utc::now();
        assert_eq!(clock_at(now + Duration::seconds(5)).progress_pct(now), None);
    }

    #[test]
    fn completion_fires_exactly_once() {
        let start = Utc::now();
        let mut ticker = CountdownTicker::new(clock_at(start + Duration::seconds(2)));
        assert!(!ticker.tick(start));
        assert!(!ticker.tick(start + Duration::seconds(1)));
        // first tick at or past the target transitions
        assert!(ticker.tick(start + Duration::seconds(2)));
        // ticking continues but the transition never repeats
        assert!(!ticker.tick(start + Duration::seconds(3)));
        assert!(!ticker.tick(start + Duration::seconds(60)));
    }

    #[test]
    fn mounting_past_target_fires_on_first_tick() {
        let start = Utc::now();
        let mut ticker = CountdownTicker::new(clock_at(start - Duration::seconds(5)));
        assert!(ticker.tick(start));
        assert!(!ticker.tick(start + Duration::seconds(1)));
    }
}
