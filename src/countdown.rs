use chrono::NaiveDateTime;
use std::fmt;
use std::time::{Duration, Instant};

pub const ARRIVAL_TEXT: &str = "¡Ha llegado el momento!";
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Time left until the target. Days are not capped to a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
    pub arrived: bool,
}

pub fn tick(target: NaiveDateTime, now: NaiveDateTime) -> Remaining {
    let delta = target.signed_duration_since(now).num_milliseconds();
    if delta <= 0 {
        return Remaining {
            arrived: true,
            ..Remaining::default()
        };
    }
    Remaining {
        days: delta / MS_PER_DAY,
        hours: (delta % MS_PER_DAY) / MS_PER_HOUR,
        minutes: (delta % MS_PER_HOUR) / MS_PER_MINUTE,
        seconds: (delta % MS_PER_MINUTE) / MS_PER_SECOND,
        arrived: false,
    }
}

impl Remaining {
    /// Countdown line plus the custom message, or the arrival text.
    pub fn display(&self, message: &str) -> String {
        if self.arrived {
            ARRIVAL_TEXT.to_string()
        } else if message.is_empty() {
            self.to_string()
        } else {
            format!("{}\n{}", self, message)
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.arrived {
            return f.write_str(ARRIVAL_TEXT);
        }
        write!(
            f,
            "{} Dias, {} Horas, {} Minutos, {} Segundos",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Single once-per-second timer. Late ticks are not caught up: the next
/// deadline is always measured from the moment the tick actually ran.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn start(now: Instant) -> Self {
        Ticker {
            period: TICK_PERIOD,
            next: Some(now),
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.next, Some(deadline) if now >= deadline)
    }

    /// `None` once the ticker has stopped.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    pub fn record(&mut self, now: Instant, remaining: &Remaining) {
        self.next = if remaining.arrived {
            None
        } else {
            Some(now + self.period)
        };
    }

    pub fn is_stopped(&self) -> bool {
        self.next.is_none()
    }

    /// Re-arms a stopped ticker, e.g. after the target moved into the future.
    pub fn restart(&mut self, now: Instant) {
        self.next = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn total_seconds(r: &Remaining) -> i64 {
        r.days * 86_400 + r.hours * 3_600 + r.minutes * 60 + r.seconds
    }

    #[test]
    fn test_two_days_before_preset() {
        let target = at(2024, 10, 11, 5, 35, 0);
        let now = at(2024, 10, 9, 5, 35, 0);
        assert_eq!(
            tick(target, now),
            Remaining {
                days: 2,
                hours: 0,
                minutes: 0,
                seconds: 0,
                arrived: false,
            }
        );
    }

    #[test]
    fn test_components_stay_in_range() {
        let target = at(2025, 3, 1, 0, 0, 0);
        let samples = [
            at(2024, 1, 1, 0, 0, 0),
            at(2024, 12, 31, 23, 59, 59),
            at(2025, 2, 28, 13, 7, 42),
            at(2025, 2, 28, 23, 59, 59),
        ];
        for now in samples {
            let r = tick(target, now);
            assert!(!r.arrived);
            assert!((0..24).contains(&r.hours));
            assert!((0..60).contains(&r.minutes));
            assert!((0..60).contains(&r.seconds));
            let expected = target.signed_duration_since(now).num_seconds();
            assert_eq!(total_seconds(&r), expected);
        }
    }

    #[test]
    fn test_days_exceed_a_month() {
        let r = tick(at(2025, 1, 1, 0, 0, 0), at(2024, 1, 1, 0, 0, 0));
        assert_eq!(r.days, 366);
    }

    #[test]
    fn test_sub_second_remainder_is_floored() {
        let target = at(2024, 10, 11, 5, 35, 0);
        let now = target - ChronoDuration::milliseconds(1_999);
        let r = tick(target, now);
        assert_eq!(r.seconds, 1);
        assert!(!r.arrived);
    }

    #[test]
    fn test_arrival_never_shows_negative_values() {
        let target = at(2024, 10, 11, 5, 35, 0);
        for now in [target, target + ChronoDuration::days(3)] {
            let r = tick(target, now);
            assert!(r.arrived);
            assert_eq!(r.display("hola"), ARRIVAL_TEXT);
            assert_eq!(r.to_string(), ARRIVAL_TEXT);
        }
    }

    #[test]
    fn test_display_appends_message() {
        let r = tick(at(2024, 10, 11, 5, 35, 0), at(2024, 10, 10, 3, 34, 59));
        assert_eq!(
            r.display("Alana"),
            "1 Dias, 2 Horas, 0 Minutos, 1 Segundos\nAlana"
        );
        assert_eq!(r.display(""), "1 Dias, 2 Horas, 0 Minutos, 1 Segundos");
    }

    #[test]
    fn test_ticker_no_catch_up() {
        let start = Instant::now();
        let mut ticker = Ticker::start(start);
        assert!(ticker.is_due(start));

        let pending = Remaining::default();
        let late = start + Duration::from_secs(5);
        ticker.record(late, &pending);
        assert!(!ticker.is_due(late + Duration::from_millis(999)));
        assert!(ticker.is_due(late + TICK_PERIOD));
        assert_eq!(ticker.time_until_next(late), Some(TICK_PERIOD));
    }

    #[test]
    fn test_ticker_stops_after_arrival() {
        let start = Instant::now();
        let mut ticker = Ticker::start(start);
        let arrived = Remaining {
            arrived: true,
            ..Remaining::default()
        };
        ticker.record(start, &arrived);
        assert!(ticker.is_stopped());
        assert!(!ticker.is_due(start + Duration::from_secs(60)));
        assert_eq!(ticker.time_until_next(start), None);

        ticker.restart(start);
        assert!(ticker.is_due(start));
    }
}
