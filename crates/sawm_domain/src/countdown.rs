use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::prayer_times::PrayerTimes;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CountdownLabel {
    #[serde(rename = "toSahur")]
    ToSahur,
    #[serde(rename = "toIftar")]
    ToIftar,
    #[serde(rename = "none")]
    None,
}

/// Time left until the next fasting boundary of the day. Recomputed every tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Countdown {
    pub label: CountdownLabel,
    pub remaining_seconds: Option<u32>,
}

impl Countdown {
    pub fn remaining(&self) -> Option<Duration> {
        self.remaining_seconds
            .map(|seconds| Duration::seconds(i64::from(seconds)))
    }

    /// `HH:MM:SS` for display, `None` once today's boundaries have passed.
    pub fn clock(&self) -> Option<String> {
        self.remaining_seconds.map(|total| {
            format!(
                "{:02}:{:02}:{:02}",
                total / 3600,
                (total % 3600) / 60,
                total % 60
            )
        })
    }
}

/// Countdown for `now` expressed in the caller's local timezone.
pub fn compute_countdown<Tz: TimeZone>(now: &DateTime<Tz>, times: &PrayerTimes) -> Countdown {
    countdown_at(now.time(), times)
}

/// Same-day comparison only: once sunset has passed the caller re-invokes with
/// tomorrow's times after local midnight. The cutoff instant itself already
/// belongs to the fasting period.
pub fn countdown_at(now: NaiveTime, times: &PrayerTimes) -> Countdown {
    let now_sec = now.num_seconds_from_midnight();
    let cutoff_sec = times.pre_dawn_cutoff.seconds_from_midnight();
    let break_sec = times.sunset_break.seconds_from_midnight();

    if now_sec < cutoff_sec {
        Countdown {
            label: CountdownLabel::ToSahur,
            remaining_seconds: Some(cutoff_sec - now_sec),
        }
    } else if now_sec < break_sec {
        Countdown {
            label: CountdownLabel::ToIftar,
            remaining_seconds: Some(break_sec - now_sec),
        }
    } else {
        Countdown {
            label: CountdownLabel::None,
            remaining_seconds: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prayer_times::TimeOfDay;
    use chrono::{FixedOffset, Utc};
    use proptest::prelude::*;

    fn ramadan_day() -> PrayerTimes {
        PrayerTimes::from_strings([("imsak", "04:30"), ("maghrib", "19:45")]).unwrap()
    }

    fn at(hour: u32, minute: u32, second: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, second).unwrap()
    }

    #[test]
    fn before_cutoff_counts_down_to_sahur() {
        let countdown = countdown_at(at(3, 0, 0), &ramadan_day());
        assert_eq!(countdown.label, CountdownLabel::ToSahur);
        assert_eq!(countdown.remaining_seconds, Some(5400));
        assert_eq!(countdown.clock().as_deref(), Some("01:30:00"));
    }

    #[test]
    fn during_fast_counts_down_to_iftar() {
        let countdown = countdown_at(at(5, 0, 0), &ramadan_day());
        assert_eq!(countdown.label, CountdownLabel::ToIftar);
        assert_eq!(countdown.remaining_seconds, Some(53100));
    }

    #[test]
    fn after_sunset_has_no_boundary() {
        let countdown = countdown_at(at(20, 0, 0), &ramadan_day());
        assert_eq!(countdown.label, CountdownLabel::None);
        assert_eq!(countdown.remaining_seconds, None);
        assert_eq!(countdown.clock(), None);
    }

    #[test]
    fn cutoff_instant_belongs_to_fast() {
        let countdown = countdown_at(at(4, 30, 0), &ramadan_day());
        assert_eq!(countdown.label, CountdownLabel::ToIftar);
        assert_eq!(countdown.remaining_seconds, Some(15 * 3600 + 15 * 60));

        let sunset = countdown_at(at(19, 45, 0), &ramadan_day());
        assert_eq!(sunset.label, CountdownLabel::None);
    }

    #[test]
    fn uses_local_wall_clock_of_the_instant() {
        let riyadh = FixedOffset::east_opt(3 * 3600).unwrap();
        // 00:00 UTC is 03:00 in UTC+3.
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap().with_timezone(&riyadh);
        let countdown = compute_countdown(&now, &ramadan_day());
        assert_eq!(countdown.label, CountdownLabel::ToSahur);
        assert_eq!(countdown.remaining_seconds, Some(5400));
    }

    #[test]
    fn label_serializes_in_camel_case() {
        let json = serde_json::to_value(countdown_at(at(3, 0, 0), &ramadan_day())).unwrap();
        assert_eq!(json["label"], "toSahur");
        assert_eq!(json["remaining_seconds"], 5400);
    }

    proptest! {
        #[test]
        fn remaining_is_bounded_for_well_formed_days(
            cutoff_min in 0u32..1438,
            gap in 1u32..1440,
            now_sec in 0u32..86_400,
        ) {
            let break_min = (cutoff_min + gap).min(1439);
            prop_assume!(cutoff_min < break_min);
            let times = PrayerTimes {
                pre_dawn_cutoff: TimeOfDay::new(cutoff_min / 60, cutoff_min % 60).unwrap(),
                fajr: TimeOfDay::new(cutoff_min / 60, cutoff_min % 60).unwrap(),
                sunrise: TimeOfDay::new(cutoff_min / 60, cutoff_min % 60).unwrap(),
                dhuhr: TimeOfDay::new(break_min / 60, break_min % 60).unwrap(),
                asr: TimeOfDay::new(break_min / 60, break_min % 60).unwrap(),
                sunset_break: TimeOfDay::new(break_min / 60, break_min % 60).unwrap(),
                isha: TimeOfDay::new(break_min / 60, break_min % 60).unwrap(),
            };
            let now = NaiveTime::from_num_seconds_from_midnight_opt(now_sec, 0).unwrap();
            let countdown = countdown_at(now, &times);
            match countdown.label {
                CountdownLabel::ToSahur => {
                    prop_assert!(now_sec < cutoff_min * 60);
                    prop_assert_eq!(countdown.remaining_seconds, Some(cutoff_min * 60 - now_sec));
                }
                CountdownLabel::ToIftar => {
                    prop_assert!(now_sec >= cutoff_min * 60 && now_sec < break_min * 60);
                    prop_assert!(countdown.remaining_seconds.unwrap() > 0);
                }
                CountdownLabel::None => {
                    prop_assert!(now_sec >= break_min * 60);
                    prop_assert_eq!(countdown.remaining_seconds, None);
                }
            }
        }
    }
}
