use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const SECONDS_PER_MINUTE: u32 = 60;
const MINUTES_PER_DAY: i64 = 24 * 60;

/// Wall-clock time of day at minute resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "RawTimeOfDay")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

#[derive(Deserialize)]
struct RawTimeOfDay {
    hour: u32,
    minute: u32,
}

impl TryFrom<RawTimeOfDay> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(raw: RawTimeOfDay) -> Result<Self, Self::Error> {
        Self::new(raw.hour, raw.minute)
    }
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if hour > 23 {
            return Err(ValidationError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(ValidationError::MinuteOutOfRange(minute));
        }
        Ok(Self { hour, minute })
    }

    pub(crate) const fn literal(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn seconds_from_midnight(&self) -> u32 {
        (self.hour * 60 + self.minute) * SECONDS_PER_MINUTE
    }

    /// Shift by a signed number of minutes, wrapping around midnight.
    pub fn offset_minutes(&self, minutes: i64) -> Self {
        let current = i64::from(self.hour * 60 + self.minute);
        let shifted = (current + minutes).rem_euclid(MINUTES_PER_DAY) as u32;
        Self {
            hour: shifted / 60,
            minute: shifted % 60,
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    /// Accepts `HH:MM` or `H:MM`. Anything after the first whitespace (timezone
    /// annotations such as `"04:30 (+03)"`) is ignored.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTime(input.to_string());
        let token = input.split_whitespace().next().ok_or_else(malformed)?;
        let (hour, minute) = token.split_once(':').ok_or_else(malformed)?;
        if minute.len() != 2 || hour.is_empty() || hour.len() > 2 {
            return Err(malformed());
        }
        let hour: u32 = hour.parse().map_err(|_| malformed())?;
        let minute: u32 = minute.parse().map_err(|_| malformed())?;
        Self::new(hour, minute)
    }
}

/// The five daily prayers that receive a call-to-prayer alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Prayer {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl Prayer {
    pub const ALL: [Prayer; 5] = [
        Prayer::Fajr,
        Prayer::Dhuhr,
        Prayer::Asr,
        Prayer::Maghrib,
        Prayer::Isha,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Prayer::Fajr => "fajr",
            Prayer::Dhuhr => "dhuhr",
            Prayer::Asr => "asr",
            Prayer::Maghrib => "maghrib",
            Prayer::Isha => "isha",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Prayer::Fajr => "Fajr",
            Prayer::Dhuhr => "Dhuhr",
            Prayer::Asr => "Asr",
            Prayer::Maghrib => "Maghrib",
            Prayer::Isha => "Isha",
        }
    }
}

/// Today's published times. Supplied once per day and never mutated.
///
/// `pre_dawn_cutoff` must fall before `sunset_break`; the countdown relies on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrayerTimes {
    pub pre_dawn_cutoff: TimeOfDay,
    pub fajr: TimeOfDay,
    pub sunrise: TimeOfDay,
    pub dhuhr: TimeOfDay,
    pub asr: TimeOfDay,
    pub sunset_break: TimeOfDay,
    pub isha: TimeOfDay,
}

impl PrayerTimes {
    /// Build from a provider's name → `HH:MM` table.
    ///
    /// Keys are case-insensitive. `imsak`/`sahur` name the pre-dawn cutoff and
    /// `maghrib`/`iftar` the sunset break. When the provider omits `imsak` the
    /// fajr time is used as the cutoff; other missing names fall back to their
    /// nearest boundary so a partial table still yields usable alerts.
    pub fn from_strings<I, K, V>(table: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut parsed: HashMap<String, TimeOfDay> = HashMap::new();
        for (key, value) in table {
            let time = value.as_ref().parse::<TimeOfDay>()?;
            parsed.insert(key.as_ref().trim().to_ascii_lowercase(), time);
        }
        let lookup = |names: &[&str]| lookup_first(&parsed, names);

        let fajr = lookup(&["fajr"]);
        let pre_dawn_cutoff = lookup(&["imsak", "sahur", "suhoor"])
            .or(fajr)
            .ok_or(ValidationError::MissingPrayerTime("imsak"))?;
        let sunset_break = lookup(&["maghrib", "iftar", "sunset"])
            .ok_or(ValidationError::MissingPrayerTime("maghrib"))?;

        Ok(Self {
            pre_dawn_cutoff,
            fajr: fajr.unwrap_or(pre_dawn_cutoff),
            sunrise: lookup(&["sunrise"]).unwrap_or(pre_dawn_cutoff),
            dhuhr: lookup(&["dhuhr", "zuhr"]).unwrap_or(sunset_break),
            asr: lookup(&["asr"]).unwrap_or(sunset_break),
            sunset_break,
            isha: lookup(&["isha"]).unwrap_or(sunset_break),
        })
    }

    pub fn time_for(&self, prayer: Prayer) -> TimeOfDay {
        match prayer {
            Prayer::Fajr => self.fajr,
            Prayer::Dhuhr => self.dhuhr,
            Prayer::Asr => self.asr,
            Prayer::Maghrib => self.sunset_break,
            Prayer::Isha => self.isha,
        }
    }
}

fn lookup_first(parsed: &HashMap<String, TimeOfDay>, names: &[&str]) -> Option<TimeOfDay> {
    names.iter().find_map(|name| parsed.get(*name).copied())
}
