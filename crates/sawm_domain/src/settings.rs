use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::channels::NotificationChannel;
use crate::notifications::{NotificationRequest, TriggerSpec};
use crate::prayer_times::{Prayer, PrayerTimes, TimeOfDay};

pub const SAHUR_REMINDER_ID: &str = "sahur";
pub const IFTAR_REMINDER_ID: &str = "iftar";
pub const DAILY_DIGEST_ID: &str = "daily-prayer-times";

/// A user-defined daily reminder. Hour and minute are kept as entered and
/// validated when scheduled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CustomReminder {
    pub id: Option<String>,
    pub hour: u32,
    pub minute: u32,
    pub title: String,
    pub body: Option<String>,
}

impl CustomReminder {
    pub fn new(hour: u32, minute: u32, title: impl Into<String>) -> Self {
        Self {
            id: None,
            hour,
            minute,
            title: title.into(),
            body: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Read-only view of the user's reminder preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderSettings {
    pub daily_toggles: BTreeMap<NotificationChannel, bool>,
    pub custom_reminders: Vec<CustomReminder>,
    pub sahur_lead_minutes: u32,
    pub iftar_lead_minutes: u32,
    pub digest_time: TimeOfDay,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            daily_toggles: NotificationChannel::ALL
                .into_iter()
                .map(|channel| (channel, true))
                .collect(),
            custom_reminders: Vec::new(),
            sahur_lead_minutes: 30,
            iftar_lead_minutes: 15,
            digest_time: TimeOfDay::literal(3, 0),
        }
    }
}

impl ReminderSettings {
    /// Channels missing from the toggle map count as switched off.
    pub fn is_enabled(&self, channel: NotificationChannel) -> bool {
        self.daily_toggles.get(&channel).copied().unwrap_or(false)
    }

    pub fn set_enabled(&mut self, channel: NotificationChannel, enabled: bool) {
        self.daily_toggles.insert(channel, enabled);
    }
}

/// Notifications that should exist right now, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DesiredScheduleSet {
    entries: BTreeMap<String, NotificationRequest>,
}

impl DesiredScheduleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the full desired schedule from settings and today's times.
    pub fn from_settings(settings: &ReminderSettings, times: &PrayerTimes) -> Self {
        let mut set = Self::new();

        if settings.is_enabled(NotificationChannel::CallToPrayer) {
            for prayer in Prayer::ALL {
                let time = times.time_for(prayer);
                set.insert(NotificationRequest {
                    id: format!("prayer-{}", prayer.key()),
                    channel: NotificationChannel::CallToPrayer,
                    title: format!("{} time", prayer.display_name()),
                    body: format!("It is time for {} prayer ({}).", prayer.display_name(), time),
                    trigger: daily_at(time),
                });
            }
        }

        if settings.is_enabled(NotificationChannel::DailyPrayerTimes) {
            let summary: Vec<String> = Prayer::ALL
                .iter()
                .map(|prayer| format!("{} {}", prayer.display_name(), times.time_for(*prayer)))
                .collect();
            set.insert(NotificationRequest {
                id: DAILY_DIGEST_ID.to_string(),
                channel: NotificationChannel::DailyPrayerTimes,
                title: "Today's prayer times".to_string(),
                body: format!("Imsak {}, {}", times.pre_dawn_cutoff, summary.join(", ")),
                trigger: daily_at(settings.digest_time),
            });
        }

        if settings.is_enabled(NotificationChannel::Reminders) {
            let sahur_at = times
                .pre_dawn_cutoff
                .offset_minutes(-i64::from(settings.sahur_lead_minutes));
            set.insert(NotificationRequest {
                id: SAHUR_REMINDER_ID.to_string(),
                channel: NotificationChannel::Reminders,
                title: "Sahur".to_string(),
                body: format!(
                    "{} minutes left to eat before imsak at {}.",
                    settings.sahur_lead_minutes, times.pre_dawn_cutoff
                ),
                trigger: daily_at(sahur_at),
            });

            let iftar_at = times
                .sunset_break
                .offset_minutes(-i64::from(settings.iftar_lead_minutes));
            set.insert(NotificationRequest {
                id: IFTAR_REMINDER_ID.to_string(),
                channel: NotificationChannel::Reminders,
                title: "Iftar".to_string(),
                body: format!(
                    "Iftar in {} minutes, at {}.",
                    settings.iftar_lead_minutes, times.sunset_break
                ),
                trigger: daily_at(iftar_at),
            });
        }

        for (index, reminder) in settings.custom_reminders.iter().enumerate() {
            // `custom-<index>` and `custom-id-<id>` never overlap; a repeated id falls back to its index.
            let positional = format!("custom-{index}");
            let id = match &reminder.id {
                Some(own) if set.contains(&format!("custom-id-{own}")) => {
                    warn!(id = %own, fallback = %positional, "duplicate custom reminder id");
                    positional
                }
                Some(own) => format!("custom-id-{own}"),
                None => positional,
            };
            set.insert(NotificationRequest {
                id,
                channel: NotificationChannel::Reminders,
                title: reminder.title.clone(),
                body: reminder
                    .body
                    .clone()
                    .unwrap_or_else(|| reminder.title.clone()),
                trigger: TriggerSpec::DailyAt {
                    hour: reminder.hour,
                    minute: reminder.minute,
                },
            });
        }

        set
    }

    /// Insert a request, superseding any previous request with the same id.
    pub fn insert(&mut self, request: NotificationRequest) -> Option<NotificationRequest> {
        self.entries.insert(request.id.clone(), request)
    }

    pub fn remove(&mut self, id: &str) -> Option<NotificationRequest> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&NotificationRequest> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationRequest> {
        self.entries.values()
    }
}

impl FromIterator<NotificationRequest> for DesiredScheduleSet {
    fn from_iter<T: IntoIterator<Item = NotificationRequest>>(iter: T) -> Self {
        let mut set = Self::new();
        for request in iter {
            set.insert(request);
        }
        set
    }
}

fn daily_at(time: TimeOfDay) -> TriggerSpec {
    TriggerSpec::DailyAt {
        hour: time.hour(),
        minute: time.minute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times() -> PrayerTimes {
        PrayerTimes::from_strings([
            ("imsak", "04:30"),
            ("fajr", "04:40"),
            ("sunrise", "06:10"),
            ("dhuhr", "12:55"),
            ("asr", "16:30"),
            ("maghrib", "19:45"),
            ("isha", "21:10"),
        ])
        .unwrap()
    }

    #[test]
    fn default_settings_produce_all_daily_reminders() {
        let set = DesiredScheduleSet::from_settings(&ReminderSettings::default(), &times());
        // five prayers, digest, sahur, iftar
        assert_eq!(set.len(), 8);
        assert_eq!(
            set.get("prayer-maghrib").map(|req| req.trigger),
            Some(TriggerSpec::DailyAt { hour: 19, minute: 45 })
        );
        assert_eq!(
            set.get(SAHUR_REMINDER_ID).map(|req| req.trigger),
            Some(TriggerSpec::DailyAt { hour: 4, minute: 0 })
        );
        assert_eq!(
            set.get(IFTAR_REMINDER_ID).map(|req| req.trigger),
            Some(TriggerSpec::DailyAt { hour: 19, minute: 30 })
        );
        let digest = set.get(DAILY_DIGEST_ID).unwrap();
        assert_eq!(digest.channel, NotificationChannel::DailyPrayerTimes);
        assert!(digest.body.contains("Isha 21:10"));
    }

    #[test]
    fn toggled_off_channels_are_omitted() {
        let mut settings = ReminderSettings::default();
        settings.set_enabled(NotificationChannel::CallToPrayer, false);
        settings.set_enabled(NotificationChannel::DailyPrayerTimes, false);
        let set = DesiredScheduleSet::from_settings(&settings, &times());
        let ids: Vec<&str> = set.ids().collect();
        assert_eq!(ids, vec![IFTAR_REMINDER_ID, SAHUR_REMINDER_ID]);
    }

    #[test]
    fn custom_reminders_keep_raw_hour_and_stable_ids() {
        let mut settings = ReminderSettings::default();
        settings.daily_toggles.clear();
        settings.custom_reminders = vec![
            CustomReminder::new(6, 15, "Read Quran"),
            CustomReminder::new(25, 0, "Broken").with_id("late"),
        ];
        let set = DesiredScheduleSet::from_settings(&settings, &times());
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("custom-0").unwrap().body, "Read Quran");
        assert_eq!(
            set.get("custom-id-late").unwrap().trigger,
            TriggerSpec::DailyAt { hour: 25, minute: 0 }
        );
    }

    #[test]
    fn custom_reminder_ids_never_shadow_each_other() {
        let mut settings = ReminderSettings::default();
        settings.daily_toggles.clear();
        settings.custom_reminders = vec![
            CustomReminder::new(5, 10, "Morning dhikr"),
            CustomReminder::new(12, 0, "Charity").with_id("0"),
            CustomReminder::new(13, 0, "Call family").with_id("family"),
            CustomReminder::new(14, 0, "Call family again").with_id("family"),
        ];
        let set = DesiredScheduleSet::from_settings(&settings, &times());

        assert_eq!(set.len(), 4);
        assert_eq!(set.get("custom-0").unwrap().title, "Morning dhikr");
        assert_eq!(set.get("custom-id-0").unwrap().title, "Charity");
        assert_eq!(set.get("custom-id-family").unwrap().title, "Call family");
        assert_eq!(set.get("custom-3").unwrap().title, "Call family again");
    }
}
