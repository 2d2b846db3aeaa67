pub mod channels;
pub mod countdown;
pub mod error;
pub mod memory;
pub mod notifications;
pub mod prayer_times;
pub mod settings;

pub use crate::channels::{ChannelAttributes, ChannelRegistry, NotificationChannel};
pub use crate::countdown::{compute_countdown, countdown_at, Countdown, CountdownLabel};
pub use crate::notifications::{
    NotificationPlatform, NotificationRequest, RawScheduledEntry, RawTrigger, TriggerSpec,
};
pub use crate::prayer_times::{Prayer, PrayerTimes, TimeOfDay};
pub use crate::settings::{CustomReminder, DesiredScheduleSet, ReminderSettings};
