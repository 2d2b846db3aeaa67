use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::channels::{ChannelAttributes, NotificationChannel};
use crate::error::{PlatformError, ValidationError};

/// Trigger payload exactly as the platform accepts and reports it.
pub type RawTrigger = Value;

/// When a scheduled notification fires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TriggerSpec {
    /// Every calendar day at a wall-clock time.
    DailyAt { hour: u32, minute: u32 },
    /// Once, `seconds` after scheduling.
    AfterDelay { seconds: u64 },
    /// Once, at an absolute instant.
    AtInstant { epoch_millis: i64 },
}

impl TriggerSpec {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match *self {
            TriggerSpec::DailyAt { hour, .. } if hour > 23 => {
                Err(ValidationError::HourOutOfRange(hour))
            }
            TriggerSpec::DailyAt { minute, .. } if minute > 59 => {
                Err(ValidationError::MinuteOutOfRange(minute))
            }
            _ => Ok(()),
        }
    }

    /// Canonical payload handed to the platform.
    pub fn to_raw(&self) -> RawTrigger {
        match *self {
            TriggerSpec::DailyAt { hour, minute } => json!({
                "type": "daily",
                "hour": hour,
                "minute": minute,
                "repeats": true,
            }),
            TriggerSpec::AfterDelay { seconds } => json!({
                "type": "timeInterval",
                "seconds": seconds,
                "repeats": false,
            }),
            TriggerSpec::AtInstant { epoch_millis } => json!({
                "type": "date",
                "timestamp": epoch_millis,
            }),
        }
    }
}

/// A local notification as the application wants it. Identity is `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRequest {
    pub id: String,
    pub channel: NotificationChannel,
    pub title: String,
    pub body: String,
    pub trigger: TriggerSpec,
}

/// One entry as reported back by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawScheduledEntry {
    pub id: String,
    pub channel_id: Option<String>,
    pub title: String,
    pub body: String,
    pub trigger: RawTrigger,
}

/// Host notification subsystem. Platform adapters implement this trait.
#[async_trait]
pub trait NotificationPlatform: Send + Sync {
    /// Whether notifications are grouped into channels on this platform.
    fn supports_channels(&self) -> bool {
        true
    }

    async fn query_scheduled(&self) -> Result<Vec<RawScheduledEntry>, PlatformError>;

    /// Scheduling an id that already exists supersedes the old entry.
    async fn schedule(
        &self,
        id: &str,
        channel_id: Option<&str>,
        title: &str,
        body: &str,
        trigger: &RawTrigger,
    ) -> Result<(), PlatformError>;

    async fn cancel(&self, id: &str) -> Result<(), PlatformError>;

    async fn create_or_update_channel(
        &self,
        channel_id: &str,
        attributes: &ChannelAttributes,
    ) -> Result<(), PlatformError>;
}
