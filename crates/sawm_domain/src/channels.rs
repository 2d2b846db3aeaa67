use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::ProvisioningError;
use crate::notifications::NotificationPlatform;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotificationChannel {
    CallToPrayer,
    DailyPrayerTimes,
    Reminders,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Importance {
    Default,
    High,
    Max,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LockscreenVisibility {
    Public,
    Private,
    Secret,
}

/// Fixed presentation profile of a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelAttributes {
    pub name: String,
    pub description: String,
    pub importance: Importance,
    /// Alternating wait/vibrate durations in milliseconds.
    pub vibration_pattern: Vec<u64>,
    pub light_color: String,
    pub lockscreen_visibility: LockscreenVisibility,
    pub bypass_dnd: bool,
    pub sound: Option<String>,
}

impl NotificationChannel {
    pub const ALL: [NotificationChannel; 3] = [
        NotificationChannel::CallToPrayer,
        NotificationChannel::DailyPrayerTimes,
        NotificationChannel::Reminders,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            NotificationChannel::CallToPrayer => "call-to-prayer",
            NotificationChannel::DailyPrayerTimes => "daily-prayer-times",
            NotificationChannel::Reminders => "reminders",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.id() == id)
    }

    pub fn attributes(&self) -> ChannelAttributes {
        match self {
            NotificationChannel::CallToPrayer => ChannelAttributes {
                name: "Call to prayer".into(),
                description: "Adhan alert at the start of each prayer time".into(),
                importance: Importance::Max,
                vibration_pattern: vec![0, 500, 250, 500],
                light_color: "#1B5E20".into(),
                lockscreen_visibility: LockscreenVisibility::Public,
                bypass_dnd: true,
                sound: Some("adhan.wav".into()),
            },
            NotificationChannel::DailyPrayerTimes => ChannelAttributes {
                name: "Daily prayer times".into(),
                description: "Morning summary of today's prayer times".into(),
                importance: Importance::Default,
                vibration_pattern: vec![0, 250],
                light_color: "#0D47A1".into(),
                lockscreen_visibility: LockscreenVisibility::Public,
                bypass_dnd: false,
                sound: None,
            },
            NotificationChannel::Reminders => ChannelAttributes {
                name: "Reminders".into(),
                description: "Sahur, iftar and personal reminders".into(),
                importance: Importance::High,
                vibration_pattern: vec![0, 250, 250, 250],
                light_color: "#FF8F00".into(),
                lockscreen_visibility: LockscreenVisibility::Private,
                bypass_dnd: false,
                sound: Some("default".into()),
            },
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Provisions the fixed channel set and hands out channel tags for scheduling.
#[derive(Clone)]
pub struct ChannelRegistry {
    platform: Arc<dyn NotificationPlatform>,
}

impl ChannelRegistry {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self { platform }
    }

    /// Create or update every channel. A no-op on platforms without channels.
    ///
    /// All channels are attempted; the first failure is reported once for the batch.
    #[instrument(skip(self))]
    pub async fn ensure_channels(&self) -> Result<(), ProvisioningError> {
        if !self.platform.supports_channels() {
            debug!("platform has no notification channels, skipping provisioning");
            return Ok(());
        }

        let mut first_failure: Option<ProvisioningError> = None;
        for channel in NotificationChannel::ALL {
            let attributes = channel.attributes();
            match self
                .platform
                .create_or_update_channel(channel.id(), &attributes)
                .await
            {
                Ok(()) => debug!(channel = %channel, "channel provisioned"),
                Err(source) => {
                    warn!(channel = %channel, %source, "channel provisioning failed");
                    if first_failure.is_none() {
                        first_failure = Some(ProvisioningError {
                            channel_id: channel.id().to_string(),
                            source,
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => {
                info!(count = NotificationChannel::ALL.len(), "notification channels ready");
                Ok(())
            }
        }
    }

    /// Channel id to attach to a scheduled notification, if the platform groups by channel.
    pub fn channel_tag(&self, channel: NotificationChannel) -> Option<&'static str> {
        self.platform.supports_channels().then(|| channel.id())
    }
}
