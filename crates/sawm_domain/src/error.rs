//! Error taxonomy shared by the scheduling components.

use thiserror::Error;

/// Failure reported by the host notification subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("platform rejected the request: {0}")]
    Rejected(String),

    #[error("platform call timed out")]
    TimedOut,

    #[error("notification subsystem unavailable: {0}")]
    Unavailable(String),
}

/// Channel setup failed. Non-fatal: notifications still go out without channel metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to provision channel `{channel_id}`: {source}")]
pub struct ProvisioningError {
    pub channel_id: String,
    #[source]
    pub source: PlatformError,
}

/// Malformed input, attached to the item it came from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("hour {0} is out of range (0-23)")]
    HourOutOfRange(u32),

    #[error("minute {0} is out of range (0-59)")]
    MinuteOutOfRange(u32),

    #[error("`{0}` is not a HH:MM time")]
    MalformedTime(String),

    #[error("prayer time `{0}` is missing")]
    MissingPrayerTime(&'static str),
}

/// An individual add or cancel against the OS failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("failed to schedule `{id}`: {source}")]
    Schedule {
        id: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to cancel `{id}`: {source}")]
    Cancel {
        id: String,
        #[source]
        source: PlatformError,
    },
}

/// The OS could not report what it currently holds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to query scheduled notifications: {0}")]
pub struct QueryError(#[from] pub PlatformError);
