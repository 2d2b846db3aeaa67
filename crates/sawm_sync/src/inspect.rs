use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::timeout;
use tracing::{debug, instrument};

use sawm_domain::error::{PlatformError, QueryError};
use sawm_domain::{NotificationChannel, NotificationPlatform, RawScheduledEntry, TriggerSpec};

/// Upper bound for a single platform call unless configured otherwise.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// A platform trigger mapped back onto [`TriggerSpec`], or flagged as unrecognised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum InspectedTrigger {
    Known(TriggerSpec),
    Unknown { label: String },
}

impl InspectedTrigger {
    pub fn known(&self) -> Option<TriggerSpec> {
        match self {
            InspectedTrigger::Known(spec) => Some(*spec),
            InspectedTrigger::Unknown { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InspectedTrigger::Known(TriggerSpec::DailyAt { hour, minute }) => {
                format!("daily at {hour:02}:{minute:02}")
            }
            InspectedTrigger::Known(TriggerSpec::AfterDelay { seconds }) => {
                format!("in {seconds}s")
            }
            InspectedTrigger::Known(TriggerSpec::AtInstant { epoch_millis }) => {
                match DateTime::from_timestamp_millis(*epoch_millis) {
                    Some(at) => format!("at {}", at.to_rfc3339_opts(SecondsFormat::Secs, true)),
                    None => format!("at {epoch_millis}ms"),
                }
            }
            InspectedTrigger::Unknown { label } => format!("unknown ({label})"),
        }
    }
}

/// Display/testing projection of one scheduled notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub id: String,
    pub channel_id: Option<String>,
    pub channel: Option<NotificationChannel>,
    pub title: String,
    pub body: String,
    pub trigger: InspectedTrigger,
}

impl From<RawScheduledEntry> for NormalizedEntry {
    fn from(raw: RawScheduledEntry) -> Self {
        let trigger = normalize_trigger(&raw.trigger);
        let channel = raw.channel_id.as_deref().and_then(NotificationChannel::from_id);
        Self {
            id: raw.id,
            channel_id: raw.channel_id,
            channel,
            title: raw.title,
            body: raw.body,
            trigger,
        }
    }
}

/// Entries of one platform query, normalized as they are pulled.
pub type NormalizedEntries =
    std::iter::Map<std::vec::IntoIter<RawScheduledEntry>, fn(RawScheduledEntry) -> NormalizedEntry>;

/// Restartable listing of the platform schedule.
///
/// The first call to [`entries`](Self::entries) reuses the query made by
/// [`ScheduleInspector::list_normalized`]. Every later call queries the
/// platform again, so entries added or removed out of band show up.
#[derive(Clone)]
pub struct NormalizedSchedule {
    platform: Arc<dyn NotificationPlatform>,
    call_timeout: Duration,
    primed: Option<Vec<RawScheduledEntry>>,
}

impl NormalizedSchedule {
    pub async fn entries(&mut self) -> Result<NormalizedEntries, QueryError> {
        let raw = match self.primed.take() {
            Some(raw) => raw,
            None => query_scheduled(self.platform.as_ref(), self.call_timeout).await?,
        };
        Ok(raw
            .into_iter()
            .map(normalize_entry as fn(RawScheduledEntry) -> NormalizedEntry))
    }
}

#[derive(Clone)]
pub struct ScheduleInspector {
    platform: Arc<dyn NotificationPlatform>,
    call_timeout: Duration,
}

impl ScheduleInspector {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self {
            platform,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Query the platform and expose its schedule in normalized form.
    #[instrument(skip(self))]
    pub async fn list_normalized(&self) -> Result<NormalizedSchedule, QueryError> {
        let entries = query_scheduled(self.platform.as_ref(), self.call_timeout).await?;
        Ok(NormalizedSchedule {
            platform: Arc::clone(&self.platform),
            call_timeout: self.call_timeout,
            primed: Some(entries),
        })
    }
}

/// One bounded `query_scheduled` call. A stalled platform yields `TimedOut`.
pub(crate) async fn query_scheduled(
    platform: &dyn NotificationPlatform,
    limit: Duration,
) -> Result<Vec<RawScheduledEntry>, QueryError> {
    let entries = timeout(limit, platform.query_scheduled())
        .await
        .unwrap_or(Err(PlatformError::TimedOut))?;
    debug!(count = entries.len(), "queried scheduled notifications");
    Ok(entries)
}

/// Map a loosely-typed platform trigger onto a [`TriggerSpec`].
///
/// Payload fields may sit at the top level or under `"value"`; both are read.
/// - `hour` + `minute` with a recurring flag (`repeats: true`, or type `daily`) is `DailyAt`
/// - `seconds` is `AfterDelay`
/// - `timestamp`, `date`, or a bare numeric `value` is `AtInstant`
///
/// Anything else is `Unknown`, labelled by its `type` when present.
pub fn normalize_trigger(raw: &Value) -> InspectedTrigger {
    let Some(fields) = raw.as_object() else {
        return unknown(if raw.is_null() { "none" } else { "malformed" });
    };
    let kind = fields.get("type").and_then(Value::as_str);

    let hour = lookup(fields, "hour").and_then(as_u32);
    let minute = lookup(fields, "minute").and_then(as_u32);
    if let (Some(hour), Some(minute)) = (hour, minute) {
        let recurring = lookup(fields, "repeats")
            .and_then(Value::as_bool)
            .unwrap_or(kind == Some("daily"));
        if recurring {
            return InspectedTrigger::Known(TriggerSpec::DailyAt { hour, minute });
        }
        return unknown(kind.unwrap_or("calendar"));
    }

    if let Some(seconds) = lookup(fields, "seconds").and_then(Value::as_u64) {
        return InspectedTrigger::Known(TriggerSpec::AfterDelay { seconds });
    }

    let timestamp = lookup(fields, "timestamp")
        .or_else(|| lookup(fields, "date"))
        .or_else(|| fields.get("value").filter(|value| value.is_number()));
    if let Some(epoch_millis) = timestamp.and_then(Value::as_i64) {
        return InspectedTrigger::Known(TriggerSpec::AtInstant { epoch_millis });
    }

    unknown(kind.unwrap_or("unknown"))
}

fn normalize_entry(raw: RawScheduledEntry) -> NormalizedEntry {
    NormalizedEntry::from(raw)
}

fn lookup<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields
        .get(name)
        .or_else(|| fields.get("value").and_then(|nested| nested.get(name)))
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|number| u32::try_from(number).ok())
}

fn unknown(label: &str) -> InspectedTrigger {
    InspectedTrigger::Unknown {
        label: label.to_string(),
    }
}
