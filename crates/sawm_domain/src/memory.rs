//! In-process stand-in for the host notification subsystem.
//!
//! Used by the desktop host and by tests. It behaves like a mobile scheduler:
//! entries are keyed by id, re-scheduling an id replaces it, and cancelling an
//! unknown id succeeds. Failures and out-of-band changes can be injected.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::channels::ChannelAttributes;
use crate::error::PlatformError;
use crate::notifications::{NotificationPlatform, RawScheduledEntry, RawTrigger};

/// How triggers are reported back from `query_scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerReporting {
    /// Exactly as scheduled.
    #[default]
    Flat,
    /// Payload fields moved under a `"value"` key, as some platforms report them.
    Nested,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCalls {
    pub queries: usize,
    pub schedules: usize,
    pub cancels: usize,
    pub channel_updates: usize,
}

#[derive(Default)]
struct MemoryState {
    scheduled: BTreeMap<String, RawScheduledEntry>,
    channels: BTreeMap<String, ChannelAttributes>,
    failing_ids: HashSet<String>,
    fail_queries: bool,
    fail_channels: bool,
    calls: PlatformCalls,
}

pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
    channels_supported: bool,
    reporting: TriggerReporting,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            channels_supported: true,
            reporting: TriggerReporting::Flat,
        }
    }

    /// A platform that delivers notifications without channel grouping.
    pub fn without_channels(mut self) -> Self {
        self.channels_supported = false;
        self
    }

    pub fn with_reporting(mut self, reporting: TriggerReporting) -> Self {
        self.reporting = reporting;
        self
    }

    /// Make every schedule and cancel for `id` fail until cleared.
    pub fn fail_id(&self, id: impl Into<String>) {
        self.state.lock().failing_ids.insert(id.into());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_ids.clear();
        state.fail_queries = false;
        state.fail_channels = false;
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.lock().fail_queries = fail;
    }

    pub fn fail_channel_updates(&self, fail: bool) {
        self.state.lock().fail_channels = fail;
    }

    /// Drop an entry behind the application's back (user dismissal, OS cleanup).
    pub fn remove_externally(&self, id: &str) -> bool {
        self.state.lock().scheduled.remove(id).is_some()
    }

    /// Place an entry the application did not schedule, e.g. left over from a previous install.
    pub fn insert_externally(&self, entry: RawScheduledEntry) {
        self.state.lock().scheduled.insert(entry.id.clone(), entry);
    }

    pub fn channels(&self) -> BTreeMap<String, ChannelAttributes> {
        self.state.lock().channels.clone()
    }

    pub fn scheduled_ids(&self) -> Vec<String> {
        self.state.lock().scheduled.keys().cloned().collect()
    }

    pub fn calls(&self) -> PlatformCalls {
        self.state.lock().calls
    }

    fn report(&self, entry: &RawScheduledEntry) -> RawScheduledEntry {
        match self.reporting {
            TriggerReporting::Flat => entry.clone(),
            TriggerReporting::Nested => RawScheduledEntry {
                trigger: nest_trigger(&entry.trigger),
                ..entry.clone()
            },
        }
    }
}

#[async_trait]
impl NotificationPlatform for MemoryPlatform {
    fn supports_channels(&self) -> bool {
        self.channels_supported
    }

    async fn query_scheduled(&self) -> Result<Vec<RawScheduledEntry>, PlatformError> {
        let mut state = self.state.lock();
        state.calls.queries += 1;
        if state.fail_queries {
            return Err(PlatformError::Unavailable("scheduler not reachable".into()));
        }
        Ok(state.scheduled.values().map(|entry| self.report(entry)).collect())
    }

    async fn schedule(
        &self,
        id: &str,
        channel_id: Option<&str>,
        title: &str,
        body: &str,
        trigger: &RawTrigger,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.schedules += 1;
        if state.failing_ids.contains(id) {
            return Err(PlatformError::Rejected(format!("`{id}` refused by scheduler")));
        }
        let channel_id = channel_id
            .filter(|_| self.channels_supported)
            .map(str::to_string);
        state.scheduled.insert(
            id.to_string(),
            RawScheduledEntry {
                id: id.to_string(),
                channel_id,
                title: title.to_string(),
                body: body.to_string(),
                trigger: trigger.clone(),
            },
        );
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.cancels += 1;
        if state.failing_ids.contains(id) {
            return Err(PlatformError::Rejected(format!("`{id}` could not be cancelled")));
        }
        state.scheduled.remove(id);
        Ok(())
    }

    async fn create_or_update_channel(
        &self,
        channel_id: &str,
        attributes: &ChannelAttributes,
    ) -> Result<(), PlatformError> {
        let mut state = self.state.lock();
        state.calls.channel_updates += 1;
        if !self.channels_supported {
            return Err(PlatformError::Unavailable("channels not supported".into()));
        }
        if state.fail_channels {
            return Err(PlatformError::Rejected(format!("channel `{channel_id}` refused")));
        }
        state
            .channels
            .insert(channel_id.to_string(), attributes.clone());
        Ok(())
    }
}

fn nest_trigger(raw: &Value) -> Value {
    let Some(fields) = raw.as_object() else {
        return raw.clone();
    };
    let mut outer = Map::new();
    let mut inner = Map::new();
    for (key, value) in fields {
        match key.as_str() {
            "type" | "repeats" => outer.insert(key.clone(), value.clone()),
            _ => inner.insert(key.clone(), value.clone()),
        };
    }
    let value = match inner.remove("timestamp") {
        Some(timestamp) if inner.is_empty() => timestamp,
        Some(timestamp) => {
            inner.insert("timestamp".into(), timestamp);
            Value::Object(inner)
        }
        None => Value::Object(inner),
    };
    outer.insert("value".into(), value);
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_reporting_moves_payload_under_value() {
        let daily = nest_trigger(&json!({"type": "daily", "hour": 4, "minute": 0, "repeats": true}));
        assert_eq!(daily, json!({"type": "daily", "repeats": true, "value": {"hour": 4, "minute": 0}}));

        let date = nest_trigger(&json!({"type": "date", "timestamp": 1_700_000_000_000_i64}));
        assert_eq!(date, json!({"type": "date", "value": 1_700_000_000_000_i64}));
    }

    #[tokio::test]
    async fn rescheduling_an_id_supersedes_it() {
        let platform = MemoryPlatform::new();
        let trigger = json!({"type": "timeInterval", "seconds": 60, "repeats": false});
        platform
            .schedule("a", Some("reminders"), "first", "body", &trigger)
            .await
            .unwrap();
        platform
            .schedule("a", Some("reminders"), "second", "body", &trigger)
            .await
            .unwrap();
        let entries = platform.query_scheduled().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "second");
    }

    #[tokio::test]
    async fn channel_less_platform_drops_channel_tag() {
        let platform = MemoryPlatform::new().without_channels();
        platform
            .schedule("a", Some("reminders"), "t", "b", &json!({}))
            .await
            .unwrap();
        let entries = platform.query_scheduled().await.unwrap();
        assert_eq!(entries[0].channel_id, None);
    }
}
