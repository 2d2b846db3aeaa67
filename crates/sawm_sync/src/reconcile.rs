use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use sawm_domain::error::{PlatformError, QueryError, SchedulingError, ValidationError};
use sawm_domain::{ChannelRegistry, DesiredScheduleSet, NotificationPlatform, NotificationRequest};

use crate::inspect::{query_scheduled, InspectedTrigger, NormalizedEntry, DEFAULT_CALL_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound for each individual platform call.
    pub call_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Whole-operation failure. Per-item problems end up in [`ReconcileReport`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("a reconciliation is already in progress")]
    AlreadyRunning,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scheduling(#[from] SchedulingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub id: String,
    pub error: ItemError,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Stale ids removed from the platform.
    pub cancelled: Vec<String>,
    /// Ids scheduled fresh, including replacements of outdated entries.
    pub added: Vec<String>,
    pub unchanged: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl ReconcileReport {
    /// True when the pass found nothing to add or cancel.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.cancelled.is_empty()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|failure| failure.id.as_str()).collect()
    }

    fn fail(&mut self, id: &str, error: impl Into<ItemError>) {
        let error = error.into();
        warn!(%id, %error, "notification not reconciled");
        self.failures.push(ItemFailure {
            id: id.to_string(),
            error,
        });
    }
}

/// Brings the platform schedule in line with a [`DesiredScheduleSet`].
///
/// Passes on one reconciler are serialized: a call made while another is in
/// flight returns [`ReconcileError::AlreadyRunning`].
pub struct TriggerReconciler {
    platform: Arc<dyn NotificationPlatform>,
    channels: ChannelRegistry,
    config: ReconcilerConfig,
    in_flight: Mutex<()>,
}

impl TriggerReconciler {
    pub fn new(platform: Arc<dyn NotificationPlatform>, channels: ChannelRegistry) -> Self {
        Self {
            platform,
            channels,
            config: ReconcilerConfig::default(),
            in_flight: Mutex::new(()),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    #[instrument(skip(self, desired), fields(desired = desired.len()))]
    pub async fn reconcile(
        &self,
        desired: &DesiredScheduleSet,
    ) -> Result<ReconcileReport, ReconcileError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ReconcileError::AlreadyRunning)?;

        let live = self.live_schedule().await?;
        let mut report = ReconcileReport::default();

        for id in live.keys() {
            if desired.contains(id) {
                continue;
            }
            match self.cancel(id).await {
                Ok(()) => {
                    debug!(%id, "cancelled stale notification");
                    report.cancelled.push(id.clone());
                }
                Err(err) => report.fail(id, err),
            }
        }

        for request in desired.iter() {
            let existing = live.get(&request.id);

            if let Err(err) = request.trigger.validate() {
                // Drop whatever the platform still holds for the previous, valid version.
                if existing.is_some() {
                    match self.cancel(&request.id).await {
                        Ok(()) => report.cancelled.push(request.id.clone()),
                        Err(cancel_err) => report.fail(&request.id, cancel_err),
                    }
                }
                report.fail(&request.id, err);
                continue;
            }

            let channel_tag = self.channels.channel_tag(request.channel);
            if existing.is_some_and(|entries| matches_live(request, channel_tag, entries)) {
                report.unchanged.push(request.id.clone());
                continue;
            }

            // The platform has no in-place update; clear the id before scheduling afresh.
            if let Err(err) = self.cancel(&request.id).await {
                report.fail(&request.id, err);
                continue;
            }
            match self.schedule(request, channel_tag).await {
                Ok(()) => {
                    debug!(id = %request.id, replaced = existing.is_some(), "scheduled notification");
                    report.added.push(request.id.clone());
                }
                Err(err) => report.fail(&request.id, err),
            }
        }

        info!(
            added = report.added.len(),
            cancelled = report.cancelled.len(),
            unchanged = report.unchanged.len(),
            failed = report.failures.len(),
            "reconciliation finished"
        );
        Ok(report)
    }

    async fn live_schedule(&self) -> Result<BTreeMap<String, Vec<NormalizedEntry>>, QueryError> {
        let entries = query_scheduled(self.platform.as_ref(), self.config.call_timeout).await?;
        let mut live: BTreeMap<String, Vec<NormalizedEntry>> = BTreeMap::new();
        for entry in entries {
            let entry = NormalizedEntry::from(entry);
            live.entry(entry.id.clone()).or_default().push(entry);
        }
        Ok(live)
    }

    async fn cancel(&self, id: &str) -> Result<(), SchedulingError> {
        timeout(self.config.call_timeout, self.platform.cancel(id))
            .await
            .unwrap_or(Err(PlatformError::TimedOut))
            .map_err(|source| SchedulingError::Cancel {
                id: id.to_string(),
                source,
            })
    }

    async fn schedule(
        &self,
        request: &NotificationRequest,
        channel_tag: Option<&str>,
    ) -> Result<(), SchedulingError> {
        let trigger = request.trigger.to_raw();
        let call = self.platform.schedule(
            &request.id,
            channel_tag,
            &request.title,
            &request.body,
            &trigger,
        );
        timeout(self.config.call_timeout, call)
            .await
            .unwrap_or(Err(PlatformError::TimedOut))
            .map_err(|source| SchedulingError::Schedule {
                id: request.id.clone(),
                source,
            })
    }
}

/// A live id is up to date only when it is held exactly once and every field agrees.
fn matches_live(
    request: &NotificationRequest,
    channel_tag: Option<&str>,
    entries: &[NormalizedEntry],
) -> bool {
    match entries {
        [entry] => {
            entry.channel_id.as_deref() == channel_tag
                && entry.title == request.title
                && entry.body == request.body
                && entry.trigger == InspectedTrigger::Known(request.trigger)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sawm_domain::{NotificationChannel, TriggerSpec};

    fn request(id: &str) -> NotificationRequest {
        NotificationRequest {
            id: id.to_string(),
            channel: NotificationChannel::Reminders,
            title: "Iftar".into(),
            body: "Iftar in 15 minutes".into(),
            trigger: TriggerSpec::DailyAt { hour: 19, minute: 30 },
        }
    }

    fn live(request: &NotificationRequest, channel_id: Option<&str>) -> NormalizedEntry {
        NormalizedEntry {
            id: request.id.clone(),
            channel_id: channel_id.map(str::to_string),
            channel: channel_id.and_then(NotificationChannel::from_id),
            title: request.title.clone(),
            body: request.body.clone(),
            trigger: InspectedTrigger::Known(request.trigger),
        }
    }

    #[test]
    fn identical_entry_matches() {
        let wanted = request("iftar");
        assert!(matches_live(&wanted, Some("reminders"), &[live(&wanted, Some("reminders"))]));
    }

    #[test]
    fn any_field_difference_forces_replacement() {
        let wanted = request("iftar");
        let mut moved = live(&wanted, Some("reminders"));
        moved.trigger = InspectedTrigger::Known(TriggerSpec::DailyAt { hour: 19, minute: 31 });
        assert!(!matches_live(&wanted, Some("reminders"), &[moved]));

        let wrong_channel = live(&wanted, Some("call-to-prayer"));
        assert!(!matches_live(&wanted, Some("reminders"), &[wrong_channel]));

        let mut retitled = live(&wanted, Some("reminders"));
        retitled.title = "Maghrib".into();
        assert!(!matches_live(&wanted, Some("reminders"), &[retitled]));
    }

    #[test]
    fn duplicates_and_unknown_triggers_never_match() {
        let wanted = request("iftar");
        let entry = live(&wanted, Some("reminders"));
        assert!(!matches_live(&wanted, Some("reminders"), &[entry.clone(), entry.clone()]));

        let mut opaque = entry;
        opaque.trigger = InspectedTrigger::Unknown { label: "location".into() };
        assert!(!matches_live(&wanted, Some("reminders"), &[opaque]));
    }

    #[test]
    fn report_tracks_noop_and_failures() {
        let mut report = ReconcileReport::default();
        assert!(report.is_noop());
        report.fail("custom-0", ValidationError::HourOutOfRange(25));
        assert!(report.has_failures());
        assert_eq!(report.failed_ids(), vec!["custom-0"]);
        assert!(report.is_noop());
    }
}
