use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use sawm_domain::memory::MemoryPlatform;
use sawm_domain::{
    compute_countdown, ChannelRegistry, Countdown, CountdownLabel, CustomReminder,
    DesiredScheduleSet, NotificationChannel, PrayerTimes, ReminderSettings, TimeOfDay,
};
use sawm_sync::{ReconcilerConfig, ScheduleInspector, TriggerReconciler};
use tracing::{debug, info, warn};

const DEFAULT_TIMES: [(&str, &str); 7] = [
    ("imsak", "04:30"),
    ("fajr", "04:40"),
    ("sunrise", "06:10"),
    ("dhuhr", "12:55"),
    ("asr", "16:30"),
    ("maghrib", "19:45"),
    ("isha", "21:10"),
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) prayer_times: Vec<(String, String)>,
    pub(crate) settings: ReminderSettings,
    pub(crate) call_timeout: Duration,
    pub(crate) countdown_ticks: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(table) = std::env::var("SAWM_PRAYER_TIMES") {
            let parsed = parse_prayer_table(&table);
            if !parsed.is_empty() {
                config.prayer_times = parsed;
            }
        }
        if let Ok(list) = std::env::var("SAWM_CUSTOM_REMINDERS") {
            config.settings.custom_reminders = parse_custom_reminders(&list);
        }
        if let Ok(list) = std::env::var("SAWM_DISABLED_CHANNELS") {
            for id in list.split(',').map(str::trim).filter(|id| !id.is_empty()) {
                match NotificationChannel::from_id(id) {
                    Some(channel) => config.settings.set_enabled(channel, false),
                    None => warn!(%id, "ignoring unknown channel in SAWM_DISABLED_CHANNELS"),
                }
            }
        }
        if let Ok(lead) = std::env::var("SAWM_SAHUR_LEAD_MINUTES") {
            if let Ok(value) = lead.trim().parse::<u32>() {
                config.settings.sahur_lead_minutes = value;
            }
        }
        if let Ok(lead) = std::env::var("SAWM_IFTAR_LEAD_MINUTES") {
            if let Ok(value) = lead.trim().parse::<u32>() {
                config.settings.iftar_lead_minutes = value;
            }
        }
        if let Ok(time) = std::env::var("SAWM_DIGEST_TIME") {
            match time.parse::<TimeOfDay>() {
                Ok(value) => config.settings.digest_time = value,
                Err(err) => warn!(%err, "ignoring SAWM_DIGEST_TIME"),
            }
        }
        if let Ok(timeout) = std::env::var("SAWM_CALL_TIMEOUT_MS") {
            if let Ok(value) = timeout.trim().parse::<u64>() {
                if value > 0 {
                    config.call_timeout = Duration::from_millis(value);
                }
            }
        }
        if let Ok(ticks) = std::env::var("SAWM_COUNTDOWN_TICKS") {
            if let Ok(value) = ticks.trim().parse::<u32>() {
                config.countdown_ticks = value;
            }
        }
        Ok(config)
    }

    pub fn prayer_times(&self) -> Result<PrayerTimes> {
        PrayerTimes::from_strings(self.prayer_times.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .context("invalid prayer times")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prayer_times: DEFAULT_TIMES
                .iter()
                .map(|(name, time)| (name.to_string(), time.to_string()))
                .collect(),
            settings: ReminderSettings::default(),
            call_timeout: ReconcilerConfig::default().call_timeout,
            countdown_ticks: 3,
        }
    }
}

/// Provision channels, reconcile today's reminders, list the resulting
/// schedule and show the live countdown for a few ticks.
pub fn run(config: AppConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(session(config))
}

async fn session(config: AppConfig) -> Result<()> {
    let times = config.prayer_times()?;
    let platform = Arc::new(MemoryPlatform::new());
    let registry = ChannelRegistry::new(platform.clone());

    if let Err(err) = registry.ensure_channels().await {
        warn!(%err, "continuing without notification channels");
    }

    let reconciler = TriggerReconciler::new(platform.clone(), registry).with_config(ReconcilerConfig {
        call_timeout: config.call_timeout,
    });
    let desired = DesiredScheduleSet::from_settings(&config.settings, &times);
    let report = reconciler
        .reconcile(&desired)
        .await
        .context("could not update reminders")?;
    info!(
        added = report.added.len(),
        cancelled = report.cancelled.len(),
        failed = report.failures.len(),
        "reminders updated"
    );
    for failure in &report.failures {
        println!("skipped {}: {}", failure.id, failure.error);
    }

    let inspector = ScheduleInspector::new(platform).with_timeout(config.call_timeout);
    let mut schedule = inspector
        .list_normalized()
        .await
        .context("could not read scheduled reminders")?;
    let entries: Vec<_> = schedule
        .entries()
        .await
        .context("could not read scheduled reminders")?
        .collect();
    println!("{} scheduled reminders", entries.len());
    for entry in entries {
        println!(
            "  {:<20} {:<20} {}",
            entry.id,
            entry.channel_id.as_deref().unwrap_or("-"),
            entry.trigger.describe()
        );
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    for _ in 0..config.countdown_ticks {
        ticker.tick().await;
        let countdown = compute_countdown(&Local::now(), &times);
        debug!(?countdown, "tick");
        println!("{}", render_countdown(&countdown));
    }
    Ok(())
}

pub(crate) fn render_countdown(countdown: &Countdown) -> String {
    match (countdown.label, countdown.clock()) {
        (CountdownLabel::ToSahur, Some(clock)) => format!("Sahur ends in {clock}"),
        (CountdownLabel::ToIftar, Some(clock)) => format!("Iftar in {clock}"),
        _ => "No fasting boundary left today".to_string(),
    }
}

/// `name=HH:MM` pairs separated by commas. Malformed pairs are skipped.
fn parse_prayer_table(input: &str) -> Vec<(String, String)> {
    input
        .split(',')
        .filter_map(|pair| {
            let (name, time) = pair.split_once('=')?;
            let (name, time) = (name.trim(), time.trim());
            if name.is_empty() || time.is_empty() {
                warn!(%pair, "ignoring malformed prayer time");
                return None;
            }
            Some((name.to_string(), time.to_string()))
        })
        .collect()
}

/// `HH:MM title` entries separated by semicolons. Hour and minute are kept
/// as written so that out-of-range values surface per item during reconciliation.
fn parse_custom_reminders(input: &str) -> Vec<CustomReminder> {
    input
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (time, title) = entry.split_once(' ').unwrap_or((entry, entry));
            let (hour, minute) = time.split_once(':')?;
            match (hour.parse::<u32>(), minute.parse::<u32>()) {
                (Ok(hour), Ok(minute)) => Some(CustomReminder::new(hour, minute, title.trim())),
                _ => {
                    warn!(%entry, "ignoring malformed custom reminder");
                    None
                }
            }
        })
        .collect()
}
