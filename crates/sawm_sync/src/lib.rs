//! Orchestration atop the host notification subsystem: reconciling the desired
//! reminder schedule and inspecting what the platform currently holds.

pub mod inspect;
pub mod reconcile;

pub use crate::inspect::{
    normalize_trigger, InspectedTrigger, NormalizedEntries, NormalizedEntry, NormalizedSchedule,
    ScheduleInspector, DEFAULT_CALL_TIMEOUT,
};
pub use crate::reconcile::{
    ItemError, ItemFailure, ReconcileError, ReconcileReport, ReconcilerConfig, TriggerReconciler,
};
