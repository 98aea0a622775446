use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Processing priority of a queued validation request. Ordering is by
/// tier: `Urgent` sorts before `High` sorts before `Normal` before `Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Urgent,
    High,
    Normal,
    Low,
}

/// Workflow state of a queue item.
///
/// `QUEUED → ANALYZING → VALIDATING → {REVIEW_REQUIRED | COMPLETED}`;
/// errors move the item back to `QUEUED` while attempts remain, otherwise
/// to `FAILED`. `REVIEW_REQUIRED`, `COMPLETED`, and `FAILED` are terminal
/// for automatic processing; a manual retry may reset `FAILED`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueState {
    Queued,
    Analyzing,
    Validating,
    ReviewRequired,
    Completed,
    Failed,
}

impl QueueState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ReviewRequired | Self::Completed | Self::Failed)
    }
}

/// A validation request admitted to the queue. Owned exclusively by the
/// queue; mutated only by its processing loop and manual operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub report_id: Uuid,
    pub product_id: Uuid,
    pub priority: Priority,
    pub state: QueueState,
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Id of the persisted analysis result, once one exists.
    pub result_id: Option<Uuid>,
}

impl QueueItem {
    pub fn new(report_id: Uuid, product_id: Uuid, priority: Priority, max_attempts: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_id,
            product_id,
            priority,
            state: QueueState::Queued,
            attempts: 0,
            max_attempts,
            last_error: None,
            created_at: Utc::now(),
            processing_started_at: None,
            completed_at: None,
            result_id: None,
        }
    }
}

/// Point-in-time view of the queue, grouped by state and priority. Used
/// for operational visibility only; eventually consistent with in-flight
/// mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSnapshot {
    pub total: usize,
    pub by_state: BTreeMap<QueueState, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
}
