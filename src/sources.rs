//! Collaborator contracts implemented by the surrounding service layer.
//!
//! The engine owns no persistence, storage, or delivery mechanism; every
//! side effect goes through one of these traits. Implementations map
//! their own failures into [`ValidationError`], which is what lets the
//! queue distinguish retryable trouble from bad input.

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::claim::{Claim, ClaimMatch};
use crate::models::finding::AnalysisResult;
use crate::models::queue::QueueItem;
use crate::models::report::{DataPoint, ReportPayload};

/// Supplies structured laboratory report payloads.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the report. Fails with [`ValidationError::ReportNotFound`]
    /// if no such report exists.
    async fn get_report(&self, report_id: Uuid) -> Result<ReportPayload, ValidationError>;
}

/// Supplies the declared claims for a product, already extracted and
/// structured by the external claim-extraction service.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn get_claims(&self, product_id: Uuid) -> Result<Vec<Claim>, ValidationError>;
}

/// One past validation of a product: the persisted analysis result plus
/// the claim matches it produced.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationRecord {
    pub result: AnalysisResult,
    pub matches: Vec<ClaimMatch>,
}

/// Supplies a product's validation history, most recent first. Consumed
/// only by the temporal anomaly detector.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn get_recent_validations(
        &self,
        product_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ValidationRecord>, ValidationError>;
}

/// A candidate pairing of a claim with a report data point.
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub data_point: DataPoint,
    /// Match confidence in 0-1.
    pub confidence: f64,
    pub remarks: String,
}

/// Finds the report data point that best substantiates a claim.
///
/// Treated as a black box: any implementation (string similarity,
/// embedding search, or a remote model call) is conformant as long as it
/// is deterministic enough to be safely retried.
#[async_trait]
pub trait SemanticMatcher: Send + Sync {
    async fn best_match(
        &self,
        claim: &Claim,
        data_points: &[DataPoint],
    ) -> Result<Option<SemanticMatch>, ValidationError>;
}

/// Terminal queue events, pushed through [`ResultSink::notify`] for
/// dashboards and alerting.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationEvent {
    Completed {
        item_id: Uuid,
        product_id: Uuid,
        result_id: Uuid,
        confidence: u8,
    },
    ReviewRequired {
        item_id: Uuid,
        product_id: Uuid,
        result_id: Uuid,
        confidence: u8,
    },
    Failed {
        item_id: Uuid,
        product_id: Uuid,
        attempts: u32,
        error: String,
    },
}

/// Receives finished work. A `persist` failure is a pipeline-step failure
/// and triggers the queue's retry path; `notify` carries no delivery
/// guarantee and its errors are logged and dropped.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Persist a completed analysis and its claim matches, returning the
    /// id under which the result was stored.
    async fn persist(
        &self,
        result: &AnalysisResult,
        matches: &[ClaimMatch],
    ) -> Result<Uuid, ValidationError>;

    async fn notify(&self, event: ValidationEvent) -> Result<(), ValidationError>;
}

/// Fire-and-forget hooks into queue lifecycle transitions. Used for
/// dashboards and alerts, never for correctness; implementations must not
/// block.
pub trait QueueObserver: Send + Sync {
    fn on_admitted(&self, _item: &QueueItem) {}
    fn on_state_changed(&self, _item: &QueueItem) {}
    fn on_completed(&self, _item: &QueueItem, _result: &AnalysisResult) {}
}
