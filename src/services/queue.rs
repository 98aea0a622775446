//! Priority validation queue with a retry state machine.
//!
//! Admission keeps the queue in priority-tier order (URGENT splices to
//! the front); processing is single-flight: at most one item is
//! mid-pipeline per queue instance, which keeps retries and state
//! transitions race-free without per-item locking. The internal list is
//! the only mutable shared state in the engine and is touched exclusively
//! by `enqueue`, `process_next`, `cancel`, and `retry`, each under one
//! short lock; the lock is never held across an await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::queue::{Priority, QueueItem, QueueSnapshot, QueueState};
use crate::services::pipeline::{ValidationOutcome, ValidationPipeline};
use crate::sources::{QueueObserver, ValidationEvent};

pub struct ValidationQueue {
    config: EngineConfig,
    pipeline: ValidationPipeline,
    observers: Vec<Arc<dyn QueueObserver>>,
    items: Mutex<Vec<QueueItem>>,
    in_flight: AtomicBool,
}

/// Clears the single-flight flag when a processing cycle ends, including
/// on early return.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ValidationQueue {
    pub fn new(config: EngineConfig, pipeline: ValidationPipeline) -> Self {
        Self {
            config,
            pipeline,
            observers: Vec::new(),
            items: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Register a lifecycle observer. Call before sharing the queue.
    pub fn subscribe(&mut self, observer: Arc<dyn QueueObserver>) {
        self.observers.push(observer);
    }

    /// Admit a validation request. Never blocks on processing; returns
    /// the new item's id.
    pub fn enqueue(&self, report_id: Uuid, product_id: Uuid, priority: Priority) -> Uuid {
        let item = QueueItem::new(report_id, product_id, priority, self.config.max_attempts);
        let id = item.id;
        let admitted = item.clone();

        {
            let mut items = self.items.lock().expect("queue lock poisoned");
            if priority == Priority::Urgent {
                items.insert(0, item);
            } else {
                items.push(item);
                // Stable sort: arrival order survives within a tier.
                items.sort_by_key(|i| i.priority);
            }
        }

        counter!("validation_queue_admitted_total").increment(1);
        info!(item_id = %id, %report_id, %product_id, priority = %priority, "validation queued");

        for observer in &self.observers {
            observer.on_admitted(&admitted);
        }
        id
    }

    /// Run one processing cycle: pick the first QUEUED item with attempts
    /// remaining and drive it through the pipeline. No-op (returns false)
    /// when the queue is idle or a cycle is already running.
    pub async fn process_next(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let _guard = FlightGuard(&self.in_flight);

        let Some(mut item) = self.begin_next() else {
            return false;
        };

        info!(
            item_id = %item.id,
            report_id = %item.report_id,
            attempt = item.attempts,
            "processing validation"
        );
        self.notify_state(&item);

        let started = std::time::Instant::now();
        let outcome = self.drive(&mut item).await;
        histogram!("validation_pipeline_duration_seconds").record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(outcome) => self.settle_success(item, outcome).await,
            Err(err) => self.settle_error(item, err).await,
        }
        true
    }

    /// Background loop: wake on the configured cadence and run one cycle.
    /// Tests call [`process_next`](Self::process_next) directly instead.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));
        loop {
            ticker.tick().await;
            self.process_next().await;
        }
    }

    /// Remove a not-yet-started item. Returns false for anything already
    /// picked up; in-flight work is never interrupted.
    pub fn cancel(&self, item_id: Uuid) -> bool {
        let mut items = self.items.lock().expect("queue lock poisoned");
        let Some(idx) = items
            .iter()
            .position(|i| i.id == item_id && i.state == QueueState::Queued)
        else {
            return false;
        };
        items.remove(idx);
        drop(items);
        info!(item_id = %item_id, "queued validation cancelled");
        true
    }

    /// Re-admit a terminally failed item with a fresh attempt budget.
    pub fn retry(&self, item_id: Uuid) -> bool {
        let changed = {
            let mut items = self.items.lock().expect("queue lock poisoned");
            items
                .iter_mut()
                .find(|i| i.id == item_id && i.state == QueueState::Failed)
                .map(|item| {
                    item.state = QueueState::Queued;
                    item.attempts = 0;
                    item.last_error = None;
                    item.clone()
                })
        };
        match changed {
            Some(item) => {
                info!(item_id = %item_id, "failed validation re-queued");
                self.notify_state(&item);
                true
            }
            None => false,
        }
    }

    /// Counts grouped by state and priority. Eventually consistent with
    /// in-flight mutation; for dashboards, not correctness.
    pub fn status(&self) -> QueueSnapshot {
        let items = self.items.lock().expect("queue lock poisoned");
        let mut snapshot = QueueSnapshot {
            total: items.len(),
            ..QueueSnapshot::default()
        };
        for item in items.iter() {
            *snapshot.by_state.entry(item.state).or_default() += 1;
            *snapshot.by_priority.entry(item.priority).or_default() += 1;
        }
        snapshot
    }

    /// Look up an item by id. FAILED and REVIEW_REQUIRED items remain
    /// queryable until retried or resolved externally.
    pub fn item(&self, item_id: Uuid) -> Option<QueueItem> {
        let items = self.items.lock().expect("queue lock poisoned");
        items.iter().find(|i| i.id == item_id).cloned()
    }

    // ── internals ────────────────────────────────────────────────────

    /// Claim the next eligible item: first QUEUED entry with attempts
    /// remaining, already in priority order.
    fn begin_next(&self) -> Option<QueueItem> {
        let mut items = self.items.lock().expect("queue lock poisoned");
        let item = items
            .iter_mut()
            .find(|i| i.state == QueueState::Queued && i.attempts < i.max_attempts)?;
        item.attempts += 1;
        item.state = QueueState::Analyzing;
        item.processing_started_at = Some(Utc::now());
        Some(item.clone())
    }

    async fn drive(
        &self,
        item: &mut QueueItem,
    ) -> Result<ValidationOutcome, crate::error::ValidationError> {
        let stage = self.pipeline.analyze(item.report_id).await?;

        self.transition(item, QueueState::Validating);
        self.pipeline.validate(item.product_id, stage).await
    }

    /// Apply a state change both to the stored item and the working copy,
    /// then fan out to observers.
    fn transition(&self, item: &mut QueueItem, state: QueueState) {
        item.state = state;
        {
            let mut items = self.items.lock().expect("queue lock poisoned");
            if let Some(stored) = items.iter_mut().find(|i| i.id == item.id) {
                stored.state = state;
            }
        }
        self.notify_state(item);
    }

    async fn settle_success(&self, mut item: QueueItem, outcome: ValidationOutcome) {
        use crate::models::finding::RecommendedStatus;

        item.result_id = Some(outcome.result_id);

        // A failed data point (REJECTED) overrides a high confidence
        // score; only APPROVED and PARTIAL outcomes finalize
        // automatically.
        let auto_finalize = matches!(
            outcome.status,
            RecommendedStatus::Approved | RecommendedStatus::Partial
        );

        if auto_finalize {
            item.completed_at = Some(Utc::now());
            item.state = QueueState::Completed;
            {
                let mut items = self.items.lock().expect("queue lock poisoned");
                items.retain(|i| i.id != item.id);
            }
            counter!("validation_queue_completed_total").increment(1);
            info!(
                item_id = %item.id,
                confidence = outcome.result.confidence,
                status = %outcome.status,
                "validation completed"
            );
            self.notify_state(&item);
            for observer in &self.observers {
                observer.on_completed(&item, &outcome.result);
            }
            self.notify_sink(ValidationEvent::Completed {
                item_id: item.id,
                product_id: item.product_id,
                result_id: outcome.result_id,
                confidence: outcome.result.confidence,
            })
            .await;
        } else {
            {
                let mut items = self.items.lock().expect("queue lock poisoned");
                if let Some(stored) = items.iter_mut().find(|i| i.id == item.id) {
                    stored.state = QueueState::ReviewRequired;
                    stored.result_id = Some(outcome.result_id);
                }
            }
            item.state = QueueState::ReviewRequired;
            counter!("validation_queue_review_required_total").increment(1);
            warn!(
                item_id = %item.id,
                confidence = outcome.result.confidence,
                status = %outcome.status,
                "validation requires manual review"
            );
            self.notify_state(&item);
            self.notify_sink(ValidationEvent::ReviewRequired {
                item_id: item.id,
                product_id: item.product_id,
                result_id: outcome.result_id,
                confidence: outcome.result.confidence,
            })
            .await;
        }
    }

    async fn settle_error(&self, mut item: QueueItem, err: crate::error::ValidationError) {
        let retry = err.is_retryable() && item.attempts < item.max_attempts;
        let message = err.to_string();

        {
            let mut items = self.items.lock().expect("queue lock poisoned");
            if let Some(stored) = items.iter_mut().find(|i| i.id == item.id) {
                stored.last_error = Some(message.clone());
                stored.state = if retry {
                    QueueState::Queued
                } else {
                    QueueState::Failed
                };
            }
        }
        item.last_error = Some(message.clone());
        item.state = if retry {
            QueueState::Queued
        } else {
            QueueState::Failed
        };

        if retry {
            counter!("validation_queue_retries_total").increment(1);
            warn!(
                item_id = %item.id,
                attempt = item.attempts,
                error = %message,
                "validation attempt failed, re-queued"
            );
        } else {
            counter!("validation_queue_failed_total").increment(1);
            error!(
                item_id = %item.id,
                attempts = item.attempts,
                error = %message,
                "validation failed terminally"
            );
            self.notify_sink(ValidationEvent::Failed {
                item_id: item.id,
                product_id: item.product_id,
                attempts: item.attempts,
                error: message,
            })
            .await;
        }
        self.notify_state(&item);
    }

    fn notify_state(&self, item: &QueueItem) {
        for observer in &self.observers {
            observer.on_state_changed(item);
        }
    }

    /// Terminal events carry no delivery guarantee; a sink failure here
    /// is logged and dropped.
    async fn notify_sink(&self, event: ValidationEvent) {
        if let Err(err) = self.pipeline.sink().notify(event).await {
            warn!(error = %err, "result sink notification failed");
        }
    }
}
