//! In-memory collaborator doubles for driving the engine in tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use label_validate::config::EngineConfig;
use label_validate::error::ValidationError;
use label_validate::models::claim::{Claim, ClaimMatch};
use label_validate::models::finding::AnalysisResult;
use label_validate::models::queue::{QueueItem, QueueState};
use label_validate::models::report::ReportPayload;
use label_validate::services::pipeline::ValidationPipeline;
use label_validate::services::queue::ValidationQueue;
use label_validate::services::semantic::JaroWinklerMatcher;
use label_validate::sources::{
    ClaimSource, HistorySource, QueueObserver, ReportSource, ResultSink, SemanticMatcher,
    ValidationEvent, ValidationRecord,
};

static TRACING: Once = Once::new();

/// Install a process-wide test subscriber; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

fn transient(message: &str) -> ValidationError {
    ValidationError::transient(std::io::Error::new(std::io::ErrorKind::TimedOut, message.to_string()))
}

/// Report store backed by a map. Unknown ids fail with `ReportNotFound`.
pub struct StaticReportSource {
    reports: HashMap<Uuid, ReportPayload>,
}

impl StaticReportSource {
    pub fn new(reports: HashMap<Uuid, ReportPayload>) -> Self {
        Self { reports }
    }
}

#[async_trait]
impl ReportSource for StaticReportSource {
    async fn get_report(&self, report_id: Uuid) -> Result<ReportPayload, ValidationError> {
        self.reports
            .get(&report_id)
            .cloned()
            .ok_or(ValidationError::ReportNotFound(report_id))
    }
}

/// Fails with a transient error a fixed number of times, then delegates.
pub struct FlakyReportSource {
    inner: StaticReportSource,
    remaining_failures: AtomicUsize,
}

impl FlakyReportSource {
    pub fn new(reports: HashMap<Uuid, ReportPayload>, failures: usize) -> Self {
        Self {
            inner: StaticReportSource::new(reports),
            remaining_failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl ReportSource for FlakyReportSource {
    async fn get_report(&self, report_id: Uuid) -> Result<ReportPayload, ValidationError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(transient("simulated report store timeout"));
        }
        self.inner.get_report(report_id).await
    }
}

/// Report store that yields after a short sleep, to hold the pipeline
/// mid-flight while another caller probes the single-flight guard.
pub struct SlowReportSource {
    inner: StaticReportSource,
    delay: Duration,
}

impl SlowReportSource {
    pub fn new(reports: HashMap<Uuid, ReportPayload>, delay: Duration) -> Self {
        Self {
            inner: StaticReportSource::new(reports),
            delay,
        }
    }
}

#[async_trait]
impl ReportSource for SlowReportSource {
    async fn get_report(&self, report_id: Uuid) -> Result<ReportPayload, ValidationError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_report(report_id).await
    }
}

/// Claim store backed by a map; products without entries have no claims.
#[derive(Default)]
pub struct StaticClaimSource {
    claims: HashMap<Uuid, Vec<Claim>>,
}

impl StaticClaimSource {
    pub fn new(claims: HashMap<Uuid, Vec<Claim>>) -> Self {
        Self { claims }
    }
}

#[async_trait]
impl ClaimSource for StaticClaimSource {
    async fn get_claims(&self, product_id: Uuid) -> Result<Vec<Claim>, ValidationError> {
        Ok(self.claims.get(&product_id).cloned().unwrap_or_default())
    }
}

/// History store backed by a map; products without entries have no
/// history, which disables temporal detection.
#[derive(Default)]
pub struct StaticHistorySource {
    records: HashMap<Uuid, Vec<ValidationRecord>>,
}

impl StaticHistorySource {
    pub fn new(records: HashMap<Uuid, Vec<ValidationRecord>>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl HistorySource for StaticHistorySource {
    async fn get_recent_validations(
        &self,
        product_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ValidationRecord>, ValidationError> {
        let mut records = self.records.get(&product_id).cloned().unwrap_or_default();
        records.truncate(limit);
        Ok(records)
    }
}

/// Captures everything persisted and every event notified.
#[derive(Default)]
pub struct MemorySink {
    pub persisted: Mutex<Vec<(AnalysisResult, Vec<ClaimMatch>)>>,
    pub events: Mutex<Vec<ValidationEvent>>,
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(
        &self,
        result: &AnalysisResult,
        matches: &[ClaimMatch],
    ) -> Result<Uuid, ValidationError> {
        self.persisted
            .lock()
            .unwrap()
            .push((result.clone(), matches.to_vec()));
        Ok(Uuid::new_v4())
    }

    async fn notify(&self, event: ValidationEvent) -> Result<(), ValidationError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Sink whose persist always fails transiently, to exhaust retries.
#[derive(Default)]
pub struct FailingSink;

#[async_trait]
impl ResultSink for FailingSink {
    async fn persist(
        &self,
        _result: &AnalysisResult,
        _matches: &[ClaimMatch],
    ) -> Result<Uuid, ValidationError> {
        Err(transient("simulated persistence outage"))
    }

    async fn notify(&self, _event: ValidationEvent) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Records lifecycle transitions in order.
#[derive(Default)]
pub struct RecordingObserver {
    pub admitted: Mutex<Vec<Uuid>>,
    pub transitions: Mutex<Vec<(Uuid, QueueState)>>,
    pub completed: Mutex<Vec<Uuid>>,
}

impl RecordingObserver {
    pub fn states_of(&self, item_id: Uuid) -> Vec<QueueState> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == item_id)
            .map(|(_, state)| *state)
            .collect()
    }

    /// Item ids in the order they entered ANALYZING.
    pub fn processing_order(&self) -> Vec<Uuid> {
        self.transitions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, state)| *state == QueueState::Analyzing)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl QueueObserver for RecordingObserver {
    fn on_admitted(&self, item: &QueueItem) {
        self.admitted.lock().unwrap().push(item.id);
    }

    fn on_state_changed(&self, item: &QueueItem) {
        self.transitions.lock().unwrap().push((item.id, item.state));
    }

    fn on_completed(&self, item: &QueueItem, _result: &AnalysisResult) {
        self.completed.lock().unwrap().push(item.id);
    }
}

/// A fully wired queue plus handles to its doubles.
pub struct TestEngine {
    pub queue: ValidationQueue,
    pub sink: Arc<MemorySink>,
    pub observer: Arc<RecordingObserver>,
}

/// Build an engine around the given report source with default claims,
/// no history, the built-in matcher, and a recording sink/observer.
pub fn engine_with_reports(reports: Arc<dyn ReportSource>) -> TestEngine {
    engine(reports, Arc::new(StaticClaimSource::default()), Arc::new(StaticHistorySource::default()))
}

pub fn engine(
    reports: Arc<dyn ReportSource>,
    claims: Arc<dyn ClaimSource>,
    history: Arc<dyn HistorySource>,
) -> TestEngine {
    init_tracing();
    let sink = Arc::new(MemorySink::default());
    let observer = Arc::new(RecordingObserver::default());
    let semantic: Arc<dyn SemanticMatcher> = Arc::new(JaroWinklerMatcher::default());
    let pipeline = ValidationPipeline::new(
        EngineConfig::default(),
        reports,
        claims,
        history,
        semantic,
        sink.clone(),
    );
    let mut queue = ValidationQueue::new(EngineConfig::default(), pipeline);
    queue.subscribe(observer.clone());
    TestEngine {
        queue,
        sink,
        observer,
    }
}

/// Same wiring but with a failing result sink.
pub fn engine_with_failing_sink(reports: Arc<dyn ReportSource>) -> (ValidationQueue, Arc<RecordingObserver>) {
    init_tracing();
    let observer = Arc::new(RecordingObserver::default());
    let semantic: Arc<dyn SemanticMatcher> = Arc::new(JaroWinklerMatcher::default());
    let pipeline = ValidationPipeline::new(
        EngineConfig::default(),
        reports,
        Arc::new(StaticClaimSource::default()),
        Arc::new(StaticHistorySource::default()),
        semantic,
        Arc::new(FailingSink),
    );
    let mut queue = ValidationQueue::new(EngineConfig::default(), pipeline);
    queue.subscribe(observer.clone());
    (queue, observer)
}
