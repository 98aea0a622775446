//! Stage orchestration: one validation run from report payload to
//! persisted result.
//!
//! The queue drives the two stages separately so it can expose the
//! ANALYZING/VALIDATING states; [`ValidationPipeline::run`] chains them
//! for callers that want a single synchronous-looking call. Every stage
//! is pure with respect to its inputs except for reads and writes through
//! the collaborator traits.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use garde::Validate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::models::anomaly::AnomalyReport;
use crate::models::claim::{ClaimMatch, MatchSummary};
use crate::models::finding::{AnalysisResult, RecommendedStatus};
use crate::services::analyzer::{ReportAnalysis, ReportAnalyzer};
use crate::services::matcher::ClaimMatcher;
use crate::services::rules::RuleSet;
use crate::services::scorer::{Assessment, ConfidenceScorer};
use crate::services::temporal::TemporalAnomalyDetector;
use crate::sources::{ClaimSource, HistorySource, ReportSource, ResultSink, SemanticMatcher};

const ALGORITHM: &str = "auto-validator";

/// Output of the ANALYZING stage, handed to the VALIDATING stage.
#[derive(Debug)]
pub struct StageAnalysis {
    pub analysis: ReportAnalysis,
    pub assessment: Assessment,
    started: Instant,
}

/// Final product of one validation run.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub result: AnalysisResult,
    pub status: RecommendedStatus,
    pub matches: Vec<ClaimMatch>,
    pub summary: MatchSummary,
    /// Present only when historical validations existed for the product.
    pub anomalies: Option<AnomalyReport>,
    /// Id under which the result sink stored the analysis.
    pub result_id: Uuid,
}

pub struct ValidationPipeline {
    config: EngineConfig,
    analyzer: ReportAnalyzer,
    scorer: ConfidenceScorer,
    matcher: ClaimMatcher,
    temporal: TemporalAnomalyDetector,
    reports: Arc<dyn ReportSource>,
    claims: Arc<dyn ClaimSource>,
    history: Arc<dyn HistorySource>,
    sink: Arc<dyn ResultSink>,
}

impl ValidationPipeline {
    pub fn new(
        config: EngineConfig,
        reports: Arc<dyn ReportSource>,
        claims: Arc<dyn ClaimSource>,
        history: Arc<dyn HistorySource>,
        semantic: Arc<dyn SemanticMatcher>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            analyzer: ReportAnalyzer::default(),
            scorer: ConfidenceScorer::new(&config),
            matcher: ClaimMatcher::new(semantic, &config),
            temporal: TemporalAnomalyDetector,
            config,
            reports,
            claims,
            history,
            sink,
        }
    }

    /// Replace the default rule table.
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.analyzer = ReportAnalyzer::new(rules);
        self
    }

    pub(crate) fn sink(&self) -> &Arc<dyn ResultSink> {
        &self.sink
    }

    /// ANALYZING stage: fetch the report, parse it into data points, and
    /// evaluate rules, consistency, and in-report anomalies.
    pub async fn analyze(&self, report_id: Uuid) -> Result<StageAnalysis, ValidationError> {
        let started = Instant::now();
        let payload = self.reports.get_report(report_id).await?;
        let analysis = self.analyzer.analyze(&payload)?;
        let assessment = self.scorer.assess(&analysis);

        debug!(
            %report_id,
            findings = analysis.findings.len(),
            confidence = assessment.confidence,
            status = %assessment.status,
            "analysis stage complete"
        );

        Ok(StageAnalysis {
            analysis,
            assessment,
            started,
        })
    }

    /// VALIDATING stage: match declared claims against the measurements,
    /// consult history for anomalies, and persist the finished result.
    pub async fn validate(
        &self,
        product_id: Uuid,
        stage: StageAnalysis,
    ) -> Result<ValidationOutcome, ValidationError> {
        let claims = self.claims.get_claims(product_id).await?;
        for claim in &claims {
            claim
                .validate()
                .map_err(|e| ValidationError::MalformedClaim(format!("'{}': {}", claim.name, e)))?;
        }

        let points = stage.analysis.points();
        let matches = self.matcher.match_claims(&claims, &points).await?;
        let summary = MatchSummary::tally(&matches);

        let history = self
            .history
            .get_recent_validations(product_id, self.config.history_limit)
            .await?;
        let anomalies = (!history.is_empty()).then(|| {
            self.temporal
                .detect(&stage.analysis, &claims, &matches, &history)
        });

        let result = AnalysisResult {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            algorithm: ALGORITHM.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            findings: stage.analysis.findings.clone(),
            recommendations: stage.assessment.recommendations.clone(),
            confidence: stage.assessment.confidence,
            processing_time_ms: stage.started.elapsed().as_millis() as u64,
        };

        let result_id = self.sink.persist(&result, &matches).await?;

        info!(
            %product_id,
            result_id = %result_id,
            confidence = result.confidence,
            status = %stage.assessment.status,
            validated = summary.validated,
            not_validated = summary.not_validated,
            "validation stage complete"
        );

        Ok(ValidationOutcome {
            status: stage.assessment.status,
            result,
            matches,
            summary,
            anomalies,
            result_id,
        })
    }

    /// Convenience wrapper chaining both stages.
    pub async fn run(
        &self,
        report_id: Uuid,
        product_id: Uuid,
    ) -> Result<ValidationOutcome, ValidationError> {
        let stage = self.analyze(report_id).await?;
        self.validate(product_id, stage).await
    }
}
