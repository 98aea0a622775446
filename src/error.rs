use uuid::Uuid;

/// Failure taxonomy for the validation pipeline.
///
/// Business-rule violations (a failed data point, an unsubstantiated
/// claim) are data, not errors; only genuine inability to complete a
/// pipeline step surfaces here. The queue is the sole place that decides
/// retry versus terminal failure, based on [`ValidationError::is_retryable`].
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The referenced report does not exist at the report source.
    #[error("report {0} not found")]
    ReportNotFound(Uuid),

    /// The report payload is structurally unusable. Not retried; retrying
    /// cannot repair the input.
    #[error("malformed report payload: {0}")]
    MalformedReport(String),

    /// A declared claim is structurally unusable. Same handling as a
    /// malformed report, but the defect lies in the claims feed.
    #[error("malformed claim: {0}")]
    MalformedClaim(String),

    /// I/O or timeout failure from a collaborator. Retried up to the
    /// configured attempt limit.
    #[error("transient collaborator failure: {0}")]
    Transient(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A broken internal invariant (e.g. a confidence outside 0..=100).
    /// Treated as a defect: logged and failed without retry.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl ValidationError {
    /// Wrap a collaborator error as a retryable transient failure.
    pub fn transient<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transient(Box::new(err))
    }

    /// Whether the queue should re-attempt the item after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
