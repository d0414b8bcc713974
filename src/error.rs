use reqwest::StatusCode;
use thiserror::Error as ThisError;

/// Crate-wide error taxonomy.
///
/// Probe failures are retried by the health monitor until exhaustion; every
/// other variant is terminal for the operation that produced it and is
/// reported upward as a value, never thrown across the UI bridge.
#[derive(Debug, ThisError)]
pub enum CharadesError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("probe returned HTTP {0}")]
    ProbeStatus(StatusCode),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store actor is not running or its mailbox is unreachable.
    /// Distinct from [`CharadesError::Database`]: callers must treat this as
    /// a fatal precondition, not a transient storage failure.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The identity provider reported an error in the callback payload.
    #[error("identity provider error: {0}")]
    Provider(String),

    /// The callback payload was missing, malformed, or incomplete.
    #[error("callback payload extraction failed: {0}")]
    Extraction(String),

    /// A sign-in window is already live; at most one per process.
    #[error("a sign-in attempt is already in progress")]
    SignInInProgress,

    #[error("auth surface error: {0}")]
    Surface(String),
}

impl CharadesError {
    /// Short tag used in bridge payloads and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(_) | Self::ProbeStatus(_) => "probe",
            Self::Json(_) | Self::Extraction(_) => "extraction",
            Self::Url(_) => "url",
            Self::Database(_) => "storage",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Provider(_) => "provider",
            Self::SignInInProgress => "sign_in_in_progress",
            Self::Surface(_) => "surface",
        }
    }
}
