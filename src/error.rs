use serde::Serialize;

/// Crate-wide error type. Every fallible function returns `Result<T, AppError>`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid demographic distribution: {0}")]
    InvalidDistribution(String),

    #[error("Focus group references no resolvable personas")]
    NoPersonas,

    #[error("Illegal state transition: {0}")]
    IllegalState(String),

    #[error("Persona synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Concept extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("LLM call timed out after {0}ms")]
    LLMTimeout(u64),

    #[error("LLM provider unavailable: {0}")]
    LLMUnavailable(String),

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Graph build failed: {0}")]
    GraphBuildFailed(String),

    #[error("{0}")]
    Internal(String),
}

/// Hand-rolled so structured logging and any cross-boundary reporting gets a
/// stable `{error, kind}` shape without deriving `Serialize` on upstream
/// library error types.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("error", &self.to_string())?;
        s.serialize_field(
            "kind",
            match self {
                AppError::Database(_) => "database",
                AppError::Pool(_) => "pool",
                AppError::NotFound(_) => "not_found",
                AppError::Validation(_) => "validation",
                AppError::Io(_) => "io",
                AppError::Serde(_) => "serde",
                AppError::InvalidDistribution(_) => "invalid_distribution",
                AppError::NoPersonas => "no_personas",
                AppError::IllegalState(_) => "illegal_state",
                AppError::SynthesisFailed(_) => "synthesis_failed",
                AppError::ExtractionFailed(_) => "extraction_failed",
                AppError::LLMTimeout(_) => "llm_timeout",
                AppError::LLMUnavailable(_) => "llm_unavailable",
                AppError::EmbeddingUnavailable(_) => "embedding_unavailable",
                AppError::PersistenceFailed(_) => "persistence_failed",
                AppError::GraphBuildFailed(_) => "graph_build_failed",
                AppError::Internal(_) => "internal",
            },
        )?;
        s.end()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
