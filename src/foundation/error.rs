/// Convenience result type used across coursereel.
pub type CompositorResult<T> = Result<T, CompositorError>;

/// Top-level error taxonomy used by compositor APIs.
///
/// Some variants are recoverable inside a render (the orchestrator logs them and degrades);
/// see [`CompositorError::is_recoverable`].
#[derive(thiserror::Error, Debug)]
pub enum CompositorError {
    /// Missing engine, missing inputs or invalid options. Fatal before any rendering.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed timeline or script data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Asset directory or placeholder synthesis problems.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// The crossfade graph was rejected by the engine.
    #[error("transition error: {0}")]
    Transition(String),

    /// A single segment clip failed to render.
    #[error("segment {segment_id} render error: {message}")]
    SegmentRender {
        /// Segment whose clip failed.
        segment_id: u32,
        /// Engine diagnostic.
        message: String,
    },

    /// Duration reconciliation could not be computed or applied.
    #[error("reconciliation error: {0}")]
    Reconciliation(String),

    /// Final mux with the authoritative source failed.
    #[error("mux error: {0}")]
    Mux(String),

    /// An engine invocation could not be spawned or exited unsuccessfully.
    #[error("engine error: {0}")]
    Engine(String),

    /// An engine invocation ran past its time budget and was killed.
    #[error("engine timeout: {operation} exceeded {secs}s")]
    Timeout {
        /// Engine operation name.
        operation: String,
        /// Budget that was exceeded, in seconds.
        secs: u64,
    },

    /// The run was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CompositorError {
    /// Build a [`CompositorError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`CompositorError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CompositorError::Resolution`] value.
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Build a [`CompositorError::Transition`] value.
    pub fn transition(msg: impl Into<String>) -> Self {
        Self::Transition(msg.into())
    }

    /// Build a [`CompositorError::SegmentRender`] value.
    pub fn segment_render(segment_id: u32, msg: impl Into<String>) -> Self {
        Self::SegmentRender {
            segment_id,
            message: msg.into(),
        }
    }

    /// Build a [`CompositorError::Reconciliation`] value.
    pub fn reconciliation(msg: impl Into<String>) -> Self {
        Self::Reconciliation(msg.into())
    }

    /// Build a [`CompositorError::Mux`] value.
    pub fn mux(msg: impl Into<String>) -> Self {
        Self::Mux(msg.into())
    }

    /// Build a [`CompositorError::Engine`] value.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Build a [`CompositorError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for failures the orchestrator degrades around instead of aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Resolution(_) | Self::Transition(_) | Self::SegmentRender { .. }
        )
    }
}

impl From<serde_json::Error> for CompositorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
