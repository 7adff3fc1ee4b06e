/// Result alias that carries the custom [`RhythmError`] type.
pub type Result<T> = std::result::Result<T, RhythmError>;

/// Common error type for the core crate.
///
/// The scheduler and the projector never fail; invalid input there is
/// clamped. These variants only surface at the edges (config files, shared
/// engine locks, command line arguments).
#[derive(Debug, thiserror::Error)]
pub enum RhythmError {
    /// Rejected argument with a static description.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Tier name that is not one of base, div1, div2, div3.
    #[error("unknown tier `{0}`")]
    UnknownTier(String),
    /// A thread panicked while holding the named shared state.
    #[error("{0} has been poisoned")]
    Poisoned(&'static str),
    /// A background worker panicked before it could report back.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON configuration.
    #[error("config: {0}")]
    Config(#[from] serde_json::Error),
}
