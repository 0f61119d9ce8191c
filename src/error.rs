use thiserror::Error;

/// Failures detected while validating a [`crate::config::Config`].
///
/// All of these are construction-time errors: a malformed configuration
/// aborts before a single fetch is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be a power of two, got {value}")]
    NotPowerOfTwo { field: &'static str, value: u64 },

    #[error(
        "cache geometry invalid for `{cache}`: cache_size ({cache_size}) is not a multiple of \
         associativity ({assoc}) * line_size ({line_size})"
    )]
    BadGeometry {
        cache: &'static str,
        cache_size: u32,
        assoc: u32,
        line_size: u32,
    },

    #[error("associativity {assoc} for `{cache}` exceeds the configured bound {bound}")]
    AssociativityTooLarge {
        cache: &'static str,
        assoc: u32,
        bound: u32,
    },

    #[error("{field} must be > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must be > 0, got {value}")]
    NotPositiveInt { field: &'static str, value: u64 },
}

/// Top-level error type for running the simulator end to end.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration")]
    Config(#[from] ConfigError),

    #[error("failed to read fetch trace")]
    Trace(#[from] std::io::Error),

    #[error("failed to write json report")]
    Json(#[from] serde_json::Error),

    #[error("malformed trace line {line_no}: {text:?}")]
    MalformedTraceLine { line_no: usize, text: String },
}
