use thiserror::Error;

/// Fatal error kinds the engine surfaces to its host (spec §7).
///
/// Non-fatal conditions (capacity warnings, GPU/CPU consistency
/// mismatches) are not represented here — they are logged through
/// `log::warn!`/`log::error!` so they survive independently of
/// whatever sink a fatal error is written to.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("error opening {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("OpenCL error: {0}")]
    Device(#[from] ocl::Error),

    #[error("failed to build OpenCL kernel program:\n{0}")]
    KernelBuild(String),

    #[error("{0}")]
    NoDevices(String),
}

pub type Result<T> = std::result::Result<T, FinderError>;
