use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Failed to read memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Pattern is empty")]
    EmptyPattern,

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Pattern too long: {length} bytes (maximum {max})")]
    PatternTooLong { length: usize, max: usize },

    #[error("Hook '{hook}' failed: {status}")]
    Detour { hook: String, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
