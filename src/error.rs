use thiserror::Error;

/// Host-side fallibility boundary. Never returned by a DOS/BIOS service
/// handler — those encode failure in CPU registers/flags or log and
/// swallow it, per the register-in/register-out discipline translated
/// code expects.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to allocate {0} bytes for CPU memory")]
    MemoryAllocation(usize),

    #[error("cannot open '{0}': {1}")]
    Io(String, #[source] std::io::Error),

    #[error("invalid MZ executable: {0}")]
    InvalidExe(String),

    #[error("binary too large for memory (addr=0x{addr:X}, size={size})")]
    ImageTooLarge { addr: usize, size: usize },
}

pub type CoreResult<T> = Result<T, CoreError>;
