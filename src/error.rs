use thiserror::Error;

/// Errors surfaced to the CLI boundary.
///
/// The packer itself never raises these — a failed placement attempt is
/// just `None`. `Infeasible` is raised one layer up, when an order line
/// can't be placed on an empty pallet at all.
#[derive(Debug, Error)]
pub enum CasePickingError {
    #[error("{file}:{row}: {reason}")]
    InputMalformed {
        file: String,
        row: usize,
        reason: String,
    },

    #[error("no feasible packing for order line at location {location} (code {code})")]
    Infeasible { code: String, location: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// A broken internal invariant (pallet not found for removal, pointer
    /// mismatch). Reimplementations should `panic!` with these rather than
    /// propagate them — they indicate a bug, not a recoverable condition.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, CasePickingError>;
