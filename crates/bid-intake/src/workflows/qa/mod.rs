//! Human-in-the-loop review of unmapped items, one ledger per import batch.

pub mod domain;
pub mod gate;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    BatchOutcome, QaAction, QaDecision, QaError, QaResolution, ResolveRequest, SkippedItem,
};
pub use gate::GateDecision;
pub use repository::{QaBatch, QaBatchView, QaRepository, RepositoryError};
pub use router::qa_router;
pub use service::{QaReviewService, QaServiceError};
