mod confidence;
mod summary;
pub mod views;

pub use confidence::{confidence_tier, missing_requirements, ReportPolicy, UNMAPPED_CEILING};
pub use summary::{ImportReport, ReportBuilder};
pub use views::{
    item_key, ConfidenceTier, IgnoredReason, IgnoredRow, ImportSummary, MappedField,
    MissingRequirement, QuantityLine, Suggestion, UnmappedField, UnmappedReason,
};
