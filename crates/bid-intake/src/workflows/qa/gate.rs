use serde::Serialize;

use super::domain::QaResolution;
use crate::workflows::report::ImportReport;

/// Whether a batch may move on to quantity write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateDecision {
    Open {
        acknowledged: bool,
        residual_unresolved: usize,
    },
    Blocked {
        unresolved: usize,
    },
}

impl GateDecision {
    /// Blocks only while unresolved items remain and nobody acknowledged
    /// the batch.
    pub fn evaluate(report: &ImportReport, resolution: &QaResolution) -> Self {
        let unresolved = resolution.unresolved_count(report);
        let acknowledged = resolution.is_acknowledged();

        if unresolved == 0 || acknowledged {
            Self::Open {
                acknowledged,
                residual_unresolved: unresolved,
            }
        } else {
            Self::Blocked { unresolved }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}
