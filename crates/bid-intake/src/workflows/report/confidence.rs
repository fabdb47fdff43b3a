use super::views::{ConfidenceTier, MissingRequirement};
use crate::workflows::taxonomy::{
    AnchorGroup, CanonicalLine, IntentTarget, ANCHOR_GROUPS, REQUIRED_ANCHORS,
};

pub const UNMAPPED_CEILING: usize = 5;

/// Controls for the confidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPolicy {
    /// Unmapped rows tolerated before an import is LOW regardless of anchors.
    pub unmapped_ceiling: usize,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            unmapped_ceiling: UNMAPPED_CEILING,
        }
    }
}

/// Anchor requirements not satisfied by `targets`. A missing group counts
/// once no matter how many members it has.
pub fn missing_requirements<'a, I>(targets: I) -> Vec<MissingRequirement>
where
    I: IntoIterator<Item = &'a IntentTarget>,
{
    missing_requirements_against(targets, REQUIRED_ANCHORS, ANCHOR_GROUPS)
}

fn missing_requirements_against<'a, I>(
    targets: I,
    anchors: &[CanonicalLine],
    groups: &[AnchorGroup],
) -> Vec<MissingRequirement>
where
    I: IntoIterator<Item = &'a IntentTarget>,
{
    let targets: Vec<&IntentTarget> = targets.into_iter().collect();
    let present = |line: &CanonicalLine| targets.iter().any(|target| line.matches(target));

    let mut missing: Vec<MissingRequirement> = anchors
        .iter()
        .filter(|anchor| !present(*anchor))
        .map(|anchor| MissingRequirement::Anchor { line: *anchor })
        .collect();

    missing.extend(
        groups
            .iter()
            .filter(|group| !group.members.iter().any(|member| present(member)))
            .map(|group| MissingRequirement::Group {
                name: group.name,
                members: group.members.to_vec(),
            }),
    );

    missing
}

pub fn confidence_tier(
    unmapped_rows: usize,
    missing_requirements: usize,
    policy: ReportPolicy,
) -> ConfidenceTier {
    if unmapped_rows > policy.unmapped_ceiling || missing_requirements >= 2 {
        ConfidenceTier::Low
    } else if unmapped_rows == 0 && missing_requirements == 0 {
        ConfidenceTier::High
    } else {
        ConfidenceTier::Medium
    }
}
