//! Relationship vocabulary: the closed set of canonical relation types,
//! their allowed source kinds, deprecated aliases, and the default-relation
//! lookup used by token fallback.
//!
//! All tables are compile-time match expressions over enum variants, so
//! adding an [`EntityKind`] or [`RelationshipType`] forces every consumer to
//! be revisited.

pub mod containment;

pub use containment::{
    CONTAINMENT_RELATIONS, allowed_parent_kinds, containment_relation, is_allowed_parent,
};

use crate::models::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical relation types. Containment relations (the `has_*` family and
/// `has_part`) are parent-to-child structural edges subject to precedence
/// rules; the rest are semantic edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    // Containment (parent -> child)
    HasPlan,
    HasTask,
    HasGoal,
    HasMilestone,
    HasDocument,
    HasPart,
    HasRisk,
    HasRequirement,
    HasMetric,
    HasSource,
    HasOutput,
    HasDecision,
    // Semantic
    /// Source advances the goal (Task/Plan/Milestone/... -> Goal)
    SupportsGoal,
    /// Source aims at the milestone (Task/Plan/Goal -> Milestone)
    TargetsMilestone,
    /// Source waits on target (Task/Plan/Milestone -> any)
    DependsOn,
    /// Generic informational link (any direction)
    References,
    /// Source yields the target artifact (Task/Plan/Milestone -> Output/...)
    Produces,
    /// Risk endangers the target (Risk -> any)
    Threatens,
    /// Source reduces the risk (Task/Plan/Requirement/Decision -> Risk)
    Mitigates,
    /// Source is written up in the target (any -> Document/Source)
    DocumentedIn,
}

impl RelationshipType {
    /// Get all relation types.
    pub fn all() -> &'static [RelationshipType] {
        &[
            RelationshipType::HasPlan,
            RelationshipType::HasTask,
            RelationshipType::HasGoal,
            RelationshipType::HasMilestone,
            RelationshipType::HasDocument,
            RelationshipType::HasPart,
            RelationshipType::HasRisk,
            RelationshipType::HasRequirement,
            RelationshipType::HasMetric,
            RelationshipType::HasSource,
            RelationshipType::HasOutput,
            RelationshipType::HasDecision,
            RelationshipType::SupportsGoal,
            RelationshipType::TargetsMilestone,
            RelationshipType::DependsOn,
            RelationshipType::References,
            RelationshipType::Produces,
            RelationshipType::Threatens,
            RelationshipType::Mitigates,
            RelationshipType::DocumentedIn,
        ]
    }

    /// Returns true if this is a containment relation.
    pub fn is_containment(&self) -> bool {
        CONTAINMENT_RELATIONS.contains(self)
    }

    /// Entity kinds legal as this relation's source. An empty slice means
    /// any direction is permitted (escape hatch for generic relations).
    pub fn allowed_source_kinds(&self) -> &'static [EntityKind] {
        use EntityKind::*;
        match self {
            RelationshipType::HasPlan => &[Project],
            RelationshipType::HasTask => &[Project, Plan, Goal, Milestone],
            RelationshipType::HasGoal => &[Project, Goal],
            RelationshipType::HasMilestone => &[Project, Plan],
            RelationshipType::HasDocument => &[Project],
            RelationshipType::HasPart => &[Document],
            RelationshipType::HasRisk => &[Project],
            RelationshipType::HasRequirement => &[Project, Plan],
            RelationshipType::HasMetric => &[Project, Goal],
            RelationshipType::HasSource => &[Project],
            RelationshipType::HasOutput => &[Project, Task],
            RelationshipType::HasDecision => &[Project, Plan],
            RelationshipType::SupportsGoal => {
                &[Task, Plan, Milestone, Requirement, Metric, Output, Decision]
            }
            RelationshipType::TargetsMilestone => &[Task, Plan, Goal],
            RelationshipType::DependsOn => &[Task, Plan, Milestone],
            RelationshipType::References => &[],
            RelationshipType::Produces => &[Task, Plan, Milestone],
            RelationshipType::Threatens => &[Risk],
            RelationshipType::Mitigates => &[Task, Plan, Requirement, Decision],
            RelationshipType::DocumentedIn => &[
                Plan,
                Task,
                Goal,
                Milestone,
                Risk,
                Requirement,
                Metric,
                Output,
                Decision,
            ],
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationshipType::HasPlan => "has_plan",
            RelationshipType::HasTask => "has_task",
            RelationshipType::HasGoal => "has_goal",
            RelationshipType::HasMilestone => "has_milestone",
            RelationshipType::HasDocument => "has_document",
            RelationshipType::HasPart => "has_part",
            RelationshipType::HasRisk => "has_risk",
            RelationshipType::HasRequirement => "has_requirement",
            RelationshipType::HasMetric => "has_metric",
            RelationshipType::HasSource => "has_source",
            RelationshipType::HasOutput => "has_output",
            RelationshipType::HasDecision => "has_decision",
            RelationshipType::SupportsGoal => "supports_goal",
            RelationshipType::TargetsMilestone => "targets_milestone",
            RelationshipType::DependsOn => "depends_on",
            RelationshipType::References => "references",
            RelationshipType::Produces => "produces",
            RelationshipType::Threatens => "threatens",
            RelationshipType::Mitigates => "mitigates",
            RelationshipType::DocumentedIn => "documented_in",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "has_plan" => Ok(RelationshipType::HasPlan),
            "has_task" => Ok(RelationshipType::HasTask),
            "has_goal" => Ok(RelationshipType::HasGoal),
            "has_milestone" => Ok(RelationshipType::HasMilestone),
            "has_document" => Ok(RelationshipType::HasDocument),
            "has_part" => Ok(RelationshipType::HasPart),
            "has_risk" => Ok(RelationshipType::HasRisk),
            "has_requirement" => Ok(RelationshipType::HasRequirement),
            "has_metric" => Ok(RelationshipType::HasMetric),
            "has_source" => Ok(RelationshipType::HasSource),
            "has_output" => Ok(RelationshipType::HasOutput),
            "has_decision" => Ok(RelationshipType::HasDecision),
            "supports_goal" => Ok(RelationshipType::SupportsGoal),
            "targets_milestone" => Ok(RelationshipType::TargetsMilestone),
            "depends_on" => Ok(RelationshipType::DependsOn),
            "references" => Ok(RelationshipType::References),
            "produces" => Ok(RelationshipType::Produces),
            "threatens" => Ok(RelationshipType::Threatens),
            "mitigates" => Ok(RelationshipType::Mitigates),
            "documented_in" => Ok(RelationshipType::DocumentedIn),
            _ => Err(format!("Unknown relationship type: {}", s)),
        }
    }
}

/// A deprecated relation token mapping to its canonical replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeprecatedAlias {
    pub canonical: RelationshipType,
    /// True when the legacy token expressed the inverse orientation.
    pub swap_direction: bool,
}

/// Look up a deprecated relation token.
pub fn deprecated_alias(token: &str) -> Option<DeprecatedAlias> {
    let alias = |canonical, swap_direction| DeprecatedAlias {
        canonical,
        swap_direction,
    };
    match token {
        // "a blocked_by b" is exactly "a depends_on b"; "a blocks b" is the
        // inverse orientation.
        "blocked_by" => Some(alias(RelationshipType::DependsOn, false)),
        "blocks" => Some(alias(RelationshipType::DependsOn, true)),
        "part_of" => Some(alias(RelationshipType::HasPart, true)),
        "contains" => Some(alias(RelationshipType::HasPart, false)),
        "related_to" => Some(alias(RelationshipType::References, false)),
        "relates_to" => Some(alias(RelationshipType::References, false)),
        "addresses" => Some(alias(RelationshipType::Mitigates, false)),
        _ => None,
    }
}

/// True when the token names a canonical relation or a deprecated alias.
pub fn is_known_token(token: &str) -> bool {
    token.parse::<RelationshipType>().is_ok() || deprecated_alias(token).is_some()
}

/// Default relation for a kind pair, used when a free-text token could not
/// be mapped. Total: every pair resolves to something, falling back to the
/// generic `references`.
pub fn default_relation(src: EntityKind, dst: EntityKind) -> RelationshipType {
    use EntityKind::*;
    match (src, dst) {
        (Task, Task) => RelationshipType::DependsOn,
        (_, Goal) if RelationshipType::SupportsGoal.allowed_source_kinds().contains(&src) => {
            RelationshipType::SupportsGoal
        }
        (_, Milestone)
            if RelationshipType::TargetsMilestone
                .allowed_source_kinds()
                .contains(&src) =>
        {
            RelationshipType::TargetsMilestone
        }
        (Risk, Plan | Task | Goal | Milestone) => RelationshipType::Threatens,
        (Task | Plan, Risk) => RelationshipType::Mitigates,
        (Task | Plan, Output) => RelationshipType::Produces,
        (_, Document | Source)
            if RelationshipType::DocumentedIn
                .allowed_source_kinds()
                .contains(&src) =>
        {
            RelationshipType::DocumentedIn
        }
        _ => RelationshipType::References,
    }
}

/// Relations the batch reorganizer may manage wholesale in `replace_auto`
/// mode: stale edges in these scopes are deleted even when no replacement
/// target was supplied this round.
pub const AUTO_MANAGED_RELATIONS: &[RelationshipType] = &[
    RelationshipType::SupportsGoal,
    RelationshipType::TargetsMilestone,
    RelationshipType::References,
    RelationshipType::Produces,
    RelationshipType::DependsOn,
];

/// Returns true if the relation is in the auto-managed set.
pub fn is_auto_managed(rel: RelationshipType) -> bool {
    AUTO_MANAGED_RELATIONS.contains(&rel)
}
