//! Closed set of decision kinds and template keys.
//!
//! Template keys arrive from configuration as strings, but inside the engine
//! they are an enum: every key maps to exactly one kind through an exhaustive
//! `match`, so a new key that is not wired up fails to compile.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecisionError;

/// Broad family a decision belongs to. Also selects the scoring backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Recruitment,
    Employee,
    Risk,
    Opportunity,
}

impl DecisionKind {
    pub const ALL: [DecisionKind; 4] = [
        DecisionKind::Recruitment,
        DecisionKind::Employee,
        DecisionKind::Risk,
        DecisionKind::Opportunity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Recruitment => "recruitment",
            DecisionKind::Employee => "employee",
            DecisionKind::Risk => "risk",
            DecisionKind::Opportunity => "opportunity",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a decision template.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TemplateKey {
    /// Score a candidate against an open position.
    CandidateScreening,
    /// Extract and rate skills from raw resume text.
    ResumeAnalysis,
    /// Periodic performance assessment of an employee.
    PerformanceReview,
    /// Assessment driven by an employee's behavioral event timeline.
    BehaviorTimeline,
    /// Likelihood that an employee leaves.
    AttritionRisk,
    /// Blast radius of a feature-flag change.
    FeatureFlagChange,
    /// Readiness of an employee for promotion.
    PromotionReadiness,
}

impl TemplateKey {
    pub const ALL: [TemplateKey; 7] = [
        TemplateKey::CandidateScreening,
        TemplateKey::ResumeAnalysis,
        TemplateKey::PerformanceReview,
        TemplateKey::BehaviorTimeline,
        TemplateKey::AttritionRisk,
        TemplateKey::FeatureFlagChange,
        TemplateKey::PromotionReadiness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKey::CandidateScreening => "recruitment.candidate_screening",
            TemplateKey::ResumeAnalysis => "recruitment.resume_analysis",
            TemplateKey::PerformanceReview => "employee.performance_review",
            TemplateKey::BehaviorTimeline => "employee.behavior_timeline",
            TemplateKey::AttritionRisk => "risk.attrition",
            TemplateKey::FeatureFlagChange => "risk.feature_flag_change",
            TemplateKey::PromotionReadiness => "opportunity.promotion_readiness",
        }
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            TemplateKey::CandidateScreening | TemplateKey::ResumeAnalysis => {
                DecisionKind::Recruitment
            }
            TemplateKey::PerformanceReview | TemplateKey::BehaviorTimeline => {
                DecisionKind::Employee
            }
            TemplateKey::AttritionRisk | TemplateKey::FeatureFlagChange => DecisionKind::Risk,
            TemplateKey::PromotionReadiness => DecisionKind::Opportunity,
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateKey {
    type Err = DecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DecisionError::UnknownTemplate(s.to_string()))
    }
}

impl TryFrom<String> for TemplateKey {
    type Error = DecisionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TemplateKey> for String {
    fn from(value: TemplateKey) -> Self {
        value.as_str().to_string()
    }
}
