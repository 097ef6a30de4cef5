//! Built-in decision templates and recommendation taxonomies.
//!
//! Deployments can replace either list through configuration; these are the
//! definitions the engine ships with.

use crate::kind::TemplateKey;
use crate::template::{FieldType, OutputField, TemplateSpec};
use crate::tier::{TaxonomySpec, TierSpec};

pub const RECRUITMENT_TAXONOMY: &str = "recruitment";
pub const EMPLOYEE_TAXONOMY: &str = "employee_performance";

fn tier(min: i64, max: i64, label: &str, description: &str, actions: &[&str]) -> TierSpec {
    TierSpec {
        score_min: min,
        score_max: max,
        label: label.to_string(),
        description: description.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

pub fn builtin_taxonomies() -> Vec<TaxonomySpec> {
    vec![
        TaxonomySpec {
            name: RECRUITMENT_TAXONOMY.to_string(),
            tiers: vec![
                tier(
                    85,
                    100,
                    "hire",
                    "Strong match for the role",
                    &["Schedule final interview", "Prepare offer", "Run reference checks"],
                ),
                tier(
                    60,
                    84,
                    "interview",
                    "Promising candidate worth a conversation",
                    &["Schedule technical interview", "Probe skill gaps"],
                ),
                tier(
                    40,
                    59,
                    "hold",
                    "Partial match; keep in the pipeline",
                    &["Keep on file", "Revisit when requirements change"],
                ),
                tier(
                    0,
                    39,
                    "reject",
                    "Not a match for the role",
                    &["Send courteous rejection"],
                ),
            ],
        },
        TaxonomySpec {
            name: EMPLOYEE_TAXONOMY.to_string(),
            tiers: vec![
                tier(
                    90,
                    100,
                    "exceptional",
                    "Consistently outstanding performance",
                    &["Consider for promotion", "Recognise publicly", "Offer stretch assignments"],
                ),
                tier(
                    75,
                    89,
                    "exceeds_expectations",
                    "Performance above role expectations",
                    &["Discuss growth path", "Assign mentoring responsibilities"],
                ),
                tier(
                    60,
                    74,
                    "meets_expectations",
                    "Solid performance at role level",
                    &["Set development goals", "Maintain regular one-on-ones"],
                ),
                tier(
                    0,
                    59,
                    "needs_improvement",
                    "Performance below role expectations",
                    &[
                        "Create improvement plan",
                        "Schedule weekly check-ins",
                        "Identify training needs",
                    ],
                ),
            ],
        },
    ]
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn template(
    key: TemplateKey,
    description: &str,
    inputs: &[&str],
    labels: &[&str],
    extra_outputs: Vec<OutputField>,
    taxonomy: Option<&str>,
) -> TemplateSpec {
    TemplateSpec {
        key: key.as_str().to_string(),
        description: description.to_string(),
        required_inputs: names(inputs),
        labels: names(labels),
        extra_outputs,
        taxonomy: taxonomy.map(str::to_string),
    }
}

const RECRUITMENT_LABELS: &[&str] = &["hire", "interview", "hold", "reject"];
const EMPLOYEE_LABELS: &[&str] = &[
    "exceptional",
    "exceeds_expectations",
    "meets_expectations",
    "needs_improvement",
];

pub fn builtin_templates() -> Vec<TemplateSpec> {
    vec![
        template(
            TemplateKey::CandidateScreening,
            "Score a candidate against an open position",
            &["candidate_name", "resume_text", "job_title", "job_requirements"],
            RECRUITMENT_LABELS,
            vec![OutputField::optional(
                "skills_match",
                FieldType::Float { min: 0.0, max: 1.0 },
            )],
            Some(RECRUITMENT_TAXONOMY),
        ),
        template(
            TemplateKey::ResumeAnalysis,
            "Extract and rate skills from raw resume text",
            &["resume_text"],
            RECRUITMENT_LABELS,
            vec![
                OutputField::optional("years_experience", FieldType::Integer { min: 0, max: 60 }),
                OutputField::optional("skills", FieldType::TextList),
            ],
            Some(RECRUITMENT_TAXONOMY),
        ),
        template(
            TemplateKey::PerformanceReview,
            "Assess an employee's performance over a review period",
            &["employee_name", "role", "review_period", "goals_summary"],
            EMPLOYEE_LABELS,
            Vec::new(),
            Some(EMPLOYEE_TAXONOMY),
        ),
        template(
            TemplateKey::BehaviorTimeline,
            "Assess an employee from their behavioral event timeline",
            &["employee_name", "events"],
            EMPLOYEE_LABELS,
            vec![OutputField::optional("trend", FieldType::Text)],
            Some(EMPLOYEE_TAXONOMY),
        ),
        template(
            TemplateKey::AttritionRisk,
            "Estimate the likelihood that an employee leaves",
            &["employee_name", "tenure_months", "recent_events"],
            &["low", "medium", "high", "critical"],
            vec![OutputField::optional(
                "horizon_months",
                FieldType::Integer { min: 1, max: 24 },
            )],
            None,
        ),
        template(
            TemplateKey::FeatureFlagChange,
            "Assess the blast radius of a feature-flag change",
            &["flag_key", "previous_state", "new_state", "affected_modules"],
            &["safe", "review", "block"],
            vec![OutputField::optional("requires_approval", FieldType::Boolean)],
            None,
        ),
        template(
            TemplateKey::PromotionReadiness,
            "Assess an employee's readiness for a target role",
            &["employee_name", "current_role", "target_role", "achievements"],
            &["ready_now", "ready_soon", "not_ready"],
            Vec::new(),
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::TierMapper;

    #[test]
    fn builtin_catalog_covers_every_template_key_once() {
        let templates = builtin_templates();
        assert_eq!(templates.len(), TemplateKey::ALL.len());
        for key in TemplateKey::ALL {
            assert_eq!(
                templates.iter().filter(|t| t.key == key.as_str()).count(),
                1,
                "{key}"
            );
        }
    }

    #[test]
    fn both_shipped_taxonomies_have_four_tiers() {
        let mapper = TierMapper::from_specs(builtin_taxonomies()).unwrap();
        for name in [RECRUITMENT_TAXONOMY, EMPLOYEE_TAXONOMY] {
            assert_eq!(mapper.table(name).unwrap().tiers().count(), 4);
        }
    }
}
