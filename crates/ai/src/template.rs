//! Decision templates and the registry that validates them at start-up.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog;
use crate::error::{DecisionError, DecisionResult};
use crate::kind::{DecisionKind, TemplateKey};
use crate::tier::{RecommendationTier, TaxonomySpec, TierMapper};

pub const FIELD_SCORE: &str = "score";
pub const FIELD_CONFIDENCE: &str = "confidence";
pub const FIELD_DECISION: &str = "decision";
pub const FIELD_REASONS: &str = "reasons";
pub const FIELD_INSIGHTS: &str = "insights";

/// Declared type (and range) of one output field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Integer { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    /// One of the template's enumerated labels.
    Label,
    Text,
    TextList,
    Boolean,
}

/// One field of a template's output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputField {
    pub name: String,
    #[serde(flatten)]
    pub ty: FieldType,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl OutputField {
    pub fn required(name: &str, ty: FieldType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
        }
    }

    pub fn optional(name: &str, ty: FieldType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: false,
        }
    }
}

/// The five fields every decision output carries.
pub fn core_output_fields() -> Vec<OutputField> {
    vec![
        OutputField::required(FIELD_SCORE, FieldType::Integer { min: 0, max: 100 }),
        OutputField::required(FIELD_CONFIDENCE, FieldType::Float { min: 0.0, max: 1.0 }),
        OutputField::required(FIELD_DECISION, FieldType::Label),
        OutputField::required(FIELD_REASONS, FieldType::TextList),
        OutputField::required(FIELD_INSIGHTS, FieldType::TextList),
    ]
}

/// Template definition as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub key: String,
    #[serde(default)]
    pub description: String,
    pub required_inputs: Vec<String>,
    pub labels: Vec<String>,
    /// Extra output fields on top of the core five.
    #[serde(default)]
    pub extra_outputs: Vec<OutputField>,
    #[serde(default)]
    pub taxonomy: Option<String>,
}

/// Validated, immutable decision template.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTemplate {
    key: TemplateKey,
    description: String,
    required_inputs: Vec<String>,
    labels: Vec<String>,
    output: Vec<OutputField>,
    taxonomy: Option<String>,
}

impl DecisionTemplate {
    pub fn key(&self) -> TemplateKey {
        self.key
    }

    pub fn kind(&self) -> DecisionKind {
        self.key.kind()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn required_inputs(&self) -> &[String] {
        &self.required_inputs
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn allows_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// Output contract: core fields first, then template-specific extras.
    pub fn output_schema(&self) -> &[OutputField] {
        &self.output
    }

    pub fn taxonomy(&self) -> Option<&str> {
        self.taxonomy.as_deref()
    }
}

/// Read-only catalog of templates and taxonomies.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<TemplateKey, DecisionTemplate>,
    tiers: TierMapper,
}

impl TemplateRegistry {
    /// Load and validate. Tier tables are validated before any template so a
    /// broken taxonomy is always reported as `InvalidTierTable`.
    pub fn load(
        templates: impl IntoIterator<Item = TemplateSpec>,
        taxonomies: impl IntoIterator<Item = TaxonomySpec>,
    ) -> DecisionResult<Self> {
        let tiers = TierMapper::from_specs(taxonomies)?;

        let mut by_key = BTreeMap::new();
        for spec in templates {
            let template = validate_template(spec, &tiers)?;
            let key = template.key;
            if by_key.insert(key, template).is_some() {
                return Err(DecisionError::invalid_template(key.as_str(), "defined twice"));
            }
        }

        info!(
            templates = by_key.len(),
            taxonomies = tiers.taxonomies().count(),
            "decision template registry loaded"
        );

        Ok(Self {
            templates: by_key,
            tiers,
        })
    }

    /// Registry over the built-in catalog.
    pub fn builtin() -> DecisionResult<Self> {
        Self::load(catalog::builtin_templates(), catalog::builtin_taxonomies())
    }

    pub fn get(&self, key: &str) -> DecisionResult<&DecisionTemplate> {
        let key: TemplateKey = key.parse()?;
        self.get_key(key)
    }

    pub fn get_key(&self, key: TemplateKey) -> DecisionResult<&DecisionTemplate> {
        self.templates
            .get(&key)
            .ok_or_else(|| DecisionError::UnknownTemplate(key.as_str().to_string()))
    }

    pub fn templates(&self) -> impl Iterator<Item = &DecisionTemplate> {
        self.templates.values()
    }

    pub fn tiers(&self) -> &TierMapper {
        &self.tiers
    }

    pub fn map_tier(&self, score: i64, taxonomy: &str) -> DecisionResult<&RecommendationTier> {
        self.tiers.map_tier(score, taxonomy)
    }
}

fn validate_template(spec: TemplateSpec, tiers: &TierMapper) -> DecisionResult<DecisionTemplate> {
    let key: TemplateKey = spec.key.parse()?;
    let invalid = |reason: String| DecisionError::invalid_template(key.as_str(), reason);

    let required_inputs = unique_names(&spec.required_inputs, "required input")
        .map_err(invalid)?;
    let labels = unique_names(&spec.labels, "label").map_err(invalid)?;
    if labels.is_empty() {
        return Err(invalid("no decision labels declared".to_string()));
    }

    let mut output = core_output_fields();
    for extra in spec.extra_outputs {
        if extra.name.trim().is_empty() {
            return Err(invalid("output field with empty name".to_string()));
        }
        if output.iter().any(|f| f.name == extra.name) {
            return Err(invalid(format!("output field `{}` declared twice", extra.name)));
        }
        match &extra.ty {
            FieldType::Integer { min, max } if min > max => {
                return Err(invalid(format!("output field `{}` has min > max", extra.name)));
            }
            FieldType::Float { min, max }
                if !(min.is_finite() && max.is_finite() && min <= max) =>
            {
                return Err(invalid(format!("output field `{}` has invalid range", extra.name)));
            }
            _ => {}
        }
        output.push(extra);
    }

    let taxonomy = match spec.taxonomy {
        Some(name) => {
            let table = tiers.table(&name).ok_or_else(|| {
                DecisionError::invalid_tier_table(
                    &name,
                    format!("referenced by {} but not defined", key.as_str()),
                )
            })?;
            if let Some(missing) = table.labels().find(|l| !labels.iter().any(|x| x == l)) {
                return Err(invalid(format!(
                    "tier label `{missing}` of taxonomy `{name}` is not a decision label"
                )));
            }
            Some(name)
        }
        None => None,
    };

    Ok(DecisionTemplate {
        key,
        description: spec.description,
        required_inputs,
        labels,
        output,
        taxonomy,
    })
}

fn unique_names(names: &[String], what: &str) -> Result<Vec<String>, String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(format!("empty {what} name"));
        }
        if !seen.insert(trimmed.to_string()) {
            return Err(format!("duplicate {what} `{trimmed}`"));
        }
        out.push(trimmed.to_string());
    }
    Ok(out)
}
