//! Recommendation tiers: score → discrete label + suggested actions.
//!
//! Tables are validated once when they are built. A `TierTable` value that
//! exists therefore always partitions [0, 100] without gaps or overlaps, and
//! lookup never has to handle "no tier found".

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{DecisionError, DecisionResult};

pub const SCORE_MIN: i64 = 0;
pub const SCORE_MAX: i64 = 100;

/// A labeled, inclusive score range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTier {
    pub taxonomy: String,
    pub score_min: u8,
    pub score_max: u8,
    pub label: String,
    pub description: String,
    pub actions: Vec<String>,
}

impl RecommendationTier {
    pub fn contains(&self, score: u8) -> bool {
        self.score_min <= score && score <= self.score_max
    }
}

/// Raw tier definition as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    pub score_min: i64,
    pub score_max: i64,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Raw taxonomy definition as supplied by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomySpec {
    pub name: String,
    pub tiers: Vec<TierSpec>,
}

/// Validated, immutable tier table for one taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    name: String,
    /// Tiers above the floor, ordered descending by lower bound.
    upper: Vec<RecommendationTier>,
    /// The tier starting at score 0.
    floor: RecommendationTier,
}

impl TierTable {
    pub fn from_spec(spec: TaxonomySpec) -> DecisionResult<Self> {
        let name = spec.name.trim().to_string();
        if name.is_empty() {
            return Err(DecisionError::invalid_tier_table("<unnamed>", "taxonomy name is empty"));
        }
        let fail = |reason: String| DecisionError::invalid_tier_table(&name, reason);

        let mut labels = HashSet::new();
        let mut tiers = Vec::with_capacity(spec.tiers.len());
        for t in spec.tiers {
            if t.label.trim().is_empty() {
                return Err(fail("tier with empty label".to_string()));
            }
            if !labels.insert(t.label.clone()) {
                return Err(fail(format!("duplicate tier label `{}`", t.label)));
            }
            if t.score_min > t.score_max
                || t.score_min < SCORE_MIN
                || t.score_max > SCORE_MAX
            {
                return Err(fail(format!(
                    "tier `{}` has invalid bounds [{}, {}]",
                    t.label, t.score_min, t.score_max
                )));
            }
            tiers.push(RecommendationTier {
                taxonomy: name.clone(),
                // Bounds were checked against [0, 100] just above.
                score_min: t.score_min as u8,
                score_max: t.score_max as u8,
                label: t.label,
                description: t.description,
                actions: t.actions,
            });
        }

        tiers.sort_by(|a, b| b.score_min.cmp(&a.score_min));

        let Some(top) = tiers.first() else {
            return Err(fail("no tiers defined".to_string()));
        };
        if i64::from(top.score_max) != SCORE_MAX {
            return Err(fail(format!(
                "gap: highest tier `{}` ends at {}, not {SCORE_MAX}",
                top.label, top.score_max
            )));
        }

        for pair in tiers.windows(2) {
            let (higher, lower) = (&pair[0], &pair[1]);
            let next = u16::from(lower.score_max) + 1;
            let start = u16::from(higher.score_min);
            if next < start {
                return Err(fail(format!(
                    "gap: scores {next}..{} not covered between `{}` and `{}`",
                    start - 1,
                    lower.label,
                    higher.label
                )));
            }
            if next > start {
                return Err(fail(format!(
                    "overlap: `{}` [{}, {}] overlaps `{}` [{}, {}]",
                    lower.label,
                    lower.score_min,
                    lower.score_max,
                    higher.label,
                    higher.score_min,
                    higher.score_max
                )));
            }
        }

        let floor = match tiers.pop() {
            Some(t) if t.score_min == 0 => t,
            Some(t) => {
                return Err(fail(format!(
                    "gap: lowest tier `{}` starts at {}, not {SCORE_MIN}",
                    t.label, t.score_min
                )));
            }
            None => return Err(fail("no tiers defined".to_string())),
        };

        Ok(Self {
            name,
            upper: tiers,
            floor,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tiers in descending order of lower bound.
    pub fn tiers(&self) -> impl Iterator<Item = &RecommendationTier> {
        self.upper.iter().chain(std::iter::once(&self.floor))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.tiers().map(|t| t.label.as_str())
    }

    pub fn map(&self, score: i64) -> DecisionResult<&RecommendationTier> {
        if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
            return Err(DecisionError::ScoreOutOfRange(score));
        }
        let score = score as u8;
        // Anything not claimed by an upper tier belongs to the floor tier.
        Ok(self
            .upper
            .iter()
            .find(|t| t.contains(score))
            .unwrap_or(&self.floor))
    }
}

/// All taxonomies known to the engine.
#[derive(Debug, Clone, Default)]
pub struct TierMapper {
    tables: BTreeMap<String, TierTable>,
}

impl TierMapper {
    /// Validate every taxonomy; the first defect aborts loading.
    pub fn from_specs(specs: impl IntoIterator<Item = TaxonomySpec>) -> DecisionResult<Self> {
        let mut tables = BTreeMap::new();
        for spec in specs {
            let table = TierTable::from_spec(spec)?;
            let name = table.name().to_string();
            if tables.insert(name.clone(), table).is_some() {
                return Err(DecisionError::invalid_tier_table(name, "taxonomy defined twice"));
            }
        }
        Ok(Self { tables })
    }

    pub fn table(&self, taxonomy: &str) -> Option<&TierTable> {
        self.tables.get(taxonomy)
    }

    pub fn taxonomies(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn map_tier(&self, score: i64, taxonomy: &str) -> DecisionResult<&RecommendationTier> {
        self.tables
            .get(taxonomy)
            .ok_or_else(|| DecisionError::UnknownTaxonomy(taxonomy.to_string()))?
            .map(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use proptest::prelude::*;

    fn spec(name: &str, ranges: &[(i64, i64, &str)]) -> TaxonomySpec {
        TaxonomySpec {
            name: name.to_string(),
            tiers: ranges
                .iter()
                .map(|(min, max, label)| TierSpec {
                    score_min: *min,
                    score_max: *max,
                    label: label.to_string(),
                    description: String::new(),
                    actions: Vec::new(),
                })
                .collect(),
        }
    }

    fn builtin() -> TierMapper {
        TierMapper::from_specs(catalog::builtin_taxonomies()).unwrap()
    }

    #[test]
    fn recruitment_boundaries_classify_into_declared_tiers() {
        let mapper = builtin();
        let cases = [
            (100, "hire"),
            (85, "hire"),
            (84, "interview"),
            (60, "interview"),
            (59, "hold"),
            (40, "hold"),
            (39, "reject"),
            (0, "reject"),
        ];
        for (score, label) in cases {
            let tier = mapper.map_tier(score, catalog::RECRUITMENT_TAXONOMY).unwrap();
            assert_eq!(tier.label, label, "score {score}");
        }
    }

    #[test]
    fn employee_boundaries_classify_into_declared_tiers() {
        let mapper = builtin();
        let cases = [
            (90, "exceptional"),
            (89, "exceeds_expectations"),
            (75, "exceeds_expectations"),
            (74, "meets_expectations"),
            (60, "meets_expectations"),
            (59, "needs_improvement"),
            (0, "needs_improvement"),
        ];
        for (score, label) in cases {
            let tier = mapper.map_tier(score, catalog::EMPLOYEE_TAXONOMY).unwrap();
            assert_eq!(tier.label, label, "score {score}");
        }
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        let mapper = builtin();
        assert_eq!(
            mapper.map_tier(101, catalog::RECRUITMENT_TAXONOMY),
            Err(DecisionError::ScoreOutOfRange(101))
        );
        assert_eq!(
            mapper.map_tier(-1, catalog::EMPLOYEE_TAXONOMY),
            Err(DecisionError::ScoreOutOfRange(-1))
        );
    }

    #[test]
    fn unknown_taxonomy_is_rejected() {
        assert_eq!(
            builtin().map_tier(50, "sales"),
            Err(DecisionError::UnknownTaxonomy("sales".to_string()))
        );
    }

    #[test]
    fn overlapping_ranges_fail_to_load() {
        let err = TierTable::from_spec(spec("broken", &[(0, 60, "low"), (50, 100, "high")]))
            .unwrap_err();
        match err {
            DecisionError::InvalidTierTable { taxonomy, reason } => {
                assert_eq!(taxonomy, "broken");
                assert!(reason.starts_with("overlap"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn gaps_fail_to_load() {
        let middle = TierTable::from_spec(spec("g", &[(0, 40, "low"), (50, 100, "high")]));
        let top = TierTable::from_spec(spec("g", &[(0, 40, "low"), (41, 99, "high")]));
        let bottom = TierTable::from_spec(spec("g", &[(1, 40, "low"), (41, 100, "high")]));
        for result in [middle, top, bottom] {
            assert!(matches!(result, Err(DecisionError::InvalidTierTable { .. })));
        }
    }

    #[test]
    fn malformed_tiers_fail_to_load() {
        let inverted = TierTable::from_spec(spec("m", &[(0, 100, "all"), (70, 60, "bad")]));
        let duplicate = TierTable::from_spec(spec("m", &[(0, 49, "x"), (50, 100, "x")]));
        let empty = TierTable::from_spec(spec("m", &[]));
        let beyond = TierTable::from_spec(spec("m", &[(0, 120, "all")]));
        for result in [inverted, duplicate, empty, beyond] {
            assert!(matches!(result, Err(DecisionError::InvalidTierTable { .. })));
        }
    }

    #[test]
    fn duplicate_taxonomy_names_fail_to_load() {
        let single = spec("dup", &[(0, 100, "all")]);
        assert!(matches!(
            TierMapper::from_specs([single.clone(), single]),
            Err(DecisionError::InvalidTierTable { .. })
        ));
    }

    #[test]
    fn tiers_are_exposed_in_descending_order() {
        let table = TierTable::from_spec(spec("t", &[(0, 9, "c"), (50, 100, "a"), (10, 49, "b")]))
            .unwrap();
        assert_eq!(table.labels().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    proptest! {
        #[test]
        fn every_score_maps_to_exactly_one_builtin_tier(score in 0i64..=100, recruitment in any::<bool>()) {
            let mapper = builtin();
            let taxonomy = if recruitment {
                catalog::RECRUITMENT_TAXONOMY
            } else {
                catalog::EMPLOYEE_TAXONOMY
            };
            let table = mapper.table(taxonomy).unwrap();
            let containing: Vec<_> = table.tiers().filter(|t| t.contains(score as u8)).collect();
            prop_assert_eq!(containing.len(), 1);

            let first = mapper.map_tier(score, taxonomy).unwrap();
            let second = mapper.map_tier(score, taxonomy).unwrap();
            prop_assert_eq!(first, containing[0]);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn any_contiguous_partition_loads_and_maps(
            cuts in prop::collection::btree_set(1i64..=100, 0..6),
            score in 0i64..=100,
        ) {
            let mut bounds = vec![0i64];
            bounds.extend(cuts.iter().copied());
            let mut ranges = Vec::new();
            for (i, start) in bounds.iter().enumerate() {
                let end = bounds.get(i + 1).map(|next| next - 1).unwrap_or(100);
                ranges.push((*start, end, format!("tier{i}")));
            }
            let spec = TaxonomySpec {
                name: "generated".to_string(),
                tiers: ranges
                    .iter()
                    .map(|(min, max, label)| TierSpec {
                        score_min: *min,
                        score_max: *max,
                        label: label.clone(),
                        description: String::new(),
                        actions: Vec::new(),
                    })
                    .collect(),
            };
            let table = TierTable::from_spec(spec).unwrap();
            let tier = table.map(score).unwrap();
            prop_assert!(tier.contains(score as u8));
        }
    }
}
