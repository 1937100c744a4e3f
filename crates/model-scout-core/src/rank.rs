use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{Result, ScoutError};
use crate::fit::{Candidate, FitTier};
use crate::model::{normalize_name, UseCase, UseCaseFilter};

pub const DEFAULT_TOP_N: i64 = 15;

/// Check a requested list length before any work is done with it.
pub fn validate_top_n(top_n: i64) -> Result<usize> {
    if top_n <= 0 {
        return Err(ScoutError::InvalidTopN(top_n));
    }
    Ok(usize::try_from(top_n).unwrap_or(usize::MAX))
}

/// Filter, order and truncate candidates for display.
///
/// Excluded candidates are dropped. Order is tier (Excellent first, single
/// and multi-GPU alike), then score, then base name and tag.
pub fn rank(candidates: &[Candidate], filter: UseCaseFilter, top_n: i64) -> Result<Vec<Candidate>> {
    let limit = validate_top_n(top_n)?;

    let mut ranked: Vec<Candidate> = candidates
        .iter()
        .filter(|c| c.tier != FitTier::Excluded)
        .filter(|c| filter.accepts(&c.use_cases))
        .cloned()
        .collect();
    ranked.sort_by(candidate_order);
    ranked.truncate(limit);
    Ok(ranked)
}

fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.tier
        .rank()
        .cmp(&a.tier.rank())
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| {
            normalize_name(&a.variant.base_name).cmp(&normalize_name(&b.variant.base_name))
        })
        .then_with(|| a.variant.tag.cmp(&b.variant.tag))
}

/// Partition an already ranked list by use case. A candidate tagged with
/// several use cases appears in each of their groups; order is preserved.
pub fn group_by_use_case(ranked: &[Candidate]) -> BTreeMap<UseCase, Vec<Candidate>> {
    let mut groups: BTreeMap<UseCase, Vec<Candidate>> =
        UseCase::ALL.into_iter().map(|uc| (uc, Vec::new())).collect();
    for c in ranked {
        for uc in &c.use_cases {
            groups.entry(*uc).or_default().push(c.clone());
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::RunMode;
    use crate::model::ModelVariant;

    fn cand(name: &str, tier: FitTier, score: f64) -> Candidate {
        Candidate {
            variant: ModelVariant::new(name, "latest", "Q4_0", Some(1)),
            use_cases: UseCase::infer(name),
            tier,
            mode: RunMode::Gpu,
            score,
            note: String::new(),
        }
    }

    #[test]
    fn zero_or_negative_top_n_is_rejected() {
        assert!(matches!(rank(&[], UseCaseFilter::All, 0), Err(ScoutError::InvalidTopN(0))));
        assert!(matches!(rank(&[], UseCaseFilter::All, -3), Err(ScoutError::InvalidTopN(-3))));
    }

    #[test]
    fn tier_beats_score() {
        let ranked = rank(
            &[
                cand("a", FitTier::Possible, 999.0),
                cand("b", FitTier::Excellent, 1.0),
                cand("c", FitTier::Good, 50.0),
            ],
            UseCaseFilter::All,
            10,
        )
        .unwrap();
        let names: Vec<_> = ranked.iter().map(|c| c.variant.base_name.as_str()).collect();
        assert_eq!(names, vec!["b", "c", "a"]);
    }

    #[test]
    fn equal_scores_fall_back_to_name() {
        let ranked = rank(
            &[cand("zeta", FitTier::Good, 5.0), cand("alpha", FitTier::Good, 5.0)],
            UseCaseFilter::All,
            10,
        )
        .unwrap();
        assert_eq!(ranked[0].variant.base_name, "alpha");
    }

    #[test]
    fn top_n_check_stands_alone() {
        assert_eq!(validate_top_n(3).unwrap(), 3);
        assert!(matches!(validate_top_n(0), Err(ScoutError::InvalidTopN(0))));
        assert!(matches!(validate_top_n(-7), Err(ScoutError::InvalidTopN(-7))));
    }

    #[test]
    fn name_tie_break_ignores_case() {
        let ranked = rank(
            &[
                cand("Zephyr", FitTier::Good, 5.0),
                cand("mistral", FitTier::Good, 5.0),
                cand("Llama3.2", FitTier::Good, 5.0),
            ],
            UseCaseFilter::All,
            10,
        )
        .unwrap();
        let names: Vec<_> = ranked.iter().map(|c| c.variant.base_name.as_str()).collect();
        assert_eq!(names, vec!["Llama3.2", "mistral", "Zephyr"]);
    }

    #[test]
    fn groups_are_not_capped() {
        let ranked: Vec<_> = (0..9)
            .map(|i| cand(&format!("codellama-{i}"), FitTier::Excellent, i as f64))
            .collect();
        let groups = group_by_use_case(&ranked);
        assert_eq!(groups[&UseCase::Coding].len(), 9);
        assert!(groups[&UseCase::Reasoning].is_empty());
    }
}
