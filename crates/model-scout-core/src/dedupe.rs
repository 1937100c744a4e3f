use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::model::{normalize_name, quant_rank, LogicalModel, ModelVariant};

/// Merge variants that share a base name into logical models.
///
/// Base names compare case-insensitively after trimming. Within a model the
/// variants run smallest first (unknown sizes last), ties broken by
/// quantization precedence and then tag. Models come out in name order.
/// Exact repeats of `(base name, tag, quantization)` keep their first
/// occurrence.
pub fn group_by_base_name(variants: &[ModelVariant]) -> Vec<LogicalModel> {
    let mut seen = HashSet::new();
    let mut groups: BTreeMap<String, Vec<ModelVariant>> = BTreeMap::new();

    for v in variants {
        if !seen.insert(v.key()) {
            tracing::debug!(model = %v.id(), "dropping repeated catalog entry");
            continue;
        }
        groups
            .entry(normalize_name(&v.base_name))
            .or_default()
            .push(v.clone());
    }

    groups
        .into_iter()
        .map(|(name, mut vs)| {
            vs.sort_by(variant_order);
            LogicalModel::new(name, vs)
        })
        .collect()
}

fn variant_order(a: &ModelVariant, b: &ModelVariant) -> Ordering {
    let by_size = match (a.size_bytes, b.size_bytes) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_size
        .then_with(|| quant_rank(&a.quantization).cmp(&quant_rank(&b.quantization)))
        .then_with(|| a.tag.cmp(&b.tag))
}
