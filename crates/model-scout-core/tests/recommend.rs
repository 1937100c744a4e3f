use model_scout_core::catalog::load_bundled_fallback;
use model_scout_core::dedupe::group_by_base_name;
use model_scout_core::fit::{best_per_model, classify, FitTier, RunMode};
use model_scout_core::hardware::{GpuDevice, HardwareSnapshot};
use model_scout_core::model::{ModelVariant, UseCase, UseCaseFilter, GIB};
use model_scout_core::rank::{group_by_use_case, rank};
use model_scout_core::ScoutError;

fn gb(x: f64) -> u64 {
    (x * GIB as f64) as u64
}

fn one_gpu(vram: f64, ram: f64) -> HardwareSnapshot {
    let gpu = GpuDevice {
        name: "Test GPU".into(),
        vram_bytes: gb(vram),
    };
    HardwareSnapshot::new(vec![gpu], gb(ram), false, "Test CPU")
}

fn sized(name: &str, tag: &str, size: f64) -> ModelVariant {
    ModelVariant::new(name, tag, "Q4_K_M", Some(gb(size)))
}

#[test]
fn small_model_on_big_gpu_is_excellent() {
    let c = classify(&sized("phi3", "3.8b", 3.8), &one_gpu(10.0, 32.0));
    assert_eq!(c.tier, FitTier::Excellent);
    assert_eq!(c.mode, RunMode::Gpu);
}

#[test]
fn oversize_model_offloads_to_ram() {
    let c = classify(&sized("phi4", "14b", 8.4), &one_gpu(3.0, 16.0));
    assert_eq!(c.tier, FitTier::Good);
    assert_eq!(c.mode, RunMode::CpuPlusGpu);
    assert!(c.note.contains("offloaded"), "{}", c.note);
}

#[test]
fn too_large_for_cpu_box_is_excluded_and_unranked() {
    let hw = HardwareSnapshot::cpu_only(gb(8.0), "Test CPU");
    let big = classify(&sized("gemma3", "12b", 12.0), &hw);
    assert_eq!(big.tier, FitTier::Excluded);
    assert_eq!(big.mode, RunMode::None);

    let small = classify(&sized("smollm2", "1.7b", 1.0), &hw);
    assert_eq!(small.tier, FitTier::Possible);
    assert_eq!(small.mode, RunMode::Cpu);

    let ranked = rank(&[big, small], UseCaseFilter::All, 10).unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].variant.base_name, "smollm2");
}

#[test]
fn unified_matches_discrete_equivalent() {
    let unified = HardwareSnapshot::new(Vec::new(), gb(16.0), true, "Apple M2");
    let discrete = one_gpu(12.0, 16.0);
    for size in [2.0, 11.9, 12.0, 12.1, 15.0, 16.0, 27.9, 28.1, 40.0] {
        let v = sized("llama3.1", "8b", size);
        let a = classify(&v, &unified);
        let b = classify(&v, &discrete);
        assert_eq!((a.tier, a.mode), (b.tier, b.mode), "size {size}");
        assert_eq!(a.score, b.score, "size {size}");
    }
}

#[test]
fn unknown_size_is_excluded() {
    let v = ModelVariant::new("mystery", "latest", "Q4_0", None);
    let c = classify(&v, &one_gpu(80.0, 256.0));
    assert_eq!(c.tier, FitTier::Excluded);
    assert_eq!(c.note, "Size unknown");
}

#[test]
fn grouping_is_a_partition() {
    let variants = load_bundled_fallback().unwrap();
    let models = group_by_base_name(&variants);
    let total: usize = models.iter().map(|m| m.variants.len()).sum();
    assert_eq!(total, variants.len());
    for v in &variants {
        let owners = models
            .iter()
            .filter(|m| m.variants.iter().any(|x| x == v))
            .count();
        assert_eq!(owners, 1, "{} should belong to exactly one model", v.id());
    }
    let llama = models.iter().find(|m| m.base_name == "llama3.2").unwrap();
    let tags: Vec<_> = llama.variants.iter().map(|v| v.tag.as_str()).collect();
    assert_eq!(tags, vec!["1b", "3b"]);
}

#[test]
fn classify_is_deterministic() {
    let hw = one_gpu(8.0, 32.0);
    for v in load_bundled_fallback().unwrap() {
        assert_eq!(classify(&v, &hw), classify(&v, &hw));
    }
}

#[test]
fn ranking_is_idempotent() {
    let hw = one_gpu(6.0, 16.0);
    let candidates: Vec<_> = load_bundled_fallback()
        .unwrap()
        .iter()
        .map(|v| classify(v, &hw))
        .collect();
    for filter in [UseCaseFilter::All, UseCaseFilter::Coding, UseCaseFilter::Chat] {
        let once = rank(&candidates, filter, 5).unwrap();
        let twice = rank(&once, filter, 5).unwrap();
        assert_eq!(once, twice);
        assert!(once.len() <= 5);
        for pair in once.windows(2) {
            assert!(pair[0].tier.rank() >= pair[1].tier.rank());
        }
    }
}

#[test]
fn zero_top_n_is_rejected() {
    let err = rank(&[], UseCaseFilter::All, 0).unwrap_err();
    assert!(matches!(err, ScoutError::InvalidTopN(0)));
    assert!(rank(&[], UseCaseFilter::All, -3).is_err());
}

#[test]
fn pulled_variant_outscores_its_twin() {
    let hw = one_gpu(24.0, 64.0);
    let v = sized("mistral", "7b", 4.1);
    let plain = classify(&v, &hw);
    let pulled = classify(&v.with_pulled(true), &hw);
    assert!(pulled.score > plain.score);
}

#[test]
fn best_variant_per_model_and_use_case_groups() {
    let hw = one_gpu(8.0, 24.0);
    let models = group_by_base_name(&load_bundled_fallback().unwrap());
    let best = best_per_model(&models, &hw);

    // llama3.3 70B is too large even with offload
    assert!(best.iter().all(|c| c.variant.base_name != "llama3.3"));
    let llama = best.iter().find(|c| c.variant.base_name == "llama3.2").unwrap();
    assert_eq!(llama.variant.tag, "1b");

    let ranked = rank(&best, UseCaseFilter::All, 100).unwrap();
    let groups = group_by_use_case(&ranked);
    assert_eq!(groups.len(), 3);
    let coding: Vec<_> = groups[&UseCase::Coding]
        .iter()
        .map(|c| c.variant.base_name.as_str())
        .collect();
    assert!(coding.contains(&"qwen2.5-coder"));
    assert!(coding.contains(&"codellama"));
    assert!(groups[&UseCase::Reasoning]
        .iter()
        .any(|c| c.variant.base_name == "deepseek-r1"));
}
