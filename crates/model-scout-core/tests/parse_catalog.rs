use model_scout_core::api::{parse_tags, parse_variant};
use model_scout_core::model::GIB;
use serde_json::json;

#[test]
fn parse_tags_document() {
    let data = json!({
        "models": [
            {"name": "llama3.2:3b", "size": 2147483648u64, "details": {}},
            {
                "name": "mistral:7b",
                "size": 4402341478u64,
                "details": {"parameter_size": "7B", "quantization_level": "Q4_K_M"}
            }
        ]
    });
    let variants = parse_tags(&data);
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[0].base_name, "llama3.2");
    assert_eq!(variants[0].tag, "3b");
    assert_eq!(variants[0].size_bytes, Some(2 * GIB));
    assert_eq!(variants[0].param_size.as_deref(), Some("3B"));
    assert_eq!(variants[1].quantization, "Q4_K_M");
    assert_eq!(variants[1].param_size.as_deref(), Some("7B"));
    assert!(!variants[1].is_pulled);
}

#[test]
fn parse_bare_array() {
    let data = json!([{"name": "phi4", "size": 9053116391u64}]);
    let variants = parse_tags(&data);
    assert_eq!(variants.len(), 1);
    assert_eq!(variants[0].tag, "latest");
    assert_eq!(variants[0].quantization, "Q4_0");
}

#[test]
fn zero_size_is_unknown() {
    let data = json!({"name": "deepseek-coder:6.7b", "size": 0});
    let v = parse_variant(&data).expect("should parse");
    assert_eq!(v.size_bytes, None);
    assert_eq!(v.param_size.as_deref(), Some("6.7B"));
}

#[test]
fn missing_name_is_skipped() {
    assert!(parse_variant(&json!({"size": 100})).is_none());
    assert!(parse_variant(&json!({"name": "  "})).is_none());
    let data = json!({"models": [{"size": 1}, {"name": "gemma2:9b", "size": 1}]});
    assert_eq!(parse_tags(&data).len(), 1);
}

#[test]
fn quantization_inferred_from_tag() {
    let v = parse_variant(&json!({"name": "qwen2.5:7b-instruct-q8_0", "size": 8})).unwrap();
    assert_eq!(v.quantization, "Q8_0");
    let v = parse_variant(&json!({"name": "llama3.1:8b-instruct", "size": 8})).unwrap();
    assert_eq!(v.quantization, "Q4_K_M");
}

#[test]
fn description_kept_when_present() {
    let v = parse_variant(&json!({"name": "smollm2:1.7b", "description": " Small but capable "})).unwrap();
    assert_eq!(v.description.as_deref(), Some("Small but capable"));
    let v = parse_variant(&json!({"name": "smollm2:1.7b", "description": ""})).unwrap();
    assert!(v.description.is_none());
}

#[test]
fn unexpected_document_yields_nothing() {
    assert!(parse_tags(&json!({"error": "rate limited"})).is_empty());
    assert!(parse_tags(&json!("nope")).is_empty());
}
