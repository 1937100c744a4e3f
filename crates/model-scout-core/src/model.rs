use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScoutError;

pub const GIB: u64 = 1024 * 1024 * 1024;

/// Tie-break key for a quantization label: smaller/cheaper first.
///
/// The first component is the bit width (`Q2` < `Q3` < ... < `Q8`, then
/// `BF16`/`F16`, then `F32`); the second is the sub-variant (`_0`, `_1`,
/// `_K_S`, `_K_M`, `_K_L`). Unrecognised labels sort after everything.
pub fn quant_rank(label: &str) -> (u8, u8) {
    let upper = label.trim().to_uppercase();
    match upper.as_str() {
        "F16" | "FP16" => return (16, 0),
        "BF16" => return (16, 1),
        "F32" | "FP32" => return (32, 0),
        _ => {}
    }

    let rest = upper
        .strip_prefix("IQ")
        .or_else(|| upper.strip_prefix('Q'));
    let Some(rest) = rest else {
        return (u8::MAX, u8::MAX);
    };
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let Ok(bits) = rest[..digits].parse::<u8>() else {
        return (u8::MAX, u8::MAX);
    };
    let sub = match &rest[digits..] {
        "" | "_0" => 0,
        "_1" => 1,
        "_K_S" => 2,
        "_K" | "_K_M" => 3,
        "_K_L" => 4,
        _ => 5,
    };
    (bits, sub)
}

/// One downloadable unit from the model library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVariant {
    pub base_name: String,
    pub tag: String,
    pub quantization: String,
    /// `None` when the library did not report a size.
    pub size_bytes: Option<u64>,
    #[serde(default)]
    pub param_size: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(skip)]
    pub is_pulled: bool,
}

impl ModelVariant {
    pub fn new(base_name: &str, tag: &str, quantization: &str, size_bytes: Option<u64>) -> Self {
        Self {
            base_name: base_name.trim().to_string(),
            tag: tag.trim().to_string(),
            quantization: quantization.trim().to_uppercase(),
            size_bytes,
            param_size: None,
            description: None,
            is_pulled: false,
        }
    }

    /// Identity of a variant: `(base name, tag, quantization)`, case-folded.
    pub fn key(&self) -> (String, String, String) {
        (
            normalize_name(&self.base_name),
            self.tag.trim().to_lowercase(),
            self.quantization.trim().to_uppercase(),
        )
    }

    /// `base:tag`, the identifier `ollama` understands.
    pub fn id(&self) -> String {
        format!("{}:{}", self.base_name, self.tag)
    }

    pub fn size_gb(&self) -> Option<f64> {
        self.size_bytes.map(|b| b as f64 / GIB as f64)
    }

    pub fn with_pulled(&self, is_pulled: bool) -> Self {
        Self {
            is_pulled,
            ..self.clone()
        }
    }
}

/// Group key for base names: trimmed and lowercase.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    Coding,
    Reasoning,
    Chat,
}

impl UseCase {
    pub const ALL: [UseCase; 3] = [UseCase::Coding, UseCase::Reasoning, UseCase::Chat];

    pub fn label(self) -> &'static str {
        match self {
            UseCase::Coding => "coding",
            UseCase::Reasoning => "reasoning",
            UseCase::Chat => "chat",
        }
    }

    fn patterns(self) -> &'static [&'static str] {
        match self {
            UseCase::Coding => &[
                "codellama", "deepseek-coder", "codegemma", "starcoder", "starcoder2",
                "codestral", "qwen2.5-coder", "qwen3-coder", "granite-code", "magicoder",
            ],
            UseCase::Reasoning => &[
                "deepseek-r1", "qwq", "phi4", "phi3", "llama3.3", "llama3.1",
                "mistral-large", "command-r-plus", "mixtral", "deepseek-v3",
            ],
            UseCase::Chat => &[
                "llama3.2", "llama3.1", "llama3", "mistral", "gemma2", "gemma3", "gemma",
                "qwen2.5", "qwen3", "phi3", "phi4", "smollm2", "hermes3", "openhermes",
                "neural-chat", "dolphin-mixtral", "llava", "bakllava",
            ],
        }
    }

    fn blurb(self) -> &'static str {
        match self {
            UseCase::Coding => "Optimized for code generation and completion",
            UseCase::Reasoning => "Designed for complex reasoning and analysis",
            UseCase::Chat => "General-purpose conversational model",
        }
    }

    /// Tags for a base name from the static pattern table. Names matching
    /// nothing are treated as chat models.
    pub fn infer(base_name: &str) -> BTreeSet<UseCase> {
        let name = normalize_name(base_name);
        let mut tags: BTreeSet<UseCase> = Self::ALL
            .into_iter()
            .filter(|uc| uc.patterns().iter().any(|p| name.contains(p)))
            .collect();
        if tags.is_empty() {
            tags.insert(UseCase::Chat);
        }
        tags
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Use-case filter applied by the ranker. `All` keeps everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCaseFilter {
    #[default]
    All,
    Coding,
    Reasoning,
    Chat,
}

impl UseCaseFilter {
    pub fn label(self) -> &'static str {
        match self {
            UseCaseFilter::All => "all",
            UseCaseFilter::Coding => "coding",
            UseCaseFilter::Reasoning => "reasoning",
            UseCaseFilter::Chat => "chat",
        }
    }

    pub fn accepts(self, tags: &BTreeSet<UseCase>) -> bool {
        match self {
            UseCaseFilter::All => true,
            UseCaseFilter::Coding => tags.contains(&UseCase::Coding),
            UseCaseFilter::Reasoning => tags.contains(&UseCase::Reasoning),
            UseCaseFilter::Chat => tags.contains(&UseCase::Chat),
        }
    }
}

impl FromStr for UseCaseFilter {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "coding" => Ok(Self::Coding),
            "reasoning" => Ok(Self::Reasoning),
            "chat" => Ok(Self::Chat),
            _ => Err(ScoutError::UnknownUseCase(s.to_string())),
        }
    }
}

impl fmt::Display for UseCaseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// All variants sharing one base name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogicalModel {
    pub base_name: String,
    /// Smallest first; unknown sizes last.
    pub variants: Vec<ModelVariant>,
    pub use_cases: BTreeSet<UseCase>,
    pub description: String,
}

impl LogicalModel {
    pub fn new(base_name: String, variants: Vec<ModelVariant>) -> Self {
        let use_cases = UseCase::infer(&base_name);
        let description = variants
            .iter()
            .find_map(|v| v.description.clone().filter(|d| !d.trim().is_empty()))
            .unwrap_or_else(|| describe(&base_name, &use_cases));
        Self {
            base_name,
            variants,
            use_cases,
            description,
        }
    }

    pub fn is_pulled(&self) -> bool {
        self.variants.iter().any(|v| v.is_pulled)
    }

    /// Find a model by exact (case-insensitive) name, falling back to the
    /// first prefix match.
    pub fn find<'a>(models: &'a [LogicalModel], query: &str) -> Option<&'a LogicalModel> {
        let target = normalize_name(query);
        models
            .iter()
            .find(|m| normalize_name(&m.base_name) == target)
            .or_else(|| {
                models
                    .iter()
                    .find(|m| normalize_name(&m.base_name).starts_with(&target))
            })
    }
}

const FAMILY_DESCRIPTIONS: &[(&str, &str)] = &[
    ("llama", "Meta's open-weight large language model"),
    ("llama3", "Meta's Llama 3 general-purpose model"),
    ("llama3.1", "Meta's Llama 3.1 with extended context support"),
    ("llama3.2", "Meta's compact and efficient Llama 3.2 model"),
    ("llama3.3", "Meta's Llama 3.3 flagship model"),
    ("mistral", "Mistral AI's efficient base model"),
    ("mixtral", "Mistral AI's sparse mixture-of-experts model"),
    ("mistral-large", "Mistral AI's largest and most capable model"),
    ("codellama", "Meta's code-specialized Llama model"),
    ("deepseek-coder", "DeepSeek's model optimized for code generation"),
    ("deepseek-r1", "DeepSeek's reasoning-focused model"),
    ("deepseek-v3", "DeepSeek V3 large language model"),
    ("phi3", "Microsoft's compact and efficient Phi-3 model"),
    ("phi4", "Microsoft's Phi-4 reasoning model"),
    ("gemma", "Google's lightweight open model"),
    ("gemma2", "Google's Gemma 2 open model"),
    ("gemma3", "Google's latest Gemma 3 multimodal model"),
    ("qwen2.5", "Alibaba's multilingual Qwen 2.5 model"),
    ("qwen2.5-coder", "Alibaba's code-specialized Qwen model"),
    ("qwen3", "Alibaba's Qwen 3 next-generation model"),
    ("qwen3-coder", "Alibaba's Qwen 3 code-specialized model"),
    ("smollm2", "HuggingFace's ultra-compact language model"),
    ("starcoder", "BigCode's code generation model"),
    ("starcoder2", "BigCode's improved code generation model"),
    ("codegemma", "Google's code-specialized Gemma model"),
    ("codestral", "Mistral's code-specialized model"),
    ("command-r-plus", "Cohere's enterprise command model"),
    ("llava", "Large Language and Vision Assistant multimodal model"),
    ("bakllava", "BakLLaVA multimodal vision-language model"),
    ("hermes3", "Nous Research's Hermes 3 instruction-tuned model"),
    ("openhermes", "Nous Research's OpenHermes chat model"),
    ("neural-chat", "Intel's neural chat optimized model"),
    ("dolphin-mixtral", "Dolphin fine-tuned Mixtral model"),
    ("granite-code", "IBM's Granite code model"),
    ("magicoder", "Code generation model trained on synthetic data"),
];

/// Description for a model the library did not describe: known family first
/// (exact, then prefix), then the use-case blurbs.
pub fn describe(base_name: &str, use_cases: &BTreeSet<UseCase>) -> String {
    let name = normalize_name(base_name);
    if let Some((_, d)) = FAMILY_DESCRIPTIONS.iter().find(|(k, _)| *k == name) {
        return (*d).to_string();
    }
    if let Some((_, d)) = FAMILY_DESCRIPTIONS.iter().find(|(k, _)| name.starts_with(k)) {
        return (*d).to_string();
    }
    let blurbs: Vec<&str> = use_cases.iter().map(|uc| uc.blurb()).collect();
    if !blurbs.is_empty() {
        return blurbs.join(". ");
    }
    format!("{base_name} model from Ollama library")
}

/// Extract a parameter size like "7B" or "6.7B" from a tag or name.
pub fn parse_param_size(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    for (i, c) in bytes.iter().enumerate() {
        if !c.is_ascii_digit() {
            continue;
        }
        if i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
            continue;
        }
        let mut end = i;
        while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
            end += 1;
        }
        if end < bytes.len() && bytes[end].eq_ignore_ascii_case(&b'b') {
            let num = text[i..end].trim_end_matches('.');
            if num.parse::<f64>().is_ok() {
                return Some(format!("{num}B"));
            }
        }
    }
    None
}

/// Parameter size from the tag, falling back to the name.
pub fn param_size_from(name: &str, tag: &str) -> Option<String> {
    parse_param_size(tag).or_else(|| parse_param_size(name))
}

/// Quantization inferred from a tag when the library leaves it blank.
pub fn parse_quantization(tag: &str) -> String {
    const TOKENS: &[&str] = &[
        "q2_k", "q3_k", "q4_0", "q4_k_m", "q4_k_s", "q5_0", "q5_k_m", "q6_k", "q8_0", "f16",
        "fp16", "f32",
    ];
    let lower = tag.to_lowercase();
    if let Some(q) = TOKENS.iter().find(|q| lower.contains(*q)) {
        return q.to_uppercase();
    }
    if lower.contains("instruct") || lower.contains("chat") {
        return "Q4_K_M".to_string();
    }
    "Q4_0".to_string()
}

/// Format a byte count as "3.8 GB"; unknown sizes render as "?".
pub fn fmt_size(bytes: Option<u64>) -> String {
    match bytes {
        Some(b) => format!("{:.1} GB", b as f64 / GIB as f64),
        None => "?".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn use_case_inference() {
        assert!(UseCase::infer("deepseek-coder").contains(&UseCase::Coding));
        assert!(UseCase::infer("deepseek-r1").contains(&UseCase::Reasoning));
        assert!(UseCase::infer("llama3.2").contains(&UseCase::Chat));
        // phi4 sits in both the reasoning and chat tables
        let phi4 = UseCase::infer("phi4");
        assert!(phi4.contains(&UseCase::Reasoning) && phi4.contains(&UseCase::Chat));
    }

    #[test]
    fn unknown_model_defaults_to_chat() {
        let tags = UseCase::infer("totally-unknown-model");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec![UseCase::Chat]);
    }

    #[test]
    fn param_size_parsing() {
        assert_eq!(parse_param_size("7b"), Some("7B".into()));
        assert_eq!(parse_param_size("13b-q4_0"), Some("13B".into()));
        assert_eq!(parse_param_size("6.7b"), Some("6.7B".into()));
        assert_eq!(parse_param_size("latest"), None);
        assert_eq!(param_size_from("llama3", "7b"), Some("7B".into()));
        assert_eq!(param_size_from("model7b", "latest"), Some("7B".into()));
    }

    #[test]
    fn quantization_from_tag() {
        assert_eq!(parse_quantization("7b-q4_0"), "Q4_0");
        assert_eq!(parse_quantization("7b-f16"), "F16");
        assert_eq!(parse_quantization("7b-q4_k_m"), "Q4_K_M");
        assert_eq!(parse_quantization("7b-instruct"), "Q4_K_M");
        assert_eq!(parse_quantization("latest"), "Q4_0");
    }

    #[test]
    fn quant_precedence_orders_q4_before_q8_before_f16() {
        assert!(quant_rank("Q4_K_M") < quant_rank("Q8_0"));
        assert!(quant_rank("q8_0") < quant_rank("F16"));
        assert!(quant_rank("F16") < quant_rank("F32"));
        assert!(quant_rank("F32") < quant_rank("MYSTERY"));
    }

    #[test]
    fn quant_rank_reads_family_then_sub_variant() {
        let mut labels = vec![
            "F16", "Q8_0", "BF16", "Q3_K_M", "Q5_K_S", "Q4_1", "Q5_1", "Q3_K_S", "Q4_0",
            "Q4_K_M", "Q6_K", "Q2_K", "IQ4_XS", "F32", "Q3_K_L",
        ];
        labels.sort_by_key(|l| quant_rank(l));
        assert_eq!(
            labels,
            vec![
                "Q2_K", "Q3_K_S", "Q3_K_M", "Q3_K_L", "Q4_0", "Q4_1", "Q4_K_M", "IQ4_XS",
                "Q5_1", "Q5_K_S", "Q6_K", "Q8_0", "F16", "BF16", "F32",
            ]
        );
    }

    #[test]
    fn descriptions_fall_back_in_order() {
        assert!(describe("llama3.2", &UseCase::infer("llama3.2")).contains("Llama 3.2"));
        let coding: BTreeSet<_> = [UseCase::Coding].into_iter().collect();
        assert!(describe("my-custom-model", &coding).to_lowercase().contains("code"));
        assert!(describe("xyz123", &BTreeSet::new()).contains("xyz123"));
    }

    #[test]
    fn use_case_filter_parse() {
        assert_eq!("Coding".parse::<UseCaseFilter>().unwrap(), UseCaseFilter::Coding);
        assert!(matches!(
            "vision".parse::<UseCaseFilter>(),
            Err(ScoutError::UnknownUseCase(_))
        ));
    }

    #[test]
    fn find_prefers_exact_then_prefix() {
        let models = vec![
            LogicalModel::new("llama3.1".into(), vec![]),
            LogicalModel::new("llama3".into(), vec![]),
        ];
        assert_eq!(LogicalModel::find(&models, "LLAMA3").unwrap().base_name, "llama3");
        assert_eq!(LogicalModel::find(&models, "llama3.").unwrap().base_name, "llama3.1");
        assert!(LogicalModel::find(&models, "mistral").is_none());
    }
}
