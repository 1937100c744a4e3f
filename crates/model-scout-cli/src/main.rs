use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use model_scout_core::{
    api::OllamaLibraryClient,
    benchmark::{self, Measurement, OllamaBenchmark, Rating},
    cache,
    catalog::{Catalog, CatalogCache, CatalogSource, CatalogStore},
    config::{
        resolve_effective_config, Config, ConfigKey, ConfigValue, EffectiveConfig, Overrides,
        Profiles,
    },
    dedupe::group_by_base_name,
    fit::{best_per_model, classify, Candidate, FitTier, RunMode},
    hardware::HardwareSnapshot,
    model::{fmt_size, LogicalModel, UseCase, UseCaseFilter},
    ollama, probe,
    rank::{group_by_use_case, rank, validate_top_n},
    settings::Settings,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

// ── Palette ──────────────────────────────────────────────────────────

fn s_header() -> Style { Style::new().color256(252).bold() }  // bright gray, bold
fn s_dim() -> Style    { Style::new().color256(248) }         // light gray
fn s_tree() -> Style   { Style::new().color256(245) }         // mid gray
fn s_hint() -> Style   { Style::new().color256(243) }         // soft gray
fn s_hot() -> Style    { Style::new().color256(114) }         // green
fn s_warm() -> Style   { Style::new().color256(214) }         // amber
fn s_err() -> Style    { Style::new().color256(167) }         // red
fn s_bold() -> Style   { Style::new().bold() }
fn s_accent() -> Style { Style::new().color256(109) }         // teal accent
fn s_label() -> Style  { Style::new().color256(146) }         // muted lavender
fn s_param() -> Style  { Style::new().color256(139) }         // mauve

const C_HEAD: Color = Color::AnsiValue(243);
const C_TEXT: Color = Color::AnsiValue(248);

fn sep(width: usize) -> String {
    s_tree().apply_to("\u{2500}".repeat(width)).to_string()
}

fn tier_color(t: FitTier) -> Color {
    match t {
        FitTier::Excellent => Color::AnsiValue(114),
        FitTier::Good      => Color::AnsiValue(109),
        FitTier::Possible  => Color::AnsiValue(214),
        FitTier::Excluded  => Color::AnsiValue(167),
    }
}

fn tier_cell(t: FitTier) -> Cell {
    let glyph = match t {
        FitTier::Excellent => "\u{25cf}",
        FitTier::Good      => "\u{25d0}",
        FitTier::Possible  => "\u{25cb}",
        FitTier::Excluded  => "\u{2717}",
    };
    Cell::new(format!("{glyph} {}", t.label())).fg(tier_color(t))
}

fn rating_color(r: Option<Rating>) -> Color {
    match r {
        Some(Rating::Fast)     => Color::AnsiValue(114),
        Some(Rating::Moderate) => Color::AnsiValue(214),
        Some(Rating::Slow)     => Color::AnsiValue(208),
        None                   => Color::AnsiValue(245),
    }
}

fn dash_str() -> String {
    "\u{2500}".to_string()
}

fn fmt_gb(bytes: u64) -> String {
    fmt_size(Some(bytes))
}

fn fmt_use_cases(tags: &BTreeSet<UseCase>) -> String {
    tags.iter().map(|u| u.label()).collect::<Vec<_>>().join(", ")
}

fn fmt_age(fetched_at: DateTime<Utc>) -> String {
    let mins = (Utc::now() - fetched_at).num_minutes().max(0);
    match mins {
        0 => "just now".to_string(),
        m if m < 60 => format!("{m}m ago"),
        m if m < 60 * 48 => format!("{}h ago", m / 60),
        m => format!("{}d ago", m / (60 * 24)),
    }
}

// ── CLI Args ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "model-scout",
    about = "Match this machine's GPU and RAM against the Ollama library and rank what will run",
    version,
    after_help = "examples:\n  \
        model-scout                             (top picks, grouped by use case)\n  \
        model-scout --use-case coding --top 5\n  \
        model-scout --flat --json\n  \
        model-scout model qwen2.5-coder\n  \
        model-scout compare llama3.1 mistral\n  \
        model-scout config set default_top_n=10\n  \
        model-scout profile create laptop --set offline_mode=true\n  \
        model-scout --profile laptop"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// all, coding, reasoning or chat
    #[arg(long, short)]
    use_case: Option<String>,

    /// How many recommendations to show
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    top: Option<i64>,

    /// One ranked list instead of use-case groups
    #[arg(long)]
    flat: bool,

    /// Use the bundled model list, no network
    #[arg(long, global = true)]
    offline: bool,

    /// Ignore the cached catalog and refetch
    #[arg(long, global = true)]
    refresh: bool,

    /// Profile to use for this run (or to edit, with `config set`)
    #[arg(long, short, global = true)]
    profile: Option<String>,

    /// Measure tokens/sec for pulled recommendations
    #[arg(long)]
    benchmark: bool,

    /// Write the report to the export directory
    #[arg(long)]
    export: bool,

    #[arg(long, short, global = true)]
    json: bool,

    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Every variant of one model and how it fits.
    Model { name: String },
    /// Best fitting variant of two models side by side.
    Compare { first: String, second: String },
    /// Refetch the model catalog and update the cache.
    Update,
    /// Show the detected hardware.
    Hardware,
    /// Download a model with ollama.
    Pull { model: String },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage named setting profiles.
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Effective settings and where each value comes from.
    Show,
    /// Set KEY=VALUE in the base config, or in a profile with --profile.
    Set { assignment: String },
}

#[derive(Subcommand)]
enum ProfileAction {
    List,
    Create {
        name: String,
        /// KEY=VALUE override, repeatable
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },
    Delete { name: String },
    Switch { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        None => cmd_recommend(&cli).await?,
        Some(Commands::Model { name }) => cmd_model(&cli, name).await?,
        Some(Commands::Compare { first, second }) => cmd_compare(&cli, first, second).await?,
        Some(Commands::Update) => cmd_update(&cli).await?,
        Some(Commands::Hardware) => cmd_hardware(&cli).await?,
        Some(Commands::Pull { model }) => cmd_pull(model).await?,
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => cmd_config_show(&cli)?,
            ConfigAction::Set { assignment } => cmd_config_set(&cli, assignment)?,
        },
        Some(Commands::Profile { action }) => match action {
            ProfileAction::List => cmd_profile_list(&cli)?,
            ProfileAction::Create { name, overrides } => cmd_profile_create(name, overrides)?,
            ProfileAction::Delete { name } => cmd_profile_delete(name)?,
            ProfileAction::Switch { name } => cmd_profile_switch(name)?,
        },
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MODEL_SCOUT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ── Settings ─────────────────────────────────────────────────────────

fn settings() -> anyhow::Result<Settings> {
    Settings::default_location().ok_or_else(|| anyhow!("cannot locate a config directory"))
}

fn load_settings() -> (Config, Profiles) {
    match Settings::default_location() {
        Some(s) => (s.load_config(), s.load_profiles()),
        None => (Config::default(), Profiles::default()),
    }
}

/// Base config plus the requested profile, with command-line flags on top.
fn effective_config(cli: &Cli) -> anyhow::Result<EffectiveConfig> {
    let (config, profiles) = load_settings();
    let mut eff = resolve_effective_config(&config, &profiles, cli.profile.as_deref())?;
    if cli.offline {
        eff.overrides.insert(ConfigKey::OfflineMode, ConfigValue::Bool(true));
    }
    Ok(eff)
}

/// Split `key=value` into a typed setting.
fn parse_assignment(raw: &str) -> anyhow::Result<(ConfigKey, ConfigValue)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{raw}'"))?;
    let key: ConfigKey = key.parse()?;
    let value = key.parse_value(value)?;
    Ok((key, value))
}

// ── Catalog ──────────────────────────────────────────────────────────

struct Loaded {
    catalog: Catalog,
    models: Vec<LogicalModel>,
}

async fn load_models(eff: &EffectiveConfig, refresh: bool) -> anyhow::Result<Loaded> {
    let client = OllamaLibraryClient::new()?;
    let store = CatalogStore::new(client, CatalogCache::default_location());
    let (catalog, pulled) = tokio::join!(store.load(eff, refresh), ollama::pulled_models());
    if let Err(e) = store.persist(&catalog) {
        tracing::warn!(error = %e, "could not update catalog cache");
    }
    let variants = catalog.variants_with_pulled(&pulled);
    let models = group_by_base_name(&variants);
    Ok(Loaded { catalog, models })
}

/// Probe hardware and load the catalog concurrently, behind a status line.
async fn gather(eff: &EffectiveConfig, refresh: bool, quiet: bool) -> anyhow::Result<(HardwareSnapshot, Loaded)> {
    let term = Term::stderr();
    let show = !quiet && term.is_term();
    if show {
        term.write_line(&format!("{}", s_dim().apply_to("scanning hardware and model library...")))?;
    }
    let (hw, loaded) = tokio::join!(probe::detect(), load_models(eff, refresh));
    if show {
        term.clear_last_lines(1)?;
    }
    Ok((hw, loaded?))
}

fn source_line(catalog: &Catalog) -> String {
    let source = match catalog.source {
        CatalogSource::Live => s_hot().apply_to("live").to_string(),
        CatalogSource::Cache => s_accent().apply_to(format!("cached {}", fmt_age(catalog.fetched_at))).to_string(),
        CatalogSource::OfflineFallback => s_warm().apply_to("offline list").to_string(),
    };
    format!(
        "{}  {}  {}",
        source,
        s_tree().apply_to("\u{00b7}"),
        s_dim().apply_to(format!("{} variants", catalog.variants.len()))
    )
}

// ── Report ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Row<'a> {
    model: String,
    base_name: &'a str,
    tag: &'a str,
    quantization: &'a str,
    param_size: Option<&'a str>,
    size_bytes: Option<u64>,
    use_cases: &'a BTreeSet<UseCase>,
    tier: FitTier,
    mode: RunMode,
    score: f64,
    pulled: bool,
    note: &'a str,
}

impl<'a> From<&'a Candidate> for Row<'a> {
    fn from(c: &'a Candidate) -> Self {
        Row {
            model: c.variant.id(),
            base_name: &c.variant.base_name,
            tag: &c.variant.tag,
            quantization: &c.variant.quantization,
            param_size: c.variant.param_size.as_deref(),
            size_bytes: c.variant.size_bytes,
            use_cases: &c.use_cases,
            tier: c.tier,
            mode: c.mode,
            score: c.score,
            pulled: c.variant.is_pulled,
            note: &c.note,
        }
    }
}

#[derive(Serialize)]
struct CatalogInfo {
    source: CatalogSource,
    fetched_at: DateTime<Utc>,
    variants: usize,
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    profile: &'a str,
    use_case: UseCaseFilter,
    hardware: &'a HardwareSnapshot,
    catalog: CatalogInfo,
    recommendations: Vec<Row<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    benchmarks: Vec<Measurement>,
}

fn export_report(report: &Report<'_>, export_dir: &str) -> anyhow::Result<PathBuf> {
    let dir = if export_dir.trim().is_empty() {
        PathBuf::from(".")
    } else {
        cache::expand_home(export_dir.trim())
    };
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(format!(
        "model-scout-{}.json",
        report.generated_at.format("%Y%m%d-%H%M%S")
    ));
    std::fs::write(&path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

// ── Recommend ────────────────────────────────────────────────────────

/// Use-case filter and list length for the recommendation view, checked
/// before anything is fetched or written.
fn view_options(cli: &Cli, eff: &EffectiveConfig) -> anyhow::Result<(UseCaseFilter, i64)> {
    let filter = match &cli.use_case {
        Some(raw) => raw.parse()?,
        None => eff.use_case(),
    };
    let top_n = cli.top.unwrap_or_else(|| eff.top_n());
    validate_top_n(top_n)?;
    Ok((filter, top_n))
}

async fn cmd_recommend(cli: &Cli) -> anyhow::Result<()> {
    let eff = effective_config(cli)?;
    let (filter, top_n) = view_options(cli, &eff)?;

    let (hw, loaded) = gather(&eff, cli.refresh, cli.json).await?;
    let best = best_per_model(&loaded.models, &hw);
    let ranked = rank(&best, filter, top_n)?;

    let benchmarks = if cli.benchmark || eff.show_benchmark() {
        run_benchmarks(&ranked, cli.json).await?
    } else {
        Vec::new()
    };

    let report = Report {
        generated_at: Utc::now(),
        profile: &eff.profile,
        use_case: filter,
        hardware: &hw,
        catalog: CatalogInfo {
            source: loaded.catalog.source,
            fetched_at: loaded.catalog.fetched_at,
            variants: loaded.catalog.variants.len(),
        },
        recommendations: ranked.iter().map(Row::from).collect(),
        benchmarks,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_hardware(&hw);
        println!("  {}", source_line(&loaded.catalog));
        if eff.profile != model_scout_core::config::DEFAULT_PROFILE {
            println!("  {}", s_hint().apply_to(format!("profile: {}", eff.profile)));
        }
        println!();

        if ranked.is_empty() {
            println!("  {}", s_err().apply_to("nothing in the catalog fits this machine"));
        } else if cli.flat || filter != UseCaseFilter::All {
            println!("  {}", s_header().apply_to(format!("top {} ({})", ranked.len(), filter)));
            println!("{}", candidate_table(&ranked));
        } else {
            for (use_case, group) in group_by_use_case(&ranked) {
                if group.is_empty() {
                    continue;
                }
                println!("  {}", s_header().apply_to(use_case.label()));
                println!("{}", candidate_table(&group));
                println!();
            }
        }

        if !report.benchmarks.is_empty() {
            print_benchmarks(&report.benchmarks);
        }
        print_legend();
    }

    if cli.export || eff.auto_export() {
        let path = export_report(&report, &eff.export_dir())?;
        eprintln!("  {}", s_hint().apply_to(format!("report written to {}", path.display())));
    }
    Ok(())
}

fn candidate_table(candidates: &[Candidate]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Model").fg(C_HEAD),
        Cell::new("Params").fg(C_HEAD),
        Cell::new("Quant").fg(C_HEAD),
        Cell::new("Size").fg(C_HEAD),
        Cell::new("Fit").fg(C_HEAD),
        Cell::new("Runs on").fg(C_HEAD),
        Cell::new("").fg(C_HEAD),
        Cell::new("Note").fg(C_HEAD),
    ]);
    for c in candidates {
        let pulled = if c.variant.is_pulled {
            Cell::new("\u{2713} pulled").fg(Color::AnsiValue(114))
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(format!("  {}", c.variant.id())),
            Cell::new(c.variant.param_size.as_deref().unwrap_or("?")).fg(Color::AnsiValue(139)),
            Cell::new(&c.variant.quantization).fg(C_TEXT),
            Cell::new(fmt_size(c.variant.size_bytes)).fg(C_TEXT),
            tier_cell(c.tier),
            Cell::new(c.mode.label()).fg(Color::AnsiValue(109)),
            pulled,
            Cell::new(&c.note).fg(C_HEAD),
        ]);
    }
    table
}

fn print_legend() {
    println!(
        "  {}",
        s_hint().apply_to("excellent: fits in VRAM   good: spills into RAM   possible: CPU only")
    );
    println!(
        "  {}",
        s_hint().apply_to("model-scout model <name> for every variant, model-scout pull <name> to download")
    );
    println!();
}

// ── Benchmarks ───────────────────────────────────────────────────────

async fn run_benchmarks(ranked: &[Candidate], quiet: bool) -> anyhow::Result<Vec<Measurement>> {
    let ids: Vec<String> = ranked
        .iter()
        .filter(|c| c.variant.is_pulled)
        .map(|c| c.variant.id())
        .collect();
    if ids.is_empty() {
        if !quiet {
            eprintln!("  {}", s_hint().apply_to("no pulled models among the results to benchmark"));
        }
        return Ok(Vec::new());
    }

    let term = Term::stderr();
    let show = !quiet && term.is_term();
    if show {
        term.write_line(&format!(
            "{}",
            s_dim().apply_to(format!("benchmarking {} pulled model(s)...", ids.len()))
        ))?;
    }
    let results = benchmark::measure_all(&OllamaBenchmark::default(), &ids).await;
    if show {
        term.clear_last_lines(1)?;
    }
    Ok(results)
}

fn print_benchmarks(results: &[Measurement]) {
    println!("  {}", s_header().apply_to("measured speed"));
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Model").fg(C_HEAD),
        Cell::new("Tokens/s").fg(C_HEAD),
        Cell::new("Rating").fg(C_HEAD),
    ]);
    for m in results {
        let rating = m.rating();
        let (tps, label) = match (m.tokens_per_sec, rating) {
            (Some(t), Some(r)) => (format!("{t:.1}"), r.to_string()),
            _ => ("\u{2500}".to_string(), "unavailable".to_string()),
        };
        table.add_row(vec![
            Cell::new(format!("  {}", m.model_id)),
            Cell::new(tps).fg(rating_color(rating)),
            Cell::new(label).fg(rating_color(rating)),
        ]);
    }
    println!("{table}");
    println!();
}

// ── Model / Compare ──────────────────────────────────────────────────

fn find_model<'a>(models: &'a [LogicalModel], query: &str) -> anyhow::Result<&'a LogicalModel> {
    LogicalModel::find(models, query).ok_or_else(|| {
        anyhow!("no model matching '{query}' in the catalog (try `model-scout update`)")
    })
}

async fn cmd_model(cli: &Cli, name: &str) -> anyhow::Result<()> {
    let eff = effective_config(cli)?;
    let (hw, loaded) = gather(&eff, cli.refresh, cli.json).await?;
    let model = find_model(&loaded.models, name)?;
    let candidates: Vec<Candidate> = model.variants.iter().map(|v| classify(v, &hw)).collect();

    if cli.json {
        let rows: Vec<Row> = candidates.iter().map(Row::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!();
    println!("  {}", s_header().apply_to(&model.base_name));
    println!("  {}", s_dim().apply_to(&model.description));
    println!(
        "  {}  {}  {}",
        s_label().apply_to(fmt_use_cases(&model.use_cases)),
        s_tree().apply_to("\u{00b7}"),
        s_param().apply_to(format!("{} variant(s)", model.variants.len()))
    );
    println!("{}", sep(64));
    println!("{}", candidate_table(&candidates));
    println!();
    match best_per_model(std::slice::from_ref(model), &hw).first() {
        Some(best) => println!(
            "  {} {}",
            s_hint().apply_to("best fit:"),
            s_hot().apply_to(best.variant.id())
        ),
        None => println!("  {}", s_err().apply_to("no variant fits this machine")),
    }
    println!();
    Ok(())
}

async fn cmd_compare(cli: &Cli, first: &str, second: &str) -> anyhow::Result<()> {
    let eff = effective_config(cli)?;
    let (hw, loaded) = gather(&eff, cli.refresh, cli.json).await?;
    let pair = [find_model(&loaded.models, first)?, find_model(&loaded.models, second)?];
    let best: Vec<Option<Candidate>> = pair
        .iter()
        .map(|m| best_per_model(std::slice::from_ref(*m), &hw).into_iter().next())
        .collect();

    if cli.json {
        let rows: Vec<Option<Row>> = best.iter().map(|c| c.as_ref().map(Row::from)).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("").fg(C_HEAD),
        Cell::new(&pair[0].base_name).fg(Color::AnsiValue(252)),
        Cell::new(&pair[1].base_name).fg(Color::AnsiValue(252)),
    ]);

    let both = |f: fn(&LogicalModel, Option<&Candidate>) -> String| {
        [f(pair[0], best[0].as_ref()), f(pair[1], best[1].as_ref())]
    };
    let rows: [(&str, [String; 2]); 8] = [
        ("Use cases", both(|m, _| fmt_use_cases(&m.use_cases))),
        ("Variants", both(|m, _| m.variants.len().to_string())),
        ("Best variant", both(|_, c| c.map(|c| c.variant.tag.clone()).unwrap_or_else(dash_str))),
        ("Params", both(|_, c| c.and_then(|c| c.variant.param_size.clone()).unwrap_or_else(|| "?".to_string()))),
        ("Size", both(|_, c| c.map(|c| fmt_size(c.variant.size_bytes)).unwrap_or_else(dash_str))),
        ("Runs on", both(|_, c| c.map_or(RunMode::None, |c| c.mode).label().to_string())),
        ("Pulled", both(|m, _| if m.is_pulled() { "yes".to_string() } else { "no".to_string() })),
        ("Note", both(|_, c| c.map(|c| c.note.clone()).unwrap_or_default())),
    ];
    let fit_cell = |c: &Option<Candidate>| c.as_ref().map_or(tier_cell(FitTier::Excluded), |c| tier_cell(c.tier));

    table.add_row(vec![Cell::new("  Fit").fg(C_HEAD), fit_cell(&best[0]), fit_cell(&best[1])]);
    for (label, [a, b]) in rows {
        table.add_row(vec![
            Cell::new(format!("  {label}")).fg(C_HEAD),
            Cell::new(a).fg(C_TEXT),
            Cell::new(b).fg(C_TEXT),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

// ── Update / Hardware / Pull ─────────────────────────────────────────

async fn cmd_update(cli: &Cli) -> anyhow::Result<()> {
    let eff = effective_config(cli)?;
    if eff.offline_mode() {
        bail!("offline mode is on; run without --offline or set offline_mode=false");
    }

    let term = Term::stderr();
    term.write_line(&format!("{}", s_dim().apply_to("fetching model library...")))?;
    let loaded = load_models(&eff, true).await?;
    term.clear_last_lines(1)?;

    println!();
    if loaded.catalog.source == CatalogSource::Live {
        println!("  {}", s_hot().apply_to("catalog updated"));
    } else {
        println!(
            "  {}",
            s_warm().apply_to("could not reach the Ollama library; existing cache left as is")
        );
    }
    println!(
        "  {}",
        s_dim().apply_to(format!(
            "{} models  {}  {} variants",
            loaded.models.len(),
            "\u{00b7}",
            loaded.catalog.variants.len()
        ))
    );
    if let Some(dir) = cache::cache_dir() {
        println!("  {}", s_hint().apply_to(format!("cached in {}", dir.display())));
    }
    println!();
    Ok(())
}

async fn cmd_hardware(cli: &Cli) -> anyhow::Result<()> {
    let (hw, version) = tokio::join!(probe::detect(), ollama::version());
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&hw)?);
        return Ok(());
    }
    print_hardware(&hw);
    match version {
        Some(v) => println!("  {}", s_dim().apply_to(v)),
        None => println!("  {}", s_warm().apply_to("ollama not found on PATH")),
    }
    println!();
    Ok(())
}

fn print_hardware(hw: &HardwareSnapshot) {
    let dot = s_tree().apply_to("\u{00b7}");
    println!();
    println!("  {}", s_header().apply_to(hw.cpu_label()));
    println!(
        "  {}",
        s_dim().apply_to(format!("{} RAM", fmt_gb(hw.total_ram_bytes())))
    );
    if hw.gpus().is_empty() {
        println!("  {}", s_warm().apply_to("no GPU detected, CPU inference only"));
    }
    for gpu in hw.gpus() {
        println!(
            "  {}  {}  {}",
            s_bold().apply_to(&gpu.name),
            dot,
            s_accent().apply_to(format!("{} VRAM", fmt_gb(gpu.vram_bytes)))
        );
    }
    if hw.gpu_count() > 1 {
        println!(
            "  {}",
            s_hint().apply_to(format!("{} combined", fmt_gb(hw.total_vram_bytes())))
        );
    }
    println!("{}", sep(64));
}

async fn cmd_pull(model: &str) -> anyhow::Result<()> {
    ollama::pull_model(model).await?;
    println!();
    println!("  {} {}", s_hot().apply_to("pulled"), s_bold().apply_to(model));
    println!();
    Ok(())
}

// ── Config / Profiles ────────────────────────────────────────────────

fn cmd_config_show(cli: &Cli) -> anyhow::Result<()> {
    let eff = effective_config(cli)?;
    if cli.json {
        let map: serde_json::Map<String, serde_json::Value> = ConfigKey::ALL
            .iter()
            .map(|k| -> anyhow::Result<(String, serde_json::Value)> {
                Ok((k.name().to_string(), serde_json::to_value(eff.get(*k))?))
            })
            .collect::<anyhow::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("  Key").fg(C_HEAD),
        Cell::new("Value").fg(C_HEAD),
        Cell::new("From").fg(C_HEAD),
    ]);
    for key in ConfigKey::ALL {
        let from = if eff.is_overridden(key) {
            Cell::new(format!("profile {}", eff.profile)).fg(Color::AnsiValue(146))
        } else {
            Cell::new("config").fg(C_HEAD)
        };
        table.add_row(vec![
            Cell::new(format!("  {}", key.name())),
            Cell::new(eff.get(key).to_string()).fg(Color::AnsiValue(109)),
            from,
        ]);
    }
    println!();
    println!("{table}");
    if let Ok(s) = settings() {
        println!();
        println!("  {}", s_hint().apply_to(format!("{}", s.config_path().display())));
    }
    println!();
    Ok(())
}

fn cmd_config_set(cli: &Cli, assignment: &str) -> anyhow::Result<()> {
    let (key, value) = parse_assignment(assignment)?;
    let settings = settings()?;
    match cli.profile.as_deref() {
        Some(profile) => {
            let mut profiles = settings.load_profiles();
            profiles.set_value(profile, key, value.clone())?;
            settings.save_profiles(&profiles)?;
            println!("  {} = {} {}", key, value, s_hint().apply_to(format!("(profile {profile})")));
        }
        None => {
            let mut config = settings.load_config();
            config.set(key, value.clone())?;
            settings.save_config(&config)?;
            println!("  {} = {}", key, value);
        }
    }
    Ok(())
}

fn cmd_profile_list(cli: &Cli) -> anyhow::Result<()> {
    let (_, profiles) = load_settings();
    if cli.json {
        let map: serde_json::Map<String, serde_json::Value> = profiles
            .iter()
            .map(|(name, overrides)| -> anyhow::Result<(String, serde_json::Value)> {
                let entries: serde_json::Map<String, serde_json::Value> = overrides
                    .iter()
                    .map(|(k, v)| -> anyhow::Result<(String, serde_json::Value)> {
                        Ok((k.name().to_string(), serde_json::to_value(v)?))
                    })
                    .collect::<anyhow::Result<_>>()?;
                Ok((name.to_string(), serde_json::Value::Object(entries)))
            })
            .collect::<anyhow::Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!();
    for (name, overrides) in profiles.iter() {
        let marker = if name == profiles.active() {
            s_hot().apply_to("\u{25cf}").to_string()
        } else {
            " ".to_string()
        };
        println!("  {} {}", marker, s_bold().apply_to(name));
        for (key, value) in overrides {
            println!("      {} {}", s_label().apply_to(key.name()), s_dim().apply_to(value));
        }
    }
    println!();
    Ok(())
}

fn cmd_profile_create(name: &str, raw_overrides: &[String]) -> anyhow::Result<()> {
    let mut overrides = Overrides::new();
    for raw in raw_overrides {
        let (key, value) = parse_assignment(raw)?;
        overrides.insert(key, value);
    }
    let settings = settings()?;
    let mut profiles = settings.load_profiles();
    profiles.create(name, overrides)?;
    settings.save_profiles(&profiles)?;
    println!("  {} {}", s_hot().apply_to("created profile"), s_bold().apply_to(name));
    Ok(())
}

fn cmd_profile_delete(name: &str) -> anyhow::Result<()> {
    let settings = settings()?;
    let mut profiles = settings.load_profiles();
    profiles.delete(name)?;
    settings.save_profiles(&profiles)?;
    println!("  {} {}", s_dim().apply_to("deleted profile"), s_bold().apply_to(name));
    println!("  {}", s_hint().apply_to(format!("active profile: {}", profiles.active())));
    Ok(())
}

fn cmd_profile_switch(name: &str) -> anyhow::Result<()> {
    let settings = settings()?;
    let mut profiles = settings.load_profiles();
    profiles.switch(name)?;
    settings.save_profiles(&profiles)?;
    println!("  {} {}", s_hot().apply_to("switched to"), s_bold().apply_to(name));
    Ok(())
}
