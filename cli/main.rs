#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use log::{error, info};
use std::io;
use std::path::PathBuf;
use std::process;

use tanglestat::config::AnalysisConfig;
use tanglestat::data::{
    extract_label_column, load_frame, observations_from_frame, resolve_separator,
};
use tanglestat::report::{self, Labels, OutputFormat};
use tanglestat::scan::scan_features;
use tanglestat::strata::analyze_stratified;
use tanglestat::{Alternative, AnalysisError, ContingencyTable, analyze, analyze_table};

#[derive(Clone, Copy, ValueEnum)]
pub enum AlternativeCli {
    TwoSided,
    Less,
    Greater,
}

impl From<AlternativeCli> for Alternative {
    fn from(value: AlternativeCli) -> Self {
        match value {
            AlternativeCli::TwoSided => Alternative::TwoSided,
            AlternativeCli::Less => Alternative::Less,
            AlternativeCli::Greater => Alternative::Greater,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatCli {
    Text,
    Toml,
    Tsv,
}

impl From<FormatCli> for OutputFormat {
    fn from(value: FormatCli) -> Self {
        match value {
            FormatCli::Text => OutputFormat::Text,
            FormatCli::Toml => OutputFormat::Toml,
            FormatCli::Tsv => OutputFormat::Tsv,
        }
    }
}

/// Options shared by every command that reads a data file.
#[derive(Args)]
pub struct InputArgs {
    /// Path to a CSV or TSV file with a header row
    pub data: PathBuf,

    /// Column holding unique entity identifiers (e.g. UniProt accession)
    #[arg(long, value_name = "COLUMN")]
    pub id: Option<String>,

    /// Field separator: a single character or "tab" (default: from the file extension)
    #[arg(long, value_name = "CHAR")]
    pub separator: Option<String>,

    /// TOML file with analysis settings; command-line flags take precedence
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the resolved settings to this TOML file for later runs
    #[arg(long, value_name = "PATH")]
    pub save_config: Option<PathBuf>,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Alternative hypothesis of the exact test
    #[arg(long, value_enum)]
    pub alternative: Option<AlternativeCli>,

    /// Output format written to standard output
    #[arg(long, value_enum, default_value_t = FormatCli::Text)]
    pub format: FormatCli,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Boolean column marking feature presence (e.g. entangled)
    #[arg(long, value_name = "COLUMN")]
    pub feature: Option<String>,

    /// Boolean column marking outcome presence (e.g. misfolded)
    #[arg(long, value_name = "COLUMN")]
    pub outcome: Option<String>,

    /// Categorical column to stratify on; adds per-stratum tables and a Mantel-Haenszel odds ratio
    #[arg(long, value_name = "COLUMN")]
    pub stratify_by: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Boolean outcome column tested against every feature
    #[arg(long, value_name = "COLUMN")]
    pub outcome: Option<String>,

    /// Comma-separated boolean feature columns
    #[arg(long, value_name = "COLUMNS", value_delimiter = ',')]
    pub features: Vec<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct TableArgs {
    /// Feature present, outcome present
    pub a: u64,
    /// Feature present, outcome absent
    pub b: u64,
    /// Feature absent, outcome present
    pub c: u64,
    /// Feature absent, outcome absent
    pub d: u64,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser)]
#[command(
    name = "tanglestat",
    about = "Exact association testing for boolean feature/outcome tables."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Test one feature column against one outcome column
    #[command(about = "Contingency table, odds ratio and exact test for one feature/outcome pair")]
    Analyze(AnalyzeArgs),

    /// Test many feature columns against one outcome with FDR control
    #[command(about = "Test many features against one outcome (Benjamini-Hochberg q-values)")]
    Scan(ScanArgs),

    /// Analyse a table given directly as four counts
    #[command(about = "Odds ratio and exact test for the 2x2 table a b c d")]
    Table(TableArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Cli { command } = Cli::parse();

    let result = match command {
        Some(Commands::Analyze(args)) => run_analyze(args),
        Some(Commands::Scan(args)) => run_scan(args),
        Some(Commands::Table(args)) => run_table(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => {
            Cli::command().print_help().expect("print help");
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Loads the optional configuration file and applies the shared input flags on top.
fn base_config(
    input: &InputArgs,
    output: &OutputArgs,
) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config = match &input.config {
        Some(path) => {
            info!("Reading settings from {}", path.display());
            AnalysisConfig::load(path)?
        }
        None => AnalysisConfig::default(),
    };
    if input.id.is_some() {
        config.id = input.id.clone();
    }
    if input.separator.is_some() {
        config.separator = input.separator.clone();
    }
    if let Some(alt) = output.alternative {
        config.alternative = alt.into();
    }
    Ok(config)
}

/// Splits on commas happen in clap; names are trimmed here and blanks dropped.
fn feature_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn persist_config(
    config: &AnalysisConfig,
    input: &InputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &input.save_config {
        config.save(path)?;
        info!("Settings saved to {}", path.display());
    }
    Ok(())
}

fn report_undefined(err: &AnalysisError, labels: Labels<'_>) {
    if let Some(table) = err.table() {
        error!("The table was counted but the odds ratio is undefined");
        eprint!("{}", report::render_table(table, labels));
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = base_config(&args.input, &args.output)?;
    if args.feature.is_some() {
        config.feature = args.feature.clone();
    }
    if args.outcome.is_some() {
        config.outcome = args.outcome.clone();
    }
    if args.stratify_by.is_some() {
        config.stratify_by = args.stratify_by.clone();
    }

    let feature = config.feature_column()?;
    let outcome = config.outcome_column()?;
    persist_config(&config, &args.input)?;
    let labels = Labels { feature, outcome };
    let format = OutputFormat::from(args.output.format);

    let separator = resolve_separator(&args.input.data, config.separator.as_deref())?;
    let df = load_frame(&args.input.data, separator)?;
    let observations = observations_from_frame(&df, feature, outcome, config.id.as_deref())?;
    info!(
        "Analysing '{feature}' against '{outcome}' over {} records",
        observations.len()
    );

    if let Some(stratum) = config.stratify_by.as_deref() {
        let strata_labels = extract_label_column(&df, stratum)?;
        let result = analyze_stratified(&observations, &strata_labels, config.alternative)
            .inspect_err(|err| report_undefined(err, labels))?;
        match format {
            OutputFormat::Text => {
                print!("{}", report::render_stratified(&result, labels, stratum))
            }
            OutputFormat::Toml => {
                print!("{}", report::stratified_toml(&result, labels, stratum)?)
            }
            OutputFormat::Tsv => report::stratified_tsv(io::stdout().lock(), &result, labels)?,
        }
        return Ok(());
    }

    let result = analyze(&observations, config.alternative)
        .inspect_err(|err| report_undefined(err, labels))?;
    emit_association(&result, labels, format)
}

fn emit_association(
    result: &tanglestat::AssociationResult,
    labels: Labels<'_>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Text => print!("{}", report::render_association(result, labels)),
        OutputFormat::Toml => print!("{}", report::association_toml(result, labels)?),
        OutputFormat::Tsv => report::association_tsv(io::stdout().lock(), result, labels)?,
    }
    Ok(())
}

fn run_scan(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = base_config(&args.input, &args.output)?;
    if args.outcome.is_some() {
        config.outcome = args.outcome.clone();
    }
    let features = feature_list(&args.features);
    if !features.is_empty() {
        config.features = features;
    }

    let outcome = config.outcome_column()?;
    let features = config.feature_columns()?;
    persist_config(&config, &args.input)?;
    let separator = resolve_separator(&args.input.data, config.separator.as_deref())?;
    let df = load_frame(&args.input.data, separator)?;

    let results = scan_features(
        &df,
        features,
        outcome,
        config.id.as_deref(),
        config.alternative,
    )?;
    match OutputFormat::from(args.output.format) {
        OutputFormat::Text => print!("{}", report::render_scan(&results, outcome)),
        OutputFormat::Toml => print!("{}", report::scan_toml(&results, outcome)?),
        OutputFormat::Tsv => report::scan_tsv(io::stdout().lock(), &results, outcome)?,
    }
    Ok(())
}

fn run_table(args: TableArgs) -> Result<(), Box<dyn std::error::Error>> {
    let table = ContingencyTable::new(args.a, args.b, args.c, args.d);
    let alternative = args
        .output
        .alternative
        .map_or(Alternative::default(), Alternative::from);
    let labels = Labels::default();
    let result =
        analyze_table(table, 0, alternative).inspect_err(|err| report_undefined(err, labels))?;
    emit_association(&result, labels, args.output.format.into())
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(86_400, "days"), (3_600, "hours"), (60, "minutes")];

    match UNITS.iter().find(|(size, _)| seconds >= *size) {
        Some((size, unit)) => format!("{:.1} {unit} ago", seconds as f64 / *size as f64),
        None => format!("{seconds} seconds ago"),
    }
}

/// Seconds since this binary was built, when the build script recorded a time.
fn build_age() -> Option<u64> {
    let built: u64 = env!("TANGLESTAT_BUILD_TIMESTAMP")
        .parse()
        .ok()
        .filter(|t| *t > 0)?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    Some(now.saturating_sub(built))
}

fn print_version_info() {
    println!("tanglestat {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Release: {}",
        option_env!("TANGLESTAT_RELEASE_TAG").unwrap_or("development build")
    );
    match build_age() {
        Some(0) => println!("Built: just now"),
        Some(age) => println!("Built: {}", format_duration_ago(age)),
        None => {}
    }
}
