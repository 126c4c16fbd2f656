//! wflux - Command-line interface for Wheel Flux
//!
//! Commands:
//! - intervals: Extract night-time running intervals for every subject
//! - daynight: Day/light/night totals and the night listing
//! - histogram: Weekly night-time speed densities
//! - validate: Parse a sample file and report its shape

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wheel_flux::encoder::ReportEncoder;
use wheel_flux::histogram::WeeklyHistogram;
use wheel_flux::report;
use wheel_flux::schema::{SampleFileAdapter, SampleTable};
use wheel_flux::types::{DayNightTotals, NightSummary, TimeOfDay};
use wheel_flux::{ActivityProcessor, AnalysisConfig, AnalysisRange, ComputeError, VERSION};

/// wflux - Day/night activity analysis for running-wheel recordings
#[derive(Parser)]
#[command(name = "wflux")]
#[command(version = VERSION)]
#[command(about = "Analyse multi-subject wheel-running recordings", long_about = None)]
struct Cli {
    /// Log pipeline progress (debug level)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract night-time running intervals for every subject
    Intervals {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output format
        #[arg(long, default_value = "auto")]
        format: IntervalFormat,
    },

    /// Day/light/night totals and the night listing
    Daynight {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output format
        #[arg(long, default_value = "auto")]
        format: TextFormat,
    },

    /// Weekly night-time speed densities
    Histogram {
        #[command(flatten)]
        analysis: AnalysisArgs,

        /// Output format
        #[arg(long, default_value = "auto")]
        format: TextFormat,
    },

    /// Parse a sample file and report its shape
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file path (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Subject names in column order, comma-separated (default: column numbers)
    #[arg(long, value_delimiter = ',')]
    names: Vec<String>,

    /// Only analyse these subjects, comma-separated, in the given order
    #[arg(long, value_delimiter = ',')]
    subjects: Vec<String>,

    /// Start of the day and of the light window (HH:MM)
    #[arg(short, long)]
    day: Option<TimeOfDay>,

    /// Start of the night window (HH:MM)
    #[arg(short, long)]
    night: Option<TimeOfDay>,

    /// Minimum quiet time that ends a run (seconds)
    #[arg(short, long)]
    min_retire: Option<f64>,

    /// Wheel turns to metres
    #[arg(short, long)]
    turns_to_meters: Option<f64>,

    /// First analysed sample ("dd.mm.YYYY HH:MM" or epoch seconds)
    #[arg(long, requires = "stop")]
    start: Option<String>,

    /// Last analysed sample ("dd.mm.YYYY HH:MM" or epoch seconds)
    #[arg(long, requires = "start")]
    stop: Option<String>,

    /// Local time offset east of UTC (minutes)
    #[arg(long, allow_hyphen_values = true)]
    utc_offset: Option<i32>,

    /// Load configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Process subjects in parallel
    #[arg(long)]
    parallel: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum IntervalFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Fixed-width interval table
    Table,
    /// Comma-separated values with a row index
    Csv,
    /// Full JSON report
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum TextFormat {
    /// Text on a terminal, JSON otherwise
    Auto,
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: logging already initialised");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), WfluxCliError> {
    match command {
        Commands::Intervals { analysis, format } => cmd_intervals(&analysis, format),
        Commands::Daynight { analysis, format } => cmd_daynight(&analysis, format),
        Commands::Histogram { analysis, format } => cmd_histogram(&analysis, format),
        Commands::Validate { input, json } => cmd_validate(&input, json),
    }
}

fn cmd_intervals(args: &AnalysisArgs, format: IntervalFormat) -> Result<(), WfluxCliError> {
    let config = build_config(args)?;
    let table = load_named_table(args)?;
    let output = ActivityProcessor::new(config.clone())?.analyze(&table)?;
    info!(intervals = output.intervals.len(), "intervals found");

    let rendered = match resolve_interval_format(format, &args.output) {
        IntervalFormat::Csv => report::interval_csv(&output.intervals),
        IntervalFormat::Json => ReportEncoder::new().encode_to_json(&config, &output)?,
        IntervalFormat::Table | IntervalFormat::Auto => {
            report::interval_table(&source_name(&args.input), &output.intervals)
        }
    };
    write_output(&args.output, &rendered)
}

#[derive(serde::Serialize)]
struct DayNightDocument<'a> {
    totals: &'a DayNightTotals,
    nights: &'a [NightSummary],
}

fn cmd_daynight(args: &AnalysisArgs, format: TextFormat) -> Result<(), WfluxCliError> {
    let config = build_config(args)?;
    let table = load_named_table(args)?;
    let output = ActivityProcessor::new(config.clone())?.analyze(&table)?;

    let rendered = if wants_json(format, &args.output) {
        serde_json::to_string_pretty(&DayNightDocument {
            totals: &output.totals,
            nights: &output.nights,
        })?
    } else {
        let calendar = config.calendar()?;
        let totals = &output.totals;
        let mut text = report::range_heading(&calendar, output.range_start, output.range_end);
        text.push('\n');
        for aggregate in [&totals.day, &totals.light, &totals.night] {
            text.push_str(&report::aggregate_table(aggregate));
        }
        text.push_str("# nights\n");
        text.push_str(&report::night_listing(&output.nights, &calendar));
        for diagnostic in &totals.diagnostics {
            text.push_str(&format!("# {}: {}\n", diagnostic.label.as_str(), diagnostic.message));
        }
        text
    };
    write_output(&args.output, &rendered)
}

fn cmd_histogram(args: &AnalysisArgs, format: TextFormat) -> Result<(), WfluxCliError> {
    let config = build_config(args)?;
    let table = load_named_table(args)?;
    let histograms: Vec<WeeklyHistogram> = ActivityProcessor::new(config)?.speed_histograms(&table)?;

    let rendered = if wants_json(format, &args.output) {
        serde_json::to_string_pretty(&histograms)?
    } else {
        histograms
            .iter()
            .map(|h| format!("# subject {}\n{}", h.subject, h.to_data_text()))
            .collect()
    };
    write_output(&args.output, &rendered)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), WfluxCliError> {
    let table = load_table(input)?;
    let summary = SampleFileAdapter::describe(&table);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let calendar = AnalysisConfig::default().calendar()?;
        println!("Validation Report");
        println!("=================");
        println!("Rows:     {}", summary.rows);
        println!("Subjects: {}", summary.subjects.join(", "));
        if let (Some(first), Some(last)) = (summary.first_timestamp, summary.last_timestamp) {
            println!("From:     {} (UTC)", calendar.format(first));
            println!("To:       {} (UTC)", calendar.format(last));
        }
        match summary.cadence_secs {
            Some(step) => println!("Cadence:  {} s", step),
            None => println!("Cadence:  n/a"),
        }
    }
    Ok(())
}

/// Config file (or defaults), then command-line overrides
fn build_config(args: &AnalysisArgs) -> Result<AnalysisConfig, WfluxCliError> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    if args.day.is_some() || args.night.is_some() {
        let morning = args.day.unwrap_or(config.day_start);
        let evening = args.night.unwrap_or(config.night.from);
        let schedule = AnalysisConfig::from_schedule(morning, evening);
        config.day_start = schedule.day_start;
        config.light = schedule.light;
        config.night = schedule.night;
    }
    if let Some(secs) = args.min_retire {
        config.min_retire_secs = secs;
    }
    if let Some(factor) = args.turns_to_meters {
        config.unit_conversion = factor;
    }
    if let Some(offset) = args.utc_offset {
        config.utc_offset_minutes = offset;
    }
    if args.parallel {
        config.parallel = true;
    }
    if let (Some(start), Some(stop)) = (&args.start, &args.stop) {
        let calendar = config.calendar()?;
        config.range = AnalysisRange::Between {
            start: calendar.parse_datetime(start)?,
            end: calendar.parse_datetime(stop)?,
        };
    }

    config.validate()?;
    Ok(config)
}

fn load_table(input: &Path) -> Result<SampleTable, WfluxCliError> {
    let text = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        info!(path = %input.display(), "reading samples");
        fs::read_to_string(input)?
    };
    let table = SampleFileAdapter::parse_text(&text)?;
    if table.is_empty() {
        return Err(WfluxCliError::NoSamples);
    }
    Ok(table)
}

/// Input table, renamed by `--names` and then filtered by `--subjects`
fn load_named_table(args: &AnalysisArgs) -> Result<SampleTable, WfluxCliError> {
    let mut table = load_table(&args.input)?;
    if !args.names.is_empty() {
        table = table.with_subject_names(args.names.clone())?;
    }
    if !args.subjects.is_empty() {
        let ids: Vec<&str> = args.subjects.iter().map(String::as_str).collect();
        table = table.select_subjects(&ids)?;
    }
    Ok(table)
}

fn write_output(output: &Path, data: &str) -> Result<(), WfluxCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
        info!(path = %output.display(), "output written");
    }
    Ok(())
}

fn source_name(input: &Path) -> String {
    if input.to_string_lossy() == "-" {
        "stdin".to_string()
    } else {
        input.display().to_string()
    }
}

/// Auto renders text on a terminal and JSON everywhere else
fn writes_to_terminal(output: &Path) -> bool {
    output.to_string_lossy() == "-" && atty::is(atty::Stream::Stdout)
}

fn wants_json(format: TextFormat, output: &Path) -> bool {
    match format {
        TextFormat::Json => true,
        TextFormat::Text => false,
        TextFormat::Auto => !writes_to_terminal(output),
    }
}

fn resolve_interval_format(format: IntervalFormat, output: &Path) -> IntervalFormat {
    match format {
        IntervalFormat::Auto if writes_to_terminal(output) => IntervalFormat::Table,
        IntervalFormat::Auto => IntervalFormat::Json,
        other => other,
    }
}

// Error types

#[derive(Debug)]
enum WfluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoSamples,
}

impl From<io::Error> for WfluxCliError {
    fn from(e: io::Error) -> Self {
        WfluxCliError::Io(e)
    }
}

impl From<ComputeError> for WfluxCliError {
    fn from(e: ComputeError) -> Self {
        WfluxCliError::Compute(e)
    }
}

impl From<serde_json::Error> for WfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        WfluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<WfluxCliError> for CliError {
    fn from(e: WfluxCliError) -> Self {
        match e {
            WfluxCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            WfluxCliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::ParseError(_) => ("PARSE_ERROR", "Check the sample file format; run 'wflux validate'"),
                    ComputeError::InvalidTimeOfDay(_) | ComputeError::DateParseError(_) => {
                        ("TIME_ERROR", "Times are HH:MM, dates dd.mm.YYYY HH:MM")
                    }
                    ComputeError::ConfigError(_) | ComputeError::JsonError(_) => {
                        ("CONFIG_ERROR", "Check the configuration file and flags")
                    }
                    ComputeError::RangeOutsideData(_) | ComputeError::InvalidRange { .. } => {
                        ("RANGE_ERROR", "Pick --start/--stop inside the recorded data")
                    }
                    ComputeError::DegenerateWindow { .. } => {
                        ("WINDOW_ERROR", "Window start and end must differ")
                    }
                    _ if e.is_invariant_violation() => ("INTERNAL_ERROR", "Please report this input"),
                    _ => ("COMPUTE_ERROR", "Check the input data"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            WfluxCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            WfluxCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}
