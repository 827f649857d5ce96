use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use mic_plate::{load_rgb, AnalysisReport, AnalyzerConfig, PlateAnalysis, PlateAnalyzer};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

#[derive(Debug, Parser)]
#[command(name = "mic-plate", version, about = "Read MIC values from 96-well plate photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one plate photograph and write a JSON report.
    Analyze(AnalyzeArgs),
    /// Write the default configuration as JSON.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Plate photograph (any format the `image` crate decodes).
    image: PathBuf,

    #[arg(long, help = "JSON analyzer configuration")]
    config: Option<PathBuf>,

    #[arg(long, help = "Report path (default: <image stem>_mic.json)")]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Destination file.
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Config(args) => {
            AnalyzerConfig::default().write_json(&args.output)?;
            println!("wrote {}", args.output.display());
            Ok(())
        }
    }
}

fn init_logging(level: LevelFilter) {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        mic_plate::core::init_tracing_with_level(false, level);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = mic_plate::core::init_with_level(level);
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log_level.into());

    let cfg = match &args.config {
        Some(path) => AnalyzerConfig::load_json(path)?,
        None => AnalyzerConfig::default(),
    };
    let out_path = args
        .output
        .clone()
        .unwrap_or_else(|| cfg.output_path(&args.image));

    let mut report = AnalysisReport::new(&args.image, args.config.as_deref(), &cfg);
    let analyzer = PlateAnalyzer::new(cfg);
    let result = load_rgb(&args.image).and_then(|img| analyzer.analyze(&img.view()));
    match result {
        Ok(analysis) => {
            report.set_analysis(&analysis);
            report.write_json(&out_path)?;
            print_table(&analysis);
            println!("report: {}", out_path.display());
            Ok(())
        }
        Err(err) => {
            report.set_error(&err);
            report.write_json(&out_path)?;
            Err(err.into())
        }
    }
}

fn print_table(a: &PlateAnalysis) {
    println!(
        "plate {}x{} via {:?}, grid quality {:.2}{}",
        a.location.image.width,
        a.location.image.height,
        a.location.strategy,
        a.quality.overall_score,
        if a.naive_grid { " (equal-division grid)" } else { "" }
    );
    println!("{:<4} {:<16} {:>10}", "row", "drug", "MIC mg/L");
    for r in &a.mic.results {
        println!(
            "{:<4} {:<16} {:>10}",
            mic_plate::core::layout::row_label(r.drug_row),
            r.drug_name,
            r.display_value()
        );
    }
    let low = a.low_confidence_wells().count();
    if low > 0 {
        println!("{low} wells need review");
    }
    if !a.mic.control_valid {
        println!("WARNING: growth control failed, repeat the test");
    }
}
