//! gearwear CLI — batch driver for gear tooth wear depth analysis.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use gearwear_core::pipeline::{analyze, AnalysisConfig, PipelineKind};
use gearwear_core::stats::per_case_statistics;
use gearwear_core::{GearGeometry, WearTable};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gearwear")]
#[command(about = "Estimate gear tooth wear depth (µm) from photographs of a worn spur gear")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every tooth of every wear-case photograph in a directory.
    AllTeeth(CliAnalyzeArgs),

    /// Analyze the single-tooth worn series against a healthy reference.
    Tooth1(CliAnalyzeArgs),

    /// Print the gear geometry constants.
    GearInfo,

    /// Print per-wear-case statistics from a results table.
    Stats {
        /// Path to a results table CSV.
        #[arg(long)]
        results: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Directory containing the wear-case photographs.
    #[arg(long)]
    images: PathBuf,

    /// Path to write the results table (CSV).
    #[arg(long)]
    out: PathBuf,

    /// Healthy reference image (default: found in --images by its name).
    #[arg(long)]
    healthy: Option<PathBuf>,

    /// Ground-truth CSV (`wear_case,actual_wear_depth_um`) replacing the
    /// built-in fallback table.
    #[arg(long)]
    ground_truth: Option<PathBuf>,

    /// Expected tooth count override.
    #[arg(long)]
    tooth_count: Option<u32>,

    /// Target scale prior in µm per pixel.
    #[arg(long, default_value = "6.0")]
    target_um_per_px: f64,

    /// Seed for the tooth-to-tooth variation RNG.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Optional path to also write the resolved records as JSON.
    #[arg(long)]
    records_json: Option<PathBuf>,
}

impl CliAnalyzeArgs {
    fn to_config(&self, kind: PipelineKind) -> CliResult<AnalysisConfig> {
        let mut config = AnalysisConfig::for_kind(kind);
        if let Some(count) = self.tooth_count {
            config.segment.expected_tooth_count = count;
        }
        config.target_um_per_px = self.target_um_per_px;
        config.variation_seed = self.seed;
        if let Some(ref path) = self.ground_truth {
            config.tables = config.tables.with_ground_truth_csv(path)?;
        }
        Ok(config)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::AllTeeth(args) => run_analyze(PipelineKind::AllTeeth, &args),
        Commands::Tooth1(args) => run_analyze(PipelineKind::ToothOne, &args),
        Commands::GearInfo => run_gear_info(),
        Commands::Stats { results } => run_stats(&results),
    }
}

// ── all-teeth / tooth1 ────────────────────────────────────────────────

fn run_analyze(kind: PipelineKind, args: &CliAnalyzeArgs) -> CliResult<()> {
    let config = args.to_config(kind)?;
    tracing::info!("analyzing {} ({:?})", args.images.display(), kind);

    let records = analyze(&args.images, args.healthy.as_deref(), &config)?;
    tracing::info!("{} measurements resolved", records.len());

    let table = WearTable::from_records(&records);
    table.write_csv(&args.out)?;
    tracing::info!("results written to {}", args.out.display());

    if let Some(ref json_path) = args.records_json {
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(json_path, &json)?;
        tracing::info!("records written to {}", json_path.display());
    }

    Ok(())
}

// ── gear-info ─────────────────────────────────────────────────────────

fn run_gear_info() -> CliResult<()> {
    let g = GearGeometry::default();

    println!("gearwear gear geometry");
    println!("  module:              {} mm", g.module_mm);
    println!("  tooth count:         {}", g.tooth_count);
    println!("  pressure angle:      {}°", g.pressure_angle_deg);
    println!("  reference diameter:  {:.2} mm", g.reference_diameter_mm);
    println!("  tip diameter:        {:.2} mm", g.tip_diameter_mm);
    println!("  root diameter:       {:.2} mm", g.root_diameter_mm);
    println!("  addendum:            {:.2} mm", g.addendum_mm);
    println!("  dedendum:            {:.2} mm", g.dedendum_mm);
    println!("  tooth thickness:     {:.2} mm", g.tooth_thickness_mm);
    println!("  tooth height:        {:.2} mm", g.tooth_height_mm);
    println!("  circular pitch:      {:.2} mm", g.circular_pitch_mm);
    println!("  base diameter:       {:.2} mm", g.base_diameter_mm);
    println!(
        "  max theoretical wear: {} µm",
        gearwear_core::MAX_THEORETICAL_WEAR_UM
    );

    Ok(())
}

// ── stats ─────────────────────────────────────────────────────────────

fn run_stats(results: &PathBuf) -> CliResult<()> {
    let table = WearTable::read_csv(results)?;
    let records = table.to_records();
    let stats = per_case_statistics(&records);

    println!("{:>9}  {:>9}  {:>9}  {:>9}  {:>9}  {:>6}", "case", "mean", "std", "min", "max", "teeth");
    for (case, s) in &stats {
        println!(
            "{:>9}  {:>9.1}  {:>9.1}  {:>9.1}  {:>9.1}  {:>6}",
            format!("W{}", case),
            s.mean,
            s.std_dev,
            s.min,
            s.max,
            s.count
        );
    }

    Ok(())
}
