use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use geonorm::config;
use geonorm::parser::MalformedPolicy;
use geonorm::pipeline::{self, DivisionsConfig, TownsConfig, ZipCodesConfig};
use geonorm::resolve::EscalationConfig;
use geonorm::stats::ReadStats;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "geonorm")]
#[command(about = "Normalize GeoNames dumps into per-country locality tables")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve localities per country from the place gazetteer
    Towns(TownsArgs),
    /// Normalize and deduplicate the postal-code gazetteer
    ZipCodes(ZipCodesArgs),
    /// Build region/department lookup tables for one country
    Divisions(DivisionsArgs),
}

#[derive(Args)]
struct TownsArgs {
    /// Path to the place gazetteer (allCountries.txt)
    #[arg(short, long, default_value = config::DEFAULT_GAZETTEER_PATH)]
    input: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = config::DEFAULT_TOWNS_OUTPUT)]
    output: PathBuf,

    /// Comma-separated country codes (default: every country in the input)
    #[arg(long)]
    countries: Option<String>,

    /// Countries with fewer localities are resolved again one level up
    #[arg(long, default_value_t = config::MIN_LOCALITIES_PER_COUNTRY)]
    min_localities: usize,

    /// Force rebuild of the admin index cache
    #[arg(long)]
    no_cache: bool,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Args)]
struct ZipCodesArgs {
    /// Path to the postal-code gazetteer
    #[arg(short, long, default_value = config::DEFAULT_POSTAL_PATH)]
    input: PathBuf,

    /// Output JSON file
    #[arg(short, long, default_value = config::DEFAULT_ZIP_OUTPUT)]
    output: PathBuf,

    /// Comma-separated country codes to keep
    #[arg(long)]
    countries: Option<String>,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    fail_fast: bool,
}

#[derive(Args)]
struct DivisionsArgs {
    /// Path to a gazetteer dump containing the country's ADM1/ADM2 records
    #[arg(short, long)]
    input: PathBuf,

    /// Two-letter country code
    #[arg(short, long)]
    country: String,

    /// Output JSON file
    #[arg(short, long, default_value = config::DEFAULT_DIVISIONS_OUTPUT)]
    output: PathBuf,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    fail_fast: bool,
}

fn policy(fail_fast: bool) -> MalformedPolicy {
    if fail_fast {
        MalformedPolicy::Abort
    } else {
        MalformedPolicy::Skip
    }
}

fn print_read_stats(stats: &ReadStats) {
    println!("Lines read:         {}", stats.lines());
    println!("Records parsed:     {}", stats.parsed());
    println!("Malformed skipped:  {}", stats.malformed());
}

fn run_towns(args: TownsArgs) -> Result<()> {
    let start = Instant::now();
    let config = TownsConfig {
        input: args.input,
        output: args.output,
        countries: args.countries.as_deref().map(pipeline::parse_country_list),
        escalation: EscalationConfig {
            min_localities: args.min_localities,
            ..EscalationConfig::default()
        },
        use_cache: !args.no_cache,
        policy: policy(args.fail_fast),
    };

    let report = pipeline::run_towns(&config)?;
    info!(duration_secs = start.elapsed().as_secs_f64(), "Towns complete");

    println!();
    println!("=== Summary ===");
    match &report.read {
        Some(stats) => print_read_stats(stats),
        None => println!("Admin index:        loaded from cache"),
    }
    for pass in &report.passes {
        println!(
            "{} pass:          {} countries requested, {} localities, {} empty",
            pass.level,
            pass.requested,
            pass.summary.total(),
            pass.summary.empty
        );
    }
    println!("Countries:          {}", report.summary.counts.len());
    println!("Empty countries:    {}", report.summary.empty);
    println!("Localities:         {}", report.summary.total());
    println!("Total time:         {:.2}s", start.elapsed().as_secs_f64());
    println!("Output:             {}", config.output.display());

    Ok(())
}

fn run_zip_codes(args: ZipCodesArgs) -> Result<()> {
    let start = Instant::now();
    let config = ZipCodesConfig {
        input: args.input,
        output: args.output,
        countries: args.countries.as_deref().map(pipeline::parse_country_list),
        policy: policy(args.fail_fast),
    };

    let report = pipeline::run_zip_codes(&config)?;

    println!();
    println!("=== Summary ===");
    print_read_stats(&report.read);
    println!("Missing country:    {}", report.normalize.missing_country());
    println!("Unusable codes:     {}", report.normalize.unusable_code());
    println!("Duplicates merged:  {}", report.normalize.duplicates());
    println!("Distinct kept:      {}", report.normalize.kept());
    println!("Countries:          {}", report.summary.counts.len());
    println!("Localities:         {}", report.summary.total());
    println!("Total time:         {:.2}s", start.elapsed().as_secs_f64());
    println!("Output:             {}", config.output.display());

    Ok(())
}

fn run_divisions(args: DivisionsArgs) -> Result<()> {
    let config = DivisionsConfig {
        input: args.input,
        output: args.output,
        country: args.country,
        policy: policy(args.fail_fast),
    };

    let table = pipeline::run_divisions(&config)?;

    println!();
    println!("=== Summary ===");
    println!("Regions:            {}", table.regions.len());
    println!("Departments:        {}", table.departments.len());
    println!("Output:             {}", config.output.display());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Towns(args) => run_towns(args),
        Commands::ZipCodes(args) => run_zip_codes(args),
        Commands::Divisions(args) => run_divisions(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
