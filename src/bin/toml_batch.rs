use clap::Parser;
use galfitm_feedme::adapters::sort_bands_by_wavelength;
use galfitm_feedme::core::batch;
use galfitm_feedme::domain::ports::BatchSettings;
use galfitm_feedme::utils::error::ErrorSeverity;
use galfitm_feedme::utils::{logger, validation::Validate};
use galfitm_feedme::BatchConfig;

#[derive(Parser)]
#[command(name = "toml-batch")]
#[command(about = "GalfitM batch fitting driven by a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "batch.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Show what would be processed without downloading or fitting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // config first: it picks the log format
    let config = match BatchConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("🚀 Starting TOML-based GalfitM batch");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = batch::run_from_settings(
        &config,
        &config.batch.table,
        config.survey_config(),
        config.survey.zero_points.as_deref(),
        monitor_enabled,
    )
    .await;

    match result {
        Ok(summary) => {
            tracing::info!("✅ Batch {} completed", summary.run_id);
            println!(
                "✅ {} fitted, {} failed",
                summary.processed.len(),
                summary.failed.len()
            );
            println!("📁 Results saved to: {}", config.output_folder());
        }
        Err(e) => {
            tracing::error!(
                "❌ Batch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &BatchConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Batch: {}", config.batch.name);
    if let Some(description) = &config.batch.description {
        println!("  Description: {}", description);
    }
    println!("  Table: {}", config.batch.table);
    println!("  Bands: {}", config.bands().join(", "));
    println!("  Components: {}", config.components().join(", "));
    println!("  Cut size: {} px", config.cut_size());
    println!("  GalfitM: {} (timeout {}s)", config.executable(), config.timeout_seconds());
    println!("  Output: {}", config.output_folder());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &BatchConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Survey:");
    println!("  TAP: {}", config.survey.tap_endpoint);
    println!("  Cutouts: {}", config.survey.cutout_endpoint);
    println!(
        "  Credentials: {}",
        if config.survey_config().user.is_some() { "configured" } else { "anonymous" }
    );
    match &config.survey.zero_points {
        Some(path) => println!("  Zero points: {}", path),
        None => println!("  Zero points: none (0 for every band)"),
    }

    let sorted = sort_bands_by_wavelength(config.bands());
    if sorted != config.bands() {
        println!();
        println!("⚠️ Bands are not in wavelength order; by wavelength: {}", sorted.join(", "));
    }

    // Object table
    println!();
    println!("🔭 Objects:");
    let data = tokio::fs::read(&config.batch.table).await?;
    let objects = galfitm_feedme::adapters::read_objects(&data)?;
    println!("  {} objects in {}", objects.len(), config.batch.table);
    for object in objects.iter().take(5) {
        println!("  {} (RA {}, DEC {})", object.name, object.ra, object.dec);
    }
    if objects.len() > 5 {
        println!("  ...");
    }

    if !config.fit.base.is_empty() {
        println!();
        println!("🛠️ Base overrides:");
        for (key, value) in &config.fit.base {
            println!("  {}) {}", key, value);
        }
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
