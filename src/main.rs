use clap::Parser;
use galfitm_feedme::core::batch;
use galfitm_feedme::utils::error::ErrorSeverity;
use galfitm_feedme::utils::{logger, validation::Validate};
use galfitm_feedme::CliConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // Logging
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting galfitm-feedme batch");
    if config.verbose {
        tracing::debug!("CLI config: {}", serde_json::to_string(&config)?);
    }

    // Validate before touching the network
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = batch::run_from_settings(
        &config,
        &config.table_path,
        config.survey_config(),
        config.zero_points.as_deref(),
        config.monitor,
    )
    .await;

    match result {
        Ok(summary) => {
            tracing::info!("✅ Batch completed: {} objects", summary.total());
            println!(
                "✅ {} fitted, {} failed",
                summary.processed.len(),
                summary.failed.len()
            );
            for failure in &summary.failed {
                println!("   ⏭️  {}: {}", failure.name, failure.error);
            }
            println!("📁 Results saved to: {}", config.output_folder);
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

            // exit code follows error severity
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
