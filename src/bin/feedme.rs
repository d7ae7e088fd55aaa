use anyhow::Context;
use clap::{Parser, Subcommand};
use galfitm_feedme::core::results::{result_record, ResultStore};
use galfitm_feedme::feedme::{self, band_warnings, Model};
use galfitm_feedme::utils::{logger, validation};
use galfitm_feedme::{GalfitmInvoker, LocalStorage};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "feedme")]
#[command(about = "Create, check and run GalfitM feedme files")]
struct Args {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a feedme built from the default base fields and templates
    Render {
        /// Component types to activate, in order
        #[arg(long, value_delimiter = ',', default_value = "sersic,sky")]
        components: Vec<String>,

        /// Base field values such as A1=g,r,i (repeatable)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a feedme and report band-consistency warnings
    Check { file: PathBuf },
    /// Collect result records of parsed feedme or `.band` files into a CSV
    Table {
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "results.csv")]
        output: String,
    },
    /// Run GalfitM on an existing feedme
    Run {
        file: PathBuf,

        #[arg(short = 'G', long, default_value = "galfitm")]
        galfit_path: String,

        #[arg(long, default_value = "600")]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    match args.command {
        Command::Render {
            components,
            set,
            output,
        } => {
            validation::validate_components("components", &components)?;
            let mut model = Model::new();
            for entry in &set {
                let (key, value) = galfitm_feedme::config::parse_base_override(entry)?;
                model.set_base_value_by_name(&key, value)?;
            }
            model.activate_components(&components)?;
            model.validate_band_consistency();

            match output {
                Some(path) => {
                    feedme::write_feedme(&model, &path)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    println!("📝 Feedme written to {}", path.display());
                }
                None => print!("{}", feedme::render(&model)),
            }
        }
        Command::Check { file } => {
            let model = feedme::read_feedme(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            println!(
                "📋 {}: {} bands, components {}",
                file.display(),
                model.band_count(),
                model.active_components().join(", ")
            );

            let warnings = band_warnings(&model);
            if warnings.is_empty() {
                println!("✅ Band configuration is consistent");
            } else {
                for warning in &warnings {
                    println!("⚠️ {}", warning);
                }
                std::process::exit(1);
            }
        }
        Command::Table { files, output } => {
            let storage = LocalStorage::new(".".to_string());
            let mut store = ResultStore::load(&storage, &output).await?;
            for file in &files {
                let mut model = feedme::read_feedme(file)
                    .with_context(|| format!("cannot read {}", file.display()))?;
                // file stem is the ID
                let stem = file
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let id = stem.split("ss.galfit").next().unwrap_or(&stem).to_string();
                model.set_name(id);
                store.push(result_record(&model));
            }
            store.save(&storage).await?;
            println!("💾 {} records in {}", store.len(), output);
        }
        Command::Run {
            file,
            galfit_path,
            timeout_secs,
        } => {
            let invoker = GalfitmInvoker::new(galfit_path, timeout_secs);
            match invoker.run(&file).await {
                Ok(output) => {
                    print!("{}", output.stdout);
                    println!("✅ GalfitM finished in {:?}", output.duration);
                }
                Err(e) => {
                    eprintln!("❌ {}", e.user_friendly_message());
                    eprintln!("💡 {}", e.recovery_suggestion());
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
