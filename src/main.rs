use clap::Parser;
use tech_proximity::core::ConfigProvider;
use tech_proximity::utils::error::ErrorSeverity;
use tech_proximity::utils::{logger, validation::Validate};
use tech_proximity::{CliConfig, FeedPipeline, LocalStorage, ProximityEngine, TomlConfig};

async fn run<C: ConfigProvider + Validate>(config: C) -> tech_proximity::Result<String> {
    config.validate()?;
    let pipeline = FeedPipeline::new(LocalStorage::default(), config);
    let engine = ProximityEngine::new(pipeline);
    engine.run().await
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // A TOML file replaces the detection and output flags wholesale.
    let toml = match cli.config.as_deref().map(TomlConfig::from_file).transpose() {
        Ok(toml) => toml,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(3);
        }
    };

    let verbose = cli.verbose || toml.as_ref().is_some_and(TomlConfig::verbose);
    if cli.json_logs || toml.as_ref().is_some_and(TomlConfig::json_logs) {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting tech-proximity");

    let result = match toml {
        Some(toml) => {
            tracing::debug!("TOML config: {:?}", toml);
            run(toml).await
        }
        None => {
            tracing::debug!("CLI config: {:?}", cli);
            run(cli).await
        }
    };

    match result {
        Ok(output_path) => {
            println!("✅ Proximity report written to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Proximity detection failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}
