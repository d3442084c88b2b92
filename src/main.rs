use anyhow::Result;
use clap::Parser;
use log::{ debug, info };

use hal_annotator::GatewayConfig;

mod cli;
use cli::commands::annotate::AnnotateArgs;
use cli::{ Commands, HalCli };

#[tokio::main]
async fn main() -> Result<()> {
    // Parse the command line arguments
    let cli = HalCli::parse();

    // Setup logging
    setup_logging(&cli.log_level);

    // API keys may live in a .env file next to the dataset
    if dotenv::dotenv().is_ok() {
        debug!("Loaded environment variables from .env file");
    }

    let config = match &cli.config {
        Some(path) => {
            info!("Loading gateway configuration from {}", path.display());
            GatewayConfig::from_file(path)?
        }
        None => GatewayConfig::default(),
    };

    match cli.command {
        Commands::Annotate {
            input,
            output,
            image_root,
            verification_mode,
            double_check,
            no_subjective,
            limit,
            checkpoint_every,
            fail_fast,
            force,
        } => {
            let args = AnnotateArgs {
                input,
                output,
                image_root,
                verification_mode,
                double_check,
                no_subjective,
                limit,
                checkpoint_every,
                fail_fast,
                force,
            };
            cli::commands::annotate::execute(config, args).await?;
        }

        Commands::Extract { description } => {
            cli::commands::extract::execute(config, &description).await?;
        }

        Commands::Verify { image, claim, no_subjective } => {
            cli::commands::verify::execute(config, &image, &claim, no_subjective).await?;
        }
    }

    Ok(())
}

fn setup_logging(log_level: &str) {
    // Set up the logger based on the log level
    let level = match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::new().filter_level(level).init();

    info!("Logger initialized with level: {}", log_level);
}
