mod config;
mod error;
mod fetcher;
mod inference;
mod interpreter;
mod pipeline;
mod prompt;
mod sanitizer;
mod server;
mod types;

#[cfg(test)]
mod testing;

use clap::{Parser, Subcommand};

use config::Settings;
use pipeline::Analyzer;
use types::AnalysisRequest;

#[derive(Parser)]
#[command(
    name = "smart_sources",
    about = "Fetch a page and state what it says about a given context, via a local LLM"
)]
struct Cli {
    /// Inference endpoint (overrides OLLAMA_URL)
    #[arg(long, global = true)]
    ollama_url: Option<String>,
    /// Model identifier (overrides MODEL_NAME)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve {
        /// Listening port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyze one URL and print the response envelope
    Analyze {
        #[arg(short, long)]
        url: String,
        #[arg(short, long, default_value = "")]
        context: String,
    },
    /// Print the prompt that would be sent for a URL, without calling the model
    Prompt {
        #[arg(short, long)]
        url: String,
        #[arg(short, long, default_value = "")]
        context: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(url) = cli.ollama_url {
        settings.ollama_url = url;
    }
    if let Some(model) = cli.model {
        settings.model_name = model;
    }

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                settings.port = port;
            }
            tracing::info!(
                model = %settings.model_name,
                ollama_url = %settings.ollama_url,
                max_content_chars = settings.max_content_chars,
                "Starting"
            );
            let analyzer = Analyzer::from_settings(&settings)?;
            server::serve(&settings.listen_addr(), analyzer).await
        }
        Commands::Analyze { url, context } => {
            let analyzer = Analyzer::from_settings(&settings)?;
            let envelope = analyzer.analyze(&AnalysisRequest::new(url, context)).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            Ok(())
        }
        Commands::Prompt { url, context } => {
            let analyzer = Analyzer::from_settings(&settings)?;
            let prompt = analyzer
                .build_prompt(&AnalysisRequest::new(url, context))
                .await?;
            println!("{}", prompt);
            Ok(())
        }
    }
}
