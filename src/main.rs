use anyhow::Result;
use clap::{Parser, Subcommand};
use fitcoach_cli::transport::cli::{self, RunOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fitcoach")]
#[command(author, version, about = "fitcoach - multi-agent fitness coach", long_about = None)]
struct Cli {
    /// Omit to run the three demo queries
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run without a model: rule-based guardrail, keyword routing, local plans
    #[arg(long, global = true)]
    offline: bool,

    /// LLM provider to use (openai, openrouter, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model to use (e.g., gpt-4.1-mini, llama3.2)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        query: String,

        /// beginner, intermediate or advanced
        #[arg(long, default_value = "beginner")]
        level: String,

        #[arg(long, default_value = "")]
        goal: String,

        #[arg(long, default_value = "no restrictions")]
        diet: String,

        /// Comma-separated, e.g. "dumbbells,resistance bands"
        #[arg(long, value_delimiter = ',')]
        equipment: Vec<String>,

        #[arg(long, default_value_t = 70.0)]
        weight_kg: f64,

        #[arg(long, default_value_t = 170.0)]
        height_cm: f64,

        #[arg(long, default_value_t = 30)]
        age: u32,

        #[arg(long, default_value = "male")]
        gender: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "fitcoach_cli=debug"
    } else {
        "fitcoach_cli=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let opts = RunOptions {
        offline: cli.offline,
        provider: cli.provider,
        model: cli.model,
        config_path: cli.config,
    };

    match cli.command {
        None => cli::run_demo(&opts).await?,
        Some(Commands::Ask {
            query,
            level,
            goal,
            diet,
            equipment,
            weight_kg,
            height_cm,
            age,
            gender,
        }) => {
            let profile = fitcoach_cli::core::UserContext::new("cli-user", level, goal, diet)
                .with_equipment(equipment.into_iter().map(|e| e.trim().to_string()))
                .with_stats(weight_kg, height_cm, age, gender);
            cli::run_ask(&query, profile, &opts).await?;
        }
    }

    Ok(())
}
