use clap::{Args, Parser, Subcommand};
use serde_json::{json, Number, Value};
use std::time::Duration;

use calculator_app::loadgen::{LoadTest, RampSchedule};

#[derive(Parser)]
#[command(name = "calc-cli")]
#[command(about = "Client and load generator for the calculator service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Operands {
    #[arg(allow_negative_numbers = true)]
    x: Number,
    #[arg(allow_negative_numbers = true)]
    y: Number,
}

#[derive(Subcommand)]
enum Commands {
    /// x + y
    Add(Operands),
    /// x - y
    Subtract(Operands),
    /// x * y
    Multiply(Operands),
    /// x / y
    Divide(Operands),
    /// Multi-step calculation
    Calculate(Operands),
    /// Check service health
    Health,
    /// Run a ramping load test
    Load {
        /// Virtual users at the start.
        #[arg(long, default_value_t = 10)]
        start_vus: usize,
        /// Virtual users added per stage.
        #[arg(long, default_value_t = 10)]
        step: usize,
        /// Virtual users in the final stage.
        #[arg(long, default_value_t = 100)]
        target: usize,
        /// Length of each stage in seconds.
        #[arg(long, default_value_t = 30)]
        stage_secs: u64,
        /// Pause between requests of one virtual user, in milliseconds.
        #[arg(long, default_value_t = 1000)]
        think_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let (path, operands) = match cli.command {
        Commands::Add(o) => ("add", o),
        Commands::Subtract(o) => ("subtract", o),
        Commands::Multiply(o) => ("multiply", o),
        Commands::Divide(o) => ("divide", o),
        Commands::Calculate(o) => ("calculate", o),
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            return print_response(res).await;
        }
        Commands::Load {
            start_vus,
            step,
            target,
            stage_secs,
            think_ms,
        } => {
            let schedule =
                RampSchedule::linear(start_vus, step, target, Duration::from_secs(stage_secs));
            let report = LoadTest::new(base, schedule)
                .with_think_time(Duration::from_millis(think_ms))
                .run()
                .await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            println!("mean latency: {:?}", report.mean_latency());
            return Ok(());
        }
    };

    let res = client
        .post(format!("{}/{}", base, path))
        .json(&json!({"x": operands.x, "y": operands.y}))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
