use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gate-cli")]
#[command(about = "Operator CLI for the covert admin gate", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    url: String,

    #[arg(short, long, default_value = "/hidden")]
    namespace: String,

    /// Secret path segment printed by the gate at startup or rotation
    #[arg(short, long, env = "GATE_SECRET_PATH")]
    secret_path: String,

    /// Access token printed alongside the secret path
    #[arg(short, long, env = "GATE_TOKEN")]
    token: String,

    #[arg(long, default_value = "X-Admin-Token")]
    token_header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the operator payload
    Access,
    /// Replace the credential; the new pair appears on the gate's console
    Rotate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_bytes(cli.token_header.as_bytes())?,
        HeaderValue::from_str(&cli.token)?,
    );

    let base = format!(
        "{}{}/{}",
        cli.url.trim_end_matches('/'),
        cli.namespace,
        cli.secret_path
    );

    let res = match cli.command {
        Commands::Access => client.get(format!("{base}/access")).headers(headers).send().await?,
        Commands::Rotate => client.post(format!("{base}/rotate")).headers(headers).send().await?,
    };
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        // The gate never says why.
        eprintln!("Error: gate returned status {}", status);
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
