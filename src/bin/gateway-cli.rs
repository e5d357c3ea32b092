use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the Script Gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8000")]
    url: String,

    #[arg(short, long, env = "GATEWAY_API_KEY")]
    key: String,

    /// Header carrying the API key.
    #[arg(long, default_value = "X-API-Key")]
    header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway liveness
    Health,
    /// List available scripts with their help text
    List,
    /// Show metadata for one script
    Info { name: String },
    /// Run a script
    Run {
        name: String,
        /// Parameter as key=value; repeat for more
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::HeaderName::from_bytes(cli.header.as_bytes())?,
        HeaderValue::from_str(&cli.key)?,
    );

    let res = match cli.command {
        Commands::Health => {
            client.get(format!("{}/health", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::List => {
            client.get(format!("{}/list-scripts", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Info { name } => {
            client.get(format!("{}/script-info/{}", base, name))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Run { name, params } => {
            let parameters: Map<String, Value> = params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            client.post(format!("{}/run-script", base))
                .headers(headers)
                .json(&serde_json::json!({
                    "script_name": name,
                    "parameters": parameters,
                }))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Some(retry) = res.headers().get(reqwest::header::RETRY_AFTER) {
            eprintln!("Retry-After: {}", retry.to_str().unwrap_or("?"));
        }
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
