use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "perimeter-cli")]
#[command(about = "Management CLI for the security core admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin session token (Bearer).
    #[arg(short, long)]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check system status
    Status,
    /// List security alerts
    Alerts {
        #[arg(long)]
        include_resolved: bool,
    },
    /// Resolve an open alert by id
    Resolve { id: String },
    /// List blocked addresses
    Blocklist,
    /// Remove an address from the blocklist
    Unblock { address: String },
    /// Run an anomaly scan now
    Scan,
    /// Revoke every session of an identity
    Revoke { identity_id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.token))?,
    );

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Alerts { include_resolved } => {
            client
                .get(format!(
                    "{}/admin/alerts?include_resolved={}",
                    cli.url, include_resolved
                ))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Resolve { id } => {
            client
                .post(format!("{}/admin/alerts/{}/resolve", cli.url, id))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Blocklist => {
            client
                .get(format!("{}/admin/blocklist", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Unblock { address } => {
            client
                .delete(format!("{}/admin/blocklist/{}", cli.url, address))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Scan => {
            client
                .post(format!("{}/admin/scan", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Revoke { identity_id } => {
            client
                .delete(format!("{}/admin/identities/{}/sessions", cli.url, identity_id))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    if status == reqwest::StatusCode::NO_CONTENT {
        println!("ok");
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
