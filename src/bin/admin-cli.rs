use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "admin-cli")]
#[command(about = "Management CLI for the MySQL admin API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    url: String,

    #[arg(short, long, env = "ADMIN_SECRET_KEY", default_value = "admin123")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API and database health
    Health,
    /// List databases
    Databases,
    /// List tables in a database
    Tables { db: String },
    /// Show the columns of a table
    Structure { db: String, table: String },
    /// Run an SQL statement
    Query { sql: String },
    /// Verify the admin key against the login endpoint
    Login,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert("X-Admin-Key", HeaderValue::from_str(&cli.key)?);

    let request = match &cli.command {
        Commands::Health => client.get(format!("{base}/api/health")),
        Commands::Databases => client.get(format!("{base}/api/databases")),
        Commands::Tables { db } => client.get(format!("{base}/api/databases/{db}/tables")),
        Commands::Structure { db, table } => {
            client.get(format!("{base}/api/databases/{db}/tables/{table}/structure"))
        }
        Commands::Query { sql } => client
            .post(format!("{base}/api/query"))
            .json(&json!({ "sql": sql })),
        Commands::Login => client
            .post(format!("{base}/api/auth/verify"))
            .json(&json!({ "secret_key": cli.key })),
    };

    let res = request.headers(headers).send().await?;
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

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
