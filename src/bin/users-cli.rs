use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "users-cli")]
#[command(about = "Command line client for the user service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a user
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        age: i32,
    },
    /// Fetch a user by ID
    Get { id: u64 },
    /// Replace a user's name and age
    Update {
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        age: i32,
    },
    /// Delete a user by ID
    Delete { id: u64 },
    /// Dump the Prometheus metrics text
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let users = format!("{}/api/v1/users", cli.url);

    match cli.command {
        Commands::Create { name, age } => {
            let res = client
                .post(&users)
                .json(&json!({ "name": name, "age": age }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Get { id } => {
            let res = client.get(format!("{}/{}", users, id)).send().await?;
            print_response(res).await?;
        }
        Commands::Update { id, name, age } => {
            let res = client
                .put(&users)
                .json(&json!({ "id": id, "name": name, "age": age }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Delete { id } => {
            let res = client.delete(format!("{}/{}", users, id)).send().await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client.get(format!("{}/metrics", cli.url)).send().await?;
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status == reqwest::StatusCode::NO_CONTENT {
        println!("{}", status);
        return Ok(());
    }
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
