use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};

use mcp_gateway::http::MCP_CONTENT_TYPE;
use mcp_gateway::mcp::protocol::JsonRpcRequest;

#[derive(Parser)]
#[command(name = "mcp-cli")]
#[command(about = "Operator CLI for the MCP gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the liveness endpoint
    Health,
    /// Run the initialize handshake
    Initialize,
    /// List available tools
    Tools,
    /// Call a tool
    Call {
        name: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        arguments: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let request = match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/healthz", cli.url)).send().await?;
            let status = res.status();
            let body = res.text().await?;
            println!("{} {}", status.as_u16(), body);
            if !status.is_success() {
                std::process::exit(1);
            }
            return Ok(());
        }
        Commands::Initialize => JsonRpcRequest::new(
            1,
            "initialize",
            json!({
                "protocolVersion": mcp_gateway::mcp::server::PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": { "name": "mcp-cli", "version": env!("CARGO_PKG_VERSION") },
            }),
        ),
        Commands::Tools => JsonRpcRequest::new(1, "tools/list", Value::Null),
        Commands::Call { name, arguments } => {
            let arguments: Value = serde_json::from_str(&arguments)?;
            JsonRpcRequest::new(1, "tools/call", json!({ "name": name, "arguments": arguments }))
        }
    };

    let res = client
        .post(format!("{}/mcp", cli.url))
        .header(CONTENT_TYPE, HeaderValue::from_static(MCP_CONTENT_TYPE))
        .body(serde_json::to_vec(&request)?)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
