use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "ledger-cli")]
#[command(about = "CLI client for the ledger node control plane")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:6973)
    #[arg(long, global = true, default_value = "http://127.0.0.1:6973")]
    node: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block carrying the given payload
    Mine {
        #[arg(long)]
        data: String,
    },
    /// List the node's chain
    Blocks,
    /// List connected peers
    Peers,
    /// Connect the node to another peer
    AddPeer {
        /// Peer address, e.g. ws://127.0.0.1:6974
        #[arg(long)]
        peer: String,
    },
}

#[derive(Serialize)]
struct MineBody {
    data: String,
}

#[derive(Serialize)]
struct AddPeerBody {
    peer: String,
}

async fn print_response(res: reqwest::Response) -> Result<()> {
    let status = res.status();
    let body = res.text().await?;
    println!("status: {}", status);
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/');
    let client = reqwest::Client::new();
    debug!(%node, cmd = ?cli.cmd, "sending request");

    let res = match cli.cmd {
        Command::Mine { data } => {
            client
                .post(format!("{node}/mineBlock"))
                .json(&MineBody { data })
                .send()
                .await?
        }
        Command::Blocks => client.get(format!("{node}/blocks")).send().await?,
        Command::Peers => client.get(format!("{node}/peers")).send().await?,
        Command::AddPeer { peer } => {
            client
                .post(format!("{node}/addPeer"))
                .json(&AddPeerBody { peer })
                .send()
                .await?
        }
    };
    print_response(res).await
}
