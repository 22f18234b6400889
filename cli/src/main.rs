//! covrpc CLI — inspect and test gateway endpoints from the terminal.
//!
//! Usage:
//! ```bash
//! # Show the endpoint the Covalent profile resolves for a network
//! covrpc endpoint --network sepolia
//!
//! # List the networks the gateway serves
//! covrpc networks
//!
//! # Probe an endpoint (latency, block number)
//! covrpc test --network mainnet
//!
//! # Send a raw JSON-RPC call
//! covrpc call --network mainnet --method eth_blockNumber
//! ```

use std::env;
use std::process;

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use covrpc_core::network::{Network, Networkish};
use covrpc_core::transport::RpcTransport;
use covrpc_http::JsonRpcClient;
use covrpc_providers::covalent::{self, CovalentProvider};
use covrpc_providers::CommunityResourcable;

#[tokio::main]
async fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "endpoint" => cmd_endpoint(&args[2..]),
        "networks" => {
            cmd_networks();
            Ok(())
        }
        "test" => cmd_test(&args[2..]).await,
        "call" => cmd_call(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("covrpc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_usage() {
    println!("covrpc {}", env!("CARGO_PKG_VERSION"));
    println!("Inspect and test Covalent gateway endpoints\n");
    println!("USAGE:");
    println!("    covrpc <COMMAND>\n");
    println!("COMMANDS:");
    println!("    endpoint   Show the endpoint descriptor for a network");
    println!("    networks   List networks the gateway serves");
    println!("    test       Probe an endpoint (latency, block number)");
    println!("    call       Send a raw JSON-RPC call");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --network <NAME>   Logical network name  [default: mainnet]");
    println!("    --chain <ID>       Chain id instead of a name");
    println!("    --key <TOKEN>      Dedicated API token (default: shared community token)");
    println!("    --url <URL>        Raw JSON-RPC endpoint (bypasses the gateway profile)");
    println!("    --method <NAME>    JSON-RPC method  [call]");
    println!("    --params <JSON>    JSON array of positional params  [call]");
}

/// What a command talks to: a gateway profile, or a raw endpoint URL.
enum Target {
    Covalent(CovalentProvider),
    Raw(JsonRpcClient),
}

impl Target {
    fn from_flags(args: &[String]) -> Result<Self> {
        if let Some(url) = parse_flag(args, "--url") {
            return Ok(Self::Raw(JsonRpcClient::connect(url)));
        }
        let network = target_network(args)?;
        let provider = match parse_flag(args, "--key") {
            Some(key) => CovalentProvider::with_token(network, key),
            None => CovalentProvider::new(network),
        }
        .context("building Covalent provider")?;
        Ok(Self::Covalent(provider))
    }

    fn transport(&self) -> &dyn RpcTransport {
        match self {
            Self::Covalent(provider) => provider,
            Self::Raw(client) => client,
        }
    }
}

fn target_network(args: &[String]) -> Result<Networkish> {
    if let Some(name) = parse_flag(args, "--network") {
        return Ok(Networkish::from(name));
    }
    if let Some(chain) = parse_flag(args, "--chain") {
        let chain_id: u64 = chain
            .parse()
            .with_context(|| format!("invalid chain id: {chain}"))?;
        return Ok(Networkish::from(chain_id));
    }
    Ok(Networkish::from("mainnet"))
}

fn cmd_endpoint(args: &[String]) -> Result<()> {
    let network = Network::resolve(target_network(args)?).context("resolving network")?;
    let key = parse_flag(args, "--key");
    let request = covalent::fetch_request(&network, key.as_deref())
        .with_context(|| format!("no Covalent endpoint for {network}"))?;

    println!("Network:       {network}");
    println!("Endpoint:      {}", request.url());
    println!("Gzip:          {}", request.allow_gzip());
    println!(
        "Throttle hook: {}",
        if request.has_retry_hook() {
            "attached (shared token)"
        } else {
            "none (dedicated token)"
        }
    );
    Ok(())
}

fn cmd_networks() {
    println!("Networks served by the Covalent gateway:\n");
    println!("  {:<18} {:<22} CHAIN ID", "NAME", "SEGMENT");
    for (name, segment) in covalent::supported_networks() {
        match Network::from_name(name) {
            Ok(network) => println!("  {:<18} {:<22} {}", name, segment, network.chain_id()),
            Err(_) => println!("  {:<18} {:<22} -", name, segment),
        }
    }
    println!("\nConstruction by chain id works for every name the registry also knows.");
}

async fn cmd_test(args: &[String]) -> Result<()> {
    let target = Target::from_flags(args)?;
    let transport = target.transport();

    println!("Probing {}...", transport.url());
    tracing::debug!(url = %transport.url(), "sending eth_blockNumber");

    let start = std::time::Instant::now();
    let block = transport
        .call("eth_blockNumber", vec![])
        .await
        .context("probe failed")?;
    let latency = start.elapsed();

    let hex = block.as_str().unwrap_or("0x0");
    let block_num = u64::from_str_radix(hex.trim_start_matches("0x"), 16).unwrap_or(0);

    println!("  Status:       OK");
    println!("  Block number: {block_num} ({hex})");
    println!("  Latency:      {}ms", latency.as_millis());
    if let Target::Covalent(provider) = &target {
        println!("  Network:      {}", provider.network());
        if provider.is_community_resource() {
            println!("  Note:         using the shared community token (heavily throttled)");
        }
    }

    Ok(())
}

async fn cmd_call(args: &[String]) -> Result<()> {
    let method = parse_flag(args, "--method").ok_or_else(|| anyhow!("--method is required"))?;
    let params = match parse_flag(args, "--params") {
        Some(raw) => serde_json::from_str::<Vec<Value>>(&raw)
            .with_context(|| format!("--params must be a JSON array, got: {raw}"))?,
        None => vec![],
    };

    let target = Target::from_flags(args)?;
    let result = target
        .transport()
        .call(&method, params)
        .await
        .with_context(|| format!("{method} failed"))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).unwrap_or_default()
    );
    Ok(())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}
