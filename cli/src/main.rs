//! chainbalance CLI: query native and USDC balances across EVM testnets.
//!
//! Usage:
//! ```bash
//! # Balances on every built-in network
//! chainbalance balance --address 0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238
//!
//! # Selected networks, machine-readable
//! chainbalance balance --address 0x... --networks sepolia,base-sepolia --json
//!
//! # Built-in networks and per-network health after one query
//! chainbalance networks
//! chainbalance health --address 0x...
//! ```
//!
//! `ALCHEMY_API_KEY` / `INFURA_PROJECT_ID` enable keyed endpoints; logs are
//! filtered by `RUST_LOG` (default `info`) and written to stderr.

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chainbalance_core::types::AggregatedBalance;
use chainbalance_providers::{catalog, ProviderCredentials};
use chainbalance_service::{BalanceService, ServiceConfig};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    init_tracing(has_flag(&args, "--log-json"));

    let result = match args[1].as_str() {
        "balance" => cmd_balance(&args[2..]).await,
        "health" => cmd_health(&args[2..]).await,
        "networks" => {
            cmd_networks();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("chainbalance {}", env!("CARGO_PKG_VERSION"));
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

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

fn print_usage() {
    println!("chainbalance {}", env!("CARGO_PKG_VERSION"));
    println!("Query native and USDC balances across EVM networks\n");
    println!("USAGE:");
    println!("    chainbalance <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    balance    Fetch balances for an address");
    println!("    health     Query once, then print per-network health");
    println!("    networks   List built-in networks");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("BALANCE / HEALTH FLAGS:");
    println!("    --address <ADDR>      Account address (0x + 40 hex)  [required]");
    println!("    --networks <A,B,..>   Comma-separated network names  [default: all]");
    println!("    --config <FILE>       JSON service configuration");
    println!("    --no-cache            Bypass the balance cache");
    println!("    --json                Print results as JSON");
    println!("    --log-json            Emit logs as JSON");
}

fn build_service(args: &[String]) -> Result<Arc<BalanceService>> {
    let config = match parse_flag(args, "--config") {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            ServiceConfig::from_json(&raw)?
        }
        None => ServiceConfig::default(),
    };
    let service = BalanceService::builder()
        .config(config)
        .credentials(ProviderCredentials::from_env())
        .build()?;
    Ok(Arc::new(service))
}

fn selected_networks(args: &[String], service: &BalanceService) -> Vec<String> {
    match parse_flag(args, "--networks") {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect(),
        None => service.networks().names(),
    }
}

async fn query(args: &[String]) -> Result<(Arc<BalanceService>, AggregatedBalance)> {
    let address = parse_flag(args, "--address").context("--address is required")?;
    if !chainbalance_core::is_valid_address(&address) {
        bail!("invalid address: {address}");
    }
    let service = build_service(args)?;
    let networks = selected_networks(args, &service);
    let use_cache = !has_flag(args, "--no-cache");
    tracing::debug!(?networks, use_cache, "querying balances");
    let balances = service
        .get_all_network_balances(&address, &networks, use_cache)
        .await;
    Ok((service, balances))
}

async fn cmd_balance(args: &[String]) -> Result<()> {
    let (_, balances) = query(args).await?;

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&balances)?);
        return Ok(());
    }

    for entry in balances.networks() {
        match &entry.error {
            None => {
                let usdc = entry
                    .usdc
                    .as_ref()
                    .map(|t| t.balance.as_str())
                    .unwrap_or("-");
                println!(
                    "  {:<18} native {:<24} USDC {}",
                    entry.network, entry.native_balance, usdc
                );
            }
            Some(err) => println!("  {:<18} error: {err}", entry.network),
        }
    }
    println!("\n  Total USDC: {}", balances.total_usdc());
    Ok(())
}

async fn cmd_health(args: &[String]) -> Result<()> {
    let (service, _) = query(args).await?;
    let health = service.network_health();

    if has_flag(args, "--json") {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    for (network, h) in &health {
        let status = if h.is_healthy { "healthy" } else { "degraded" };
        println!(
            "  {:<18} {:<9} circuit={:?} success={:.0}% requests={} failed={}",
            network,
            status,
            h.circuit_state,
            h.success_rate * 100.0,
            h.total_requests,
            h.failed_requests
        );
        if let Some(err) = &h.last_error {
            println!("  {:<18} last error: {err}", "");
        }
    }
    Ok(())
}

fn cmd_networks() {
    let tokens = catalog::usdc_deployments();
    println!("Built-in networks:\n");
    for net in catalog::testnets().iter() {
        println!("  {:<18} chain {:<10} {}", net.name, net.chain_id, net.native_symbol);
        println!("  {:<18} rpc      {}", "", net.rpc_url);
        if let Some(usdc) = tokens.get(&net.name, catalog::USDC) {
            println!("  {:<18} USDC     {}", "", usdc.address);
        }
        println!();
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
