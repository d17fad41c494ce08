//! Infura provider profile.

/// URL for the HTTP JSON-RPC endpoint, or `None` if Infura does not serve
/// `chain_id`.
pub fn http_url(project_id: &str, chain_id: u64) -> Option<String> {
    let network = chain_id_to_network(chain_id)?;
    Some(format!("https://{network}.infura.io/v3/{project_id}"))
}

fn chain_id_to_network(chain_id: u64) -> Option<&'static str> {
    let network = match chain_id {
        1 => "mainnet",
        11155111 => "sepolia",
        137 => "polygon-mainnet",
        80002 => "polygon-amoy",
        42161 => "arbitrum-mainnet",
        421614 => "arbitrum-sepolia",
        10 => "optimism-mainnet",
        11155420 => "optimism-sepolia",
        8453 => "base-mainnet",
        84532 => "base-sepolia",
        _ => return None,
    };
    Some(network)
}
