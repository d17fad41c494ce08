//! Alchemy provider profile.
//!
//! Keyed endpoints: `https://{network}.g.alchemy.com/v2/{api_key}`.
//! <https://docs.alchemy.com/reference/throughput>

/// URL for the HTTP JSON-RPC endpoint, or `None` if Alchemy does not serve
/// `chain_id`.
pub fn http_url(api_key: &str, chain_id: u64) -> Option<String> {
    let network = chain_id_to_network(chain_id)?;
    Some(format!("https://{network}.g.alchemy.com/v2/{api_key}"))
}

pub fn supports(chain_id: u64) -> bool {
    chain_id_to_network(chain_id).is_some()
}

fn chain_id_to_network(chain_id: u64) -> Option<&'static str> {
    let network = match chain_id {
        1 => "eth-mainnet",
        11155111 => "eth-sepolia",
        137 => "polygon-mainnet",
        80002 => "polygon-amoy",
        42161 => "arb-mainnet",
        421614 => "arb-sepolia",
        10 => "opt-mainnet",
        11155420 => "opt-sepolia",
        8453 => "base-mainnet",
        84532 => "base-sepolia",
        _ => return None,
    };
    Some(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_url_sepolia() {
        assert_eq!(
            http_url("test_key", 11155111).unwrap(),
            "https://eth-sepolia.g.alchemy.com/v2/test_key"
        );
    }

    #[test]
    fn http_url_base_sepolia() {
        let url = http_url("key", 84532).unwrap();
        assert!(url.contains("base-sepolia"));
    }

    #[test]
    fn unknown_chain_has_no_url() {
        assert!(http_url("key", 999_999).is_none());
        assert!(!supports(999_999));
    }
}
