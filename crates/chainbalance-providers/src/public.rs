//! Public / community RPC endpoints.
//!
//! These are free, no-API-key endpoints used when no keyed endpoint is
//! configured or the premium budget is spent. Rate limits are lower and
//! reliability may vary.

/// Public fallback endpoint for `chain_id`.
pub fn fallback_url(chain_id: u64) -> Option<&'static str> {
    let url = match chain_id {
        1 => "https://ethereum-rpc.publicnode.com",
        11155111 => "https://ethereum-sepolia-rpc.publicnode.com",
        137 => "https://polygon-rpc.com",
        80002 => "https://rpc-amoy.polygon.technology",
        42161 => "https://arb1.arbitrum.io/rpc",
        421614 => "https://sepolia-rollup.arbitrum.io/rpc",
        10 => "https://mainnet.optimism.io",
        11155420 => "https://sepolia.optimism.io",
        8453 => "https://mainnet.base.org",
        84532 => "https://sepolia.base.org",
        _ => return None,
    };
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_sepolia() {
        assert_eq!(
            fallback_url(11155111),
            Some("https://ethereum-sepolia-rpc.publicnode.com")
        );
    }

    #[test]
    fn fallback_base_sepolia() {
        assert_eq!(fallback_url(84532), Some("https://sepolia.base.org"));
        assert!(fallback_url(424242).is_none());
    }
}
