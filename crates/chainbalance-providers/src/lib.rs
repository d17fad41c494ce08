//! chainbalance-providers: endpoint profiles and the built-in network catalog.
//!
//! Each provider module knows the URL template and supported chain IDs for a
//! specific RPC service. [`ProviderCredentials`] picks the keyed (premium)
//! endpoint for a chain; [`public`] supplies the credential-free fallback.
//!
//! # Quick start
//! ```rust,no_run
//! use chainbalance_providers::{catalog, ProviderCredentials};
//!
//! let networks = catalog::testnets();
//! let creds = ProviderCredentials::from_env();
//! let premium = creds.premium_url(networks.get("sepolia").unwrap().chain_id);
//! ```

pub mod alchemy;
pub mod catalog;
pub mod credentials;
pub mod infura;
pub mod public;

pub use credentials::ProviderCredentials;
