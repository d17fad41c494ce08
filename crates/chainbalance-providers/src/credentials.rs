//! Credentials for keyed (premium) endpoints.

use serde::{Deserialize, Serialize};

use crate::{alchemy, infura};

pub const ALCHEMY_API_KEY_ENV: &str = "ALCHEMY_API_KEY";
pub const INFURA_PROJECT_ID_ENV: &str = "INFURA_PROJECT_ID";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    #[serde(default)]
    pub alchemy_api_key: Option<String>,
    #[serde(default)]
    pub infura_project_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProviderCredentials {
    /// Read `ALCHEMY_API_KEY` / `INFURA_PROJECT_ID`. Empty values are absent.
    pub fn from_env() -> Self {
        Self {
            alchemy_api_key: non_empty(std::env::var(ALCHEMY_API_KEY_ENV).ok()),
            infura_project_id: non_empty(std::env::var(INFURA_PROJECT_ID_ENV).ok()),
        }
    }

    pub fn with_alchemy(mut self, api_key: impl Into<String>) -> Self {
        self.alchemy_api_key = non_empty(Some(api_key.into()));
        self
    }

    pub fn with_infura(mut self, project_id: impl Into<String>) -> Self {
        self.infura_project_id = non_empty(Some(project_id.into()));
        self
    }

    /// Keyed endpoint for `chain_id`, preferring Alchemy over Infura.
    /// `None` when no credential covers the chain.
    pub fn premium_url(&self, chain_id: u64) -> Option<String> {
        let alchemy = self
            .alchemy_api_key
            .as_deref()
            .and_then(|key| alchemy::http_url(key, chain_id));
        alchemy.or_else(|| {
            self.infura_project_id
                .as_deref()
                .and_then(|id| infura::http_url(id, chain_id))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.alchemy_api_key.is_none() && self.infura_project_id.is_none()
    }
}
