//! Provider credential resolution

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Resolves the decrypted API key a tenant has configured for a provider
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// `Ok(None)` when the tenant has no key for this provider
    async fn resolve(&self, tenant_id: &str, provider: &str) -> Result<Option<String>>;
}

/// Resolve a key or fail with a configuration error
pub async fn require_credential(
    resolver: &dyn CredentialResolver,
    tenant_id: &str,
    provider: &str,
) -> Result<String> {
    resolver.resolve(tenant_id, provider).await?.ok_or_else(|| {
        Error::config(format!(
            "No API key configured for provider '{}' (tenant '{}')",
            provider, tenant_id
        ))
    })
}

/// Reads keys from `DILIGENCE_<PROVIDER>_API_KEY`, then `<PROVIDER>_API_KEY`.
/// The same key serves every tenant.
#[derive(Debug, Default, Clone)]
pub struct EnvCredentialResolver;

impl EnvCredentialResolver {
    pub fn new() -> Self {
        Self
    }

    fn env_names(provider: &str) -> [String; 2] {
        let upper: String = provider
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        [format!("DILIGENCE_{}_API_KEY", upper), format!("{}_API_KEY", upper)]
    }
}

#[async_trait]
impl CredentialResolver for EnvCredentialResolver {
    async fn resolve(&self, _tenant_id: &str, provider: &str) -> Result<Option<String>> {
        Ok(Self::env_names(provider)
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty()))
    }
}

/// Fixed in-memory keys, per tenant or shared across tenants
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    per_tenant: HashMap<(String, String), String>,
    shared: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key used by every tenant for this provider
    pub fn with_shared(mut self, provider: impl Into<String>, key: impl Into<String>) -> Self {
        self.shared.insert(provider.into(), key.into());
        self
    }

    pub fn with_tenant(
        mut self,
        tenant_id: impl Into<String>,
        provider: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        self.per_tenant
            .insert((tenant_id.into(), provider.into()), key.into());
        self
    }
}

#[async_trait]
impl CredentialResolver for StaticCredentials {
    async fn resolve(&self, tenant_id: &str, provider: &str) -> Result<Option<String>> {
        let key = self
            .per_tenant
            .get(&(tenant_id.to_string(), provider.to_string()))
            .or_else(|| self.shared.get(provider))
            .cloned();
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tenant_key_overrides_shared() {
        let creds = StaticCredentials::new()
            .with_shared("openai", "shared-key")
            .with_tenant("acme", "openai", "acme-key");

        assert_eq!(creds.resolve("acme", "openai").await.unwrap().as_deref(), Some("acme-key"));
        assert_eq!(creds.resolve("other", "openai").await.unwrap().as_deref(), Some("shared-key"));
        assert_eq!(creds.resolve("acme", "cohere").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let err = require_credential(&StaticCredentials::new(), "acme", "openai")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("openai"));
    }

    #[tokio::test]
    async fn test_env_resolver_prefers_prefixed_name() {
        std::env::set_var("DILIGENCE_TEST_PROVIDER_X_API_KEY", "prefixed");
        std::env::set_var("TEST_PROVIDER_X_API_KEY", "plain");
        std::env::set_var("TEST_PROVIDER_Y_API_KEY", "plain-y");

        let resolver = EnvCredentialResolver::new();
        assert_eq!(
            resolver.resolve("t", "test-provider-x").await.unwrap().as_deref(),
            Some("prefixed")
        );
        assert_eq!(
            resolver.resolve("t", "test_provider_y").await.unwrap().as_deref(),
            Some("plain-y")
        );
        assert_eq!(resolver.resolve("t", "test-provider-z").await.unwrap(), None);
    }
}
