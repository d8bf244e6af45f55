//! Shared dependencies handed to every job

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::ingestion::Chunker;
use crate::providers::{
    require_credential, CredentialResolver, Embedder, LlmProvider, ProviderFactory, VectorIndex,
};
use crate::storage::RecordStore;

/// Process-scoped pipeline resources, built once and cloned into jobs
#[derive(Clone)]
pub struct Pipeline {
    pub config: Arc<RagConfig>,
    pub store: Arc<dyn RecordStore>,
    pub index: Arc<dyn VectorIndex>,
    pub credentials: Arc<dyn CredentialResolver>,
    pub providers: Arc<dyn ProviderFactory>,
    pub chunker: Chunker,
}

impl Pipeline {
    pub fn new(
        config: RagConfig,
        store: Arc<dyn RecordStore>,
        index: Arc<dyn VectorIndex>,
        credentials: Arc<dyn CredentialResolver>,
        providers: Arc<dyn ProviderFactory>,
    ) -> Self {
        let chunker = Chunker::new(&config.chunking);
        Self {
            config: Arc::new(config),
            store,
            index,
            credentials,
            providers,
            chunker,
        }
    }

    /// Replace the chunker, e.g. to attach a page recognizer
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    fn provider_name(&self) -> &str {
        &self.config.llm.credential_provider
    }

    /// Resolve the tenant's key, failing with a configuration error if absent
    pub async fn credential(&self, tenant_id: &str) -> Result<String> {
        require_credential(self.credentials.as_ref(), tenant_id, self.provider_name()).await
    }

    /// Embedder for a tenant; only resolves a credential if the backend needs one
    pub async fn embedder(&self, tenant_id: &str) -> Result<Embedder> {
        let credential = if self.providers.embedder_needs_credential() {
            Some(self.credential(tenant_id).await?)
        } else {
            None
        };
        self.embedder_with(credential.as_deref())
    }

    pub fn embedder_with(&self, credential: Option<&str>) -> Result<Embedder> {
        let credential = credential.filter(|_| self.providers.embedder_needs_credential());
        let provider = self.providers.embedder(credential)?;
        Ok(Embedder::new(provider, self.config.embeddings.batch_size))
    }

    pub fn llm(&self, credential: &str) -> Result<Arc<dyn LlmProvider>> {
        self.providers.llm(credential)
    }
}
