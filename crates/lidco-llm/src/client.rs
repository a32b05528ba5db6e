//! Provider-agnostic model client interface
//!
//! Every provider family implements [`ModelClient`]. The router picks a
//! client for each candidate by model-id prefix through [`ClientSet`].

use crate::completion::{ModelRequest, ModelResponse};
use crate::error::Result;
use std::sync::Arc;

/// One provider family able to answer a [`ModelRequest`]
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &str;

    /// Execute one request. Errors must be classified so that
    /// [`crate::Error::is_transient`] is meaningful.
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse>;

    /// Execute one request, passing text fragments to `on_delta` as they
    /// arrive. The returned response still carries the full text.
    ///
    /// Clients that cannot stream report the whole reply as one fragment.
    async fn call_stream(
        &self,
        request: ModelRequest,
        on_delta: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ModelResponse> {
        let response = self.call(request).await?;
        if let Some(text) = response.content.as_deref().filter(|t| !t.is_empty()) {
            on_delta(text);
        }
        Ok(response)
    }
}

/// Receiver for streamed response text
pub type DeltaSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Clients keyed by model-id prefix.
///
/// `"ollama/"` matches `"ollama/llama3"`; the empty prefix matches everything
/// and acts as the catch-all. The longest matching prefix wins.
#[derive(Clone, Default)]
pub struct ClientSet {
    entries: Vec<(String, Arc<dyn ModelClient>)>,
}

impl ClientSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client for a prefix, replacing any previous one
    pub fn insert(&mut self, prefix: impl Into<String>, client: Arc<dyn ModelClient>) {
        let prefix = prefix.into();
        self.entries.retain(|(p, _)| *p != prefix);
        self.entries.push((prefix, client));
        self.entries
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    /// Builder form of [`ClientSet::insert`]
    #[must_use]
    pub fn with(mut self, prefix: impl Into<String>, client: Arc<dyn ModelClient>) -> Self {
        self.insert(prefix, client);
        self
    }

    /// Find the client for `model` and the model id with the prefix stripped
    #[must_use]
    pub fn select<'a>(&self, model: &'a str) -> Option<(Arc<dyn ModelClient>, &'a str)> {
        self.entries.iter().find_map(|(prefix, client)| {
            model
                .strip_prefix(prefix.as_str())
                .map(|stripped| (Arc::clone(client), stripped))
        })
    }

    /// Registered prefixes, longest first
    #[must_use]
    pub fn prefixes(&self) -> Vec<&str> {
        self.entries.iter().map(|(p, _)| p.as_str()).collect()
    }

    /// Whether no client is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for ClientSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(p, c)| (p, c.name())))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MockModelClient;

    #[test]
    fn test_longest_prefix_wins() {
        let set = ClientSet::new()
            .with("", Arc::new(MockModelClient::named("default")))
            .with("ollama/", Arc::new(MockModelClient::named("ollama")));

        let (client, model) = set.select("ollama/llama3").unwrap();
        assert_eq!(client.name(), "ollama");
        assert_eq!(model, "llama3");

        let (client, model) = set.select("gpt-4o-mini").unwrap();
        assert_eq!(client.name(), "default");
        assert_eq!(model, "gpt-4o-mini");
    }

    #[test]
    fn test_no_match_without_catch_all() {
        let set = ClientSet::new().with("openai/", Arc::new(MockModelClient::named("openai")));
        assert!(set.select("claude-3").is_none());
    }

    #[test]
    fn test_insert_replaces_prefix() {
        let mut set = ClientSet::new();
        set.insert("x/", Arc::new(MockModelClient::named("first")));
        set.insert("x/", Arc::new(MockModelClient::named("second")));
        assert_eq!(set.prefixes(), vec!["x/"]);
        assert_eq!(set.select("x/m").unwrap().0.name(), "second");
    }
}
