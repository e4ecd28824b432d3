//! Configuration pulled from the editor with `workspace/configuration`.

use async_trait::async_trait;
use lsp_types::ConfigurationItem;
use nestfmt_analyzer::ConfigurationHost;
use serde_json::Value;
use tower_lsp::Client;

pub struct ClientConfiguration {
    client: Client,
    /// Whether the client advertised `workspace.configuration`.
    supported: bool,
}

impl ClientConfiguration {
    pub fn new(client: Client, supported: bool) -> Self {
        Self { client, supported }
    }
}

#[async_trait]
impl ConfigurationHost for ClientConfiguration {
    async fn configuration(&self, section: &str) -> Option<Value> {
        if !self.supported {
            return None;
        }

        let item = ConfigurationItem {
            scope_uri: None,
            section: Some(section.to_string()),
        };
        match self.client.configuration(vec![item]).await {
            Ok(values) => values.into_iter().next(),
            Err(e) => {
                tracing::warn!("Configuration request for {} failed: {}", section, e);
                None
            }
        }
    }
}
