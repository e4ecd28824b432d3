//! The main Language Server implementation.
//!
//! # LSP Lifecycle
//!
//! 1. Editor starts our binary and sends `initialize` request
//! 2. We read our settings and respond with our capabilities
//! 3. Editor sends `initialized` notification (handshake complete)
//! 4. Normal operation: documents are opened, edited and formatted
//! 5. Editor sends `shutdown` request, we respond, then `exit` notification

mod configuration;
mod settings;

pub use settings::ServerSettings;

use std::sync::Arc;

use lsp_types::*;
use nestfmt_analyzer::{
    DocumentStore, FormatProviderRegistry, FormatRequest, FormatService, HtmlEmbedding,
    MarkdownEmbedding, TextDocument,
};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::{Client, LanguageServer};

use configuration::ClientConfiguration;

/// The nestfmt Language Server.
///
/// - `client`: Used to send messages TO the editor and to pull configuration
/// - `documents`: Open files and their embedding trees
/// - `service`: The format service, built once `initialize` has been seen
pub struct NestfmtLanguageServer {
    client: Client,
    documents: Arc<DocumentStore>,
    service: RwLock<Option<FormatService>>,
}

impl NestfmtLanguageServer {
    pub fn new(client: Client) -> Self {
        let documents = DocumentStore::new()
            .with_language(Arc::new(HtmlEmbedding))
            .with_language(Arc::new(MarkdownEmbedding));

        Self {
            client,
            documents: Arc::new(documents),
            service: RwLock::new(None),
        }
    }

    fn build_service(&self, providers: FormatProviderRegistry, configuration_supported: bool) -> FormatService {
        FormatService::new(
            self.documents.clone(),
            Arc::new(providers),
            Arc::new(ClientConfiguration::new(
                self.client.clone(),
                configuration_supported,
            )),
        )
    }

    async fn format(&self, request: FormatRequest) -> Result<Option<Vec<TextEdit>>> {
        let Some(service) = self.service.read().await.clone() else {
            tracing::warn!("Format request before initialize: {}", request.uri);
            return Ok(None);
        };
        Ok(service.format(request).await)
    }
}

impl LanguageServer for NestfmtLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Received initialize request");

        let settings = ServerSettings::from_initialization_options(params.initialization_options);
        let configuration_supported = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|workspace| workspace.configuration)
            .unwrap_or(false);
        if !configuration_supported {
            tracing::info!("Client has no workspace/configuration - using default settings");
        }

        let service = self.build_service(settings.providers(), configuration_supported);
        *self.service.write().await = Some(service);

        let on_type = settings
            .trigger_characters()
            .map(|(first, more)| DocumentOnTypeFormattingOptions {
                first_trigger_character: first,
                more_trigger_character: (!more.is_empty()).then_some(more),
            });

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                document_formatting_provider: Some(OneOf::Left(true)),
                document_range_formatting_provider: Some(OneOf::Left(true)),
                document_on_type_formatting_provider: on_type,
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "nestfmt-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("Server initialized - handshake complete");
        self.client
            .log_message(MessageType::INFO, "nestfmt LSP server ready")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutdown requested");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        self.documents.open(TextDocument::new(
            document.uri.as_str(),
            document.language_id,
            document.version,
            &document.text,
        ));
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        self.documents.change(
            params.text_document.uri.as_str(),
            params.text_document.version,
            params.content_changes,
        );
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        tracing::debug!("Document closed: {}", params.text_document.uri.as_str());
        self.documents.close(params.text_document.uri.as_str());
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        self.format(FormatRequest::document(
            params.text_document.uri.as_str(),
            params.options,
        ))
        .await
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        self.format(FormatRequest::range(
            params.text_document.uri.as_str(),
            params.options,
            params.range,
        ))
        .await
    }

    async fn on_type_formatting(
        &self,
        params: DocumentOnTypeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let position = params.text_document_position;
        self.format(FormatRequest::on_type(
            position.text_document.uri.as_str(),
            params.options,
            position.position,
            params.ch,
        ))
        .await
    }
}
