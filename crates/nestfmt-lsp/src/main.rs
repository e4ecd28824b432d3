//! nestfmt LSP - formats documents with nested embedded languages
//!
//! # How this works
//!
//! 1. This binary is started by the editor (e.g., Neovim)
//! 2. Communication happens over stdin/stdout using JSON-RPC
//! 3. The editor keeps us in sync with open documents
//! 4. Format requests are answered with edits for the whole document,
//!    embedded `<script>`, `<style>` and fenced code blocks included
//!
//! # Why we use stderr for logging
//!
//! Since stdin/stdout are used for the LSP protocol, we CANNOT use
//! println!() for debugging. Instead, we use the `tracing` crate
//! which writes to stderr.

mod server;

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug to see debug messages
    // Example: RUST_LOG=nestfmt_analyzer=debug nestfmt-lsp
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr) // IMPORTANT: write to stderr, not stdout
        .init();

    tracing::info!("Starting nestfmt-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(server::NestfmtLanguageServer::new).finish();

    // Runs until the editor disconnects
    Server::new(stdin, stdout, socket).serve(service).await;

    tracing::info!("nestfmt-lsp server stopped");
}
