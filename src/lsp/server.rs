//! Main Language Server Protocol server implementation for mesonfmt
//!
//! The server keeps open documents in memory and answers
//! `textDocument/formatting` through the [`FormattingCoordinator`]. When the
//! client supports dynamic registration, the formatter is registered and
//! unregistered to mirror the coordinator's state; otherwise formatting is
//! advertised statically and requests get no edits while no tool is
//! registered.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tower_lsp::jsonrpc::Result as JsonRpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::FormattingConfig;
use crate::coordinator::{FormattingCoordinator, ReloadOutcome};
use crate::lsp::types::{
    ClientSink, FORMATTING_METHOD, FORMATTING_REGISTRATION_ID, MESON_LANGUAGE_ID, to_lsp_text_edit,
};

pub struct MesonFormatLanguageServer {
    client: Client,
    coordinator: Arc<FormattingCoordinator>,
    /// Current formatting configuration
    config: Arc<RwLock<FormattingConfig>>,
    /// Config file given on the command line, used when the client sends no settings
    config_path: Option<PathBuf>,
    /// Document store for open files
    documents: Arc<RwLock<HashMap<Url, String>>>,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    dynamic_registration: AtomicBool,
    /// Whether the client currently holds our formatter registration
    registered_with_client: AtomicBool,
    /// Held from applying settings until the client registration is synced
    reconfigure_lock: Mutex<()>,
}

impl MesonFormatLanguageServer {
    pub fn new(client: Client, config_path: Option<String>) -> Self {
        let sink = Arc::new(ClientSink::new(client.clone()));
        Self::with_coordinator(client, config_path, Arc::new(FormattingCoordinator::new(sink)))
    }

    pub fn with_coordinator(
        client: Client,
        config_path: Option<String>,
        coordinator: Arc<FormattingCoordinator>,
    ) -> Self {
        Self {
            client,
            coordinator,
            config: Arc::new(RwLock::new(FormattingConfig::default())),
            config_path: config_path.map(PathBuf::from),
            documents: Arc::new(RwLock::new(HashMap::new())),
            workspace_root: Arc::new(RwLock::new(None)),
            dynamic_registration: AtomicBool::new(false),
            registered_with_client: AtomicBool::new(false),
            reconfigure_lock: Mutex::new(()),
        }
    }

    pub fn coordinator(&self) -> &Arc<FormattingCoordinator> {
        &self.coordinator
    }

    /// Current formatting configuration.
    pub async fn config(&self) -> FormattingConfig {
        self.config.read().await.clone()
    }

    /// Apply `settings`, if any, then reload the formatter. Returns `None`
    /// when the settings were rejected and nothing changed.
    ///
    /// Overlapping calls are serialized; the client registration changes
    /// together with the coordinator.
    async fn reconfigure(&self, settings: Option<&serde_json::Value>) -> Option<ReloadOutcome> {
        let _reconfiguring = self.reconfigure_lock.lock().await;
        if let Some(settings) = settings
            && !self.apply_settings(settings).await
        {
            return None;
        }
        Some(self.reload_formatter().await)
    }

    /// Re-check the tool under the current configuration and sync the
    /// client-side registration. Callers hold `reconfigure_lock`.
    async fn reload_formatter(&self) -> ReloadOutcome {
        let dynamic = self.dynamic_registration.load(Ordering::SeqCst);

        if dynamic && self.registered_with_client.swap(false, Ordering::SeqCst) {
            let unregistration = Unregistration {
                id: FORMATTING_REGISTRATION_ID.to_string(),
                method: FORMATTING_METHOD.to_string(),
            };
            if let Err(e) = self.client.unregister_capability(vec![unregistration]).await {
                log::warn!("Failed to unregister formatter: {e}");
            }
        }

        let config = self.config.read().await.clone();
        let outcome = self.coordinator.reload(&config).await;

        match &outcome {
            ReloadOutcome::Registered(tool) => {
                log::info!("Formatting with {} {}", tool.path.display(), tool.version);
                if dynamic {
                    let registration = Registration {
                        id: FORMATTING_REGISTRATION_ID.to_string(),
                        method: FORMATTING_METHOD.to_string(),
                        register_options: Some(json!({
                            "documentSelector": [{ "language": MESON_LANGUAGE_ID }]
                        })),
                    };
                    match self.client.register_capability(vec![registration]).await {
                        Ok(()) => self.registered_with_client.store(true, Ordering::SeqCst),
                        Err(e) => log::warn!("Failed to register formatter: {e}"),
                    }
                }
            }
            ReloadOutcome::Unavailable(e) => log::info!("Formatting unavailable: {e}"),
            ReloadOutcome::Disabled => log::info!("Formatting disabled"),
        }

        outcome
    }

    /// Apply settings sent by the client; returns false if they were rejected.
    async fn apply_settings(&self, settings: &serde_json::Value) -> bool {
        match FormattingConfig::from_lsp_settings(settings) {
            Ok(config) => {
                *self.config.write().await = config;
                true
            }
            Err(e) => {
                log::warn!("Ignoring invalid settings: {e}");
                self.client
                    .log_message(MessageType::WARNING, format!("Ignoring invalid mesonfmt settings: {e}"))
                    .await;
                false
            }
        }
    }

    /// Directory the tool runs in: the workspace root when it contains the
    /// document, otherwise the document's own directory.
    async fn working_dir_for(&self, uri: &Url) -> PathBuf {
        let document_path = uri.to_file_path().ok();
        let root = self.workspace_root.read().await.clone();

        match (root, document_path) {
            (Some(root), Some(doc)) if doc.starts_with(&root) => root,
            (_, Some(doc)) => doc.parent().map(Path::to_path_buf).unwrap_or(doc),
            (Some(root), None) => root,
            (None, None) => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Text of an open document, or of the file on disk.
    async fn document_text(&self, uri: &Url) -> Option<String> {
        if let Some(text) = self.documents.read().await.get(uri) {
            return Some(text.clone());
        }

        let path = uri.to_file_path().ok()?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("Cannot read unopened document {}: {e}", path.display());
                None
            }
        }
    }
}

fn supports_dynamic_formatting(capabilities: &ClientCapabilities) -> bool {
    capabilities
        .text_document
        .as_ref()
        .and_then(|t| t.formatting.as_ref())
        .and_then(|f| f.dynamic_registration)
        .unwrap_or(false)
}

#[tower_lsp::async_trait]
impl LanguageServer for MesonFormatLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> JsonRpcResult<InitializeResult> {
        log::info!("Initializing mesonfmt Language Server");

        let settings_applied = match &params.initialization_options {
            Some(options) => self.apply_settings(options).await,
            None => false,
        };

        if !settings_applied {
            let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            match FormattingConfig::load(self.config_path.as_deref(), &dir) {
                Ok(config) => *self.config.write().await = config,
                Err(e) => log::warn!("Failed to load config: {e}"),
            }
        }

        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok())
            .or_else(|| params.root_uri.as_ref().and_then(|uri| uri.to_file_path().ok()));
        *self.workspace_root.write().await = root;

        let dynamic = supports_dynamic_formatting(&params.capabilities);
        self.dynamic_registration.store(dynamic, Ordering::SeqCst);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                document_formatting_provider: (!dynamic).then_some(OneOf::Left(true)),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "mesonfmt".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("mesonfmt Language Server initialized");
        self.reconfigure(None).await;
    }

    async fn shutdown(&self) -> JsonRpcResult<()> {
        log::info!("Shutting down mesonfmt Language Server");
        self.coordinator.deregister().await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.documents
            .write()
            .await
            .insert(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: the last change carries the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .write()
                .await
                .insert(params.text_document.uri, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.write().await.remove(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::debug!("Configuration changed");
        self.reconfigure(Some(&params.settings)).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let mut root = self.workspace_root.write().await;
        let root_removed = root.as_ref().is_some_and(|current| {
            params
                .event
                .removed
                .iter()
                .any(|f| f.uri.to_file_path().ok().as_ref() == Some(current))
        });
        if root_removed {
            *root = None;
        }
        if root.is_none() {
            *root = params
                .event
                .added
                .first()
                .and_then(|f| f.uri.to_file_path().ok());
        }
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;

        let Some(text) = self.document_text(&uri).await else {
            return Ok(None);
        };
        let working_dir = self.working_dir_for(&uri).await;

        let edits = self.coordinator.format(&text, &working_dir).await;
        Ok(edits.map(|edits| edits.iter().map(to_lsp_text_edit).collect()))
    }
}
