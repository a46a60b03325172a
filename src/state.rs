use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    documents::{
        AskamaRenderer, CloudUploader, CommandPdfConverter, DocumentService, HttpUploader,
        NoopUploader, PdfConverter, TemplateRenderer,
    },
    model::company::CompanyDirectory,
    store::Store,
    wizard::WizardStore,
};

/// Shared handles for every worker.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub documents: DocumentService,
    pub wizards: WizardStore,
}

impl AppState {
    /// Wires the production collaborators from configuration.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn Store>,
        companies: CompanyDirectory,
    ) -> Self {
        let uploader: Arc<dyn CloudUploader> = match &config.upload_endpoint {
            Some(endpoint) => Arc::new(HttpUploader::new(
                endpoint.clone(),
                config.upload_token.clone(),
            )),
            None => Arc::new(NoopUploader),
        };

        AppState::new(
            config,
            store,
            companies,
            Arc::new(AskamaRenderer),
            Arc::new(CommandPdfConverter::new(config.pdf_converter_bin.clone())),
            uploader,
        )
    }

    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        companies: CompanyDirectory,
        renderer: Arc<dyn TemplateRenderer>,
        converter: Arc<dyn PdfConverter>,
        uploader: Arc<dyn CloudUploader>,
    ) -> Self {
        let documents = DocumentService::new(
            Arc::clone(&store),
            Arc::new(companies),
            renderer,
            converter,
            uploader,
            config.output_dir.clone(),
        );
        let wizards = WizardStore::new(
            Duration::from_secs(config.wizard_ttl_secs),
            Duration::from_secs(config.wizard_idle_secs),
        );

        AppState {
            store,
            documents,
            wizards,
        }
    }
}
