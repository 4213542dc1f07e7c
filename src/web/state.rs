use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    config::AppConfig,
    conversion::{Dispatcher, LibreOfficeRenderer},
};

#[derive(Clone)]
pub struct AppState {
    config: Arc<AppConfig>,
    dispatcher: Dispatcher,
}

impl AppState {
    /// Creates the staging and output directories if needed and wires the
    /// dispatcher to them.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let staging_dir = ensure_storage_root(&config.staging_dir).await?;
        let output_dir = ensure_storage_root(&config.output_dir).await?;
        info!(
            staging = %staging_dir.display(),
            output = %output_dir.display(),
            "storage directories ready"
        );

        let mut dispatcher = Dispatcher::new(staging_dir, output_dir)
            .with_render_timeout(config.render_timeout)
            .with_word_engine(config.word_engine);

        match &config.soffice_bin {
            Some(program) => {
                info!(program = %program.display(), "LibreOffice renderer enabled");
                dispatcher = dispatcher.with_renderer(Arc::new(LibreOfficeRenderer::new(program)));
            }
            None => info!("no renderer configured; Excel and PPT uploads will be refused"),
        }

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Ensures `path` exists and returns its absolute form.
async fn ensure_storage_root(path: &Path) -> Result<std::path::PathBuf> {
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("failed to ensure storage root at {}", path.display()))?;
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("failed to resolve storage root at {}", path.display()))
}
