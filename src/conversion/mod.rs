//! Upload-to-PDF dispatch.
//!
//! Every request is staged under a fresh UUID, routed to the handler for its
//! type tag, and its staged input removed before the result is returned. Client
//! file names are kept as display metadata only and never reach the
//! filesystem.

mod jpg;
mod pdf;
pub mod renderer;
mod word;

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::WordEngine;

pub use renderer::{LibreOfficeRenderer, RenderError, Renderer};

/// Longest client extension that is carried over to the staged name.
const MAX_EXTENSION_LEN: usize = 8;

/// Client-declared document kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Word,
    Excel,
    Ppt,
    Jpg,
}

impl TypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Word => "word",
            TypeTag::Excel => "excel",
            TypeTag::Ppt => "ppt",
            TypeTag::Jpg => "jpg",
        }
    }

    /// Name used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            TypeTag::Word => "Word",
            TypeTag::Excel => "Excel",
            TypeTag::Ppt => "PPT",
            TypeTag::Jpg => "JPG",
        }
    }

    fn default_extension(self) -> &'static str {
        match self {
            TypeTag::Word => "docx",
            TypeTag::Excel => "xlsx",
            TypeTag::Ppt => "pptx",
            TypeTag::Jpg => "jpg",
        }
    }

    pub fn success_message(self) -> String {
        format!("{} to PDF conversion successful!", self.label())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ConvertError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "word" => Ok(TypeTag::Word),
            "excel" => Ok(TypeTag::Excel),
            "ppt" => Ok(TypeTag::Ppt),
            "jpg" => Ok(TypeTag::Jpg),
            other => Err(ConvertError::UnsupportedType(other.to_string())),
        }
    }
}

/// Which required field the client left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    File,
    FileOrType,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingField::File => f.write_str("No file provided!"),
            MissingField::FileOrType => f.write_str("File or file type is missing!"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("{0}")]
    MissingInput(MissingField),
    #[error("Conversion for {} is not implemented.", .0.to_uppercase())]
    UnsupportedType(String),
    #[error("Conversion for {} is not implemented.", .0.label().to_uppercase())]
    NotImplemented(TypeTag),
    #[error("{0}")]
    ConversionFailed(String),
    #[error("{context}: {source}")]
    IoFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConvertError {
    pub fn status(&self) -> StatusCode {
        match self {
            ConvertError::MissingInput(_)
            | ConvertError::UnsupportedType(_)
            | ConvertError::NotImplemented(_) => StatusCode::BAD_REQUEST,
            ConvertError::ConversionFailed(_) | ConvertError::IoFailure { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ConvertError::IoFailure {
            context: context.into(),
            source,
        }
    }
}

impl From<RenderError> for ConvertError {
    fn from(err: RenderError) -> Self {
        ConvertError::ConversionFailed(err.to_string())
    }
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Raw pieces of an upload as they arrived from the client.
#[derive(Debug, Default, Clone)]
pub struct Upload<'a> {
    /// `None` when the form had no file field at all.
    pub file: Option<&'a [u8]>,
    pub file_name: Option<&'a str>,
    pub type_tag: Option<&'a str>,
}

/// A successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub request_id: Uuid,
    pub kind: TypeTag,
    /// Sanitized client file name, for display only.
    pub file_name: String,
    /// Absolute path of the produced PDF.
    pub output_path: PathBuf,
    /// Name of the PDF inside the output directory.
    pub output_name: String,
}

impl Conversion {
    pub fn message(&self) -> String {
        self.kind.success_message()
    }
}

/// Stages uploads and routes them to the per-type converters.
#[derive(Clone)]
pub struct Dispatcher {
    staging_dir: PathBuf,
    output_dir: PathBuf,
    renderer: Option<Arc<dyn Renderer>>,
    render_timeout: Duration,
    word_engine: WordEngine,
}

impl Dispatcher {
    /// Both directories must already exist; `output_dir` should be absolute so
    /// reported paths are too.
    pub fn new(staging_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            output_dir: output_dir.into(),
            renderer: None,
            render_timeout: Duration::from_secs(120),
            word_engine: WordEngine::Reflow,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn with_word_engine(mut self, engine: WordEngine) -> Self {
        self.word_engine = engine;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Whether Word uploads go to the external renderer instead of reflow.
    pub fn renders_word(&self) -> bool {
        self.renderer.is_some() && self.word_engine == WordEngine::Renderer
    }

    pub async fn dispatch(&self, upload: Upload<'_>) -> Result<Conversion, ConvertError> {
        let Some(bytes) = upload.file else {
            return Err(ConvertError::MissingInput(MissingField::File));
        };
        let tag = upload.type_tag.unwrap_or_default();
        if bytes.is_empty() || tag.trim().is_empty() {
            return Err(ConvertError::MissingInput(MissingField::FileOrType));
        }
        let kind: TypeTag = tag.parse()?;

        let request_id = Uuid::new_v4();
        let client_name = upload.file_name.unwrap_or_default();
        let file_name = display_name(client_name, kind);
        let extension = staged_extension(client_name, kind);

        let staged = StagedFile::write(
            self.staging_dir.join(format!("{request_id}.{extension}")),
            bytes,
        )
        .await?;
        let output_name = format!("{request_id}.pdf");
        let output_path = self.output_dir.join(&output_name);

        info!(%request_id, %kind, file = %file_name, bytes = bytes.len(), "converting upload");
        let outcome = self.convert(kind, staged.path(), &output_path).await;
        staged.remove().await;

        match outcome {
            Ok(()) => {
                info!(%request_id, %kind, output = %output_path.display(), "conversion finished");
                Ok(Conversion {
                    request_id,
                    kind,
                    file_name,
                    output_path,
                    output_name,
                })
            }
            Err(err) => {
                remove_if_present(&output_path).await;
                if err.status().is_server_error() {
                    error!(%request_id, %kind, error = %err, "conversion failed");
                } else {
                    warn!(%request_id, %kind, error = %err, "conversion rejected");
                }
                Err(err)
            }
        }
    }

    async fn convert(&self, kind: TypeTag, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let converted = match kind {
            TypeTag::Jpg => run_blocking(input, output, jpg::image_to_pdf).await,
            TypeTag::Word => match (&self.renderer, self.word_engine) {
                (Some(renderer), WordEngine::Renderer) => {
                    self.render(renderer.as_ref(), input, output).await
                }
                _ => run_blocking(input, output, word::docx_to_pdf).await,
            },
            TypeTag::Excel | TypeTag::Ppt => match &self.renderer {
                Some(renderer) => self.render(renderer.as_ref(), input, output).await,
                None => Err(ConvertError::NotImplemented(kind)),
            },
        };
        converted?;

        // Never report a PDF that is not on disk.
        match tokio::fs::try_exists(output).await {
            Ok(true) => Ok(()),
            _ => Err(ConvertError::ConversionFailed(format!(
                "no PDF was produced at {}",
                output.display()
            ))),
        }
    }

    async fn render(
        &self,
        renderer: &dyn Renderer,
        input: &Path,
        output: &Path,
    ) -> Result<(), ConvertError> {
        let produced = tokio::time::timeout(
            self.render_timeout,
            renderer.render(input, &self.output_dir),
        )
        .await
        .map_err(|_| RenderError::Timeout)??;

        if produced != output {
            tokio::fs::rename(&produced, output).await.map_err(|err| {
                ConvertError::ConversionFailed(format!(
                    "{} produced {} which could not be moved into place: {err}",
                    renderer.name(),
                    produced.display()
                ))
            })?;
        }
        Ok(())
    }
}

async fn run_blocking(
    input: &Path,
    output: &Path,
    convert: fn(&Path, &Path) -> anyhow::Result<()>,
) -> Result<(), ConvertError> {
    let input = input.to_path_buf();
    let output = output.to_path_buf();
    tokio::task::spawn_blocking(move || convert(&input, &output))
        .await
        .context("conversion task panicked")
        .and_then(|result| result)
        .map_err(|err| ConvertError::ConversionFailed(format!("{err:#}")))
}

/// An upload written to the staging directory. Removed exactly once: by
/// [`StagedFile::remove`], or on drop if the request was abandoned first.
struct StagedFile {
    path: PathBuf,
    removed: bool,
}

impl StagedFile {
    async fn write(path: PathBuf, bytes: &[u8]) -> Result<Self, ConvertError> {
        if let Err(err) = tokio::fs::write(&path, bytes).await {
            remove_if_present(&path).await;
            return Err(ConvertError::io("failed to stage upload", err));
        }
        Ok(Self {
            path,
            removed: false,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    async fn remove(mut self) {
        remove_if_present(&self.path).await;
        self.removed = true;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(?err, file = %self.path.display(), "failed to remove abandoned upload");
            }
        }
    }
}

async fn remove_if_present(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!(?err, file = %path.display(), "failed to remove file"),
    }
}

/// Extension for the staged copy: the client's, when it is short plain
/// ASCII, otherwise the default for the type.
fn staged_extension(client_name: &str, kind: TypeTag) -> String {
    Path::new(client_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| kind.default_extension().to_string())
}

fn display_name(client_name: &str, kind: TypeTag) -> String {
    let sanitized = sanitize_filename::sanitize(client_name);
    if sanitized.trim().is_empty() {
        format!("upload.{}", kind.default_extension())
    } else {
        sanitized
    }
}
