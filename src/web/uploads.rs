use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

use crate::{
    conversion::{ConvertError, MissingField, Upload},
    web::{AppState, ConversionResponse, json_error},
};

/// Public route under which produced PDFs are served.
pub const PDF_ROUTE: &str = "/static/pdf";

const FILE_FIELD: &str = "file";
const TYPE_FIELD: &str = "type";

/// Error returned when the multipart body itself cannot be read.
#[derive(Debug, Error)]
#[error("failed to read upload form: {message}")]
pub struct UploadError {
    status: StatusCode,
    message: String,
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        Self {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

/// The uploaded file as received.
#[derive(Debug, Clone)]
pub struct ReceivedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// The fields of the conversion form. Unknown fields are ignored.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<ReceivedFile>,
    pub type_tag: Option<String>,
}

impl UploadForm {
    pub fn as_upload(&self) -> Upload<'_> {
        Upload {
            file: self.file.as_ref().map(|file| file.bytes.as_slice()),
            file_name: self.file.as_ref().map(|file| file.original_name.as_str()),
            type_tag: self.type_tag.as_deref(),
        }
    }
}

/// Reads the `file` and `type` fields. Only parts that carry a filename count
/// as the file; the first one wins. A file part with an empty filename (what
/// browsers send when nothing was chosen) is kept with no content.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, UploadError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match (name.as_str(), field.file_name().map(str::to_string)) {
            (FILE_FIELD, Some(original_name)) if form.file.is_none() => {
                let bytes = if original_name.is_empty() {
                    Vec::new()
                } else {
                    field.bytes().await?.to_vec()
                };
                form.file = Some(ReceivedFile {
                    original_name,
                    bytes,
                });
            }
            (TYPE_FIELD, None) if form.type_tag.is_none() => {
                form.type_tag = Some(field.text().await?);
            }
            _ => {}
        }
    }

    Ok(form)
}

pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(%rejection, "upload without a multipart body");
            return ConvertError::MissingInput(MissingField::File).into_response();
        }
    };

    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!(%err, "rejecting malformed upload");
            return json_error(err.status(), err.to_string()).into_response();
        }
    };

    match state.dispatcher().dispatch(form.as_upload()).await {
        Ok(conversion) => Json(ConversionResponse::new(conversion, PDF_ROUTE)).into_response(),
        Err(err) => err.into_response(),
    }
}
