// PDF exercise attachments encoded as data URLs

use crate::error::{Result, TaskError};
use crate::models::{ExerciseFile, ExerciseSource};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::path::Path;
use tracing::debug;

/// The only accepted attachment content type
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type declared for a file, derived from its extension
pub fn content_type_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("pdf") => PDF_CONTENT_TYPE,
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Reject anything that does not declare itself as PDF
pub fn check_content_type(content_type: &str) -> Result<()> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
        Ok(())
    } else {
        Err(TaskError::AttachmentRejected {
            content_type: content_type.to_string(),
        })
    }
}

/// Encode bytes as `data:<mime>;base64,<payload>`
pub fn encode_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, BASE64.encode(bytes))
}

/// Split a base64 data URL back into its MIME type and bytes
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| TaskError::DataUrl("missing data: scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| TaskError::DataUrl("missing payload separator".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| TaskError::DataUrl("only base64 data URLs are supported".to_string()))?;

    let bytes = BASE64
        .decode(payload)
        .map_err(|e| TaskError::DataUrl(e.to_string()))?;

    Ok((mime.to_string(), bytes))
}

/// Read a selected file and encode it for inline storage
///
/// The content type is checked before any I/O happens.
pub async fn read_exercise_file(source: &ExerciseSource) -> Result<ExerciseFile> {
    check_content_type(&source.content_type)?;

    let bytes = tokio::fs::read(&source.path)
        .await
        .map_err(|e| TaskError::AttachmentRead {
            path: source.path.display().to_string(),
            source: e,
        })?;

    let name = source
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "exercise.pdf".to_string());

    debug!(name = %name, bytes = bytes.len(), "Encoded exercise file");

    Ok(ExerciseFile {
        name,
        data_url: encode_data_url(PDF_CONTENT_TYPE, &bytes),
    })
}
