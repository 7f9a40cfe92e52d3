use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// `GET /visits/:id/print`: the filled certificate as a download.
pub async fn print_certificate(
    State(state): State<AppState>,
    Path(visit_id): Path<i64>,
) -> ApiResult<Response> {
    let (patient, bytes) = state.clinic.certificate(visit_id)?;

    let filename = format!("Medical_Certificate_{}.docx", patient.file_safe_name());
    let disposition = HeaderValue::from_str(&content_disposition(&filename))
        .map_err(|e| ApiError::internal_error(format!("Invalid download name: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Attachment header with an ASCII `filename` and an RFC 5987 `filename*`.
///
/// Clients that understand `filename*` get the full UTF-8 name; the plain
/// parameter has every non-ASCII or control character replaced with `_`.
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii() && !c.is_ascii_control() && !matches!(c, '"' | '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        percent_encode(filename)
    )
}

/// Percent-encode everything outside the RFC 5987 `attr-char` set.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
