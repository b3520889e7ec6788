//! Lists uploaded files by name and size.
//!
//! `multipart/form-data` parts carrying a filename are listed one by one.
//! Any other non-empty body counts as a single anonymous upload.

use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use http_body_util::Limited;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::handlers::{body_error, read_body};
use crate::http::response;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub field: Option<String>,
    pub filename: Option<String>,
    pub size: usize,
}

fn is_multipart(request: &Request<Body>) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| {
            ct.trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

fn multipart_error(err: MultipartError, limit: usize) -> DispatchError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return DispatchError::PayloadTooLarge { limit };
    }
    body_error(&err, limit)
}

async fn multipart_files(
    request: Request<Body>,
    max_body_size: usize,
) -> Result<Vec<UploadedFile>, DispatchError> {
    let (parts, body) = request.into_parts();
    let body = Body::new(Limited::new(body, max_body_size));
    let mut multipart = Multipart::from_request(Request::from_parts(parts, body), &())
        .await
        .map_err(|e| DispatchError::bad_request(e.body_text()))?;

    let mut files = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_body_size))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = field.name().map(str::to_string);

        let mut size = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, max_body_size))?
        {
            size += chunk.len();
        }

        files.push(UploadedFile {
            field: name,
            filename: Some(filename),
            size,
        });
    }
    Ok(files)
}

pub async fn collect_uploads(
    request: Request<Body>,
    max_body_size: usize,
) -> Result<Vec<UploadedFile>, DispatchError> {
    if is_multipart(&request) {
        return multipart_files(request, max_body_size).await;
    }

    let body = read_body(request.into_body(), max_body_size).await?;
    if body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![UploadedFile {
        field: None,
        filename: None,
        size: body.len(),
    }])
}

pub async fn dumpupload(
    request: Request<Body>,
    max_body_size: usize,
) -> Result<Response, DispatchError> {
    let files = collect_uploads(request, max_body_size).await?;
    tracing::debug!(count = files.len(), "Uploads collected");
    Ok(response::json(&files))
}
