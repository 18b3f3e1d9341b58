//! Blocking HTTP client for the review site

use std::path::PathBuf;

use reqwest::blocking::multipart;
use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::site::{Credentials, ReviewSite};

/// HTTP implementation of the [`ReviewSite`] transport
///
/// Requests are sequential and blocking; there is no retry or backoff. A
/// failed request surfaces as a [`TransportError`] and the caller decides
/// what to abort.
#[derive(Debug)]
pub struct HttpReviewSite {
    client: reqwest::blocking::Client,
}

impl HttpReviewSite {
    /// Create a client
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl Default for HttpReviewSite {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSite for HttpReviewSite {
    fn post(
        &self,
        url: &Url,
        data: &serde_json::Value,
        file_paths: &[PathBuf],
        credentials: Option<&Credentials>,
    ) -> Result<(), TransportError> {
        debug!(url = %url, files = file_paths.len(), "posting upload request");

        let mut request = self.client.post(url.clone());
        if let Some(credentials) = credentials {
            request = request.basic_auth(&credentials.username, Some(&credentials.password));
        }

        let response = if file_paths.is_empty() {
            request.json(data).send()?
        } else {
            let mut form = multipart::Form::new().text(
                "data",
                serde_json::to_string(data).expect("upload payload serializes"),
            );
            for path in file_paths {
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".to_string());
                form = form
                    .file(name, path)
                    .map_err(|source| TransportError::Attachment {
                        path: path.clone(),
                        source,
                    })?;
            }
            request.multipart(form).send()?
        };

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
                body: response.text().unwrap_or_default(),
            })
        }
    }
}
