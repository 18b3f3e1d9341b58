//! Review-site transport contract

use std::path::PathBuf;

use url::Url;

use crate::error::TransportError;

/// Credentials for review-site uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Review-site username
    pub username: String,
    /// Review-site password
    pub password: String,
}

impl Credentials {
    /// Create credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Upload transport to a review site
///
/// The pipeline depends only on this contract; the HTTP client lives behind
/// it and tests substitute a recording mock.
pub trait ReviewSite {
    /// Post one upload request with optional file attachments
    fn post(
        &self,
        url: &Url,
        data: &serde_json::Value,
        file_paths: &[PathBuf],
        credentials: Option<&Credentials>,
    ) -> Result<(), TransportError>;
}

/// Derive the upload endpoint for an experiment from the review-site base URL
pub fn upload_url(base: &Url, experiment: &str) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("api/upload/{experiment}"))
}
