//! Seam for the remote namespace-authority service.
//!
//! The authority owns the global directory tree: it allocates storage
//! endpoints for file keys and acknowledges create/delete requests. Its
//! internal logic is out of scope here; this module only defines the
//! consumed request/response surface and an HTTP implementation.

use crate::error::{KvError, KvResult};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// Contents of one remote directory, as the authority reports it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectoryListing {
    /// File keys directly inside the directory.
    #[serde(default)]
    pub files: Vec<String>,
    /// Directory keys directly inside the directory.
    #[serde(default)]
    pub subdirectories: Vec<String>,
}

/// Request/response surface of the namespace authority.
///
/// Every call carries a bearer token obtained from the external login flow.
pub trait NamespaceAuthority: Send + Sync {
    /// Announces a new file at `path`.
    fn create_file(&self, path: &str, token: &str) -> KvResult<()>;

    /// Announces a new directory at `path`.
    fn create_directory(&self, path: &str, token: &str) -> KvResult<()>;

    /// Returns the storage endpoints serving `path`.
    fn file_endpoints(&self, path: &str, token: &str) -> KvResult<Vec<String>>;

    /// Removes `path` from the namespace.
    fn delete(&self, path: &str, token: &str) -> KvResult<()>;

    /// Lists the files and subdirectories of the directory at `path`.
    fn list_directory(&self, path: &str, token: &str) -> KvResult<DirectoryListing>;
}

impl<T: NamespaceAuthority + ?Sized> NamespaceAuthority for std::sync::Arc<T> {
    fn create_file(&self, path: &str, token: &str) -> KvResult<()> {
        (**self).create_file(path, token)
    }

    fn create_directory(&self, path: &str, token: &str) -> KvResult<()> {
        (**self).create_directory(path, token)
    }

    fn file_endpoints(&self, path: &str, token: &str) -> KvResult<Vec<String>> {
        (**self).file_endpoints(path, token)
    }

    fn delete(&self, path: &str, token: &str) -> KvResult<()> {
        (**self).delete(path, token)
    }

    fn list_directory(&self, path: &str, token: &str) -> KvResult<DirectoryListing> {
        (**self).list_directory(path, token)
    }
}

#[derive(Debug, Deserialize)]
struct EndpointsReply {
    #[serde(default)]
    endpoints: Vec<String>,
}

/// HTTP implementation against the authority's load balancer.
pub struct HttpAuthority {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpAuthority {
    /// Creates an authority client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns a fatal transport error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> KvResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KvError::transport_fatal(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    fn post(&self, endpoint: &str, path: &str, token: &str) -> KvResult<reqwest::blocking::Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "path": path }))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    KvError::Timeout
                } else {
                    KvError::transport_retryable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(KvError::Rejected(format!("{url} returned HTTP {status}")));
        }
        Ok(response)
    }
}

impl NamespaceAuthority for HttpAuthority {
    fn create_file(&self, path: &str, token: &str) -> KvResult<()> {
        self.post("/create-file", path, token).map(|_| ())
    }

    fn create_directory(&self, path: &str, token: &str) -> KvResult<()> {
        self.post("/create-directory", path, token).map(|_| ())
    }

    fn file_endpoints(&self, path: &str, token: &str) -> KvResult<Vec<String>> {
        let reply: EndpointsReply = self
            .post("/get-file-endpoints", path, token)?
            .json()
            .map_err(|e| KvError::Protocol(e.to_string()))?;
        Ok(reply.endpoints)
    }

    fn delete(&self, path: &str, token: &str) -> KvResult<()> {
        self.post("/delete", path, token).map(|_| ())
    }

    fn list_directory(&self, path: &str, token: &str) -> KvResult<DirectoryListing> {
        self.post("/list-directory", path, token)?
            .json()
            .map_err(|e| KvError::Protocol(e.to_string()))
    }
}
