use std::time::Duration;

use reqwest::{Client, ClientBuilder};

use crate::Error;

/// Shared plumbing for HTTP-backed sources
pub struct BaseClientBuilder {
    pub client_builder: ClientBuilder,
    pub info: SourceInfo,
}

pub struct BaseClient {
    pub client: Client,
    pub info: SourceInfo,
}

pub struct SourceInfo {
    pub name: String,
    pub description: String,
}

impl BaseClientBuilder {
    pub fn new(info: SourceInfo) -> Self {
        let client_builder = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("sait-sched/0.1.0")
            .default_headers({
                use reqwest::header::HeaderValue;
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    "Accept",
                    HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
                );
                headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
                headers
            });

        Self {
            client_builder,
            info,
        }
    }

    pub fn build(self) -> Result<BaseClient, Error> {
        let client = self
            .client_builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(BaseClient {
            client,
            info: self.info,
        })
    }
}

impl BaseClient {
    /// Map transport failures onto the error taxonomy; timeouts and request
    /// failures are always attributed to the upstream, never the caller
    pub fn handle_error_req(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Timeout
        } else if error.is_request() {
            Error::Upstream {
                source_name: self.info.name.clone(),
                message: format!("Request failed: {}", error),
            }
        } else {
            Error::Http(error)
        }
    }

    pub fn upstream_error(&self, message: impl Into<String>) -> Error {
        Error::Upstream {
            source_name: self.info.name.clone(),
            message: message.into(),
        }
    }
}
