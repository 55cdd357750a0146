// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Blocking HTTP client for application endpoints and the search index.

use crate::constants::poll::REQUEST_TIMEOUT_SECS;
use crate::error::{HarnessError, Result};
use http::header;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

pub use http::{Method, StatusCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

pub fn get(url: &str) -> Result<HttpResponse> {
    send(Method::GET, url, None)
}

/// PUT a JSON document
pub fn put_json(url: &str, document: &serde_json::Value) -> Result<HttpResponse> {
    send(Method::PUT, url, Some(document.to_string()))
}

fn client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(http_error)
}

/// Send one request; a JSON `body` sets the content type accordingly
#[instrument(skip(body))]
pub fn send(method: Method, url: &str, body: Option<String>) -> Result<HttpResponse> {
    let target = Url::parse(url)
        .map_err(|e| HarnessError::Http(format!("invalid URL {}: {}", url, e)))?;

    let mut request = client()?.request(method, target);
    if let Some(body) = body {
        request = request
            .header(header::CONTENT_TYPE, "application/json")
            .body(body);
    }

    let response = request.send().map_err(http_error)?;
    let status = response.status();
    let body = response.text().map_err(http_error)?;
    debug!(%status, len = body.len(), "HTTP response received");

    Ok(HttpResponse { status, body })
}

fn http_error(e: reqwest::Error) -> HarnessError {
    HarnessError::Http(e.to_string())
}
