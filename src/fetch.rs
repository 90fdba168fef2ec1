use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::{config::Settings, error::FetchError};

/// Blocking HTTP client used for every page fetch.
///
/// Without `HTTP_TIMEOUT_SECS` the client keeps reqwest's default timeout.
/// System proxy variables apply unless `HTTP_NO_PROXY` is set.
pub fn build_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder().user_agent(settings.http_user_agent.clone());
    if let Some(secs) = settings.http_timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if settings.http_no_proxy {
        builder = builder.no_proxy();
    }
    builder.build().context("build http client")
}

/// One GET, no retry. Non-2xx answers are errors.
pub fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let resp = client.get(url).send().map_err(|source| FetchError::Transport {
        url: url.to_string(),
        source,
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = resp.text().map_err(|source| FetchError::Body {
        url: url.to_string(),
        source,
    })?;
    log::info!("fetch.ok url={} status={} bytes={}", url, status.as_u16(), body.len());
    Ok(body)
}
