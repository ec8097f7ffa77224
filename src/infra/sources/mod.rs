//! HTTP clients for the upstream drug reference services.

mod openfda;
mod rxclass;

pub use openfda::{OPENFDA_API, OpenFdaClient};
pub use rxclass::{RXCLASS_API, RxClassClient};

use std::time::Instant;

use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::application::sources::SourceError;
use crate::config::UpstreamSettings;
use crate::infra::error::InfraError;

const METRIC_UPSTREAM_REQUESTS: &str = "rxlens_upstream_requests_total";
const METRIC_UPSTREAM_MS: &str = "rxlens_upstream_ms";
const ERROR_BODY_MAX_CHARS: usize = 512;

/// Build the process-wide HTTP client. Without a configured timeout requests
/// may wait indefinitely.
pub fn build_client(settings: &UpstreamSettings) -> Result<reqwest::Client, InfraError> {
    let mut builder =
        reqwest::Client::builder().user_agent(concat!("rxlens/", env!("CARGO_PKG_VERSION")));
    if let Some(timeout) = settings.timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|err| InfraError::http_client(err.to_string()))
}

/// Join `path` onto `base` and append the query pairs, percent-encoded.
pub(crate) fn endpoint(
    api: &'static str,
    base: &str,
    path: &str,
    query: &[(&str, &str)],
) -> Result<Url, SourceError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined).map_err(|err| SourceError::Transport {
        api,
        message: format!("invalid endpoint `{joined}`: {err}"),
    })?;
    url.query_pairs_mut().extend_pairs(query);
    Ok(url)
}

/// GET `url` and decode a JSON body. Any non-success status is a failure.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    api: &'static str,
    url: Url,
) -> Result<T, SourceError> {
    let started = Instant::now();
    let path = url.path().to_string();

    let response = client.get(url).send().await.map_err(|err| {
        counter!(METRIC_UPSTREAM_REQUESTS, "api" => api, "outcome" => "transport").increment(1);
        warn!(
            target = "rxlens::upstream",
            api,
            path = %path,
            error = %err,
            "upstream request failed"
        );
        SourceError::Transport {
            api,
            message: err.to_string(),
        }
    })?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|err| SourceError::Transport {
        api,
        message: err.to_string(),
    })?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_UPSTREAM_MS, "api" => api).record(elapsed_ms);

    if !status.is_success() {
        counter!(METRIC_UPSTREAM_REQUESTS, "api" => api, "outcome" => "status").increment(1);
        warn!(
            target = "rxlens::upstream",
            api,
            path = %path,
            status = status.as_u16(),
            body = %body_excerpt(&bytes),
            "upstream returned an error status"
        );
        return Err(SourceError::Status {
            api,
            status: status.as_u16(),
        });
    }

    counter!(METRIC_UPSTREAM_REQUESTS, "api" => api, "outcome" => "ok").increment(1);
    debug!(
        target = "rxlens::upstream",
        api,
        path = %path,
        elapsed_ms = elapsed_ms as u64,
        "upstream request succeeded"
    );

    serde_json::from_slice(&bytes).map_err(|err| SourceError::Json {
        api,
        message: err.to_string(),
    })
}

fn body_excerpt(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let mut excerpt: String = text.chars().take(ERROR_BODY_MAX_CHARS).collect();
    excerpt = excerpt.trim().replace(['\n', '\r', '\t'], " ");
    if text.chars().count() > ERROR_BODY_MAX_CHARS {
        excerpt.push_str(" ...");
    }
    excerpt
}
