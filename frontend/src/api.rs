//! Browser-side HTTP client for the revision backend.
//!
//! All endpoints are plain `GET`s returning JSON. A payload carrying an
//! `error` field counts as a failure even when the status is 200.

use chrono::NaiveDate;
use revision_range::{FetchFailure, RevisionPair};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::{
    ArticleHistoryResponse, ArticleId, BackendPayload, Cluster, ClusterSummaryResponse,
    ClustersResponse, RevisionEntry, VisualizationResponse,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, Request, RequestInit, Response};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error("request aborted")]
    Aborted,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Backend(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("browser window is not available")]
    Unavailable,
}

impl ApiError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ApiError::Aborted)
    }

    pub fn into_fetch_failure(self) -> FetchFailure {
        if self.is_cancellation() {
            FetchFailure::Cancelled
        } else {
            FetchFailure::Failed(self.to_string())
        }
    }
}

/// History of one article as returned by `/api/article_history`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleHistory {
    pub article_id: ArticleId,
    pub entries: Vec<RevisionEntry>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    /// `base_url` without a trailing slash; empty for the page origin.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub async fn fetch_clusters(&self, date: NaiveDate) -> Result<Vec<Cluster>, ApiError> {
        let url = self.endpoint("/api/clusters", &[("datum", date.format("%Y-%m-%d").to_string())]);
        let response: ClustersResponse = get_json(&url, None).await?;
        Ok(response.clusters)
    }

    pub async fn fetch_article_history(&self, title: &str) -> Result<ArticleHistory, ApiError> {
        let url = self.endpoint("/api/article_history", &[("title", title.to_string())]);
        let response: ArticleHistoryResponse = get_json(&url, None).await?;
        let article_id = response
            .article_id
            .ok_or_else(|| ApiError::Decode("article_history response has no article_id".to_string()))?;
        Ok(ArticleHistory {
            article_id,
            entries: response.history,
        })
    }

    /// Abortable through `signal`; an abort surfaces as `ApiError::Aborted`.
    pub async fn fetch_visualization(
        &self,
        article_id: &ArticleId,
        pair: RevisionPair,
        signal: Option<&AbortSignal>,
    ) -> Result<VisualizationResponse, ApiError> {
        let url = self.endpoint(
            "/api/visualize",
            &[
                ("article_id", article_id.as_str().to_string()),
                ("start_revid", pair.start_revid.to_string()),
                ("end_revid", pair.end_revid.to_string()),
            ],
        );
        get_json(&url, signal).await
    }

    /// `cluster_index` is the cluster's position in the `/api/clusters` list
    /// for `date`.
    pub async fn fetch_cluster_summary(
        &self,
        cluster_index: usize,
        date: NaiveDate,
    ) -> Result<Option<String>, ApiError> {
        let url = self.cluster_summary_url(cluster_index, date);
        let response: ClusterSummaryResponse = get_json(&url, None).await?;
        Ok(response.summary.filter(|summary| !summary.trim().is_empty()))
    }

    fn cluster_summary_url(&self, cluster_index: usize, date: NaiveDate) -> String {
        self.endpoint(
            "/api/cluster_summary",
            &[
                ("cluster_id", cluster_index.to_string()),
                ("date", date.format("%Y-%m-%d").to_string()),
            ],
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{}?{}", self.base_url, path, query)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

async fn get_json<T>(url: &str, signal: Option<&AbortSignal>) -> Result<T, ApiError>
where
    T: DeserializeOwned + BackendPayload,
{
    let window = web_sys::window().ok_or(ApiError::Unavailable)?;

    let init = RequestInit::new();
    init.set_method("GET");
    if let Some(signal) = signal {
        init.set_signal(Some(signal));
    }
    let request = Request::new_with_str_and_init(url, &init)
        .map_err(|error| ApiError::Network(js_error_text(&error)))?;

    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(classify_js_error)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| ApiError::Decode("fetch did not resolve to a Response".to_string()))?;

    let body = JsFuture::from(response.text().map_err(classify_js_error)?)
        .await
        .map_err(classify_js_error)?;
    let body = body.as_string().unwrap_or_default();

    decode_payload(response.status(), &body)
}

fn decode_payload<T>(status: u16, body: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + BackendPayload,
{
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|error_body| error_body.error)
            .unwrap_or_else(|| format!("request failed with status {}", status));
        return Err(ApiError::Status { status, message });
    }

    let payload: T =
        serde_json::from_str(body).map_err(|error| ApiError::Decode(error.to_string()))?;
    if let Some(message) = payload.backend_error() {
        return Err(ApiError::Backend(message.to_string()));
    }
    Ok(payload)
}

fn classify_js_error(error: JsValue) -> ApiError {
    let name = js_sys::Reflect::get(&error, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string());
    if name.as_deref() == Some("AbortError") {
        ApiError::Aborted
    } else {
        ApiError::Network(js_error_text(&error))
    }
}

fn js_error_text(error: &JsValue) -> String {
    js_sys::Reflect::get(error, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{:?}", error))
}
