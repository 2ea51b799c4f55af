//! HTTP client for the remote translation source

use std::time::Duration;

use reqwest::header::{
    ACCEPT,
    HeaderMap,
    HeaderValue,
};
use reqwest::Url;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;

use super::RemoteError;
use crate::bundle::TranslationBundle;
use crate::config::HttpSettings;
use crate::types::Locale;

/// Name of the locale index document under the base URL.
const LOCALE_INDEX_FILE: &str = "locales.json";

/// Body of `locales.json`.
#[derive(Debug, Deserialize)]
struct LocaleIndex {
    /// Locale identifiers offered by the remote.
    locales: Vec<String>,
}

/// Fetches locale indexes and translation bundles over HTTP.
///
/// Every request sends `Accept: application/json`, follows redirects and is
/// bounded by the connect and read timeouts given at construction. Nothing is
/// retried.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    /// Shared connection pool
    http: reqwest::Client,
    /// Base URL without a trailing slash
    base_url: String,
    /// Parsed `base_url`, the parent of every requested document
    base: Url,
}

impl RemoteClient {
    /// # Errors
    /// - [`RemoteError::BaseUrl`] if `base_url` is not an absolute hierarchical URL
    /// - [`RemoteError::Build`] if the TLS backend cannot be initialised
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self, RemoteError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| RemoteError::BaseUrl { url: base_url.clone(), reason: e.to_string() })?;
        if base.cannot_be_a_base() {
            return Err(RemoteError::BaseUrl {
                url: base_url,
                reason: "URL cannot have path segments".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .read_timeout(Duration::from_millis(settings.read_timeout_ms))
            .redirect(Policy::limited(settings.max_redirects))
            .build()
            .map_err(RemoteError::Build)?;

        Ok(Self { http, base_url, base })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a document directly under the base URL.
    ///
    /// `file` is a single path segment: `/`, `?` and `#` are percent-encoded,
    /// so no name can reach outside the base path.
    fn url_for(&self, file: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(file);
        }
        url
    }

    /// GET `url` and parse a success body as JSON.
    async fn get_json(&self, url: &Url) -> Result<Value, RemoteError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| RemoteError::Unavailable { url: url.to_string(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status { url: url.to_string(), status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| RemoteError::Unavailable { url: url.to_string(), source })?;

        serde_json::from_slice(&body)
            .map_err(|source| RemoteError::Parse { url: url.to_string(), source })
    }

    /// Fetch `{base_url}/locales.json`.
    ///
    /// Discovery never fails: any error is logged and yields an empty list.
    /// Duplicates are dropped, first occurrence wins.
    pub async fn fetch_locale_index(&self) -> Vec<Locale> {
        let url = self.url_for(LOCALE_INDEX_FILE);

        let index = match self.get_json(&url).await {
            Ok(value) => serde_json::from_value::<LocaleIndex>(value)
                .map_err(|source| RemoteError::Parse { url: url.to_string(), source }),
            Err(e) => Err(e),
        };

        match index {
            Ok(index) => {
                let mut locales: Vec<Locale> = Vec::with_capacity(index.locales.len());
                for locale in index.locales.iter().map(Locale::new) {
                    if !locale.as_str().is_empty() && !locales.contains(&locale) {
                        locales.push(locale);
                    }
                }
                tracing::debug!(url = %url, count = locales.len(), "Fetched remote locale index");
                locales
            }
            Err(e) if e.is_unavailable() => {
                tracing::debug!(error = %e, "Remote locale index unavailable");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed remote locale index");
                Vec::new()
            }
        }
    }

    /// Fetch `{base_url}/{locale}.json`.
    ///
    /// # Returns
    /// - `Ok(Some(bundle))`: the remote has translations for `locale`
    /// - `Ok(None)`: non-success status or transport failure
    ///
    /// # Errors
    /// A success response whose body is not a JSON object.
    pub async fn fetch_translations(
        &self,
        locale: &Locale,
    ) -> Result<Option<TranslationBundle>, RemoteError> {
        let url = self.url_for(&format!("{locale}.json"));

        match self.get_json(&url).await {
            Ok(value) => {
                let bundle = TranslationBundle::from_json(value)
                    .map_err(|source| RemoteError::Shape { url: url.to_string(), source })?;
                tracing::debug!(%locale, url = %url, keys = bundle.len(), "Fetched remote bundle");
                Ok(Some(bundle))
            }
            Err(e) if e.is_unavailable() => {
                tracing::debug!(%locale, error = %e, "No remote translations");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(%locale, error = %e, "Remote returned an unusable bundle");
                Err(e)
            }
        }
    }
}
