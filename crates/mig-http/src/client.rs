//! Shared REST plumbing
//!
//! Status mapping:
//! - `204` (or an empty body) is an empty acknowledgement
//! - `400` is [`ClientError::Validation`] carrying the response body
//! - `404` is [`ClientError::NotFound`]
//! - any other non-2xx, and network failures, are [`ClientError::Transport`]
//!
//! Listings are drained by following `next`, which may be absolute or
//! relative to the host. Items are read from `results` or `data`.

use crate::endpoint::Endpoint;
use mig_model::{ClientError, Entity, EntityKind};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use url::Url;

/// Authenticated client rooted at one API prefix
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    root: Url,
    page_size: u32,
}

impl ApiClient {
    /// Build a client for `endpoint`, rooted at `prefix` (e.g. `/api/v2`)
    ///
    /// # Errors
    /// Returns a transport error for an unparseable host or a token that
    /// cannot be sent as a header.
    pub fn new(endpoint: &Endpoint, prefix: &str) -> Result<Self, ClientError> {
        let root = format!("{}/{}/", endpoint.host, prefix.trim_matches('/'));
        let root = Url::parse(&root)
            .map_err(|e| ClientError::transport(None, format!("invalid host {}: {e}", endpoint.host)))?;

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", endpoint.token))
            .map_err(|_| ClientError::transport(None, "token is not a valid header value"))?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(endpoint.timeout());
        if !endpoint.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder
            .build()
            .map_err(|e| ClientError::transport(None, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            root,
            page_size: endpoint.page_size,
        })
    }

    /// API root, ending in `/`
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Resolve a path relative to the API root
    ///
    /// # Errors
    /// Returns a transport error if the path does not form a valid URL.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.root
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::transport(None, format!("invalid path {path}: {e}")))
    }

    /// GET one JSON document
    ///
    /// # Errors
    /// As the status mapping above; an empty body is a decode error.
    pub async fn get_json(&self, path: &str) -> Result<Value, ClientError> {
        let url = self.url(path)?;
        self.send(Method::GET, url, None)
            .await?
            .ok_or_else(|| ClientError::Decode(format!("empty response from {path}")))
    }

    /// POST a JSON body; `None` for an empty acknowledgement
    ///
    /// # Errors
    /// As the status mapping above.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Option<Value>, ClientError> {
        let url = self.url(path)?;
        self.send(Method::POST, url, Some(body)).await
    }

    /// PATCH a JSON body; `None` for an empty acknowledgement
    ///
    /// # Errors
    /// As the status mapping above.
    pub async fn patch_json(&self, path: &str, body: &Value) -> Result<Option<Value>, ClientError> {
        let url = self.url(path)?;
        self.send(Method::PATCH, url, Some(body)).await
    }

    /// Every item of a listing, pages drained in order
    ///
    /// # Errors
    /// The first failing page aborts the listing.
    pub async fn list_json(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Value>, ClientError> {
        let mut url = self.url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page_size", &self.page_size.to_string());
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut items = Vec::new();
        let mut next = Some(url);
        let mut pages = 0usize;
        while let Some(url) = next.take() {
            let page = self
                .send(Method::GET, url.clone(), None)
                .await?
                .unwrap_or(Value::Null);
            pages += 1;
            let link = page
                .get("next")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
            items.extend(page_items(page));

            if let Some(link) = link {
                let following = url
                    .join(&link)
                    .map_err(|e| ClientError::Decode(format!("invalid next link {link}: {e}")))?;
                next = (following != url).then_some(following);
            }
        }

        tracing::debug!("Listed {} item(s) from {} in {} page(s)", items.len(), path, pages);
        Ok(items)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Option<Value>, ClientError> {
        let what = format!("{method} {url}");
        tracing::debug!("{}", what);

        let mut request: RequestBuilder = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::transport(None, format!("{what}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ClientError::transport(Some(status.as_u16()), format!("{what}: {e}")))?;

        if !status.is_success() {
            return Err(status_error(status, &what, text));
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ClientError::Decode(format!("{what}: {e}")))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("root", &self.root.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

fn status_error(status: StatusCode, what: &str, body: String) -> ClientError {
    match status {
        StatusCode::BAD_REQUEST => ClientError::validation(status.as_u16(), body),
        StatusCode::NOT_FOUND => ClientError::not_found(what),
        _ => ClientError::transport(Some(status.as_u16()), format!("{what} -> {status}: {body}")),
    }
}

/// Items of one listing page
fn page_items(page: Value) -> Vec<Value> {
    match page {
        Value::Array(items) => items,
        Value::Object(mut doc) => ["results", "data"]
            .iter()
            .find_map(|key| match doc.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Collection path of a kind
pub(crate) fn collection(kind: EntityKind) -> String {
    format!("{}/", kind.endpoint())
}

/// Item path of a kind
pub(crate) fn item(kind: EntityKind, id: mig_model::EntityId) -> String {
    format!("{}/{}/", kind.endpoint(), id)
}

/// Decode listing items
pub(crate) fn entities(kind: EntityKind, values: Vec<Value>) -> Result<Vec<Entity>, ClientError> {
    values
        .into_iter()
        .map(|value| Entity::from_record(kind, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_items_reads_results_data_or_array() {
        assert_eq!(page_items(json!({ "results": [1, 2] })), vec![json!(1), json!(2)]);
        assert_eq!(page_items(json!({ "data": [3] })), vec![json!(3)]);
        assert_eq!(page_items(json!([4])), vec![json!(4)]);
        assert!(page_items(json!({ "count": 0 })).is_empty());
    }

    #[test]
    fn status_mapping() {
        let what = "POST https://aap/api/controller/v2/schedules/";
        assert!(status_error(StatusCode::BAD_REQUEST, what, "{}".into()).is_validation());
        assert!(status_error(StatusCode::NOT_FOUND, what, String::new()).is_not_found());
        assert!(status_error(StatusCode::FORBIDDEN, what, String::new()).is_unauthorized());
        assert_eq!(
            status_error(StatusCode::BAD_GATEWAY, what, "down".into()),
            ClientError::transport(Some(502), format!("{what} -> 502 Bad Gateway: down"))
        );
    }

    #[test]
    fn paths_join_under_the_api_root() {
        let client = ApiClient::new(&Endpoint::new("https://aap.example.com/", "t"), "/api/controller/v2").unwrap();
        assert_eq!(
            client.url(&item(EntityKind::JobTemplate, mig_model::EntityId(7))).unwrap().as_str(),
            "https://aap.example.com/api/controller/v2/job_templates/7/"
        );
        assert_eq!(
            client.url("/ping/").unwrap().as_str(),
            "https://aap.example.com/api/controller/v2/ping/"
        );
    }
}
