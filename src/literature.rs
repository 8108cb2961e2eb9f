//! Biomedical literature lookup over the NCBI E-utilities.
//!
//! Optional enrichment for the initial prompt: `esearch` finds article ids
//! for a term, `esummary` yields titles, `efetch` (text mode) yields the
//! abstract. The pipeline treats any failure here as an empty enrichment,
//! never as a run failure.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// One retrieved article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub title: String,
    pub abstract_text: String,
}

/// Errors from literature lookup.
#[derive(Debug, Error)]
pub enum LiteratureError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),
}

/// Knowledge lookup boundary.
#[async_trait]
pub trait LiteratureClient: Send + Sync {
    /// Search for up to `limit` articles matching `term`.
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Citation>, LiteratureError>;
}

/// PubMed client over the E-utilities JSON/text endpoints.
pub struct PubMedClient {
    client: reqwest::Client,
    base_url: String,
}

impl PubMedClient {
    pub fn new() -> Self {
        Self::with_base_url(EUTILS_BASE_URL)
    }

    /// Override the endpoint root (for tests against a local stub).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_ids(&self, term: &str, limit: usize) -> Result<Vec<String>, LiteratureError> {
        let url = format!(
            "{}/esearch.fcgi?db=pubmed&term={}&retmax={}&retmode=json",
            self.base_url,
            urlencoding::encode(term),
            limit
        );
        let body: Value = self.client.get(&url).send().await?.json().await?;
        parse_esearch_ids(&body)
    }

    async fn fetch_title(&self, id: &str) -> Result<Option<String>, LiteratureError> {
        let url = format!(
            "{}/esummary.fcgi?db=pubmed&id={}&retmode=json",
            self.base_url, id
        );
        let body: Value = self.client.get(&url).send().await?.json().await?;
        parse_esummary_title(&body, id)
    }

    async fn fetch_abstract(&self, id: &str) -> Result<String, LiteratureError> {
        let url = format!(
            "{}/efetch.fcgi?db=pubmed&id={}&rettype=abstract&retmode=text",
            self.base_url, id
        );
        let text = self.client.get(&url).send().await?.text().await?;
        Ok(text.trim().to_string())
    }
}

impl Default for PubMedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiteratureClient for PubMedClient {
    async fn search(&self, term: &str, limit: usize) -> Result<Vec<Citation>, LiteratureError> {
        let ids = self.fetch_ids(term, limit).await?;
        tracing::debug!(term = term, hits = ids.len(), "PubMed search");

        let mut citations = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(title) = self.fetch_title(id).await? else {
                continue;
            };
            let abstract_text = self.fetch_abstract(id).await.unwrap_or_default();
            citations.push(Citation {
                title,
                abstract_text,
            });
        }
        Ok(citations)
    }
}

/// Extract the id list from an `esearch` JSON body.
///
/// A body without the `esearchresult.idlist` array is a shape error; an
/// empty id list is a legitimate zero-hit result.
fn parse_esearch_ids(body: &Value) -> Result<Vec<String>, LiteratureError> {
    let ids = body
        .pointer("/esearchresult/idlist")
        .and_then(Value::as_array)
        .ok_or_else(|| LiteratureError::Shape("esearch body lacks esearchresult.idlist".into()))?;
    Ok(ids
        .iter()
        .filter_map(|id| id.as_str().map(str::to_string))
        .collect())
}

/// Extract one article title from an `esummary` JSON body.
///
/// A body without a `result` object is a shape error; a `result` that lacks
/// this id (or a title for it) yields `None` and the article is skipped.
fn parse_esummary_title(body: &Value, id: &str) -> Result<Option<String>, LiteratureError> {
    let result = body
        .get("result")
        .ok_or_else(|| LiteratureError::Shape("esummary body lacks result".into()))?;
    Ok(result
        .pointer(&format!("/{id}/title"))
        .and_then(Value::as_str)
        .map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_esearch_ids() {
        let body = json!({
            "esearchresult": {"count": "2", "idlist": ["39000001", "39000002"]}
        });
        assert_eq!(
            parse_esearch_ids(&body).unwrap(),
            vec!["39000001", "39000002"]
        );
    }

    #[test]
    fn test_parse_esearch_empty_hit_list_is_ok() {
        let body = json!({"esearchresult": {"idlist": []}});
        assert!(parse_esearch_ids(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_esearch_malformed_is_shape_error() {
        for body in [json!({"error": "bad query"}), json!("not an object")] {
            assert!(matches!(
                parse_esearch_ids(&body),
                Err(LiteratureError::Shape(_))
            ));
        }
    }

    #[test]
    fn test_parse_esummary_title() {
        let body = json!({
            "result": {
                "uids": ["39000001"],
                "39000001": {"uid": "39000001", "title": "Thymoma outcomes"}
            }
        });
        assert_eq!(
            parse_esummary_title(&body, "39000001").unwrap().as_deref(),
            Some("Thymoma outcomes")
        );
        // Unknown id inside a well-formed body: skipped, not an error.
        assert!(parse_esummary_title(&body, "12345").unwrap().is_none());
    }

    #[test]
    fn test_parse_esummary_missing_result_is_shape_error() {
        let body = json!({"header": {"type": "esummary"}});
        assert!(matches!(
            parse_esummary_title(&body, "39000001"),
            Err(LiteratureError::Shape(_))
        ));
    }

    /// Minimal HTTP stub dispatching on the E-utility path in the request
    /// line. Each connection carries one request (`Connection: close`).
    async fn spawn_stub() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let (content_type, body) = if request.contains("/esearch.fcgi") {
                    (
                        "application/json",
                        r#"{"esearchresult":{"count":"1","idlist":["39000001"]}}"#.to_string(),
                    )
                } else if request.contains("/esummary.fcgi") {
                    (
                        "application/json",
                        r#"{"result":{"uids":["39000001"],"39000001":{"uid":"39000001","title":"Thymoma outcomes"}}}"#
                            .to_string(),
                    )
                } else {
                    (
                        "text/plain",
                        "1. Thymoma outcomes.\n\nPostoperative follow-up of thymoma resection."
                            .to_string(),
                    )
                };
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    content_type,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_search_against_stub_endpoint() {
        let base_url = spawn_stub().await;
        let client = PubMedClient::with_base_url(base_url);

        let citations = client.search("thymoma", 5).await.unwrap();
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].title, "Thymoma outcomes");
        assert!(citations[0]
            .abstract_text
            .contains("Postoperative follow-up"));
    }
}
