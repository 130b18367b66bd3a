use crate::{ClientError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Header carrying the static API key on every request
pub const API_KEY_HEADER: &str = "Api-Key";

const JSON_MIME: &str = "application/json";

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// 2xx/3xx with nothing in the body (e.g. DELETE)
    Empty,
    Json(Value),
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Decode into a typed model; an empty body decodes as JSON `null`.
    /// On a shape mismatch the error's `raw` is the parsed body re-encoded compactly.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_value();
        serde_json::from_value(value.clone()).map_err(|source| ClientError::Parse {
            raw: value.to_string(),
            source,
        })
    }

    /// Decode into a typed model, falling back to its default for an empty body
    pub fn decode_or_default<T: DeserializeOwned + Default>(self) -> Result<T> {
        match self {
            Payload::Empty => Ok(T::default()),
            json => json.decode(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Json(value) => value,
        }
    }
}

/// Encode a request body straight from its typed model.
/// `f32` vectors keep their shortest form (`0.8`, not `0.800000011920929`).
pub fn encode<T: Serialize + ?Sized>(body: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(ClientError::Serialization)
}

/// Turn a status code and raw body text into the uniform result shape
pub fn classify(status: u16, text: String) -> Result<Payload> {
    if status >= 400 {
        return Err(ClientError::Http { status, body: text });
    }
    if text.is_empty() {
        return Ok(Payload::Empty);
    }
    match serde_json::from_str(&text) {
        Ok(value) => Ok(Payload::Json(value)),
        Err(source) => Err(ClientError::Parse { raw: text, source }),
    }
}

/// Wire-level access to the REST API.
/// Implementations never panic on HTTP or parse failures; everything lands in the `Result`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send a request with an optional JSON body (POST, PUT, DELETE, ...).
    /// `body` is already encoded, see [`encode`].
    async fn send_with_body(
        &self,
        url: &str,
        api_key: &str,
        body: Option<&[u8]>,
        method: Method,
    ) -> Result<Payload>;

    /// Send a GET request, appending `params` as a query string when given
    async fn send_query(
        &self,
        url: &str,
        api_key: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<Payload>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>, insecure_skip_verify: bool) -> Result<Self> {
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        if insecure_skip_verify {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn finish(response: reqwest::Response) -> Result<Payload> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        tracing::debug!(status, bytes = text.len(), "Response received");
        classify(status, text)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: HttpClient::new(),
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send_with_body(
        &self,
        url: &str,
        api_key: &str,
        body: Option<&[u8]>,
        method: Method,
    ) -> Result<Payload> {
        tracing::debug!(%method, url, has_body = body.is_some(), "Sending request");

        let mut request = self
            .client
            .request(method, url)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, JSON_MIME);

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, JSON_MIME).body(body.to_vec());
        }

        let response = request.send().await?;
        Self::finish(response).await
    }

    async fn send_query(
        &self,
        url: &str,
        api_key: &str,
        params: Option<&[(String, String)]>,
    ) -> Result<Payload> {
        tracing::debug!(url, "Sending query");

        let mut request = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, JSON_MIME);

        if let Some(params) = params {
            request = request.query(params);
        }

        let response = request.send().await?;
        Self::finish(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// URL of a local port with nothing listening on it.
    /// A dropped `MockServer` goes back to wiremock's pool and keeps answering.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[test]
    fn test_classify_http_error_keeps_raw_text() {
        for body in ["", "not json", r#"{"message":"quota"}"#] {
            match classify(429, body.to_string()) {
                Err(ClientError::Http { status, body: raw }) => {
                    assert_eq!(status, 429);
                    assert_eq!(raw, body);
                }
                other => panic!("expected HTTP error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_classify_empty_success() {
        assert_eq!(classify(200, String::new()).unwrap(), Payload::Empty);
        assert_eq!(classify(202, String::new()).unwrap(), Payload::Empty);
    }

    #[test]
    fn test_classify_json_success() {
        let payload = classify(201, r#"{"upsertedCount":5}"#.to_string()).unwrap();
        assert_eq!(payload, Payload::Json(json!({"upsertedCount": 5})));
    }

    #[test]
    fn test_classify_invalid_json() {
        match classify(200, "created".to_string()) {
            Err(ClientError::Parse { raw, .. }) => assert_eq!(raw, "created"),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_or_default_on_empty() {
        let decoded: crate::UpsertResponse = Payload::Empty.decode_or_default().unwrap();
        assert_eq!(decoded, crate::UpsertResponse::default());

        let missing: Option<crate::UpsertResponse> = Payload::Empty.decode().unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_decode_mismatch_is_parse_error() {
        let err = Payload::Json(json!("pretty-colors"))
            .decode::<crate::CollectionDescriptor>()
            .unwrap_err();
        assert_eq!(err.raw_body(), Some("\"pretty-colors\""));

        // whitespace from the server is not kept
        let payload = classify(200, "{ \"name\": 7 }".to_string()).unwrap();
        let err = payload.decode::<crate::CollectionDescriptor>().unwrap_err();
        assert!(matches!(err, ClientError::Parse { .. }));
        assert_eq!(err.raw_body(), Some(r#"{"name":7}"#));
    }

    #[test]
    fn test_encode_keeps_f32_text() {
        let values: Vec<f32> = vec![0.8, 0.1, 0.7];
        let body = encode(&values).unwrap();
        assert_eq!(std::str::from_utf8(&body).unwrap(), "[0.8,0.1,0.7]");
    }

    #[tokio::test]
    async fn test_send_with_body_sets_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(header("Api-Key", "secret"))
            .and(header("Accept", "application/json"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(json!({"namespace": "c", "vectors": []})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 0})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::default();
        let url = format!("{}/vectors/upsert", mock_server.uri());
        let body = encode(&json!({"namespace": "c", "vectors": []})).unwrap();
        let payload = transport
            .send_with_body(&url, "secret", Some(body.as_slice()), Method::POST)
            .await
            .unwrap();

        assert_eq!(payload, Payload::Json(json!({"upsertedCount": 0})));
    }

    #[tokio::test]
    async fn test_send_without_body_omits_content_type() {
        let mock_server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/databases/c"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::default();
        let url = format!("{}/databases/c", mock_server.uri());
        let payload = transport
            .send_with_body(&url, "secret", None, Method::DELETE)
            .await
            .unwrap();
        assert!(payload.is_empty());

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("content-type").is_none());
        assert!(requests[0].body.is_empty());
    }

    #[tokio::test]
    async fn test_send_with_body_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad dimension"))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::default();
        let body = encode(&json!({})).unwrap();
        let err = transport
            .send_with_body(&mock_server.uri(), "secret", Some(body.as_slice()), Method::POST)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.raw_body(), Some("bad dimension"));
    }

    #[tokio::test]
    async fn test_send_query_appends_params() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/databases"))
            .and(query_param("limit", "5"))
            .and(header_exists("Api-Key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a", "b"])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::default();
        let url = format!("{}/databases", mock_server.uri());
        let params = vec![("limit".to_string(), "5".to_string())];
        let payload = transport
            .send_query(&url, "secret", Some(&params))
            .await
            .unwrap();

        assert_eq!(payload, Payload::Json(json!(["a", "b"])));
    }

    #[tokio::test]
    async fn test_send_query_parse_error_keeps_raw_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let transport = HttpTransport::default();
        let err = transport
            .send_query(&mock_server.uri(), "secret", None)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Parse { .. }));
        assert_eq!(err.raw_body(), Some("<html>maintenance</html>"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_transport_error() {
        let url = closed_port_url();

        let transport = HttpTransport::default();
        let err = transport.send_query(&url, "secret", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
