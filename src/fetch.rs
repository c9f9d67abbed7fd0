//! HTTP client abstraction for making requests to the doctor directory backend

use std::time::Duration;

use log::{debug, warn};
use reqwest::{header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE}, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

use crate::config::ClientOptions;
use crate::error::{generic_request_message, Error, Result};
use crate::session::SessionStore;

/// Transport to the backend: one base URL, bearer auth, normalized errors.
///
/// Authenticated requests that come back 401/403 invalidate the stored session
/// here, once, so every view observing the [`SessionStore`] reacts the same way.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: Client,
    sessions: SessionStore,
    client_info: String,
    request_timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a new ApiClient
    pub fn new(base_url: Url, http_client: Client, sessions: SessionStore, options: &ClientOptions) -> Self {
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            http_client,
            sessions,
            client_info: options.client_info.clone(),
            request_timeout: options.request_timeout,
        }
    }

    /// The configured base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The session store consulted for tokens
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Resolve an API path against the base URL
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Issue a request and decode the JSON response.
    ///
    /// With `authenticated` set the stored token is attached; a missing token
    /// fails with [`Error::AuthMissing`] before anything is sent.
    pub async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>, authenticated: bool) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = FetchBuilder::new(self, path, method);
        if let Some(body) = body {
            builder = builder.json(body)?;
        }
        if authenticated {
            builder = builder.authenticated();
        }
        builder.execute().await
    }

    /// Create a GET request
    pub fn get(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::GET)
    }

    /// Create a POST request
    pub fn post(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::POST)
    }

    /// Create a PUT request
    pub fn put(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::PUT)
    }

    /// Create a DELETE request
    pub fn delete(&self, path: &str) -> FetchBuilder<'_> {
        FetchBuilder::new(self, path, Method::DELETE)
    }
}

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    api: &'a ApiClient,
    path: String,
    method: Method,
    body: Option<Vec<u8>>,
    authenticated: bool,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(api: &'a ApiClient, path: &str, method: Method) -> Self {
        Self {
            api,
            path: path.to_string(),
            method,
            body: None,
            authenticated: false,
        }
    }

    /// Attach the stored bearer token to the request
    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        Ok(self)
    }

    fn headers(&self, token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.api.client_info) {
            headers.insert("x-client-info", value);
        }
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::storage("stored token is not a valid header value"))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send(&self) -> Result<Response> {
        let token = if self.authenticated {
            match self.api.sessions.token()? {
                Some(token) => Some(token),
                None => {
                    warn!("No token found for {} {}", self.method, self.path);
                    return Err(Error::AuthMissing);
                }
            }
        } else {
            None
        };

        let url = self.api.url(&self.path)?;
        let mut req = self
            .api
            .http_client
            .request(self.method.clone(), url)
            .headers(self.headers(token.as_deref())?);
        if let Some(timeout) = self.api.request_timeout {
            req = req.timeout(timeout);
        }
        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        debug!("{} {}", self.method, self.path);
        let response = req.send().await.map_err(|e| {
            warn!("{} {} got no response: {}", self.method, self.path, e);
            Error::NetworkUnavailable(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if self.authenticated && matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            warn!("{} {} rejected with {}; dropping session", self.method, self.path, status);
            if let Err(e) = self.api.sessions.invalidate() {
                warn!("Failed to clear session after {}: {}", status, e);
            }
            return Err(Error::Unauthorized { status: status.as_u16() });
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(status, &text);
        warn!("{} {} failed with {}: {}", self.method, self.path, status, message);
        Err(Error::RequestFailed {
            status: status.as_u16(),
            message,
        })
    }

    /// Execute the request and parse the response as JSON.
    ///
    /// An empty success body decodes as JSON `null`.
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.send().await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Execute the request and discard the response body
    pub async fn execute_empty(&self) -> Result<()> {
        self.send().await?;
        Ok(())
    }
}

/// Prefer the backend's `message` (then `error`) field over a generic text
fn error_message(status: StatusCode, body: &str) -> String {
    let from_body = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    match from_body {
        Some(message) if !message.is_empty() => message,
        _ => generic_request_message(status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(
            Url::parse(base).unwrap(),
            Client::new(),
            SessionStore::in_memory(),
            &ClientOptions::default(),
        )
    }

    #[test]
    fn test_url_resolution_keeps_base_path() {
        let api = client("http://backend.test/v2");
        assert_eq!(api.url("/api/doctors").unwrap().as_str(), "http://backend.test/v2/api/doctors");

        let api = client("http://backend.test");
        assert_eq!(api.url("api/users/login").unwrap().as_str(), "http://backend.test/api/users/login");
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, r#"{"message":"Invalid credentials"}"#),
            "Invalid credentials"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, r#"{"error":"Doctor not found"}"#), "Doctor not found");
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>"),
            "Request failed with status 500"
        );
        assert_eq!(error_message(StatusCode::BAD_REQUEST, r#"{"message":""}"#), "Request failed with status 400");
    }

    #[tokio::test]
    async fn test_request_sends_body_and_bearer_token() {
        use crate::session::Session;
        use serde_json::json;
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/doctors"))
            .and(header("Authorization", "Bearer abc"))
            .and(header("x-client-info", ClientOptions::default().client_info.as_str()))
            .and(body_json(json!({"doctor_name": "Dr. A"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "d1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users/profile"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"public": true})))
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server.uri());
        let body = json!({"doctor_name": "Dr. A"});

        let missing: Result<Value> = api.request(Method::POST, "/api/doctors", Some(&body), true).await;
        assert!(matches!(missing, Err(Error::AuthMissing)));

        api.sessions().save(&Session::new("abc", json!({"token": "abc"}))).unwrap();
        let created: Value = api.request(Method::POST, "/api/doctors", Some(&body), true).await.unwrap();
        assert_eq!(created["_id"], "d1");

        let open: Value = api.request::<Value, _>(Method::GET, "/api/users/profile", None, false).await.unwrap();
        assert_eq!(open["public"], true);
    }

    #[tokio::test]
    async fn test_authenticated_request_without_token() {
        let api = client("http://127.0.0.1:9");
        let result = api.get("/api/doctors").authenticated().execute::<Value>().await;
        assert!(matches!(result, Err(Error::AuthMissing)));
    }
}
