use crate::config::ClientSettings;
use crate::error::{status_message, InvokeError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, Proxy, Url,
};
use std::sync::Arc;

/// Whether a response body is echoed to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Print,
    Suppress,
}

impl OutputMode {
    pub fn from_flag(print: bool) -> Self {
        if print {
            OutputMode::Print
        } else {
            OutputMode::Suppress
        }
    }
}

/// One call against the control plane
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
    pub output: OutputMode,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, None)
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(Method::POST, url, Some(body.into()))
    }

    pub fn put(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(Method::PUT, url, Some(body.into()))
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url, None)
    }

    fn new(method: Method, url: impl Into<String>, body: Option<String>) -> Self {
        ApiRequest {
            method,
            url: url.into(),
            body,
            output: OutputMode::Suppress,
        }
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

/// Performs one authenticated call and returns the raw response body.
/// Any transport failure or HTTP status >= 400 is an error.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: ApiRequest) -> Result<Bytes, InvokeError>;
}

/// Builds URLs scoped to one organization
#[derive(Debug, Clone)]
pub struct OrgEndpoint {
    base: Url,
}

impl OrgEndpoint {
    pub fn new(base_url: &str, org: &str) -> Result<Self, InvokeError> {
        let mut base =
            Url::parse(base_url).map_err(|e| InvokeError::InvalidUrl(format!("{base_url}: {e}")))?;
        base.path_segments_mut()
            .map_err(|_| InvokeError::InvalidUrl(base_url.to_string()))?
            .pop_if_empty()
            .push(org);
        Ok(OrgEndpoint { base })
    }

    /// URL of `segments` under the organization. Each segment is percent-encoded,
    /// so developer emails containing `+` or `@` are safe.
    pub fn url(&self, segments: &[&str]) -> String {
        self.url_with_query(segments, &[])
    }

    pub fn url_with_query(&self, segments: &[&str], query: &[(&str, &str)]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url.to_string()
    }
}

/// State shared by every worker of one bulk job
#[derive(Clone)]
pub struct JobContext {
    pub invoker: Arc<dyn Invoker>,
    pub endpoint: OrgEndpoint,
    /// Print mode for calls the user asked for; internal calls always suppress
    pub output: OutputMode,
}

impl JobContext {
    pub fn new(invoker: Arc<dyn Invoker>, endpoint: OrgEndpoint, output: OutputMode) -> Self {
        JobContext {
            invoker,
            endpoint,
            output,
        }
    }

    pub async fn invoke(&self, request: ApiRequest) -> Result<Bytes, InvokeError> {
        self.invoker.invoke(request).await
    }
}

pub struct ApigeeClient {
    pub org: String,
    pub base_url: String,
    pub client: Client,
    print_responses: bool,
}

impl ApigeeClient {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        let hv = HeaderValue::from_str(&format!("Bearer {}", settings.token))?;
        headers.insert(AUTHORIZATION, hv);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(proxy) = &settings.proxy_url {
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(ApigeeClient {
            org: settings.org.clone(),
            base_url: settings.base_url.clone(),
            client: builder.build()?,
            print_responses: settings.print_responses,
        })
    }

    pub fn endpoint(&self) -> Result<OrgEndpoint, InvokeError> {
        OrgEndpoint::new(&self.base_url, &self.org)
    }

    /// Job context for a bulk command run through this client
    pub fn into_job_context(self) -> anyhow::Result<JobContext> {
        let endpoint = self.endpoint()?;
        let output = OutputMode::from_flag(self.print_responses);
        Ok(JobContext::new(Arc::new(self), endpoint, output))
    }

    fn print_body(&self, content_type: &str, body: &[u8]) {
        if !self.print_responses || body.is_empty() || !content_type.contains("json") {
            return;
        }
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => match serde_json::to_string_pretty(&value) {
                Ok(pretty) => println!("{pretty}"),
                Err(e) => tracing::error!("error formatting response: {e}"),
            },
            Err(e) => tracing::error!("error parsing response: {e}"),
        }
    }
}

#[async_trait]
impl Invoker for ApigeeClient {
    async fn invoke(&self, request: ApiRequest) -> Result<Bytes, InvokeError> {
        tracing::debug!(method = %request.method, url = %request.url, "connecting");

        let mut req = self
            .client
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = request.body {
            tracing::debug!(payload = %body, "request payload");
            req = req.body(body);
        }

        let transport = |source| InvokeError::Transport {
            url: request.url.clone(),
            source,
        };
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = resp.bytes().await.map_err(transport)?;

        if status.as_u16() > 399 {
            let text = String::from_utf8_lossy(&body).to_string();
            tracing::debug!(status = status.as_u16(), body = %text, "error in response");
            return Err(InvokeError::Status {
                method: request.method.to_string(),
                url: request.url,
                status: status.as_u16(),
                message: status_message(status.as_u16()),
                body: text,
            });
        }

        if request.output == OutputMode::Print {
            self.print_body(&content_type, &body);
        }
        Ok(body)
    }
}
