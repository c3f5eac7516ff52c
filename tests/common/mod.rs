#![allow(dead_code)]

use apigee_cli::client::{ApiRequest, Invoker, JobContext, OrgEndpoint, OutputMode};
use apigee_cli::error::{status_message, InvokeError};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BASE_URL: &str = "https://apigee.test/v1/organizations/";
const ORG_PREFIX: &str = "https://apigee.test/v1/organizations/org/";

type Responder = dyn Fn(&str, &ApiRequest) -> Result<Bytes, InvokeError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    /// Path below the organization, without the query string
    pub path: String,
    pub query: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    End,
}

/// In-memory control plane that records every call and the concurrency it saw
pub struct ScriptedInvoker {
    responder: Box<Responder>,
    delay: Duration,
    calls: Mutex<Vec<Call>>,
    events: Mutex<Vec<(String, Phase)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedInvoker {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&str, &ApiRequest) -> Result<Bytes, InvokeError> + Send + Sync + 'static,
    {
        Self::with_delay(Duration::ZERO, responder)
    }

    pub fn with_delay<F>(delay: Duration, responder: F) -> Arc<Self>
    where
        F: Fn(&str, &ApiRequest) -> Result<Bytes, InvokeError> + Send + Sync + 'static,
    {
        Arc::new(ScriptedInvoker {
            responder: Box::new(responder),
            delay,
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<(String, Phase)> {
        self.events.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Invoker for ScriptedInvoker {
    async fn invoke(&self, request: ApiRequest) -> Result<Bytes, InvokeError> {
        let rest = request
            .url
            .strip_prefix(ORG_PREFIX)
            .unwrap_or(&request.url)
            .to_string();
        let (path, query) = match rest.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (rest, None),
        };

        self.calls.lock().unwrap().push(Call {
            method: request.method.to_string(),
            path: path.clone(),
            query,
            body: request.body.clone(),
        });
        self.events.lock().unwrap().push((path.clone(), Phase::Start));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.responder)(&path, &request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.events.lock().unwrap().push((path, Phase::End));
        result
    }
}

pub fn context(invoker: &Arc<ScriptedInvoker>) -> JobContext {
    let invoker: Arc<dyn Invoker> = invoker.clone();
    JobContext::new(
        invoker,
        OrgEndpoint::new(BASE_URL, "org").unwrap(),
        OutputMode::Suppress,
    )
}

pub fn json(value: serde_json::Value) -> Result<Bytes, InvokeError> {
    Ok(Bytes::from(value.to_string()))
}

pub fn status(request: &ApiRequest, code: u16) -> Result<Bytes, InvokeError> {
    Err(InvokeError::Status {
        method: request.method.to_string(),
        url: request.url.clone(),
        status: code,
        message: status_message(code),
        body: String::new(),
    })
}
