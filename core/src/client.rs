use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SessionToken;
use crate::model::{Event, File, Job, PrinterId, PrinterSnapshot};
use crate::{targets, Error};

pub const DEFAULT_BASE_URL: &str = "https://connect.prusa3d.com/app/";

pub type ConnectFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

pub trait ConnectClient: Send + Sync {
    fn fetch_printer<'a>(&'a self, printer: &'a PrinterId) -> ConnectFuture<'a, PrinterSnapshot>;

    // Most recent job first.
    fn fetch_jobs<'a>(&'a self, limit: u32, offset: u32) -> ConnectFuture<'a, Vec<Job>>;

    fn fetch_files<'a>(
        &'a self,
        printer: &'a PrinterId,
        limit: u32,
    ) -> ConnectFuture<'a, Vec<File>>;

    fn fetch_events<'a>(
        &'a self,
        printer: &'a PrinterId,
        limit: u32,
    ) -> ConnectFuture<'a, Vec<Event>>;

    fn preview_url(&self, _path: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConnectClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpConnectClient {
    pub fn new(config: &ClientConfig, session: &SessionToken) -> Result<Self, Error> {
        let base_url = parse_base_url(&config.base_url)?;

        let cookie = HeaderValue::from_str(&session.cookie_header()).map_err(|error| {
            Error::Config {
                key: "SESSION_ID".to_string(),
                details: error.to_string(),
            }
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|error| Error::Config {
                key: "http_client".to_string(),
                details: error.to_string(),
            })?;

        Ok(Self { http, base_url })
    }

    pub fn web_url(&self, path: &str) -> Option<Url> {
        self.base_url.join(path).ok()
    }

    async fn get_text(&self, path: &str, label: &str) -> Result<String, Error> {
        let url = self
            .base_url
            .join(path)
            .map_err(|error| Error::malformed(label, format!("invalid url: {error}")))?;

        debug!(target: targets::API, resource = %label, "GET");

        let response = self.http.get(url).send().await.map_err(|error| {
            warn!(target: targets::API, resource = %label, error = %error, "Request failed");
            Error::Fetch {
                resource: label.to_string(),
                status: error.status().map(|status| status.as_u16()),
                details: error.to_string(),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| Error::Fetch {
            resource: label.to_string(),
            status: Some(status.as_u16()),
            details: error.to_string(),
        })?;

        if let Some(error) = classify_status(status, label, &body) {
            warn!(
                target: targets::API,
                resource = %label,
                status = status.as_u16(),
                "Request rejected"
            );
            return Err(error);
        }

        debug!(
            target: targets::API,
            resource = %label,
            status = status.as_u16(),
            bytes = body.len(),
            "GET ok"
        );
        Ok(body)
    }

    pub async fn printer(&self, printer: &PrinterId) -> Result<PrinterSnapshot, Error> {
        let label = format!("printers/{printer}");
        let body = self
            .get_text(&format!("printers/{}", printer.expose()), &label)
            .await?;
        parse_printer(&label, &body)
    }

    pub async fn jobs(&self, limit: u32, offset: u32) -> Result<Vec<Job>, Error> {
        let path = format!("jobs?limit={limit}&offset={offset}");
        let body = self.get_text(&path, "jobs").await?;
        parse_jobs("jobs", &body)
    }

    pub async fn files(&self, printer: &PrinterId, limit: u32) -> Result<Vec<File>, Error> {
        let label = format!("printers/{printer}/files");
        let path = format!("printers/{}/files?limit={limit}", printer.expose());
        let body = self.get_text(&path, &label).await?;
        parse_files(&label, &body)
    }

    pub async fn events(&self, printer: &PrinterId, limit: u32) -> Result<Vec<Event>, Error> {
        let label = format!("printers/{printer}/events");
        let path = format!("printers/{}/events?limit={limit}", printer.expose());
        let body = self.get_text(&path, &label).await?;
        parse_events(&label, &body)
    }
}

impl ConnectClient for HttpConnectClient {
    fn fetch_printer<'a>(&'a self, printer: &'a PrinterId) -> ConnectFuture<'a, PrinterSnapshot> {
        Box::pin(self.printer(printer))
    }

    fn fetch_jobs<'a>(&'a self, limit: u32, offset: u32) -> ConnectFuture<'a, Vec<Job>> {
        Box::pin(self.jobs(limit, offset))
    }

    fn fetch_files<'a>(
        &'a self,
        printer: &'a PrinterId,
        limit: u32,
    ) -> ConnectFuture<'a, Vec<File>> {
        Box::pin(self.files(printer, limit))
    }

    fn fetch_events<'a>(
        &'a self,
        printer: &'a PrinterId,
        limit: u32,
    ) -> ConnectFuture<'a, Vec<Event>> {
        Box::pin(self.events(printer, limit))
    }

    fn preview_url(&self, path: &str) -> Option<String> {
        self.web_url(path).map(String::from)
    }
}

fn parse_base_url(value: &str) -> Result<Url, Error> {
    // Url::join drops the last segment unless the base ends with '/'.
    let normalized = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    Url::parse(&normalized).map_err(|error| Error::Config {
        key: "base_url".to_string(),
        details: format!("{value}: {error}"),
    })
}

pub fn classify_status(status: StatusCode, resource: &str, body: &str) -> Option<Error> {
    if status.is_success() {
        return None;
    }

    let resource = resource.to_string();
    let error = match status {
        StatusCode::NOT_FOUND => Error::NotFound { resource },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized {
            resource,
            status: status.as_u16(),
        },
        _ => Error::Fetch {
            resource,
            status: Some(status.as_u16()),
            details: excerpt(body),
        },
    };
    Some(error)
}

fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(LIMIT) {
        Some((index, _)) => format!("{}...", &trimmed[..index]),
        None => trimmed.to_string(),
    }
}

#[derive(Deserialize)]
struct JobsEnvelope {
    jobs: Vec<Job>,
}

#[derive(Deserialize)]
struct FilesEnvelope {
    files: Vec<File>,
}

#[derive(Deserialize)]
struct EventsEnvelope {
    #[serde(default)]
    events: Vec<Event>,
}

pub fn parse_printer(resource: &str, body: &str) -> Result<PrinterSnapshot, Error> {
    PrinterSnapshot::from_json(resource, body)
}

pub fn parse_jobs(resource: &str, body: &str) -> Result<Vec<Job>, Error> {
    let envelope: JobsEnvelope = serde_json::from_str(body)
        .map_err(|error| Error::malformed(resource, error.to_string()))?;
    let mut jobs = envelope.jobs;
    // Jobs without a start time sort last.
    jobs.sort_by(|left, right| right.start.cmp(&left.start));
    Ok(jobs)
}

pub fn parse_files(resource: &str, body: &str) -> Result<Vec<File>, Error> {
    let envelope: FilesEnvelope = serde_json::from_str(body)
        .map_err(|error| Error::malformed(resource, error.to_string()))?;
    Ok(envelope.files)
}

pub fn parse_events(resource: &str, body: &str) -> Result<Vec<Event>, Error> {
    let envelope: EventsEnvelope = serde_json::from_str(body)
        .map_err(|error| Error::malformed(resource, error.to_string()))?;
    Ok(envelope.events)
}

#[derive(Debug, Default)]
struct MockQueues {
    printers: VecDeque<Result<PrinterSnapshot, Error>>,
    jobs: VecDeque<Result<Vec<Job>, Error>>,
    files: VecDeque<Result<Vec<File>, Error>>,
    events: VecDeque<Result<Vec<Event>, Error>>,
}

#[derive(Debug, Clone, Default)]
pub struct MockConnectClient {
    queues: Arc<Mutex<MockQueues>>,
}

impl MockConnectClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_printer(&self, result: Result<PrinterSnapshot, Error>) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.printers.push_back(result);
        }
    }

    pub fn push_jobs(&self, result: Result<Vec<Job>, Error>) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.jobs.push_back(result);
        }
    }

    pub fn push_files(&self, result: Result<Vec<File>, Error>) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.files.push_back(result);
        }
    }

    pub fn push_events(&self, result: Result<Vec<Event>, Error>) {
        if let Ok(mut queues) = self.queues.lock() {
            queues.events.push_back(result);
        }
    }

    fn pop<T>(
        &self,
        resource: &str,
        select: impl FnOnce(&mut MockQueues) -> Option<Result<T, Error>>,
    ) -> Result<T, Error> {
        let popped = match self.queues.lock() {
            Ok(mut queues) => select(&mut queues),
            Err(_) => None,
        };
        popped.unwrap_or_else(|| {
            Err(Error::Fetch {
                resource: resource.to_string(),
                status: None,
                details: "MockConnectClient queue is empty".to_string(),
            })
        })
    }
}

impl ConnectClient for MockConnectClient {
    fn fetch_printer<'a>(&'a self, printer: &'a PrinterId) -> ConnectFuture<'a, PrinterSnapshot> {
        let resource = format!("printers/{printer}");
        Box::pin(async move { self.pop(&resource, |queues| queues.printers.pop_front()) })
    }

    fn fetch_jobs<'a>(&'a self, _limit: u32, _offset: u32) -> ConnectFuture<'a, Vec<Job>> {
        Box::pin(async move { self.pop("jobs", |queues| queues.jobs.pop_front()) })
    }

    fn fetch_files<'a>(
        &'a self,
        printer: &'a PrinterId,
        _limit: u32,
    ) -> ConnectFuture<'a, Vec<File>> {
        let resource = format!("printers/{printer}/files");
        Box::pin(async move { self.pop(&resource, |queues| queues.files.pop_front()) })
    }

    fn fetch_events<'a>(
        &'a self,
        printer: &'a PrinterId,
        _limit: u32,
    ) -> ConnectFuture<'a, Vec<Event>> {
        let resource = format!("printers/{printer}/events");
        Box::pin(async move { self.pop(&resource, |queues| queues.events.pop_front()) })
    }
}
