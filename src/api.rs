// API client module: a small blocking HTTP client for the assistants API and
// the public models catalog. Calls are single-shot: no retry, no pagination,
// no caching. `AssistantsApi` is the seam the interactive steps talk to.

use crate::config::Config;
use crate::error::CliError;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Model identifier -> vendor name, in the order the models endpoint lists them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorCatalog(Vec<(String, String)>);

impl VendorCatalog {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(id, vendor)| (id.as_str(), vendor.as_str()))
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.iter().find(|(model, _)| *model == id).map(|(_, vendor)| vendor)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for VendorCatalog {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        VendorCatalog(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for VendorCatalog {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde_json's `preserve_order` keeps the server's key order here.
        let raw = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(id, vendor)| match vendor {
                serde_json::Value::String(vendor) => (id, vendor),
                other => (id, other.to_string()),
            })
            .collect())
    }
}

/// An assistant as returned by the API. Everything but the id and model
/// may be null remotely.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One block of message content. Only text blocks are interpreted.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TextContent {
    pub value: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Message {
    /// Text of the first `text` content block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.value.as_str()),
            ContentBlock::Other => None,
        })
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling should stop at this status.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub assistant_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateAssistantRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub description: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CreateRunRequest {
    pub assistant_id: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListOrder {
    Desc,
}

/// Query string for list endpoints.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub order: ListOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn newest(limit: Option<u32>) -> Self {
        ListQuery {
            order: ListOrder::Desc,
            limit,
        }
    }
}

#[derive(Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

#[derive(Serialize)]
struct CreateThreadRequest {
    messages: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Remote operations used by the interactive session.
#[cfg_attr(test, mockall::automock)]
pub trait AssistantsApi {
    fn vendor_catalog(&self) -> Result<VendorCatalog, CliError>;
    fn create_assistant(&self, req: &CreateAssistantRequest) -> Result<Assistant, CliError>;
    fn list_assistants(&self, query: &ListQuery) -> Result<Vec<Assistant>, CliError>;
    fn create_thread(&self) -> Result<Thread, CliError>;
    fn create_message(
        &self,
        thread_id: &str,
        req: &CreateMessageRequest,
    ) -> Result<Message, CliError>;
    fn create_run(&self, thread_id: &str, req: &CreateRunRequest) -> Result<Run, CliError>;
    fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, CliError>;
    fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, CliError>;
    fn list_messages(&self, thread_id: &str, query: &ListQuery) -> Result<Vec<Message>, CliError>;
}

/// Blocking client holding a reqwest client, the API base URL, the models
/// catalog URL and the prebuilt bearer headers.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    models_url: String,
    auth: HeaderMap,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, CliError> {
        let client = Client::builder().build()?;
        Ok(ApiClient {
            client,
            base_url: config.base_url.clone(),
            models_url: config.models_url.clone(),
            auth: auth_headers(&config.api_token)?,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).headers(self.auth.clone())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).headers(self.auth.clone())
    }
}

/// Bearer token plus the beta header the assistants endpoints require.
fn auth_headers(token: &str) -> Result<HeaderMap, CliError> {
    let invalid = |e: reqwest::header::InvalidHeaderValue| {
        crate::config::ConfigError::InvalidValue("API_TOKEN".to_string(), e.to_string())
    };
    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(invalid)?;
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(
        HeaderName::from_static("openai-beta"),
        HeaderValue::from_static("assistants=v2"),
    );
    Ok(headers)
}

/// Send the request, turn non-2xx into `CliError::Api` and decode the body.
fn send<T: DeserializeOwned>(req: RequestBuilder, endpoint: &str) -> Result<T, CliError> {
    tracing::debug!(endpoint, "sending request");
    let res = req.send()?;
    let status = res.status();
    let body = res.text()?;
    if !status.is_success() {
        tracing::debug!(endpoint, status = status.as_u16(), "request failed");
        return Err(CliError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        });
    }
    serde_json::from_str(&body).map_err(|source| CliError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Prefer the structured `{"error": {"message": ..}}` body, else the raw text.
pub fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

impl AssistantsApi for ApiClient {
    fn vendor_catalog(&self) -> Result<VendorCatalog, CliError> {
        send(self.client.get(&self.models_url), "models")
    }

    fn create_assistant(&self, req: &CreateAssistantRequest) -> Result<Assistant, CliError> {
        send(self.post("/assistants").json(req), "assistants.create")
    }

    fn list_assistants(&self, query: &ListQuery) -> Result<Vec<Assistant>, CliError> {
        let list: ListResponse<Assistant> =
            send(self.get("/assistants").query(query), "assistants.list")?;
        Ok(list.data)
    }

    fn create_thread(&self) -> Result<Thread, CliError> {
        let body = CreateThreadRequest { messages: vec![] };
        send(self.post("/threads").json(&body), "threads.create")
    }

    fn create_message(
        &self,
        thread_id: &str,
        req: &CreateMessageRequest,
    ) -> Result<Message, CliError> {
        let path = format!("/threads/{}/messages", thread_id);
        send(self.post(&path).json(req), "messages.create")
    }

    fn create_run(&self, thread_id: &str, req: &CreateRunRequest) -> Result<Run, CliError> {
        let path = format!("/threads/{}/runs", thread_id);
        send(self.post(&path).json(req), "runs.create")
    }

    fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, CliError> {
        let path = format!("/threads/{}/runs/{}", thread_id, run_id);
        send(self.get(&path), "runs.retrieve")
    }

    fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run, CliError> {
        let path = format!("/threads/{}/runs/{}/cancel", thread_id, run_id);
        send(self.post(&path), "runs.cancel")
    }

    fn list_messages(&self, thread_id: &str, query: &ListQuery) -> Result<Vec<Message>, CliError> {
        let path = format!("/threads/{}/messages", thread_id);
        let list: ListResponse<Message> = send(self.get(&path).query(query), "messages.list")?;
        Ok(list.data)
    }
}
