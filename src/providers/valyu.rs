//! Valyu DeepResearch client
//! Submits research tasks and polls them to a terminal state

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::poll::{poll_until, JobPoll};

pub const DEFAULT_BASE_URL: &str = "https://api.valyu.network/v1";
pub const RESEARCH_MODEL: &str = "lite";
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Deadline when research output is the answer itself.
pub const SOLE_SOURCE_MAX_WAIT: Duration = Duration::from_secs(600);
/// Shorter deadline when research only enriches a downstream completion.
pub const ENRICHMENT_MAX_WAIT: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    #[error("Valyu API rejected the request (check VALYU_API_KEY and permissions).")]
    Auth,
    #[error("Valyu API error: {0}")]
    Api(String),
    #[error("DeepResearch request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("DeepResearch task was created without an id")]
    MissingTaskId,
}

/// Remote task status as reported by the provider. Statuses this client
/// does not recognize count as still-pending and run into the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl JobStatus {
    fn parse(value: &str) -> Self {
        match value {
            "queued" => JobStatus::Queued,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Unknown,
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSnapshot {
    pub status: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStatus {
    Completed,
    Failed,
    TimedOut,
}

/// Final observation of one research task; discarded once the response is
/// composed.
#[derive(Debug, Clone)]
pub struct ResearchResult {
    pub status: ResearchStatus,
    pub output: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTaskResponse {
    #[serde(default)]
    deepresearch_id: Option<String>,
}

#[derive(Clone)]
pub struct DeepResearchClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl DeepResearchClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Submits a research task and returns its id.
    pub async fn create(&self, input: &str) -> Result<String, ResearchError> {
        let resp = self
            .http
            .post(format!("{}/deepresearch", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&json!({
                "input": input,
                "model": RESEARCH_MODEL,
                "output_formats": ["markdown"],
                "search": { "search_type": "web" },
            }))
            .send()
            .await?;
        let data: CreateTaskResponse = checked(resp).await?.json().await?;
        data.deepresearch_id.ok_or(ResearchError::MissingTaskId)
    }

    pub async fn status(&self, task_id: &str) -> Result<TaskSnapshot, ResearchError> {
        let resp = self
            .http
            .get(format!("{}/deepresearch/{}", self.base_url, task_id))
            .header("x-api-key", &self.api_key)
            .send()
            .await?;
        Ok(checked(resp).await?.json().await?)
    }

    /// Polls the task until it completes, fails, or `max_wait` elapses.
    pub async fn wait(
        &self,
        task_id: &str,
        interval: Duration,
        max_wait: Duration,
    ) -> Result<ResearchResult, ResearchError> {
        let snapshot = poll_until(interval, max_wait, || async move {
            let snapshot = self.status(task_id).await?;
            Ok::<_, ResearchError>(if JobStatus::parse(&snapshot.status).is_terminal() {
                JobPoll::Terminal(snapshot)
            } else {
                JobPoll::Pending
            })
        })
        .await?;

        Ok(match snapshot {
            Some(task) if JobStatus::parse(&task.status) == JobStatus::Completed => {
                ResearchResult {
                    status: ResearchStatus::Completed,
                    output: task.output,
                    error: None,
                }
            }
            Some(task) => ResearchResult {
                status: ResearchStatus::Failed,
                output: None,
                error: task.error,
            },
            None => ResearchResult {
                status: ResearchStatus::TimedOut,
                output: None,
                error: None,
            },
        })
    }

    /// Create-and-wait convenience used by both pipeline modes.
    pub async fn run(&self, input: &str, max_wait: Duration) -> Result<ResearchResult, ResearchError> {
        let task_id = self.create(input).await?;
        info!(task_id = %task_id, "deepresearch task submitted");
        self.wait(&task_id, POLL_INTERVAL, max_wait).await
    }
}

/// Maps provider credential rejections before the body is touched; other
/// non-success statuses surface as a plain API error.
async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, ResearchError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ResearchError::Auth);
    }
    if !status.is_success() {
        return Err(ResearchError::Api(status.to_string()));
    }
    Ok(resp)
}
