use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::InsightError;
use crate::models::{AnalysisResult, WorkloadInput};

pub const FALLBACK_TIP: &str =
    "Focus on one task at a time and remember to take short breaks. You've got this! 💪";

const INSIGHT_SYSTEM_PROMPT: &str =
    "You are a caring academic wellness coach. Keep responses brief, warm, and actionable.";
const INSIGHT_MAX_TOKENS: u32 = 150;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Anything that can turn a list of chat messages into one completion.
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, InsightError>;
}

/// OpenAI-compatible `/chat/completions` client (Groq by default).
#[derive(Debug, Clone)]
pub struct CompletionsClient {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl CompletionsClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|err| InsightError::Network(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
            timeout,
        })
    }

    pub fn for_insights(config: &AppConfig) -> Result<Self, InsightError> {
        Self::new(
            &config.api_base_url,
            config.api_key.clone(),
            config.model.clone(),
            config.insight_timeout,
        )
    }

    pub fn for_chat(config: &AppConfig) -> Result<Self, InsightError> {
        Self::new(
            &config.api_base_url,
            config.chat_key().map(str::to_string),
            config.model.clone(),
            config.chat_timeout,
        )
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl InsightProvider for CompletionsClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
    ) -> Result<String, InsightError> {
        let api_key = self.api_key.as_deref().ok_or(InsightError::MissingApiKey)?;
        let correlation_id = Uuid::new_v4().to_string();
        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": TEMPERATURE,
            "max_tokens": max_tokens,
        });

        debug!(
            target: "loadcheck::insight",
            correlation_id = %correlation_id,
            model = %self.model,
            messages = messages.len(),
            "requesting completion"
        );

        let timeout_secs = self.timeout.as_secs();
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| InsightError::from_reqwest(err, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InsightError::Http {
                status: status.as_u16(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| InsightError::from_reqwest(err, timeout_secs))?;
        let content = payload
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                InsightError::InvalidResponse("missing choices[0].message.content".into())
            })?;

        debug!(
            target: "loadcheck::insight",
            correlation_id = %correlation_id,
            latency_ms = start.elapsed().as_millis() as u64,
            response_len = content.len(),
            "completion received"
        );

        Ok(content.trim().to_string())
    }
}

/// Produces the personalized tip for an analysis and never fails: any provider error,
/// timeout or empty reply becomes [`FALLBACK_TIP`].
#[derive(Clone)]
pub struct InsightService {
    provider: Option<Arc<dyn InsightProvider>>,
    timeout: Duration,
}

impl InsightService {
    pub fn new(provider: Arc<dyn InsightProvider>, timeout: Duration) -> Self {
        Self {
            provider: Some(provider),
            timeout,
        }
    }

    /// Always answers with the fallback tip.
    pub fn offline() -> Self {
        Self {
            provider: None,
            timeout: Duration::ZERO,
        }
    }

    pub async fn tip(&self, input: &WorkloadInput, analysis: &AnalysisResult) -> String {
        match self.try_tip(input, analysis).await {
            Ok(tip) => tip,
            Err(err) => {
                warn!(
                    target: "loadcheck::insight",
                    code = err.code(),
                    error = %err,
                    "insight unavailable, using fallback tip"
                );
                FALLBACK_TIP.to_string()
            }
        }
    }

    pub async fn try_tip(
        &self,
        input: &WorkloadInput,
        analysis: &AnalysisResult,
    ) -> Result<String, InsightError> {
        let provider = self.provider.as_ref().ok_or(InsightError::MissingApiKey)?;
        let messages = [
            ChatMessage::system(INSIGHT_SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(input, analysis)),
        ];

        let completion = provider.complete(&messages, INSIGHT_MAX_TOKENS);
        let reply = tokio::time::timeout(self.timeout, completion)
            .await
            .map_err(|_| InsightError::Timeout(self.timeout.as_secs()))??;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(InsightError::InvalidResponse("empty completion".into()));
        }
        info!(target: "loadcheck::insight", tip_len = reply.len(), "personalized tip generated");
        Ok(reply.to_string())
    }
}

fn join_or<I>(items: I, empty: &str) -> String
where
    I: IntoIterator<Item = String>,
{
    let joined: Vec<String> = items.into_iter().collect();
    if joined.is_empty() {
        empty.to_string()
    } else {
        joined.join(", ")
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

pub fn build_prompt(input: &WorkloadInput, analysis: &AnalysisResult) -> String {
    let subjects = join_or(
        input.subjects.iter().map(|subject| {
            format!(
                "{} ({}h/week)",
                or_default(&subject.name, "Unknown"),
                subject.hours_per_week
            )
        }),
        "None specified",
    );
    let exams = join_or(
        input.exams.iter().map(|exam| {
            format!(
                "{} on {} ({})",
                or_default(&exam.name, "Exam"),
                or_default(&exam.date, "TBD"),
                exam.difficulty.as_str()
            )
        }),
        "None",
    );
    let projects = join_or(
        input.projects.iter().map(|project| {
            format!(
                "{} due {} ({} complexity)",
                or_default(&project.name, "Project"),
                or_default(&project.deadline, "TBD"),
                project.complexity.as_str()
            )
        }),
        "None",
    );
    let causes = join_or(analysis.causes.iter().cloned(), "None identified");

    format!(
        "You are an empathetic academic wellness advisor for students. Based on this student's data, \
provide a SHORT, personalized, and actionable response (max 3 sentences).

Student's Situation:
- Sleep: {sleep} hours/night
- Subjects & Study Hours: {subjects}
- Upcoming Exams: {exams}
- Projects Due: {projects}
- Burnout Risk Score: {score}/100 ({label})
- Main Stress Factors: {causes}

Give ONE specific, encouraging tip that addresses their biggest challenge. Be warm and supportive. \
Don't use bullet points.",
        sleep = input.sleep_hours,
        score = analysis.total_score,
        label = analysis.risk_level.label(),
    )
}
