//! Gemini schedule generator
//!
//! Calls the `generateContent` REST endpoint with a JSON response schema and
//! maps the structured reply onto [`Timetable`] candidates.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{GeneratorError, ScheduleGenerator};
use crate::models::{Timetable, TimetableConstraints, TimetableEntry};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const USER_AGENT: &str = concat!("sams-tt/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 1000;

/// Minimum spacing between outgoing requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Gemini rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Gemini API client producing timetable candidates
pub struct GeminiGenerator {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Create a client with the default model, endpoint and a 60s request timeout
    pub fn new(api_key: impl Into<String>) -> Result<Self, GeneratorError> {
        Self::with_timeout(api_key, Duration::from_secs(60))
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, GeneratorError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GeneratorError::NotConfigured("Gemini API key is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API root (no trailing slash needed)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ScheduleGenerator for GeminiGenerator {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        constraints: &TimetableConstraints,
    ) -> Result<Vec<Timetable>, GeneratorError> {
        self.rate_limiter.wait().await;

        let url = self.endpoint();
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(constraints) }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema(),
            },
        });

        tracing::debug!(
            model = %self.model,
            course = %constraints.course_name,
            semester = constraints.semester,
            "Requesting timetable candidates from Gemini"
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GeneratorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Parse(format!("Failed to parse Gemini response: {}", e)))?;

        let text = reply.first_text().ok_or_else(|| {
            GeneratorError::Parse("Gemini response contained no text part".to_string())
        })?;

        let candidates = parse_generated_payload(text)?;
        tracing::info!(
            model = %self.model,
            candidates = candidates.len(),
            "Received timetable candidates"
        );
        Ok(candidates)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.text.as_deref())
    }
}

/// Structured reply as requested by [`response_schema`]
#[derive(Debug, Deserialize)]
struct GeneratedPayload {
    timetables: Vec<GeneratedTimetable>,
}

#[derive(Debug, Deserialize)]
struct GeneratedTimetable {
    // NUMBER in the schema, so it may arrive as 1.0
    option: f64,
    reasoning: String,
    schedule: Vec<TimetableEntry>,
}

/// Instruction text sent to the model
pub fn build_prompt(constraints: &TimetableConstraints) -> String {
    format!(
        "You are an academic timetable planner. Produce three distinct weekly timetables \
         with no conflicts for the constraints below.\n\
         \n\
         Constraints:\n\
         - Course: {}\n\
         - Semester: {}\n\
         - Subjects to schedule: {}\n\
         - Available faculty: {}\n\
         - Available classrooms: {}\n\
         - Available time slots: {}\n\
         - Schedule every subject at least once per week.\n\
         - No faculty member and no classroom may be booked twice in the same day and time slot.\n\
         - Spread the daily workload evenly and avoid placing demanding subjects back-to-back.\n\
         - Rank the timetables from best (1) to worst (3) and give a short reasoning for each.\n\
         - Use only the names listed above, spelled exactly as given.\n\
         - Reply with a JSON object matching the response schema.",
        constraints.course_name,
        constraints.semester,
        constraints.subjects.join(", "),
        constraints.faculties.join(", "),
        constraints.classrooms.join(", "),
        constraints.time_slots.join(", "),
    )
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "timetables": {
                "type": "ARRAY",
                "description": "Three distinct, ranked timetable options.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "option": { "type": "NUMBER", "description": "Rank of this option (1, 2 or 3)." },
                        "reasoning": { "type": "STRING", "description": "Why this timetable is a good option." },
                        "schedule": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "day": { "type": "STRING", "description": "Day of the week, e.g. 'Monday'." },
                                    "time": { "type": "STRING", "description": "Time slot, e.g. '09:00 - 10:00'." },
                                    "subject": { "type": "STRING" },
                                    "faculty": { "type": "STRING" },
                                    "classroom": { "type": "STRING" }
                                },
                                "required": ["day", "time", "subject", "faculty", "classroom"]
                            }
                        }
                    },
                    "required": ["option", "reasoning", "schedule"]
                }
            }
        },
        "required": ["timetables"]
    })
}

/// Decode the model's JSON text into candidates
///
/// Options must be positive whole numbers; anything else is `InvalidPayload`.
pub fn parse_generated_payload(text: &str) -> Result<Vec<Timetable>, GeneratorError> {
    let payload: GeneratedPayload = serde_json::from_str(text)
        .map_err(|e| GeneratorError::Parse(format!("Invalid timetable JSON: {}", e)))?;

    payload
        .timetables
        .into_iter()
        .map(|t| {
            if !(t.option.is_finite() && t.option >= 1.0 && t.option.fract() == 0.0 && t.option <= u32::MAX as f64) {
                return Err(GeneratorError::InvalidPayload(format!(
                    "option rank {} is not a positive integer",
                    t.option
                )));
            }
            Ok(Timetable {
                option: t.option as u32,
                schedule: t.schedule,
                reasoning: t.reasoning,
            })
        })
        .collect()
}
