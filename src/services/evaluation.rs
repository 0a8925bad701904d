use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Map, Value};

use crate::core::config::{AiSettings, Settings};
use crate::db::types::{DifficultyLevel, JudgementStatus, Reaction};

pub(crate) const MAX_SCORE: f64 = 10.0;
pub(crate) const FAILED_MISSING_CONCEPT: &str = "Evaluation failed";

const DEFAULT_FEEDBACK: &str = "No feedback was provided for this answer.";
const DEFAULT_DELIVERY_FEEDBACK: &str = "No delivery feedback was provided for this answer.";
const FAILED_FEEDBACK: &str =
    "We could not evaluate this answer right now. Please try evaluating it again.";
const FAILED_DELIVERY_FEEDBACK: &str = "Delivery could not be assessed.";

const SCORING_SYSTEM_PROMPT: &str = r#"You are a senior engineer interviewing a candidate.
The candidate explained a technical topic out loud or in writing. Score the explanation.

Scoring (each score is a number from 0 to 10):
- clarity: structure, plain language, easy to follow
- correctness: technical accuracy, no wrong statements
- depth: covers internals, trade-offs and edge cases appropriate to the difficulty
- delivery: pace, fluency and confidence; use the voice metrics when given,
  otherwise judge the written flow

Respond with strict JSON only, no prose and no markdown fences:
{
  "clarity": <number>,
  "correctness": <number>,
  "depth": <number>,
  "delivery": <number>,
  "missingConcepts": ["concept the answer should have mentioned"],
  "reaction": "impressed" | "satisfied" | "neutral" | "confused" | "concerned",
  "feedback": "two or three sentences addressed to the candidate",
  "improvementSuggestions": ["concrete next step"],
  "deliveryFeedback": "one or two sentences about delivery"
}
"#;

/// Client-measured speech signals for a voice answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct VoiceSignals {
    pub(crate) wpm: f64,
    pub(crate) filler_words: i32,
    pub(crate) long_pauses: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct EvaluationRequest<'a> {
    pub(crate) answer_id: &'a str,
    pub(crate) answer_text: &'a str,
    pub(crate) skill_name: &'a str,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) voice: Option<VoiceSignals>,
}

/// Normalized scoring payload. Every field is always populated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Assessment {
    pub(crate) clarity: f64,
    pub(crate) correctness: f64,
    pub(crate) depth: f64,
    pub(crate) delivery: f64,
    pub(crate) missing_concepts: Vec<String>,
    pub(crate) reaction: Reaction,
    pub(crate) feedback: String,
    pub(crate) improvement_suggestions: Vec<String>,
    pub(crate) delivery_feedback: String,
}

impl Assessment {
    /// The all-zero payload stored when the provider could not be reached.
    pub(crate) fn failed() -> Self {
        Self {
            clarity: 0.0,
            correctness: 0.0,
            depth: 0.0,
            delivery: 0.0,
            missing_concepts: vec![FAILED_MISSING_CONCEPT.to_string()],
            reaction: Reaction::Neutral,
            feedback: FAILED_FEEDBACK.to_string(),
            improvement_suggestions: Vec::new(),
            delivery_feedback: FAILED_DELIVERY_FEEDBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EvaluationOutcome {
    Succeeded(Assessment),
    Failed { assessment: Assessment, error: String },
}

impl EvaluationOutcome {
    fn failed(error: impl std::fmt::Display) -> Self {
        Self::Failed { assessment: Assessment::failed(), error: format!("{error:#}") }
    }

    pub(crate) fn status(&self) -> JudgementStatus {
        match self {
            EvaluationOutcome::Succeeded(_) => JudgementStatus::Succeeded,
            EvaluationOutcome::Failed { .. } => JudgementStatus::Failed,
        }
    }

    pub(crate) fn assessment(&self) -> &Assessment {
        match self {
            EvaluationOutcome::Succeeded(assessment) => assessment,
            EvaluationOutcome::Failed { assessment, .. } => assessment,
        }
    }

    pub(crate) fn error(&self) -> Option<&str> {
        match self {
            EvaluationOutcome::Succeeded(_) => None,
            EvaluationOutcome::Failed { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EvaluationClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    max_retries: u32,
}

impl EvaluationClient {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.ai())
    }

    pub(crate) fn new(ai: &AiSettings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(ai.ai_request_timeout))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: ai.openai_api_key.clone(),
            base_url: ai.openai_base_url.trim_end_matches('/').to_string(),
            model: ai.ai_model.clone(),
            max_tokens: ai.ai_max_tokens,
            temperature: ai.ai_temperature,
            max_retries: ai.ai_max_retries,
        })
    }

    pub(crate) fn model(&self) -> &str {
        &self.model
    }

    /// Scores one answer. Provider failures are folded into
    /// [`EvaluationOutcome::Failed`]; this never returns an error.
    pub(crate) async fn evaluate(&self, request: &EvaluationRequest<'_>) -> EvaluationOutcome {
        let timer = Instant::now();
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SCORING_SYSTEM_PROMPT},
                {"role": "user", "content": build_user_prompt(request)}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(
            answer_id = %request.answer_id,
            skill = %request.skill_name,
            model = %self.model,
            "Sending evaluation request"
        );

        let outcome = match self.request_completion(&payload).await {
            Ok(content) => EvaluationOutcome::Succeeded(normalize_assessment(
                &extract_json_object(&content),
            )),
            Err(err) => {
                tracing::error!(
                    answer_id = %request.answer_id,
                    error = %format!("{err:#}"),
                    "Evaluation failed"
                );
                EvaluationOutcome::failed(err)
            }
        };

        let elapsed = timer.elapsed().as_secs_f64();
        let status = outcome.status().as_str();
        metrics::counter!("evaluations_total", "status" => status).increment(1);
        metrics::histogram!("evaluation_duration_seconds", "status" => status).record(elapsed);

        tracing::info!(
            answer_id = %request.answer_id,
            status,
            duration_seconds = elapsed,
            "Evaluation completed"
        );

        outcome
    }

    async fn request_completion(&self, payload: &Value) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = retry_backoff(attempt);
                tracing::warn!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "Retrying evaluation request"
                );
                tokio::time::sleep(backoff).await;
            }

            let response =
                match self.client.post(&url).bearer_auth(&self.api_key).json(payload).send().await
                {
                    Ok(response) => response,
                    Err(err) => {
                        last_error =
                            Some(anyhow::anyhow!(err).context("Failed to call evaluation provider"));
                        continue;
                    }
                };

            let status = response.status();
            let body: Value = response.json().await.unwrap_or(Value::Null);
            if status.is_success() {
                return completion_content(&body);
            }

            last_error = Some(anyhow::anyhow!("Evaluation provider returned {status}: {body}"));
            if !is_retryable(status) {
                break;
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Evaluation provider was not called")))
    }
}

const RETRY_BASE_MS: u64 = 500;
const RETRY_MAX_MS: u64 = 30_000;

/// Exponential delay before retry `attempt` (1-based), capped at 30s.
fn retry_backoff(attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(RETRY_BASE_MS.saturating_mul(factor).min(RETRY_MAX_MS))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn completion_content(body: &Value) -> Result<String> {
    body.get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .context("Missing evaluation response content")
}

fn build_user_prompt(request: &EvaluationRequest<'_>) -> String {
    let voice = match request.voice {
        Some(voice) => format!(
            "Voice metrics: {:.0} words per minute, {} filler words, {} long pauses.",
            voice.wpm, voice.filler_words, voice.long_pauses
        ),
        None => "Voice metrics: not available (typed answer).".to_string(),
    };

    format!(
        "Topic: {}\nDifficulty: {}\n{}\n\nCandidate answer:\n\"\"\"\n{}\n\"\"\"\n\nReturn the JSON object described in the instructions.",
        request.skill_name,
        request.difficulty.as_str(),
        voice,
        request.answer_text.trim()
    )
}

/// Parses model output into a JSON object: the whole text first, then the
/// span from the first `{` to the last `}`, then an empty object.
pub(crate) fn extract_json_object(content: &str) -> Map<String, Value> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(content.trim()) {
        return map;
    }

    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        return Map::new();
    };
    if end <= start {
        return Map::new();
    }

    match serde_json::from_str::<Value>(&content[start..=end]) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

/// Coerces a model-provided score into `[0, MAX_SCORE]`; anything that is not
/// a number (or a numeric string) scores 0.
pub(crate) fn clamp_score(value: &Value) -> f64 {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(number) if number.is_finite() => number.clamp(0.0, MAX_SCORE),
        _ => 0.0,
    }
}

fn field<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| raw.get(*key)).filter(|value| !value.is_null())
}

fn score_field(raw: &Map<String, Value>, key: &str) -> f64 {
    field(raw, &[key]).map(clamp_score).unwrap_or(0.0)
}

fn text_field(raw: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    field(raw, keys)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn list_field(raw: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    field(raw, keys)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn normalize_assessment(raw: &Map<String, Value>) -> Assessment {
    let reaction = field(raw, &["reaction"])
        .and_then(Value::as_str)
        .map(Reaction::parse_lenient)
        .unwrap_or_default();

    Assessment {
        clarity: score_field(raw, "clarity"),
        correctness: score_field(raw, "correctness"),
        depth: score_field(raw, "depth"),
        delivery: score_field(raw, "delivery"),
        missing_concepts: list_field(raw, &["missingConcepts", "missing_concepts"]),
        reaction,
        feedback: text_field(raw, &["feedback"], DEFAULT_FEEDBACK),
        improvement_suggestions: list_field(
            raw,
            &["improvementSuggestions", "improvement_suggestions"],
        ),
        delivery_feedback: text_field(
            raw,
            &["deliveryFeedback", "delivery_feedback"],
            DEFAULT_DELIVERY_FEEDBACK,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockProvider, MockReply};

    fn ai_settings(base_url: &str) -> AiSettings {
        AiSettings {
            openai_api_key: "test-key".to_string(),
            openai_base_url: base_url.to_string(),
            ai_model: "test-model".to_string(),
            ai_max_tokens: 256,
            ai_temperature: 0.0,
            ai_request_timeout: 5,
            ai_max_retries: 0,
            pending_stale_seconds: 300,
        }
    }

    fn request(voice: Option<VoiceSignals>) -> EvaluationRequest<'static> {
        EvaluationRequest {
            answer_id: "answer-1",
            answer_text: "Redis keeps data in memory and persists with RDB snapshots or AOF.",
            skill_name: "Redis",
            difficulty: DifficultyLevel::Beginner,
            voice,
        }
    }

    #[test]
    fn retry_backoff_doubles_and_is_capped() {
        assert_eq!(retry_backoff(1), Duration::from_millis(500));
        assert_eq!(retry_backoff(2), Duration::from_millis(1_000));
        assert_eq!(retry_backoff(4), Duration::from_millis(4_000));
        assert_eq!(retry_backoff(7), Duration::from_millis(30_000));
        assert_eq!(retry_backoff(65), Duration::from_millis(30_000));
        assert_eq!(retry_backoff(u32::MAX), Duration::from_millis(30_000));
    }

    #[test]
    fn clamp_score_matches_documented_table() {
        assert_eq!(clamp_score(&json!(-5)), 0.0);
        assert_eq!(clamp_score(&json!("abc")), 0.0);
        assert_eq!(clamp_score(&json!(15)), 10.0);
        assert_eq!(clamp_score(&json!(7.5)), 7.5);
        assert_eq!(clamp_score(&Value::Null), 0.0);
    }

    #[test]
    fn clamp_score_accepts_numeric_strings_and_rejects_other_shapes() {
        assert_eq!(clamp_score(&json!(" 6 ")), 6.0);
        assert_eq!(clamp_score(&json!("11.5")), 10.0);
        assert_eq!(clamp_score(&json!(true)), 0.0);
        assert_eq!(clamp_score(&json!([5])), 0.0);
        assert_eq!(clamp_score(&json!({"score": 5})), 0.0);
    }

    #[test]
    fn extract_json_object_parses_plain_json() {
        let map = extract_json_object(r#"{"clarity": 8}"#);
        assert_eq!(map.get("clarity"), Some(&json!(8)));
    }

    #[test]
    fn extract_json_object_falls_back_to_braced_span() {
        let content = "Sure! Here is the result:\n```json\n{\"depth\": 4, \"nested\": {\"a\": 1}}\n```";
        let map = extract_json_object(content);
        assert_eq!(map.get("depth"), Some(&json!(4)));
        assert_eq!(map.get("nested"), Some(&json!({"a": 1})));
    }

    #[test]
    fn extract_json_object_gives_empty_object_for_garbage() {
        assert!(extract_json_object("I cannot score this answer.").is_empty());
        assert!(extract_json_object("} backwards {").is_empty());
        assert!(extract_json_object("{ not json at all }").is_empty());
        assert!(extract_json_object("[1, 2, 3]").is_empty());
    }

    #[test]
    fn normalize_assessment_defaults_missing_fields() {
        let assessment = normalize_assessment(&Map::new());
        assert_eq!(assessment.clarity, 0.0);
        assert_eq!(assessment.correctness, 0.0);
        assert_eq!(assessment.depth, 0.0);
        assert_eq!(assessment.delivery, 0.0);
        assert!(assessment.missing_concepts.is_empty());
        assert!(assessment.improvement_suggestions.is_empty());
        assert_eq!(assessment.reaction, Reaction::Neutral);
        assert_eq!(assessment.feedback, DEFAULT_FEEDBACK);
        assert_eq!(assessment.delivery_feedback, DEFAULT_DELIVERY_FEEDBACK);
    }

    #[test]
    fn normalize_assessment_clamps_and_accepts_aliases() {
        let raw = extract_json_object(
            r#"{
                "clarity": 12,
                "correctness": "7",
                "depth": -1,
                "delivery": 6.5,
                "missing_concepts": ["eviction policies", 3, "  "],
                "reaction": "Impressed",
                "feedback": "  Solid overview.  ",
                "improvementSuggestions": ["Mention AOF rewrite"],
                "delivery_feedback": ""
            }"#,
        );
        let assessment = normalize_assessment(&raw);
        assert_eq!(assessment.clarity, 10.0);
        assert_eq!(assessment.correctness, 7.0);
        assert_eq!(assessment.depth, 0.0);
        assert_eq!(assessment.delivery, 6.5);
        assert_eq!(assessment.missing_concepts, vec!["eviction policies".to_string()]);
        assert_eq!(assessment.reaction, Reaction::Impressed);
        assert_eq!(assessment.feedback, "Solid overview.");
        assert_eq!(assessment.improvement_suggestions, vec!["Mention AOF rewrite".to_string()]);
        assert_eq!(assessment.delivery_feedback, DEFAULT_DELIVERY_FEEDBACK);
    }

    #[test]
    fn unknown_reaction_becomes_neutral() {
        let raw = extract_json_object(r#"{"reaction": "ecstatic"}"#);
        assert_eq!(normalize_assessment(&raw).reaction, Reaction::Neutral);
    }

    #[test]
    fn user_prompt_mentions_topic_and_voice_metrics() {
        let prompt = build_user_prompt(&request(Some(VoiceSignals {
            wpm: 142.4,
            filler_words: 3,
            long_pauses: 1,
        })));
        assert!(prompt.contains("Topic: Redis"));
        assert!(prompt.contains("Difficulty: beginner"));
        assert!(prompt.contains("142 words per minute, 3 filler words, 1 long pauses"));

        let typed = build_user_prompt(&request(None));
        assert!(typed.contains("not available"));
    }

    #[tokio::test]
    async fn evaluate_returns_normalized_scores_from_provider() {
        let provider = MockProvider::spawn().await;
        provider.set_reply(MockReply::Content(
            json!({
                "clarity": 8,
                "correctness": 7,
                "depth": 6,
                "delivery": 5,
                "missingConcepts": ["replication"],
                "reaction": "satisfied",
                "feedback": "Good start.",
                "improvementSuggestions": ["Explain persistence trade-offs"],
                "deliveryFeedback": "Steady pace."
            })
            .to_string(),
        ));
        let client = EvaluationClient::new(&ai_settings(&provider.base_url)).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Succeeded);
        let assessment = outcome.assessment();
        assert_eq!(assessment.clarity, 8.0);
        assert_eq!(assessment.correctness, 7.0);
        assert_eq!(assessment.depth, 6.0);
        assert_eq!(assessment.delivery, 5.0);
        assert_eq!(assessment.reaction, Reaction::Satisfied);
        assert_eq!(assessment.missing_concepts, vec!["replication".to_string()]);

        let sent = provider.last_request().expect("provider called");
        assert_eq!(sent["model"], "test-model");
        assert_eq!(sent["response_format"]["type"], "json_object");
        let user_prompt = sent["messages"][1]["content"].as_str().expect("user prompt");
        assert!(user_prompt.contains("Topic: Redis"));
    }

    #[tokio::test]
    async fn evaluate_tolerates_unparseable_content() {
        let provider = MockProvider::spawn().await;
        provider.set_reply(MockReply::Content("Sorry, I can't help with that.".to_string()));
        let client = EvaluationClient::new(&ai_settings(&provider.base_url)).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Succeeded);
        assert_eq!(outcome.assessment(), &normalize_assessment(&Map::new()));
    }

    #[tokio::test]
    async fn evaluate_turns_provider_errors_into_failed_outcome() {
        let provider = MockProvider::spawn().await;
        provider.set_reply(MockReply::Status(503));
        let client = EvaluationClient::new(&ai_settings(&provider.base_url)).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Failed);
        assert_eq!(outcome.assessment(), &Assessment::failed());
        assert!(outcome.error().unwrap_or_default().contains("503"));
    }

    #[tokio::test]
    async fn evaluate_fails_when_content_is_missing() {
        let provider = MockProvider::spawn().await;
        provider.set_reply(MockReply::Raw(json!({"choices": []})));
        let client = EvaluationClient::new(&ai_settings(&provider.base_url)).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Failed);
        assert_eq!(outcome.assessment().missing_concepts, vec![FAILED_MISSING_CONCEPT.to_string()]);
    }

    #[tokio::test]
    async fn evaluate_retries_server_errors() {
        let provider = MockProvider::spawn().await;
        provider.set_reply(MockReply::Status(500));
        let mut settings = ai_settings(&provider.base_url);
        settings.ai_max_retries = 1;
        let client = EvaluationClient::new(&settings).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Failed);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn evaluate_does_not_retry_client_errors() {
        let provider = MockProvider::spawn().await;
        provider.set_reply(MockReply::Status(401));
        let mut settings = ai_settings(&provider.base_url);
        settings.ai_max_retries = 3;
        let client = EvaluationClient::new(&settings).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Failed);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn evaluate_fails_when_provider_is_unreachable() {
        let client = EvaluationClient::new(&ai_settings("http://127.0.0.1:1")).expect("client");

        let outcome = client.evaluate(&request(None)).await;

        assert_eq!(outcome.status(), JudgementStatus::Failed);
        assert!(outcome.error().is_some());
    }
}
