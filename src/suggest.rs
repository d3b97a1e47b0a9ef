use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

const DEFAULT_PROMPT: &str = include_str!("default_prompts/suggest-bugs.md");

/// Number of bugs requested per suggestion round.
pub const SUGGESTION_COUNT: usize = 3;

/// An unconfirmed bug candidate returned by the generative service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestedBug {
    pub title: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Model abstraction (for testability)
// ---------------------------------------------------------------------------

/// A text-generation backend that honours a JSON response schema.
pub trait GenerativeModel {
    /// Send `prompt` with `schema` as the structured-output contract and return
    /// the raw response text.
    fn generate(&self, prompt: &str, schema: &serde_json::Value) -> Result<String>;
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String, model: String, timeout: Duration) -> Self {
        Self {
            api_key,
            api_base,
            model,
            timeout,
        }
    }

    /// Build a client from config, reading the credential from the environment.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = resolve_api_key(&config.api_key_env)?;
        Ok(Self::new(
            api_key,
            config.api_base.clone(),
            config.model.clone(),
            Duration::from_secs(config.request_timeout),
        ))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base.trim_end_matches('/'),
            self.model
        )
    }
}

fn resolve_api_key(api_key_env: &str) -> Result<String> {
    match std::env::var(api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::Configuration(format!(
            "{api_key_env} environment variable not set"
        ))),
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }
}

impl GenerativeModel for GeminiClient {
    fn generate(&self, prompt: &str, schema: &serde_json::Value) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        debug!(model = %self.model, "sending generateContent request");

        match agent
            .post(&self.endpoint())
            .set("x-goog-api-key", &self.api_key)
            .set("Content-Type", "application/json")
            .send_json(&body)
        {
            Ok(response) => {
                let parsed: GenerateContentResponse = response.into_json().map_err(|e| {
                    Error::SuggestionService(format!("failed to read Gemini response: {e}"))
                })?;
                parsed.text().ok_or_else(|| {
                    Error::SuggestionService("Gemini response contained no text".to_string())
                })
            }
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                Err(Error::SuggestionService(format!(
                    "Gemini returned HTTP {code}: {}",
                    detail.trim()
                )))
            }
            Err(e) => Err(Error::SuggestionService(format!(
                "Gemini request failed: {e}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Prompt and schema
// ---------------------------------------------------------------------------

/// Response schema in the Gemini OpenAPI subset: `{bugs: [{title, description}]}`.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "bugs": {
                "type": "ARRAY",
                "description": "A list of potential bugs found.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": {
                            "type": "STRING",
                            "description": "A concise title for the bug."
                        },
                        "description": {
                            "type": "STRING",
                            "description": "A one-sentence description of the bug."
                        }
                    },
                    "required": ["title", "description"]
                }
            }
        },
        "required": ["bugs"]
    })
}

#[derive(Serialize)]
struct PromptContext<'a> {
    url: &'a str,
    component: &'a str,
    count: usize,
}

/// Render the QA-analyst prompt for a site and component.
pub fn build_prompt(project_url: &str, component: &str) -> Result<String> {
    let engine = upon::Engine::new();
    let template = engine
        .compile(DEFAULT_PROMPT)
        .map_err(|e| Error::SuggestionService(format!("invalid prompt template: {e}")))?;
    template
        .render(
            &engine,
            PromptContext {
                url: project_url,
                component,
                count: SUGGESTION_COUNT,
            },
        )
        .to_string()
        .map_err(|e| Error::SuggestionService(format!("failed to render prompt: {e}")))
}

/// Reject blank component descriptions. Returns the trimmed text.
pub fn validate_component(component: &str) -> Result<&str> {
    let trimmed = component.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(
            "please enter a component name to analyze".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Parse the model's text into suggestions.
///
/// A top-level value without a `bugs` array yields no suggestions; text that is
/// not JSON, or entries missing `title`/`description`, is a service error.
pub fn parse_suggestions(raw: &str) -> Result<Vec<SuggestedBug>> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|e| {
        Error::SuggestionService(format!("failed to parse suggestion JSON: {e}"))
    })?;

    let Some(bugs) = value.get("bugs").and_then(|b| b.as_array()) else {
        return Ok(Vec::new());
    };

    bugs.iter()
        .map(|b| {
            serde_json::from_value::<SuggestedBug>(b.clone()).map_err(|e| {
                Error::SuggestionService(format!("malformed suggestion entry: {e}"))
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// SuggestionClient
// ---------------------------------------------------------------------------

/// One-shot bug suggestion round trip. No retry, no caching.
pub struct SuggestionClient {
    model: Box<dyn GenerativeModel + Send + Sync>,
}

impl SuggestionClient {
    pub fn new(model: Box<dyn GenerativeModel + Send + Sync>) -> Self {
        Self { model }
    }

    /// Client backed by Gemini. Fails with a configuration error when the
    /// credential is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(Box::new(GeminiClient::from_config(config)?)))
    }

    pub fn suggest_bugs(&self, project_url: &str, component: &str) -> Result<Vec<SuggestedBug>> {
        let component = validate_component(component)?;
        let prompt = build_prompt(project_url, component)?;

        info!(url = project_url, component, "requesting bug suggestions");
        let result = self
            .model
            .generate(&prompt, &response_schema())
            .and_then(|raw| parse_suggestions(&raw));

        match &result {
            Ok(suggestions) => info!(count = suggestions.len(), "suggestions received"),
            Err(e) => warn!(error = %e, "bug suggestion request failed"),
        }
        result
    }
}
