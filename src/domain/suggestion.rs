//! Next-step experiment suggestions: prompt construction and parsing of the
//! generator's reply.

use super::bias::BiasFlags;
use super::metrics::MetricsRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_SUGGESTIONS: usize = 3;

pub const FALLBACK_TITLE: &str = "Review backtest configuration";
pub const FALLBACK_RISK_NOTE: &str =
    "LLM output not structured as JSON; please interpret manually.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    pub risk_note: Option<String>,
}

/// What the suggestion step produced for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionStatus {
    /// No generator configured.
    Disabled,
    /// Reply parsed as a JSON list.
    Structured(Vec<Suggestion>),
    /// Reply was not a JSON list; the raw text is carried in one suggestion.
    Unstructured(Suggestion),
    /// Generator call failed.
    Unavailable { reason: String },
}

impl SuggestionStatus {
    pub fn suggestions(&self) -> &[Suggestion] {
        match self {
            SuggestionStatus::Structured(items) => items,
            SuggestionStatus::Unstructured(item) => std::slice::from_ref(item),
            SuggestionStatus::Disabled | SuggestionStatus::Unavailable { .. } => &[],
        }
    }

    pub fn warning(&self) -> Option<String> {
        match self {
            SuggestionStatus::Unstructured(_) => {
                Some("suggestions were not structured; showing raw generator output".to_string())
            }
            SuggestionStatus::Unavailable { reason } => {
                Some(format!("suggestions unavailable: {reason}"))
            }
            SuggestionStatus::Disabled | SuggestionStatus::Structured(_) => None,
        }
    }
}

pub fn build_prompt(metrics: &MetricsRecord, flags: &BiasFlags) -> String {
    let metrics_json = serde_json::to_string(metrics).unwrap_or_default();
    let flags_json = serde_json::to_string(flags).unwrap_or_default();

    format!(
        "You are a quantitative trading coach.

Backtest metrics:
{metrics_json}

Bias flags:
{flags_json}

Task:
1. Propose {MAX_SUGGESTIONS} concrete next-step experiments to run on this strategy.
2. For each experiment, provide:
   - title
   - description (what to change and why)
   - risk_note (explicit risk / bias warnings).
3. Be concise and practical.

Return ONLY JSON: a list of {MAX_SUGGESTIONS} objects with keys: title, description, risk_note.
"
    )
}

/// Parse the generator's raw reply.
///
/// A JSON array (optionally inside a Markdown code fence) becomes up to
/// [`MAX_SUGGESTIONS`] suggestions; anything else falls back to a single
/// suggestion carrying the raw text.
pub fn parse_suggestions(raw: &str) -> SuggestionStatus {
    match serde_json::from_str::<Value>(strip_code_fence(raw)) {
        Ok(Value::Array(items)) => SuggestionStatus::Structured(
            items
                .iter()
                .take(MAX_SUGGESTIONS)
                .map(suggestion_from_value)
                .collect(),
        ),
        _ => SuggestionStatus::Unstructured(Suggestion {
            title: FALLBACK_TITLE.to_string(),
            description: raw.to_string(),
            risk_note: Some(FALLBACK_RISK_NOTE.to_string()),
        }),
    }
}

fn suggestion_from_value(value: &Value) -> Suggestion {
    let field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    Suggestion {
        title: field("title").unwrap_or_else(|| "Untitled".to_string()),
        description: field("description").unwrap_or_default(),
        risk_note: field("risk_note"),
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.strip_prefix("json").unwrap_or(rest);
    body.strip_suffix("```").unwrap_or(body).trim()
}
