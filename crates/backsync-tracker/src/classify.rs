//! Record classification: category, priority, one-line summary.
//!
//! A deterministic keyword rule table is the baseline; a remote model
//! (Ollama, OpenAI, or Anthropic JSON endpoints) can refine it, and any
//! transport, status, or parse failure falls back to the rule table so
//! classification never fails a run.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use crate::error::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
    Anthropic,
}

impl Provider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().trim() {
            "ollama" => Some(Self::Ollama),
            "openai" => Some(Self::OpenAi),
            "anthropic" => Some(Self::Anthropic),
            _ => None,
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::Ollama => "llama3.2:3b",
            Self::OpenAi => "gpt-4o-mini",
            Self::Anthropic => "claude-3-haiku-20240307",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Self::Ollama => "http://localhost:11434",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Feature,
    Bug,
    Enhancement,
    Maintenance,
    Documentation,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Feature => "Feature",
            Self::Bug => "Bug",
            Self::Enhancement => "Enhancement",
            Self::Maintenance => "Maintenance",
            Self::Documentation => "Documentation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().trim() {
            "feature" => Some(Self::Feature),
            "bug" => Some(Self::Bug),
            "enhancement" => Some(Self::Enhancement),
            "maintenance" => Some(Self::Maintenance),
            "documentation" => Some(Self::Documentation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    P0,
    P1,
    P2,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().trim() {
            "P0" => Some(Self::P0),
            "P1" => Some(Self::P1),
            "P2" => Some(Self::P2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: Category,
    pub priority: Priority,
    pub summary: String,
    pub confidence: f64,
    pub reasoning: String,
}

/// Keyword rule table over title + body + labels.
pub fn rule_based(title: &str, body: &str, labels: &[String]) -> Classification {
    let mut text = format!("{title} {body}").to_lowercase();
    for label in labels {
        text.push(' ');
        text.push_str(&label.to_lowercase());
    }

    let category = if contains_any(&text, &["fix", "bug", "crash", "error", "broken"]) {
        Category::Bug
    } else if contains_any(&text, &["feature", "add", "new", "implement"]) {
        Category::Feature
    } else if contains_any(&text, &["improve", "refactor", "optimize", "enhance"]) {
        Category::Enhancement
    } else if contains_any(&text, &["doc", "readme", "comment"]) {
        Category::Documentation
    } else {
        Category::Maintenance
    };

    let priority = if contains_any(&text, &["urgent", "critical", "p0", "production", "hotfix"]) {
        Priority::P0
    } else if contains_any(&text, &["important", "high", "p1"]) {
        Priority::P1
    } else {
        Priority::P2
    };

    Classification {
        category,
        priority,
        summary: first_non_empty_line(title),
        confidence: 0.6,
        reasoning: "rule-based classification".to_string(),
    }
}

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| text.contains(needle))
}

fn first_non_empty_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .chars()
        .take(100)
        .collect()
}

/// Token-overlap similarity between two title+body pairs (Jaccard over
/// lowercase word sets).
pub fn similarity(title_a: &str, body_a: &str, title_b: &str, body_b: &str) -> f64 {
    let a = tokenize(&format!("{title_a} {body_a}"));
    let b = tokenize(&format!("{title_b} {body_b}"));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count();
    let union = a.union(&b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Find an existing record the candidate duplicates, if any.
///
/// Returns the ID of the first `(id, title, body)` entry whose similarity
/// meets `threshold`.
pub fn detect_duplicate(
    title: &str,
    body: &str,
    existing: &[(u64, String, String)],
    threshold: f64,
) -> Option<u64> {
    existing
        .iter()
        .find(|(_, other_title, other_body)| {
            similarity(title, body, other_title, other_body) >= threshold
        })
        .map(|(id, _, _)| *id)
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// Remote classifier
// ---------------------------------------------------------------------------

/// Classifier with an optional remote model behind the rule table.
#[derive(Debug, Clone)]
pub struct Classifier {
    provider: Provider,
    model: String,
    api_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl Classifier {
    pub fn new(
        provider: Provider,
        model: Option<String>,
        api_key: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            provider,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            api_key: api_key.unwrap_or_default(),
            base_url: base_url.unwrap_or_else(|| provider.default_base_url().to_string()),
            http,
        })
    }

    /// Classify a record; never fails. Remote errors of any kind fall
    /// back to the rule table.
    pub async fn classify(&self, title: &str, body: &str, labels: &[String]) -> Classification {
        let fallback = rule_based(title, body, labels);
        if self.provider != Provider::Ollama && self.api_key.trim().is_empty() {
            return fallback;
        }
        let prompt = build_prompt(title, body, labels);
        match self.call_provider(&prompt).await {
            Ok(response) => parse_response(&response, fallback),
            Err(_) => fallback,
        }
    }

    async fn call_provider(&self, prompt: &str) -> Result<String, TrackerError> {
        match self.provider {
            Provider::Ollama => {
                let url = format!("{}/api/generate", self.base_url);
                let payload = json!({
                    "model": self.model,
                    "prompt": prompt,
                    "stream": false,
                    "format": "json",
                });
                let data = self.post_json(&url, &[], payload).await?;
                Ok(data["response"].as_str().unwrap_or_default().to_string())
            }
            Provider::OpenAi => {
                let url = format!("{}/chat/completions", self.base_url);
                let auth = format!("Bearer {}", self.api_key);
                let payload = json!({
                    "model": self.model,
                    "messages": [{"role": "user", "content": prompt}],
                    "response_format": {"type": "json_object"},
                });
                let data = self
                    .post_json(&url, &[("Authorization", auth.as_str())], payload)
                    .await?;
                Ok(data["choices"][0]["message"]["content"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string())
            }
            Provider::Anthropic => {
                let url = format!("{}/messages", self.base_url);
                let payload = json!({
                    "model": self.model,
                    "max_tokens": 1024,
                    "messages": [{"role": "user", "content": prompt}],
                });
                let data = self
                    .post_json(
                        &url,
                        &[
                            ("x-api-key", self.api_key.as_str()),
                            ("anthropic-version", "2023-06-01"),
                        ],
                        payload,
                    )
                    .await?;
                Ok(data["content"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string())
            }
        }
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        payload: Value,
    ) -> Result<Value, TrackerError> {
        let mut request = self.http.post(url).json(&payload);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

fn build_prompt(title: &str, body: &str, labels: &[String]) -> String {
    let description: String = body.chars().take(500).collect();
    let labels_line = if labels.is_empty() {
        "none".to_string()
    } else {
        labels.join(", ")
    };
    format!(
        "Analyze this tracker item and classify it.\n\n\
         Title: {title}\n\n\
         Description:\n{description}\n\n\
         Labels: {labels_line}\n\n\
         Classify into:\n\
         1. Category: Feature, Bug, Enhancement, Maintenance, Documentation\n\
         2. Priority: P0 (critical/urgent), P1 (high impact), P2 (normal)\n\
         3. Summary: one-line summary (max 100 chars)\n\n\
         Respond in JSON with keys category, priority, summary, confidence, reasoning."
    )
}

/// Lenient parse of a model response; anything missing or malformed keeps
/// the fallback's value for that field.
fn parse_response(response: &str, fallback: Classification) -> Classification {
    let Ok(data) = serde_json::from_str::<Value>(response) else {
        return fallback;
    };
    let category = data["category"]
        .as_str()
        .and_then(Category::parse)
        .unwrap_or(fallback.category);
    let priority = data["priority"]
        .as_str()
        .and_then(Priority::parse)
        .unwrap_or(fallback.priority);
    let summary = data["summary"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback.summary);
    let confidence = data["confidence"].as_f64().unwrap_or(0.8);
    let reasoning = data["reasoning"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback.reasoning);
    Classification {
        category,
        priority,
        summary,
        confidence,
        reasoning,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
