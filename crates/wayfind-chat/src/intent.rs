//! Intent extraction: free text to a structured place query.
//!
//! The model is asked for a single-line JSON object, but nothing forces it
//! to comply. The reply is scanned for the first brace-delimited span and
//! parsed leniently; anything that does not yield a usable `search_query`
//! is reported as "no intent" rather than as an error.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::IntentError;
use crate::llm::ModelClient;

/// First `{...}` span without nested braces.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]+\}").expect("Invalid JSON object regex"));

/// Few-shot examples embedded in the prompt: (user text, search query).
const EXAMPLES: &[(&str, &str)] = &[
    ("Find Italian restaurants", "Italian restaurants"),
    ("Where can I get coffee?", "coffee shops"),
    ("Best pizza places", "pizza restaurants"),
    ("Show me gyms nearby", "gyms"),
];

/// A structured place query extracted from user text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIntent {
    pub search_query: String,
    /// Intent label when the model supplied one (e.g. `find_place`).
    pub intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawIntent {
    search_query: Option<String>,
    intent: Option<String>,
}

/// Build the fixed instruction prompt around the verbatim user text.
pub fn build_prompt(user_text: &str) -> String {
    let mut prompt = format!(
        "You are a helpful location assistant. User asked: \"{}\".\n\n\
         Extract the search query for finding places. Respond with ONLY a JSON object in this exact format:\n\
         {{\"search_query\": \"the place type or name to search\", \"intent\": \"find_place\"}}\n\n\
         Examples:\n",
        user_text
    );
    for (asked, query) in EXAMPLES {
        prompt.push_str(&format!(
            "User: \"{}\" -> {{\"search_query\": \"{}\", \"intent\": \"find_place\"}}\n",
            asked, query
        ));
    }
    prompt.push_str("\nRespond with ONLY the JSON object, no other text.");
    prompt
}

/// Parse a raw model reply. `None` when no usable query is present.
pub fn parse_reply(reply: &str) -> Option<SearchIntent> {
    let candidate = JSON_OBJECT.find(reply)?;
    let raw: RawIntent = match serde_json::from_str(candidate.as_str()) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(error = %e, "Model reply is not valid JSON");
            return None;
        }
    };
    let search_query = raw.search_query?.trim().to_string();
    if search_query.is_empty() {
        return None;
    }
    Some(SearchIntent {
        search_query,
        intent: raw.intent.filter(|i| !i.trim().is_empty()),
    })
}

/// Sends user text to a [`ModelClient`] and parses the reply.
pub struct IntentExtractor<M> {
    model: M,
    budget: Duration,
}

impl<M: ModelClient> IntentExtractor<M> {
    /// Create an extractor whose model calls are bounded by `budget`.
    pub fn new(model: M, budget: Duration) -> Self {
        Self { model, budget }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Extract a search intent from `user_text`.
    ///
    /// `Ok(None)` means the model answered but not in the expected shape.
    pub async fn extract(&self, user_text: &str) -> Result<Option<SearchIntent>, IntentError> {
        let prompt = build_prompt(user_text);
        let reply = match tokio::time::timeout(self.budget, self.model.generate(&prompt)).await {
            Ok(reply) => reply.map_err(|e| match IntentError::from(e) {
                IntentError::Timeout(_) => IntentError::Timeout(self.budget),
                other => other,
            })?,
            Err(_) => {
                warn!(budget_secs = self.budget.as_secs(), "Model call exceeded budget");
                return Err(IntentError::Timeout(self.budget));
            }
        };

        let intent = parse_reply(&reply);
        match &intent {
            Some(i) => debug!(query = %i.search_query, "Intent extracted"),
            None => debug!(reply = %reply, "No intent in model reply"),
        }
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockModelClient;

    #[test]
    fn test_prompt_embeds_user_text_verbatim() {
        let prompt = build_prompt("find \"sushi\" near me");
        assert!(prompt.contains("User asked: \"find \"sushi\" near me\""));
        assert!(prompt.contains("\"search_query\""));
        assert!(prompt.contains("Where can I get coffee?"));
        assert!(prompt.ends_with("no other text."));
    }

    #[test]
    fn test_parse_clean_reply() {
        let intent = parse_reply(r#"{"search_query":"Italian restaurants"}"#).unwrap();
        assert_eq!(intent.search_query, "Italian restaurants");
        assert_eq!(intent.intent, None);
    }

    #[test]
    fn test_parse_reply_with_chatter() {
        let reply = "Sure! Here you go:\n{\"search_query\": \"coffee shops\", \"intent\": \"find_place\"}\nEnjoy.";
        let intent = parse_reply(reply).unwrap();
        assert_eq!(intent.search_query, "coffee shops");
        assert_eq!(intent.intent.as_deref(), Some("find_place"));
    }

    #[test]
    fn test_parse_takes_first_object() {
        let reply = r#"{"search_query":"gyms"} {"search_query":"pools"}"#;
        assert_eq!(parse_reply(reply).unwrap().search_query, "gyms");
    }

    #[test]
    fn test_parse_unparseable_returns_none() {
        assert!(parse_reply("I'm not sure what you mean.").is_none());
        assert!(parse_reply("{not json}").is_none());
        assert!(parse_reply(r#"{"query":"gyms"}"#).is_none());
        assert!(parse_reply(r#"{"search_query":"   "}"#).is_none());
        assert!(parse_reply(r#"{"search_query": 42}"#).is_none());
        assert!(parse_reply("").is_none());
    }

    #[test]
    fn test_parse_trims_query() {
        let intent = parse_reply(r#"{"search_query":"  bakeries "}"#).unwrap();
        assert_eq!(intent.search_query, "bakeries");
    }

    #[tokio::test]
    async fn test_extract_success() {
        let model = MockModelClient::replying(r#"{"search_query":"Italian restaurants"}"#);
        let extractor = IntentExtractor::new(model.clone(), Duration::from_secs(30));
        let intent = extractor.extract("Find Italian restaurants").await.unwrap();
        assert_eq!(intent.unwrap().search_query, "Italian restaurants");
        assert!(model.prompts()[0].contains("Find Italian restaurants"));
    }

    #[tokio::test]
    async fn test_extract_unparseable_is_none() {
        let extractor =
            IntentExtractor::new(MockModelClient::replying("asdf?"), Duration::from_secs(30));
        assert!(extractor.extract("asdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extract_unreachable() {
        let extractor =
            IntentExtractor::new(MockModelClient::unreachable(), Duration::from_secs(30));
        let err = extractor.extract("pizza").await.unwrap_err();
        assert!(matches!(err, IntentError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_extract_model_failure_is_generic() {
        let extractor = IntentExtractor::new(MockModelClient::failing(500), Duration::from_secs(30));
        let err = extractor.extract("pizza").await.unwrap_err();
        assert!(matches!(err, IntentError::Model(_)));
        assert!(!err.is_unreachable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_times_out_after_budget() {
        let model = MockModelClient::replying(r#"{"search_query":"x"}"#)
            .with_delay(Duration::from_secs(31));
        let extractor = IntentExtractor::new(model, Duration::from_secs(30));
        let err = extractor.extract("pizza").await.unwrap_err();
        assert!(matches!(err, IntentError::Timeout(d) if d == Duration::from_secs(30)));
    }
}
