//! AI-assisted category assignment for new ingredients
//!
//! Categorization is best effort: whatever goes wrong with the text
//! generation service, the ingredient still gets created and lands in the
//! catch-all [`FALLBACK_CATEGORY`].

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::models::Category;

pub const FALLBACK_CATEGORY: &str = "Other";

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Opaque text generation: a prompt in, text out.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

/// Blocking client for the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const MAX_TOKENS: u32 = 256;

    pub fn new(api_key: String, model: Option<String>) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("kitchen-planner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

impl TextGenerator for AnthropicClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: Self::MAX_TOKENS,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let res = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => {
                let body: MessagesResponse = res.json().map_err(map_reqwest_error)?;
                body.content
                    .into_iter()
                    .find_map(|block| match block {
                        ContentBlock::Text { text } => Some(text),
                        ContentBlock::Other => None,
                    })
                    .ok_or(GenerationError::EmptyResponse)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GenerationError::InvalidApiKey),
            StatusCode::TOO_MANY_REQUESTS => Err(GenerationError::RateLimited),
            s => Err(GenerationError::Http {
                status: s.as_u16(),
                body: res.text().unwrap_or_default(),
            }),
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(e.to_string())
    }
}

/// Where a new ingredient should be filed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice {
    Existing(i64),
    New(String),
    Fallback,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CategoryAnswer {
    category_id: Option<i64>,
    new_category: Option<String>,
}

pub fn build_category_prompt(ingredient_name: &str, categories: &[Category]) -> String {
    let mut prompt = format!(
        "You sort kitchen ingredients into shopping-list categories.\n\
         Ingredient: \"{ingredient_name}\"\n\n"
    );

    if categories.is_empty() {
        prompt.push_str("There are no categories yet.\n");
    } else {
        prompt.push_str("Existing categories (id: name):\n");
        for category in categories {
            prompt.push_str(&format!("{}: {}\n", category.id, category.name));
        }
    }

    prompt.push_str(
        "\nReuse an existing category whenever one fits. Reply with JSON only, either\n\
         {\"categoryId\": <id>} or {\"newCategory\": \"<short category name>\"}.",
    );
    prompt
}

/// Interpret a model answer. Ids outside `categories` are rejected; a new
/// name matching an existing category reuses it.
pub fn parse_category_answer(text: &str, categories: &[Category]) -> Option<CategoryChoice> {
    let answer: CategoryAnswer = serde_json::from_str(extract_json(text)).ok()?;

    if let Some(id) = answer.category_id {
        return categories
            .iter()
            .any(|c| c.id == id)
            .then_some(CategoryChoice::Existing(id));
    }

    let name = answer.new_category?.trim().to_string();
    if name.is_empty() {
        return None;
    }
    match categories.iter().find(|c| c.name.eq_ignore_ascii_case(&name)) {
        Some(existing) => Some(CategoryChoice::Existing(existing.id)),
        None => Some(CategoryChoice::New(name)),
    }
}

/// Extract JSON from a string that might contain markdown code blocks
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```") {
        let after_fence = start + 3;
        // Skip past any language identifier on the same line
        let content_start = text[after_fence..]
            .find('\n')
            .map(|i| after_fence + i + 1)
            .unwrap_or(after_fence);
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}

/// Picks categories for new ingredients, falling back on any failure.
pub struct Categorizer {
    generator: Option<Box<dyn TextGenerator>>,
}

impl Categorizer {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Categorizer that always files into the fallback category
    pub fn disabled() -> Self {
        Self { generator: None }
    }

    pub fn categorize(&self, ingredient_name: &str, categories: &[Category]) -> CategoryChoice {
        let Some(generator) = &self.generator else {
            debug!(ingredient = ingredient_name, "categorization disabled");
            return CategoryChoice::Fallback;
        };

        let prompt = build_category_prompt(ingredient_name, categories);
        match generator.generate(&prompt) {
            Ok(text) => parse_category_answer(&text, categories).unwrap_or_else(|| {
                warn!(
                    ingredient = ingredient_name,
                    response_preview = %text.chars().take(200).collect::<String>(),
                    "unusable categorization answer, using fallback"
                );
                CategoryChoice::Fallback
            }),
            Err(e) => {
                warn!(ingredient = ingredient_name, error = %e, "categorization failed, using fallback");
                CategoryChoice::Fallback
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct Canned(pub Result<String, GenerationError>);

    impl TextGenerator for Canned {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.0.clone()
        }
    }

    fn categories() -> Vec<Category> {
        vec![
            Category {
                id: 1,
                user_id: "u".to_string(),
                name: "Dairy".to_string(),
            },
            Category {
                id: 2,
                user_id: "u".to_string(),
                name: "Spices".to_string(),
            },
        ]
    }

    #[test]
    fn test_prompt_lists_categories() {
        let prompt = build_category_prompt("Cumin", &categories());
        assert!(prompt.contains("\"Cumin\""));
        assert!(prompt.contains("1: Dairy"));
        assert!(prompt.contains("2: Spices"));
    }

    #[test]
    fn test_parse_existing_id() {
        let choice = parse_category_answer(r#"{"categoryId": 2}"#, &categories());
        assert_eq!(choice, Some(CategoryChoice::Existing(2)));
    }

    #[test]
    fn test_parse_rejects_unknown_id() {
        assert_eq!(parse_category_answer(r#"{"categoryId": 9}"#, &categories()), None);
    }

    #[test]
    fn test_parse_new_category_in_code_block() {
        let text = "Sure:\n```json\n{\"newCategory\": \"Bakery\"}\n```";
        let choice = parse_category_answer(text, &categories());
        assert_eq!(choice, Some(CategoryChoice::New("Bakery".to_string())));
    }

    #[test]
    fn test_parse_new_name_matching_existing() {
        let choice = parse_category_answer(r#"{"newCategory": "dairy"}"#, &categories());
        assert_eq!(choice, Some(CategoryChoice::Existing(1)));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_category_answer("I think spices?", &categories()), None);
        assert_eq!(parse_category_answer(r#"{"newCategory": "  "}"#, &categories()), None);
        assert_eq!(parse_category_answer("{}", &categories()), None);
    }

    #[test]
    fn test_categorize_uses_answer() {
        let categorizer = Categorizer::new(Box::new(Canned(Ok(r#"{"categoryId": 1}"#.to_string()))));
        assert_eq!(categorizer.categorize("Milk", &categories()), CategoryChoice::Existing(1));
    }

    #[test]
    fn test_categorize_falls_back_on_errors() {
        for error in [
            GenerationError::MissingApiKey,
            GenerationError::InvalidApiKey,
            GenerationError::Timeout,
            GenerationError::Http {
                status: 500,
                body: "oops".to_string(),
            },
        ] {
            let categorizer = Categorizer::new(Box::new(Canned(Err(error))));
            assert_eq!(categorizer.categorize("Milk", &categories()), CategoryChoice::Fallback);
        }
        assert_eq!(
            Categorizer::disabled().categorize("Milk", &categories()),
            CategoryChoice::Fallback
        );
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        assert!(matches!(
            AnthropicClient::new("  ".to_string(), None),
            Err(GenerationError::MissingApiKey)
        ));
    }
}
