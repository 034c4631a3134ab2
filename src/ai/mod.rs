//! Stateless adapter over the Gemini `generateContent` endpoint. One upstream
//! call per invocation, bounded by a request timeout; no retry or streaming.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::AiConfig;
use crate::domain::Listing;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI feature is not configured.")]
    Unconfigured,

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned no text")]
    EmptyResponse,

    #[error("upstream returned invalid JSON: {0}")]
    BadJson(#[from] serde_json::Error),
}

impl AiError {
    /// Collapse into the generic 500 the client sees. The missing-key case
    /// keeps its specific message; everything else is logged and hidden.
    pub fn into_api(self, generic: &str) -> ApiError {
        match self {
            AiError::Unconfigured => ApiError::internal("AI feature is not configured."),
            other => {
                tracing::error!("AI upstream error: {}", other);
                ApiError::internal(generic)
            }
        }
    }
}

// --- Gemini wire format ---

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

// --- Request/response payloads of the three features ---

/// Structured listing fields the description writer works from. All optional;
/// missing values are prompted as "Not specified".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionFields {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub property_type: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub sqft: Option<f64>,
}

/// Partial filter set extracted from a natural-language query. Fields the
/// user did not mention stay `None` and are omitted from the response.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFilters {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pet_friendly: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub furnished: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

pub struct AiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<String, AiError> {
        let key = self.api_key.as_deref().ok_or(AiError::Unconfigured)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or(AiError::EmptyResponse)?;
        Ok(text)
    }

    /// One-shot prompt completion producing listing copy.
    pub async fn generate_description(&self, fields: &DescriptionFields) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![user_content(description_prompt(fields))],
            system_instruction: None,
            generation_config: None,
        };
        self.generate(&request).await
    }

    /// Structured JSON completion: natural language in, partial filter set out.
    pub async fn extract_filters(&self, query: &str) -> Result<ExtractedFilters, AiError> {
        let request = GenerateRequest {
            contents: vec![user_content(nl_search_prompt(query))],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        };
        let text = self.generate(&request).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// One chat turn. The caller carries the history forward; the newest
    /// published listings ride along as a system-level instruction.
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        context: &[Listing],
    ) -> Result<String, AiError> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Some(if turn.role == "assistant" { "model" } else { "user" }.to_string()),
                parts: vec![Part {
                    text: turn.content.clone(),
                }],
            })
            .collect();
        contents.push(user_content(message.to_string()));

        let request = GenerateRequest {
            contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: chat_instruction(context),
                }],
            }),
            generation_config: None,
        };
        self.generate(&request).await
    }
}

fn user_content(text: String) -> Content {
    Content {
        role: Some("user".to_string()),
        parts: vec![Part { text }],
    }
}

fn or_unspecified<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Not specified".to_string())
}

fn description_prompt(fields: &DescriptionFields) -> String {
    format!(
        "You are an expert real estate copywriter. Write a highly engaging, professional, \
         and SEO-friendly property description for the following listing. Highlight the best \
         features and create excitement. Keep it under 200 words.\n\n\
         Property Details:\n\
         - Title: {}\n\
         - Type: {} for {}\n\
         - Location: {}, {}\n\
         - Price: ${}\n\
         - Bedrooms: {}\n\
         - Bathrooms: {}\n\
         - Square Feet: {}\n\n\
         Format the output as plain text with line breaks for readability. \
         Do not include markdown formatting like ** or ##.",
        or_unspecified(&fields.title),
        fields.property_type.as_deref().unwrap_or("Property"),
        fields.kind.as_deref().unwrap_or("sale"),
        or_unspecified(&fields.address),
        or_unspecified(&fields.city),
        or_unspecified(&fields.price),
        or_unspecified(&fields.bedrooms),
        or_unspecified(&fields.bathrooms),
        or_unspecified(&fields.sqft),
    )
}

fn nl_search_prompt(query: &str) -> String {
    format!(
        "You are a real estate search assistant. Extract search filters from the user's \
         natural language query and return ONLY a valid JSON object.\n\n\
         Possible fields to extract:\n\
         - \"type\": either \"sale\" or \"rent\"\n\
         - \"propertyType\": \"apartment\", \"house\", \"villa\", \"condo\", \"townhouse\", \"land\", or \"commercial\"\n\
         - \"city\": string name of the city\n\
         - \"minPrice\": number\n\
         - \"maxPrice\": number\n\
         - \"bedrooms\": number\n\
         - \"petFriendly\": boolean\n\
         - \"furnished\": \"unfurnished\", \"semi-furnished\", or \"fully-furnished\"\n\n\
         If a field is not mentioned in the query, DO NOT include it in the JSON. \
         Extract prices accurately (e.g., \"$1.5M\" -> 1500000).\n\n\
         User Query: \"{}\"",
        query
    )
}

fn chat_instruction(context: &[Listing]) -> String {
    let context_lines: Vec<String> = context
        .iter()
        .map(|l| {
            format!(
                "- {} ({} for {} in {}): ${}, {} beds, {} baths",
                l.title,
                l.property_type.as_str(),
                l.kind.as_str(),
                l.city,
                l.price,
                l.bedrooms,
                l.bathrooms
            )
        })
        .collect();
    format!(
        "You are a helpful and polite Real Estate AI Assistant for RealEstate Connect.\n\
         Use the following context of our newest property listings to help answer user \
         questions. If they ask about properties we have, suggest from this list. If the \
         user asks something completely unrelated to real estate, politely steer the \
         conversation back.\n\n\
         Current Recent Listings Context:\n{}",
        context_lines.join("\n")
    )
}
