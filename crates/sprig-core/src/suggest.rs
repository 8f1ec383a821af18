use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth error: {message}")]
    Auth { message: String },

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed suggestion response: {message}")]
    Malformed { message: String },
}

#[derive(Debug, Clone)]
pub struct PlantPhoto {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone)]
pub struct SuggestionRequest {
    pub plant_name: String,
    pub plant_kind: String,
    pub plant_description: String,
    pub plant_photo: PlantPhoto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub care_schedule: String,
    pub additional_resources: String,
}

pub trait SuggestionProvider {
    fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionResponse, SuggestError>;
}

#[derive(Debug)]
pub struct GeminiSuggester {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiSuggester {
    pub fn new(base_url: String, model: String, api_key: String) -> Result<Self, SuggestError> {
        if api_key.trim().is_empty() {
            return Err(SuggestError::Auth {
                message: "no API key; set GEMINI_API_KEY or suggest.key".to_string(),
            });
        }

        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            client,
            base_url,
            model,
            api_key,
        })
    }
}

impl SuggestionProvider for GeminiSuggester {
    #[tracing::instrument(skip_all, fields(plant = %request.plant_name, model = %self.model))]
    fn suggest(&self, request: &SuggestionRequest) -> Result<SuggestionResponse, SuggestError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let body = build_request_body(request);

        debug!("requesting care suggestion");
        let response = self.client.post(&url).json(&body).send()?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(SuggestError::Auth {
                message: format!("request rejected with status {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(SuggestError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response.json()?;
        parse_response_body(&payload)
    }
}

fn build_prompt(request: &SuggestionRequest) -> String {
    format!(
        "You are an expert in plant care, providing optimal care schedules based on plant \
         descriptions and images.\n\nConsider the plant's type, description, and appearance to \
         suggest a comprehensive care schedule, including watering frequency, fertilization, \
         pruning, and sunlight requirements.\n\nProvide general care information, acknowledging \
         that individual factors like specific soil compositions or fertilizer brands may \
         significantly alter appropriate routines. Include links to additional sources on \
         specialized subjects.\n\nPlant Name: {}\nPlant Type: {}\nDescription: {}",
        request.plant_name, request.plant_kind, request.plant_description
    )
}

fn build_request_body(request: &SuggestionRequest) -> serde_json::Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": build_prompt(request) },
                {
                    "inlineData": {
                        "mimeType": request.plant_photo.mime_type,
                        "data": request.plant_photo.data,
                    }
                },
            ],
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "careSchedule": {
                        "type": "STRING",
                        "description": "The suggested care schedule for the plant.",
                    },
                    "additionalResources": {
                        "type": "STRING",
                        "description": "Links to additional resources for specialized subjects.",
                    },
                },
                "required": ["careSchedule", "additionalResources"],
            },
        },
    })
}

fn parse_response_body(payload: &serde_json::Value) -> Result<SuggestionResponse, SuggestError> {
    let text = payload["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| SuggestError::Malformed {
            message: "response has no candidate text".to_string(),
        })?;

    serde_json::from_str(text).map_err(|err| SuggestError::Malformed {
        message: format!("candidate text is not a care suggestion: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        GeminiSuggester, PlantPhoto, SuggestError, SuggestionRequest, build_request_body,
        parse_response_body,
    };

    fn request() -> SuggestionRequest {
        SuggestionRequest {
            plant_name: "Monstera Deliciosa".to_string(),
            plant_kind: "Tropical".to_string(),
            plant_description: "Split leaves, bright indirect light.".to_string(),
            plant_photo: PlantPhoto {
                mime_type: "image/jpeg".to_string(),
                data: "aGVsbG8=".to_string(),
            },
        }
    }

    #[test]
    fn request_body_carries_prompt_and_photo() {
        let body = build_request_body(&request());

        let parts = &body["contents"][0]["parts"];
        let text = parts[0]["text"].as_str().expect("prompt text");
        assert!(text.contains("Plant Name: Monstera Deliciosa"));
        assert!(text.contains("Plant Type: Tropical"));
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "aGVsbG8=");

        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(
            config["responseSchema"]["required"],
            json!(["careSchedule", "additionalResources"])
        );
    }

    #[test]
    fn parses_structured_candidate_text() {
        let payload = json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "text": "{\"careSchedule\":\"Water weekly.\",\"additionalResources\":\"https://example.com\"}"
                    }]
                }
            }]
        });

        let response = parse_response_body(&payload).expect("parse response");
        assert_eq!(response.care_schedule, "Water weekly.");
        assert_eq!(response.additional_resources, "https://example.com");
    }

    #[test]
    fn rejects_response_without_candidates() {
        let payload = json!({ "candidates": [] });
        let err = parse_response_body(&payload).expect_err("no candidates must fail");
        assert!(matches!(err, SuggestError::Malformed { .. }));
    }

    #[test]
    fn rejects_candidate_text_that_is_not_json() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "water it sometimes" }] }
            }]
        });
        let err = parse_response_body(&payload).expect_err("plain text must fail");
        assert!(matches!(err, SuggestError::Malformed { .. }));
    }

    #[test]
    fn refuses_to_build_without_api_key() {
        let err = GeminiSuggester::new(
            super::DEFAULT_BASE_URL.to_string(),
            super::DEFAULT_MODEL.to_string(),
            String::new(),
        )
        .expect_err("empty key must fail");
        assert!(matches!(err, SuggestError::Auth { .. }));
    }
}
