use crate::config::AssistantSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AssistantError {
    #[error("missing assistant api key; set the `{env}` environment variable")]
    MissingApiKey { env: String },
    #[error("assistant request failed: {0}")]
    Request(String),
    #[error("assistant returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Boundary to the external generative collaborator. Implementations may
/// fail; graceful degradation is the orchestrator's job, not theirs.
pub trait Assistant {
    fn get_response(
        &self,
        conversation_key: &str,
        message: &str,
        context: Option<&str>,
    ) -> Result<String, AssistantError>;
}

const SYSTEM_PROMPT: &str = "You are a project management assistant with direct access to project \
data. When project information is available in the context, use it to give specific answers about \
the project's details, tasks, and status rather than instructions on where to look.";

const NO_CONTEXT_NOTE: &str = "No specific project context available.";

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatCompletionMessage<'a>>,
    user: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Assistant over an OpenAI-style chat completions endpoint.
pub struct OpenAiAssistant {
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiAssistant {
    pub fn from_settings(settings: &AssistantSettings) -> Result<Self, AssistantError> {
        let api_key =
            std::env::var(&settings.api_key_env).map_err(|_| AssistantError::MissingApiKey {
                env: settings.api_key_env.clone(),
            })?;
        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }

    fn build_request<'a>(
        &'a self,
        conversation_key: &'a str,
        message: &str,
        context: Option<&str>,
    ) -> ChatCompletionRequest<'a> {
        let system = format!(
            "{SYSTEM_PROMPT}\n\nCurrent project context:\n{}",
            context.unwrap_or(NO_CONTEXT_NOTE)
        );
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatCompletionMessage {
                    role: "system",
                    content: system,
                },
                ChatCompletionMessage {
                    role: "user",
                    content: message.to_string(),
                },
            ],
            user: conversation_key,
        }
    }
}

impl Assistant for OpenAiAssistant {
    fn get_response(
        &self,
        conversation_key: &str,
        message: &str,
        context: Option<&str>,
    ) -> Result<String, AssistantError> {
        let body = self.build_request(conversation_key, message, context);
        let url = format!("{}/chat/completions", self.base_url);
        let response = ureq::post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(
                serde_json::to_value(&body)
                    .map_err(|err| AssistantError::Request(err.to_string()))?,
            )
            .map_err(|err| AssistantError::Request(err.to_string()))?;

        let parsed: ChatCompletionResponse = response
            .into_json()
            .map_err(|err| AssistantError::Request(err.to_string()))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                AssistantError::MalformedResponse("response contained no choices".to_string())
            })?;
        Ok(reply)
    }
}

/// Stand-in used when no api key is configured: every call fails with the
/// original configuration error so the orchestrator can degrade.
pub struct UnconfiguredAssistant {
    error: AssistantError,
}

impl UnconfiguredAssistant {
    pub fn new(error: AssistantError) -> Self {
        Self { error }
    }
}

impl Assistant for UnconfiguredAssistant {
    fn get_response(
        &self,
        _conversation_key: &str,
        _message: &str,
        _context: Option<&str>,
    ) -> Result<String, AssistantError> {
        Err(self.error.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assistant() -> OpenAiAssistant {
        OpenAiAssistant {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            api_key: "test-key".to_string(),
        }
    }

    #[test]
    fn request_embeds_context_in_system_prompt() {
        let assistant = sample_assistant();
        let request = assistant.build_request("7", "what's left?", Some("Project: Atlas"));
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.user, "7");
        assert_eq!(request.messages.len(), 2);
        assert!(request.messages[0].content.contains("Project: Atlas"));
        assert_eq!(request.messages[1].content, "what's left?");
    }

    #[test]
    fn request_without_context_notes_its_absence() {
        let assistant = sample_assistant();
        let request = assistant.build_request("general", "hello", None);
        assert!(request.messages[0].content.contains(NO_CONTEXT_NOTE));
    }

    #[test]
    fn completion_response_parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":" reply text "}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.choices[0].message.content, " reply text ");
    }

    #[test]
    fn unconfigured_assistant_always_fails() {
        let assistant = UnconfiguredAssistant::new(AssistantError::MissingApiKey {
            env: "OPENAI_API_KEY".to_string(),
        });
        assert!(assistant.get_response("general", "hi", None).is_err());
    }
}
