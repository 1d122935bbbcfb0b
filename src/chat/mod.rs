use crate::assistant::Assistant;
use crate::auth::CurrentUser;
use crate::shared::logging::{append_log_line, chat_log_path};
use crate::store::{RecordStore, StoreError};
use getrandom::getrandom;
use serde::{Deserialize, Serialize};

pub mod context;
pub mod executor;
pub mod intent;

pub use context::render_project_context;
pub use executor::{execute, ChatReply};
pub use intent::{classify, Intent, MatchRule, RuleInput, RULES};

pub const FALLBACK_APOLOGY: &str =
    "I apologize, but I encountered an error processing your request. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
}

/// One chat turn: classify the utterance against the caller's visible
/// projects, execute a matched command, or hand the utterance (plus any
/// mentioned-project context) to the assistant. The assistant path never
/// propagates a failure; it degrades to the context text or a fixed apology.
pub fn handle_chat(
    store: &RecordStore,
    assistant: &dyn Assistant,
    user: &CurrentUser,
    message: &str,
) -> Result<ChatResponse, ChatError> {
    let request_id = generate_request_id();
    let projects = store.list_projects(&user.email);
    let tasks = store.tasks_for_projects(&projects);
    let intent = classify(message, &projects, &tasks);
    log_chat_line(
        store,
        &format!(
            "{request_id} user={} intent={}",
            user.email,
            intent.label()
        ),
    );

    let project_hint = intent.mentioned_project_id();
    if let Some(reply) = executor::execute(store, user, intent)? {
        return Ok(ChatResponse {
            message: reply.message,
            context: Some(reply.context),
        });
    }

    // No rule matched. Build fallback context from the mentioned project,
    // if any, and defer to the assistant.
    let context = project_hint.and_then(|project_id| {
        let project = store.get_project(project_id, &user.email).ok()?;
        let tasks = store.list_tasks(project_id, &user.email).ok()?;
        Some(render_project_context(&project, &tasks))
    });
    let conversation_key = project_hint
        .map(|project_id| project_id.to_string())
        .unwrap_or_else(|| "general".to_string());

    let reply = match assistant.get_response(&conversation_key, message, context.as_deref()) {
        Ok(text) => text,
        Err(err) => {
            log_chat_line(store, &format!("{request_id} assistant failed: {err}"));
            match &context {
                Some(block) => block.trim().to_string(),
                None => FALLBACK_APOLOGY.to_string(),
            }
        }
    };

    Ok(ChatResponse {
        message: reply,
        context,
    })
}

fn log_chat_line(store: &RecordStore, line: &str) {
    // Diagnostics only; a failed append never fails the chat turn.
    let _ = append_log_line(&chat_log_path(&store.paths().root), line);
}

const BASE36_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const REQUEST_SUFFIX_SPACE: u32 = 36_u32.pow(4);

fn base36_encode_u64(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut chars = Vec::new();
    while value > 0 {
        chars.push(BASE36_ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    chars.into_iter().rev().collect()
}

fn base36_encode_fixed_u32(mut value: u32, width: usize) -> String {
    let mut chars = vec!['0'; width];
    for idx in (0..width).rev() {
        chars[idx] = BASE36_ALPHABET[(value % 36) as usize] as char;
        value /= 36;
    }
    chars.into_iter().collect()
}

fn generate_request_id() -> String {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let mut bytes = [0_u8; 4];
    let entropy = match getrandom(&mut bytes) {
        Ok(()) => u32::from_le_bytes(bytes),
        // No entropy source: the nanosecond clock keeps ids distinguishable.
        Err(_) => chrono::Utc::now().timestamp_subsec_nanos(),
    };
    let suffix = entropy % REQUEST_SUFFIX_SPACE;
    format!(
        "chat-{}-{}",
        base36_encode_u64(now),
        base36_encode_fixed_u32(suffix, 4)
    )
}
