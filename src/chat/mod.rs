//! Rule-based chat assistant.
//!
//! A message is scanned for keywords, a few bounded store reads enrich the
//! context, and the first matching rule renders a French reply. Every
//! exchange is appended to `chat_conversations`.

pub mod context;
pub mod message;
pub mod rules;

pub use self::context::Enrichment;
pub use self::message::Message;

use crate::config::DashboardConfig;
use crate::storage::{RecordStore, Row, Table};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Reply sent alongside any chat failure.
pub const APOLOGY: &str =
    "Désolé, une erreur s'est produite lors du traitement de votre demande. Veuillez réessayer.";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<serde_json::Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub context: Value,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("invalid chat request: {0}")]
    InvalidRequest(String),
}

impl ChatRequest {
    /// Decode a raw request body.
    pub fn from_json(body: &[u8]) -> Result<Self, ChatError> {
        serde_json::from_slice(body).map_err(|e| ChatError::InvalidRequest(e.to_string()))
    }
}

#[derive(Clone)]
pub struct Assistant {
    store: Arc<dyn RecordStore>,
    config: Arc<DashboardConfig>,
}

impl Assistant {
    pub fn new(store: Arc<dyn RecordStore>, config: Arc<DashboardConfig>) -> Self {
        Self { store, config }
    }

    pub async fn respond(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        if request.message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message = Message::parse(&request.message);
        let today = Utc::now().date_naive();
        let enrichment = context::enrich(
            self.store.as_ref(),
            &message.triggers,
            &self.config.chat,
            &self.config.scoring,
            today,
        )
        .await;

        let (rule, response) = rules::respond(&message, &enrichment);
        info!(rule, chars = message.original.chars().count(), "chat reply rendered");

        let context = merge_context(request.context, &enrichment);
        self.log_exchange(&message.original, &response, &context).await;

        Ok(ChatReply { response, context })
    }

    async fn log_exchange(&self, message: &str, response: &str, context: &Value) {
        let mut row = Row::new();
        row.insert("id".into(), json!(uuid::Uuid::new_v4().to_string()));
        row.insert("message".into(), json!(message));
        row.insert("response".into(), json!(response));
        row.insert("context".into(), context.clone());
        row.insert(
            "created_at".into(),
            json!(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        );

        if let Err(e) = self.store.insert(Table::ChatConversations, vec![row]).await {
            warn!(error = %e, "failed to record chat conversation");
        }
    }
}

/// Caller context with the enrichment results laid over it.
fn merge_context(caller: Option<serde_json::Map<String, Value>>, enrichment: &Enrichment) -> Value {
    let mut merged = caller.unwrap_or_default();
    if let Ok(Value::Object(extra)) = serde_json::to_value(enrichment) {
        merged.extend(extra);
    }
    Value::Object(merged)
}
