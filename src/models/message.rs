use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Dominant script of a message body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Arabic,
    English,
    Mixed,
}

/// Role of a sender in the support chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Customer,
    Support,
    Unknown,
}

/// Semantic type assigned to a message by the classifier
///
/// Customer messages can only become IssueReport, FollowUp or General;
/// support messages only Resolution, Acknowledgment, RequestInfo or
/// Response; unknown-role messages become Other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    IssueReport,
    FollowUp,
    Acknowledgment,
    Resolution,
    RequestInfo,
    Response,
    General,
    Other,
}

/// A single parsed transcript message - immutable once parsed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    /// Message timestamp (transcripts carry no timezone)
    pub timestamp: NaiveDateTime,
    /// Sender exactly as it appears in the export
    pub sender: String,
    /// Message body with continuation lines folded in
    pub body: String,
    /// 7-digit ticket references in encounter order, duplicates preserved
    pub ticket_refs: Vec<String>,
    /// Dominant script of the body
    pub language: Language,
}

impl RawMessage {
    pub fn has_ticket_ref(&self) -> bool {
        !self.ticket_refs.is_empty()
    }
}

/// A RawMessage plus sender role and classified intent - derived, never
/// mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedMessage {
    pub timestamp: NaiveDateTime,
    pub sender: String,
    pub sender_role: SenderRole,
    pub body: String,
    pub intent: Intent,
    pub ticket_refs: Vec<String>,
    pub language: Language,
}

impl ClassifiedMessage {
    /// Combine a raw message with its resolved role and intent
    pub fn from_raw(raw: &RawMessage, sender_role: SenderRole, intent: Intent) -> Self {
        Self {
            timestamp: raw.timestamp,
            sender: raw.sender.clone(),
            sender_role,
            body: raw.body.clone(),
            intent,
            ticket_refs: raw.ticket_refs.clone(),
            language: raw.language,
        }
    }

    pub fn has_ticket_ref(&self) -> bool {
        !self.ticket_refs.is_empty()
    }
}
