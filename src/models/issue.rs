use std::collections::BTreeSet;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{ClassifiedMessage, Language};

/// Lifecycle state of an issue thread
///
/// Transitions are forward-only: `Open` moves to exactly one of the other
/// three states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Pending,
    Resolved,
    NoResponse,
}

impl IssueStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IssueStatus::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Open => "open",
            IssueStatus::Pending => "pending",
            IssueStatus::Resolved => "resolved",
            IssueStatus::NoResponse => "no_response",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue category, assigned once from the opening message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ZabbixMonitoring,
    PortDown,
    Temperature,
    Outage,
    Configuration,
    Alarm,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ZabbixMonitoring => "zabbix_monitoring",
            Category::PortDown => "port_down",
            Category::Temperature => "temperature",
            Category::Outage => "outage",
            Category::Configuration => "configuration",
            Category::Alarm => "alarm",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A segmented thread of related messages: one customer-reported problem
/// and its handling
#[derive(Debug, Clone)]
pub struct Issue {
    /// Sequential identifier, assigned at creation, never reused
    pub id: u64,
    /// Union of all ticket references seen in this thread, de-duplicated,
    /// in encounter order
    pub ticket_refs: Vec<String>,
    /// Sender of the opening message
    pub reporter: String,
    /// Time-ordered, append-only message sequence, never empty
    pub messages: Vec<ClassifiedMessage>,
    pub status: IssueStatus,
    /// Timestamp of the opening message, immutable
    pub start_time: NaiveDateTime,
    /// Timestamp of the last message, frozen once the issue closes
    pub end_time: Option<NaiveDateTime>,
    /// Set once by the first support acknowledgment/response/request_info
    pub first_response_latency: Option<Duration>,
    /// Set once by the resolving support message
    pub resolution_latency: Option<Duration>,
    /// Count of support response/acknowledgment/request_info messages
    pub total_responses: u32,
    /// Distinct support senders who contributed to this thread
    pub support_participants: BTreeSet<String>,
    /// Assigned once at creation from the opening message body
    pub category: Category,
    /// Language of the opening message
    pub language: Language,
}

impl Issue {
    /// Open a new issue seeded by a customer message
    pub fn open(id: u64, opening: ClassifiedMessage, category: Category) -> Self {
        let mut ticket_refs = Vec::new();
        for ticket in &opening.ticket_refs {
            if !ticket_refs.contains(ticket) {
                ticket_refs.push(ticket.clone());
            }
        }
        Self {
            id,
            ticket_refs,
            reporter: opening.sender.clone(),
            start_time: opening.timestamp,
            end_time: None,
            status: IssueStatus::Open,
            first_response_latency: None,
            resolution_latency: None,
            total_responses: 0,
            support_participants: BTreeSet::new(),
            category,
            language: opening.language,
            messages: vec![opening],
        }
    }

    /// Display label for reports, e.g. `ISSUE_0007`
    pub fn label(&self) -> String {
        format!("ISSUE_{:04}", self.id)
    }

    /// Timestamp of the most recent message in this thread
    pub fn last_message_time(&self) -> NaiveDateTime {
        // messages is non-empty by construction
        self.messages.last().map(|m| m.timestamp).unwrap_or(self.start_time)
    }

    /// Whether any of the given ticket refs already belongs to this thread
    pub fn shares_ticket(&self, refs: &[String]) -> bool {
        refs.iter().any(|t| self.ticket_refs.contains(t))
    }

    /// Union new ticket references into the thread, preserving order
    pub fn absorb_ticket_refs(&mut self, refs: &[String]) {
        for ticket in refs {
            if !self.ticket_refs.contains(ticket) {
                self.ticket_refs.push(ticket.clone());
            }
        }
    }

    /// Record the first support response latency; later calls are no-ops
    pub fn record_first_response(&mut self, at: NaiveDateTime) {
        if self.first_response_latency.is_none() {
            self.first_response_latency = Some(at - self.start_time);
        }
    }

    /// Mark the issue resolved; latency, status and end_time latch on the
    /// first resolution and never change again. A no-op on any terminal
    /// status: closed issues never transition
    pub fn record_resolution(&mut self, at: NaiveDateTime) {
        if self.status.is_terminal() {
            return;
        }
        self.status = IssueStatus::Resolved;
        self.end_time = Some(at);
        self.resolution_latency = Some(at - self.start_time);
    }

    /// Close a still-open issue on a thread break (a new issue displaced it)
    pub fn close_pending(&mut self) {
        if self.status == IssueStatus::Open {
            self.status = IssueStatus::Pending;
            self.end_time = Some(self.last_message_time());
        }
    }

    /// Close a still-open issue at end of stream: pending if it ever got a
    /// first response, otherwise no_response
    pub fn close_at_stream_end(&mut self) {
        if self.status == IssueStatus::Open {
            self.end_time = Some(self.last_message_time());
            self.status = if self.first_response_latency.is_some() {
                IssueStatus::Pending
            } else {
                IssueStatus::NoResponse
            };
        }
    }
}
