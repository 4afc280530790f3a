use chrono::Duration;
use tracing::debug;

use crate::models::{ClassifiedMessage, Intent, Issue, SenderRole};
use crate::patterns::PatternConfig;

/// Configuration for the segmentation state machine
#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    /// Maximum silence between consecutive messages of one thread
    pub max_gap: Duration,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_gap: Duration::hours(2),
        }
    }
}

/// Result of Stage 2 segmentation
#[derive(Debug)]
pub struct SegmentationResult {
    /// Finished issues, in creation order; all statuses terminal
    pub issues: Vec<Issue>,
    /// Messages that neither extended nor started an issue
    pub dropped_messages: usize,
}

/// The segmentation state machine
///
/// Holds the single current-issue slot and exposes one transition per
/// message. Messages must arrive in non-decreasing timestamp order; the
/// gap heuristic is meaningless otherwise. Decisions are irreversible: a
/// closed issue never reopens and a dropped message is never revisited.
pub struct Segmenter<'a> {
    config: SegmenterConfig,
    patterns: &'a PatternConfig,
    issues: Vec<Issue>,
    /// Index into `issues` of the thread currently accepting messages
    current: Option<usize>,
    next_id: u64,
    dropped: usize,
}

impl<'a> Segmenter<'a> {
    pub fn new(patterns: &'a PatternConfig, config: SegmenterConfig) -> Self {
        Self {
            config,
            patterns,
            issues: Vec::new(),
            current: None,
            next_id: 1,
            dropped: 0,
        }
    }

    /// Feed one message through the transition rule
    pub fn push(&mut self, msg: ClassifiedMessage) {
        let Some(idx) = self.current else {
            // No active thread: any customer message opens one, anything
            // else is dropped
            if msg.sender_role == SenderRole::Customer {
                self.open_issue(msg);
            } else {
                self.dropped += 1;
            }
            return;
        };

        let issue = &self.issues[idx];
        let gap = msg.timestamp - issue.last_message_time();
        let continuation = gap <= self.config.max_gap
            || issue.shares_ticket(&msg.ticket_refs)
            || (msg.sender_role == SenderRole::Customer
                && matches!(msg.intent, Intent::FollowUp | Intent::General));

        if continuation {
            self.append_to_current(idx, msg);
        } else if msg.sender_role == SenderRole::Customer
            && matches!(msg.intent, Intent::IssueReport | Intent::General)
        {
            // Thread break: retire the active thread and seed a new one
            self.issues[idx].close_pending();
            self.open_issue(msg);
        } else {
            // Accepted information loss for noisy traffic
            debug!(
                "Dropping non-continuing message from '{}' at {}",
                msg.sender, msg.timestamp
            );
            self.dropped += 1;
        }
    }

    /// End-of-stream finalization: any thread still open closes as pending
    /// (had a first response) or no_response
    pub fn finish(mut self) -> SegmentationResult {
        for issue in &mut self.issues {
            issue.close_at_stream_end();
        }
        SegmentationResult {
            issues: self.issues,
            dropped_messages: self.dropped,
        }
    }

    fn open_issue(&mut self, msg: ClassifiedMessage) {
        let category = self.patterns.categorize(&msg.body);
        let issue = Issue::open(self.next_id, msg, category);
        debug!("Opened {} ({})", issue.label(), issue.category);
        self.next_id += 1;
        self.issues.push(issue);
        self.current = Some(self.issues.len() - 1);
    }

    fn append_to_current(&mut self, idx: usize, msg: ClassifiedMessage) {
        let issue = &mut self.issues[idx];
        issue.absorb_ticket_refs(&msg.ticket_refs);

        if msg.sender_role == SenderRole::Support {
            issue.support_participants.insert(msg.sender.clone());

            match msg.intent {
                Intent::Acknowledgment | Intent::Response | Intent::RequestInfo => {
                    issue.record_first_response(msg.timestamp);
                    issue.total_responses += 1;
                }
                Intent::Resolution => {
                    issue.record_resolution(msg.timestamp);
                }
                _ => {}
            }
        }

        issue.messages.push(msg);
    }
}

/// Partition a classified, time-ordered message sequence into issues
pub fn segment_messages(
    messages: &[ClassifiedMessage],
    patterns: &PatternConfig,
    config: SegmenterConfig,
) -> SegmentationResult {
    let mut segmenter = Segmenter::new(patterns, config);
    for msg in messages {
        segmenter.push(msg.clone());
    }
    segmenter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, IssueStatus, Language, RawMessage};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn msg(
        timestamp: NaiveDateTime,
        sender: &str,
        role: SenderRole,
        intent: Intent,
        body: &str,
        tickets: &[&str],
    ) -> ClassifiedMessage {
        let raw = RawMessage {
            timestamp,
            sender: sender.to_string(),
            body: body.to_string(),
            ticket_refs: tickets.iter().map(|s| s.to_string()).collect(),
            language: Language::English,
        };
        ClassifiedMessage::from_raw(&raw, role, intent)
    }

    #[test]
    fn test_resolved_issue_scenario() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(
                at(10, 0),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "port down, ticket 1234567",
                &["1234567"],
            ),
            msg(
                at(10, 3),
                "omar",
                SenderRole::Support,
                Intent::Acknowledgment,
                "ok checking",
                &[],
            ),
            msg(
                at(10, 40),
                "omar",
                SenderRole::Support,
                Intent::Resolution,
                "done, fixed",
                &[],
            ),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.dropped_messages, 0);

        let issue = &result.issues[0];
        assert_eq!(issue.status, IssueStatus::Resolved);
        assert_eq!(issue.first_response_latency, Some(Duration::minutes(3)));
        assert_eq!(issue.resolution_latency, Some(Duration::minutes(40)));
        assert_eq!(issue.ticket_refs, vec!["1234567"]);
        assert_eq!(issue.category, Category::PortDown);
        assert_eq!(issue.end_time, Some(at(10, 40)));
        assert_eq!(issue.support_participants.len(), 1);
        assert_eq!(issue.total_responses, 1);
    }

    #[test]
    fn test_gap_break_closes_pending_and_opens_new() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(
                at(8, 0),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "zabbix down",
                &[],
            ),
            // 3-hour gap, no ticket overlap
            msg(
                at(11, 0),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "port down on site 2",
                &[],
            ),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].status, IssueStatus::Pending);
        assert_eq!(result.issues[0].end_time, Some(at(8, 0)));
        assert_eq!(result.issues[1].start_time, at(11, 0));
    }

    #[test]
    fn test_unanswered_issue_ends_no_response() {
        let patterns = PatternConfig::default();
        let messages = vec![msg(
            at(10, 0),
            "cust",
            SenderRole::Customer,
            Intent::IssueReport,
            "alarm on node 7",
            &[],
        )];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].status, IssueStatus::NoResponse);
        assert!(result.issues[0].first_response_latency.is_none());
        assert!(result.issues[0].resolution_latency.is_none());
    }

    #[test]
    fn test_ticket_overlap_bridges_long_gap() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(
                at(8, 0),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "link down, ticket 9563926",
                &["9563926"],
            ),
            // 5 hours later but referencing the same ticket
            msg(
                at(13, 0),
                "omar",
                SenderRole::Support,
                Intent::Resolution,
                "9563926 done",
                &["9563926"],
            ),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].status, IssueStatus::Resolved);
    }

    #[test]
    fn test_non_qualifying_break_message_is_dropped() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(
                at(8, 0),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "port down",
                &[],
            ),
            // Support message after a 4-hour gap with no ticket overlap:
            // neither extends nor starts a thread
            msg(
                at(12, 0),
                "omar",
                SenderRole::Support,
                Intent::Response,
                "back online",
                &[],
            ),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].messages.len(), 1);
        assert_eq!(result.dropped_messages, 1);
    }

    #[test]
    fn test_support_message_before_any_issue_is_dropped() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(
                at(8, 0),
                "omar",
                SenderRole::Support,
                Intent::Response,
                "morning all",
                &[],
            ),
            msg(
                at(8, 5),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "port down",
                &[],
            ),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.dropped_messages, 1);
        assert_eq!(result.issues[0].reporter, "cust");
    }

    #[test]
    fn test_trailing_messages_never_restamp_resolution() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(
                at(10, 0),
                "cust",
                SenderRole::Customer,
                Intent::IssueReport,
                "port down",
                &[],
            ),
            msg(
                at(10, 10),
                "omar",
                SenderRole::Support,
                Intent::Resolution,
                "done",
                &[],
            ),
            // Trailing thank-you still belongs to the thread but changes
            // nothing that already latched
            msg(
                at(10, 20),
                "omar",
                SenderRole::Support,
                Intent::Resolution,
                "welcome",
                &[],
            ),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);

        let issue = &result.issues[0];
        assert_eq!(issue.messages.len(), 3);
        assert_eq!(issue.end_time, Some(at(10, 10)));
        assert_eq!(issue.resolution_latency, Some(Duration::minutes(10)));
    }

    #[test]
    fn test_message_partition_is_exact() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(at(8, 0), "cust", SenderRole::Customer, Intent::IssueReport, "port down", &[]),
            msg(at(8, 5), "omar", SenderRole::Support, Intent::Acknowledgment, "checking", &[]),
            msg(at(12, 0), "cust", SenderRole::Customer, Intent::IssueReport, "zabbix issue", &[]),
            msg(at(12, 1), "ali", SenderRole::Support, Intent::Response, "on it", &[]),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        let assigned: usize = result.issues.iter().map(|i| i.messages.len()).sum();
        assert_eq!(assigned + result.dropped_messages, messages.len());

        for issue in &result.issues {
            assert!(!issue.messages.is_empty());
            assert!(issue.status.is_terminal());
            let mut last = issue.start_time;
            for m in &issue.messages {
                assert!(m.timestamp >= last);
                last = m.timestamp;
            }
        }
    }

    #[test]
    fn test_issue_report_within_gap_extends_thread() {
        let patterns = PatternConfig::default();
        let messages = vec![
            msg(at(10, 0), "cust", SenderRole::Customer, Intent::IssueReport, "port down", &[]),
            // A second report 30 minutes later continues the same thread
            msg(at(10, 30), "cust", SenderRole::Customer, Intent::IssueReport, "still down", &[]),
        ];

        let result = segment_messages(&messages, &patterns, SegmenterConfig::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].messages.len(), 2);
    }
}
