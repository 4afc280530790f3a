use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::io::Roster;
use crate::models::{RawMessage, SenderRole};
use crate::patterns::PatternConfig;

/// Narrow closure pattern typical of support replies, in either language
static CLOSURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(done|recheck|تمام حبيبي|هسه اجيك)\b").expect("invalid closure regex")
});

/// A sender above this many resolution-style messages is never inferred
/// as a customer
const MAX_CUSTOMER_RESOLUTIONS: usize = 3;

/// Behavioral evidence gathered for one sender absent from the roster
#[derive(Debug, Clone)]
pub struct SenderInference {
    pub sender: String,
    pub message_count: usize,
    pub issue_reports: usize,
    pub closure_matches: usize,
    pub resolution_matches: usize,
    /// The role this sender was inferred to have
    pub role: SenderRole,
}

/// Result of Stage 0 role resolution
///
/// Inferences are best-effort and exposed here for inspection; overriding
/// one means editing the persisted roster and re-running.
#[derive(Debug, Default)]
pub struct RoleResolution {
    pub inferred: Vec<SenderInference>,
}

/// Resolve a role for every distinct sender
///
/// Roster entries win by exact match. Remaining senders are classified
/// behaviorally: a sender is a customer when their issue-keyword matches
/// outnumber closure-pattern matches and they rarely write
/// resolution-style messages; otherwise support. Inferred roles are merged
/// into the roster so a later save makes re-runs deterministic.
pub fn resolve_roles(
    messages: &[RawMessage],
    roster: &mut Roster,
    patterns: &PatternConfig,
) -> RoleResolution {
    let senders: BTreeSet<&str> = messages.iter().map(|m| m.sender.as_str()).collect();
    let mut resolution = RoleResolution::default();

    for sender in senders {
        if roster.role_of(sender) != SenderRole::Unknown {
            continue;
        }

        let inference = analyze_sender(sender, messages, patterns);
        info!(
            "Inferred {:?} for '{}' ({} msgs, {} issue reports, {} closures, {} resolutions)",
            inference.role,
            sender,
            inference.message_count,
            inference.issue_reports,
            inference.closure_matches,
            inference.resolution_matches
        );
        roster.add(sender, inference.role);
        resolution.inferred.push(inference);
    }

    resolution
}

fn analyze_sender(sender: &str, messages: &[RawMessage], patterns: &PatternConfig) -> SenderInference {
    let mut message_count = 0usize;
    let mut issue_reports = 0usize;
    let mut closure_matches = 0usize;
    let mut resolution_matches = 0usize;

    for msg in messages.iter().filter(|m| m.sender == sender) {
        message_count += 1;
        let body_lower = msg.body.to_lowercase();
        if patterns.issue_keywords.matches(&body_lower) {
            issue_reports += 1;
        }
        if CLOSURE_RE.is_match(&body_lower) {
            closure_matches += 1;
        }
        if patterns.resolution.matches(&body_lower) {
            resolution_matches += 1;
        }
    }

    let likely_customer =
        issue_reports > closure_matches && resolution_matches < MAX_CUSTOMER_RESOLUTIONS;

    SenderInference {
        sender: sender.to_string(),
        message_count,
        issue_reports,
        closure_matches,
        resolution_matches,
        role: if likely_customer {
            SenderRole::Customer
        } else {
            SenderRole::Support
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Language;
    use chrono::NaiveDate;

    fn msg(minute: u32, sender: &str, body: &str) -> RawMessage {
        RawMessage {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
            sender: sender.to_string(),
            body: body.to_string(),
            ticket_refs: vec![],
            language: Language::English,
        }
    }

    #[test]
    fn test_roster_entries_win() {
        let messages = vec![msg(0, "Omar Noc", "port down everywhere")];
        let mut roster = Roster::default();
        roster.add("Omar Noc", SenderRole::Support);
        let patterns = PatternConfig::default();

        let resolution = resolve_roles(&messages, &mut roster, &patterns);
        assert!(resolution.inferred.is_empty());
        assert_eq!(roster.role_of("Omar Noc"), SenderRole::Support);
    }

    #[test]
    fn test_reporter_inferred_as_customer() {
        let messages = vec![
            msg(0, "+964 781 000 0001", "port down on site 4"),
            msg(5, "+964 781 000 0001", "zabbix issue again"),
            msg(9, "+964 781 000 0001", "any update"),
        ];
        let mut roster = Roster::default();
        let patterns = PatternConfig::default();

        resolve_roles(&messages, &mut roster, &patterns);
        assert_eq!(roster.role_of("+964 781 000 0001"), SenderRole::Customer);
    }

    #[test]
    fn test_closer_inferred_as_support() {
        let messages = vec![
            msg(0, "Haider", "done"),
            msg(5, "Haider", "recheck please"),
            msg(9, "Haider", "done, fixed"),
            msg(12, "Haider", "solved"),
        ];
        let mut roster = Roster::default();
        let patterns = PatternConfig::default();

        let resolution = resolve_roles(&messages, &mut roster, &patterns);
        assert_eq!(roster.role_of("Haider"), SenderRole::Support);
        assert_eq!(resolution.inferred.len(), 1);
        assert!(resolution.inferred[0].resolution_matches >= MAX_CUSTOMER_RESOLUTIONS);
    }

    #[test]
    fn test_resolved_roster_reproduces_assignments() {
        let messages = vec![
            msg(0, "+964 781 000 0001", "port down on site 4"),
            msg(3, "Haider", "done"),
            msg(9, "someone", "hello"),
        ];
        let patterns = PatternConfig::default();

        let mut first_run = Roster::default();
        resolve_roles(&messages, &mut first_run, &patterns);

        // Feeding the resolved roster into a second run yields identical
        // roles and nothing left to infer
        let mut second_run = first_run.clone();
        let resolution = resolve_roles(&messages, &mut second_run, &patterns);
        assert!(resolution.inferred.is_empty());
        for msg in &messages {
            assert_eq!(first_run.role_of(&msg.sender), second_run.role_of(&msg.sender));
        }
    }

    #[test]
    fn test_every_sender_gets_a_role() {
        let messages = vec![
            msg(0, "a", "port down"),
            msg(1, "b", "done"),
            msg(2, "c", "hello there"),
        ];
        let mut roster = Roster::default();
        let patterns = PatternConfig::default();

        resolve_roles(&messages, &mut roster, &patterns);
        for sender in ["a", "b", "c"] {
            assert_ne!(roster.role_of(sender), SenderRole::Unknown);
        }
    }
}
