use crate::io::Roster;
use crate::models::{ClassifiedMessage, Intent, RawMessage, SenderRole};
use crate::patterns::PatternConfig;

/// Perform Stage 1: attach a role and an intent to every raw message
///
/// Classification is a total function: ambiguous bodies fall back to
/// General/Response/Other, never an error.
pub fn classify_messages(
    messages: &[RawMessage],
    roster: &Roster,
    patterns: &PatternConfig,
) -> Vec<ClassifiedMessage> {
    messages
        .iter()
        .map(|raw| {
            let role = roster.role_of(&raw.sender);
            let intent = classify_intent(role, &raw.body, raw.has_ticket_ref(), patterns);
            ClassifiedMessage::from_raw(raw, role, intent)
        })
        .collect()
}

/// Role-gated, first-match-wins intent classification
///
/// Group order encodes priority: for customers an explicit issue keyword
/// or a bare ticket reference outranks follow-up; for support, resolution
/// outranks acknowledgment outranks request-for-info, with plain Response
/// as the fallback.
pub fn classify_intent(
    role: SenderRole,
    body: &str,
    has_ticket: bool,
    patterns: &PatternConfig,
) -> Intent {
    let body_lower = body.to_lowercase();

    match role {
        SenderRole::Customer => {
            if patterns.issue_keywords.matches(&body_lower) || has_ticket {
                Intent::IssueReport
            } else if patterns.follow_up.matches(&body_lower) {
                Intent::FollowUp
            } else {
                Intent::General
            }
        }
        SenderRole::Support => {
            if patterns.resolution.matches(&body_lower) {
                Intent::Resolution
            } else if patterns.acknowledgment.matches(&body_lower) {
                Intent::Acknowledgment
            } else if patterns.request_action.matches(&body_lower) {
                Intent::RequestInfo
            } else {
                Intent::Response
            }
        }
        SenderRole::Unknown => Intent::Other,
    }
}
