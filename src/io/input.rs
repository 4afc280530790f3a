use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::debug;

use crate::error::ThreadlineError;
use crate::models::{Language, RawMessage};

/// Message header: `M/D/YY, H:MM AM - Sender: body` (2- or 4-digit year)
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2,4}),\s+(\d{1,2}):(\d{2})\s*([AP]M)\s+-\s+([^:]+?):\s(.*)$")
        .expect("invalid header regex")
});

/// Ticket references are exactly 7 consecutive digits, word-bounded
static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{7}\b").expect("invalid ticket regex"));

/// Substrings identifying export system notices, dropped entirely
const SYSTEM_NOTICES: &[&str] = &[
    "Messages and calls are end-to-end encrypted",
    "created group",
    "added you",
    "<Media omitted>",
    "This message was deleted",
    "You were added",
    "removed",
    "changed the group",
    "joined using",
    "left",
    "Learn more",
];

/// Result of parsing a transcript, with line-level diagnostics
#[derive(Debug)]
pub struct ParseOutcome {
    /// Messages sorted by timestamp ascending (stable for equal stamps)
    pub messages: Vec<RawMessage>,
    /// Lines that matched no header and extended no open message
    pub skipped_lines: usize,
    /// System-notice lines dropped
    pub system_lines: usize,
}

/// Parse a chat export file into a time-ordered message sequence
pub fn parse_transcript_file(path: &Path) -> Result<ParseOutcome> {
    if !path.exists() {
        return Err(ThreadlineError::TranscriptMissing(path.to_path_buf()).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {:?}", path))?;
    parse_transcript(&content)
}

/// Parse chat export text into a time-ordered message sequence
///
/// Lines matching the header start a message; any other line extends the
/// previous message's body with a separating space. System notices are
/// dropped. A transcript yielding no messages at all is a hard failure;
/// individual malformed lines are only counted.
pub fn parse_transcript(text: &str) -> Result<ParseOutcome> {
    let mut messages: Vec<RawMessage> = Vec::new();
    let mut skipped_lines = 0usize;
    let mut system_lines = 0usize;

    // (timestamp, sender, body) of the message currently being folded
    let mut current: Option<(NaiveDateTime, String, String)> = None;

    for raw_line in text.lines() {
        let line = normalize_spaces(raw_line);
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if SYSTEM_NOTICES.iter().any(|n| trimmed.contains(n)) {
            system_lines += 1;
            continue;
        }

        if let Some(caps) = HEADER_RE.captures(trimmed) {
            if let Some(timestamp) = parse_timestamp(&caps) {
                if let Some(finished) = current.take() {
                    messages.push(finish_message(finished));
                }
                let sender = caps[7].trim().to_string();
                let body = caps[8].trim().to_string();
                current = Some((timestamp, sender, body));
            } else {
                debug!("Unparsable timestamp in line: {}", trimmed);
                skipped_lines += 1;
            }
        } else if let Some((_, _, body)) = current.as_mut() {
            // Continuation line: the newline becomes a single space
            body.push(' ');
            body.push_str(trimmed);
        } else {
            skipped_lines += 1;
        }
    }

    if let Some(finished) = current.take() {
        messages.push(finish_message(finished));
    }

    if messages.is_empty() {
        return Err(ThreadlineError::EmptyTranscript.into());
    }

    // Stable sort: transcript order is preserved for equal timestamps, an
    // invariant every downstream component relies on
    messages.sort_by_key(|m| m.timestamp);

    Ok(ParseOutcome {
        messages,
        skipped_lines,
        system_lines,
    })
}

/// Replace the narrow no-break, no-break and directional-isolate
/// characters that chat exports embed around timestamps
fn normalize_spaces(line: &str) -> String {
    line.chars()
        .map(|c| match c {
            '\u{202F}' | '\u{00A0}' | '\u{2068}' | '\u{2069}' => ' ',
            other => other,
        })
        .collect()
}

fn parse_timestamp(caps: &regex::Captures<'_>) -> Option<NaiveDateTime> {
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let mut year: i32 = caps[3].parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    let mut hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;

    // 12-hour clock: 12 AM is midnight, 12 PM is noon
    let pm = &caps[6] == "PM";
    if hour == 12 {
        hour = 0;
    }
    if pm {
        hour += 12;
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn finish_message((timestamp, sender, body): (NaiveDateTime, String, String)) -> RawMessage {
    let ticket_refs: Vec<String> = TICKET_RE
        .find_iter(&body)
        .map(|m| m.as_str().to_string())
        .collect();
    let language = detect_language(&body);
    RawMessage {
        timestamp,
        sender,
        body,
        ticket_refs,
        language,
    }
}

/// Classify a body by comparing Arabic-range character count against
/// Latin letters, with a 2:1 dominance ratio
pub fn detect_language(text: &str) -> Language {
    let arabic = text
        .chars()
        .filter(|c| ('\u{0600}'..='\u{06FF}').contains(c))
        .count();
    let latin = text.chars().filter(|c| c.is_ascii_alphabetic()).count();

    if arabic > latin * 2 {
        Language::Arabic
    } else if latin > arabic * 2 {
        Language::English
    } else {
        Language::Mixed
    }
}
