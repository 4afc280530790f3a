use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{Category, ClassifiedMessage, Issue, IssueStatus, Language};
use crate::stages::KpiReport;

/// Longest message excerpt carried into issue records
const EXCERPT_CHARS: usize = 200;

/// One issue flattened for downstream writers (spreadsheet, dashboard)
#[derive(Debug, Clone, Serialize)]
pub struct IssueRecord {
    pub issue_id: String,
    pub ticket_refs: Vec<String>,
    pub reporter: String,
    pub category: Category,
    pub language: Language,
    pub status: IssueStatus,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub first_response_minutes: Option<f64>,
    pub resolution_hours: Option<f64>,
    pub total_responses: u32,
    pub support_participants: Vec<String>,
    pub message_count: usize,
    pub opening_message: String,
    pub closing_message: String,
}

impl IssueRecord {
    pub fn from_issue(issue: &Issue) -> Self {
        Self {
            issue_id: issue.label(),
            ticket_refs: issue.ticket_refs.clone(),
            reporter: issue.reporter.clone(),
            category: issue.category,
            language: issue.language,
            status: issue.status,
            start_time: issue.start_time,
            end_time: issue.end_time,
            first_response_minutes: issue
                .first_response_latency
                .map(|d| d.num_seconds() as f64 / 60.0),
            resolution_hours: issue
                .resolution_latency
                .map(|d| d.num_seconds() as f64 / 3600.0),
            total_responses: issue.total_responses,
            support_participants: issue.support_participants.iter().cloned().collect(),
            message_count: issue.messages.len(),
            opening_message: excerpt(&issue.messages[0].body),
            closing_message: issue
                .messages
                .last()
                .map(|m| excerpt(&m.body))
                .unwrap_or_default(),
        }
    }
}

/// Pipeline counters with no semantic contract, useful progress output
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub parsed_messages: usize,
    pub skipped_lines: usize,
    pub system_lines: usize,
    pub dropped_messages: usize,
}

/// The machine-readable analysis output: issue records, the classified
/// message log, KPIs and diagnostics - everything a downstream consumer
/// needs without the pipeline's internals
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub issues: Vec<IssueRecord>,
    pub messages: Vec<ClassifiedMessage>,
    pub kpis: KpiReport,
    pub diagnostics: Diagnostics,
}

impl AnalysisReport {
    pub fn build(
        issues: &[Issue],
        messages: Vec<ClassifiedMessage>,
        kpis: KpiReport,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            issues: issues.iter().map(IssueRecord::from_issue).collect(),
            messages,
            kpis,
            diagnostics,
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        Ok(())
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(EXCERPT_CHARS).collect()
}

/// Render the KPI summary as a human-readable text report
pub fn render_text_report(kpis: &KpiReport) -> String {
    let mut out = String::new();

    section(&mut out, "Support Chat Analysis");
    let _ = writeln!(out, "Total issues          : {}", kpis.total_issues);
    let _ = writeln!(out, "Total messages        : {}", kpis.total_messages);
    let _ = writeln!(out, "Customers             : {}", kpis.total_customers);
    let _ = writeln!(out, "Support staff         : {}", kpis.total_support_staff);
    out.push('\n');

    section(&mut out, "Key Performance Indicators");
    let _ = writeln!(out, "Resolution rate       : {:.1}%", kpis.resolution_rate);
    let _ = writeln!(out, "Response rate         : {:.1}%", kpis.response_rate);
    if let Some(stats) = &kpis.response_latency {
        let _ = writeln!(
            out,
            "First response (min)  : avg {:.1} / min {:.1} / max {:.1}",
            stats.mean_minutes, stats.min_minutes, stats.max_minutes
        );
    }
    if let Some(stats) = &kpis.resolution_latency {
        let _ = writeln!(
            out,
            "Resolution (hours)    : avg {:.1} / min {:.1} / max {:.1}",
            stats.mean_minutes / 60.0,
            stats.min_minutes / 60.0,
            stats.max_minutes / 60.0
        );
    }
    out.push('\n');

    section(&mut out, "Issue Status");
    let _ = writeln!(out, "Resolved              : {}", kpis.resolved_issues);
    let _ = writeln!(out, "Pending               : {}", kpis.pending_issues);
    let _ = writeln!(out, "No response           : {}", kpis.no_response_issues);
    out.push('\n');

    if !kpis.category_distribution.is_empty() {
        section(&mut out, "Top Categories");
        for entry in kpis.category_distribution.iter().take(5) {
            let _ = writeln!(out, "{:22}: {}", entry.category.as_str(), entry.count);
        }
        out.push('\n');
    }

    if !kpis.top_reporters.is_empty() {
        section(&mut out, "Top Reporters");
        for entry in kpis.top_reporters.iter().take(5) {
            let _ = writeln!(out, "{:35}: {} issues", entry.reporter, entry.issues);
        }
        out.push('\n');
    }

    if !kpis.support_performance.is_empty() {
        section(&mut out, "Support Staff Performance");
        for perf in &kpis.support_performance {
            let _ = writeln!(
                out,
                "{:35}: {} issues, {} responses, {} resolutions",
                perf.name, perf.issues_handled, perf.responses, perf.resolutions
            );
        }
        out.push('\n');
    }

    section(&mut out, "Response Time Distribution");
    let buckets = &kpis.response_buckets;
    let _ = writeln!(out, "Under 5 minutes       : {}", buckets.under_5_min);
    let _ = writeln!(out, "5-15 minutes          : {}", buckets.from_5_to_15_min);
    let _ = writeln!(out, "15-30 minutes         : {}", buckets.from_15_to_30_min);
    let _ = writeln!(out, "30-60 minutes         : {}", buckets.from_30_to_60_min);
    let _ = writeln!(out, "Over 1 hour           : {}", buckets.over_60_min);

    let mut peak_hours: Vec<(usize, usize)> = kpis
        .hour_distribution
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, count)| *count > 0)
        .collect();
    peak_hours.sort_by(|a, b| b.1.cmp(&a.1));
    if !peak_hours.is_empty() {
        out.push('\n');
        section(&mut out, "Peak Issue Hours");
        for (hour, count) in peak_hours.into_iter().take(3) {
            let _ = writeln!(out, "{:02}:00 - {:02}:00         : {} issues", hour, hour + 1, count);
        }
    }

    out
}

/// Write the human-readable report to a file
pub fn write_text_report(kpis: &KpiReport, path: &Path) -> Result<()> {
    std::fs::write(path, render_text_report(kpis))
        .with_context(|| format!("Failed to write text report: {:?}", path))?;
    Ok(())
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
}
