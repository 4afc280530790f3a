use std::collections::BTreeMap;

use chrono::{Datelike, Duration, Timelike, Weekday};
use serde::Serialize;

use crate::io::Roster;
use crate::models::{Category, Intent, Issue, IssueStatus, SenderRole};

/// Mean/min/max over the issues that actually have the latency set;
/// issues without it are excluded, not treated as zero
#[derive(Debug, Clone, Serialize)]
pub struct LatencyStats {
    pub mean_minutes: f64,
    pub min_minutes: f64,
    pub max_minutes: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReporterCount {
    pub reporter: String,
    pub issues: usize,
}

/// Per-staff tallies; a member is credited once per issue they
/// participated in, plus per-message response/resolution counts
#[derive(Debug, Clone, Serialize)]
pub struct SupportPerformance {
    pub name: String,
    pub issues_handled: usize,
    pub responses: usize,
    pub resolutions: usize,
    /// Approximated by the fleet-wide mean first-response time
    pub avg_response_minutes: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekdayCount {
    pub weekday: String,
    pub count: usize,
}

/// First-response latency histogram with fixed boundaries
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseLatencyBuckets {
    pub under_5_min: usize,
    pub from_5_to_15_min: usize,
    pub from_15_to_30_min: usize,
    pub from_30_to_60_min: usize,
    pub over_60_min: usize,
}

impl ResponseLatencyBuckets {
    fn record(&mut self, latency: Duration) {
        let secs = latency.num_seconds();
        if secs < 300 {
            self.under_5_min += 1;
        } else if secs < 900 {
            self.from_5_to_15_min += 1;
        } else if secs < 1800 {
            self.from_15_to_30_min += 1;
        } else if secs < 3600 {
            self.from_30_to_60_min += 1;
        } else {
            self.over_60_min += 1;
        }
    }
}

/// Summary statistics over the finished issue set
///
/// An empty issue set yields a fully zeroed report rather than an error,
/// so downstream consumers can render an empty state.
#[derive(Debug, Clone, Serialize)]
pub struct KpiReport {
    pub total_issues: usize,
    pub resolved_issues: usize,
    pub pending_issues: usize,
    pub no_response_issues: usize,
    /// resolved / total, in percent; 0 when there are no issues
    pub resolution_rate: f64,
    /// issues with a first response / total, in percent; 0 when empty
    pub response_rate: f64,
    pub response_latency: Option<LatencyStats>,
    pub resolution_latency: Option<LatencyStats>,
    /// Descending by count
    pub category_distribution: Vec<CategoryCount>,
    /// Descending by count, top 10
    pub top_reporters: Vec<ReporterCount>,
    /// Descending by issues handled
    pub support_performance: Vec<SupportPerformance>,
    /// Issue openings per hour of day, 24 entries
    pub hour_distribution: Vec<usize>,
    /// Issue openings per weekday, Monday first
    pub weekday_distribution: Vec<WeekdayCount>,
    pub response_buckets: ResponseLatencyBuckets,
    pub total_messages: usize,
    pub total_customers: usize,
    pub total_support_staff: usize,
}

const TOP_REPORTERS: usize = 10;

/// Reduce the finished issue set into summary KPIs
pub fn aggregate_kpis(issues: &[Issue], roster: &Roster, total_messages: usize) -> KpiReport {
    let total = issues.len();
    let count_status =
        |status: IssueStatus| issues.iter().filter(|i| i.status == status).count();
    let resolved = count_status(IssueStatus::Resolved);
    let pending = count_status(IssueStatus::Pending);
    let no_response = count_status(IssueStatus::NoResponse);

    let response_latencies: Vec<Duration> = issues
        .iter()
        .filter_map(|i| i.first_response_latency)
        .collect();
    let resolution_latencies: Vec<Duration> = issues
        .iter()
        .filter_map(|i| i.resolution_latency)
        .collect();

    let response_latency = latency_stats(&response_latencies);
    let resolution_latency = latency_stats(&resolution_latencies);
    let mean_response_minutes = response_latency
        .as_ref()
        .map(|s| s.mean_minutes)
        .unwrap_or(0.0);

    let mut buckets = ResponseLatencyBuckets::default();
    for latency in &response_latencies {
        buckets.record(*latency);
    }

    KpiReport {
        total_issues: total,
        resolved_issues: resolved,
        pending_issues: pending,
        no_response_issues: no_response,
        resolution_rate: rate(resolved, total),
        response_rate: rate(response_latencies.len(), total),
        response_latency,
        resolution_latency,
        category_distribution: category_distribution(issues),
        top_reporters: top_reporters(issues),
        support_performance: support_performance(issues, mean_response_minutes),
        hour_distribution: hour_distribution(issues),
        weekday_distribution: weekday_distribution(issues),
        response_buckets: buckets,
        total_messages,
        total_customers: roster.customers.len(),
        total_support_staff: roster.support_staff.len(),
    }
}

/// Percentage with a guarded denominator: 0 when there are no issues
fn rate(numerator: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        numerator as f64 / total as f64 * 100.0
    }
}

fn minutes(d: Duration) -> f64 {
    d.num_seconds() as f64 / 60.0
}

fn latency_stats(latencies: &[Duration]) -> Option<LatencyStats> {
    if latencies.is_empty() {
        return None;
    }
    let total: i64 = latencies.iter().map(|d| d.num_seconds()).sum();
    let min = *latencies.iter().min()?;
    let max = *latencies.iter().max()?;
    Some(LatencyStats {
        mean_minutes: total as f64 / latencies.len() as f64 / 60.0,
        min_minutes: minutes(min),
        max_minutes: minutes(max),
    })
}

fn category_distribution(issues: &[Issue]) -> Vec<CategoryCount> {
    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.category).or_insert(0) += 1;
    }
    let mut distribution: Vec<CategoryCount> = counts
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();
    // Stable sort keeps category declaration order among equal counts
    distribution.sort_by(|a, b| b.count.cmp(&a.count));
    distribution
}

fn top_reporters(issues: &[Issue]) -> Vec<ReporterCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for issue in issues {
        *counts.entry(issue.reporter.as_str()).or_insert(0) += 1;
    }
    let mut reporters: Vec<ReporterCount> = counts
        .into_iter()
        .map(|(reporter, issues)| ReporterCount {
            reporter: reporter.to_string(),
            issues,
        })
        .collect();
    reporters.sort_by(|a, b| b.issues.cmp(&a.issues));
    reporters.truncate(TOP_REPORTERS);
    reporters
}

fn support_performance(issues: &[Issue], mean_response_minutes: f64) -> Vec<SupportPerformance> {
    let mut tallies: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();

    for issue in issues {
        for member in &issue.support_participants {
            let entry = tallies.entry(member.as_str()).or_insert((0, 0, 0));
            entry.0 += 1;
            entry.1 += issue
                .messages
                .iter()
                .filter(|m| m.sender == *member && m.sender_role == SenderRole::Support)
                .count();
            entry.2 += issue
                .messages
                .iter()
                .filter(|m| m.sender == *member && m.intent == Intent::Resolution)
                .count();
        }
    }

    let mut performance: Vec<SupportPerformance> = tallies
        .into_iter()
        .map(|(name, (issues_handled, responses, resolutions))| SupportPerformance {
            name: name.to_string(),
            issues_handled,
            responses,
            resolutions,
            avg_response_minutes: if responses > 0 {
                mean_response_minutes
            } else {
                0.0
            },
        })
        .collect();
    performance.sort_by(|a, b| b.issues_handled.cmp(&a.issues_handled));
    performance
}

fn hour_distribution(issues: &[Issue]) -> Vec<usize> {
    let mut hours = vec![0usize; 24];
    for issue in issues {
        hours[issue.start_time.hour() as usize] += 1;
    }
    hours
}

fn weekday_distribution(issues: &[Issue]) -> Vec<WeekdayCount> {
    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    let mut counts = [0usize; 7];
    for issue in issues {
        counts[issue.start_time.weekday().num_days_from_monday() as usize] += 1;
    }

    WEEK.iter()
        .zip(counts)
        .map(|(weekday, count)| WeekdayCount {
            weekday: weekday_name(*weekday).to_string(),
            count,
        })
        .collect()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassifiedMessage, Language, RawMessage};
    use chrono::NaiveDate;

    fn issue_with(
        id: u64,
        status: IssueStatus,
        response_min: Option<i64>,
        resolution_min: Option<i64>,
    ) -> Issue {
        let raw = RawMessage {
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 5) // a Tuesday
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            sender: "cust".to_string(),
            body: "port down".to_string(),
            ticket_refs: vec![],
            language: Language::English,
        };
        let opening =
            ClassifiedMessage::from_raw(&raw, SenderRole::Customer, crate::models::Intent::IssueReport);
        let mut issue = Issue::open(id, opening, Category::PortDown);
        issue.status = status;
        issue.first_response_latency = response_min.map(Duration::minutes);
        issue.resolution_latency = resolution_min.map(Duration::minutes);
        issue
    }

    #[test]
    fn test_empty_issue_set_is_structured_zeroes() {
        let report = aggregate_kpis(&[], &Roster::default(), 0);
        assert_eq!(report.total_issues, 0);
        assert_eq!(report.resolution_rate, 0.0);
        assert_eq!(report.response_rate, 0.0);
        assert!(report.response_latency.is_none());
        assert!(report.category_distribution.is_empty());
        assert_eq!(report.hour_distribution.len(), 24);
    }

    #[test]
    fn test_rates_in_bounds() {
        let issues = vec![
            issue_with(1, IssueStatus::Resolved, Some(3), Some(40)),
            issue_with(2, IssueStatus::Pending, Some(10), None),
            issue_with(3, IssueStatus::NoResponse, None, None),
        ];
        let report = aggregate_kpis(&issues, &Roster::default(), 9);

        assert!((0.0..=100.0).contains(&report.resolution_rate));
        assert!((0.0..=100.0).contains(&report.response_rate));
        assert!((report.resolution_rate - 100.0 / 3.0).abs() < 1e-9);
        assert!((report.response_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.resolved_issues, 1);
        assert_eq!(report.pending_issues, 1);
        assert_eq!(report.no_response_issues, 1);
    }

    #[test]
    fn test_latency_stats_exclude_unset() {
        let issues = vec![
            issue_with(1, IssueStatus::Resolved, Some(2), Some(60)),
            issue_with(2, IssueStatus::Pending, Some(8), None),
            issue_with(3, IssueStatus::NoResponse, None, None),
        ];
        let report = aggregate_kpis(&issues, &Roster::default(), 3);

        let response = report.response_latency.unwrap();
        assert!((response.mean_minutes - 5.0).abs() < 1e-9);
        assert_eq!(response.min_minutes, 2.0);
        assert_eq!(response.max_minutes, 8.0);

        let resolution = report.resolution_latency.unwrap();
        assert_eq!(resolution.mean_minutes, 60.0);
    }

    #[test]
    fn test_response_buckets_boundaries() {
        let mut buckets = ResponseLatencyBuckets::default();
        buckets.record(Duration::minutes(4));
        buckets.record(Duration::minutes(5));
        buckets.record(Duration::minutes(15));
        buckets.record(Duration::minutes(30));
        buckets.record(Duration::minutes(60));
        buckets.record(Duration::minutes(90));

        assert_eq!(buckets.under_5_min, 1);
        assert_eq!(buckets.from_5_to_15_min, 1);
        assert_eq!(buckets.from_15_to_30_min, 1);
        assert_eq!(buckets.from_30_to_60_min, 1);
        assert_eq!(buckets.over_60_min, 2);
    }

    #[test]
    fn test_hour_and_weekday_distribution() {
        let issues = vec![issue_with(1, IssueStatus::Pending, None, None)];
        let report = aggregate_kpis(&issues, &Roster::default(), 1);

        assert_eq!(report.hour_distribution[10], 1);
        assert_eq!(report.hour_distribution.iter().sum::<usize>(), 1);

        // 2024-03-05 is a Tuesday
        let tuesday = &report.weekday_distribution[1];
        assert_eq!(tuesday.weekday, "Tuesday");
        assert_eq!(tuesday.count, 1);
    }

    #[test]
    fn test_support_credited_once_per_issue() {
        let mut issue = issue_with(1, IssueStatus::Resolved, Some(3), Some(20));
        issue.support_participants.insert("omar".to_string());
        let raw = RawMessage {
            timestamp: issue.start_time + Duration::minutes(20),
            sender: "omar".to_string(),
            body: "done".to_string(),
            ticket_refs: vec![],
            language: Language::English,
        };
        issue.messages.push(ClassifiedMessage::from_raw(
            &raw,
            SenderRole::Support,
            Intent::Resolution,
        ));

        let report = aggregate_kpis(&[issue], &Roster::default(), 2);
        assert_eq!(report.support_performance.len(), 1);

        let omar = &report.support_performance[0];
        assert_eq!(omar.issues_handled, 1);
        assert_eq!(omar.responses, 1);
        assert_eq!(omar.resolutions, 1);
        assert!((omar.avg_response_minutes - 3.0).abs() < 1e-9);
    }
}
