pub mod error;
pub mod io;
pub mod models;
pub mod patterns;
pub mod stages;

pub use error::ThreadlineError;
pub use io::{
    parse_transcript, parse_transcript_file, render_text_report, write_text_report,
    AnalysisReport, Diagnostics, IssueRecord, ParseOutcome, Roster,
};
pub use models::{
    Category, ClassifiedMessage, Intent, Issue, IssueStatus, Language, RawMessage, SenderRole,
};
pub use patterns::{KeywordSet, PatternConfig};
pub use stages::{
    aggregate_kpis, classify_messages, resolve_roles, segment_messages, KpiReport,
    RoleResolution, SegmentationResult, Segmenter, SegmenterConfig,
};
