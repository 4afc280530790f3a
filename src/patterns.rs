use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ThreadlineError;
use crate::models::Category;

/// An ordered group of phrases in both chat languages
///
/// Matching is case-insensitive substring containment; multi-word idioms
/// are matched as literal substrings, never tokenized or stemmed. Phrases
/// are stored lowercased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeywordSet {
    pub arabic: Vec<String>,
    pub english: Vec<String>,
}

impl KeywordSet {
    fn of(arabic: &[&str], english: &[&str]) -> Self {
        Self {
            arabic: arabic.iter().map(|s| s.to_string()).collect(),
            english: english.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Whether any phrase from either language occurs in the (already
    /// lowercased) body
    pub fn matches(&self, body_lower: &str) -> bool {
        self.arabic
            .iter()
            .chain(self.english.iter())
            .any(|phrase| body_lower.contains(phrase.as_str()))
    }
}

/// Keywords for one issue category; order in the parent list encodes
/// lookup priority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// The multilingual keyword tables driving classification and
/// categorization
///
/// Kept as data rather than code so keyword coverage can be tuned from an
/// external JSON file without touching the segmentation state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    /// Customer issue-report phrases; also used by the role inference
    pub issue_keywords: KeywordSet,
    /// Support acknowledgment phrases
    pub acknowledgment: KeywordSet,
    /// Support resolution/closing phrases
    pub resolution: KeywordSet,
    /// Support request-for-info phrases
    pub request_action: KeywordSet,
    /// Customer follow-up phrases
    pub follow_up: KeywordSet,
    /// Ordered category lookup, first match wins
    pub categories: Vec<CategoryKeywords>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            issue_keywords: KeywordSet::of(
                &[
                    "مشكلة", "عطل", "خطأ", "طفت", "طافي", "طفه", "منقطع",
                    "ماجابه", "ماجابها", "مجابه", "مجابها", "مو شغال", "ما يشتغل",
                    "بوية", "بويه", "بوينت", "بوينتات", "بورت", "بورتات",
                    "قطع", "قطوعات", "لطش", "معلق", "طافيه",
                    "بورتات طفت", "بورتات طافي",
                    "مجابه الزابكس", "ماجابها الزابكس", "ماجابه الزابكس",
                    "قطع ما بين", "قطع مجايبه", "قطوعات مجايبها",
                ],
                &[
                    "issue", "problem", "error", "down", "offline", "not working",
                    "failed", "fault", "port down", "ports down", "link down",
                    "trigger", "alarm", "unknown status", "ticket", "ticketid",
                ],
            ),
            acknowledgment: KeywordSet::of(
                &[
                    "تمام", "باشر", "اوكي", "حاضر", "فهمت", "وصل",
                    "هسه اجيك", "هسه نجيك", "شوفه", "راح اشوف", "دلل",
                    "هسه اشوفها", "هسه اجيكه",
                ],
                &[
                    "ok", "okay", "got it", "noted", "checking", "will check",
                    "looking into",
                ],
            ),
            // Resolution outranks acknowledgment, so phrases that also sit
            // in the acknowledgment group ("ok", "تمام") must not appear
            // here: "ok checking" is an acknowledgment, not a resolution
            resolution: KeywordSet::of(
                &[
                    "تم", "انحل", "اشتغل", "شغال", "كملن", "انتهى", "خلاص",
                    "ضبط", "عاشت ايدك", "وايدك", "تدلل", "ممنون", "شكرا",
                ],
                &[
                    "done", "fixed", "solved", "resolved", "completed",
                    "recheck", "working now", "all good",
                    "thank you", "thanks", "welcome",
                ],
            ),
            request_action: KeywordSet::of(
                &[
                    "ممكن", "بلازحمه", "اذا ممكن", "تقدر", "لو سمحت",
                    "تجيك", "تشوف", "تعدل", "تمسحها", "تلغوها",
                ],
                &["can you", "could you", "please", "would you", "kindly"],
            ),
            follow_up: KeywordSet::of(
                &[
                    "شلونك", "وين وصل", "شنو صار", "كملن", "لسا", "بعد",
                    "شوفت", "انت ذهب", "هسه",
                ],
                &["any update", "status", "what about", "still", "yet"],
            ),
            categories: vec![
                category(Category::ZabbixMonitoring, &[
                    "zabbix", "زابكس", "ماجابه الزابكس", "مجابها الزابكس",
                ]),
                category(Category::PortDown, &[
                    "port", "بورت", "بورتات", "ports down", "link down",
                ]),
                category(Category::Temperature, &[
                    "temperature", "حرارة", "تمبرجر", "trigger",
                ]),
                category(Category::Outage, &[
                    "قطع", "قطوعات", "down", "offline", "طفت", "منقطع",
                ]),
                category(Category::Configuration, &[
                    "edit", "change", "تعديل", "عدل", "oid", "class",
                ]),
                category(Category::Alarm, &["alarm", "الرم", "مشكلة", "error"]),
            ],
        }
    }
}

fn category(category: Category, keywords: &[&str]) -> CategoryKeywords {
    CategoryKeywords {
        category,
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
    }
}

impl PatternConfig {
    /// Load keyword tables from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword file: {:?}", path))?;
        let config =
            serde_json::from_str(&content).map_err(|source| ThreadlineError::MalformedKeywords {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(config)
    }

    /// Assign a category from an opening message body, first match wins
    pub fn categorize(&self, body: &str) -> Category {
        let body_lower = body.to_lowercase();
        for entry in &self.categories {
            if entry.keywords.iter().any(|kw| body_lower.contains(kw.as_str())) {
                return entry.category;
            }
        }
        Category::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_is_substring() {
        let config = PatternConfig::default();
        assert!(config.issue_keywords.matches("the main port down since 9am"));
        assert!(config.issue_keywords.matches("بورتات طفت عندنا"));
        assert!(!config.issue_keywords.matches("good morning"));
    }

    #[test]
    fn test_resolution_group_excludes_acknowledgment_phrases() {
        let config = PatternConfig::default();
        // Phrases shared with the acknowledgment group would shadow it,
        // since resolution is checked first
        assert!(!config.resolution.matches("ok checking"));
        assert!(config.acknowledgment.matches("ok checking"));
        assert!(!config.resolution.english.contains(&"ok".to_string()));
        assert!(!config.resolution.arabic.contains(&"تمام".to_string()));
    }

    #[test]
    fn test_category_priority_order() {
        let config = PatternConfig::default();
        // "zabbix" outranks "down" even though both match
        assert_eq!(
            config.categorize("Zabbix down for site 12"),
            Category::ZabbixMonitoring
        );
        assert_eq!(config.categorize("port down, ticket 1234567"), Category::PortDown);
        assert_eq!(config.categorize("صباح الخير"), Category::Other);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = PatternConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PatternConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.categories.len(), config.categories.len());
        assert_eq!(back.issue_keywords.english, config.issue_keywords.english);
    }
}
