use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ThreadlineError;
use crate::models::SenderRole;

/// Known member roles, matched against sender identifiers exactly as they
/// appear in the chat export
///
/// The roster is mutable during a run (inferred senders are merged in) and
/// persisted at the end, so re-runs converge instead of re-guessing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub customers: BTreeSet<String>,
    pub support_staff: BTreeSet<String>,
}

impl Roster {
    /// Load a roster file; a missing file is non-fatal and yields an empty
    /// roster after writing a same-shape template next to the requested
    /// path
    pub fn load_or_template(path: &Path) -> Result<Self> {
        if !path.exists() {
            let template_path = template_path_for(path);
            let template = Roster::default();
            template.save(&template_path)?;
            info!(
                "Roster {:?} not found; wrote template to {:?}, roles will be inferred",
                path, template_path
            );
            return Ok(template);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster: {:?}", path))?;
        let roster =
            serde_json::from_str(&content).map_err(|source| ThreadlineError::MalformedRoster {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(roster)
    }

    /// Persist the roster as JSON with sorted member lists
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize roster")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write roster: {:?}", path))?;
        Ok(())
    }

    /// Exact-match role lookup
    pub fn role_of(&self, sender: &str) -> SenderRole {
        if self.customers.contains(sender) {
            SenderRole::Customer
        } else if self.support_staff.contains(sender) {
            SenderRole::Support
        } else {
            SenderRole::Unknown
        }
    }

    pub fn add(&mut self, sender: &str, role: SenderRole) {
        match role {
            SenderRole::Customer => {
                self.customers.insert(sender.to_string());
            }
            SenderRole::Support => {
                self.support_staff.insert(sender.to_string());
            }
            SenderRole::Unknown => {}
        }
    }

    pub fn len(&self) -> usize {
        self.customers.len() + self.support_staff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty() && self.support_staff.is_empty()
    }
}

fn template_path_for(path: &Path) -> std::path::PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("roster");
    path.with_file_name(format!("{}_template.json", stem))
}
