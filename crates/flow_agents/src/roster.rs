//! The agent roster.
//!
//! The built-in roster is embedded from `assets/roster.yaml`. It names the
//! seven pipeline agents in order and carries the canned content used when
//! no model is available.

use serde::{Deserialize, Serialize};

use flow_core::{ArtifactKind, Issue};

use crate::error::{AgentError, AgentResult};

const BUILTIN_ROSTER: &str = include_str!("../assets/roster.yaml");

/// One agent in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterEntry {
    pub step: u32,
    pub name: String,
    pub role: String,
    pub color: String,
    /// Deliverable attached to this agent's initial output.
    #[serde(default)]
    pub artifact: Option<ArtifactKind>,
    pub quality_score: f64,
    #[serde(default)]
    pub thoughts: Vec<String>,
    pub output: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    pub refined_output: String,
    #[serde(default)]
    pub validations: Vec<String>,
}

#[derive(Deserialize)]
struct RosterFile {
    agents: Vec<RosterEntry>,
}

/// Ordered list of pipeline agents.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// The embedded seven-agent roster.
    pub fn builtin() -> AgentResult<Self> {
        Self::from_yaml(BUILTIN_ROSTER)
    }

    /// Parse a roster document. Entries are sorted by `step`.
    pub fn from_yaml(source: &str) -> AgentResult<Self> {
        let file: RosterFile = serde_yaml::from_str(source)?;
        if file.agents.is_empty() {
            return Err(AgentError::EmptyRoster);
        }
        let mut entries = file.agents;
        entries.sort_by_key(|e| e.step);
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RosterEntry> {
        self.entries.get(index)
    }

    /// Look up an agent by display name, ignoring case and a trailing "Agent".
    pub fn find(&self, name: &str) -> Option<&RosterEntry> {
        let wanted = short_name(name);
        self.entries.iter().find(|e| short_name(&e.name) == wanted)
    }

    /// The agent that produces `kind` artifacts.
    pub fn producer_of(&self, kind: ArtifactKind) -> Option<(usize, &RosterEntry)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.artifact == Some(kind))
    }
}

fn short_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    lower
        .strip_suffix(" agent")
        .unwrap_or(&lower)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_roster_shape() {
        let roster = Roster::builtin().unwrap();
        assert_eq!(roster.len(), 7);

        let names: Vec<_> = roster.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names[0], "CEO Agent");
        assert_eq!(names[6], "Global Critic Agent");

        let steps: Vec<_> = roster.entries().iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![1, 2, 3, 4, 5, 6, 7]);

        assert_eq!(roster.producer_of(ArtifactKind::Wireframes).unwrap().0, 2);
        assert_eq!(roster.producer_of(ArtifactKind::Frontend).unwrap().0, 3);
        assert_eq!(roster.producer_of(ArtifactKind::Backend).unwrap().0, 4);
    }

    #[test]
    fn test_find_ignores_case_and_suffix() {
        let roster = Roster::builtin().unwrap();
        assert_eq!(roster.find("qa").unwrap().color, "#ec4899");
        assert_eq!(roster.find("ux designer agent").unwrap().step, 3);
        assert!(roster.find("Marketing").is_none());
    }

    #[test]
    fn test_empty_roster_rejected() {
        assert!(matches!(Roster::from_yaml("agents: []"), Err(AgentError::EmptyRoster)));
        assert!(matches!(Roster::from_yaml("agents: 3"), Err(AgentError::Roster(_))));
    }
}
