use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::severity::Severity;

/// A target site under test. Fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl Project {
    pub fn new(id: &str, name: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

/// The project set a session starts with when the config names none.
pub fn default_projects() -> Vec<Project> {
    vec![
        Project::new(
            "angelone",
            "Angel One - Reliance",
            "https://www.angelone.in/stocks/reliance-industries-ltd",
        ),
        Project::new(
            "iifl",
            "India Infoline News",
            "https://www.indiainfoline.com/news",
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bug {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

/// User-supplied fields of a bug; id and project are assigned by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBug {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl NewBug {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("bug title must not be empty".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(Error::Validation(
                "bug description must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Hands out `bug-<n>` ids. Monotonic, so ids never repeat within a session
/// no matter how quickly bugs are created.
#[derive(Debug, Default)]
struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("bug-{}", self.next)
    }
}

/// In-memory session state: projects, recorded bugs and the active selection.
#[derive(Debug)]
pub struct Session {
    projects: Vec<Project>,
    bugs: Vec<Bug>,
    selected: Option<String>,
    ids: IdGenerator,
}

impl Session {
    /// Start a session with the first project selected.
    pub fn new(projects: Vec<Project>) -> Self {
        let selected = projects.first().map(|p| p.id.clone());
        Self {
            projects,
            bugs: Vec::new(),
            selected,
            ids: IdGenerator::default(),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn selected_project_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.selected.as_deref().and_then(|id| self.project(id))
    }

    /// Select a project. Unknown ids leave the selection unchanged.
    pub fn select_project(&mut self, id: &str) -> bool {
        if self.project(id).is_none() {
            debug!(project = id, "ignoring selection of unknown project");
            return false;
        }
        self.selected = Some(id.to_string());
        info!(project = id, "project selected");
        true
    }

    /// All recorded bugs in insertion order.
    pub fn bugs(&self) -> &[Bug] {
        &self.bugs
    }

    /// Record a bug against the selected project.
    ///
    /// Returns `Ok(None)` without recording anything when no project is selected.
    pub fn add_bug(&mut self, data: NewBug) -> Result<Option<Bug>> {
        data.validate()?;
        let Some(project_id) = self.selected.clone() else {
            debug!("no project selected, bug not recorded");
            return Ok(None);
        };

        let bug = Bug {
            id: self.ids.next_id(),
            project_id,
            title: data.title,
            description: data.description,
            severity: data.severity,
        };
        info!(id = %bug.id, project = %bug.project_id, severity = %bug.severity, "bug added");
        self.bugs.push(bug.clone());
        Ok(Some(bug))
    }

    /// Remove a bug by id. Returns whether anything was removed.
    pub fn delete_bug(&mut self, id: &str) -> bool {
        let before = self.bugs.len();
        self.bugs.retain(|b| b.id != id);
        let removed = self.bugs.len() != before;
        if removed {
            info!(id, "bug deleted");
        }
        removed
    }

    /// Bugs for one project, most severe first. `sort_by_key` is stable, so
    /// equal severities keep insertion order.
    pub fn visible_bugs(&self, project_id: &str) -> Vec<&Bug> {
        let mut visible: Vec<&Bug> = self
            .bugs
            .iter()
            .filter(|b| b.project_id == project_id)
            .collect();
        visible.sort_by_key(|b| b.severity.rank());
        visible
    }

    /// Visible bugs of the selected project; empty when nothing is selected.
    pub fn current_bugs(&self) -> Vec<&Bug> {
        match self.selected.as_deref() {
            Some(id) => self.visible_bugs(id),
            None => Vec::new(),
        }
    }
}
