use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::session::{Bug, NewBug, Session};
use crate::severity::Severity;
use crate::suggest::SuggestedBug;

/// A suggestion held by the assistant, with an identity that survives
/// duplicate titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: u64,
    pub bug: SuggestedBug,
}

/// Ticket for an outstanding suggestion request, tagged with the project that
/// was active when the request started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub ticket: u64,
    pub project_id: String,
}

/// What happened to a finished request.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Suggestions were stored; carries how many.
    Applied(usize),
    /// The active project changed while the request was in flight.
    Discarded { requested_for: String },
    /// The ticket does not match the outstanding request.
    Ignored,
}

/// Transient suggestion state: the current candidates and at most one
/// in-flight request. Nothing here is written to the session until a
/// suggestion is accepted.
#[derive(Debug, Default)]
pub struct Assistant {
    suggestions: Vec<Suggestion>,
    pending: Option<PendingRequest>,
    next_ticket: u64,
    next_suggestion: u64,
}

impl Assistant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// Start a request for `project_id`. Clears previous suggestions.
    pub fn begin(&mut self, project_id: &str) -> Result<PendingRequest> {
        if self.pending.is_some() {
            return Err(Error::SuggestionInFlight);
        }
        self.next_ticket += 1;
        let request = PendingRequest {
            ticket: self.next_ticket,
            project_id: project_id.to_string(),
        };
        self.suggestions.clear();
        self.pending = Some(request.clone());
        Ok(request)
    }

    /// Complete the request identified by `ticket`.
    ///
    /// Results for a project that is no longer active are dropped. Service
    /// errors are returned so the caller can show them; the busy flag is
    /// cleared either way.
    pub fn finish(
        &mut self,
        ticket: u64,
        active_project: Option<&str>,
        result: Result<Vec<SuggestedBug>>,
    ) -> Result<Outcome> {
        let request = match self.pending.take() {
            Some(p) if p.ticket == ticket => p,
            other => {
                self.pending = other;
                warn!(ticket, "ignoring completion for unknown suggestion request");
                return Ok(Outcome::Ignored);
            }
        };

        let bugs = result?;
        if active_project != Some(request.project_id.as_str()) {
            info!(
                requested_for = %request.project_id,
                active = active_project.unwrap_or("<none>"),
                "discarding suggestions for a project that is no longer selected"
            );
            return Ok(Outcome::Discarded {
                requested_for: request.project_id,
            });
        }

        let count = bugs.len();
        for bug in bugs {
            self.next_suggestion += 1;
            self.suggestions.push(Suggestion {
                id: self.next_suggestion,
                bug,
            });
        }
        Ok(Outcome::Applied(count))
    }

    /// Promote a suggestion to a Medium bug on the selected project and drop
    /// it from the list.
    ///
    /// Returns `Ok(None)` when the id is unknown or no project is selected; in
    /// the latter case the suggestion is kept.
    pub fn accept(&mut self, id: u64, session: &mut Session) -> Result<Option<Bug>> {
        let Some(pos) = self.suggestions.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        let suggestion = &self.suggestions[pos].bug;
        let data = NewBug::new(
            suggestion.title.clone(),
            suggestion.description.clone(),
            Severity::Medium,
        );
        let created = session.add_bug(data)?;
        if created.is_some() {
            self.suggestions.remove(pos);
        }
        Ok(created)
    }

    /// Drop a suggestion without recording it.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.suggestions.len();
        self.suggestions.retain(|s| s.id != id);
        self.suggestions.len() != before
    }
}
