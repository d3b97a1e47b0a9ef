use std::io::Write;
use std::path::Path;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::assistant::{Assistant, Outcome};
use crate::config::Config;
use crate::countdown::Countdown;
use crate::error::{Error, Result};
use crate::report;
use crate::session::{NewBug, Session};
use crate::severity::Severity;
use crate::suggest::{SuggestedBug, SuggestionClient, validate_component};

const HELP: &str = "\
commands:
  projects                              list projects
  select <project-id>                   switch the active project
  list                                  bugs of the active project, most severe first
  add <severity> <title> | <description>
                                        record a bug (severity: critical, high, medium, low)
  delete <bug-id>                       remove a bug
  suggest <component>                   ask the AI assistant for bug ideas
  suggestions                           show pending suggestions
  accept <n>                            record suggestion n as a Medium bug
  dismiss <n>                           drop suggestion n
  export                                write bug_report_<project-id>.txt
  time                                  show remaining session time
  help                                  show this text
  quit                                  leave the session";

type ClientFactory = Box<dyn Fn(&Config) -> Result<SuggestionClient>>;

/// A suggestion round trip ready to run off the input loop.
pub struct SuggestionJob {
    pub ticket: u64,
    client: SuggestionClient,
    project_url: String,
    component: String,
}

impl SuggestionJob {
    pub fn run(self) -> Result<Vec<SuggestedBug>> {
        self.client.suggest_bugs(&self.project_url, &self.component)
    }
}

pub enum Action {
    Continue,
    Suggest(SuggestionJob),
    Quit,
}

/// Line-oriented front end over a [`Session`] and its [`Assistant`].
pub struct Shell {
    config: Config,
    session: Session,
    assistant: Assistant,
    countdown: Countdown,
    started: Instant,
    client_factory: ClientFactory,
}

impl Shell {
    pub fn new(config: Config) -> Self {
        Self::with_client_factory(config, Box::new(SuggestionClient::from_config))
    }

    pub fn with_client_factory(config: Config, client_factory: ClientFactory) -> Self {
        let session = Session::new(config.projects.clone());
        let countdown = Countdown::new(config.session_seconds);
        Self {
            config,
            session,
            assistant: Assistant::new(),
            countdown,
            started: Instant::now(),
            client_factory,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    pub fn countdown(&mut self) -> Countdown {
        self.countdown.remaining_after(self.started.elapsed());
        self.countdown
    }

    pub fn prompt(&mut self) -> String {
        let countdown = self.countdown();
        let marker = if countdown.is_warning() { "!" } else { "" };
        let project = self.session.selected_project_id().unwrap_or("-");
        let busy = if self.assistant.is_loading() { " (thinking)" } else { "" };
        format!("[{countdown}{marker}] {project}{busy}> ")
    }

    /// Execute one command line.
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<Action> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        debug!(command, "shell command");

        match command {
            "" => {}
            "help" | "?" => writeln!(out, "{HELP}")?,
            "projects" => self.print_projects(out)?,
            "select" => {
                if self.session.select_project(rest) {
                    writeln!(out, "selected {rest}")?;
                    self.print_bugs(out)?;
                } else {
                    writeln!(out, "unknown project: {rest}")?;
                }
            }
            "list" | "ls" => self.print_bugs(out)?,
            "add" => self.add(rest, out)?,
            "delete" | "rm" => {
                if self.session.delete_bug(rest) {
                    writeln!(out, "deleted {rest}")?;
                } else {
                    writeln!(out, "no bug with id {rest}")?;
                }
            }
            "suggest" => return self.suggest(rest, out),
            "suggestions" => self.print_suggestions(out)?,
            "accept" => {
                let id = parse_suggestion_number(rest)?;
                match self.assistant.accept(id, &mut self.session)? {
                    Some(bug) => {
                        writeln!(out, "added {} [{}] {}", bug.id, bug.severity, bug.title)?
                    }
                    None => writeln!(out, "no suggestion {id}")?,
                }
            }
            "dismiss" => {
                let id = parse_suggestion_number(rest)?;
                if self.assistant.dismiss(id) {
                    writeln!(out, "dismissed suggestion {id}")?;
                } else {
                    writeln!(out, "no suggestion {id}")?;
                }
            }
            "export" => self.export(out)?,
            "time" => {
                let countdown = self.countdown();
                let note = if countdown.is_expired() {
                    " (time is up)"
                } else if countdown.is_warning() {
                    " (less than five minutes left)"
                } else {
                    ""
                };
                writeln!(out, "time remaining: {countdown}{note}")?;
            }
            "quit" | "exit" => return Ok(Action::Quit),
            other => writeln!(out, "unknown command: {other} (try `help`)")?,
        }
        Ok(Action::Continue)
    }

    /// Apply the result of a finished suggestion job.
    pub fn complete_suggestion(
        &mut self,
        ticket: u64,
        result: Result<Vec<SuggestedBug>>,
        out: &mut impl Write,
    ) -> Result<()> {
        let active = self.session.selected_project_id().map(str::to_string);
        match self.assistant.finish(ticket, active.as_deref(), result) {
            Ok(Outcome::Applied(0)) => writeln!(out, "no suggestions returned")?,
            Ok(Outcome::Applied(_)) => self.print_suggestions(out)?,
            Ok(Outcome::Discarded { requested_for }) => writeln!(
                out,
                "suggestions for {requested_for} discarded: project changed"
            )?,
            Ok(Outcome::Ignored) => {}
            Err(e @ Error::Configuration(_)) => writeln!(out, "error: {e}")?,
            Err(e) => {
                warn!(error = %e, "suggestion request failed");
                writeln!(out, "failed to fetch suggestions: {e}")?;
            }
        }
        Ok(())
    }

    fn suggest(&mut self, component: &str, out: &mut impl Write) -> Result<Action> {
        let component = validate_component(component)?.to_string();
        let Some(project) = self.session.selected_project().cloned() else {
            writeln!(out, "select a project first")?;
            return Ok(Action::Continue);
        };
        if self.assistant.is_loading() {
            return Err(Error::SuggestionInFlight);
        }
        let client = (self.client_factory)(&self.config)?;
        let request = self.assistant.begin(&project.id)?;
        writeln!(out, "asking for suggestions about \"{component}\" on {}", project.url)?;
        Ok(Action::Suggest(SuggestionJob {
            ticket: request.ticket,
            client,
            project_url: project.url,
            component,
        }))
    }

    fn add(&mut self, args: &str, out: &mut impl Write) -> Result<()> {
        let usage =
            || Error::Validation("usage: add <severity> <title> | <description>".to_string());
        let (severity, rest) = args.split_once(char::is_whitespace).ok_or_else(usage)?;
        let severity: Severity = severity.parse()?;
        let (title, description) = rest.split_once('|').ok_or_else(usage)?;
        let data = NewBug::new(title.trim(), description.trim(), severity);
        match self.session.add_bug(data)? {
            Some(bug) => writeln!(out, "added {} [{}] {}", bug.id, bug.severity, bug.title)?,
            None => writeln!(out, "select a project first")?,
        }
        Ok(())
    }

    fn export(&self, out: &mut impl Write) -> Result<()> {
        let Some(project) = self.session.selected_project() else {
            writeln!(out, "select a project first")?;
            return Ok(());
        };
        let bugs = self.session.visible_bugs(&project.id);
        let path = report::export_report(
            Path::new(&self.config.export_dir),
            project,
            &bugs,
            chrono::Utc::now(),
        )?;
        writeln!(out, "exported {} bug(s) to {}", bugs.len(), path.display())?;
        Ok(())
    }

    fn print_projects(&self, out: &mut impl Write) -> Result<()> {
        let selected = self.session.selected_project_id();
        for project in self.session.projects() {
            let marker = if Some(project.id.as_str()) == selected { "*" } else { " " };
            writeln!(out, "{marker} {:<12} {}  {}", project.id, project.name, project.url)?;
        }
        Ok(())
    }

    fn print_bugs(&self, out: &mut impl Write) -> Result<()> {
        let bugs = self.session.current_bugs();
        if bugs.is_empty() {
            writeln!(out, "no bugs reported yet")?;
        }
        for bug in bugs {
            writeln!(out, "{:<8} {:<8} {}", bug.id, bug.severity, bug.title)?;
            writeln!(out, "{:<17} {}", "", bug.description)?;
        }
        Ok(())
    }

    fn print_suggestions(&self, out: &mut impl Write) -> Result<()> {
        if self.assistant.suggestions().is_empty() {
            writeln!(out, "no suggestions")?;
        }
        for s in self.assistant.suggestions() {
            writeln!(out, "{:>3}. {}", s.id, s.bug.title)?;
            writeln!(out, "     {}", s.bug.description)?;
        }
        Ok(())
    }
}

fn parse_suggestion_number(arg: &str) -> Result<u64> {
    arg.parse()
        .map_err(|_| Error::Validation(format!("expected a suggestion number, got: {arg}")))
}

/// Drive the shell from stdin until `quit` or end of input. A suggestion
/// request runs on the blocking pool while input keeps being read.
pub async fn run(mut shell: Shell) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();
    let mut in_flight: Option<(u64, JoinHandle<Result<Vec<SuggestedBug>>>)> = None;

    writeln!(stdout, "qapad: type `help` for commands")?;
    shell.print_projects(&mut stdout)?;

    loop {
        write!(stdout, "{}", shell.prompt())?;
        stdout.flush()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match shell.handle_line(&line, &mut stdout) {
                    Ok(Action::Continue) => {}
                    Ok(Action::Quit) => break,
                    Ok(Action::Suggest(job)) => {
                        let ticket = job.ticket;
                        in_flight = Some((ticket, tokio::task::spawn_blocking(move || job.run())));
                    }
                    Err(Error::Validation(msg)) => writeln!(stdout, "{msg}")?,
                    Err(e) => writeln!(stdout, "error: {e}")?,
                }
            }
            joined = async {
                match in_flight.as_mut() {
                    Some((_, handle)) => handle.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                let Some((ticket, _)) = in_flight.take() else { continue };
                let result = joined.unwrap_or_else(|e| {
                    Err(Error::SuggestionService(format!("suggestion task failed: {e}")))
                });
                writeln!(stdout)?;
                shell.complete_suggestion(ticket, result, &mut stdout)?;
            }
        }
    }

    if let Some((ticket, _)) = in_flight {
        debug!(ticket, "leaving with a suggestion request pending; its result is dropped");
    }
    Ok(())
}
