//! High-level console command dispatcher.
//!
//! This module glues parsed console commands to a recipe session by turning
//! them into sequencer calls. It stays `no_std` friendly so every host can
//! share the same implementation.

use core::fmt;

use crate::observer::TransitionObserver;
use crate::recipes::{ConfigError, Recipe};
use crate::sequencer::{ProgressEvent, StepOutcome, StepSequencer};

use super::catalog::{self, CommandSpec};
use super::grammar::{self, Command, ResetTarget};
use super::status::StatusSnapshot;

/// Command execution successes.
#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum CommandOutcome {
    /// A progress report reached the sequencer.
    Progress {
        event: ProgressEvent,
        outcome: StepOutcome,
    },
    Status(StatusSnapshot),
    Reset {
        target: ResetTarget,
        outcome: StepOutcome,
    },
    Help(HelpTopic),
}

/// What the `help` command asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HelpTopic {
    All,
    Command(&'static CommandSpec),
}

/// Errors surfaced while executing a command.
#[derive(Debug, PartialEq)]
pub enum CommandError<'a> {
    Parse(grammar::ParseError<'a>),
    Unsupported(&'static str),
    Config(ConfigError),
}

impl fmt::Display for CommandError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(err) => err.fmt(f),
            CommandError::Unsupported(what) => write!(f, "unsupported: {what}"),
            CommandError::Config(err) => err.fmt(f),
        }
    }
}

impl<'a> From<grammar::ParseError<'a>> for CommandError<'a> {
    fn from(error: grammar::ParseError<'a>) -> Self {
        Self::Parse(error)
    }
}

impl From<ConfigError> for CommandError<'_> {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

/// Abstraction over recipe sessions driven by the dispatcher.
pub trait ProgressSink {
    fn apply(&mut self, event: ProgressEvent) -> StepOutcome;

    fn status(&self) -> StatusSnapshot;

    /// Starts the loaded recipe over.
    fn restart(&mut self) -> StepOutcome;

    /// Replaces the loaded recipe and starts over.
    fn reset(&mut self, recipe: Recipe) -> StepOutcome;
}

impl<O> ProgressSink for StepSequencer<O>
where
    O: TransitionObserver,
{
    fn apply(&mut self, event: ProgressEvent) -> StepOutcome {
        StepSequencer::apply(self, event)
    }

    fn status(&self) -> StatusSnapshot {
        StatusSnapshot::capture(self)
    }

    fn restart(&mut self) -> StepOutcome {
        StepSequencer::restart(self)
    }

    fn reset(&mut self, recipe: Recipe) -> StepOutcome {
        StepSequencer::reset(self, recipe)
    }
}

impl<T> ProgressSink for &mut T
where
    T: ProgressSink + ?Sized,
{
    fn apply(&mut self, event: ProgressEvent) -> StepOutcome {
        (**self).apply(event)
    }

    fn status(&self) -> StatusSnapshot {
        (**self).status()
    }

    fn restart(&mut self) -> StepOutcome {
        (**self).restart()
    }

    fn reset(&mut self, recipe: Recipe) -> StepOutcome {
        (**self).reset(recipe)
    }
}

/// Dispatches console commands into a recipe session.
pub struct CommandExecutor<S> {
    sink: S,
}

impl<S> CommandExecutor<S> {
    /// Creates a new executor around the provided sink.
    #[must_use]
    pub const fn new(sink: S) -> Self {
        Self { sink }
    }

    /// Returns an immutable reference to the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns a mutable reference to the underlying sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the executor and yields the inner sink.
    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S> CommandExecutor<S>
where
    S: ProgressSink,
{
    /// Parses and executes a console command.
    pub fn execute<'a>(&mut self, line: &'a str) -> Result<CommandOutcome, CommandError<'a>> {
        let command = grammar::parse(line)?;
        self.dispatch(command)
    }

    /// Executes an already parsed command.
    pub fn dispatch<'a>(&mut self, command: Command<'a>) -> Result<CommandOutcome, CommandError<'a>> {
        if let Some(event) = command.progress_event() {
            let outcome = self.sink.apply(event);
            return Ok(CommandOutcome::Progress { event, outcome });
        }

        match command {
            Command::Status => Ok(CommandOutcome::Status(self.sink.status())),
            Command::Reset(target) => {
                let outcome = match target {
                    ResetTarget::Current => self.sink.restart(),
                    ResetTarget::Recipe(kind) => self.sink.reset(kind.recipe()?),
                };
                Ok(CommandOutcome::Reset { target, outcome })
            }
            Command::Help(help) => match help.topic {
                None => Ok(CommandOutcome::Help(HelpTopic::All)),
                Some(topic) => catalog::find(topic)
                    .map(|spec| CommandOutcome::Help(HelpTopic::Command(spec)))
                    .ok_or(CommandError::Unsupported("no such help topic")),
            },
            _ => Err(CommandError::Unsupported("command has no handler")),
        }
    }
}
