use std::cell::{Ref, RefCell};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant as HostInstant};

use recipe_core::console::catalog::{self, CommandSpec};
use recipe_core::console::commands::{CommandError, CommandExecutor, CommandOutcome, HelpTopic};
use recipe_core::console::grammar::ResetTarget;
use recipe_core::console::status::{StatusFormatter, StatusSnapshot};
use recipe_core::journal::TransitionJournal;
use recipe_core::observer::{ObserverFault, ObserverList, TransitionObserver};
use recipe_core::recipes::{Recipe, StepDefinition};
use recipe_core::sequencer::{NoChange, ProgressEvent, StepOutcome, StepSequencer};

/// One interactive recipe session: console, narration and transcript.
pub struct Session {
    executor: CommandExecutor<StepSequencer<ObserverList>>,
    narrator: Rc<RefCell<Narrator>>,
    journal: Rc<RefCell<TransitionJournal>>,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

impl Session {
    pub fn new(recipe: Recipe, transcript: Option<&Path>) -> io::Result<Self> {
        let transcript = transcript
            .map(|path| TranscriptLogger::create(path, recipe.name()))
            .transpose()?;

        let narrator = Rc::new(RefCell::new(Narrator::default()));
        let journal = Rc::new(RefCell::new(TransitionJournal::new()));
        let mut observers = ObserverList::new();
        observers.subscribe(Rc::clone(&narrator));
        observers.subscribe(Rc::clone(&journal));

        Ok(Self {
            executor: CommandExecutor::new(StepSequencer::with_observers(recipe, observers)),
            narrator,
            journal,
            transcript,
            started_at: HostInstant::now(),
        })
    }

    /// Announces the first step. Call once before feeding commands.
    pub fn start(&mut self) -> io::Result<Vec<String>> {
        let elapsed = self.started_at.elapsed();
        self.executor.sink_mut().announce_current_step();
        let mut lines = vec![format!(
            "Cooking {} ({} steps).",
            self.sequencer().recipe().name(),
            self.sequencer().recipe().len()
        )];
        lines.extend(self.take_narration());
        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Host, trimmed)?;
        }

        let mut lines = match self.executor.execute(trimmed) {
            Ok(CommandOutcome::Progress { event, outcome }) => self.describe_progress(event, outcome),
            Ok(CommandOutcome::Status(snapshot)) => status_lines(&snapshot),
            Ok(CommandOutcome::Reset { target, .. }) => {
                let name = self.sequencer().recipe().name();
                match target {
                    ResetTarget::Current => vec![format!("Restarting {name}.")],
                    ResetTarget::Recipe(_) => vec![format!("Switched to {name}.")],
                }
            }
            Ok(CommandOutcome::Help(topic)) => help_lines(topic),
            Err(CommandError::Parse(err)) => vec![format!("ERR syntax {err}")],
            Err(CommandError::Unsupported(what)) => vec![format!("ERR unsupported {what}")],
            Err(CommandError::Config(err)) => vec![format!("ERR config {err}")],
        };
        lines.extend(self.take_narration());

        self.record_output(elapsed, &lines)?;
        Ok(lines)
    }

    pub fn sequencer(&self) -> &StepSequencer<ObserverList> {
        self.executor.sink()
    }

    pub fn journal(&self) -> Ref<'_, TransitionJournal> {
        self.journal.borrow()
    }

    pub fn is_complete(&self) -> bool {
        self.sequencer().is_complete()
    }

    fn describe_progress(&self, event: ProgressEvent, outcome: StepOutcome) -> Vec<String> {
        match outcome {
            StepOutcome::Unchanged(reason) => {
                vec![format!("ignored {}: {}", event_label(event), describe_no_change(reason))]
            }
            StepOutcome::Progressed => {
                let snapshot = StatusSnapshot::capture(self.sequencer());
                let mut line = String::from("ok ");
                match StatusFormatter::new(&snapshot).write_progress_line(&mut line) {
                    Ok(()) => vec![line],
                    Err(_) => vec![String::from("ok")],
                }
            }
            StepOutcome::Advanced { .. } | StepOutcome::RecipeComplete => Vec::new(),
        }
    }

    fn take_narration(&mut self) -> Vec<String> {
        let step_count = self.sequencer().recipe().len();
        self.narrator
            .borrow_mut()
            .drain()
            .map(|narration| narration.render(step_count))
            .collect()
    }

    fn record_output(&mut self, elapsed: Duration, lines: &[String]) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(elapsed, TranscriptRole::Simulator, line)?;
            }
        }
        Ok(())
    }
}

enum Narration {
    Entered {
        index: usize,
        id: String,
        utensil: String,
        description: String,
        effect: Option<String>,
    },
    Complete,
}

impl Narration {
    fn render(&self, step_count: usize) -> String {
        match self {
            Narration::Entered {
                index,
                id,
                utensil,
                description,
                effect,
            } => {
                let mut line = format!(
                    "-> step {}/{step_count} {id} [{utensil}] {description}",
                    index + 1
                );
                if let Some(effect) = effect {
                    line.push_str(" effect=");
                    line.push_str(effect);
                }
                line
            }
            Narration::Complete => String::from("** recipe complete"),
        }
    }
}

/// Collects transitions until the session renders them.
#[derive(Default)]
struct Narrator {
    pending: Vec<Narration>,
}

impl Narrator {
    fn drain(&mut self) -> std::vec::Drain<'_, Narration> {
        self.pending.drain(..)
    }
}

impl TransitionObserver for Narrator {
    fn on_step_entered(&mut self, index: usize, step: &StepDefinition) -> Result<(), ObserverFault> {
        self.pending.push(Narration::Entered {
            index,
            id: step.id.as_str().to_owned(),
            utensil: step.utensil.as_str().to_owned(),
            description: step.description.as_str().to_owned(),
            effect: step
                .side_effect
                .as_ref()
                .map(|effect| effect.as_str().to_owned()),
        });
        Ok(())
    }

    fn on_recipe_complete(&mut self) -> Result<(), ObserverFault> {
        self.pending.push(Narration::Complete);
        Ok(())
    }
}

fn event_label(event: ProgressEvent) -> &'static str {
    match event {
        ProgressEvent::InstantAction => "instant",
        ProgressEvent::Action => "action",
        ProgressEvent::ActionUndo => "action undo",
        ProgressEvent::TimerStart => "timer start",
        ProgressEvent::TimerStop => "timer stop",
        ProgressEvent::Tick(_) => "tick",
        ProgressEvent::CompleteStep => "complete",
    }
}

fn describe_no_change(reason: NoChange) -> &'static str {
    match reason {
        NoChange::Terminal => "recipe already complete",
        NoChange::PolicyMismatch => "does not fit the current step",
        NoChange::AlreadyRunning => "timer already running",
        NoChange::NotRunning => "timer not running",
        NoChange::AtFloor => "no actions to undo",
        NoChange::Idle => "no timer counting",
    }
}

fn status_lines(snapshot: &StatusSnapshot) -> Vec<String> {
    let mut text = String::new();
    if StatusFormatter::new(snapshot).write_all(&mut text).is_err() {
        return vec![String::from("ERR status unavailable")];
    }
    text.lines().map(str::to_owned).collect()
}

fn help_lines(topic: HelpTopic) -> Vec<String> {
    match topic {
        HelpTopic::All => {
            let mut lines = vec![String::from("Commands:")];
            lines.extend(catalog::commands().iter().map(help_line));
            lines
        }
        HelpTopic::Command(spec) => vec![help_line(spec)],
    }
}

fn help_line(spec: &CommandSpec) -> String {
    format!("  {:<28} - {}", spec.usage, spec.summary)
}

struct TranscriptLogger {
    writer: BufWriter<fs::File>,
}

impl TranscriptLogger {
    fn create(path: &Path, recipe: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header(recipe)?;
        Ok(logger)
    }

    fn write_header(&mut self, recipe: &str) -> io::Result<()> {
        writeln!(self.writer, "# Recipe simulator transcript: {recipe}")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Simulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Simulator => "SIM <",
        }
    }
}
