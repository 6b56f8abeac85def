#![allow(clippy::module_name_repetitions)]

//! Lexer and parser for the kitchen console.
//!
//! The lexer uses `regal` to produce a bounded token stream and the parser
//! composes `winnow` combinators over those tokens, walking the command
//! tree in [`catalog`](super::catalog) to build structured commands.

use super::catalog::{self, ChoiceBranch, ChoiceTag, CommandTag, Node, ValueSpec};
use core::fmt;
use core::ops::Range;
use core::time::Duration;

use heapless::Vec as HeaplessVec;
use regal::IncrementalError;
use regal::TokenCache;
use regal_macros::RegalLexer;
#[allow(deprecated)]
use winnow::error::ErrorKind;
use winnow::error::{ErrMode, ParserError};
use winnow::prelude::*;
use winnow::stream::Stream;

use crate::recipes::RecipeKind;
use crate::sequencer::ProgressEvent;

/// Maximum number of tokens produced per console line.
pub const MAX_TOKENS: usize = 16;
const MAX_CACHE_RECORDS: usize = MAX_TOKENS * 2;

/// Lexical token kinds recognized by the console grammar.
#[derive(RegalLexer, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Duration literal: `250ms`, `2s` or `1.5s`.
    #[regex(r"[0-9]+(?:ms|s|[.][0-9]+s)", priority = 2)]
    Duration,
    /// Unsuffixed integer literal.
    #[regex(r"[0-9]+")]
    Integer,
    /// Identifier or keyword (case-insensitive match performed later).
    #[regex(r"[A-Za-z][A-Za-z0-9-]*")]
    Ident,
    /// Inline whitespace is ignored.
    #[regex(r"[ \t]+", skip)]
    Whitespace,
    /// End-of-line token (`\r`, `\n`, or `\r\n`).
    #[token("\r\n")]
    #[token("\n")]
    #[token("\r")]
    Eol,
    /// Pseudo variant used when the lexer encounters unsupported input.
    #[default]
    #[regex(r".", priority = 1024)]
    Error,
}

/// Token emitted by the lexer with a byte span back into the source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub lexeme: &'a str,
    pub span: Range<usize>,
}

/// Bounded token buffer.
pub type TokenBuffer<'a> = HeaplessVec<Token<'a>, MAX_TOKENS>;

/// Lexer errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// Input produced more tokens than the static buffer allows.
    TooManyTokens { processed: usize },
    /// Underlying lexer reported an unrecoverable error.
    Engine,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens { processed } => {
                write!(f, "token buffer exhausted after {processed} items")
            }
            LexError::Engine => write!(f, "lexer engine error"),
        }
    }
}

/// Grammar errors emitted by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GrammarErrorKind<'a> {
    UnexpectedToken {
        expected: &'static str,
        found: Option<TokenKind>,
        span: Range<usize>,
    },
    UnexpectedEnd {
        expected: &'static str,
    },
    InvalidDuration {
        span: Range<usize>,
    },
    InvalidToken {
        span: Range<usize>,
        lexeme: &'a str,
    },
}

impl fmt::Display for GrammarErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarErrorKind::UnexpectedToken {
                expected,
                found,
                span,
            } => write!(f, "expected {expected}, found {found:?} at {span:?}"),
            GrammarErrorKind::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of input, expected {expected}")
            }
            GrammarErrorKind::InvalidDuration { span } => {
                write!(f, "invalid duration literal at {span:?}")
            }
            GrammarErrorKind::InvalidToken { span, lexeme } => {
                write!(f, "unsupported token `{lexeme}` at {span:?}")
            }
        }
    }
}

/// Wrapper type enabling a consistent error surface for consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrammarError<'a> {
    pub kind: GrammarErrorKind<'a>,
}

impl fmt::Display for GrammarError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl<'a> GrammarError<'a> {
    fn unexpected(expected: &'static str, token: Option<&Token<'a>>) -> Self {
        GrammarError {
            kind: match token {
                Some(tok) => GrammarErrorKind::UnexpectedToken {
                    expected,
                    found: Some(tok.kind),
                    span: tok.span.clone(),
                },
                None => GrammarErrorKind::UnexpectedEnd { expected },
            },
        }
    }

    fn invalid_duration(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidDuration {
                span: token.span.clone(),
            },
        }
    }

    fn invalid_token(token: &Token<'a>) -> Self {
        GrammarError {
            kind: GrammarErrorKind::InvalidToken {
                span: token.span.clone(),
                lexeme: token.lexeme,
            },
        }
    }
}

type Input<'src, 'slice> = &'slice [Token<'src>];

#[allow(deprecated)]
impl<'src, 'slice> ParserError<Input<'src, 'slice>> for GrammarError<'src>
where
    'src: 'slice,
{
    fn from_error_kind(input: &Input<'src, 'slice>, _kind: ErrorKind) -> Self {
        GrammarError::unexpected("token", input.first())
    }

    fn append(
        self,
        _input: &Input<'src, 'slice>,
        _token_start: &<Input<'src, 'slice> as Stream>::Checkpoint,
        _kind: ErrorKind,
    ) -> Self {
        self
    }

    fn or(self, other: Self) -> Self {
        other
    }
}

/// Combined lex/parse error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError<'a> {
    Lex(LexError),
    Grammar(GrammarError<'a>),
}

impl fmt::Display for ParseError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(err) => err.fmt(f),
            ParseError::Grammar(err) => err.fmt(f),
        }
    }
}

/// Structured commands produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Instant,
    Action(ActionCommand),
    Timer(TimerCommand),
    Tick(Duration),
    Complete,
    Status,
    Reset(ResetTarget),
    Help(HelpCommand<'a>),
}

impl Command<'_> {
    /// The progress event this command feeds the sequencer, if any.
    #[must_use]
    pub fn progress_event(&self) -> Option<ProgressEvent> {
        match self {
            Command::Instant => Some(ProgressEvent::InstantAction),
            Command::Action(ActionCommand::Add) => Some(ProgressEvent::Action),
            Command::Action(ActionCommand::Undo) => Some(ProgressEvent::ActionUndo),
            Command::Timer(TimerCommand::Start) => Some(ProgressEvent::TimerStart),
            Command::Timer(TimerCommand::Stop) => Some(ProgressEvent::TimerStop),
            Command::Tick(delta) => Some(ProgressEvent::Tick(*delta)),
            Command::Complete => Some(ProgressEvent::CompleteStep),
            Command::Status | Command::Reset(_) | Command::Help(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionCommand {
    Add,
    Undo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Stop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetTarget {
    /// Start the loaded recipe over.
    Current,
    /// Switch to a built-in recipe.
    Recipe(RecipeKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelpCommand<'a> {
    pub topic: Option<&'a str>,
}

pub(crate) fn parse_tokens_partial<'src, 'slice>(
    tokens: &'slice [Token<'src>],
) -> Result<(Command<'src>, &'slice [Token<'src>]), GrammarError<'src>>
where
    'src: 'slice,
{
    let mut input = tokens;
    match command().parse_next(&mut input) {
        Ok(cmd) => Ok((cmd, input)),
        Err(ErrMode::Backtrack(err) | ErrMode::Cut(err)) => Err(err),
        Err(ErrMode::Incomplete(_)) => Err(GrammarError::unexpected("token", input.first())),
    }
}

/// Tokenize the provided line.
pub fn lex(line: &str) -> Result<TokenBuffer<'_>, LexError> {
    let compiled = TokenKind::lexer();
    let mut cache: TokenCache<TokenKind, MAX_CACHE_RECORDS> = TokenCache::new();
    let partial = cache
        .rebuild(compiled, line)
        .map_err(map_incremental_error)?;
    let mut buffer = TokenBuffer::new();

    for record in cache.tokens() {
        if record.skipped {
            continue;
        }

        let span = record.start..record.end;
        let lexeme = &line[span.clone()];
        push_token(
            &mut buffer,
            Token {
                kind: record.token,
                lexeme,
                span,
            },
        )?;
    }

    if let Some(partial) = partial.filter(|partial| !partial.fragment.is_empty()) {
        let start = partial.start;
        let end = start + partial.fragment.len();
        push_token(
            &mut buffer,
            Token {
                kind: TokenKind::Error,
                lexeme: partial.fragment,
                span: start..end,
            },
        )?;
    }

    Ok(buffer)
}

fn push_token<'a>(buffer: &mut TokenBuffer<'a>, token: Token<'a>) -> Result<(), LexError> {
    buffer.push(token).map_err(|_| LexError::TooManyTokens {
        processed: MAX_TOKENS + 1,
    })
}

fn map_incremental_error(error: IncrementalError) -> LexError {
    match error {
        IncrementalError::TokenOverflow => LexError::TooManyTokens {
            processed: MAX_TOKENS,
        },
        _ => LexError::Engine,
    }
}

/// Parse a console command from the provided line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<'_>> {
    let tokens = lex(line).map_err(ParseError::Lex)?;

    if let Some(token) = tokens.iter().find(|token| token.kind == TokenKind::Error) {
        return Err(ParseError::Grammar(GrammarError::invalid_token(token)));
    }

    let (command, mut rest) =
        parse_tokens_partial(tokens.as_slice()).map_err(ParseError::Grammar)?;

    while let Some((token, remaining)) = rest.split_first() {
        if token.kind == TokenKind::Eol {
            rest = remaining;
        } else {
            return Err(ParseError::Grammar(GrammarError::unexpected(
                "end of command",
                Some(token),
            )));
        }
    }

    Ok(command)
}

fn command<'src, 'slice>() -> impl Parser<Input<'src, 'slice>, Command<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| {
        let snapshot = *input;
        let command_token = expect_kind(TokenKind::Ident, "command keyword").parse_next(input)?;

        if let Some(spec) = catalog::find(command_token.lexeme) {
            let mut state = CommandState::new(spec.tag);
            parse_node(spec.grammar, input, &mut state)?;
            state.finish()
        } else {
            *input = snapshot;
            Err(ErrMode::Backtrack(GrammarError::unexpected(
                "command keyword",
                Some(&command_token),
            )))
        }
    }
}

fn parse_node<'src, 'slice>(
    node: &'static Node,
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match node {
        Node::End => Ok(()),
        Node::OptionalChoice { choices, default } => {
            parse_optional_choice(input, choices, *default, state)
        }
        Node::Value { value, next } => {
            parse_value(input, *value, state)?;
            parse_node(next, input, state)
        }
        Node::Topic { next } => {
            parse_topic(input, state)?;
            parse_node(next, input, state)
        }
    }
}

fn parse_optional_choice<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    choices: &'static [ChoiceBranch],
    default: Option<ChoiceTag>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            if let Some(branch) = find_choice(choices, token.lexeme) {
                *input = rest;
                state.apply_choice(branch.tag)
            } else {
                Err(ErrMode::Backtrack(GrammarError::unexpected(
                    choice_expected_label(choices),
                    Some(token),
                )))
            }
        }
        Some((token, _)) if token.kind != TokenKind::Eol => Err(ErrMode::Backtrack(
            GrammarError::unexpected(choice_expected_label(choices), Some(token)),
        )),
        _ => match default {
            Some(tag) => state.apply_choice(tag),
            None => Ok(()),
        },
    }
}

fn parse_topic<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    state.set_topic(None);

    match input.split_first() {
        Some((token, rest)) if token.kind == TokenKind::Ident => {
            state.set_topic(Some(token.lexeme));
            *input = rest;
            Ok(())
        }
        Some((token, _)) if token.kind != TokenKind::Eol => Err(ErrMode::Backtrack(
            GrammarError::unexpected("identifier", Some(token)),
        )),
        _ => Ok(()),
    }
}

fn parse_value<'src, 'slice>(
    input: &mut Input<'src, 'slice>,
    spec: ValueSpec,
    state: &mut CommandState<'src>,
) -> Result<(), ErrMode<GrammarError<'src>>>
where
    'src: 'slice,
{
    match spec {
        ValueSpec::Duration => {
            let duration_token = expect_kind(TokenKind::Duration, "duration").parse_next(input)?;
            let duration = parse_duration(&duration_token).map_err(ErrMode::Cut)?;
            state.set_duration(duration);
            Ok(())
        }
    }
}

fn find_choice(choices: &'static [ChoiceBranch], lexeme: &str) -> Option<&'static ChoiceBranch> {
    choices
        .iter()
        .find(|choice| choice.keyword.eq_ignore_ascii_case(lexeme))
}

fn choice_expected_label(choices: &'static [ChoiceBranch]) -> &'static str {
    choices.first().map_or("keyword", |choice| choice.keyword)
}

enum CommandState<'a> {
    Instant,
    Action { action: Option<ActionCommand> },
    Timer { action: Option<TimerCommand> },
    Tick { delta: Option<Duration> },
    Complete,
    Status,
    Reset { target: Option<ResetTarget> },
    Help { topic: Option<&'a str> },
}

impl<'a> CommandState<'a> {
    fn new(tag: CommandTag) -> Self {
        match tag {
            CommandTag::Instant => CommandState::Instant,
            CommandTag::Action => CommandState::Action { action: None },
            CommandTag::Timer => CommandState::Timer { action: None },
            CommandTag::Tick => CommandState::Tick { delta: None },
            CommandTag::Complete => CommandState::Complete,
            CommandTag::Status => CommandState::Status,
            CommandTag::Reset => CommandState::Reset { target: None },
            CommandTag::Help => CommandState::Help { topic: None },
        }
    }

    fn apply_choice(&mut self, tag: ChoiceTag) -> Result<(), ErrMode<GrammarError<'a>>> {
        match (self, tag) {
            (CommandState::Action { action }, ChoiceTag::ActionAdd) => {
                *action = Some(ActionCommand::Add);
            }
            (CommandState::Action { action }, ChoiceTag::ActionUndo) => {
                *action = Some(ActionCommand::Undo);
            }
            (CommandState::Timer { action }, ChoiceTag::TimerStart) => {
                *action = Some(TimerCommand::Start);
            }
            (CommandState::Timer { action }, ChoiceTag::TimerStop) => {
                *action = Some(TimerCommand::Stop);
            }
            (CommandState::Reset { target }, ChoiceTag::ResetCurrent) => {
                *target = Some(ResetTarget::Current);
            }
            (CommandState::Reset { target }, ChoiceTag::ResetJollof) => {
                *target = Some(ResetTarget::Recipe(RecipeKind::JollofRice));
            }
            (CommandState::Reset { target }, ChoiceTag::ResetFufu) => {
                *target = Some(ResetTarget::Recipe(RecipeKind::Fufu));
            }
            _ => {
                return Err(ErrMode::Backtrack(GrammarError::unexpected("choice", None)));
            }
        }
        Ok(())
    }

    fn set_duration(&mut self, duration: Duration) {
        if let CommandState::Tick { delta } = self {
            *delta = Some(duration);
        }
    }

    fn set_topic(&mut self, topic: Option<&'a str>) {
        if let CommandState::Help { topic: slot } = self {
            *slot = topic;
        }
    }

    fn finish(self) -> Result<Command<'a>, ErrMode<GrammarError<'a>>> {
        match self {
            CommandState::Instant => Ok(Command::Instant),
            CommandState::Action {
                action: Some(action),
            } => Ok(Command::Action(action)),
            CommandState::Timer {
                action: Some(action),
            } => Ok(Command::Timer(action)),
            CommandState::Tick { delta: Some(delta) } => Ok(Command::Tick(delta)),
            CommandState::Complete => Ok(Command::Complete),
            CommandState::Status => Ok(Command::Status),
            CommandState::Reset {
                target: Some(target),
            } => Ok(Command::Reset(target)),
            CommandState::Help { topic } => Ok(Command::Help(HelpCommand { topic })),
            CommandState::Action { action: None } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("action argument", None),
            )),
            CommandState::Timer { action: None } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("start or stop", None),
            )),
            CommandState::Tick { delta: None } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("duration", None),
            )),
            CommandState::Reset { target: None } => Err(ErrMode::Backtrack(
                GrammarError::unexpected("reset target", None),
            )),
        }
    }
}

fn expect_kind<'src, 'slice>(
    kind: TokenKind,
    label: &'static str,
) -> impl Parser<Input<'src, 'slice>, Token<'src>, GrammarError<'src>>
where
    'src: 'slice,
{
    move |input: &mut Input<'src, 'slice>| match input.split_first() {
        Some((token, rest)) if token.kind == kind => {
            *input = rest;
            Ok(token.clone())
        }
        Some((token, _)) => Err(ErrMode::Backtrack(GrammarError::unexpected(
            label,
            Some(token),
        ))),
        None => Err(ErrMode::Backtrack(GrammarError::unexpected(label, None))),
    }
}

/// Accepts `250ms`, `2s` and up to millisecond precision in `1.5s`.
fn parse_duration<'a>(token: &Token<'a>) -> Result<Duration, GrammarError<'a>> {
    let text = token.lexeme;
    let invalid = || GrammarError::invalid_duration(token);

    if let Some(rest) = text.strip_suffix("ms") {
        let millis = rest.parse::<u64>().map_err(|_| invalid())?;
        return Ok(Duration::from_millis(millis));
    }

    let Some(rest) = text.strip_suffix('s') else {
        return Err(invalid());
    };

    match rest.split_once('.') {
        None => {
            let seconds = rest.parse::<u64>().map_err(|_| invalid())?;
            Ok(Duration::from_secs(seconds))
        }
        Some((whole, fraction)) => {
            if fraction.is_empty() || fraction.len() > 3 {
                return Err(invalid());
            }
            let seconds = whole.parse::<u64>().map_err(|_| invalid())?;
            let digits = fraction.parse::<u64>().map_err(|_| invalid())?;
            let scale = match fraction.len() {
                1 => 100,
                2 => 10,
                _ => 1,
            };
            Ok(Duration::from_secs(seconds) + Duration::from_millis(digits * scale))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Command<'_> {
        parse(input).expect("command should parse")
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_ok("instant"), Command::Instant);
        assert_eq!(parse_ok("complete"), Command::Complete);
        assert_eq!(parse_ok("status"), Command::Status);
    }

    #[test]
    fn action_defaults_to_add() {
        assert_eq!(parse_ok("action"), Command::Action(ActionCommand::Add));
        assert_eq!(parse_ok("action undo"), Command::Action(ActionCommand::Undo));
        assert_eq!(parse_ok("action add\n"), Command::Action(ActionCommand::Add));
    }

    #[test]
    fn timer_requires_a_direction() {
        assert_eq!(parse_ok("timer start"), Command::Timer(TimerCommand::Start));
        assert_eq!(parse_ok("timer stop"), Command::Timer(TimerCommand::Stop));
        assert!(matches!(parse("timer"), Err(ParseError::Grammar(_))));
    }

    #[test]
    fn parses_tick_durations() {
        assert_eq!(
            parse_ok("tick 250ms"),
            Command::Tick(Duration::from_millis(250))
        );
        assert_eq!(parse_ok("tick 2s"), Command::Tick(Duration::from_secs(2)));
        assert_eq!(
            parse_ok("tick 1.5s"),
            Command::Tick(Duration::from_millis(1_500))
        );
        assert_eq!(
            parse_ok("tick 0.25s"),
            Command::Tick(Duration::from_millis(250))
        );
    }

    #[test]
    fn tick_rejects_bare_integers() {
        match parse("tick 5") {
            Err(ParseError::Grammar(err)) => assert!(matches!(
                err.kind,
                GrammarErrorKind::UnexpectedToken {
                    expected: "duration",
                    found: Some(TokenKind::Integer),
                    ..
                }
            )),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn reset_targets() {
        assert_eq!(parse_ok("reset"), Command::Reset(ResetTarget::Current));
        assert_eq!(
            parse_ok("reset jollof"),
            Command::Reset(ResetTarget::Recipe(RecipeKind::JollofRice))
        );
        assert_eq!(
            parse_ok("reset FUFU"),
            Command::Reset(ResetTarget::Recipe(RecipeKind::Fufu))
        );
        assert!(parse("reset egusi").is_err());
    }

    #[test]
    fn parses_help_topic() {
        assert_eq!(
            parse_ok("help tick"),
            Command::Help(HelpCommand { topic: Some("tick") })
        );
        assert_eq!(parse_ok("help"), Command::Help(HelpCommand { topic: None }));
    }

    #[test]
    fn rejects_invalid_token() {
        match parse("complete$") {
            Err(ParseError::Grammar(err)) => {
                assert!(matches!(err.kind, GrammarErrorKind::InvalidToken { .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn rejects_trailing_words() {
        assert!(matches!(
            parse("status please"),
            Err(ParseError::Grammar(GrammarError {
                kind: GrammarErrorKind::UnexpectedToken {
                    expected: "end of command",
                    ..
                }
            }))
        ));
    }

    #[test]
    fn supports_case_insensitive_keywords() {
        assert_eq!(parse_ok("TiMeR StArT"), Command::Timer(TimerCommand::Start));
    }

    #[test]
    fn commands_map_to_progress_events() {
        assert_eq!(
            parse_ok("action undo").progress_event(),
            Some(ProgressEvent::ActionUndo)
        );
        assert_eq!(parse_ok("status").progress_event(), None);
    }

    #[test]
    fn lexer_emits_error_token_for_unknown_symbol() {
        let tokens = lex("instant$").expect("lexing should succeed");
        let last = tokens.last().expect("expected at least one token");
        assert_eq!(last.kind, TokenKind::Error);
        assert_eq!(last.lexeme, "$");
    }
}
