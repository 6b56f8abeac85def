//! Console command catalog expressed as a small grammar tree.
//!
//! The parser walks these nodes and the help output reads the same table,
//! so keywords, defaults and usage strings cannot drift apart.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Instant,
    Action,
    Timer,
    Tick,
    Complete,
    Status,
    Reset,
    Help,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceTag {
    ActionAdd,
    ActionUndo,
    TimerStart,
    TimerStop,
    ResetCurrent,
    ResetJollof,
    ResetFufu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueSpec {
    Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub grammar: &'static Node,
    pub usage: &'static str,
    pub summary: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    End,
    OptionalChoice {
        choices: &'static [ChoiceBranch],
        default: Option<ChoiceTag>,
    },
    Value {
        value: ValueSpec,
        next: &'static Node,
    },
    Topic {
        next: &'static Node,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChoiceBranch {
    pub keyword: &'static str,
    pub tag: ChoiceTag,
}

const END: Node = Node::End;

const ACTION_CHOICES: [ChoiceBranch; 2] = [
    ChoiceBranch {
        keyword: "add",
        tag: ChoiceTag::ActionAdd,
    },
    ChoiceBranch {
        keyword: "undo",
        tag: ChoiceTag::ActionUndo,
    },
];

const ACTION_GRAMMAR: Node = Node::OptionalChoice {
    choices: &ACTION_CHOICES,
    default: Some(ChoiceTag::ActionAdd),
};

const TIMER_CHOICES: [ChoiceBranch; 2] = [
    ChoiceBranch {
        keyword: "start",
        tag: ChoiceTag::TimerStart,
    },
    ChoiceBranch {
        keyword: "stop",
        tag: ChoiceTag::TimerStop,
    },
];

const TIMER_GRAMMAR: Node = Node::OptionalChoice {
    choices: &TIMER_CHOICES,
    default: None,
};

const TICK_GRAMMAR: Node = Node::Value {
    value: ValueSpec::Duration,
    next: &END,
};

const RESET_CHOICES: [ChoiceBranch; 4] = [
    ChoiceBranch {
        keyword: "current",
        tag: ChoiceTag::ResetCurrent,
    },
    ChoiceBranch {
        keyword: "jollof",
        tag: ChoiceTag::ResetJollof,
    },
    ChoiceBranch {
        keyword: "jollof-rice",
        tag: ChoiceTag::ResetJollof,
    },
    ChoiceBranch {
        keyword: "fufu",
        tag: ChoiceTag::ResetFufu,
    },
];

const RESET_GRAMMAR: Node = Node::OptionalChoice {
    choices: &RESET_CHOICES,
    default: Some(ChoiceTag::ResetCurrent),
};

const HELP_GRAMMAR: Node = Node::Topic { next: &END };

const COMMANDS: [CommandSpec; 8] = [
    CommandSpec {
        name: "instant",
        tag: CommandTag::Instant,
        grammar: &END,
        usage: "instant",
        summary: "report a one-shot action for an instant step",
    },
    CommandSpec {
        name: "action",
        tag: CommandTag::Action,
        grammar: &ACTION_GRAMMAR,
        usage: "action [add|undo]",
        summary: "count or take back one action",
    },
    CommandSpec {
        name: "timer",
        tag: CommandTag::Timer,
        grammar: &TIMER_GRAMMAR,
        usage: "timer start|stop",
        summary: "start or stop the step timer; stopping discards elapsed time",
    },
    CommandSpec {
        name: "tick",
        tag: CommandTag::Tick,
        grammar: &TICK_GRAMMAR,
        usage: "tick <duration>",
        summary: "advance time, e.g. 250ms, 2s or 1.5s",
    },
    CommandSpec {
        name: "complete",
        tag: CommandTag::Complete,
        grammar: &END,
        usage: "complete",
        summary: "complete the current step unconditionally",
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        grammar: &END,
        usage: "status",
        summary: "show recipe position, progress and diagnostics",
    },
    CommandSpec {
        name: "reset",
        tag: CommandTag::Reset,
        grammar: &RESET_GRAMMAR,
        usage: "reset [current|jollof|fufu]",
        summary: "start over on the current or a built-in recipe",
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        grammar: &HELP_GRAMMAR,
        usage: "help [command]",
        summary: "list commands or describe one",
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Looks up a command by its tag.
#[must_use]
pub fn command(tag: CommandTag) -> &'static CommandSpec {
    match tag {
        CommandTag::Instant => &COMMANDS[0],
        CommandTag::Action => &COMMANDS[1],
        CommandTag::Timer => &COMMANDS[2],
        CommandTag::Tick => &COMMANDS[3],
        CommandTag::Complete => &COMMANDS[4],
        CommandTag::Status => &COMMANDS[5],
        CommandTag::Reset => &COMMANDS[6],
        CommandTag::Help => &COMMANDS[7],
    }
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}
