//! Command interpreter
//!
//! Lines look like `ac <command> <args>`; the `ac` prefix is optional.
//! Every outcome, including parse failures, comes back as a message string
//! so the shell never has to stop.

use crate::guardian::GuardianIdentity;
use crate::memory::{MemoryStore, MemorySystem};
use crate::{ArcError, Result};
use std::fmt;
use tracing::{debug, warn};

/// Prefix accepted in front of every command
pub const COMMAND_PREFIX: &str = "ac";

/// Command names, without arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Inject,
    Walk,
    Thread,
    Collapse,
    Summary,
    Sigil,
    Guardian,
    Export,
    Help,
}

impl CommandKind {
    pub fn all() -> &'static [CommandKind] {
        &[
            CommandKind::Inject,
            CommandKind::Walk,
            CommandKind::Thread,
            CommandKind::Collapse,
            CommandKind::Summary,
            CommandKind::Sigil,
            CommandKind::Guardian,
            CommandKind::Export,
            CommandKind::Help,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Inject => "inject",
            CommandKind::Walk => "walk",
            CommandKind::Thread => "thread",
            CommandKind::Collapse => "collapse",
            CommandKind::Summary => "summary",
            CommandKind::Sigil => "sigil",
            CommandKind::Guardian => "guardian",
            CommandKind::Export => "export",
            CommandKind::Help => "help",
        }
    }

    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Inject => "inject <user>|<ai>|<cycle>",
            CommandKind::Thread => "thread <cycle>",
            CommandKind::Sigil => "sigil <text>",
            other => other.name(),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommandKind::Inject => "add a user/ai exchange under the root",
            CommandKind::Walk => "reconstruct the whole tree",
            CommandKind::Thread => "reconstruct the nodes of one cycle",
            CommandKind::Collapse => "collapse every interaction to seeds",
            CommandKind::Summary => "show node counts per compression level",
            CommandKind::Sigil => "score text by sigil priority",
            CommandKind::Guardian => "show guardian identity and tree hash",
            CommandKind::Export => "save the tree to the memory file",
            CommandKind::Help => "list commands",
        }
    }

    pub fn parse(name: &str) -> Option<CommandKind> {
        let name = name.to_lowercase();
        Self::all().iter().find(|cmd| cmd.name() == name).copied()
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A parsed command with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Inject {
        user: String,
        ai: String,
        cycle: i64,
    },
    Walk,
    Thread(i64),
    Collapse,
    Summary,
    Sigil(String),
    Guardian,
    Export,
    Help,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Inject { .. } => CommandKind::Inject,
            Command::Walk => CommandKind::Walk,
            Command::Thread(_) => CommandKind::Thread,
            Command::Collapse => CommandKind::Collapse,
            Command::Summary => CommandKind::Summary,
            Command::Sigil(_) => CommandKind::Sigil,
            Command::Guardian => CommandKind::Guardian,
            Command::Export => CommandKind::Export,
            Command::Help => CommandKind::Help,
        }
    }

    /// Parse one input line
    pub fn parse(line: &str) -> Result<Command> {
        let line = line.trim();
        let line = match line.split_once(char::is_whitespace) {
            Some((first, rest)) if first.eq_ignore_ascii_case(COMMAND_PREFIX) => rest.trim_start(),
            _ if line.eq_ignore_ascii_case(COMMAND_PREFIX) => "",
            _ => line,
        };

        let (name, args) = match line.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (line, ""),
        };
        if name.is_empty() {
            return Err(ArcError::Command("empty command, try `help`".to_string()));
        }

        let kind = CommandKind::parse(name)
            .ok_or_else(|| ArcError::Command(format!("unknown command '{}'", name)))?;

        match kind {
            CommandKind::Inject => parse_inject(args),
            CommandKind::Thread => {
                let cycle = parse_cycle(args).ok_or_else(|| usage_error(kind))?;
                Ok(Command::Thread(cycle))
            }
            CommandKind::Sigil => {
                if args.is_empty() {
                    return Err(usage_error(kind));
                }
                Ok(Command::Sigil(args.to_string()))
            }
            CommandKind::Walk => Ok(Command::Walk),
            CommandKind::Collapse => Ok(Command::Collapse),
            CommandKind::Summary => Ok(Command::Summary),
            CommandKind::Guardian => Ok(Command::Guardian),
            CommandKind::Export => Ok(Command::Export),
            CommandKind::Help => Ok(Command::Help),
        }
    }
}

fn parse_inject(args: &str) -> Result<Command> {
    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    let [user, ai, cycle] = parts.as_slice() else {
        return Err(usage_error(CommandKind::Inject));
    };
    let cycle = parse_cycle(cycle).ok_or_else(|| {
        ArcError::Command(format!("cycle must be an integer, got '{}'", cycle))
    })?;
    Ok(Command::Inject {
        user: user.to_string(),
        ai: ai.to_string(),
        cycle,
    })
}

fn parse_cycle(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

fn usage_error(kind: CommandKind) -> ArcError {
    ArcError::Command(format!("usage: {} {}", COMMAND_PREFIX, kind.usage()))
}

/// Help text listing every command
pub fn help_text() -> String {
    let width = CommandKind::all()
        .iter()
        .map(|c| c.usage().len())
        .max()
        .unwrap_or(0);
    let mut out = String::from("Commands:");
    for cmd in CommandKind::all() {
        out.push_str(&format!(
            "\n  {} {:<width$}  {}",
            COMMAND_PREFIX,
            cmd.usage(),
            cmd.description(),
            width = width
        ));
    }
    out
}

/// Runs commands against one memory system
#[derive(Debug)]
pub struct Interpreter {
    memory: MemorySystem,
    guardian: GuardianIdentity,
    store: Option<MemoryStore>,
}

impl Interpreter {
    pub fn new(memory: MemorySystem, guardian: GuardianIdentity) -> Self {
        Self {
            memory,
            guardian,
            store: None,
        }
    }

    /// Attach the store used by `export`
    pub fn with_store(mut self, store: MemoryStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn memory(&self) -> &MemorySystem {
        &self.memory
    }

    pub fn guardian(&self) -> &GuardianIdentity {
        &self.guardian
    }

    pub fn store(&self) -> Option<&MemoryStore> {
        self.store.as_ref()
    }

    /// Parse and run one line, always producing a message
    pub async fn execute(&mut self, line: &str) -> String {
        let command = match Command::parse(line) {
            Ok(command) => command,
            Err(e) => {
                debug!("Rejected input {:?}: {}", line, e);
                return format!("[interpreter] {}", error_message(&e));
            }
        };

        let kind = command.kind();
        match self.run(command).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Command {} failed: {}", kind, e);
                format!("[{}] {}", kind, error_message(&e))
            }
        }
    }

    /// Run an already parsed command
    pub async fn run(&mut self, command: Command) -> Result<String> {
        match command {
            Command::Inject { user, ai, cycle } => {
                self.memory.ingest_interaction(&user, &ai, cycle)?;
                Ok(format!("[inject] Interaction added for cycle {}.", cycle))
            }
            Command::Walk => Ok(render_lines(self.memory.reconstruct_full())),
            Command::Thread(cycle) => {
                let lines = self.memory.reconstruct_thread(cycle);
                if lines.is_empty() {
                    return Ok(format!("[thread] No nodes for cycle {}.", cycle));
                }
                Ok(render_lines(lines))
            }
            Command::Collapse => {
                self.memory.collapse_tree()?;
                let summary = self.memory.summary();
                Ok(format!(
                    "[collapse] Tree collapsed ({} nodes, {} blocked).",
                    summary.nodes, summary.blocked
                ))
            }
            Command::Summary => Ok(self.memory.summary().to_string()),
            Command::Sigil(text) => Ok(format!(
                "[sigil] Priority = {}",
                self.memory.scorer().evaluate(&text)
            )),
            Command::Guardian => {
                let report = self.guardian.status_report(&self.memory)?;
                Ok(serde_json::to_string_pretty(&report)?)
            }
            Command::Export => {
                let store = self.store.as_ref().ok_or_else(|| {
                    ArcError::Command("no memory file configured".to_string())
                })?;
                store.save(self.memory.root()).await?;
                Ok(format!("[export] Memory saved to {}.", store.path().display()))
            }
            Command::Help => Ok(help_text()),
        }
    }
}

fn render_lines(lines: Vec<String>) -> String {
    lines.join("\n")
}

/// Strip the error-kind prefix added by `ArcError`'s Display for
/// interpreter-facing variants.
fn error_message(err: &ArcError) -> String {
    match err {
        ArcError::Command(msg) | ArcError::Memory(msg) => msg.clone(),
        other => other.to_string(),
    }
}
