//! Command trait, registry, and dispatch for the file-system shell.

use std::collections::BTreeMap;
use std::time::Instant;

use berry_vfs::error::{BerryError, FsError, Result};
use berry_vfs::{FsSession, NodeId, TreeStore, WindowId};

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Plain text lines.
    Text(String),
    /// Tabular data (header row + data rows).
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Command produced no visible output.
    None,
    /// Signal to end the shell.
    Exit,
}

/// State handed to every command.
pub struct Environment<'a> {
    pub session: &'a mut FsSession,
    /// The browser window the shell navigates with.
    pub window: WindowId,
    /// Timestamp for this command's mutations.
    pub now: Instant,
}

impl Environment<'_> {
    /// Folder the shell is in, falling back to root when it vanished.
    pub fn cwd(&mut self) -> NodeId {
        self.session.current_folder(self.window)
    }

    /// Display path of the current folder.
    pub fn cwd_path(&mut self) -> String {
        let cwd = self.cwd();
        self.session
            .tree()
            .path_of(&cwd)
            .unwrap_or_else(|_| "/".to_string())
    }

    /// Resolve a relative or absolute path argument to a node id.
    ///
    /// Relative paths start from the current folder's id, so a sibling
    /// sharing its name is never picked instead.
    pub fn lookup(&mut self, input: &str) -> Result<NodeId> {
        let start = self.start_of(input);
        walk(self.session.tree(), &start, input)
    }

    /// Split `input` into the folder that should hold it and the final name.
    pub fn lookup_parent(&mut self, input: &str) -> Result<(NodeId, String)> {
        let trimmed = input.trim_end_matches('/');
        let (dir, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
        if matches!(name, "" | "." | "..") {
            return Err(BerryError::Command(format!("not a file name: {input}")));
        }
        let start = self.start_of(input);
        let parent = walk(self.session.tree(), &start, dir)?;
        Ok((parent, name.to_string()))
    }

    fn start_of(&mut self, input: &str) -> NodeId {
        if input.starts_with('/') {
            NodeId::root()
        } else {
            self.cwd()
        }
    }
}

/// A single executable command.
pub trait Command {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "ls \[path\]").
    fn usage(&self) -> &str;

    /// Command category for grouping in `help` output.
    fn category(&self) -> &str {
        "general"
    }

    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput>;
}

/// Registry of available commands with dispatch.
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Parse and execute one command line. Command names are case-insensitive.
    pub fn execute(&self, line: &str, env: &mut Environment<'_>) -> Result<CommandOutput> {
        let tokens = tokenize(line)?;
        let Some((name, rest)) = tokens.split_first() else {
            return Ok(CommandOutput::None);
        };
        let name = name.to_ascii_lowercase();
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        if name == "help" {
            return self.help(&args);
        }
        match self.commands.get(name.as_str()) {
            Some(cmd) => cmd.execute(&args, env),
            None => Err(BerryError::Command(format!("unknown command: {name}"))),
        }
    }

    fn help(&self, args: &[&str]) -> Result<CommandOutput> {
        if let Some(&name) = args.first() {
            let cmd = self
                .commands
                .get(name.to_ascii_lowercase().as_str())
                .ok_or_else(|| BerryError::Command(format!("unknown command: {name}")))?;
            return Ok(CommandOutput::Text(format!(
                "{} ({})\n  {}\n  Usage: {}",
                cmd.name(),
                cmd.category(),
                cmd.description(),
                cmd.usage()
            )));
        }

        let mut categories: BTreeMap<&str, Vec<&dyn Command>> = BTreeMap::new();
        for cmd in self.commands.values() {
            categories.entry(cmd.category()).or_default().push(cmd.as_ref());
        }
        let line = |name: &str, desc: &str| format!("    {name:<12} {desc}\n");
        let mut out = format!("Commands ({}):\n", self.commands.len() + 1);
        out.push_str("\n  [general]\n");
        out.push_str(&line("help", "Show commands or one command's usage"));
        for cmd in categories.remove("general").unwrap_or_default() {
            out.push_str(&line(cmd.name(), cmd.description()));
        }
        for (cat, cmds) in &categories {
            out.push_str(&format!("\n  [{cat}]\n"));
            for cmd in cmds {
                out.push_str(&line(cmd.name(), cmd.description()));
            }
        }
        Ok(CommandOutput::Text(out.trim_end().to_string()))
    }
}

/// Split a command line into words, honouring quotes and backslash escapes.
pub fn tokenize(input: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut chars = input.chars();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(ch) = chars.next() {
        if in_single {
            if ch == '\'' {
                in_single = false;
            } else {
                current.push(ch);
            }
        } else if in_double {
            match ch {
                '"' => in_double = false,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    },
                    None => current.push('\\'),
                },
                _ => current.push(ch),
            }
        } else {
            match ch {
                '\'' => {
                    in_single = true;
                    has_token = true;
                },
                '"' => {
                    in_double = true;
                    has_token = true;
                },
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        has_token = true;
                    }
                },
                c if c.is_whitespace() => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                },
                _ => {
                    current.push(ch);
                    has_token = true;
                },
            }
        }
    }

    if in_single {
        return Err(BerryError::Command("unterminated single quote".to_string()));
    }
    if in_double {
        return Err(BerryError::Command("unterminated double quote".to_string()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Follow `path` from `start` one component at a time.
///
/// `.` stays put, `..` climbs to the parent (the root is its own parent)
/// and a name picks the first child carrying it.
pub fn walk(tree: &TreeStore, start: &NodeId, path: &str) -> Result<NodeId> {
    let mut current = start.clone();
    for component in path.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                if let Some(parent) = tree.find_by_id(&current)?.parent {
                    current = parent.id().clone();
                }
            },
            name => {
                current = tree
                    .children(&current)?
                    .iter()
                    .find(|child| child.name() == name)
                    .map(|child| child.id().clone())
                    .ok_or_else(|| FsError::NotFound(path.to_string()))?;
            },
        }
    }
    Ok(current)
}
