//! Per-tick file commands and the merge/demux of command queues
//!
//! # Composite lines
//!
//! Every extension produces its own queue of commands for a tick. Queues are
//! merged column-wise into composite lines: line `i` holds element `i` of
//! every queue that has one, in registration order.
//!
//! ```text
//! queue A: a0 a1 a2        line 0: a0 b0 c0
//! queue B: b0          =>  line 1: a1 c1
//! queue C: c0 c1           line 2: a2
//! ```
//!
//! On load, commands are routed back by name. Because each queue keeps its
//! relative order across lines, splitting the lines back up by owner
//! reproduces the original queues.

use smallvec::SmallVec;

use super::SerializationError;

/// One command written to a TASfile: `$name arg1,arg2;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommand {
    pub name: String,
    pub args: SmallVec<[String; 4]>,
}

impl FileCommand {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A command without arguments.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: SmallVec::new(),
        }
    }

    /// Check that the command can be written and read back unchanged.
    pub fn validate(&self) -> Result<(), SerializationError> {
        let invalid = |reason| SerializationError::InvalidCommand {
            name: self.name.clone(),
            reason,
        };

        if !is_valid_name(&self.name) {
            return Err(invalid("name must be non-empty ASCII letters, digits or '_'"));
        }
        for arg in &self.args {
            if arg.is_empty() {
                return Err(invalid("empty argument"));
            }
            if arg.contains([',', ';', '\n', '\r']) {
                return Err(invalid("argument contains ',', ';' or a line break"));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for FileCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${}", self.name)?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.join(","))?;
        }
        write!(f, ";")
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Interleave queues into lines.
///
/// Produces as many lines as the longest queue; shorter queues stop
/// contributing once exhausted.
pub fn merge<T>(queues: Vec<Vec<T>>) -> Vec<Vec<T>> {
    let longest = queues.iter().map(Vec::len).max().unwrap_or(0);
    let mut queues: Vec<_> = queues.into_iter().map(Vec::into_iter).collect();

    (0..longest)
        .map(|_| queues.iter_mut().filter_map(Iterator::next).collect())
        .collect()
}

/// Commands split back up by owner.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Demuxed {
    /// One queue per owner, in owner order
    pub queues: Vec<Vec<FileCommand>>,
    /// Commands no owner claimed
    pub unclaimed: Vec<FileCommand>,
}

/// Route every command to the first owner whose name list contains it.
pub fn demux<I>(commands: I, owners: &[&[&str]]) -> Demuxed
where
    I: IntoIterator<Item = FileCommand>,
{
    let mut demuxed = Demuxed {
        queues: vec![Vec::new(); owners.len()],
        unclaimed: Vec::new(),
    };

    for command in commands {
        match owners
            .iter()
            .position(|names| names.contains(&command.name.as_str()))
        {
            Some(owner) => demuxed.queues[owner].push(command),
            None => demuxed.unclaimed.push(command),
        }
    }
    demuxed
}

/// Render one composite line.
pub fn format_composite(commands: &[FileCommand]) -> String {
    commands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one composite line: `$a x,y; $b; ...`
pub fn parse_composite(line: &str) -> Result<Vec<FileCommand>, String> {
    let mut commands = Vec::new();
    let mut rest = line.trim();

    while !rest.is_empty() {
        let Some(body) = rest.strip_prefix('$') else {
            return Err(format!("expected '$' at {rest:?}"));
        };
        let Some(end) = body.find(';') else {
            return Err(format!("unterminated command {rest:?}"));
        };
        let (command, tail) = (&body[..end], &body[end + 1..]);

        let parsed = match command.split_once(' ') {
            Some((name, args)) => {
                if args.is_empty() {
                    return Err(format!("missing arguments after {name:?}"));
                }
                FileCommand::new(name, args.split(','))
            }
            None => FileCommand::bare(command),
        };
        if !is_valid_name(&parsed.name) {
            return Err(format!("invalid command name {:?}", parsed.name));
        }
        if parsed.args.iter().any(String::is_empty) {
            return Err(format!("empty argument in {command:?}"));
        }

        commands.push(parsed);
        rest = tail.trim_start();
    }

    Ok(commands)
}
