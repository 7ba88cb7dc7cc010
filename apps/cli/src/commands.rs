//! Command-line grammar of the interactive shell.

use std::path::PathBuf;

/// Prefix that marks a path as living on the server.
pub const REMOTE_MARKER: &str = "remote/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ls [remote/dir]`
    List(String),
    /// `cp remote/<file> <local>`
    Download { remote: String, local: PathBuf },
    /// `cp <local> remote/<file>`
    Upload { local: PathBuf, remote: String },
    /// `rm remote/<file>`
    Remove(String),
    /// `sum remote/<file>`
    Sum(String),
    Help,
    Exit,
    /// Blank line.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("exactly one side of cp must start with {REMOTE_MARKER}")]
    AmbiguousCopy,

    #[error("unknown command {0:?}, try 'help'")]
    Unknown(String),
}

fn remote_part(arg: &str) -> Option<&str> {
    arg.strip_prefix(REMOTE_MARKER)
}

/// Parses one input line.
pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = parts.split_first() else {
        return Ok(Command::Nothing);
    };

    match name {
        "ls" => match args {
            [] => Ok(Command::List(String::new())),
            [dir] if *dir == "remote" => Ok(Command::List(String::new())),
            [dir] => Ok(Command::List(remote_part(dir).unwrap_or(dir).to_string())),
            _ => Err(ParseError::Usage("ls [remote/dir]")),
        },
        "cp" => {
            let [src, dst] = args else {
                return Err(ParseError::Usage("cp <src> <dst>"));
            };
            match (remote_part(src), remote_part(dst)) {
                (Some(remote), None) => Ok(Command::Download {
                    remote: remote.to_string(),
                    local: PathBuf::from(dst),
                }),
                (None, Some(remote)) => Ok(Command::Upload {
                    local: PathBuf::from(src),
                    remote: remote.to_string(),
                }),
                _ => Err(ParseError::AmbiguousCopy),
            }
        }
        "rm" => match args {
            [target] => remote_part(target)
                .map(|p| Command::Remove(p.to_string()))
                .ok_or(ParseError::Usage("rm remote/<file>")),
            _ => Err(ParseError::Usage("rm remote/<file>")),
        },
        "sum" => match args {
            [target] => remote_part(target)
                .map(|p| Command::Sum(p.to_string()))
                .ok_or(ParseError::Usage("sum remote/<file>")),
            _ => Err(ParseError::Usage("sum remote/<file>")),
        },
        "help" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        other => Err(ParseError::Unknown(other.to_string())),
    }
}

pub const HELP: &str = "\
Commands:
  ls [remote/dir]               list a remote directory
  cp remote/<file> <local>      download a file
  cp <local> remote/<file>      upload a file
  rm remote/<file>              delete a remote file
  sum remote/<file>             print the remote SHA-256
  help                          show this text
  exit                          leave the shell";
