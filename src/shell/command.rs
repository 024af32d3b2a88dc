use std::str::FromStr;

use derive_more::Display;
use snafu::prelude::*;

/// A single script command.
///
/// Text arguments take the rest of the line verbatim, with `\n`, `\t` and
/// `\\` unescaped.
#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum Command {
    #[display("mkdir{} {path}", if *parents { " -p" } else { "" })]
    Mkdir { path: String, parents: bool },
    #[display("touch {path}")]
    Touch { path: String, content: String },
    #[display("write {path}")]
    Write { path: String, data: String },
    #[display("cat {path}")]
    Cat { path: String },
    #[display("ls {path}")]
    Ls { path: String },
    #[display("rm {path}")]
    Rm { path: String },
    #[display("du {path}")]
    Du { path: String },
    #[display("stat {path}")]
    Stat { path: String },
    #[display("tree {path}")]
    Tree { path: String },
    #[display("find {name}")]
    Find { name: String },
}

impl Command {
    /// Parses one script line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>, CommandParseError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        line.parse().map(Some)
    }
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (name, rest) = split_word(line.trim());

        let command = match name {
            "mkdir" => {
                let (first, rest) = split_word(rest);
                if first == "-p" {
                    Command::Mkdir {
                        path: required(name, "PATH", split_word(rest).0)?,
                        parents: true,
                    }
                } else {
                    Command::Mkdir {
                        path: required(name, "PATH", first)?,
                        parents: false,
                    }
                }
            }
            "touch" => {
                let (path, text) = split_word(rest);
                Command::Touch {
                    path: required(name, "PATH", path)?,
                    content: unescape(text),
                }
            }
            "write" => {
                let (path, text) = split_word(rest);
                Command::Write {
                    path: required(name, "PATH", path)?,
                    data: unescape(required(name, "TEXT", text)?.as_str()),
                }
            }
            "cat" => Command::Cat {
                path: required(name, "PATH", split_word(rest).0)?,
            },
            "rm" => Command::Rm {
                path: required(name, "PATH", split_word(rest).0)?,
            },
            "stat" => Command::Stat {
                path: required(name, "PATH", split_word(rest).0)?,
            },
            "find" => Command::Find {
                name: required(name, "NAME", split_word(rest).0)?,
            },
            "ls" => Command::Ls {
                path: or_root(split_word(rest).0),
            },
            "du" => Command::Du {
                path: or_root(split_word(rest).0),
            },
            "tree" => Command::Tree {
                path: or_root(split_word(rest).0),
            },
            _ => return UnknownCommandSnafu { name }.fail(),
        };

        Ok(command)
    }
}

/// Splits off the first whitespace separated word; the remainder keeps its
/// inner spacing.
fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (text, ""),
    }
}

fn required(
    command: &str,
    argument: &'static str,
    value: &str,
) -> Result<String, CommandParseError> {
    ensure!(
        !value.is_empty(),
        MissingArgumentSnafu { command, argument }
    );
    Ok(value.to_string())
}

fn or_root(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}

#[derive(Debug, Snafu)]
pub enum CommandParseError {
    #[snafu(display("Unknown command '{}'", name))]
    UnknownCommand { name: String },
    #[snafu(display("'{}' requires a {} argument", command, argument))]
    MissingArgument {
        command: String,
        argument: &'static str,
    },
}
