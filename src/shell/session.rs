use std::fmt;
use std::io::{self, Write};

use colored::Colorize;
use snafu::prelude::*;
use tracing::{debug, warn};

use super::command::{Command, CommandParseError};
use crate::filesystem::{EntryKind, Filesystem, FilesystemError, Metadata, WalkEntry};

/// Result of a successfully executed [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Nothing,
    Content(Vec<u8>),
    Listing(Vec<(String, EntryKind)>),
    Size { path: String, size: usize },
    Metadata(Metadata),
    Tree { root: String, entries: Vec<WalkEntry> },
    Paths(Vec<String>),
}

/// Counts gathered while running a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Executes commands against a [`Filesystem`] it owns.
#[derive(Debug, Default)]
pub struct Session {
    fs: Filesystem,
}

impl Session {
    pub fn new(fs: Filesystem) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &Filesystem {
        &self.fs
    }

    pub fn into_fs(self) -> Filesystem {
        self.fs
    }

    pub fn execute(&mut self, command: &Command) -> Result<Output, FilesystemError> {
        debug!("Executing '{}'", command);

        let output = match command {
            Command::Mkdir {
                path,
                parents: true,
            } => {
                self.fs.mkdir(path)?;
                Output::Nothing
            }
            Command::Mkdir {
                path,
                parents: false,
            } => {
                self.fs.create_dir(path)?;
                Output::Nothing
            }
            Command::Touch { path, content } => {
                self.fs.create_file(path, content)?;
                Output::Nothing
            }
            Command::Write { path, data } => {
                self.fs.write_file(path, data)?;
                Output::Nothing
            }
            Command::Cat { path } => Output::Content(self.fs.read_file(path)?.to_vec()),
            Command::Ls { path } => {
                let base = self.fs.stat(path)?.path;
                let entries = self
                    .fs
                    .list(path)?
                    .into_iter()
                    .map(|name| {
                        let kind = self
                            .fs
                            .stat(&format!("{base}/{name}"))
                            .map(|meta| meta.kind)
                            .unwrap_or(EntryKind::File);
                        (name, kind)
                    })
                    .collect();
                Output::Listing(entries)
            }
            Command::Rm { path } => {
                self.fs.delete(path)?;
                Output::Nothing
            }
            Command::Du { path } => Output::Size {
                path: self.fs.stat(path)?.path,
                size: self.fs.size(path)?,
            },
            Command::Stat { path } => Output::Metadata(self.fs.stat(path)?),
            Command::Tree { path } => Output::Tree {
                entries: self.fs.walk(path)?,
                root: self.fs.stat(path)?.path,
            },
            Command::Find { name } => Output::Paths(self.fs.find(name)),
        };

        Ok(output)
    }

    /// Runs every line of `script`, writing command output to `out` and
    /// failures to `err`. A failing line does not stop the script.
    pub fn run_script(
        &mut self,
        script: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<ScriptSummary> {
        let mut summary = ScriptSummary::default();

        for (index, line) in script.lines().enumerate() {
            let line_number = index + 1;
            match self.run_line(line_number, line) {
                Ok(None) => {}
                Ok(Some(output)) => {
                    summary.executed += 1;
                    if output != Output::Nothing {
                        writeln!(out, "{output}")?;
                    }
                }
                Err(error) => {
                    summary.executed += 1;
                    summary.failed += 1;
                    warn!("{}", error);
                    writeln!(err, "{}: {}", "error".red().bold(), error)?;
                }
            }
        }

        debug!(
            "Script finished: {} commands, {} failed",
            summary.executed, summary.failed
        );
        Ok(summary)
    }

    fn run_line(&mut self, line_number: usize, line: &str) -> Result<Option<Output>, ShellError> {
        let Some(command) = Command::parse_line(line).context(ParseSnafu { line_number })? else {
            return Ok(None);
        };
        let output = self.execute(&command).context(ExecuteSnafu {
            line_number,
            command: command.to_string(),
        })?;
        Ok(Some(output))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Nothing => Ok(()),
            Output::Content(content) => write!(f, "{}", String::from_utf8_lossy(content)),
            Output::Listing(entries) => {
                let names = entries
                    .iter()
                    .map(|(name, kind)| styled_name(name, *kind))
                    .collect::<Vec<_>>();
                write!(f, "{}", names.join("  "))
            }
            Output::Size { path, size } => write!(f, "{size}\t{path}"),
            Output::Metadata(meta) => {
                writeln!(f, "  name: {}", meta.name)?;
                writeln!(f, "  path: {}", meta.path)?;
                writeln!(f, "  kind: {}", meta.kind)?;
                writeln!(f, "  size: {}", meta.size)?;
                write!(f, "parent: {}", meta.parent.as_deref().unwrap_or("-"))
            }
            Output::Tree { root, entries } => {
                write!(f, "{}", root.blue().bold())?;
                for entry in entries {
                    let indent = "  ".repeat(entry.depth);
                    write!(f, "\n{indent}{}", styled_name(&entry.name, entry.kind))?;
                }
                Ok(())
            }
            Output::Paths(paths) => write!(f, "{}", paths.join("\n")),
        }
    }
}

fn styled_name(name: &str, kind: EntryKind) -> String {
    match kind {
        EntryKind::Directory => format!("{}/", name.blue().bold()),
        EntryKind::File => name.to_string(),
    }
}

#[derive(Debug, Snafu)]
pub enum ShellError {
    #[snafu(display("line {}: {}", line_number, source))]
    ParseError {
        line_number: usize,
        source: CommandParseError,
    },
    #[snafu(display("line {}: {}: {}", line_number, command, source))]
    ExecuteError {
        line_number: usize,
        command: String,
        source: FilesystemError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
# build a small tree
mkdir -p /a/b
touch /a/b/f.txt hi
ls /a/b
cat /a/b/f.txt
write /a/b/f.txt  there
cat /a/b/f.txt
du /a
rm /a/b/f.txt
ls /a/b
cat /a/b/f.txt
"#;

    fn run(session: &mut Session, script: &str) -> (ScriptSummary, String, String) {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = session.run_script(script, &mut out, &mut err).unwrap();
        (
            summary,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_run_script() {
        let mut session = Session::default();
        let (summary, out, err) = run(&mut session, SCRIPT);

        assert_eq!(
            summary,
            ScriptSummary {
                executed: 10,
                failed: 1
            }
        );
        assert_eq!(out, "f.txt\nhi\nhi there\n8\t/a\n\n");
        assert_eq!(
            err,
            "error: line 12: cat /a/b/f.txt: No such file or directory: /a/b/f.txt\n"
        );
    }

    #[test]
    fn test_parse_failures_are_reported_and_skipped() {
        let mut session = Session::default();
        let (summary, out, err) = run(&mut session, "bogus\nmkdir\ntouch /x\nls");

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.executed, 4);
        assert_eq!(out, "x\n");
        assert!(err.contains("line 1: Unknown command 'bogus'"));
        assert!(err.contains("line 2: 'mkdir' requires a PATH argument"));
    }

    #[test]
    fn test_strict_mkdir_needs_parent() {
        let mut session = Session::default();
        let result = session.execute(&"mkdir /a/b".parse().unwrap());
        assert!(matches!(result, Err(FilesystemError::NotFound { .. })));

        session.execute(&"mkdir -p /a/b".parse().unwrap()).unwrap();
        assert!(session.fs().exists("/a/b"));
    }

    #[test]
    fn test_listing_marks_directories() {
        colored::control::set_override(false);
        let mut session = Session::default();
        session.execute(&"mkdir -p /d".parse().unwrap()).unwrap();
        session.execute(&"touch /f".parse().unwrap()).unwrap();

        let output = session.execute(&"ls /".parse().unwrap()).unwrap();
        assert_eq!(
            output,
            Output::Listing(vec![
                ("d".to_string(), EntryKind::Directory),
                ("f".to_string(), EntryKind::File),
            ])
        );
        assert_eq!(output.to_string(), "d/  f");
    }

    #[test]
    fn test_tree_output() {
        colored::control::set_override(false);
        let mut session = Session::default();
        session.execute(&"mkdir -p /a/b".parse().unwrap()).unwrap();
        session.execute(&"touch /a/b/c data".parse().unwrap()).unwrap();
        session.execute(&"touch /z".parse().unwrap()).unwrap();

        let output = session.execute(&"tree".parse().unwrap()).unwrap();
        assert_eq!(output.to_string(), "/\n  a/\n    b/\n      c\n  z");
    }

    #[test]
    fn test_stat_and_find_output() {
        let mut session = Session::default();
        session.execute(&"mkdir -p /a".parse().unwrap()).unwrap();
        session.execute(&"touch /a/n abc".parse().unwrap()).unwrap();

        let output = session.execute(&"stat /a/n".parse().unwrap()).unwrap();
        assert_eq!(
            output.to_string(),
            "  name: n\n  path: /a/n\n  kind: file\n  size: 3\nparent: a"
        );

        let output = session.execute(&"find n".parse().unwrap()).unwrap();
        assert_eq!(output, Output::Paths(vec!["/a/n".to_string()]));
    }
}
