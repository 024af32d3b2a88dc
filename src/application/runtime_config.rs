use std::path::PathBuf;

use crate::cli::Cli;

const STDIN_MARKER: &str = "-";

/// Where the command script is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Stdin,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub script: ScriptSource,
    pub manifest: Option<PathBuf>,
    pub colorize: bool,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        let script = if cli.script.as_os_str() == STDIN_MARKER {
            ScriptSource::Stdin
        } else {
            ScriptSource::File(cli.script)
        };

        Self {
            script,
            manifest: cli.manifest,
            colorize: cli.color.should_colorize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_read_stdin() {
        let config: RuntimeConfig = Cli::parse_from(["memfs", "--color", "never"]).into();

        assert_eq!(config.script, ScriptSource::Stdin);
        assert_eq!(config.manifest, None);
        assert!(!config.colorize);
    }

    #[test]
    fn test_script_and_manifest_paths() {
        let config: RuntimeConfig =
            Cli::parse_from(["memfs", "run.fs", "--manifest", "seed.yaml"]).into();

        assert_eq!(config.script, ScriptSource::File(PathBuf::from("run.fs")));
        assert_eq!(config.manifest, Some(PathBuf::from("seed.yaml")));
    }
}
