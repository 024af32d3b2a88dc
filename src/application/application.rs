use std::io;
use std::path::Path;

use memfs::config::{Manifest, ManifestError};
use memfs::filesystem::Filesystem;
use memfs::shell::Session;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::{RuntimeConfig, ScriptSource};

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        debug!("Runtime config: {:?}", app_config);
        colored::control::set_override(app_config.colorize);

        let mut fs = Filesystem::new();
        if let Some(path) = &app_config.manifest {
            let manifest = Manifest::from_path(path).await.context(ManifestSnafu)?;
            manifest.apply(&mut fs).context(ManifestSnafu)?;
        }

        let script = Self::read_script(&app_config.script).await?;
        let mut session = Session::new(fs);
        let summary = session
            .run_script(&script, &mut io::stdout().lock(), &mut io::stderr().lock())
            .context(OutputSnafu)?;
        info!(
            "Executed {} commands, {} nodes in tree",
            summary.executed,
            session.fs().tree().len()
        );

        ensure!(
            summary.failed == 0,
            ScriptFailedSnafu {
                failed: summary.failed,
                executed: summary.executed,
            }
        );
        Ok(())
    }

    async fn read_script(source: &ScriptSource) -> Result<String, ApplicationError> {
        match source {
            ScriptSource::Stdin => {
                debug!("Reading script from standard input");
                io::read_to_string(io::stdin()).context(ScriptReadSnafu {
                    file_path: "<stdin>",
                })
            }
            ScriptSource::File(path) => Self::read_script_file(path).await,
        }
    }

    async fn read_script_file(path: &Path) -> Result<String, ApplicationError> {
        let file_path = path.display().to_string();
        debug!("Reading script file: {}", file_path);

        let bytes = compio::fs::read(path).await.context(ScriptReadSnafu {
            file_path: file_path.clone(),
        })?;
        String::from_utf8(bytes).context(ScriptEncodingSnafu { file_path })
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the manifest"))]
    ManifestError { source: ManifestError },
    #[snafu(display("Failed to read the script: {}", file_path))]
    ScriptReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Script {} is not valid UTF-8", file_path))]
    ScriptEncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to write command output"))]
    OutputError { source: std::io::Error },
    #[snafu(display("{} of {} commands failed", failed, executed))]
    ScriptFailed { failed: usize, executed: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{}", contents).expect("Failed to write to temp file");
        file
    }

    fn config(script: &Path, manifest: Option<PathBuf>) -> RuntimeConfig {
        RuntimeConfig {
            script: ScriptSource::File(script.to_path_buf()),
            manifest,
            colorize: false,
        }
    }

    #[compio::test]
    async fn application_runs_script_against_manifest() {
        let manifest = temp_file("etc:\n  hosts: localhost\n");
        let script = temp_file("cat /etc/hosts\nwrite /etc/hosts \\n\n");

        let result =
            Application::run(config(script.path(), Some(manifest.path().to_path_buf()))).await;
        assert!(result.is_ok());
    }

    #[compio::test]
    async fn application_fails_when_a_command_fails() {
        let script = temp_file("mkdir -p /a\ncat /a\n");

        let result = Application::run(config(script.path(), None)).await;
        assert!(matches!(
            result,
            Err(ApplicationError::ScriptFailed {
                failed: 1,
                executed: 2
            })
        ));
    }

    #[compio::test]
    async fn application_returns_error_on_missing_script() {
        let result = Application::run(config(Path::new("nonexistent.fs"), None)).await;
        assert!(matches!(result, Err(ApplicationError::ScriptReadError { .. })));
    }

    #[compio::test]
    async fn application_returns_error_on_bad_manifest() {
        let manifest = temp_file("- not\n- a map\n");
        let script = temp_file("ls\n");

        let result =
            Application::run(config(script.path(), Some(manifest.path().to_path_buf()))).await;
        assert!(matches!(
            result,
            Err(ApplicationError::ManifestError {
                source: ManifestError::TopLevelNotMap
            })
        ));
    }
}
