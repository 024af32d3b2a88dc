use std::path::Path;

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::filesystem::{EntryKind, Filesystem, FilesystemError};

/// One entry of a [`Manifest`], in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    File(String),
    Directory(Vec<(String, ManifestEntry)>),
}

/// Declarative description of a tree used to seed a [`Filesystem`].
///
/// ```yaml
/// etc:
///   hosts: "127.0.0.1 localhost"
/// home:
///   user:
///     notes.txt: ~
/// ```
///
/// Mappings are directories, strings are files with that content and `null`
/// is an empty file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(String, ManifestEntry)>,
}

impl Manifest {
    pub async fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let file_path = path.display().to_string();
        debug!("Reading manifest file: {}", file_path);

        let bytes = compio::fs::read(path).await.context(ReadSnafu {
            file_path: file_path.clone(),
        })?;
        debug!("Successfully read manifest file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu { file_path })?;
        contents.as_str().try_into()
    }

    pub fn entries(&self) -> &[(String, ManifestEntry)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates every entry of the manifest in `fs` and returns how many nodes
    /// were created.
    ///
    /// Directories that already exist are merged into. Entries are created in
    /// document order and creation stops at the first failure, keeping the
    /// entries created before it.
    pub fn apply(&self, fs: &mut Filesystem) -> Result<usize, ManifestError> {
        let mut created = 0;
        Self::apply_entries(&self.entries, "", fs, &mut created)?;
        info!("Applied manifest: {} entries created", created);
        Ok(created)
    }

    fn apply_entries(
        entries: &[(String, ManifestEntry)],
        parent: &str,
        fs: &mut Filesystem,
        created: &mut usize,
    ) -> Result<(), ManifestError> {
        for (name, entry) in entries {
            let path = format!("{parent}/{name}");
            match entry {
                ManifestEntry::Directory(children) => {
                    let exists = fs
                        .stat(&path)
                        .is_ok_and(|meta| meta.kind == EntryKind::Directory);
                    if !exists {
                        fs.create_dir(&path).context(ApplySnafu { path: &path })?;
                        *created += 1;
                    }
                    Self::apply_entries(children, &path, fs, created)?;
                }
                ManifestEntry::File(content) => {
                    fs.create_file(&path, content)
                        .context(ApplySnafu { path: &path })?;
                    *created += 1;
                }
            }
        }
        Ok(())
    }

    fn parse_entries(
        mapping: &LinkedHashMap<Yaml, Yaml>,
        parent: &str,
    ) -> Result<Vec<(String, ManifestEntry)>, ManifestError> {
        mapping
            .iter()
            .map(|(key, value)| {
                let Yaml::Value(Scalar::String(name)) = key else {
                    return InvalidKeySnafu {
                        parent: Self::display_parent(parent),
                        key: format!("{key:?}"),
                    }
                    .fail();
                };
                ensure!(
                    Self::is_valid_name(name),
                    InvalidKeySnafu {
                        parent: Self::display_parent(parent),
                        key: name.to_string(),
                    }
                );

                let path = format!("{parent}/{name}");
                let entry = match value {
                    Yaml::Mapping(children) => {
                        ManifestEntry::Directory(Self::parse_entries(children, &path)?)
                    }
                    Yaml::Value(Scalar::String(content)) => {
                        ManifestEntry::File(content.to_string())
                    }
                    Yaml::Value(Scalar::Null) => ManifestEntry::File(String::new()),
                    _ => return InvalidEntrySnafu { path }.fail(),
                };
                Ok((name.to_string(), entry))
            })
            .collect()
    }

    fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains('/') && name != "." && name != ".."
    }

    fn display_parent(parent: &str) -> String {
        if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        }
    }
}

impl TryFrom<&str> for Manifest {
    type Error = ManifestError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            debug!("Manifest is empty");
            return Ok(Manifest::default());
        };
        if matches!(document, Yaml::Value(Scalar::Null)) {
            return Ok(Manifest::default());
        }

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;
        let entries = Self::parse_entries(top_level, "")?;

        Ok(Manifest { entries })
    }
}

#[derive(Debug, Snafu)]
pub enum ManifestError {
    #[snafu(display("Failed to read the manifest file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Manifest file {} is not valid UTF-8", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the manifest"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of the manifest should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Invalid entry name {} under {}", key, parent))]
    InvalidKey { parent: String, key: String },
    #[snafu(display(
        "Entry {} should be a map (directory), a string or null (file)",
        path
    ))]
    InvalidEntry { path: String },
    #[snafu(display("Failed to create {} from the manifest", path))]
    ApplyError {
        path: String,
        source: FilesystemError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
etc:
  hosts: "127.0.0.1 localhost"
home:
  user:
    notes.txt: ~
    docs: {}
README: "hello"
"#;

    #[test]
    fn manifest_parses_nested_entries() {
        let manifest: Manifest = SAMPLE.try_into().unwrap();

        assert_eq!(
            manifest.entries(),
            &[
                (
                    "etc".to_string(),
                    ManifestEntry::Directory(vec![(
                        "hosts".to_string(),
                        ManifestEntry::File("127.0.0.1 localhost".to_string())
                    )])
                ),
                (
                    "home".to_string(),
                    ManifestEntry::Directory(vec![(
                        "user".to_string(),
                        ManifestEntry::Directory(vec![
                            ("notes.txt".to_string(), ManifestEntry::File(String::new())),
                            ("docs".to_string(), ManifestEntry::Directory(vec![])),
                        ])
                    )])
                ),
                ("README".to_string(), ManifestEntry::File("hello".to_string())),
            ]
        );
    }

    #[test]
    fn manifest_applies_to_filesystem() {
        let manifest: Manifest = SAMPLE.try_into().unwrap();
        let mut fs = Filesystem::new();

        let created = manifest.apply(&mut fs).unwrap();

        assert_eq!(created, 7);
        assert_eq!(fs.list("/").unwrap(), vec!["README", "etc", "home"]);
        assert_eq!(fs.list("/home/user").unwrap(), vec!["docs", "notes.txt"]);
        assert_eq!(fs.read_file("/etc/hosts").unwrap(), b"127.0.0.1 localhost");
        assert_eq!(fs.read_file("/home/user/notes.txt").unwrap(), b"");
    }

    #[test]
    fn manifest_merges_into_existing_directories() {
        let manifest: Manifest = SAMPLE.try_into().unwrap();
        let mut fs = Filesystem::new();
        fs.mkdir("/home/user").unwrap();
        fs.create_file("/home/user/existing", "kept").unwrap();

        let created = manifest.apply(&mut fs).unwrap();

        assert_eq!(created, 5);
        assert_eq!(
            fs.list("/home/user").unwrap(),
            vec!["docs", "existing", "notes.txt"]
        );
    }

    #[test]
    fn manifest_reports_file_collisions() {
        let manifest: Manifest = "a: one".try_into().unwrap();
        let mut fs = Filesystem::new();
        fs.create_file("/a", "already here").unwrap();

        let result = manifest.apply(&mut fs);
        assert!(matches!(
            result,
            Err(ManifestError::ApplyError {
                source: FilesystemError::AlreadyExists { .. },
                ..
            })
        ));
        assert_eq!(fs.read_file("/a").unwrap(), b"already here");
    }

    #[rstest]
    #[case("")]
    #[case("~")]
    #[case("# only a comment")]
    fn manifest_handles_empty_documents(#[case] contents: &str) {
        let manifest: Manifest = contents.try_into().unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn manifest_returns_error_on_invalid_yaml() {
        let result: Result<Manifest, _> = "invalid: yaml: content: [unclosed".try_into();
        assert!(matches!(result, Err(ManifestError::ParseError { .. })));
    }

    #[rstest]
    #[case("- item1\n- item2")]
    #[case("just a string")]
    fn manifest_returns_error_when_top_level_is_not_map(#[case] contents: &str) {
        let result: Result<Manifest, _> = contents.try_into();
        assert!(matches!(result, Err(ManifestError::TopLevelNotMap)));
    }

    #[rstest]
    #[case("123: \"numeric key\"")]
    #[case("dir:\n  \"a/b\": x")]
    #[case("\"..\": x")]
    fn manifest_rejects_invalid_names(#[case] contents: &str) {
        let result: Result<Manifest, _> = contents.try_into();
        assert!(matches!(result, Err(ManifestError::InvalidKey { .. })));
    }

    #[rstest]
    #[case("list:\n  - a\n  - b")]
    #[case("number: 42")]
    #[case("flag: true")]
    fn manifest_rejects_unsupported_values(#[case] contents: &str) {
        let result: Result<Manifest, _> = contents.try_into();
        assert!(matches!(result, Err(ManifestError::InvalidEntry { .. })));
    }

    #[test]
    fn manifest_handles_unicode_names() {
        let manifest: Manifest = "\"тест\":\n  \"🚀.txt\": launch".try_into().unwrap();
        let mut fs = Filesystem::new();
        manifest.apply(&mut fs).unwrap();

        assert_eq!(fs.read_file("/тест/🚀.txt").unwrap(), b"launch");
    }

    #[compio::test]
    async fn manifest_reads_from_file() {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        write!(file, "{}", SAMPLE).expect("Failed to write to temp file");

        let manifest = Manifest::from_path(file.path()).await.unwrap();
        assert_eq!(manifest.entries().len(), 3);
    }

    #[compio::test]
    async fn manifest_returns_error_on_nonexistent_file() {
        let result = Manifest::from_path(Path::new("nonexistent.yaml")).await;
        assert!(matches!(result, Err(ManifestError::ReadError { .. })));
    }
}
