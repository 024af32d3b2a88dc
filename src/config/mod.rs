//! Startup configuration: the YAML manifest that seeds a filesystem.

mod manifest;

pub use manifest::{Manifest, ManifestEntry, ManifestError};
