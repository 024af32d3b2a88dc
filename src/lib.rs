//! An in-memory hierarchical filesystem addressed by slash separated paths.
//!
//! ```
//! use memfs::filesystem::Filesystem;
//!
//! let mut fs = Filesystem::new();
//! fs.mkdir("/a/b").unwrap();
//! fs.create_file("/a/b/f.txt", "hi").unwrap();
//!
//! assert_eq!(fs.list("/a/b").unwrap(), vec!["f.txt"]);
//! assert_eq!(fs.read_file("/a/b/f.txt").unwrap(), b"hi");
//! ```

pub mod config;
pub mod filesystem;
pub mod shell;
