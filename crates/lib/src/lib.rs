//! buildgit2-lib: cross-compiles libgit2 and its dependencies for Apple platforms.
//!
//! The crate is organised bottom-up:
//! - `platform`, `library`, `target`: the build matrix and on-disk layout
//! - `process`, `tools`, `fs`, `context`: injected side effects
//! - `fetch`, `toolchain`, `driver`: single-architecture builds
//! - `merge`, `bundle`: universal archives and xcframework bundles
//! - `execute`: planning and running a whole request

pub mod bundle;
pub mod config;
pub mod consts;
pub mod context;
pub mod driver;
pub mod execute;
pub mod fetch;
pub mod fs;
pub mod library;
pub mod merge;
pub mod platform;
pub mod process;
pub mod target;
pub mod toolchain;
pub mod tools;
pub mod util;
