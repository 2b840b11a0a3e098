//! Package Patcher: reversible literal-text patches for installed npm packages
//!
//! A patch config names one file (a local path, or a file inside a globally
//! installed package) and an ordered list of `[match, replacement]` pairs.
//!
//! # Guarantees
//!
//! - The first patch of a target saves its original bytes to `<file>.backup`;
//!   later patches never overwrite that backup
//! - Replacements are all-or-nothing: one missing match leaves the target
//!   untouched and reports every missing match at once
//! - Target writes are atomic (tempfile + fsync + rename)
//! - `undo` restores the backup and can be repeated safely
//!
//! # Example
//!
//! ```no_run
//! use package_patcher::{Patcher, PatchConfig, Replacement};
//!
//! let config = PatchConfig::global(
//!     "is-odd",
//!     vec![Replacement::new("return n % 2 === 1;", "return n % 2 !== 0;")],
//! );
//!
//! let patcher = Patcher::new();
//! match patcher.apply(&config) {
//!     Ok(report) => println!("patched {}", report.target.path.display()),
//!     Err(e) => eprintln!("patch failed: {}", e),
//! }
//! ```

pub mod backup;
pub mod config;
pub mod engine;
pub mod logging;
pub mod reformat;
pub mod replace;
pub mod resolve;

// Re-exports
pub use config::{
    load_from_path, load_from_str, ConfigError, Format, LoadError, PatchConfig, Replacement,
    Target, VersionError,
};
pub use engine::{PatchError, PatchReport, Patcher, UndoReport};
pub use reformat::{Identity, Normalizer, Reformatter};
pub use replace::{ReplacementError, ReplacementOutcome};
pub use resolve::{FixedGlobalRoot, GlobalRoot, NpmGlobalRoot, ResolutionError, ResolvedTarget};
