pub mod loader;
pub mod schema;
pub mod version;

pub use loader::{load_from_path, load_from_str, Format, LoadError};
pub use schema::{ConfigError, ConfigIssue, PatchConfig, Replacement, Target};
pub use version::{matches_requirement, VersionError};
