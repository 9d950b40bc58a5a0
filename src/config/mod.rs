pub mod loader;
pub mod schema;

pub use loader::{discover, load_from_path, load_from_str, ConfigError, DEFAULT_CONFIG_FILE};
pub use schema::{
    CheckerConfig, FallbackLiteral, MigrationDefinition, RewriteConfig, ValidationError,
    ValidationIssue,
};
