use crate::checker::NullabilityPolicy;
use crate::printer::{is_identifier, Literal};
use crate::program::CompilerOptions;
use crate::rules::Migration;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RewriteConfig {
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default = "default_migrations")]
    pub migrations: Vec<MigrationDefinition>,
}

impl RewriteConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.migrations.is_empty() {
            issues.push(ValidationIssue::EmptyMigrationList);
        }

        let mut seen = HashSet::new();
        for migration in &self.migrations {
            let id = || (!migration.deprecated.is_empty()).then(|| migration.deprecated.clone());

            for (field, value) in [
                ("deprecated", &migration.deprecated),
                ("replacement", &migration.replacement),
            ] {
                if value.trim().is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        migration: id(),
                        field,
                    });
                } else if !is_identifier(value) {
                    issues.push(ValidationIssue::InvalidName {
                        migration: id(),
                        field,
                        value: value.clone(),
                    });
                }
            }

            if !migration.deprecated.is_empty() && !seen.insert(migration.deprecated.as_str()) {
                issues.push(ValidationIssue::DuplicateMigration {
                    deprecated: migration.deprecated.clone(),
                });
            }

            if !migration.deprecated.is_empty() && migration.deprecated == migration.replacement {
                issues.push(ValidationIssue::InvalidCombo {
                    migration: id(),
                    message: "replacement must differ from the deprecated name".to_string(),
                });
            }

            if let FallbackLiteral::Float(value) = migration.fallback {
                if !value.is_finite() {
                    issues.push(ValidationIssue::InvalidCombo {
                        migration: id(),
                        message: format!("fallback {value} is not a finite number"),
                    });
                }
            }
        }

        for name in &self.checker.ambient_globals {
            if !is_identifier(name) {
                issues.push(ValidationIssue::InvalidGlobal { value: name.clone() });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            strict: self.checker.strict,
            ambient_globals: self.checker.ambient_globals.clone(),
        }
    }

    pub fn migrations(&self) -> Vec<Migration> {
        self.migrations.iter().map(MigrationDefinition::to_migration).collect()
    }
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            checker: CheckerConfig::default(),
            migrations: default_migrations(),
        }
    }
}

fn default_migrations() -> Vec<MigrationDefinition> {
    vec![MigrationDefinition::default()]
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    #[serde(default = "default_strict")]
    pub strict: bool,
    #[serde(default)]
    pub nullability: NullabilityPolicy,
    /// Extra global names the project's runtime provides without a
    /// declaration in the checked files.
    #[serde(default)]
    pub ambient_globals: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            strict: default_strict(),
            nullability: NullabilityPolicy::default(),
            ambient_globals: Vec::new(),
        }
    }
}

fn default_strict() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MigrationDefinition {
    pub deprecated: String,
    pub replacement: String,
    #[serde(default)]
    pub subject_argument: usize,
    #[serde(default)]
    pub fallback: FallbackLiteral,
}

impl Default for MigrationDefinition {
    fn default() -> Self {
        let migration = Migration::default();
        Self {
            deprecated: migration.deprecated,
            replacement: migration.replacement,
            subject_argument: migration.subject_argument,
            fallback: FallbackLiteral::default(),
        }
    }
}

impl MigrationDefinition {
    pub fn to_migration(&self) -> Migration {
        Migration {
            deprecated: self.deprecated.clone(),
            replacement: self.replacement.clone(),
            subject_argument: self.subject_argument,
            fallback: self.fallback.to_literal(),
        }
    }
}

/// TOML scalar used as the `??` fallback.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FallbackLiteral {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Default for FallbackLiteral {
    fn default() -> Self {
        FallbackLiteral::Bool(false)
    }
}

impl FallbackLiteral {
    pub fn to_literal(&self) -> Literal {
        match self {
            FallbackLiteral::Bool(value) => Literal::Boolean(*value),
            FallbackLiteral::Integer(value) => Literal::Integer(*value),
            FallbackLiteral::Float(value) => Literal::Float(*value),
            FallbackLiteral::String(value) => Literal::String(value.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    EmptyMigrationList,
    MissingField {
        migration: Option<String>,
        field: &'static str,
    },
    InvalidName {
        migration: Option<String>,
        field: &'static str,
        value: String,
    },
    DuplicateMigration {
        deprecated: String,
    },
    InvalidGlobal {
        value: String,
    },
    InvalidCombo {
        migration: Option<String>,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyMigrationList => write!(f, "config contains no migrations"),
            ValidationIssue::MissingField { migration, field } => match migration {
                Some(id) => write!(f, "migration '{id}' missing required field '{field}'"),
                None => write!(f, "migration missing required field '{field}'"),
            },
            ValidationIssue::InvalidName {
                migration,
                field,
                value,
            } => match migration {
                Some(id) => write!(
                    f,
                    "migration '{id}' field '{field}' is not an identifier: '{value}'"
                ),
                None => write!(f, "migration field '{field}' is not an identifier: '{value}'"),
            },
            ValidationIssue::DuplicateMigration { deprecated } => {
                write!(f, "migration '{deprecated}' is defined more than once")
            }
            ValidationIssue::InvalidGlobal { value } => {
                write!(f, "ambient global is not an identifier: '{value}'")
            }
            ValidationIssue::InvalidCombo { migration, message } => match migration {
                Some(id) => write!(f, "migration '{id}' has invalid configuration: {message}"),
                None => write!(f, "invalid migration configuration: {message}"),
            },
        }
    }
}
