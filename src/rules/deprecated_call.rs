use crate::checker::{TypeQuery, TypeQueryError};
use crate::printer::{BinaryOperator, Fragment, Literal};
use crate::ts::SyntaxNode;
use crate::visitor::Transform;
use std::collections::HashMap;

/// One deprecated member call and the call that replaces it.
///
/// `recv.deprecated(a0, .., subject, .., an)` becomes
/// `subject.replacement(a0, .., an)`, or
/// `subject?.replacement(a0, .., an) ?? fallback` when `subject` is nullable.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    pub deprecated: String,
    pub replacement: String,
    /// Position of the argument that becomes the new receiver.
    pub subject_argument: usize,
    /// Value of the whole expression when the subject is absent.
    pub fallback: Literal,
}

impl Default for Migration {
    fn default() -> Self {
        Self {
            deprecated: "deprecated_some".to_string(),
            replacement: "some".to_string(),
            subject_argument: 0,
            fallback: Literal::Boolean(false),
        }
    }
}

/// Migrates calls of deprecated helper members onto the subject argument.
#[derive(Debug)]
pub struct DeprecatedCallRule<'p> {
    migrations: HashMap<String, Migration>,
    types: TypeQuery<'p>,
}

impl<'p> DeprecatedCallRule<'p> {
    /// Later migrations with an already registered `deprecated` name replace
    /// earlier ones.
    pub fn new(migrations: impl IntoIterator<Item = Migration>, types: TypeQuery<'p>) -> Self {
        let migrations = migrations
            .into_iter()
            .map(|m| (m.deprecated.clone(), m))
            .collect();
        Self { migrations, types }
    }

    /// The `deprecated_some` migration only.
    pub fn with_defaults(types: TypeQuery<'p>) -> Self {
        Self::new([Migration::default()], types)
    }

    fn migration_for(&self, node: SyntaxNode<'_>) -> Option<&Migration> {
        if node.kind() != "call_expression" {
            return None;
        }
        let callee = node.field("function")?;
        if callee.kind() != "member_expression" {
            return None;
        }
        let member = callee.field("property")?;
        self.migrations.get(member.text())
    }
}

impl Transform for DeprecatedCallRule<'_> {
    fn transform<'f>(&self, node: SyntaxNode<'f>) -> Result<Option<Fragment<'f>>, TypeQueryError> {
        let Some(migration) = self.migration_for(node) else {
            return Ok(None);
        };

        // Tagged templates use the same call node with a template argument
        let Some(arguments) = node.field("arguments").filter(|a| a.kind() == "arguments") else {
            return Ok(None);
        };
        let arguments = arguments.named_children();

        let spread_before_subject = arguments
            .iter()
            .take(migration.subject_argument + 1)
            .any(|arg| arg.kind() == "spread_element");
        if arguments.len() <= migration.subject_argument || spread_before_subject {
            tracing::warn!(
                path = %node.file().path().display(),
                location = %node.location(),
                member = %migration.deprecated,
                "call shape not supported, leaving it unchanged"
            );
            return Ok(None);
        }

        let subject = arguments[migration.subject_argument];
        let rest = arguments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != migration.subject_argument)
            .map(|(_, arg)| Fragment::node(*arg))
            .collect();

        let nullable = self.types.is_nullable(subject)?;
        let call = Fragment::call(
            Fragment::property_access(Fragment::node(subject), nullable, &migration.replacement),
            rest,
        );

        if nullable {
            Ok(Some(Fragment::binary(
                call,
                BinaryOperator::Coalesce,
                Fragment::Literal(migration.fallback.clone()),
            )))
        } else {
            Ok(Some(call))
        }
    }
}
