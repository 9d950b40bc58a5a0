use crate::checker::{StaticType, TypeChecker, TypeQueryError};
use crate::ts::SyntaxNode;
use serde::Deserialize;

/// Which absent-value markers make a union count as nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NullabilityPolicy {
    /// Only a `null` member counts; `T | undefined` is not nullable.
    #[default]
    NullOnly,
    /// `null` or `undefined` members count.
    NullOrUndefined,
}

impl NullabilityPolicy {
    fn is_absent_marker(self, ty: &StaticType) -> bool {
        match self {
            NullabilityPolicy::NullOnly => *ty == StaticType::Null,
            NullabilityPolicy::NullOrUndefined => {
                matches!(ty, StaticType::Null | StaticType::Undefined)
            }
        }
    }
}

/// The type facts rewrite rules are allowed to ask for.
#[derive(Debug, Clone, Copy)]
pub struct TypeQuery<'p> {
    checker: TypeChecker<'p>,
    policy: NullabilityPolicy,
}

impl<'p> TypeQuery<'p> {
    pub fn new(checker: TypeChecker<'p>, policy: NullabilityPolicy) -> Self {
        Self { checker, policy }
    }

    pub fn policy(&self) -> NullabilityPolicy {
        self.policy
    }

    /// True iff the static type of `node` is a union with an absent-value
    /// member. A bare `null` type is not a union and is not nullable.
    pub fn is_nullable(&self, node: SyntaxNode<'_>) -> Result<bool, TypeQueryError> {
        let ty = self.checker.type_at_location(node)?;
        let nullable =
            ty.is_union() && ty.members().iter().any(|member| self.policy.is_absent_marker(member));

        tracing::trace!(
            path = %node.file().path().display(),
            location = %node.location(),
            ty = %ty,
            nullable,
            "type query"
        );

        Ok(nullable)
    }
}
