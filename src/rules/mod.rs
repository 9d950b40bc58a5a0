//! Rewrite rules.
//!
//! A rule is a [`Transform`](crate::visitor::Transform): a pure function of
//! a node and the type facts the [`TypeQuery`](crate::checker::TypeQuery)
//! facade exposes.

pub mod deprecated_call;

pub use deprecated_call::{DeprecatedCallRule, Migration};
