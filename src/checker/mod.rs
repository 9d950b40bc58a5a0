//! Static type facts for expressions.
//!
//! [`TypeChecker`] is a declaration-driven checker. It resolves identifiers
//! to their declarations (following relative imports), reads type
//! annotations and expands aliases, and types literals together with the
//! common expression shapes: member access, calls, `new`, `this` and
//! destructuring. Object types are read lazily, one member at a time, so a
//! large or recursive type graph is never expanded as a whole. Anything it
//! cannot see through is [`StaticType::Opaque`], which is never nullable.
//! Rewrite rules consume it through the [`TypeQuery`] facade.

pub mod errors;
pub mod query;
mod scope;
pub mod types;

pub use errors::TypeQueryError;
pub use query::{NullabilityPolicy, TypeQuery};
pub use types::{ShapeId, StaticType};

use crate::program::Program;
use crate::ts::SyntaxNode;
use scope::Binding;
use std::collections::HashMap;

/// Bound on alias expansion, member lookup and initializer chasing.
const MAX_DEPTH: usize = 32;

/// Extra depth charged for inferring a function's return type from its
/// body, which may recurse into the function itself.
const INFERENCE_COST: usize = 4;

/// Runtime globals (ECMAScript, DOM and Node.js) that resolve without a
/// declaration in the program.
const STANDARD_GLOBALS: &[&str] = &[
    "AbortController",
    "Array",
    "ArrayBuffer",
    "BigInt",
    "Blob",
    "Boolean",
    "Buffer",
    "CustomEvent",
    "DataView",
    "Date",
    "Element",
    "Error",
    "Event",
    "EventTarget",
    "File",
    "FormData",
    "Function",
    "HTMLElement",
    "Headers",
    "Infinity",
    "Intl",
    "JSON",
    "Map",
    "Math",
    "NaN",
    "Number",
    "Object",
    "Promise",
    "Proxy",
    "RangeError",
    "Reflect",
    "RegExp",
    "Request",
    "Response",
    "Set",
    "String",
    "Symbol",
    "SyntaxError",
    "TextDecoder",
    "TextEncoder",
    "TypeError",
    "URL",
    "URLSearchParams",
    "Uint8Array",
    "WeakMap",
    "WeakRef",
    "WeakSet",
    "WebSocket",
    "Worker",
    "__dirname",
    "__filename",
    "alert",
    "arguments",
    "atob",
    "btoa",
    "cancelAnimationFrame",
    "clearInterval",
    "clearTimeout",
    "console",
    "crypto",
    "decodeURIComponent",
    "document",
    "encodeURIComponent",
    "exports",
    "fetch",
    "global",
    "globalThis",
    "history",
    "isFinite",
    "isNaN",
    "localStorage",
    "location",
    "module",
    "navigator",
    "parseFloat",
    "parseInt",
    "performance",
    "process",
    "queueMicrotask",
    "requestAnimationFrame",
    "require",
    "self",
    "sessionStorage",
    "setInterval",
    "setTimeout",
    "structuredClone",
    "window",
];

/// Array methods whose callback receives the element as its first
/// parameter and the index as its second.
const ELEMENT_CALLBACKS: &[&str] = &[
    "every",
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "flatMap",
    "forEach",
    "map",
    "some",
];

/// Type parameter bindings in effect while lowering a type node.
#[derive(Debug, Clone, Default)]
struct TypeEnv {
    bindings: HashMap<String, StaticType>,
    /// Aliases being expanded on the current path; a repeat stays a
    /// reference.
    expanding: Vec<String>,
}

impl TypeEnv {
    fn from_bindings(bindings: &[(String, StaticType)]) -> Self {
        Self {
            bindings: bindings.iter().cloned().collect(),
            expanding: Vec::new(),
        }
    }

    fn sorted_bindings(&self) -> Vec<(String, StaticType)> {
        let mut bindings: Vec<_> = self
            .bindings
            .iter()
            .map(|(name, ty)| (name.clone(), ty.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));
        bindings
    }
}

/// Answers type queries against one [`Program`].
#[derive(Debug, Clone, Copy)]
pub struct TypeChecker<'p> {
    program: &'p Program,
}

impl<'p> TypeChecker<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Static type of the expression `node`.
    ///
    /// `node` must come from a file of this checker's program.
    pub fn type_at_location(&self, node: SyntaxNode<'_>) -> Result<StaticType, TypeQueryError> {
        if !self.program.contains(node.file()) {
            return Err(TypeQueryError::ForeignNode {
                path: node.file().path().to_path_buf(),
                location: node.location(),
            });
        }

        let ty = self.expression_type(node, 0)?;
        if self.program.options().strict {
            Ok(ty)
        } else {
            Ok(ty.erase_nullish_in_unions())
        }
    }

    fn expression_type<'a>(
        &'a self,
        node: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        if depth > MAX_DEPTH {
            return Ok(StaticType::Opaque);
        }

        let ty = match node.kind() {
            "null" => StaticType::Null,
            "undefined" => StaticType::Undefined,
            "identifier" | "shorthand_property_identifier" if node.text() == "undefined" => {
                StaticType::Undefined
            }
            "identifier" | "shorthand_property_identifier" => self.identifier_type(node, depth)?,
            "this" => self.this_type(node, depth)?,
            "string" | "template_string" => StaticType::primitive("string"),
            "number" => StaticType::primitive("number"),
            "true" | "false" => StaticType::primitive("boolean"),
            "regex" => StaticType::reference("RegExp"),
            "array" => self.array_literal_type(node, depth)?,
            "object" => self.shape(node, "{ ... }", &TypeEnv::default()),
            "arrow_function" | "function_expression" | "function" => {
                StaticType::Function(Box::new(self.return_type(node, &TypeEnv::default(), depth)?))
            }
            "class" => StaticType::Opaque,
            "parenthesized_expression" | "satisfies_expression" => match node.first_named_child() {
                Some(inner) => self.expression_type(inner, depth + 1)?,
                None => StaticType::Opaque,
            },
            "non_null_expression" => match node.first_named_child() {
                Some(inner) => self.expression_type(inner, depth + 1)?.without_nullish(),
                None => StaticType::Opaque,
            },
            "await_expression" => match node.first_named_child() {
                Some(inner) => awaited(self.expression_type(inner, depth + 1)?),
                None => StaticType::Opaque,
            },
            "as_expression" => {
                let children = node.named_children();
                match children.as_slice() {
                    [_, target] => self.lower_type(*target, &TypeEnv::default(), depth + 1)?,
                    // `x as const`
                    [expr] => self.expression_type(*expr, depth + 1)?,
                    _ => StaticType::Opaque,
                }
            }
            "assignment_expression" => match node.field("right") {
                Some(right) => self.expression_type(right, depth + 1)?,
                None => StaticType::Opaque,
            },
            "ternary_expression" => {
                let mut branches = Vec::with_capacity(2);
                for field in ["consequence", "alternative"] {
                    if let Some(branch) = node.field(field) {
                        branches.push(self.expression_type(branch, depth + 1)?);
                    }
                }
                StaticType::union(branches)
            }
            "binary_expression" if matches!(operator_text(node), Some("??") | Some("||")) => {
                let left = match node.field("left") {
                    Some(left) => self.expression_type(left, depth + 1)?.without_nullish(),
                    None => StaticType::Opaque,
                };
                let right = match node.field("right") {
                    Some(right) => self.expression_type(right, depth + 1)?,
                    None => StaticType::Opaque,
                };
                StaticType::union([left, right])
            }
            "unary_expression" => match operator_text(node) {
                Some("typeof") => StaticType::primitive("string"),
                Some("!") | Some("delete") => StaticType::primitive("boolean"),
                Some("void") => StaticType::Undefined,
                Some("-") | Some("+") | Some("~") => StaticType::primitive("number"),
                _ => StaticType::Opaque,
            },
            "member_expression" => {
                let object = self.field_type(node, "object", depth)?;
                let ty = match node.field("property") {
                    Some(property) => self.property_type(&object, property.text(), depth + 1)?,
                    None => StaticType::Opaque,
                };
                continue_chain(node, ty)
            }
            "subscript_expression" => {
                let object = self.field_type(node, "object", depth)?;
                let index = node.field("index");
                let ty = match index.and_then(scope::string_value) {
                    Some(key) => self.property_type(&object, key, depth + 1)?,
                    None => {
                        let position = index
                            .filter(|index| index.kind() == "number")
                            .and_then(|index| index.text().parse().ok());
                        element_type(&object, position)
                    }
                };
                continue_chain(node, ty)
            }
            "call_expression" => {
                let ty = match node.field("function") {
                    Some(callee) if callee.kind() != "import" => {
                        call_result(&self.expression_type(callee, depth + 1)?)
                    }
                    _ => StaticType::Opaque,
                };
                continue_chain(node, ty)
            }
            "new_expression" => match node.field("constructor") {
                Some(constructor) => {
                    self.instance_type(constructor, node.field("type_arguments"), depth + 1)?
                }
                None => StaticType::Opaque,
            },
            _ => StaticType::Opaque,
        };

        Ok(ty)
    }

    fn field_type<'a>(
        &'a self,
        node: SyntaxNode<'a>,
        field: &str,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        match node.field(field) {
            Some(child) => self.expression_type(child, depth + 1),
            None => Ok(StaticType::Opaque),
        }
    }

    fn array_literal_type<'a>(
        &'a self,
        node: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let elements = node.named_children();
        if elements.is_empty() || elements.iter().any(|e| e.kind() == "spread_element") {
            return Ok(StaticType::Array(Box::new(StaticType::Opaque)));
        }

        let mut members = Vec::with_capacity(elements.len());
        for element in elements {
            members.push(self.expression_type(element, depth + 1)?);
        }
        Ok(StaticType::Array(Box::new(StaticType::union(members))))
    }

    fn identifier_type<'a>(
        &'a self,
        node: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let name = node.text();
        match scope::resolve_value(self.program, node, name) {
            Some(binding) => self.binding_type(binding, name, depth + 1),
            None if self.is_ambient_global(name) => Ok(StaticType::Opaque),
            None => Err(TypeQueryError::UnresolvedSymbol {
                name: name.to_string(),
                path: node.file().path().to_path_buf(),
                location: node.location(),
            }),
        }
    }

    fn is_ambient_global(&self, name: &str) -> bool {
        STANDARD_GLOBALS.contains(&name)
            || self
                .program
                .options()
                .ambient_globals
                .iter()
                .any(|global| global == name)
    }

    fn binding_type<'a>(
        &'a self,
        binding: Binding<'a>,
        name: &str,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        match binding {
            Binding::Variable(declarator) => self.owner_type(declarator, depth),
            Binding::Parameter { node, optional } => self.parameter_type(node, optional, depth),
            Binding::Destructured { owner, pattern } => {
                let source = self.owner_type(owner, depth)?;
                Ok(self
                    .pattern_type(pattern, source, name, depth + 1)?
                    .unwrap_or(StaticType::Opaque))
            }
            Binding::ForOf(statement) => self.owner_type(statement, depth),
            Binding::Function(decl) => Ok(StaticType::Function(Box::new(self.return_type(
                decl,
                &TypeEnv::default(),
                depth,
            )?))),
            Binding::Class(_) | Binding::Import { .. } | Binding::Opaque => Ok(StaticType::Opaque),
        }
    }

    /// Type of the value a declarator, parameter or `for ... of` loop
    /// binds, before any destructuring.
    fn owner_type<'a>(
        &'a self,
        owner: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        match owner.kind() {
            "variable_declarator" => {
                if let Some(annotation) = owner.field("type") {
                    self.annotation_type(annotation, &TypeEnv::default(), depth + 1)
                } else if let Some(value) = owner.field("value") {
                    self.expression_type(value, depth + 1)
                } else {
                    Ok(StaticType::Opaque)
                }
            }
            "required_parameter" => self.parameter_type(owner, false, depth),
            "optional_parameter" => self.parameter_type(owner, true, depth),
            "for_in_statement" => {
                let iterated = self.field_type(owner, "right", depth)?;
                Ok(element_type(&iterated, None))
            }
            _ => Ok(StaticType::Opaque),
        }
    }

    fn parameter_type<'a>(
        &'a self,
        parameter: SyntaxNode<'a>,
        optional: bool,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        if parameter.kind() == "identifier" {
            return self.contextual_parameter_type(parameter, depth);
        }

        let declared = match (parameter.field("type"), parameter.field("value")) {
            (Some(annotation), _) => self.annotation_type(annotation, &TypeEnv::default(), depth + 1)?,
            (None, Some(value)) => self.expression_type(value, depth + 1)?,
            (None, None) => self.contextual_parameter_type(parameter, depth)?,
        };
        if optional && parameter.field("value").is_none() {
            Ok(StaticType::union([declared, StaticType::Undefined]))
        } else {
            Ok(declared)
        }
    }

    /// Type of an unannotated callback parameter from the array method the
    /// callback is passed to (`xs.forEach((x) => ...)`).
    fn contextual_parameter_type<'a>(
        &'a self,
        parameter: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let Some((receiver, position)) = callback_receiver(parameter) else {
            return Ok(StaticType::Opaque);
        };
        match position {
            0 => {
                let iterated = self.expression_type(receiver, depth + 1)?;
                Ok(element_type(&iterated, None))
            }
            1 => Ok(StaticType::primitive("number")),
            _ => Ok(StaticType::Opaque),
        }
    }

    /// Type bound to `name` inside `pattern` when the whole pattern receives
    /// a value of type `source`. `None` when the pattern does not bind it.
    fn pattern_type<'a>(
        &'a self,
        pattern: SyntaxNode<'a>,
        source: StaticType,
        name: &str,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        if depth > MAX_DEPTH {
            return Ok(Some(StaticType::Opaque));
        }

        match pattern.kind() {
            "identifier" => Ok((pattern.text() == name).then_some(source)),
            "object_pattern" => {
                for item in pattern.named_children() {
                    if !scope::pattern_binds(item, name) {
                        continue;
                    }
                    return match item.kind() {
                        "shorthand_property_identifier_pattern" => {
                            Ok(Some(self.property_type(&source, name, depth + 1)?))
                        }
                        "pair_pattern" => {
                            let key = item.field("key").and_then(property_name);
                            let value_ty = match key {
                                Some(key) => self.property_type(&source, key, depth + 1)?,
                                None => StaticType::Opaque,
                            };
                            match item.field("value") {
                                Some(value) => self.pattern_type(value, value_ty, name, depth + 1),
                                None => Ok(None),
                            }
                        }
                        "object_assignment_pattern" => {
                            let Some(left) = item.field("left") else {
                                return Ok(None);
                            };
                            let declared = if left.kind() == "shorthand_property_identifier_pattern" {
                                self.property_type(&source, left.text(), depth + 1)?
                            } else {
                                StaticType::Opaque
                            };
                            let ty = self.with_default(declared, item.field("right"), depth)?;
                            if left.kind() == "shorthand_property_identifier_pattern" {
                                Ok(Some(ty))
                            } else {
                                self.pattern_type(left, ty, name, depth + 1)
                            }
                        }
                        _ => Ok(Some(StaticType::Opaque)),
                    };
                }
                Ok(None)
            }
            "array_pattern" => {
                for (position, item) in array_slots(pattern) {
                    if !scope::pattern_binds(item, name) {
                        continue;
                    }
                    if item.kind() == "rest_pattern" {
                        return Ok(Some(StaticType::Opaque));
                    }
                    let element = element_type(&source, Some(position));
                    return self.pattern_type(item, element, name, depth + 1);
                }
                Ok(None)
            }
            "assignment_pattern" => {
                let Some(left) = pattern.field("left") else {
                    return Ok(None);
                };
                let ty = self.with_default(source, pattern.field("right"), depth)?;
                self.pattern_type(left, ty, name, depth + 1)
            }
            _ => Ok(None),
        }
    }

    /// A default replaces `undefined` (but not `null`) with its own type.
    fn with_default<'a>(
        &'a self,
        declared: StaticType,
        default: Option<SyntaxNode<'a>>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        match default {
            Some(default) => Ok(StaticType::union([
                declared.without_undefined(),
                self.expression_type(default, depth + 1)?,
            ])),
            None => Ok(declared),
        }
    }

    /// Return type of a function-like node: its annotation, else what its
    /// body returns.
    fn return_type<'a>(
        &'a self,
        function: SyntaxNode<'a>,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let Some(annotation) = function.field("return_type") else {
            return self.inferred_return_type(function, depth);
        };
        match annotation.kind() {
            "type_annotation" => self.annotation_type(annotation, env, depth + 1),
            "type_predicate_annotation" | "type_predicate" => Ok(StaticType::primitive("boolean")),
            "asserts_annotation" | "asserts" => Ok(StaticType::primitive("void")),
            // function types carry the return type bare
            _ => self.lower_type(annotation, env, depth + 1),
        }
    }

    fn inferred_return_type<'a>(
        &'a self,
        function: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let depth = depth + INFERENCE_COST;
        let Some(body) = function.field("body") else {
            return Ok(StaticType::Opaque);
        };
        if body.kind() != "statement_block" {
            return self.expression_type(body, depth);
        }
        if function.has_token("*") {
            return Ok(StaticType::Opaque);
        }

        let mut returned = Vec::new();
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            for child in node.named_children() {
                match child.kind() {
                    "return_statement" => returned.push(match child.first_named_child() {
                        Some(value) => self.expression_type(value, depth)?,
                        None => StaticType::Undefined,
                    }),
                    kind if is_function_like(kind) => {}
                    _ => stack.push(child),
                }
            }
        }

        let ty = if returned.is_empty() {
            StaticType::primitive("void")
        } else {
            StaticType::union(returned)
        };
        if function.has_token("async") {
            Ok(StaticType::Reference {
                name: "Promise".to_string(),
                arguments: vec![ty],
            })
        } else {
            Ok(ty)
        }
    }

    /// Instance type of the class value `constructor` names.
    fn instance_type<'a>(
        &'a self,
        constructor: SyntaxNode<'a>,
        type_arguments: Option<SyntaxNode<'a>>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let class = match constructor.kind() {
            "identifier" => match scope::resolve_value(self.program, constructor, constructor.text()) {
                Some(Binding::Class(class)) => class,
                _ => return Ok(StaticType::Opaque),
            },
            "class" => constructor,
            _ => return Ok(StaticType::Opaque),
        };

        let mut arguments = Vec::new();
        if let Some(args) = type_arguments {
            for arg in args.named_children() {
                arguments.push(self.lower_type(arg, &TypeEnv::default(), depth + 1)?);
            }
        }
        self.declared_type(class, arguments, &TypeEnv::default(), depth)
    }

    /// `this` inside a class body is the instance; elsewhere it is opaque.
    fn this_type<'a>(
        &'a self,
        node: SyntaxNode<'a>,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let mut current = node.parent();
        while let Some(scope) = current {
            match scope.kind() {
                "method_definition" | "public_field_definition" if scope.has_token("static") => {
                    return Ok(StaticType::Opaque);
                }
                "class_body" => {
                    return match scope.parent() {
                        Some(class) => self.declared_type(class, Vec::new(), &TypeEnv::default(), depth),
                        None => Ok(StaticType::Opaque),
                    };
                }
                "function_declaration"
                | "function_expression"
                | "function"
                | "generator_function"
                | "generator_function_declaration"
                | "object"
                | "program" => return Ok(StaticType::Opaque),
                _ => {}
            }
            current = scope.parent();
        }
        Ok(StaticType::Opaque)
    }

    /// Type of a `type_annotation` node (`: T`).
    fn annotation_type<'a>(
        &'a self,
        annotation: SyntaxNode<'a>,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        match annotation.first_named_child() {
            Some(ty) => self.lower_type(ty, env, depth),
            None => Ok(StaticType::Opaque),
        }
    }

    fn lower_type<'a>(
        &'a self,
        node: SyntaxNode<'a>,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        if depth > MAX_DEPTH {
            return Ok(StaticType::Opaque);
        }

        let ty = match node.kind() {
            "union_type" => {
                let mut members = Vec::new();
                for member in node.named_children() {
                    members.push(self.lower_type(member, env, depth + 1)?);
                }
                StaticType::union(members)
            }
            "parenthesized_type" | "readonly_type" => match node.first_named_child() {
                Some(inner) => self.lower_type(inner, env, depth + 1)?,
                None => StaticType::Opaque,
            },
            "null" => StaticType::Null,
            "undefined" => StaticType::Undefined,
            "literal_type" => match node.first_named_child().map(|child| child.kind()) {
                Some("null") => StaticType::Null,
                Some("undefined") => StaticType::Undefined,
                _ => StaticType::Literal(node.text().to_string()),
            },
            "predefined_type" => StaticType::primitive(node.text()),
            "array_type" => match node.first_named_child() {
                Some(element) => StaticType::Array(Box::new(self.lower_type(element, env, depth + 1)?)),
                None => StaticType::Array(Box::new(StaticType::Opaque)),
            },
            "tuple_type" => {
                let mut elements = Vec::new();
                for element in node.named_children() {
                    elements.push(match element.kind() {
                        "optional_type" => {
                            let inner = match element.first_named_child() {
                                Some(inner) => self.lower_type(inner, env, depth + 1)?,
                                None => StaticType::Opaque,
                            };
                            StaticType::union([inner, StaticType::Undefined])
                        }
                        "rest_type" => StaticType::Opaque,
                        _ => self.lower_type(element, env, depth + 1)?,
                    });
                }
                StaticType::Tuple(elements)
            }
            "object_type" => self.shape(node, "{ ... }", env),
            "function_type" => StaticType::Function(Box::new(self.return_type(node, env, depth)?)),
            "type_query" => match node.first_named_child() {
                Some(expr) => self.expression_type(expr, depth + 1)?,
                None => StaticType::Opaque,
            },
            "generic_type" => {
                let Some(name) = node.field("name") else {
                    return Ok(StaticType::Opaque);
                };
                let mut arguments = Vec::new();
                if let Some(args) = node.field("type_arguments") {
                    for arg in args.named_children() {
                        arguments.push(self.lower_type(arg, env, depth + 1)?);
                    }
                }
                self.reference_type(node, name.text(), arguments, env, depth)?
            }
            "type_identifier" => match node.text() {
                "undefined" => StaticType::Undefined,
                "null" => StaticType::Null,
                name => match env.bindings.get(name) {
                    Some(bound) => bound.clone(),
                    None => self.reference_type(node, name, Vec::new(), env, depth)?,
                },
            },
            "nested_type_identifier" => StaticType::reference(node.text()),
            _ => StaticType::Opaque,
        };

        Ok(ty)
    }

    /// Resolve a named type reference: built-in generics, then aliases,
    /// interfaces and classes in scope, otherwise an unexpanded reference.
    fn reference_type<'a>(
        &'a self,
        site: SyntaxNode<'a>,
        name: &str,
        arguments: Vec<StaticType>,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        match name {
            "Array" | "ReadonlyArray" => {
                let element = arguments.into_iter().next().unwrap_or(StaticType::Opaque);
                return Ok(StaticType::Array(Box::new(element)));
            }
            "NonNullable" => {
                let inner = arguments.into_iter().next().unwrap_or(StaticType::Opaque);
                return Ok(inner.without_nullish());
            }
            _ => {}
        }

        let unexpanded = |arguments| StaticType::Reference {
            name: name.to_string(),
            arguments,
        };
        if env.expanding.iter().any(|expanding| expanding == name) {
            return Ok(unexpanded(arguments));
        }
        match scope::resolve_type(self.program, site, name) {
            Some(decl) => self.declared_type(decl, arguments, env, depth),
            None => Ok(unexpanded(arguments)),
        }
    }

    /// Instantiate a type alias, interface or class declaration with
    /// `arguments` for its type parameters.
    fn declared_type<'a>(
        &'a self,
        decl: SyntaxNode<'a>,
        arguments: Vec<StaticType>,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let name = decl.field("name").map_or("", |name| name.text());
        let mut inner = TypeEnv {
            bindings: HashMap::new(),
            expanding: env.expanding.clone(),
        };
        inner.expanding.push(name.to_string());

        if let Some(params) = decl.field("type_parameters") {
            let mut supplied = arguments.into_iter();
            for param in params.named_children() {
                if param.kind() != "type_parameter" {
                    continue;
                }
                let Some(param_name) = param.field("name") else {
                    continue;
                };
                let bound = match supplied.next() {
                    Some(arg) => arg,
                    None => match param.field("value").and_then(|d| d.first_named_child()) {
                        Some(default) => self.lower_type(default, &inner, depth + 1)?,
                        None => StaticType::Opaque,
                    },
                };
                inner.bindings.insert(param_name.text().to_string(), bound);
            }
        }

        match decl.kind() {
            "type_alias_declaration" => match decl.field("value") {
                Some(value) => self.lower_type(value, &inner, depth + 1),
                None => Ok(StaticType::Opaque),
            },
            _ => Ok(self.shape(decl, if name.is_empty() { "class" } else { name }, &inner)),
        }
    }

    fn shape(&self, node: SyntaxNode<'_>, label: &str, env: &TypeEnv) -> StaticType {
        let Some(file) = self.program.file_index(node.file()) else {
            return StaticType::Opaque;
        };
        let span = node.span();
        StaticType::Shape {
            id: ShapeId {
                file,
                start: span.start,
                end: span.end,
                kind: node.kind(),
            },
            label: label.to_string(),
            bindings: env.sorted_bindings(),
        }
    }

    /// Type of `.name` on a value of type `ty`; opaque when some member of
    /// `ty` does not declare it.
    fn property_type(
        &self,
        ty: &StaticType,
        name: &str,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        Ok(self
            .member_type(ty, name, depth)?
            .unwrap_or(StaticType::Opaque))
    }

    /// `.name` read from every non-nullish member of `ty`, or `None` when
    /// one of them does not declare it.
    fn member_type(
        &self,
        ty: &StaticType,
        name: &str,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        if depth > MAX_DEPTH {
            return Ok(Some(StaticType::Opaque));
        }

        let mut found = Vec::new();
        for member in ty.members() {
            let property = match member {
                StaticType::Null | StaticType::Undefined => continue,
                StaticType::Primitive(primitive) if primitive == "any" => Some(member.clone()),
                StaticType::Shape { id, bindings, .. } => {
                    self.shape_member(*id, bindings, name, depth + 1)?
                }
                StaticType::Reference { name: utility, arguments } => {
                    self.utility_member(utility, arguments, name, depth + 1)?
                }
                _ => None,
            };
            match property {
                Some(property) => found.push(property),
                None => return Ok(None),
            }
        }

        Ok((!found.is_empty()).then(|| StaticType::union(found)))
    }

    /// Members of the mapped library types that keep their argument's
    /// member types readable.
    fn utility_member(
        &self,
        utility: &str,
        arguments: &[StaticType],
        name: &str,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        let member = match (utility, arguments) {
            ("Record", [_, value]) => Some(value.clone()),
            ("Partial", [inner]) => self
                .member_type(inner, name, depth)?
                .map(|ty| StaticType::union([ty, StaticType::Undefined])),
            ("Required", [inner]) => self
                .member_type(inner, name, depth)?
                .map(StaticType::without_undefined),
            ("Readonly", [inner]) => self.member_type(inner, name, depth)?,
            _ => None,
        };
        Ok(member)
    }

    fn shape_member(
        &self,
        id: ShapeId,
        bindings: &[(String, StaticType)],
        name: &str,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        let Some(node) = self
            .program
            .source_files()
            .get(id.file)
            .and_then(|file| file.node_at(id.start, id.end, id.kind))
        else {
            return Ok(None);
        };
        let env = TypeEnv::from_bindings(bindings);

        match node.kind() {
            "object_type" => self.signature_member(node, name, &env, depth),
            "interface_declaration" => {
                if let Some(body) = node.field("body") {
                    if let Some(found) = self.signature_member(body, name, &env, depth)? {
                        return Ok(Some(found));
                    }
                }
                for clause in node.named_children() {
                    if clause.kind() != "extends_type_clause" {
                        continue;
                    }
                    for base in clause.named_children() {
                        let base = self.lower_type(base, &env, depth + 1)?;
                        if let Some(found) = self.member_type(&base, name, depth + 1)? {
                            return Ok(Some(found));
                        }
                    }
                }
                Ok(None)
            }
            "object" => self.object_member(node, name, depth),
            _ => self.class_member(node, name, &env, depth),
        }
    }

    /// Member of an object type literal or interface body.
    fn signature_member<'a>(
        &'a self,
        container: SyntaxNode<'a>,
        name: &str,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        let mut index_signature = None;
        for item in container.named_children() {
            match item.kind() {
                "property_signature" if member_name(item) == Some(name) => {
                    let ty = match item.field("type") {
                        Some(annotation) => self.annotation_type(annotation, env, depth + 1)?,
                        None => StaticType::primitive("any"),
                    };
                    return Ok(Some(optional_member(item, ty)));
                }
                "method_signature" if member_name(item) == Some(name) => {
                    let returns = self.return_type(item, env, depth + 1)?;
                    return Ok(Some(optional_member(
                        item,
                        StaticType::Function(Box::new(returns)),
                    )));
                }
                "index_signature" if index_signature.is_none() => {
                    index_signature = item.field("type");
                }
                _ => {}
            }
        }

        match index_signature {
            Some(annotation) => Ok(Some(self.annotation_type(annotation, env, depth + 1)?)),
            None => Ok(None),
        }
    }

    /// Member of an object literal. Later entries and spreads override
    /// earlier ones.
    fn object_member<'a>(
        &'a self,
        object: SyntaxNode<'a>,
        name: &str,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        for item in object.named_children().into_iter().rev() {
            match item.kind() {
                "pair" if item.field("key").and_then(property_name) == Some(name) => {
                    return match item.field("value") {
                        Some(value) => Ok(Some(self.expression_type(value, depth + 1)?)),
                        None => Ok(Some(StaticType::Opaque)),
                    };
                }
                "shorthand_property_identifier" if item.text() == name => {
                    return Ok(Some(self.expression_type(item, depth + 1)?));
                }
                "method_definition" if member_name(item) == Some(name) && !item.has_token("set") => {
                    return Ok(Some(self.method_member(item, &TypeEnv::default(), depth)?));
                }
                "spread_element" => {
                    let Some(spread) = item.first_named_child() else {
                        continue;
                    };
                    let spread = self.expression_type(spread, depth + 1)?;
                    if let Some(found) = self.member_type(&spread, name, depth + 1)? {
                        return Ok(Some(found));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Instance member of a class: fields, methods, accessors and
    /// constructor parameter properties, then the base class.
    fn class_member<'a>(
        &'a self,
        class: SyntaxNode<'a>,
        name: &str,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        let Some(body) = class.field("body") else {
            return Ok(None);
        };

        for item in body.named_children() {
            if item.has_token("static") {
                continue;
            }
            match item.kind() {
                "public_field_definition" if member_name(item) == Some(name) => {
                    let ty = match (item.field("type"), item.field("value")) {
                        (Some(annotation), _) => self.annotation_type(annotation, env, depth + 1)?,
                        (None, Some(value)) => self.expression_type(value, depth + 1)?,
                        (None, None) => StaticType::Opaque,
                    };
                    return Ok(Some(optional_member(item, ty)));
                }
                "method_definition" if member_name(item) == Some("constructor") => {
                    if let Some(found) = self.parameter_property(item, name, env, depth)? {
                        return Ok(Some(found));
                    }
                }
                "method_definition" | "method_signature" | "abstract_method_signature"
                    if member_name(item) == Some(name) && !item.has_token("set") =>
                {
                    return Ok(Some(self.method_member(item, env, depth)?));
                }
                _ => {}
            }
        }

        let base = class
            .named_children()
            .into_iter()
            .find(|child| child.kind() == "class_heritage")
            .and_then(|heritage| {
                heritage
                    .named_children()
                    .into_iter()
                    .find(|clause| clause.kind() == "extends_clause")
            });
        let Some(extends) = base else {
            return Ok(None);
        };
        let Some(value) = extends.field("value") else {
            return Ok(None);
        };
        let base = self.instance_type(value, extends.field("type_arguments"), depth + 1)?;
        self.member_type(&base, name, depth + 1)
    }

    /// `constructor(private items: T)` declares an `items` member.
    fn parameter_property<'a>(
        &'a self,
        constructor: SyntaxNode<'a>,
        name: &str,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<Option<StaticType>, TypeQueryError> {
        let Some(parameters) = constructor.field("parameters") else {
            return Ok(None);
        };
        for parameter in parameters.named_children() {
            let is_property = parameter
                .named_children()
                .iter()
                .any(|child| child.kind() == "accessibility_modifier")
                || parameter.has_token("readonly");
            let binds = parameter
                .field("pattern")
                .is_some_and(|pattern| pattern.kind() == "identifier" && pattern.text() == name);
            if !(is_property && binds) {
                continue;
            }
            let declared = match parameter.field("type") {
                Some(annotation) => self.annotation_type(annotation, env, depth + 1)?,
                None => StaticType::Opaque,
            };
            return Ok(Some(if parameter.kind() == "optional_parameter" {
                StaticType::union([declared, StaticType::Undefined])
            } else {
                declared
            }));
        }
        Ok(None)
    }

    /// A getter reads as its return type; other methods are callable.
    fn method_member<'a>(
        &'a self,
        method: SyntaxNode<'a>,
        env: &TypeEnv,
        depth: usize,
    ) -> Result<StaticType, TypeQueryError> {
        let returns = self.return_type(method, env, depth + 1)?;
        if method.has_token("get") {
            Ok(returns)
        } else {
            Ok(optional_member(method, StaticType::Function(Box::new(returns))))
        }
    }
}

fn operator_text<'a>(node: SyntaxNode<'a>) -> Option<&'a str> {
    node.field("operator").map(|op| op.text())
}

/// An access inside an optional chain may short-circuit to `undefined`.
fn continue_chain(node: SyntaxNode<'_>, ty: StaticType) -> StaticType {
    if node.is_optional_chain() {
        StaticType::union([ty, StaticType::Undefined])
    } else {
        ty
    }
}

/// Result of calling a value of type `callee`.
fn call_result(callee: &StaticType) -> StaticType {
    let mut results = Vec::new();
    for member in callee.members() {
        match member {
            StaticType::Null | StaticType::Undefined => {}
            StaticType::Function(returns) => results.push((**returns).clone()),
            StaticType::Primitive(primitive) if primitive == "any" => results.push(member.clone()),
            _ => return StaticType::Opaque,
        }
    }
    if results.is_empty() {
        StaticType::Opaque
    } else {
        StaticType::union(results)
    }
}

/// Element read by indexing (or iterating) a value of type `ty`. `position`
/// selects a tuple element.
fn element_type(ty: &StaticType, position: Option<usize>) -> StaticType {
    let mut elements = Vec::new();
    for member in ty.members() {
        match member {
            StaticType::Null | StaticType::Undefined => {}
            StaticType::Array(element) => elements.push((**element).clone()),
            StaticType::Tuple(items) => match position {
                Some(position) => {
                    elements.push(items.get(position).cloned().unwrap_or(StaticType::Undefined))
                }
                None => elements.push(StaticType::union(items.iter().cloned())),
            },
            StaticType::Reference { name, arguments } if name == "Record" && arguments.len() == 2 => {
                elements.push(arguments[1].clone())
            }
            StaticType::Primitive(primitive) if primitive == "any" => elements.push(member.clone()),
            _ => return StaticType::Opaque,
        }
    }
    if elements.is_empty() {
        StaticType::Opaque
    } else {
        StaticType::union(elements)
    }
}

/// `await` unwraps `Promise<T>` members.
fn awaited(ty: StaticType) -> StaticType {
    let members = ty.members().iter().map(|member| match member {
        StaticType::Reference { name, arguments } if name == "Promise" && arguments.len() == 1 => {
            arguments[0].clone()
        }
        other => other.clone(),
    });
    StaticType::union(members.collect::<Vec<_>>())
}

fn optional_member(item: SyntaxNode<'_>, ty: StaticType) -> StaticType {
    if item.has_token("?") {
        StaticType::union([ty, StaticType::Undefined])
    } else {
        ty
    }
}

fn member_name<'a>(item: SyntaxNode<'a>) -> Option<&'a str> {
    item.field("name").and_then(property_name)
}

/// Static name of a property key; computed keys have none.
fn property_name<'a>(key: SyntaxNode<'a>) -> Option<&'a str> {
    match key.kind() {
        "property_identifier" | "private_property_identifier" | "identifier" | "number" => {
            Some(key.text())
        }
        "string" => scope::string_value(key),
        _ => None,
    }
}

fn is_function_like(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "function"
            | "arrow_function"
            | "generator_function"
            | "generator_function_declaration"
            | "method_definition"
            | "class"
            | "class_declaration"
    )
}

/// Elements of an array pattern with their positions; holes (`[, b]`)
/// take a position without a node.
fn array_slots(pattern: SyntaxNode<'_>) -> Vec<(usize, SyntaxNode<'_>)> {
    let raw = pattern.raw();
    let mut cursor = raw.walk();
    let mut position = 0;
    let mut slots = Vec::new();
    for child in raw.children(&mut cursor) {
        if !child.is_named() {
            if child.kind() == "," {
                position += 1;
            }
            continue;
        }
        if child.kind() != "comment" {
            slots.push((position, SyntaxNode::new(pattern.file(), child)));
        }
    }
    slots
}

/// For a callback parameter passed to an element-wise array method, the
/// receiver expression and the parameter's position.
fn callback_receiver(parameter: SyntaxNode<'_>) -> Option<(SyntaxNode<'_>, usize)> {
    let (function, position) = if parameter.kind() == "identifier" {
        (parameter.parent()?, 0)
    } else {
        let parameters = parameter.parent()?;
        let position = parameters
            .named_children()
            .iter()
            .position(|candidate| candidate.same_node(&parameter))?;
        (parameters.parent()?, position)
    };
    if !matches!(function.kind(), "arrow_function" | "function_expression" | "function") {
        return None;
    }

    let arguments = function.parent()?;
    if arguments.kind() != "arguments" || !arguments.first_named_child()?.same_node(&function) {
        return None;
    }
    let call = arguments.parent()?;
    let callee = call.field("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let method = callee.field("property")?.text();
    if !ELEMENT_CALLBACKS.contains(&method) {
        return None;
    }
    Some((callee.field("object")?, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::CompilerOptions;

    /// Find the first identifier named `name` used as a call argument.
    fn argument<'a>(node: SyntaxNode<'a>, name: &str) -> Option<SyntaxNode<'a>> {
        if node.kind() == "arguments" {
            if let Some(found) = node
                .named_children()
                .into_iter()
                .find(|arg| arg.text() == name)
            {
                return Some(found);
            }
        }
        node.named_children()
            .into_iter()
            .find_map(|child| argument(child, name))
    }

    fn type_of(source: &str, name: &str) -> Result<StaticType, TypeQueryError> {
        let program =
            Program::from_sources([("main.ts", source)], CompilerOptions::default()).unwrap();
        let checker = program.type_checker();
        let node = argument(program.source_files()[0].root(), name).expect("argument present");
        checker.type_at_location(node)
    }

    fn string() -> StaticType {
        StaticType::primitive("string")
    }

    #[test]
    fn annotated_local_variable() {
        let ty = type_of("let x: string | null = null;\nuse(x);", "x").unwrap();
        assert_eq!(ty, StaticType::Union(vec![string(), StaticType::Null]));
    }

    #[test]
    fn parameter_annotation_and_optional_parameter() {
        let ty = type_of("function f(items: string[]) { use(items); }", "items").unwrap();
        assert_eq!(ty, StaticType::Array(Box::new(string())));

        let ty = type_of("function f(items?: string[]) { use(items); }", "items").unwrap();
        assert!(ty.is_union());
        assert!(ty.has_undefined());
        assert!(!ty.has_null());
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let source = "const x: number[] | null = null;\nfunction f(x: number[]) { use(x); }";
        let ty = type_of(source, "x").unwrap();
        assert_eq!(ty, StaticType::Array(Box::new(StaticType::primitive("number"))));
    }

    #[test]
    fn initializer_is_used_without_annotation() {
        let ty = type_of("const s = 'hi';\nuse(s);", "s").unwrap();
        assert_eq!(ty, string());
    }

    #[test]
    fn generic_alias_is_expanded() {
        let source = "type Maybe<T> = T | null;\nlet v: Maybe<string[]>;\nuse(v);";
        let ty = type_of(source, "v").unwrap();
        assert_eq!(
            ty,
            StaticType::Union(vec![StaticType::Array(Box::new(string())), StaticType::Null])
        );
    }

    #[test]
    fn builtin_generics() {
        let ty = type_of("let a: Array<string> | null;\nuse(a);", "a").unwrap();
        assert!(ty.has_null());

        let ty = type_of("let b: NonNullable<string | null>;\nuse(b);", "b").unwrap();
        assert_eq!(ty, string());
    }

    #[test]
    fn non_null_assertion_and_cast() {
        let source = "let x: string[] | null = null;\nuse(x!);";
        let program =
            Program::from_sources([("main.ts", source)], CompilerOptions::default()).unwrap();
        let node = argument(program.source_files()[0].root(), "x!").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert!(!ty.has_null());

        let source = "declare const y: unknown;\nuse(y as (string | null));";
        let program =
            Program::from_sources([("main.ts", source)], CompilerOptions::default()).unwrap();
        let node = argument(program.source_files()[0].root(), "y as (string | null)").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert!(ty.has_null());
    }

    #[test]
    fn global_declaration_file_is_visible() {
        let program = Program::from_sources(
            [
                ("globals.d.ts", "declare const config: string[] | null;\n"),
                ("main.ts", "use(config);\n"),
            ],
            CompilerOptions::default(),
        )
        .unwrap();
        let node = argument(program.source_files()[1].root(), "config").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert!(ty.has_null());
    }

    #[test]
    fn module_declarations_are_not_global() {
        let program = Program::from_sources(
            [
                ("lib.ts", "export const hidden: string | null = null;\n"),
                ("main.ts", "use(hidden);\n"),
            ],
            CompilerOptions::default(),
        )
        .unwrap();
        let node = argument(program.source_files()[1].root(), "hidden").unwrap();
        let err = program.type_checker().type_at_location(node).unwrap_err();
        assert!(matches!(err, TypeQueryError::UnresolvedSymbol { ref name, .. } if name == "hidden"));
    }

    #[test]
    fn unresolvable_imports_are_opaque() {
        let ty = type_of("import { items } from './data';\nuse(items);", "items").unwrap();
        assert_eq!(ty, StaticType::Opaque);

        let ty = type_of("import * as ns from 'pkg';\nuse(ns);", "ns").unwrap();
        assert_eq!(ty, StaticType::Opaque);
    }

    /// Whether the argument `subject` of the last `use(...)` call has a
    /// `null` member.
    fn has_null(sources: &[(&str, &str)], subject: &str) -> bool {
        let program =
            Program::from_sources(sources.iter().copied(), CompilerOptions::default()).unwrap();
        let file = program.source_files().last().unwrap();
        let node = argument(file.root(), subject).expect("argument present");
        program.type_checker().type_at_location(node).unwrap().has_null()
    }

    #[test]
    fn member_of_annotated_object_type() {
        let source = "declare const cfg: { items: string[] | null; size: number };\nuse(cfg.items);";
        assert!(has_null(&[("main.ts", source)], "cfg.items"));

        let source = "declare const cfg: { items: string[] | null; size: number };\nuse(cfg.size);";
        assert!(!has_null(&[("main.ts", source)], "cfg.size"));
    }

    #[test]
    fn member_of_interface_and_its_bases() {
        let source = "\
interface Base { tags: string[] | null }
interface Doc extends Base { title: string }
declare const doc: Doc;
use(doc.tags);";
        assert!(has_null(&[("main.ts", source)], "doc.tags"));

        let source = "\
interface Box<T> { value: T }
declare const boxed: Box<number[] | null>;
use(boxed.value);";
        assert!(has_null(&[("main.ts", source)], "boxed.value"));
    }

    #[test]
    fn nested_and_optional_members() {
        let source = "\
type Settings = { nested: { list?: string[] | null } };
declare const s: Settings;
use(s.nested.list);";
        let program =
            Program::from_sources([("main.ts", source)], CompilerOptions::default()).unwrap();
        let node = argument(program.source_files()[0].root(), "s.nested.list").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert!(ty.has_null());
        assert!(ty.has_undefined());
    }

    #[test]
    fn member_of_object_literal() {
        let source = "const state = { items: null as string[] | null, count: 1 };\nuse(state.items);";
        assert!(has_null(&[("main.ts", source)], "state.items"));

        let source = "const state = { items: [1] };\nuse(state.items);";
        assert!(!has_null(&[("main.ts", source)], "state.items"));
    }

    #[test]
    fn index_signatures_and_record() {
        let source = "declare const m: { [key: string]: number[] | null };\nuse(m.any);";
        assert!(has_null(&[("main.ts", source)], "m.any"));

        let source = "declare const r: Record<string, number[] | null>;\nuse(r['k']);";
        assert!(has_null(&[("main.ts", source)], "r['k']"));
    }

    #[test]
    fn call_uses_declared_return_type() {
        let source = "function get(): string[] | null { return null; }\nuse(get());";
        assert!(has_null(&[("main.ts", source)], "get()"));

        let source = "declare function load(): string[];\nuse(load());";
        assert!(!has_null(&[("main.ts", source)], "load()"));

        let source = "const pick = (): number[] | null => null;\nuse(pick());";
        assert!(has_null(&[("main.ts", source)], "pick()"));
    }

    #[test]
    fn call_infers_unannotated_return() {
        let source = "\
function find(flag: boolean) {
    if (flag) {
        return [1, 2];
    }
    return null;
}
use(find(true));";
        assert!(has_null(&[("main.ts", source)], "find(true)"));

        let source = "const wrap = (xs: string[]) => xs;\nuse(wrap([]));";
        assert!(!has_null(&[("main.ts", source)], "wrap([])"));
    }

    #[test]
    fn method_call_on_annotated_receiver() {
        let source = "\
interface Store { read(): string[] | null }
declare const store: Store;
use(store.read());";
        assert!(has_null(&[("main.ts", source)], "store.read()"));
    }

    #[test]
    fn destructured_parameter_and_variable() {
        let source = "function g({ xs }: { xs: string[] | null }) { use(xs); }";
        assert!(has_null(&[("main.ts", source)], "xs"));

        let source = "\
declare const pair: { left: { deep: number[] | null } };
const { left: { deep } } = pair;
use(deep);";
        assert!(has_null(&[("main.ts", source)], "deep"));

        let source = "declare const t: [string[] | null, number];\nconst [first, second] = t;\nuse(first);";
        assert!(has_null(&[("main.ts", source)], "first"));
    }

    #[test]
    fn destructuring_default_removes_only_undefined() {
        let source = "function g({ xs = [] }: { xs?: string[] }) { use(xs); }";
        let program =
            Program::from_sources([("main.ts", source)], CompilerOptions::default()).unwrap();
        let node = argument(program.source_files()[0].root(), "xs").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert!(!ty.has_undefined());

        let source = "function g({ xs = [] }: { xs: string[] | null }) { use(xs); }";
        assert!(has_null(&[("main.ts", source)], "xs"));
    }

    #[test]
    fn class_members_through_this_and_new() {
        let source = "\
class Repo {
    private cache: string[] | null = null;
    constructor(private readonly seeds: number[] | null) {}
    get names(): string[] | null { return this.cache; }
    run() { use(this.cache); }
}";
        assert!(has_null(&[("main.ts", source)], "this.cache"));

        let source = "\
class Repo {
    constructor(private readonly seeds: number[] | null) {}
}
class Child extends Repo {}
const repo = new Child(null);
use(repo.seeds);";
        assert!(has_null(&[("main.ts", source)], "repo.seeds"));

        let source = "\
class Repo {
    get names(): string[] | null { return null; }
}
declare const repo: Repo;
use(repo.names);";
        assert!(has_null(&[("main.ts", source)], "repo.names"));
    }

    #[test]
    fn for_of_and_callback_parameters_take_element_type() {
        let source = "\
declare const rows: (string[] | null)[];
for (const row of rows) { use(row); }";
        assert!(has_null(&[("main.ts", source)], "row"));

        let source = "\
declare const rows: (string[] | null)[];
rows.forEach((row) => use(row));";
        assert!(has_null(&[("main.ts", source)], "row"));

        let source = "\
declare const rows: string[][];
rows.map(row => use(row));";
        assert!(!has_null(&[("main.ts", source)], "row"));
    }

    #[test]
    fn await_unwraps_promise() {
        let source = "\
declare function fetchAll(): Promise<string[] | null>;
async function run() { use(await fetchAll()); }";
        assert!(has_null(&[("main.ts", source)], "await fetchAll()"));
    }

    #[test]
    fn named_imports_follow_the_exporting_module() {
        let sources = [
            (
                "src/data.ts",
                "export const items: string[] | null = null;\nconst local: number[] | null = null;\nexport { local as renamed };\nexport interface Config { list: string[] | null }\n",
            ),
            (
                "src/main.ts",
                "import { items, renamed } from './data';\nimport type { Config } from './data';\ndeclare const c: Config;\nuse(items, renamed, c.list);\n",
            ),
        ];
        assert!(has_null(&sources, "items"));
        assert!(has_null(&sources, "renamed"));
        assert!(has_null(&sources, "c.list"));
    }

    #[test]
    fn recursive_types_terminate() {
        let source = "\
interface Node { next: Node | null; kids: Node[] }
declare const head: Node;
use(head.next.next.next);";
        assert!(has_null(&[("main.ts", source)], "head.next.next.next"));

        let source = "\
type A = B | null;
type B = A[];
declare const a: A;
use(a);";
        assert!(has_null(&[("main.ts", source)], "a"));

        let source = "function loop() { return loop(); }\nuse(loop());";
        assert!(!has_null(&[("main.ts", source)], "loop()"));
    }

    #[test]
    fn standard_and_configured_globals_resolve() {
        let program = Program::from_sources(
            [("main.ts", "use(process, fetch, Deno);")],
            CompilerOptions {
                ambient_globals: vec!["Deno".to_string()],
                ..CompilerOptions::default()
            },
        )
        .unwrap();
        let checker = program.type_checker();
        for name in ["process", "fetch", "Deno"] {
            let node = argument(program.source_files()[0].root(), name).unwrap();
            assert_eq!(checker.type_at_location(node).unwrap(), StaticType::Opaque);
        }

        let err = type_of("use(Deno);", "Deno").unwrap_err();
        assert!(matches!(err, TypeQueryError::UnresolvedSymbol { .. }));
    }

    #[test]
    fn declare_global_blocks_in_modules_are_visible() {
        let sources = [
            (
                "types/env.d.ts",
                "export {};\ndeclare global {\n  const featureFlags: string[] | null;\n}\n",
            ),
            ("main.ts", "use(featureFlags);\n"),
        ];
        assert!(has_null(&sources, "featureFlags"));
    }

    #[test]
    fn unresolved_symbol_is_an_error() {
        let err = type_of("use(nowhere);", "nowhere").unwrap_err();
        match err {
            TypeQueryError::UnresolvedSymbol { name, location, .. } => {
                assert_eq!(name, "nowhere");
                assert_eq!(location.line, 1);
                assert_eq!(location.column, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn optional_chain_adds_undefined() {
        let source = "declare const a: { b: string[] };\nuse(a?.b);";
        let program =
            Program::from_sources([("main.ts", source)], CompilerOptions::default()).unwrap();
        let node = argument(program.source_files()[0].root(), "a?.b").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert!(ty.has_undefined());
        assert!(!ty.has_null());
    }

    #[test]
    fn non_strict_erases_null_from_unions() {
        let program = Program::from_sources(
            [("main.ts", "let x: string | null = null;\nuse(x);")],
            CompilerOptions {
                strict: false,
                ..CompilerOptions::default()
            },
        )
        .unwrap();
        let node = argument(program.source_files()[0].root(), "x").unwrap();
        let ty = program.type_checker().type_at_location(node).unwrap();
        assert_eq!(ty, string());
    }

    #[test]
    fn foreign_node_is_rejected() {
        let program =
            Program::from_sources([("main.ts", "use(1);")], CompilerOptions::default()).unwrap();
        let other =
            Program::from_sources([("main.ts", "use(1);")], CompilerOptions::default()).unwrap();
        let node = argument(other.source_files()[0].root(), "1").unwrap();

        let err = program.type_checker().type_at_location(node).unwrap_err();
        assert!(matches!(err, TypeQueryError::ForeignNode { .. }));
    }
}
