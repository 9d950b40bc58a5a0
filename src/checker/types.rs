use std::fmt;

/// Location of the declaration behind a [`StaticType::Shape`]: the file's
/// index in its program and the node's byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeId {
    pub(crate) file: usize,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) kind: &'static str,
}

/// Statically inferred type of an expression, as far as the checker can see.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticType {
    Null,
    Undefined,
    /// `string`, `number`, `boolean`, `any`, `unknown`, `never`, `void`, ...
    Primitive(String),
    /// Literal types such as `"a"`, `1` or `true`, kept as written.
    Literal(String),
    Array(Box<StaticType>),
    Tuple(Vec<StaticType>),
    /// An object type literal, interface, class instance or object literal.
    /// Members are read from the declaration on demand, with `bindings`
    /// substituted for its type parameters.
    Shape {
        id: ShapeId,
        label: String,
        bindings: Vec<(String, StaticType)>,
    },
    /// Something callable; only the return type is tracked.
    Function(Box<StaticType>),
    /// A named type the checker does not expand (type parameters, library
    /// types, unresolved names).
    Reference {
        name: String,
        arguments: Vec<StaticType>,
    },
    /// Normalized union; see [`StaticType::union`].
    Union(Vec<StaticType>),
    /// Shape not modelled (functions, objects, call results, ...).
    Opaque,
}

impl StaticType {
    pub fn primitive(name: &str) -> Self {
        StaticType::Primitive(name.to_string())
    }

    pub fn reference(name: &str) -> Self {
        StaticType::Reference {
            name: name.to_string(),
            arguments: Vec::new(),
        }
    }

    /// Build a union the way the compiler normalizes one: nested unions are
    /// flattened, duplicates removed, `never` dropped, `any`/`unknown` absorb
    /// everything, and a single member stands for itself.
    pub fn union(members: impl IntoIterator<Item = StaticType>) -> Self {
        let mut flat: Vec<StaticType> = Vec::new();
        for member in members {
            match member {
                StaticType::Union(inner) => {
                    for ty in inner {
                        push_unique(&mut flat, ty);
                    }
                }
                other => push_unique(&mut flat, other),
            }
        }

        for absorbing in ["any", "unknown"] {
            if flat.iter().any(|ty| ty.is_primitive(absorbing)) {
                return StaticType::primitive(absorbing);
            }
        }

        flat.retain(|ty| !ty.is_primitive("never"));

        match flat.len() {
            0 => StaticType::primitive("never"),
            1 => flat.swap_remove(0),
            _ => StaticType::Union(flat),
        }
    }

    pub fn is_primitive(&self, name: &str) -> bool {
        matches!(self, StaticType::Primitive(p) if p == name)
    }

    pub fn is_union(&self) -> bool {
        matches!(self, StaticType::Union(_))
    }

    /// Union members, or the type itself when it is not a union.
    pub fn members(&self) -> &[StaticType] {
        match self {
            StaticType::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    pub fn has_null(&self) -> bool {
        self.members().iter().any(|ty| *ty == StaticType::Null)
    }

    pub fn has_undefined(&self) -> bool {
        self.members().iter().any(|ty| *ty == StaticType::Undefined)
    }

    /// `NonNullable<T>`: drop `null` and `undefined` members.
    pub fn without_nullish(self) -> Self {
        match self {
            StaticType::Null | StaticType::Undefined => StaticType::primitive("never"),
            StaticType::Union(members) => StaticType::union(
                members
                    .into_iter()
                    .filter(|ty| !matches!(ty, StaticType::Null | StaticType::Undefined)),
            ),
            other => other,
        }
    }

    /// Drop `undefined` members only, as a default value or `Required<T>`
    /// does.
    pub fn without_undefined(self) -> Self {
        match self {
            StaticType::Undefined => StaticType::primitive("never"),
            StaticType::Union(members) => {
                StaticType::union(members.into_iter().filter(|ty| *ty != StaticType::Undefined))
            }
            other => other,
        }
    }

    /// Non-strict mode: `null` and `undefined` are subsumed by every other
    /// type, so they vanish from unions but survive on their own.
    pub fn erase_nullish_in_unions(self) -> Self {
        match self {
            StaticType::Union(_) => self.without_nullish(),
            other => other,
        }
    }
}

fn push_unique(members: &mut Vec<StaticType>, ty: StaticType) {
    if !members.contains(&ty) {
        members.push(ty);
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Null => f.write_str("null"),
            StaticType::Undefined => f.write_str("undefined"),
            StaticType::Primitive(name) | StaticType::Literal(name) => f.write_str(name),
            StaticType::Array(element) => match **element {
                StaticType::Union(_) => write!(f, "({element})[]"),
                _ => write!(f, "{element}[]"),
            },
            StaticType::Tuple(elements) => {
                let parts: Vec<String> = elements.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            StaticType::Shape { label, .. } => f.write_str(label),
            StaticType::Function(returns) => write!(f, "() => {returns}"),
            StaticType::Reference { name, arguments } => {
                f.write_str(name)?;
                if !arguments.is_empty() {
                    let args: Vec<String> = arguments.iter().map(ToString::to_string).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            StaticType::Union(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" | "))
            }
            StaticType::Opaque => f.write_str("{opaque}"),
        }
    }
}
