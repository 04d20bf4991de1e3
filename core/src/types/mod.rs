//! Static types attached to the checked program.
//!
//! The type checker is an external collaborator: it resolves every annotation,
//! literal kind and type argument ahead of time and hands the interpreter these
//! arena-allocated descriptions. The interpreter only consults them to box
//! optionals, check casts and conformance, and size metered allocations.

mod number;

pub use number::{FIX64_FACTOR, FIX64_SCALE, NumberKind, NumberSupertype};

use core::fmt;

/// Kind tag of a user-declared composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Structure,
    Resource,
    Contract,
    Enum,
    Event,
}

impl CompositeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            CompositeKind::Structure => "struct",
            CompositeKind::Resource => "resource",
            CompositeKind::Contract => "contract",
            CompositeKind::Enum => "enum",
            CompositeKind::Event => "event",
        }
    }
}

/// Domain of a storage path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathDomain {
    Storage,
    Private,
    Public,
}

impl PathDomain {
    pub fn identifier(self) -> &'static str {
        match self {
            PathDomain::Storage => "storage",
            PathDomain::Private => "private",
            PathDomain::Public => "public",
        }
    }

    /// Name of the conversion function and static type for the domain.
    pub fn type_name(self) -> &'static str {
        match self {
            PathDomain::Storage => "StoragePath",
            PathDomain::Private => "PrivatePath",
            PathDomain::Public => "PublicPath",
        }
    }
}

/// Path types, from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathType {
    Path,
    Capability,
    Domain(PathDomain),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticType<'a> {
    Never,
    Void,
    Bool,
    Character,
    String,
    Address,
    Number(NumberKind),
    NumberSupertype(NumberSupertype),
    Path(PathType),
    AnyStruct,
    AnyResource,
    Optional(&'a StaticType<'a>),
    VariableArray(&'a StaticType<'a>),
    Dictionary {
        key: &'a StaticType<'a>,
        value: &'a StaticType<'a>,
    },
    Composite {
        name: &'a str,
        kind: CompositeKind,
    },
    Reference {
        authorized: bool,
        referenced: &'a StaticType<'a>,
    },
    Capability(Option<&'a StaticType<'a>>),
    Function {
        parameters: &'a [StaticType<'a>],
        return_type: &'a StaticType<'a>,
    },
    /// The account handle returned by `getAuthAccount`.
    AuthAccount,
}

impl<'a> StaticType<'a> {
    pub fn is_resource(&self) -> bool {
        match self {
            StaticType::AnyResource => true,
            StaticType::Composite { kind, .. } => *kind == CompositeKind::Resource,
            StaticType::Optional(inner) | StaticType::VariableArray(inner) => inner.is_resource(),
            StaticType::Dictionary { value, .. } => value.is_resource(),
            _ => false,
        }
    }

    /// Number of optional layers wrapped around the innermost type.
    pub fn optional_depth(&self) -> usize {
        match self {
            StaticType::Optional(inner) => 1 + inner.optional_depth(),
            _ => 0,
        }
    }

    /// Number of container levels in the type, counting arrays and dictionaries.
    pub fn container_depth(&self) -> usize {
        match self {
            StaticType::VariableArray(inner) => 1 + inner.container_depth(),
            StaticType::Dictionary { value, .. } => 1 + value.container_depth(),
            StaticType::Optional(inner) => inner.container_depth(),
            _ => 0,
        }
    }

    pub fn element_type(&self) -> Option<&'a StaticType<'a>> {
        match self {
            StaticType::VariableArray(inner) => Some(inner),
            _ => None,
        }
    }

    /// Whether every value of `self` is also a value of `other`.
    pub fn is_subtype_of(&self, other: &StaticType<'_>) -> bool {
        match (self, other) {
            (StaticType::Never, _) => true,
            (_, StaticType::AnyStruct) => !self.is_resource(),
            (_, StaticType::AnyResource) => self.is_resource(),
            (StaticType::Number(kind), StaticType::NumberSupertype(supertype)) => {
                kind.is_subtype_of(*supertype)
            }
            (StaticType::Path(PathType::Domain(_)), StaticType::Path(PathType::Path)) => true,
            (
                StaticType::Path(PathType::Domain(PathDomain::Public | PathDomain::Private)),
                StaticType::Path(PathType::Capability),
            ) => true,
            (StaticType::Path(PathType::Capability), StaticType::Path(PathType::Path)) => true,
            (StaticType::Optional(a), StaticType::Optional(b)) => a.is_subtype_of(b),
            (_, StaticType::Optional(b)) => self.is_subtype_of(b),
            (StaticType::VariableArray(a), StaticType::VariableArray(b)) => a.is_subtype_of(b),
            (
                StaticType::Dictionary { key: ka, value: va },
                StaticType::Dictionary { key: kb, value: vb },
            ) => ka.is_subtype_of(kb) && va.is_subtype_of(vb),
            (
                StaticType::Reference {
                    authorized: aa,
                    referenced: ra,
                },
                StaticType::Reference {
                    authorized: ab,
                    referenced: rb,
                },
            ) => (*aa || !*ab) && ra.is_subtype_of(rb),
            (StaticType::Capability(_), StaticType::Capability(None)) => true,
            (StaticType::Capability(Some(a)), StaticType::Capability(Some(b))) => a.is_subtype_of(b),
            _ => self.equals(other),
        }
    }

    /// Structural equality across arena lifetimes.
    pub fn equals(&self, other: &StaticType<'_>) -> bool {
        match (self, other) {
            (StaticType::Never, StaticType::Never)
            | (StaticType::Void, StaticType::Void)
            | (StaticType::Bool, StaticType::Bool)
            | (StaticType::Character, StaticType::Character)
            | (StaticType::String, StaticType::String)
            | (StaticType::Address, StaticType::Address)
            | (StaticType::AnyStruct, StaticType::AnyStruct)
            | (StaticType::AnyResource, StaticType::AnyResource)
            | (StaticType::AuthAccount, StaticType::AuthAccount) => true,
            (StaticType::Number(a), StaticType::Number(b)) => a == b,
            (StaticType::NumberSupertype(a), StaticType::NumberSupertype(b)) => a == b,
            (StaticType::Path(a), StaticType::Path(b)) => a == b,
            (StaticType::Optional(a), StaticType::Optional(b))
            | (StaticType::VariableArray(a), StaticType::VariableArray(b)) => a.equals(b),
            (
                StaticType::Dictionary { key: ka, value: va },
                StaticType::Dictionary { key: kb, value: vb },
            ) => ka.equals(kb) && va.equals(vb),
            (
                StaticType::Composite { name: na, kind: ka },
                StaticType::Composite { name: nb, kind: kb },
            ) => na == nb && ka == kb,
            (
                StaticType::Reference {
                    authorized: aa,
                    referenced: ra,
                },
                StaticType::Reference {
                    authorized: ab,
                    referenced: rb,
                },
            ) => aa == ab && ra.equals(rb),
            (StaticType::Capability(a), StaticType::Capability(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.equals(b),
                _ => false,
            },
            (
                StaticType::Function {
                    parameters: pa,
                    return_type: ra,
                },
                StaticType::Function {
                    parameters: pb,
                    return_type: rb,
                },
            ) => {
                pa.len() == pb.len()
                    && pa.iter().zip(pb.iter()).all(|(a, b)| a.equals(b))
                    && ra.equals(rb)
            }
            _ => false,
        }
    }
}

impl fmt::Display for StaticType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticType::Never => write!(f, "Never"),
            StaticType::Void => write!(f, "Void"),
            StaticType::Bool => write!(f, "Bool"),
            StaticType::Character => write!(f, "Character"),
            StaticType::String => write!(f, "String"),
            StaticType::Address => write!(f, "Address"),
            StaticType::Number(kind) => write!(f, "{}", kind),
            StaticType::NumberSupertype(supertype) => write!(f, "{}", supertype),
            StaticType::Path(PathType::Path) => write!(f, "Path"),
            StaticType::Path(PathType::Capability) => write!(f, "CapabilityPath"),
            StaticType::Path(PathType::Domain(domain)) => write!(f, "{}", domain.type_name()),
            StaticType::AnyStruct => write!(f, "AnyStruct"),
            StaticType::AnyResource => write!(f, "AnyResource"),
            StaticType::Optional(inner) => write!(f, "{}?", inner),
            StaticType::VariableArray(inner) => write!(f, "[{}]", inner),
            StaticType::Dictionary { key, value } => write!(f, "{{{}: {}}}", key, value),
            StaticType::Composite { name, kind } => {
                if *kind == CompositeKind::Resource {
                    write!(f, "@{}", name)
                } else {
                    write!(f, "{}", name)
                }
            }
            StaticType::Reference {
                authorized,
                referenced,
            } => {
                if *authorized {
                    write!(f, "auth ")?;
                }
                write!(f, "&{}", referenced)
            }
            StaticType::Capability(None) => write!(f, "Capability"),
            StaticType::Capability(Some(borrow)) => write!(f, "Capability<{}>", borrow),
            StaticType::Function {
                parameters,
                return_type,
            } => {
                write!(f, "((")?;
                for (i, parameter) in parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", parameter)?;
                }
                write!(f, "): {})", return_type)
            }
            StaticType::AuthAccount => write!(f, "AuthAccount"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: StaticType<'static> = StaticType::Composite {
        name: "R",
        kind: CompositeKind::Resource,
    };
    const S: StaticType<'static> = StaticType::Composite {
        name: "S",
        kind: CompositeKind::Structure,
    };

    #[test]
    fn test_resource_kindedness_propagates_through_containers() {
        assert!(R.is_resource());
        assert!(!S.is_resource());
        assert!(StaticType::VariableArray(&R).is_resource());
        assert!(StaticType::Optional(&StaticType::VariableArray(&R)).is_resource());
        assert!(
            StaticType::Dictionary {
                key: &StaticType::String,
                value: &R
            }
            .is_resource()
        );
        assert!(!StaticType::VariableArray(&S).is_resource());
    }

    #[test]
    fn test_depths() {
        let nested = StaticType::VariableArray(&StaticType::VariableArray(
            &StaticType::VariableArray(&StaticType::Bool),
        ));
        assert_eq!(nested.container_depth(), 3);
        assert_eq!(
            StaticType::Optional(&StaticType::Optional(&StaticType::Bool)).optional_depth(),
            2
        );
    }

    #[test]
    fn test_subtyping() {
        let fix = StaticType::Number(NumberKind::Fix64);
        assert!(fix.is_subtype_of(&StaticType::NumberSupertype(NumberSupertype::FixedPoint)));
        assert!(fix.is_subtype_of(&StaticType::Optional(&StaticType::AnyStruct)));
        assert!(!R.is_subtype_of(&StaticType::AnyStruct));
        assert!(R.is_subtype_of(&StaticType::AnyResource));
        assert!(
            StaticType::Path(PathType::Domain(PathDomain::Public))
                .is_subtype_of(&StaticType::Path(PathType::Capability))
        );
        assert!(
            !StaticType::Path(PathType::Domain(PathDomain::Storage))
                .is_subtype_of(&StaticType::Path(PathType::Capability))
        );
    }

    #[test]
    fn test_display() {
        let ty = StaticType::Dictionary {
            key: &StaticType::String,
            value: &StaticType::Optional(&R),
        };
        assert_eq!(ty.to_string(), "{String: @R?}");
        let reference = StaticType::Reference {
            authorized: true,
            referenced: &S,
        };
        assert_eq!(reference.to_string(), "auth &S");
    }
}
