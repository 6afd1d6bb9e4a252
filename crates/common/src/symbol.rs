//! Structural symbol references.
//!
//! A `SymbolRef` identifies a class, field or method by value: two refs
//! built independently from the same coordinates compare equal. Class
//! names are internal names (`a/b/Outer$Inner`); nesting is encoded with
//! `$` and the owner chain is derived from it, so only classes can be
//! ownerless.

use std::fmt;

/// Separator between an outer and an inner class simple name.
pub const NEST_SEPARATOR: char = '$';

/// Reference to a class by full internal name, e.g. `a/b/Outer$Inner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassRef {
    name: String,
}

impl ClassRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Full internal name, including any outer-class prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simple name: everything after the last `$`, or the whole name.
    pub fn simple_name(&self) -> &str {
        match self.name.rfind(NEST_SEPARATOR) {
            Some(i) => &self.name[i + 1..],
            None => &self.name,
        }
    }

    /// Enclosing class, if this is a nested class.
    pub fn outer(&self) -> Option<ClassRef> {
        self.name
            .rfind(NEST_SEPARATOR)
            .map(|i| ClassRef::new(&self.name[..i]))
    }

    /// Rebuilds a class ref from an owner chain and a simple name.
    pub fn nested(outer: Option<&ClassRef>, simple_name: &str) -> ClassRef {
        match outer {
            Some(o) => ClassRef::new(format!("{}{}{}", o.name, NEST_SEPARATOR, simple_name)),
            None => ClassRef::new(simple_name),
        }
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Reference to a field: owner class, name and field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub owner: ClassRef,
    pub name: String,
    pub descriptor: String,
}

/// Reference to a method: owner class, name and method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub owner: ClassRef,
    pub name: String,
    pub descriptor: String,
}

/// Symbol kind, used for stable-name prefixes and counter keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    Class,
    Field,
    Method,
}

impl SymbolKind {
    /// Lower-case tag used in stable names (`class_7`) and counter rows.
    pub fn tag(self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Field => "field",
            SymbolKind::Method => "method",
        }
    }
}

/// A class, field or method reference. Identity is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolRef {
    Class(ClassRef),
    Field(FieldRef),
    Method(MethodRef),
}

impl SymbolRef {
    pub fn kind(&self) -> SymbolKind {
        match self {
            SymbolRef::Class(_) => SymbolKind::Class,
            SymbolRef::Field(_) => SymbolKind::Field,
            SymbolRef::Method(_) => SymbolKind::Method,
        }
    }

    /// Owning symbol. `None` only for top-level classes.
    pub fn owner(&self) -> Option<SymbolRef> {
        match self {
            SymbolRef::Class(c) => c.outer().map(SymbolRef::Class),
            SymbolRef::Field(f) => Some(SymbolRef::Class(f.owner.clone())),
            SymbolRef::Method(m) => Some(SymbolRef::Class(m.owner.clone())),
        }
    }

    /// The name a mapping record renames: full internal name for classes,
    /// local name for members.
    pub fn name(&self) -> &str {
        match self {
            SymbolRef::Class(c) => c.name(),
            SymbolRef::Field(f) => &f.name,
            SymbolRef::Method(m) => &m.name,
        }
    }

    /// Rebuilds this ref under a (possibly different) owner with a new
    /// local name. For classes `name` may itself still contain `$`; only
    /// its suffix is used, the rest of the chain comes from `owner`.
    pub fn with_owner_and_name(&self, owner: Option<&SymbolRef>, name: &str) -> SymbolRef {
        let owner_class = match owner {
            Some(SymbolRef::Class(c)) => Some(c),
            _ => None,
        };
        let simple = match name.rfind(NEST_SEPARATOR) {
            Some(i) => &name[i + 1..],
            None => name,
        };
        match self {
            SymbolRef::Class(_) => SymbolRef::Class(ClassRef::nested(owner_class, simple)),
            SymbolRef::Field(f) => SymbolRef::Field(FieldRef {
                owner: owner_class.cloned().unwrap_or_else(|| f.owner.clone()),
                name: simple.to_string(),
                descriptor: f.descriptor.clone(),
            }),
            SymbolRef::Method(m) => SymbolRef::Method(MethodRef {
                owner: owner_class.cloned().unwrap_or_else(|| m.owner.clone()),
                name: simple.to_string(),
                descriptor: m.descriptor.clone(),
            }),
        }
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolRef::Class(c) => write!(f, "{}", c.name()),
            SymbolRef::Field(r) => write!(f, "{}.{}:{}", r.owner.name(), r.name, r.descriptor),
            SymbolRef::Method(r) => write!(f, "{}.{}{}", r.owner.name(), r.name, r.descriptor),
        }
    }
}
