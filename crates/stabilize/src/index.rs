//! Queryable symbol table of one release.
//!
//! The stabilizer and the ancestry walk only ever look at a release
//! through `SymbolIndex`; `ArchiveIndex` is the implementation backed by
//! a decoded archive. Everything iterates in sorted order so output is
//! deterministic.

use std::collections::BTreeMap;

use common::{AccessFlags, ClassRef, FieldRef, MethodRef};
use merge::merger::TYPE_SUFFIX;
use merge::{Archive, ArtifactCodec};

use crate::StabilizeError;

/// Read-only view of a release's classes and members.
pub trait SymbolIndex {
    /// Classes with no enclosing class, sorted by name.
    fn top_level_classes(&self) -> Vec<ClassRef>;

    /// Directly nested classes of `class`, sorted by name.
    fn nested_classes(&self, class: &ClassRef) -> Vec<ClassRef>;

    /// Fields of `class` in declared order.
    fn fields(&self, class: &ClassRef) -> Vec<FieldRef>;

    /// Methods of `class` in declared order.
    fn methods(&self, class: &ClassRef) -> Vec<MethodRef>;

    /// Access flags of a declared method, `None` if not declared.
    fn method_flags(&self, method: &MethodRef) -> Option<AccessFlags>;

    /// Direct superclass, if it is itself part of the index.
    fn superclass(&self, class: &ClassRef) -> Option<ClassRef>;

    /// Directly implemented interfaces that are part of the index.
    fn interfaces(&self, class: &ClassRef) -> Vec<ClassRef>;

    fn contains_method(&self, method: &MethodRef) -> bool {
        self.method_flags(method).is_some()
    }
}

struct IndexedClass {
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<(String, String)>,
    methods: Vec<(String, String, AccessFlags)>,
}

/// Symbol index decoded from an archive's compiled types.
pub struct ArchiveIndex {
    classes: BTreeMap<String, IndexedClass>,
}

impl ArchiveIndex {
    pub fn build<C: ArtifactCodec>(archive: &Archive, codec: &C) -> Result<Self, StabilizeError> {
        let mut classes = BTreeMap::new();
        for entry in archive.entries() {
            if !entry.path.ends_with(TYPE_SUFFIX) {
                continue;
            }
            let artifact = codec.decode(&entry.data)?;
            classes.insert(
                artifact.name.clone(),
                IndexedClass {
                    super_name: artifact.super_name.clone(),
                    interfaces: artifact.interfaces.clone(),
                    fields: artifact
                        .fields
                        .iter()
                        .map(|f| (f.name.clone(), f.descriptor.clone()))
                        .collect(),
                    methods: artifact
                        .methods
                        .iter()
                        .map(|m| (m.name.clone(), m.descriptor.clone(), m.access))
                        .collect(),
                },
            );
        }
        Ok(Self { classes })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

impl SymbolIndex for ArchiveIndex {
    fn top_level_classes(&self) -> Vec<ClassRef> {
        self.classes
            .keys()
            .map(|name| ClassRef::new(name.as_str()))
            .filter(|c| match c.outer() {
                // A nested name whose outer type is absent counts as
                // top-level; nobody else will visit it.
                Some(outer) => !self.classes.contains_key(outer.name()),
                None => true,
            })
            .collect()
    }

    fn nested_classes(&self, class: &ClassRef) -> Vec<ClassRef> {
        self.classes
            .keys()
            .map(|name| ClassRef::new(name.as_str()))
            .filter(|c| c.outer().as_ref() == Some(class))
            .collect()
    }

    fn fields(&self, class: &ClassRef) -> Vec<FieldRef> {
        let Some(indexed) = self.classes.get(class.name()) else {
            return Vec::new();
        };
        indexed
            .fields
            .iter()
            .map(|(name, descriptor)| FieldRef {
                owner: class.clone(),
                name: name.clone(),
                descriptor: descriptor.clone(),
            })
            .collect()
    }

    fn methods(&self, class: &ClassRef) -> Vec<MethodRef> {
        let Some(indexed) = self.classes.get(class.name()) else {
            return Vec::new();
        };
        indexed
            .methods
            .iter()
            .map(|(name, descriptor, _)| MethodRef {
                owner: class.clone(),
                name: name.clone(),
                descriptor: descriptor.clone(),
            })
            .collect()
    }

    fn method_flags(&self, method: &MethodRef) -> Option<AccessFlags> {
        self.classes
            .get(method.owner.name())?
            .methods
            .iter()
            .find(|(name, descriptor, _)| *name == method.name && *descriptor == method.descriptor)
            .map(|(_, _, access)| *access)
    }

    fn superclass(&self, class: &ClassRef) -> Option<ClassRef> {
        let super_name = self.classes.get(class.name())?.super_name.as_deref()?;
        if self.classes.contains_key(super_name) {
            Some(ClassRef::new(super_name))
        } else {
            None
        }
    }

    fn interfaces(&self, class: &ClassRef) -> Vec<ClassRef> {
        let Some(indexed) = self.classes.get(class.name()) else {
            return Vec::new();
        };
        indexed
            .interfaces
            .iter()
            .filter(|name| self.classes.contains_key(name.as_str()))
            .map(|name| ClassRef::new(name.as_str()))
            .collect()
    }
}
