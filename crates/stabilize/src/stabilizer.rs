//! Stable-name allocator.
//!
//! Allocation is append-only: a symbol keeps the identifier it was first
//! given, per-kind counters only ever grow, and symbols that were renamed
//! between releases are re-linked through their shared deobfuscated
//! names before any previous identifiers are loaded.
//!
//! The intermediary file is tab-separated symbol rows with the stable
//! name as the trailing column, followed by one `#COUNTER <kind> <value>`
//! row per kind:
//!
//! ```text
//! CLASS	a	class_1
//! FIELD	a	I	x	field_1
//! #COUNTER	class	1
//! #COUNTER	field	1
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;

use common::row::{decode_row, encode_row};
use common::{ClassRef, SymbolKind, SymbolRef};
use mappings::translate::{class_image_map, Translator};
use mappings::MappingTree;

use crate::ancestry::AncestorClosure;
use crate::index::SymbolIndex;
use crate::StabilizeError;

const COUNTER_KEYWORD: &str = "#COUNTER";

/// Allocates and persists stable names for one release, seeded from the
/// previous release's allocations.
#[derive(Default)]
pub struct Stabilizer {
    /// Old-release obf ref -> new-release obf ref, for symbols matched
    /// through their deobfuscated names.
    obf_matches: HashMap<SymbolRef, SymbolRef>,
    stable_names: HashMap<SymbolRef, String>,
    counters: BTreeMap<String, u64>,
}

impl Stabilizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links old-release symbols to new-release symbols that share a
    /// deobfuscated name. Members match when owner, target name and the
    /// descriptor (adapted across both releases' class renames) agree.
    /// Returns the number of links added.
    pub fn match_releases(
        &mut self,
        old: &MappingTree,
        new: &MappingTree,
    ) -> Result<usize, StabilizeError> {
        let old_forward = Translator::forward(old);
        let new_inverse = Translator::inverse(new);

        let old_images = class_image_map(old);
        let new_by_image: HashMap<String, String> = class_image_map(new)
            .into_iter()
            .map(|(obf, image)| (image, obf))
            .collect();

        // (new obf owner, target name, new obf descriptor, kind) -> ref.
        let mut new_members: HashMap<(String, String, String, SymbolKind), SymbolRef> =
            HashMap::new();
        for (sym, record) in new.nodes() {
            let Some(target) = record.target.as_deref() else {
                continue;
            };
            let (owner, descriptor) = match sym {
                SymbolRef::Field(f) => (f.owner.name(), f.descriptor.as_str()),
                SymbolRef::Method(m) => (m.owner.name(), m.descriptor.as_str()),
                SymbolRef::Class(_) => continue,
            };
            new_members.insert(
                (
                    owner.to_string(),
                    target.to_string(),
                    descriptor.to_string(),
                    sym.kind(),
                ),
                sym.clone(),
            );
        }

        let before = self.obf_matches.len();
        // Parent-before-child traversal: a member's owner link is in
        // place before the member is considered.
        for (sym, record) in old.nodes() {
            match sym {
                SymbolRef::Class(c) => {
                    let Some(image) = old_images.get(c.name()) else {
                        continue;
                    };
                    if let Some(new_obf) = new_by_image.get(image) {
                        self.obf_matches.insert(
                            sym.clone(),
                            SymbolRef::Class(ClassRef::new(new_obf.as_str())),
                        );
                    }
                }
                SymbolRef::Field(f) => {
                    let Some(target) = record.target.as_deref() else {
                        continue;
                    };
                    let Some(new_owner) = self.matched_owner(&f.owner) else {
                        continue;
                    };
                    let deobf = old_forward.field_descriptor(&f.descriptor)?;
                    let descriptor = new_inverse.field_descriptor(&deobf)?;
                    let key = (new_owner, target.to_string(), descriptor, SymbolKind::Field);
                    if let Some(matched) = new_members.get(&key) {
                        self.obf_matches.insert(sym.clone(), matched.clone());
                    }
                }
                SymbolRef::Method(m) => {
                    let Some(target) = record.target.as_deref() else {
                        continue;
                    };
                    let Some(new_owner) = self.matched_owner(&m.owner) else {
                        continue;
                    };
                    let deobf = old_forward.method_descriptor(&m.descriptor)?;
                    let descriptor = new_inverse.method_descriptor(&deobf)?;
                    let key = (new_owner, target.to_string(), descriptor, SymbolKind::Method);
                    if let Some(matched) = new_members.get(&key) {
                        self.obf_matches.insert(sym.clone(), matched.clone());
                    }
                }
            }
        }
        Ok(self.obf_matches.len() - before)
    }

    fn matched_owner(&self, owner: &ClassRef) -> Option<String> {
        match self.obf_matches.get(&SymbolRef::Class(owner.clone()))? {
            SymbolRef::Class(c) => Some(c.name().to_string()),
            _ => None,
        }
    }

    /// Seeds stable names and counters from a previous intermediary
    /// file. Call after `match_releases`: rows are keyed by old-release
    /// refs and re-keyed through the match table as they load.
    pub fn load_previous(&mut self, path: &Path) -> Result<(), StabilizeError> {
        if !path.is_file() {
            return Err(StabilizeError::MissingInput(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let parse_err = |line: usize, message: String| StabilizeError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        };

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix(COUNTER_KEYWORD) {
                let cols: Vec<&str> = rest.trim_start_matches('\t').split('\t').collect();
                let &[kind, value] = cols.as_slice() else {
                    return Err(parse_err(line_no, "counter row needs kind and value".into()));
                };
                let value: u64 = value
                    .parse()
                    .map_err(|_| parse_err(line_no, format!("bad counter value {value:?}")))?;
                self.counters.insert(kind.to_string(), value);
                continue;
            }

            let (sym, extra) =
                decode_row(line).map_err(|e| parse_err(line_no, e.to_string()))?;
            let Some(stable) = extra.last() else {
                return Err(parse_err(line_no, "row is missing its stable name".into()));
            };
            let key = self.obf_matches.get(&sym).cloned().unwrap_or(sym);
            self.stable_names.insert(key, stable.clone());
        }
        Ok(())
    }

    /// Walks the release depth-first and writes the intermediary file:
    /// one row per mapped symbol (methods only at their override root),
    /// counter rows last. Returns the number of symbol rows.
    pub fn run(
        &mut self,
        index: &dyn SymbolIndex,
        mapping: &MappingTree,
        out: &mut dyn Write,
    ) -> Result<usize, StabilizeError> {
        let mut ancestry = AncestorClosure::new();
        let mut rows = 0;
        for class in index.top_level_classes() {
            self.write_class(index, mapping, &mut ancestry, &class, out, &mut rows)?;
        }
        for (kind, value) in &self.counters {
            writeln!(out, "{COUNTER_KEYWORD}\t{kind}\t{value}")?;
        }
        Ok(rows)
    }

    fn write_class(
        &mut self,
        index: &dyn SymbolIndex,
        mapping: &MappingTree,
        ancestry: &mut AncestorClosure,
        class: &ClassRef,
        out: &mut dyn Write,
        rows: &mut usize,
    ) -> Result<(), StabilizeError> {
        self.emit(&SymbolRef::Class(class.clone()), mapping, out, rows)?;
        for field in index.fields(class) {
            self.emit(&SymbolRef::Field(field), mapping, out, rows)?;
        }
        for method in index.methods(class) {
            // Overrides inherit the root's identity; no row of their own.
            if ancestry.is_method_root(index, &method) {
                self.emit(&SymbolRef::Method(method), mapping, out, rows)?;
            }
        }
        for nested in index.nested_classes(class) {
            self.write_class(index, mapping, ancestry, &nested, out, rows)?;
        }
        Ok(())
    }

    fn emit(
        &mut self,
        sym: &SymbolRef,
        mapping: &MappingTree,
        out: &mut dyn Write,
        rows: &mut usize,
    ) -> Result<(), StabilizeError> {
        if mapping.target_of(sym).is_none() {
            return Ok(());
        }
        let stable = self.stable_name(sym);
        writeln!(out, "{}", encode_row(sym, &[&stable]))?;
        *rows += 1;
        Ok(())
    }

    /// Existing identifier, or the next one of the symbol's kind.
    fn stable_name(&mut self, sym: &SymbolRef) -> String {
        if let Some(existing) = self.stable_names.get(sym) {
            return existing.clone();
        }
        let kind = sym.kind().tag();
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        let name = format!("{kind}_{counter}");
        self.stable_names.insert(sym.clone(), name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{AccessFlags, FieldRef, MethodRef};
    use mappings::MappingRecord;
    use std::collections::BTreeMap;
    use std::io::Write as _;

    #[derive(Default)]
    struct FakeClass {
        superclass: Option<String>,
        fields: Vec<(String, String)>,
        methods: Vec<(String, String, AccessFlags)>,
    }

    #[derive(Default)]
    struct FakeIndex {
        classes: BTreeMap<String, FakeClass>,
    }

    impl FakeIndex {
        fn class(mut self, name: &str) -> Self {
            self.classes.entry(name.to_string()).or_default();
            self
        }

        fn extends(mut self, name: &str, superclass: &str) -> Self {
            self.classes.entry(name.to_string()).or_default().superclass =
                Some(superclass.to_string());
            self
        }

        fn field(mut self, owner: &str, name: &str, desc: &str) -> Self {
            self.classes
                .entry(owner.to_string())
                .or_default()
                .fields
                .push((name.to_string(), desc.to_string()));
            self
        }

        fn method(mut self, owner: &str, name: &str, desc: &str, access: AccessFlags) -> Self {
            self.classes
                .entry(owner.to_string())
                .or_default()
                .methods
                .push((name.to_string(), desc.to_string(), access));
            self
        }
    }

    impl SymbolIndex for FakeIndex {
        fn top_level_classes(&self) -> Vec<ClassRef> {
            self.classes
                .keys()
                .map(|n| ClassRef::new(n.as_str()))
                .filter(|c| match c.outer() {
                    Some(outer) => !self.classes.contains_key(outer.name()),
                    None => true,
                })
                .collect()
        }

        fn nested_classes(&self, class: &ClassRef) -> Vec<ClassRef> {
            self.classes
                .keys()
                .map(|n| ClassRef::new(n.as_str()))
                .filter(|c| c.outer().as_ref() == Some(class))
                .collect()
        }

        fn fields(&self, class: &ClassRef) -> Vec<FieldRef> {
            self.classes
                .get(class.name())
                .into_iter()
                .flat_map(|c| c.fields.iter())
                .map(|(name, descriptor)| FieldRef {
                    owner: class.clone(),
                    name: name.clone(),
                    descriptor: descriptor.clone(),
                })
                .collect()
        }

        fn methods(&self, class: &ClassRef) -> Vec<MethodRef> {
            self.classes
                .get(class.name())
                .into_iter()
                .flat_map(|c| c.methods.iter())
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
                .find(|(n, d, _)| *n == method.name && *d == method.descriptor)
                .map(|(_, _, a)| *a)
        }

        fn superclass(&self, class: &ClassRef) -> Option<ClassRef> {
            let name = self.classes.get(class.name())?.superclass.as_deref()?;
            self.classes
                .contains_key(name)
                .then(|| ClassRef::new(name))
        }

        fn interfaces(&self, _class: &ClassRef) -> Vec<ClassRef> {
            Vec::new()
        }
    }

    fn class(name: &str) -> SymbolRef {
        SymbolRef::Class(ClassRef::new(name))
    }

    fn field(owner: &str, name: &str, desc: &str) -> SymbolRef {
        SymbolRef::Field(FieldRef {
            owner: ClassRef::new(owner),
            name: name.into(),
            descriptor: desc.into(),
        })
    }

    fn method(owner: &str, name: &str, desc: &str) -> SymbolRef {
        SymbolRef::Method(MethodRef {
            owner: ClassRef::new(owner),
            name: name.into(),
            descriptor: desc.into(),
        })
    }

    fn run_to_lines(
        stabilizer: &mut Stabilizer,
        index: &dyn SymbolIndex,
        mapping: &MappingTree,
    ) -> Vec<String> {
        let mut out = Vec::new();
        stabilizer.run(index, mapping, &mut out).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_fresh_allocation() {
        let index = FakeIndex::default()
            .class("a")
            .field("a", "x", "I")
            .method("a", "m", "()V", AccessFlags::PUBLIC)
            .class("a$b");
        let mut mapping = MappingTree::new();
        mapping.insert(class("a"), MappingRecord::renamed("Widget"));
        mapping.insert(field("a", "x", "I"), MappingRecord::renamed("count"));
        mapping.insert(method("a", "m", "()V"), MappingRecord::renamed("run"));
        mapping.insert(class("a$b"), MappingRecord::renamed("Part"));

        let lines = run_to_lines(&mut Stabilizer::new(), &index, &mapping);
        assert_eq!(
            lines,
            vec![
                "CLASS\ta\tclass_1",
                "FIELD\ta\tI\tx\tfield_1",
                "METHOD\ta\t()V\tm\tmethod_1",
                "CLASS\ta$b\tclass_2",
                "#COUNTER\tclass\t2",
                "#COUNTER\tfield\t1",
                "#COUNTER\tmethod\t1",
            ]
        );
    }

    #[test]
    fn test_unmapped_symbols_get_no_rows() {
        let index = FakeIndex::default().class("a").field("a", "x", "I");
        let mut mapping = MappingTree::new();
        mapping.insert(class("a"), MappingRecord::renamed("Widget"));
        // Field present in the release but never renamed.
        let lines = run_to_lines(&mut Stabilizer::new(), &index, &mapping);
        assert_eq!(
            lines,
            vec!["CLASS\ta\tclass_1", "#COUNTER\tclass\t1"]
        );
    }

    #[test]
    fn test_override_gets_no_row() {
        let index = FakeIndex::default()
            .method("base", "m", "()V", AccessFlags::PUBLIC)
            .extends("sub", "base")
            .method("sub", "m", "()V", AccessFlags::PUBLIC);
        let mut mapping = MappingTree::new();
        mapping.insert(method("base", "m", "()V"), MappingRecord::renamed("run"));
        mapping.insert(method("sub", "m", "()V"), MappingRecord::renamed("run"));

        let lines = run_to_lines(&mut Stabilizer::new(), &index, &mapping);
        assert_eq!(
            lines,
            vec!["METHOD\tbase\t()V\tm\tmethod_1", "#COUNTER\tmethod\t1"]
        );
    }

    #[test]
    fn test_previous_names_survive_an_obfuscation_rename() {
        // Release 1 called the class `a`; release 2 calls it `a2`. Both
        // map it to the same deobfuscated name.
        let mut old = MappingTree::new();
        old.insert(class("a"), MappingRecord::renamed("com/x/Widget"));
        let mut new = MappingTree::new();
        new.insert(class("a2"), MappingRecord::renamed("com/x/Widget"));
        new.insert(class("b2"), MappingRecord::renamed("com/x/Fresh"));

        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("stable.tab");
        let mut file = std::fs::File::create(&previous).unwrap();
        writeln!(file, "CLASS\ta\tclass_1").unwrap();
        writeln!(file, "#COUNTER\tclass\t1").unwrap();
        drop(file);

        let mut stabilizer = Stabilizer::new();
        assert_eq!(stabilizer.match_releases(&old, &new).unwrap(), 1);
        stabilizer.load_previous(&previous).unwrap();

        let index = FakeIndex::default().class("a2").class("b2");
        let lines = run_to_lines(&mut stabilizer, &index, &new);
        assert_eq!(
            lines,
            vec![
                "CLASS\ta2\tclass_1",
                "CLASS\tb2\tclass_2",
                "#COUNTER\tclass\t2",
            ]
        );
    }

    #[test]
    fn test_member_match_adapts_descriptors() {
        // The field's descriptor references its own class, so the obf
        // spelling changes between releases while the deobf one is fixed.
        let mut old = MappingTree::new();
        old.insert(class("a"), MappingRecord::renamed("com/x/Widget"));
        old.insert(field("a", "f", "La;"), MappingRecord::renamed("self"));
        let mut new = MappingTree::new();
        new.insert(class("a2"), MappingRecord::renamed("com/x/Widget"));
        new.insert(field("a2", "g", "La2;"), MappingRecord::renamed("self"));

        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("stable.tab");
        std::fs::write(
            &previous,
            "CLASS\ta\tclass_1\nFIELD\ta\tLa;\tf\tfield_9\n#COUNTER\tclass\t1\n#COUNTER\tfield\t9\n",
        )
        .unwrap();

        let mut stabilizer = Stabilizer::new();
        assert_eq!(stabilizer.match_releases(&old, &new).unwrap(), 2);
        stabilizer.load_previous(&previous).unwrap();

        let index = FakeIndex::default().class("a2").field("a2", "g", "La2;");
        let lines = run_to_lines(&mut stabilizer, &index, &new);
        assert_eq!(
            lines,
            vec![
                "CLASS\ta2\tclass_1",
                "FIELD\ta2\tLa2;\tg\tfield_9",
                "#COUNTER\tclass\t1",
                "#COUNTER\tfield\t9",
            ]
        );
    }

    #[test]
    fn test_counters_never_regress() {
        let dir = tempfile::tempdir().unwrap();
        let previous = dir.path().join("stable.tab");
        std::fs::write(&previous, "#COUNTER\tclass\t41\n").unwrap();

        let mut stabilizer = Stabilizer::new();
        stabilizer.load_previous(&previous).unwrap();

        let index = FakeIndex::default().class("a");
        let mut mapping = MappingTree::new();
        mapping.insert(class("a"), MappingRecord::renamed("Widget"));
        let lines = run_to_lines(&mut stabilizer, &index, &mapping);
        assert_eq!(
            lines,
            vec!["CLASS\ta\tclass_42", "#COUNTER\tclass\t42"]
        );
    }

    #[test]
    fn test_load_previous_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Stabilizer::new()
            .load_previous(&dir.path().join("absent.tab"))
            .unwrap_err();
        assert!(matches!(err, StabilizeError::MissingInput(_)));
    }

    #[test]
    fn test_load_previous_rejects_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stable.tab");

        std::fs::write(&path, "CLASS\ta\n").unwrap();
        let err = Stabilizer::new().load_previous(&path).unwrap_err();
        assert!(matches!(err, StabilizeError::Parse { line: 1, .. }));

        std::fs::write(&path, "#COUNTER\tclass\tlots\n").unwrap();
        let err = Stabilizer::new().load_previous(&path).unwrap_err();
        assert!(matches!(err, StabilizeError::Parse { line: 1, .. }));
    }
}
