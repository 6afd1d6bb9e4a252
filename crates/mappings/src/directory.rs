//! Directory mapping dialect: one file per top-level class.
//!
//! A class `a/b/Foo` lives at `<root>/a/b/Foo.mapping`. Lines are
//! space-separated, nested scopes indented with tabs; the trailing
//! target token is optional:
//!
//! ```text
//! CLASS a/b/Foo Widget
//! 	FIELD x I count
//! 	METHOD m ()V run
//! 	CLASS Bar Part
//! 		FIELD y J total
//! ```

use std::fs;
use std::path::Path;

use common::{ClassRef, FieldRef, MethodRef, SymbolRef};
use walkdir::WalkDir;

use crate::dialect::MappingDialect;
use crate::tree::{MappingRecord, MappingTree};
use crate::MappingError;

const FILE_EXTENSION: &str = "mapping";

pub struct DirectoryDialect;

impl MappingDialect for DirectoryDialect {
    fn read(&self, root: &Path) -> Result<MappingTree, MappingError> {
        let mut files: Vec<_> = WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| {
                e.path().is_file()
                    && e.path().extension().and_then(|x| x.to_str()) == Some(FILE_EXTENSION)
            })
            .map(|e| e.into_path())
            .collect();
        files.sort();

        let mut tree = MappingTree::new();
        for file in files {
            read_class_file(&file, &mut tree)?;
        }
        Ok(tree)
    }

    fn write(&self, tree: &MappingTree, root: &Path) -> Result<(), MappingError> {
        for (sym, record) in tree.nodes() {
            let class = match sym {
                SymbolRef::Class(c) if c.outer().is_none() => c,
                _ => continue,
            };
            let path = root.join(format!("{}.{}", class.name(), FILE_EXTENSION));
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = String::new();
            write_class(tree, sym, record, 0, &mut out);
            fs::write(path, out)?;
        }
        Ok(())
    }
}

fn write_class(
    tree: &MappingTree,
    sym: &SymbolRef,
    record: &MappingRecord,
    depth: usize,
    out: &mut String,
) {
    let class = match sym {
        SymbolRef::Class(c) => c,
        _ => return,
    };
    let name = if depth == 0 {
        class.name()
    } else {
        class.simple_name()
    };
    push_line(out, depth, "CLASS", &[name], record.target.as_deref());

    for child in tree.children_of(sym) {
        let child_record = tree.get(child).cloned().unwrap_or_default();
        match child {
            SymbolRef::Field(f) => push_line(
                out,
                depth + 1,
                "FIELD",
                &[&f.name, &f.descriptor],
                child_record.target.as_deref(),
            ),
            SymbolRef::Method(m) => push_line(
                out,
                depth + 1,
                "METHOD",
                &[&m.name, &m.descriptor],
                child_record.target.as_deref(),
            ),
            SymbolRef::Class(_) => write_class(tree, child, &child_record, depth + 1, out),
        }
    }
}

fn push_line(out: &mut String, depth: usize, keyword: &str, tokens: &[&str], target: Option<&str>) {
    for _ in 0..depth {
        out.push('\t');
    }
    out.push_str(keyword);
    for token in tokens {
        out.push(' ');
        out.push_str(token);
    }
    if let Some(target) = target {
        out.push(' ');
        out.push_str(target);
    }
    out.push('\n');
}

fn read_class_file(path: &Path, tree: &mut MappingTree) -> Result<(), MappingError> {
    let text = fs::read_to_string(path)?;
    let parse_err = |line: usize, message: String| MappingError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    // Class scope per indent depth; depth d members hang off stack[d-1].
    let mut stack: Vec<ClassRef> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let depth = raw.bytes().take_while(|&b| b == b'\t').count();
        let mut tokens = raw[depth..].split(' ');
        let keyword = tokens.next().unwrap_or_default();
        let tokens: Vec<&str> = tokens.collect();

        if depth > stack.len() {
            return Err(parse_err(line_no, format!("indent {depth} skips a level")));
        }
        stack.truncate(depth);

        match keyword {
            "CLASS" => {
                let (name, target) = name_and_target(&tokens)
                    .ok_or_else(|| parse_err(line_no, "CLASS needs a name".into()))?;
                let class = match stack.last() {
                    Some(outer) => ClassRef::nested(Some(outer), name),
                    None => ClassRef::new(name),
                };
                tree.insert(SymbolRef::Class(class.clone()), record(target));
                stack.push(class);
            }
            "FIELD" | "METHOD" => {
                let owner = stack
                    .last()
                    .ok_or_else(|| parse_err(line_no, format!("{keyword} outside a class")))?
                    .clone();
                let (name, descriptor, target) = member_tokens(&tokens)
                    .ok_or_else(|| parse_err(line_no, format!("{keyword} needs name and descriptor")))?;
                let sym = if keyword == "FIELD" {
                    SymbolRef::Field(FieldRef {
                        owner,
                        name: name.into(),
                        descriptor: descriptor.into(),
                    })
                } else {
                    SymbolRef::Method(MethodRef {
                        owner,
                        name: name.into(),
                        descriptor: descriptor.into(),
                    })
                };
                tree.insert(sym, record(target));
            }
            other => {
                return Err(parse_err(line_no, format!("unknown keyword {other:?}")));
            }
        }
    }
    Ok(())
}

fn record(target: Option<&str>) -> MappingRecord {
    match target {
        Some(t) => MappingRecord::renamed(t),
        None => MappingRecord::unnamed(),
    }
}

fn name_and_target<'a>(tokens: &[&'a str]) -> Option<(&'a str, Option<&'a str>)> {
    match tokens {
        [name] => Some((name, None)),
        [name, target] => Some((name, Some(target))),
        _ => None,
    }
}

fn member_tokens<'a>(tokens: &[&'a str]) -> Option<(&'a str, &'a str, Option<&'a str>)> {
    match tokens {
        [name, desc] => Some((name, desc, None)),
        [name, desc, target] => Some((name, desc, Some(target))),
        _ => None,
    }
}
