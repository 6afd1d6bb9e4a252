//! Field and method descriptor handling.
//!
//! Descriptors are the erased type-signature strings of the compiled
//! format: `I`, `[J`, `La/b/Foo;` for fields, `(La/Foo;I)V` for methods.
//! The only structural operation the engines need is remapping the class
//! names embedded in them, so descriptors stay as validated strings with
//! a single token walker shared between validation and remapping.

use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("malformed descriptor: {0:?}")]
    Malformed(String),
    #[error("truncated descriptor: {0:?}")]
    Truncated(String),
}

/// Validated field descriptor, e.g. `I`, `[[Z`, `La/Foo;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(String);

impl FieldDescriptor {
    pub fn parse(raw: &str) -> Result<Self, DescriptorError> {
        let bytes = raw.as_bytes();
        let end = walk_type(bytes, 0).ok_or_else(|| DescriptorError::Malformed(raw.into()))?;
        if end != bytes.len() {
            return Err(DescriptorError::Malformed(raw.into()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rewrites every embedded class name through `rename`; names the
    /// function returns `None` for are kept as-is.
    pub fn remap(&self, rename: &dyn Fn(&str) -> Option<String>) -> FieldDescriptor {
        FieldDescriptor(remap_types(&self.0, rename))
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated method descriptor, e.g. `(ILa/Foo;)[B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor(String);

impl MethodDescriptor {
    pub fn parse(raw: &str) -> Result<Self, DescriptorError> {
        let bytes = raw.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(DescriptorError::Malformed(raw.into()));
        }
        let mut i = 1;
        while i < bytes.len() && bytes[i] != b')' {
            i = walk_type(bytes, i).ok_or_else(|| DescriptorError::Malformed(raw.into()))?;
        }
        if i >= bytes.len() {
            return Err(DescriptorError::Truncated(raw.into()));
        }
        i += 1; // ')'
        let end = if bytes.get(i) == Some(&b'V') {
            i + 1
        } else {
            walk_type(bytes, i).ok_or_else(|| DescriptorError::Malformed(raw.into()))?
        };
        if end != bytes.len() {
            return Err(DescriptorError::Malformed(raw.into()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn remap(&self, rename: &dyn Fn(&str) -> Option<String>) -> MethodDescriptor {
        MethodDescriptor(remap_types(&self.0, rename))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Advances past one type token starting at `i`. Returns the index one
/// past the token, or `None` on malformed input.
fn walk_type(bytes: &[u8], mut i: usize) -> Option<usize> {
    while bytes.get(i) == Some(&b'[') {
        i += 1;
    }
    match bytes.get(i)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(i + 1),
        b'L' => {
            let semi = bytes[i + 1..].iter().position(|&b| b == b';')?;
            if semi == 0 {
                return None;
            }
            Some(i + 1 + semi + 1)
        }
        _ => None,
    }
}

/// Single pass over a (valid) descriptor, rewriting `L...;` class names.
/// Punctuation (`(`, `)`, `[`, primitives, `V`) is copied verbatim, so the
/// same walker serves field and method descriptors.
fn remap_types(desc: &str, rename: &dyn Fn(&str) -> Option<String>) -> String {
    let bytes = desc.as_bytes();
    let mut out = String::with_capacity(desc.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'L' {
            // Validated upstream, so the ';' is always present.
            let semi = i + 1 + bytes[i + 1..].iter().position(|&b| b == b';').unwrap_or(0);
            let name = &desc[i + 1..semi];
            out.push('L');
            match rename(name) {
                Some(mapped) => out.push_str(&mapped),
                None => out.push_str(name),
            }
            out.push(';');
            i = semi + 1;
        } else {
            out.push(bytes[i] as char);
            i += 1;
        }
    }
    out
}
