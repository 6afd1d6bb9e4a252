//! Structural model of a compiled type and the codec seam.
//!
//! The engine only ever looks at artifacts through this model; how the
//! bytes of the target toolchain's class-file format map onto it is the
//! codec's business. `ArtifactCodec` is that seam, and `FlatCodec` is the
//! built-in implementation: a self-contained length-prefixed encoding
//! that lets the whole pipeline run without the external class-file
//! codec.

use common::AccessFlags;

use crate::MergeError;

/// One key/value pair annotation attached to a type or member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Annotation type name, e.g. `tag/Side`.
    pub type_name: String,
    pub values: Vec<(String, String)>,
}

/// Link back to the enclosing class/method of a local or anonymous type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterLink {
    pub class: String,
    pub method: Option<String>,
    pub method_descriptor: Option<String>,
}

/// Reference to a nested type recorded in the enclosing artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerTypeRef {
    pub name: String,
    pub outer_name: Option<String>,
    pub inner_name: Option<String>,
    pub access: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMember {
    pub name: String,
    pub descriptor: String,
    /// Generic signature. Deliberately not part of the identity key: two
    /// members differing only here are treated as one.
    pub signature: Option<String>,
    pub access: AccessFlags,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodMember {
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub access: AccessFlags,
    pub annotations: Vec<Annotation>,
    /// Opaque instruction payload. Never rewritten, never compared.
    pub code: Vec<u8>,
}

/// Structural view of one compiled type. Declared order of members is
/// preserved unless explicitly merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeArtifact {
    pub version: u16,
    pub access: AccessFlags,
    pub name: String,
    pub signature: Option<String>,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub source_file: Option<String>,
    pub outer: Option<OuterLink>,
    pub annotations: Vec<Annotation>,
    pub inner_types: Vec<InnerTypeRef>,
    pub fields: Vec<FieldMember>,
    pub methods: Vec<MethodMember>,
}

impl TypeArtifact {
    /// Bare artifact with empty member tables, used as a merge target.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            version: 0,
            access: AccessFlags::empty(),
            name: name.into(),
            signature: None,
            super_name: None,
            interfaces: Vec::new(),
            source_file: None,
            outer: None,
            annotations: Vec::new(),
            inner_types: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }
}

/// Decode/encode seam for the on-disk type format.
pub trait ArtifactCodec {
    fn decode(&self, bytes: &[u8]) -> Result<TypeArtifact, MergeError>;
    fn encode(&self, artifact: &TypeArtifact) -> Vec<u8>;
}

const FLAT_MAGIC: &[u8; 4] = b"SART";
const FLAT_VERSION: u16 = 1;

/// Built-in length-prefixed structural codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatCodec;

impl ArtifactCodec for FlatCodec {
    fn decode(&self, bytes: &[u8]) -> Result<TypeArtifact, MergeError> {
        let mut r = Reader::new(bytes);
        if r.take(4)? != FLAT_MAGIC {
            return Err(MergeError::Decode("bad artifact magic".into()));
        }
        let format = r.u16()?;
        if format != FLAT_VERSION {
            return Err(MergeError::Decode(format!(
                "unsupported artifact format {format}"
            )));
        }

        let version = r.u16()?;
        let access = AccessFlags::from_bits_retain(r.u16()?);
        let name = r.string()?;
        let signature = r.opt_string()?;
        let super_name = r.opt_string()?;
        let interfaces = r.list(Reader::string)?;
        let source_file = r.opt_string()?;
        let outer = match r.u8()? {
            0 => None,
            1 => Some(OuterLink {
                class: r.string()?,
                method: r.opt_string()?,
                method_descriptor: r.opt_string()?,
            }),
            n => return Err(MergeError::Decode(format!("bad outer-link flag {n}"))),
        };
        let annotations = r.list(Reader::annotation)?;
        let inner_types = r.list(|r| {
            Ok(InnerTypeRef {
                name: r.string()?,
                outer_name: r.opt_string()?,
                inner_name: r.opt_string()?,
                access: AccessFlags::from_bits_retain(r.u16()?),
            })
        })?;
        let fields = r.list(|r| {
            Ok(FieldMember {
                name: r.string()?,
                descriptor: r.string()?,
                signature: r.opt_string()?,
                access: AccessFlags::from_bits_retain(r.u16()?),
                annotations: r.list(Reader::annotation)?,
            })
        })?;
        let methods = r.list(|r| {
            Ok(MethodMember {
                name: r.string()?,
                descriptor: r.string()?,
                signature: r.opt_string()?,
                access: AccessFlags::from_bits_retain(r.u16()?),
                annotations: r.list(Reader::annotation)?,
                code: r.blob()?,
            })
        })?;
        if !r.at_end() {
            return Err(MergeError::Decode("trailing bytes after artifact".into()));
        }

        Ok(TypeArtifact {
            version,
            access,
            name,
            signature,
            super_name,
            interfaces,
            source_file,
            outer,
            annotations,
            inner_types,
            fields,
            methods,
        })
    }

    fn encode(&self, artifact: &TypeArtifact) -> Vec<u8> {
        let mut w = Writer::default();
        w.bytes(FLAT_MAGIC);
        w.u16(FLAT_VERSION);
        w.u16(artifact.version);
        w.u16(artifact.access.bits());
        w.string(&artifact.name);
        w.opt_string(artifact.signature.as_deref());
        w.opt_string(artifact.super_name.as_deref());
        w.list(&artifact.interfaces, |w, s| w.string(s));
        w.opt_string(artifact.source_file.as_deref());
        match &artifact.outer {
            None => w.u8(0),
            Some(outer) => {
                w.u8(1);
                w.string(&outer.class);
                w.opt_string(outer.method.as_deref());
                w.opt_string(outer.method_descriptor.as_deref());
            }
        }
        w.list(&artifact.annotations, Writer::annotation);
        w.list(&artifact.inner_types, |w, inner| {
            w.string(&inner.name);
            w.opt_string(inner.outer_name.as_deref());
            w.opt_string(inner.inner_name.as_deref());
            w.u16(inner.access.bits());
        });
        w.list(&artifact.fields, |w, f| {
            w.string(&f.name);
            w.string(&f.descriptor);
            w.opt_string(f.signature.as_deref());
            w.u16(f.access.bits());
            w.list(&f.annotations, Writer::annotation);
        });
        w.list(&artifact.methods, |w, m| {
            w.string(&m.name);
            w.string(&m.descriptor);
            w.opt_string(m.signature.as_deref());
            w.u16(m.access.bits());
            w.list(&m.annotations, Writer::annotation);
            w.blob(&m.code);
        });
        w.into_bytes()
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MergeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| MergeError::Decode("artifact truncated".into()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, MergeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, MergeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, MergeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self) -> Result<String, MergeError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| MergeError::Decode("non-utf8 string in artifact".into()))
    }

    fn opt_string(&mut self) -> Result<Option<String>, MergeError> {
        match self.u8()? {
            0 => Ok(None),
            1 => Ok(Some(self.string()?)),
            n => Err(MergeError::Decode(format!("bad option flag {n}"))),
        }
    }

    fn blob(&mut self) -> Result<Vec<u8>, MergeError> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn list<T>(
        &mut self,
        mut read: impl FnMut(&mut Self) -> Result<T, MergeError>,
    ) -> Result<Vec<T>, MergeError> {
        let count = self.u16()? as usize;
        let mut out = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            out.push(read(self)?);
        }
        Ok(out)
    }

    fn annotation(&mut self) -> Result<Annotation, MergeError> {
        let type_name = self.string()?;
        let values = self.list(|r| Ok((r.string()?, r.string()?)))?;
        Ok(Annotation { type_name, values })
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn string(&mut self, s: &str) {
        self.u16(s.len() as u16);
        self.bytes(s.as_bytes());
    }

    fn opt_string(&mut self, s: Option<&str>) {
        match s {
            None => self.u8(0),
            Some(s) => {
                self.u8(1);
                self.string(s);
            }
        }
    }

    fn blob(&mut self, b: &[u8]) {
        self.u32(b.len() as u32);
        self.bytes(b);
    }

    fn list<T>(&mut self, items: &[T], mut write: impl FnMut(&mut Self, &T)) {
        self.u16(items.len() as u16);
        for item in items {
            write(self, item);
        }
    }

    fn annotation(&mut self, a: &Annotation) {
        self.string(&a.type_name);
        self.list(&a.values, |w, (k, v)| {
            w.string(k);
            w.string(v);
        });
    }
}
