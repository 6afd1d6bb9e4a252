//! Member-by-member merge of two type artifacts.
//!
//! The client artifact is authoritative for shape and identity: header
//! fields (name, super, interfaces, version, source attributes,
//! outer-class links, type annotations) are taken from it verbatim and
//! the server header is discarded. The server only contributes members
//! the client lacks. When a key exists on both sides the client body
//! wins even if the bodies differ; reconciling divergent implementations
//! under one identity key is out of scope.

use crate::artifact::{
    Annotation, ArtifactCodec, FieldMember, InnerTypeRef, MethodMember, TypeArtifact,
};
use crate::ordered::{merge_family, MemberFamily};
use crate::{MergeError, Side};

/// Annotation type used to mark side-exclusive types and members.
pub const SIDE_ANNOTATION: &str = "tag/Side";

fn side_annotation(side: Side) -> Annotation {
    Annotation {
        type_name: SIDE_ANNOTATION.into(),
        values: vec![("value".into(), side.marker().into())],
    }
}

struct Fields;

impl MemberFamily for Fields {
    type Item = FieldMember;
    type Key = (String, String);

    // Generic signature deliberately excluded: same-name members with
    // the same erased descriptor collapse to one key.
    fn identity(item: &FieldMember) -> Self::Key {
        (item.name.clone(), item.descriptor.clone())
    }

    fn tag_side(item: &mut FieldMember, side: Side) {
        item.annotations.push(side_annotation(side));
    }
}

struct Methods;

impl MemberFamily for Methods {
    type Item = MethodMember;
    type Key = (String, String);

    fn identity(item: &MethodMember) -> Self::Key {
        (item.name.clone(), item.descriptor.clone())
    }

    fn tag_side(item: &mut MethodMember, side: Side) {
        item.annotations.push(side_annotation(side));
    }
}

struct InnerTypes;

impl MemberFamily for InnerTypes {
    type Item = InnerTypeRef;
    type Key = String;

    fn identity(item: &InnerTypeRef) -> String {
        item.name.clone()
    }

    // Inner-type refs carry no annotation slot; presence in the merged
    // table is enough.
    fn tag_side(_item: &mut InnerTypeRef, _side: Side) {}
}

/// Merges two decoded artifacts into one.
pub fn merge_artifacts(client: &TypeArtifact, server: &TypeArtifact) -> TypeArtifact {
    let mut out = TypeArtifact::named(client.name.clone());
    out.version = client.version;
    out.access = client.access;
    out.signature = client.signature.clone();
    out.super_name = client.super_name.clone();
    out.interfaces = client.interfaces.clone();
    out.source_file = client.source_file.clone();
    out.outer = client.outer.clone();
    out.annotations = client.annotations.clone();

    out.inner_types = merge_family::<InnerTypes>(&client.inner_types, &server.inner_types);
    out.fields = merge_family::<Fields>(&client.fields, &server.fields);
    out.methods = merge_family::<Methods>(&client.methods, &server.methods);
    out
}

/// Attaches the type-level side marker, used when a whole type exists on
/// one variant only.
pub fn add_side_marker(artifact: &mut TypeArtifact, side: Side) {
    artifact.annotations.push(side_annotation(side));
}

/// Byte-level front of the artifact merge, parameterized over the codec.
pub struct ClassMerger<'a, C: ArtifactCodec> {
    codec: &'a C,
}

impl<'a, C: ArtifactCodec> ClassMerger<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        Self { codec }
    }

    /// Decodes both variants, merges them and re-encodes the result.
    pub fn merge(&self, client: &[u8], server: &[u8]) -> Result<Vec<u8>, MergeError> {
        let client = self.codec.decode(client)?;
        let server = self.codec.decode(server)?;
        Ok(self.codec.encode(&merge_artifacts(&client, &server)))
    }

    /// Re-encodes a type with the whole-type side marker attached.
    pub fn add_side_information(&self, bytes: &[u8], side: Side) -> Result<Vec<u8>, MergeError> {
        let mut artifact = self.codec.decode(bytes)?;
        add_side_marker(&mut artifact, side);
        Ok(self.codec.encode(&artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::FlatCodec;
    use common::AccessFlags;

    fn field(name: &str, desc: &str) -> FieldMember {
        FieldMember {
            name: name.into(),
            descriptor: desc.into(),
            signature: None,
            access: AccessFlags::PRIVATE,
            annotations: Vec::new(),
        }
    }

    fn method(name: &str, desc: &str, code: &[u8]) -> MethodMember {
        MethodMember {
            name: name.into(),
            descriptor: desc.into(),
            signature: None,
            access: AccessFlags::PUBLIC,
            annotations: Vec::new(),
            code: code.to_vec(),
        }
    }

    fn artifact(name: &str, fields: Vec<FieldMember>, methods: Vec<MethodMember>) -> TypeArtifact {
        let mut a = TypeArtifact::named(name);
        a.version = 52;
        a.super_name = Some("java/lang/Object".into());
        a.fields = fields;
        a.methods = methods;
        a
    }

    fn side_of(annotations: &[Annotation]) -> Option<&str> {
        annotations
            .iter()
            .find(|a| a.type_name == SIDE_ANNOTATION)
            .and_then(|a| a.values.first())
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_merge_with_self_is_identity() {
        let t = artifact(
            "a/Foo",
            vec![field("x", "I"), field("y", "J")],
            vec![method("run", "()V", &[0xB1])],
        );
        let merged = merge_artifacts(&t, &t);
        assert_eq!(merged.fields, t.fields);
        assert_eq!(merged.methods, t.methods);
        assert!(merged
            .fields
            .iter()
            .all(|f| side_of(&f.annotations).is_none()));
        assert!(merged
            .methods
            .iter()
            .all(|m| side_of(&m.annotations).is_none()));
    }

    #[test]
    fn test_exclusive_members_are_tagged() {
        let client = artifact(
            "a/Foo",
            vec![field("shared", "I"), field("clientOnly", "J")],
            vec![method("render", "()V", &[1])],
        );
        let server = artifact(
            "a/Foo",
            vec![field("shared", "I"), field("serverOnly", "Z")],
            vec![method("tick", "()V", &[2])],
        );
        let merged = merge_artifacts(&client, &server);

        let names: Vec<&str> = merged.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["shared", "clientOnly", "serverOnly"]);
        assert_eq!(side_of(&merged.fields[0].annotations), None);
        assert_eq!(side_of(&merged.fields[1].annotations), Some("CLIENT"));
        assert_eq!(side_of(&merged.fields[2].annotations), Some("SERVER"));
        assert_eq!(side_of(&merged.methods[0].annotations), Some("CLIENT"));
        assert_eq!(side_of(&merged.methods[1].annotations), Some("SERVER"));
    }

    #[test]
    fn test_client_body_wins_on_shared_key() {
        let client = artifact("a/Foo", vec![], vec![method("run", "()V", &[1, 2, 3])]);
        let server = artifact("a/Foo", vec![], vec![method("run", "()V", &[9, 9])]);
        let merged = merge_artifacts(&client, &server);
        assert_eq!(merged.methods[0].code, vec![1, 2, 3]);
        assert_eq!(side_of(&merged.methods[0].annotations), None);
    }

    #[test]
    fn test_header_comes_from_client() {
        let mut client = artifact("a/Foo", vec![], vec![]);
        client.interfaces = vec!["a/ClientIface".into()];
        client.source_file = Some("Foo.java".into());
        let mut server = artifact("a/Foo", vec![], vec![]);
        server.interfaces = vec!["a/ServerIface".into()];
        server.version = 61;

        let merged = merge_artifacts(&client, &server);
        assert_eq!(merged.version, client.version);
        assert_eq!(merged.interfaces, vec!["a/ClientIface".to_string()]);
        assert_eq!(merged.source_file, Some("Foo.java".into()));
    }

    #[test]
    fn test_same_name_different_descriptor_are_distinct() {
        let client = artifact("a/Foo", vec![field("x", "I")], vec![]);
        let server = artifact("a/Foo", vec![field("x", "J")], vec![]);
        let merged = merge_artifacts(&client, &server);
        assert_eq!(merged.fields.len(), 2);
    }

    #[test]
    fn test_type_level_side_marker() {
        let mut t = artifact("a/ClientScreen", vec![], vec![]);
        add_side_marker(&mut t, Side::Client);
        assert_eq!(side_of(&t.annotations), Some("CLIENT"));
    }

    #[test]
    fn test_byte_level_merge_through_codec() {
        let codec = FlatCodec;
        let client = artifact("a/Foo", vec![field("c", "I")], vec![]);
        let server = artifact("a/Foo", vec![field("s", "I")], vec![]);
        let merger = ClassMerger::new(&codec);
        let bytes = merger
            .merge(&codec.encode(&client), &codec.encode(&server))
            .unwrap();
        let merged = codec.decode(&bytes).unwrap();
        assert_eq!(merged.fields.len(), 2);
    }

    #[test]
    fn test_byte_level_merge_rejects_garbage() {
        let codec = FlatCodec;
        let merger = ClassMerger::new(&codec);
        assert!(matches!(
            merger.merge(b"garbage", b"garbage"),
            Err(MergeError::Decode(_))
        ));
    }
}
