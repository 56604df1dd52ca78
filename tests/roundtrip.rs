//! Round-trip tests through the binary and token ports

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use wire_codec::{
    BinaryReader, BinaryWriter, EnumDescriptor, Record, StructCodec, StructDescriptor,
    TokenReader, TokenWriter, TypeDescriptor, Value,
};

fn point() -> Arc<StructDescriptor> {
    StructDescriptor::builder("Point")
        .optional(1, "x", TypeDescriptor::I32)
        .optional(2, "y", TypeDescriptor::I32)
        .build()
        .expect("point descriptor")
}

fn shape() -> Arc<StructDescriptor> {
    let kind = EnumDescriptor::new("Kind", [("CIRCLE", 1), ("SQUARE", 2)]);
    StructDescriptor::builder("Shape")
        .required(1, "name", TypeDescriptor::String)
        .optional(2, "kind", TypeDescriptor::Enum(kind))
        .optional(3, "origin", TypeDescriptor::structure(&point()))
        .optional(4, "outline", TypeDescriptor::list(TypeDescriptor::structure(&point())))
        .optional(5, "labels", TypeDescriptor::set(TypeDescriptor::String))
        .optional(
            6,
            "layers",
            TypeDescriptor::map(TypeDescriptor::I16, TypeDescriptor::list(TypeDescriptor::Double)),
        )
        .optional(7, "blob", TypeDescriptor::Binary)
        .optional(8, "visible", TypeDescriptor::Bool)
        .optional(9, "weight", TypeDescriptor::Float)
        .optional(10, "tiny", TypeDescriptor::I8)
        .optional(11, "big", TypeDescriptor::I64)
        .build()
        .expect("shape descriptor")
}

fn at(x: i32, y: i32) -> Value {
    Value::Struct(
        Record::new(point())
            .with("x", x)
            .unwrap()
            .with("y", y)
            .unwrap(),
    )
}

fn full_shape() -> Record {
    let labels: BTreeSet<Value> = ["b", "a", "c"].into_iter().map(Value::from).collect();
    let mut layers = BTreeMap::new();
    layers.insert(
        Value::I16(-2),
        Value::List(vec![Value::Double(0.5), Value::Double(f64::MIN_POSITIVE)]),
    );
    layers.insert(Value::I16(7), Value::List(Vec::new()));

    Record::new(shape())
        .with("name", "triangle")
        .unwrap()
        .with("kind", 2)
        .unwrap()
        .with("origin", at(0, 0))
        .unwrap()
        .with("outline", Value::List(vec![at(0, 0), at(4, 0), at(0, 3)]))
        .unwrap()
        .with("labels", Value::Set(labels))
        .unwrap()
        .with("layers", Value::Map(layers))
        .unwrap()
        .with("blob", vec![0u8, 1, 255])
        .unwrap()
        .with("visible", true)
        .unwrap()
        .with("weight", 1.25f32)
        .unwrap()
        .with("tiny", -8i8)
        .unwrap()
        .with("big", i64::MIN)
        .unwrap()
}

async fn binary_round_trip(record: &Record) -> Record {
    let codec = StructCodec::default();
    let mut writer = BinaryWriter::new(Vec::new());
    codec.write(&mut writer, record).await.expect("write");
    let bytes = writer.into_inner();

    let mut reader = BinaryReader::new(bytes.as_slice());
    let decoded = codec
        .read(&mut reader, record.descriptor())
        .await
        .expect("read");
    assert!(reader.get_ref().is_empty(), "reader left bytes behind");
    decoded
}

async fn token_round_trip(record: &Record) -> Record {
    let codec = StructCodec::default();
    let mut writer = TokenWriter::new();
    codec.write(&mut writer, record).await.expect("write");
    let json = writer.to_json().expect("json");

    let mut reader = TokenReader::from_json(&json).expect("parse tokens");
    let decoded = codec
        .read(&mut reader, record.descriptor())
        .await
        .expect("read");
    assert_eq!(reader.remaining(), 0);
    decoded
}

#[tokio::test]
async fn test_full_record_binary_round_trip() {
    let record = full_shape();
    let decoded = binary_round_trip(&record).await;
    assert_eq!(decoded, record);
    assert_eq!(decoded.iter_set().count(), 11);
    assert!(decoded.validate().is_ok());
}

#[tokio::test]
async fn test_full_record_token_round_trip() {
    let record = full_shape();
    assert_eq!(token_round_trip(&record).await, record);
}

#[tokio::test]
async fn test_point_presence_scenario() {
    let only_x = Record::new(point()).with("x", 10).unwrap();
    let decoded = binary_round_trip(&only_x).await;

    assert!(decoded.is_set("x"));
    assert!(!decoded.is_set("y"));
    assert_eq!(decoded.get("y"), Some(&Value::I32(0)));

    // an explicit zero is not the same as absent
    let explicit = only_x.clone().with("y", 0).unwrap();
    assert_ne!(decoded, explicit);
    assert_ne!(
        wire_codec::hash_value(&Value::Struct(decoded.clone())),
        wire_codec::hash_value(&Value::Struct(explicit))
    );

    let mut cleared = decoded;
    cleared.unset("x").unwrap();
    assert_eq!(cleared.iter_set().count(), 0);
    assert_eq!(binary_round_trip(&cleared).await, Record::new(point()));
}

#[tokio::test]
async fn test_empty_nested_containers_round_trip() {
    let desc = StructDescriptor::builder("Groups")
        .optional(
            1,
            "groups",
            TypeDescriptor::list(TypeDescriptor::set(TypeDescriptor::structure(&point()))),
        )
        .build()
        .unwrap();

    let empty = Record::new(Arc::clone(&desc))
        .with("groups", Value::List(Vec::new()))
        .unwrap();
    let decoded = binary_round_trip(&empty).await;
    assert!(decoded.is_set("groups"));
    assert_eq!(decoded, empty);

    let one_empty_set = Record::new(desc)
        .with("groups", Value::List(vec![Value::Set(BTreeSet::new())]))
        .unwrap();
    assert_eq!(binary_round_trip(&one_empty_set).await, one_empty_set);
}

#[tokio::test]
async fn test_missing_required_reported_by_validate() {
    let desc = shape();
    let mut writer = BinaryWriter::new(Vec::new());
    // fields without `name`: the writer fills the required slot with its default
    let record = Record::new(Arc::clone(&desc)).with("big", 1i64).unwrap();
    assert!(record.validate().is_err());

    StructCodec::default()
        .write(&mut writer, &record)
        .await
        .unwrap();
    let bytes = writer.into_inner();
    let decoded = StructCodec::default()
        .read(&mut BinaryReader::new(bytes.as_slice()), &desc)
        .await
        .unwrap();
    assert!(decoded.is_set("name"));
    assert_eq!(decoded.get("name"), Some(&Value::from("")));
}
