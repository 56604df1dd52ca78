#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;
use std::sync::Arc;
use wire_codec::{CodecConfig, StructCodec, StructDescriptor, TypeDescriptor};

static SCHEMA: Lazy<Arc<StructDescriptor>> = Lazy::new(|| {
    let inner = StructDescriptor::builder("Inner")
        .optional(1, "name", TypeDescriptor::String)
        .optional(2, "ids", TypeDescriptor::set(TypeDescriptor::I64))
        .build()
        .expect("inner schema");
    StructDescriptor::builder("Outer")
        .optional(1, "flag", TypeDescriptor::Bool)
        .optional(2, "inner", TypeDescriptor::structure(&inner))
        .optional(
            3,
            "index",
            TypeDescriptor::map(
                TypeDescriptor::String,
                TypeDescriptor::list(TypeDescriptor::structure(&inner)),
            ),
        )
        .optional(4, "blob", TypeDescriptor::Binary)
        .build()
        .expect("outer schema")
});

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode or fail cleanly: no panics, no unbounded allocation
    let codec = StructCodec::new(CodecConfig {
        max_depth: 32,
        max_string_len: 4096,
        max_container_len: 4096,
        ..CodecConfig::default()
    });
    let rt = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let _ = rt.block_on(codec.decode_from_slice(data, &SCHEMA));
});
