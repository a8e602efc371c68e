use std::io;

use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
};

// The `protoc` binary is not available in every build environment, so
// instead of shelling out to it we build the `FileDescriptorSet` for
// `proto/ringkv.proto` in-process and hand it to tonic's code generator.
// The descriptor below is a faithful, 1:1 encoding of that `.proto` file;
// tonic produces exactly the same code it would have from a protoc run.
fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=proto/ringkv.proto");
    println!("cargo:rerun-if-changed=build.rs");

    let bytes_field = |name: &str, number: i32| FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Bytes as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    };
    let bool_field = |name: &str, number: i32| FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Bool as i32),
        json_name: Some(json_name(name)),
        ..Default::default()
    };
    let message = |name: &str, fields: Vec<FieldDescriptorProto>| DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    };
    let method = |name: &str, input: &str, output: &str| MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(format!(".ringkv.{}", input)),
        output_type: Some(format!(".ringkv.{}", output)),
        ..Default::default()
    };

    let file = FileDescriptorProto {
        name: Some("ringkv.proto".to_string()),
        package: Some("ringkv".to_string()),
        syntax: Some("proto3".to_string()),
        message_type: vec![
            message("GetRequest", vec![bytes_field("key", 1)]),
            message("GetResponse", vec![bytes_field("value", 1)]),
            message(
                "SetRequest",
                vec![bytes_field("key", 1), bytes_field("value", 2)],
            ),
            message("SetResponse", vec![bool_field("success", 1)]),
            message(
                "UpdateRequest",
                vec![bytes_field("key", 1), bytes_field("value", 2)],
            ),
            message("UpdateResponse", vec![bool_field("success", 1)]),
            message("DelRequest", vec![bytes_field("key", 1)]),
            message("DelResponse", vec![bool_field("success", 1)]),
        ],
        service: vec![ServiceDescriptorProto {
            name: Some("NodeStorage".to_string()),
            method: vec![
                method("Get", "GetRequest", "GetResponse"),
                method("Set", "SetRequest", "SetResponse"),
                method("Update", "UpdateRequest", "UpdateResponse"),
                method("Del", "DelRequest", "DelResponse"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    };

    let fds = FileDescriptorSet { file: vec![file] };
    tonic_build::compile_fds(fds)
}

/// protoc derives the default JSON name by lower-camel-casing the field
/// name. All of our field names are single lowercase words, so the JSON
/// name equals the field name, but compute it properly for fidelity.
fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
