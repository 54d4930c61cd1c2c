//! Generated gRPC bindings for the entity recognition proto.

tonic::include_proto!("entityrecognitionpb");

pub const FILE_DESCRIPTOR_SET: &[u8] =
    tonic::include_file_descriptor_set!("entityrecognition_descriptor");
