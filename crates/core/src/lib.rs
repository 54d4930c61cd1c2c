//! Core entity recognition library: image codec, detection port and ONNX
//! adapter, and the request-to-result pipeline shared by the server and CLI.

pub mod codec;
pub mod detection;
pub mod error;
pub mod pipeline;
pub mod shared;
