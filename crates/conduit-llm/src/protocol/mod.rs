//! Wire format types for the OpenAI-compatible HTTP API
//!
//! Pure serde structs matching the backend's JSON. They are only used for
//! serialization/deserialization at the boundary and are not used internally.

pub mod openai;
