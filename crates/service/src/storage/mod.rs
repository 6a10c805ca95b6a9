//! Storage abstractions for service layer
//!
//! The trip store only needs a string-keyed blob store. [`kv::KvBackend`] is
//! that seam; `json_map_store` persists a small map as one JSON file and
//! `memory_kv` keeps everything in process for tests.

pub mod kv;
pub mod json_map_store;
pub mod memory_kv;

pub use json_map_store::{JsonFileKv, JsonMapStore};
pub use kv::KvBackend;
pub use memory_kv::MemoryKv;
