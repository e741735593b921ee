//! # docqa core
//!
//! Runtime-free logic for the documentation question-answering service:
//! data models, fixed-width chunking, vector utilities, the storage
//! capability trait, and the semantic retrieval algorithm.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. The
//! application crate supplies the concrete store and model backends.

pub mod chunk;
pub mod embedding;
pub mod models;
pub mod retrieval;
pub mod store;
