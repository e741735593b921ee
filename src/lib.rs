//! # docqa
//!
//! Documentation question answering: upload files, ask questions, get
//! answers grounded in the uploaded text with citations.
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Extract   │──▶│ Chunk+Embed  │──▶│  SQLite  │
//! │ PDF/DOCX/… │   │ + images     │   │ rows+vec │
//! └────────────┘   └──────────────┘   └────┬─────┘
//!                                          │
//!                   ┌──────────────────────┤
//!                   ▼                      ▼
//!             ┌───────────┐         ┌────────────┐
//!             │ Retrieval │────────▶│  Answer    │
//!             │ (cosine)  │         │ + sources  │
//!             └───────────┘         └────────────┘
//! ```
//!
//! Embedding and generation calls go through an ordered model list with
//! failover on rate limits ([`provider`]). Ranking and the core types live
//! in the `docqa-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` |
//! | [`extract`] | Text and image extraction per file format |
//! | [`html`] | HTML text and image resolution |
//! | [`images`] | MIME and data URI helpers |
//! | [`provider`] | Model failover and the Gemini backend |
//! | [`describe`] | Image descriptions |
//! | [`ingest`] | The ingestion pipeline |
//! | [`answer`] | Answer assembly and the question round trip |
//! | [`documents`] | Listing and deleting documents |
//! | [`context`] | Caller identity |
//! | [`app`] | Service wiring |
//! | [`server`] | JSON HTTP server |

pub mod answer;
pub mod app;
pub mod config;
pub mod context;
pub mod db;
pub mod describe;
pub mod documents;
pub mod extract;
pub mod html;
pub mod images;
pub mod ingest;
pub mod migrate;
pub mod provider;
pub mod server;
pub mod sqlite_store;
