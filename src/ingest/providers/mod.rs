// src/ingest/providers/mod.rs
pub mod github_json;
