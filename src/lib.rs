//! Chirp API library.
//!
//! The core of a small social network backend: batched feed hydration, live
//! notification fan-out over server-sent events, and per-client rate limiting,
//! served over HTTP on top of a SQLite store.

// Raw strings hold SQL and JSON fixtures
#![allow(clippy::needless_raw_string_hashes)]

pub mod admission;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod feed;
pub mod maintenance;
pub mod notify;
pub mod service;
pub mod web;
