#![doc = "docsync-core: core pipeline for docsync."]

//! This crate holds everything between a source tree and a document store:
//! scanning, unit building, prompting, artifact parsing, block rendering and the
//! idempotent sync engine. The concrete model and store clients live in the
//! `docsync` CLI crate and are injected through the traits in [`contract`].
//!
//! # Usage
//! Build a [`config::SynchroniseConfig`], construct a [`contract::Generator`] and a
//! [`contract::DocumentStore`], and call [`synchronise::synchronise`].

pub mod artifact;
pub mod config;
pub mod contract;
pub mod render;
pub mod request;
pub mod scan;
pub mod sync;
pub mod synchronise;
pub mod units;
