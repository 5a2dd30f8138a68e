//! Precomputed, inheritance-merged runtime configuration for storefront
//! themes.
//!
//! [`application::theme::RuntimeConfigService`] is the entry point: it
//! serves runtime configs from an in-process memo ([`cache`]) backed by a
//! durable store ([`infra::db`] or [`infra::memory`]), and regenerates them
//! from theme descriptors and manifests when missing or stale.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
