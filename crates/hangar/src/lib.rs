//! # Hangar
//!
//! Publishes plugin versions and documentation pages to
//! [Hangar](https://hangar.papermc.io), Paper's plugin repository.
//!
//! ## Features
//!
//! - **Declarative publications**: versions, channels, changelogs,
//!   platforms and dependencies are read from `.hangar.toml`
//!   ([`config`]).
//! - **Token caching**: API keys are exchanged for short-lived JWTs once
//!   per endpoint and key, and renewed shortly before they expire
//!   ([`auth::TokenStore`]).
//! - **Per-operation outcomes**: every version upload and page sync ends in
//!   an [`types::OperationReport`]; one failure never aborts the others.
//! - **Concurrent page sync**: pages of a publication are synced in
//!   parallel, bounded by [`engine::RunOptions::jobs`].
//!
//! ## Pipeline
//!
//! 1. [`config::find_config`] / [`config::load_config_from_file`] read the
//!    config file.
//! 2. [`config::Config::resolve`] validates it into publications.
//! 3. [`engine::Engine::run_publish`] uploads a version per publication, and
//!    [`engine::Engine::run_sync`] pushes pages.
//! 4. [`report::write_report`] persists the resulting [`types::RunReport`].
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use hangar::engine::{Engine, Reporter, RunOptions};
//!
//! struct Stderr;
//!
//! impl Reporter for Stderr {
//!     fn info(&mut self, msg: &str) { eprintln!("[info] {msg}"); }
//!     fn warn(&mut self, msg: &str) { eprintln!("[warn] {msg}"); }
//!     fn error(&mut self, msg: &str) { eprintln!("[error] {msg}"); }
//! }
//!
//! let config = hangar::config::load_config(Path::new("."))?;
//! let targets = config.resolve(Path::new("."))?;
//! let engine = Engine::new(&RunOptions::default())?;
//! let report = engine.run_publish(&targets, &mut Stderr);
//! println!("{}", hangar::report::render_summary(&report));
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Publish and page-sync execution.
pub mod engine;

/// Run report persistence and rendering.
pub mod report;

/// API key resolution and token caching.
/// Re-exported from hangar-auth microcrate.
pub use hangar_auth as auth;

/// Authenticated request dispatch.
/// Re-exported from hangar-client microcrate.
pub use hangar_client as client;

/// Configuration file (`.hangar.toml`) loading and validation.
pub use hangar_config as config;

/// Domain types: publications, platforms, operation reports.
pub use hangar_types as types;
