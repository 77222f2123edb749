//! Find and delete duplicate tracks in a music library.
//!
//! Core modules:
//! - [`grouper`] - Duplicate grouping and keep/delete selection
//! - [`similarity`] - Key normalization and fuzzy scoring
//! - [`track`] - The track record
//! - [`library`] - Music library client trait
//! - [`db`] - SQLite-backed library
//!
//! ### Supporting Modules
//!
//! - [`cache`] - Timestamped JSON cache of fetched tracks
//! - [`commands`] - Import, list, describe and dedupe drivers
//! - [`report`] - Group descriptions
//! - [`config`] - Data and cache directory management
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```
//! use tunedup::grouper::group;
//! use tunedup::track::Track;
//!
//! let tracks = vec![
//!     Track::new("1", "Song", "Artist", ""),
//!     Track::new("2", "Song", "Artist", "Album"),
//!     Track::new("3", "Another Song", "Someone Else", "Elsewhere"),
//! ];
//!
//! let groups = group(&tracks, 60.0)?;
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].keep.id, "2");
//! assert_eq!(groups[0].delete_ids(), vec!["1".to_string()]);
//! # Ok::<(), tunedup::error::GroupError>(())
//! ```
//!
//! ## Error Handling
//!
//! The grouper and the library client return typed errors
//! ([`error::GroupError`], [`error::LibraryError`]); the driver commands wrap
//! them in `anyhow::Error` with context.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod grouper;
pub mod library;
pub mod report;
pub mod similarity;
pub mod track;

pub use error::{GroupError, LibraryError};
pub use grouper::{group, DuplicateGroup, DuplicateGrouper};
pub use library::MusicLibrary;
pub use track::Track;
