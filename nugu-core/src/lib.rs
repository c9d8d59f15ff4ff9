#![doc = "nugu-core: post local or remote files to Usenet without downloading them first."]

//! The pipeline lists a source through a [`contract::Lister`], renders a virtual
//! manifest of `procjson://` lines, encodes job options into posting engine
//! arguments, and supervises the engine while decoding progress from its log.
//!
//! # Usage
//! Build a [`post::Poster`] from collaborators and call [`post::Poster::post`] with a
//! [`options::JobOptions`] seeded from [`config::Defaults`].

pub mod archive;
pub mod config;
pub mod contract;
pub mod encoder;
pub mod error;
pub mod listing;
pub mod manifest;
pub mod options;
pub mod output;
pub mod post;
pub mod progress;
pub mod supervisor;

pub use error::{NuguError, Result};
