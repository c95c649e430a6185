//! Local media preview gallery: index an output directory, serve a paginated HTML
//! gallery, and build ZIP/TAR downloads of it in the background.

pub mod archive;
pub mod cli;
pub mod config;
pub mod http;
pub mod media;
pub mod server;

pub use server::{autostart, ServerHandle};
