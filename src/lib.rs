//! NovaNode note-taking library
//!
//! This library keeps notes and folders in memory and augments them with a
//! hosted generative model: summaries, action items, titles, cover images and
//! web-grounded answers collected in an assistant conversation.

mod cli;
mod codec;
mod config;
mod errors;
mod gateway;
mod helper;
mod note;
mod session;
mod store;
mod types;
mod workspace;
pub mod wire;

// Re-export key components
pub use cli::*;
pub use codec::*;
pub use config::*;
pub use errors::*;
pub use gateway::*;
pub use helper::*;
pub use note::*;
pub use session::*;
pub use store::*;
pub use types::*;
pub use workspace::*;
