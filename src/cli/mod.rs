//! Interactive terminal front end for the novanode workspace.
mod app;
mod args;

pub use app::*;
pub use args::*;
