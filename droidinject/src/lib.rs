pub mod ir;

pub mod instrument;
pub use instrument::ListenerRegistry;

pub mod manifest;
pub use manifest::Manifest;

pub mod layout;

pub mod apktool;

pub mod package;

pub mod context;
pub use context::{Context, DefaultContext};

pub mod config;

pub mod errors;
pub use errors::{Error, Result};

pub mod command;

pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
