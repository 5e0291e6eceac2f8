//! Configuration loaded from `.passvault.toml`.

pub mod settings;

pub use settings::{KdfChoice, Settings};
