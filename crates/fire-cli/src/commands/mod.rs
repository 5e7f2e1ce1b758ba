//! CLI command implementations.
//!
//! Each submodule implements a group of CLI commands:
//! - [`generate`] - Mesh generation
//! - [`keys`] - Key generation and derivation
//! - [`convert`] - Conversion between the JSON and `wg-quick` forms

pub mod convert;
pub mod generate;
pub mod keys;

pub use convert::{ParseCommand, RenderCommand};
pub use generate::GenerateCommand;
pub use keys::KeyCommand;
