//! Formulite: recognize math formulas in images through cloud OCR services
//! and turn the result into LaTeX, HTML previews, and stored settings.

pub mod config;
pub mod crypto;
pub mod error;
pub mod export;
pub mod recognition;
pub mod settings;

pub use error::{FormuliteError, Result};
