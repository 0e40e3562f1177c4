//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`PrismError`] separates failures into two families:
//!
//! - **Fatal** errors that abort the current draw or program creation and
//!   are surfaced to the caller: configuration defects in geometry data,
//!   shader compile/link failures, GPU initialization failures.
//! - **Recoverable** conditions (hit-testing unsupported topologies, missing
//!   context) that are logged and skipped by the public entry points.
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, PrismError>`.
//!
//! ```rust,ignore
//! use prism::errors::{PrismError, Result};
//!
//! fn draw() -> Result<()> {
//!     // Operations that may fail return Result
//!     Ok(())
//! }
//! ```

use std::fmt;

use thiserror::Error;

/// Shader stage a compile diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    /// A user-supplied module carrying both entry points.
    Combined,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
            Self::Combined => f.write_str("combined"),
        }
    }
}

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum PrismError {
    // ========================================================================
    // Scene & Geometry Configuration
    // ========================================================================
    /// Authoring or asset defect: empty geometry, bad index data, unsupported
    /// topology or index width. Aborts the current draw call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ========================================================================
    // Shader Program Errors
    // ========================================================================
    /// A shader stage failed to compile. Carries the compiler diagnostic.
    #[error("{stage} shader compile error:\n{log}")]
    ShaderCompile {
        /// The stage that failed
        stage: ShaderStage,
        /// Compiler diagnostic text
        log: String,
    },

    /// The compiled stages could not be linked into a program.
    #[error("Program link error:\n{log}")]
    ShaderLink {
        /// Linker diagnostic text
        log: String,
    },

    /// A shader template could not be rendered.
    #[error("Shader template error: {0}")]
    Template(#[from] minijinja::Error),

    // ========================================================================
    // Context & GPU Errors
    // ========================================================================
    /// No graphics context or no scene is bound to the renderer.
    #[error("Missing context: {0}")]
    MissingContext(&'static str),

    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    // ========================================================================
    // Recoverable
    // ========================================================================
    /// The requested operation is not implemented for this input.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl PrismError {
    /// Shorthand for building a [`PrismError::Configuration`].
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Alias for `Result<T, PrismError>`.
pub type Result<T> = std::result::Result<T, PrismError>;
