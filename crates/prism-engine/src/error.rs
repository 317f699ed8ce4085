use std::fmt;

use thiserror::Error;

/// Shader stage a compile diagnostic belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Errors produced by the device/frame lifecycle.
///
/// Every variant is fatal at this scope: there is no retry or recovery path.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No compatible adapter, device, surface format or sample count.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// A shader stage failed to parse, validate or expose its entry point.
    #[error("{stage} shader failed to compile:\n{diagnostics}")]
    ShaderCompile {
        stage: ShaderStage,
        diagnostics: String,
    },

    /// Declared vertex attributes do not match the vertex stage inputs.
    #[error("input layout mismatch: {0}")]
    LayoutMismatch(String),

    /// Programming error, e.g. rewriting a static buffer.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),

    /// The device or its surface became unusable mid-loop.
    #[error("device lost: {0}")]
    DeviceLost(String),
}
