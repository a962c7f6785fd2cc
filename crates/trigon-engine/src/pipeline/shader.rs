use std::borrow::Cow;
use std::fmt;

use wgpu::naga;

use crate::error::{GfxError, Result};

/// Entry point every shader stage must export.
pub const ENTRY_POINT: &str = "main";

/// Pipeline stage a shader source is written for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderRole {
    Vertex,
    Fragment,
}

impl ShaderRole {
    pub fn stages(self) -> wgpu::ShaderStages {
        match self {
            Self::Vertex => wgpu::ShaderStages::VERTEX,
            Self::Fragment => wgpu::ShaderStages::FRAGMENT,
        }
    }

    pub(crate) fn naga_stage(self) -> naga::ShaderStage {
        match self {
            Self::Vertex => naga::ShaderStage::Vertex,
            Self::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        })
    }
}

/// Opaque WGSL text tagged with its role.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    role: ShaderRole,
    label: Cow<'static, str>,
    code: Cow<'static, str>,
}

impl ShaderSource {
    pub fn new(
        role: ShaderRole,
        label: impl Into<Cow<'static, str>>,
        code: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            role,
            label: label.into(),
            code: code.into(),
        }
    }

    pub fn vertex(label: impl Into<Cow<'static, str>>, code: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ShaderRole::Vertex, label, code)
    }

    pub fn fragment(
        label: impl Into<Cow<'static, str>>,
        code: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ShaderRole::Fragment, label, code)
    }

    pub fn role(&self) -> ShaderRole {
        self.role
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn entry_point(&self) -> &'static str {
        ENTRY_POINT
    }

    pub(crate) fn compile_error(&self, diagnostic: impl Into<String>) -> GfxError {
        GfxError::ShaderCompile {
            role: self.role,
            diagnostic: diagnostic.into(),
        }
    }
}

pub(crate) fn create_module(device: &wgpu::Device, source: &ShaderSource) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(source.label()),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.code().to_string())),
    })
}

/// Waits for the driver's compilation report and fails on the first error.
pub(crate) async fn check_compilation(
    module: &wgpu::ShaderModule,
    source: &ShaderSource,
) -> Result<()> {
    let info = module.get_compilation_info().await;

    for message in &info.messages {
        match message.message_type {
            wgpu::CompilationMessageType::Error => {
                let diagnostic = match &message.location {
                    Some(loc) => format!(
                        "{}:{}:{}: {}",
                        source.label(),
                        loc.line_number,
                        loc.line_position,
                        message.message
                    ),
                    None => format!("{}: {}", source.label(), message.message),
                };
                return Err(source.compile_error(diagnostic));
            }
            wgpu::CompilationMessageType::Warning => {
                log::warn!("{} shader `{}`: {}", source.role(), source.label(), message.message);
            }
            wgpu::CompilationMessageType::Info => {
                log::debug!("{} shader `{}`: {}", source.role(), source.label(), message.message);
            }
        }
    }

    Ok(())
}
