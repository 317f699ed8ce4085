use std::borrow::Cow;

use crate::device::RenderCtx;
use crate::{RenderError, ShaderStage};

use super::layout::{match_layout, vertex_inputs, VertexLayout};
use super::shaders;

/// WGSL source text plus the entry point to use from it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub source: Cow<'static, str>,
    pub entry_point: Cow<'static, str>,
}

impl ShaderSource {
    pub fn new(
        source: impl Into<Cow<'static, str>>,
        entry_point: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            source: source.into(),
            entry_point: entry_point.into(),
        }
    }

    /// Built-in colored-triangle vertex stage.
    pub fn triangle_vertex() -> Self {
        Self::new(shaders::TRIANGLE_VS, shaders::VS_ENTRY)
    }

    /// Built-in colored-triangle fragment stage.
    pub fn triangle_fragment() -> Self {
        Self::new(shaders::TRIANGLE_FS, shaders::FS_ENTRY)
    }
}

/// Compiled shader stages, the input layout and the render pipeline joining them.
///
/// The input layout is checked against the same parsed vertex module that
/// becomes the GPU shader module, so the pair cannot drift apart.
pub struct PipelineState {
    pipeline: wgpu::RenderPipeline,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    layout: VertexLayout,
    topology: wgpu::PrimitiveTopology,
}

impl PipelineState {
    /// Compiles both stages and builds the triangle-list pipeline.
    ///
    /// Fails with [`RenderError::ShaderCompile`] for parse/validation errors, a
    /// missing entry point, or stages that do not link against each other or
    /// the target format (reported against the fragment stage).
    /// [`RenderError::LayoutMismatch`] when `layout` does not line up with the
    /// vertex stage inputs.
    pub fn build(
        ctx: &RenderCtx<'_>,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
        layout: &VertexLayout,
    ) -> Result<Self, RenderError> {
        let vs = compile(ShaderStage::Vertex, vertex)?;
        let fs = compile(ShaderStage::Fragment, fragment)?;

        {
            let entry = find_entry(&vs, ShaderStage::Vertex, &vertex.entry_point)?;
            let inputs = vertex_inputs(&vs, entry)?;
            match_layout(&inputs, layout)?;
        }

        let vertex_module = create_module(ctx, ShaderStage::Vertex, vs)?;
        let fragment_module = create_module(ctx, ShaderStage::Fragment, fs)?;

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("prism pipeline layout"),
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        let topology = wgpu::PrimitiveTopology::TriangleList;

        // Stage linkage and target compatibility are only checked by wgpu.
        let scope = ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = ctx
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("prism pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: Some(vertex.entry_point.as_ref()),
                    compilation_options: Default::default(),
                    buffers: &[layout.buffer_layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: Some(fragment.entry_point.as_ref()),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: ctx.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },

                multiview_mask: None,
                cache: None,
            });
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(RenderError::ShaderCompile {
                stage: ShaderStage::Fragment,
                diagnostics: err.to_string(),
            });
        }

        log::debug!(
            "pipeline built: {} -> {} ({:?}, {}x MSAA)",
            vertex.entry_point,
            fragment.entry_point,
            ctx.format,
            ctx.sample_count
        );

        Ok(Self {
            pipeline,
            vertex_module,
            fragment_module,
            layout: layout.clone(),
            topology,
        })
    }

    /// Makes the pipeline (both stages + input layout) active on `pass`.
    ///
    /// Idempotent: binding again only replaces the same state.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
    }

    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex_module
    }

    pub fn fragment_module(&self) -> &wgpu::ShaderModule {
        &self.fragment_module
    }
}

/// Hands a validated module to wgpu, capturing backend validation errors.
fn create_module(
    ctx: &RenderCtx<'_>,
    stage: ShaderStage,
    module: naga::Module,
) -> Result<wgpu::ShaderModule, RenderError> {
    let label = format!("prism {stage} shader");
    let scope = ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
    let shader = ctx
        .device
        .create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        });

    match pollster::block_on(scope.pop()) {
        Some(err) => Err(RenderError::ShaderCompile {
            stage,
            diagnostics: err.to_string(),
        }),
        None => Ok(shader),
    }
}

/// Parses and validates one stage, and checks its entry point exists.
pub(crate) fn compile(stage: ShaderStage, src: &ShaderSource) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(&src.source).map_err(|e| {
        RenderError::ShaderCompile {
            stage,
            diagnostics: e.emit_to_string(&src.source),
        }
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| RenderError::ShaderCompile {
        stage,
        diagnostics: e.emit_to_string(&src.source),
    })?;

    find_entry(&module, stage, &src.entry_point)?;
    Ok(module)
}

fn find_entry<'m>(
    module: &'m naga::Module,
    stage: ShaderStage,
    name: &str,
) -> Result<&'m naga::EntryPoint, RenderError> {
    module
        .entry_points
        .iter()
        .find(|e| e.stage == stage.to_naga() && e.name == name)
        .ok_or_else(|| RenderError::ShaderCompile {
            stage,
            diagnostics: format!("no {stage} entry point named `{name}`"),
        })
}
