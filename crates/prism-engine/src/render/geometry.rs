use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::RenderError;
use crate::device::RenderCtx;
use crate::paint::Color;

use super::VertexLayout;

/// One vertex: clip-space position and straight-alpha RGBA color.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x4  // color
    ];

    #[inline]
    pub const fn new(position: [f32; 3], color: Color) -> Self {
        Self {
            position,
            color: color.to_array(),
        }
    }

    /// Input layout matching the built-in triangle shaders.
    pub fn layout() -> VertexLayout {
        VertexLayout::new(std::mem::size_of::<Vertex>() as u64, Self::ATTRS)
    }
}

/// How a geometry buffer may be updated after creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    /// Written once at creation; immutable afterwards.
    Static,
    /// Fully rewritable each frame via [`GeometryBuffer::rewrite`].
    Dynamic,
}

/// GPU vertex buffer plus the CPU copy it was built from.
///
/// Vertex count is fixed for the lifetime of the buffer; a different topology
/// needs a new buffer.
pub struct GeometryBuffer {
    buffer: wgpu::Buffer,
    vertices: Vec<Vertex>,
    usage: BufferUsage,
}

impl GeometryBuffer {
    /// Creates a vertex buffer sized to `vertices` and fills it.
    pub fn upload(
        ctx: &RenderCtx<'_>,
        vertices: &[Vertex],
        usage: BufferUsage,
    ) -> Result<Self, RenderError> {
        if vertices.is_empty() {
            return Err(RenderError::InvalidUsage(
                "geometry buffer needs at least one vertex".into(),
            ));
        }

        let mut buffer_usage = wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC;
        if usage == BufferUsage::Dynamic {
            buffer_usage |= wgpu::BufferUsages::COPY_DST;
        }

        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(match usage {
                    BufferUsage::Static => "prism static vbo",
                    BufferUsage::Dynamic => "prism dynamic vbo",
                }),
                contents: bytemuck::cast_slice(vertices),
                usage: buffer_usage,
            });

        log::debug!("uploaded {} vertices ({usage:?})", vertices.len());

        Ok(Self {
            buffer,
            vertices: vertices.to_vec(),
            usage,
        })
    }

    /// Overwrites the full buffer contents.
    ///
    /// Discard semantics: no partial update, no read-back. The write lands
    /// before any draw submitted afterwards on `queue`.
    pub fn rewrite(&mut self, queue: &wgpu::Queue, vertices: &[Vertex]) -> Result<(), RenderError> {
        if self.usage == BufferUsage::Static {
            return Err(RenderError::InvalidUsage(
                "rewrite called on a static geometry buffer".into(),
            ));
        }
        if vertices.len() != self.vertices.len() {
            return Err(RenderError::InvalidUsage(format!(
                "rewrite with {} vertices into a buffer of {}",
                vertices.len(),
                self.vertices.len()
            )));
        }

        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(vertices));
        self.vertices.copy_from_slice(vertices);
        Ok(())
    }

    /// Binds the buffer to vertex slot `slot` of `pass`.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, slot: u32) {
        pass.set_vertex_buffer(slot, self.buffer.slice(..));
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Size of the GPU buffer in bytes.
    pub fn byte_len(&self) -> u64 {
        self.buffer.size()
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
