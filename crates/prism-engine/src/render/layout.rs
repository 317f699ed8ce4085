use crate::RenderError;

/// Vertex buffer layout: stride plus the attribute table bound to shader inputs.
///
/// Attributes are matched positionally against the vertex stage's `@location`
/// inputs sorted by location, so list them in location order.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub array_stride: wgpu::BufferAddress,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl VertexLayout {
    pub fn new(
        array_stride: wgpu::BufferAddress,
        attributes: impl Into<Vec<wgpu::VertexAttribute>>,
    ) -> Self {
        Self {
            array_stride,
            attributes: attributes.into(),
        }
    }

    pub fn buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ScalarClass {
    Float,
    Sint,
    Uint,
}

/// Shader-visible shape of one vertex input.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct InputType {
    class: ScalarClass,
    components: u32,
}

impl InputType {
    const fn new(class: ScalarClass, components: u32) -> Self {
        Self { class, components }
    }

    fn describe(self) -> String {
        let scalar = match self.class {
            ScalarClass::Float => "f32",
            ScalarClass::Sint => "i32",
            ScalarClass::Uint => "u32",
        };
        if self.components == 1 {
            scalar.to_string()
        } else {
            format!("vec{}<{scalar}>", self.components)
        }
    }
}

/// One `@location` input of a vertex entry point.
#[derive(Debug, Clone)]
pub(crate) struct ShaderInput {
    location: u32,
    ty: InputType,
    name: Option<String>,
}

/// Collects the `@location` inputs of `entry`, sorted by location.
///
/// Inputs may be plain arguments or members of a struct argument.
pub(crate) fn vertex_inputs(
    module: &naga::Module,
    entry: &naga::EntryPoint,
) -> Result<Vec<ShaderInput>, RenderError> {
    let mut inputs = Vec::new();

    for arg in &entry.function.arguments {
        match &arg.binding {
            Some(binding) => {
                if let Some(input) = located_input(module, binding, arg.ty, arg.name.clone())? {
                    inputs.push(input);
                }
            }
            None => {
                let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner else {
                    continue;
                };
                for member in members {
                    if let Some(binding) = &member.binding {
                        if let Some(input) =
                            located_input(module, binding, member.ty, member.name.clone())?
                        {
                            inputs.push(input);
                        }
                    }
                }
            }
        }
    }

    inputs.sort_by_key(|i| i.location);
    Ok(inputs)
}

fn located_input(
    module: &naga::Module,
    binding: &naga::Binding,
    ty: naga::Handle<naga::Type>,
    name: Option<String>,
) -> Result<Option<ShaderInput>, RenderError> {
    let naga::Binding::Location { location, .. } = binding else {
        return Ok(None);
    };

    let ty = match &module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) => scalar_class(scalar.kind).map(|c| InputType::new(c, 1)),
        naga::TypeInner::Vector { size, scalar } => {
            scalar_class(scalar.kind).map(|c| InputType::new(c, *size as u32))
        }
        _ => None,
    };

    let Some(ty) = ty else {
        return Err(RenderError::LayoutMismatch(format!(
            "vertex input at location {location} has a type that cannot be fed from a vertex buffer"
        )));
    };

    Ok(Some(ShaderInput {
        location: *location,
        ty,
        name,
    }))
}

fn scalar_class(kind: naga::ScalarKind) -> Option<ScalarClass> {
    match kind {
        naga::ScalarKind::Float => Some(ScalarClass::Float),
        naga::ScalarKind::Sint => Some(ScalarClass::Sint),
        naga::ScalarKind::Uint => Some(ScalarClass::Uint),
        _ => None,
    }
}

fn format_type(format: wgpu::VertexFormat) -> Option<InputType> {
    use wgpu::VertexFormat as F;
    use ScalarClass::{Float, Sint, Uint};

    let ty = match format {
        F::Float32 => InputType::new(Float, 1),
        F::Float32x2 | F::Float16x2 | F::Unorm8x2 | F::Snorm8x2 | F::Unorm16x2 | F::Snorm16x2 => {
            InputType::new(Float, 2)
        }
        F::Float32x3 => InputType::new(Float, 3),
        F::Float32x4
        | F::Float16x4
        | F::Unorm8x4
        | F::Snorm8x4
        | F::Unorm16x4
        | F::Snorm16x4
        | F::Unorm10_10_10_2 => InputType::new(Float, 4),
        F::Uint32 => InputType::new(Uint, 1),
        F::Uint32x2 | F::Uint8x2 | F::Uint16x2 => InputType::new(Uint, 2),
        F::Uint32x3 => InputType::new(Uint, 3),
        F::Uint32x4 | F::Uint8x4 | F::Uint16x4 => InputType::new(Uint, 4),
        F::Sint32 => InputType::new(Sint, 1),
        F::Sint32x2 | F::Sint8x2 | F::Sint16x2 => InputType::new(Sint, 2),
        F::Sint32x3 => InputType::new(Sint, 3),
        F::Sint32x4 | F::Sint8x4 | F::Sint16x4 => InputType::new(Sint, 4),
        _ => return None,
    };
    Some(ty)
}

/// Checks `layout` against the vertex stage inputs, position by position.
pub(crate) fn match_layout(
    inputs: &[ShaderInput],
    layout: &VertexLayout,
) -> Result<(), RenderError> {
    if inputs.len() != layout.attributes.len() {
        return Err(RenderError::LayoutMismatch(format!(
            "vertex stage expects {} inputs, layout declares {} attributes",
            inputs.len(),
            layout.attributes.len()
        )));
    }

    for (index, (input, attr)) in inputs.iter().zip(&layout.attributes).enumerate() {
        let label = input.name.as_deref().unwrap_or("<unnamed>");

        if attr.shader_location != input.location {
            return Err(RenderError::LayoutMismatch(format!(
                "attribute {index} targets location {}, vertex stage input `{label}` is at location {}",
                attr.shader_location, input.location
            )));
        }

        let Some(ty) = format_type(attr.format) else {
            return Err(RenderError::LayoutMismatch(format!(
                "attribute {index} uses unsupported format {:?}",
                attr.format
            )));
        };
        if ty != input.ty {
            return Err(RenderError::LayoutMismatch(format!(
                "attribute {index} ({:?}) feeds {}, vertex stage input `{label}` expects {}",
                attr.format,
                ty.describe(),
                input.ty.describe()
            )));
        }

        if attr.offset + attr.format.size() > layout.array_stride {
            return Err(RenderError::LayoutMismatch(format!(
                "attribute {index} ends at byte {}, past the {}-byte stride",
                attr.offset + attr.format.size(),
                layout.array_stride
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs_of(src: &str) -> Vec<ShaderInput> {
        let module = naga::front::wgsl::parse_str(src).expect("test shader parses");
        let entry = module
            .entry_points
            .iter()
            .find(|e| e.stage == naga::ShaderStage::Vertex)
            .expect("test shader has a vertex entry point");
        vertex_inputs(&module, entry).expect("inputs are vertex-compatible")
    }

    fn position_color_layout() -> VertexLayout {
        VertexLayout::new(
            28,
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4].to_vec(),
        )
    }

    const ARGS_VS: &str = r#"
        @vertex
        fn vs_main(@location(1) color: vec4<f32>, @location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
            return vec4<f32>(position, color.a);
        }
    "#;

    const STRUCT_VS: &str = r#"
        struct In {
            @location(0) position: vec3<f32>,
            @location(1) color: vec4<f32>,
            @builtin(vertex_index) index: u32,
        };
        @vertex
        fn vs_main(input: In) -> @builtin(position) vec4<f32> {
            return vec4<f32>(input.position, input.color.a);
        }
    "#;

    #[test]
    fn inputs_are_sorted_by_location() {
        let inputs = inputs_of(ARGS_VS);
        let locations: Vec<u32> = inputs.iter().map(|i| i.location).collect();
        assert_eq!(locations, vec![0, 1]);
    }

    #[test]
    fn struct_inputs_skip_builtins() {
        let inputs = inputs_of(STRUCT_VS);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].ty, InputType::new(ScalarClass::Float, 3));
        assert_eq!(inputs[1].ty, InputType::new(ScalarClass::Float, 4));
    }

    #[test]
    fn matching_layout_is_accepted() {
        assert!(match_layout(&inputs_of(ARGS_VS), &position_color_layout()).is_ok());
        assert!(match_layout(&inputs_of(STRUCT_VS), &position_color_layout()).is_ok());
    }

    #[test]
    fn attribute_count_mismatch_is_rejected() {
        let layout = VertexLayout::new(12, wgpu::vertex_attr_array![0 => Float32x3].to_vec());
        let err = match_layout(&inputs_of(ARGS_VS), &layout).unwrap_err();
        assert!(matches!(err, RenderError::LayoutMismatch(_)));
    }

    #[test]
    fn component_count_mismatch_is_rejected() {
        let layout = VertexLayout::new(
            24,
            wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4].to_vec(),
        );
        let err = match_layout(&inputs_of(ARGS_VS), &layout).unwrap_err();
        let RenderError::LayoutMismatch(msg) = err else {
            panic!("expected layout mismatch");
        };
        assert!(msg.contains("vec3<f32>"), "{msg}");
    }

    #[test]
    fn scalar_kind_mismatch_is_rejected() {
        let layout = VertexLayout::new(
            28,
            wgpu::vertex_attr_array![0 => Uint32x3, 1 => Float32x4].to_vec(),
        );
        assert!(matches!(
            match_layout(&inputs_of(ARGS_VS), &layout),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn out_of_order_locations_are_rejected() {
        let layout = VertexLayout::new(
            28,
            vec![
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 12,
                    shader_location: 1,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                },
            ],
        );
        assert!(matches!(
            match_layout(&inputs_of(ARGS_VS), &layout),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn attribute_past_stride_is_rejected() {
        let layout = VertexLayout::new(
            16,
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4].to_vec(),
        );
        assert!(matches!(
            match_layout(&inputs_of(ARGS_VS), &layout),
            Err(RenderError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn format_mapping_covers_common_formats() {
        assert_eq!(
            format_type(wgpu::VertexFormat::Unorm8x4),
            Some(InputType::new(ScalarClass::Float, 4))
        );
        assert_eq!(
            format_type(wgpu::VertexFormat::Sint32x2),
            Some(InputType::new(ScalarClass::Sint, 2))
        );
        assert_eq!(format_type(wgpu::VertexFormat::Float64x2), None);
    }
}
