use crate::commands::{Primitive, PrimitiveCommand};
use crate::error::RenderError;
use crate::records::{ShapeInstance, ShapeKind};

use super::KindBatcher;

impl KindBatcher<ShapeInstance> {
    pub fn prepare_primitives(
        &mut self,
        commands: &[PrimitiveCommand],
        is_known: &dyn Fn(u32) -> bool,
    ) -> Result<(), RenderError> {
        self.prepare_mapped(commands, is_known, |command| {
            shape_instance(&command.shape, command.depth)
        })
    }
}

fn shape_instance(primitive: &Primitive, depth: f32) -> ShapeInstance {
    match *primitive {
        Primitive::Quad {
            center,
            size,
            rotation,
            color,
        } => ShapeInstance {
            position: center.to_array(),
            extent: size.to_array(),
            color: color.to_array(),
            rotation,
            thickness: 0.0,
            depth,
            shape: ShapeKind::Quad as u32,
        },
        Primitive::Line {
            start,
            end,
            width,
            color,
        } => {
            let delta = end - start;
            ShapeInstance {
                position: ((start + end) * 0.5).to_array(),
                extent: [delta.length(), width],
                color: color.to_array(),
                rotation: delta.y.atan2(delta.x),
                thickness: width,
                depth,
                shape: ShapeKind::Line as u32,
            }
        }
        Primitive::Circle {
            center,
            radius,
            thickness,
            color,
        } => ShapeInstance {
            position: center.to_array(),
            extent: [radius * 2.0, radius * 2.0],
            color: color.to_array(),
            rotation: 0.0,
            thickness,
            depth,
            shape: ShapeKind::Circle as u32,
        },
    }
}

/// Quads, lines and circles. Circles are cut out with a distance test.
pub(super) const SHAPE_SHADER: &str = r#"
struct View {
    view_proj: mat4x4<f32>,
}

struct Shape {
    position: vec2<f32>,
    extent: vec2<f32>,
    color: vec4<f32>,
    rotation: f32,
    thickness: f32,
    depth: f32,
    shape: u32,
}

@group(0) @binding(0)
var<uniform> view: View;

@group(1) @binding(0)
var<storage, read> shapes: array<Shape>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) @interpolate(flat) shape: u32,
    @location(3) inner: f32,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, 0.5),
    );

    let shape = shapes[vertex_index / 6u];
    let corner = corners[vertex_index % 6u];

    let local = corner * shape.extent;
    let c = cos(shape.rotation);
    let s = sin(shape.rotation);
    let rotated = vec2<f32>(local.x * c - local.y * s, local.x * s + local.y * c);

    var out: VertexOutput;
    out.position = view.view_proj * vec4<f32>(shape.position + rotated, 0.0, 1.0);
    out.local = corner * 2.0;
    out.color = shape.color;
    out.shape = shape.shape;
    // Inner radius of a ring, in the same [-1, 1] space as `local`.
    out.inner = 0.0;
    if (shape.shape == 2u && shape.thickness > 0.0) {
        out.inner = max(1.0 - 2.0 * shape.thickness / max(shape.extent.x, 0.0001), 0.0);
    }
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    // Derivatives must be taken in uniform control flow.
    let dist = length(in.local);
    let edge = fwidth(dist);
    if (in.shape == 2u) {
        let outer = 1.0 - smoothstep(1.0 - edge, 1.0, dist);
        var alpha = outer;
        if (in.inner > 0.0) {
            alpha = alpha * smoothstep(in.inner - edge, in.inner, dist);
        }
        if (alpha <= 0.0) {
            discard;
        }
        return vec4<f32>(in.color.rgb, in.color.a * alpha);
    }
    return in.color;
}
"#;
