use crate::commands::SpriteCommand;
use crate::error::RenderError;
use crate::records::SpriteInstance;

use super::KindBatcher;

impl KindBatcher<SpriteInstance> {
    pub fn prepare_sprites(
        &mut self,
        commands: &[SpriteCommand],
        is_known: &dyn Fn(u32) -> bool,
    ) -> Result<(), RenderError> {
        self.prepare_mapped(commands, is_known, |command| {
            let sprite = &command.shape;
            SpriteInstance {
                position: sprite.position.to_array(),
                size: sprite.size.to_array(),
                uv_min: sprite.uv_min.to_array(),
                uv_max: sprite.uv_max.to_array(),
                color: sprite.color.to_array(),
                rotation: sprite.rotation,
                depth: command.depth,
                _pad: [0.0; 2],
            }
        })
    }
}

/// Textured quads pulled from a storage buffer, six vertices per record.
pub(super) const SPRITE_SHADER: &str = r#"
struct View {
    view_proj: mat4x4<f32>,
}

struct Sprite {
    position: vec2<f32>,
    size: vec2<f32>,
    uv_min: vec2<f32>,
    uv_max: vec2<f32>,
    color: vec4<f32>,
    rotation: f32,
    depth: f32,
    _pad: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> view: View;

@group(1) @binding(0)
var<storage, read> sprites: array<Sprite>;

@group(2) @binding(0)
var t_color: texture_2d<f32>;
@group(2) @binding(1)
var s_color: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
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

    let sprite = sprites[vertex_index / 6u];
    let corner = corners[vertex_index % 6u];

    let local = corner * sprite.size;
    let c = cos(sprite.rotation);
    let s = sin(sprite.rotation);
    let rotated = vec2<f32>(local.x * c - local.y * s, local.x * s + local.y * c);

    var out: VertexOutput;
    out.position = view.view_proj * vec4<f32>(sprite.position + rotated, 0.0, 1.0);
    out.uv = mix(sprite.uv_min, sprite.uv_max, corner + vec2<f32>(0.5, 0.5));
    out.color = sprite.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(t_color, s_color, in.uv) * in.color;
}
"#;
