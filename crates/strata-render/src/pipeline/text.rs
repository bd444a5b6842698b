use strata_core::alloc::ByteArena;
use strata_core::math::Vec2;
use strata_core::profiling::profile_function;

use crate::commands::TextCommand;
use crate::error::RenderError;
use crate::records::SpriteInstance;
use crate::resources::GlyphTable;

use super::{KindBatcher, check_resource};

impl KindBatcher<SpriteInstance> {
    /// Expand every text command into one record per visible glyph.
    ///
    /// Glyphs with no size (spaces) advance the pen without emitting a record.
    /// Characters missing from the font are skipped.
    pub fn prepare_text<'g>(
        &mut self,
        commands: &[TextCommand],
        text: &ByteArena,
        glyphs: &dyn Fn(u32) -> Option<&'g GlyphTable>,
    ) -> Result<(), RenderError> {
        profile_function!();
        self.sort(commands);
        self.batches.clear();

        let is_known = |slot: u32| glyphs(slot).is_some();
        for &index in &self.order {
            let command = &commands[index as usize];
            if !check_resource(self.kind, command.resource, &is_known) {
                continue;
            }
            let Some(table) = glyphs(command.resource) else {
                continue;
            };
            let Some(string) = text.str(command.shape.span) else {
                tracing::error!("Text command span {:?} is outside the text arena", command.shape.span);
                continue;
            };

            let run = &command.shape;
            let scale = if table.native_size() > 0.0 {
                run.size / table.native_size()
            } else {
                1.0
            };
            let color = run.color.to_array();
            let mut pen = run.position;

            for ch in string.chars() {
                if ch == '\n' {
                    pen.x = run.position.x;
                    pen.y += table.line_height() * scale;
                    continue;
                }
                let Some(glyph) = table.get(ch) else {
                    tracing::trace!("Glyph {:?} missing from font; skipped", ch);
                    continue;
                };
                if !glyph.is_empty() {
                    let size = Vec2::from(glyph.size) * scale;
                    let top_left = pen + Vec2::from(glyph.offset) * scale;
                    let record = SpriteInstance {
                        position: (top_left + size * 0.5).to_array(),
                        size: size.to_array(),
                        uv_min: glyph.uv_min,
                        uv_max: glyph.uv_max,
                        color,
                        rotation: 0.0,
                        depth: command.depth,
                        _pad: [0.0; 2],
                    };
                    self.batches.push_keyed(command.key(), record)?;
                }
                pen.x += glyph.advance * scale;
            }
        }

        self.finish_prepare();
        Ok(())
    }
}

/// Glyph quads sampling the red channel of a font atlas as coverage.
pub(super) const TEXT_SHADER: &str = r#"
struct View {
    view_proj: mat4x4<f32>,
}

struct Glyph {
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
var<storage, read> glyphs: array<Glyph>;

@group(2) @binding(0)
var t_atlas: texture_2d<f32>;
@group(2) @binding(1)
var s_atlas: sampler;

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

    let glyph = glyphs[vertex_index / 6u];
    let corner = corners[vertex_index % 6u];

    var out: VertexOutput;
    out.position = view.view_proj * vec4<f32>(glyph.position + corner * glyph.size, 0.0, 1.0);
    out.uv = mix(glyph.uv_min, glyph.uv_max, corner + vec2<f32>(0.5, 0.5));
    out.color = glyph.color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let coverage = textureSample(t_atlas, s_atlas, in.uv).r;
    return vec4<f32>(in.color.rgb, in.color.a * coverage);
}
"#;
