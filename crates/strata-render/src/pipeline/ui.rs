use crate::commands::UiCommand;
use crate::error::RenderError;
use crate::records::SpriteInstance;

use super::KindBatcher;

impl KindBatcher<SpriteInstance> {
    /// UI elements share the sprite shader; positions are top-left corners.
    pub fn prepare_ui(
        &mut self,
        commands: &[UiCommand],
        is_known: &dyn Fn(u32) -> bool,
    ) -> Result<(), RenderError> {
        self.prepare_mapped(commands, is_known, |command| {
            let element = &command.shape;
            SpriteInstance {
                position: (element.position + element.size * 0.5).to_array(),
                size: element.size.to_array(),
                uv_min: element.uv_min.to_array(),
                uv_max: element.uv_max.to_array(),
                color: element.color.to_array(),
                rotation: 0.0,
                depth: command.depth,
                _pad: [0.0; 2],
            }
        })
    }
}
