//! Command records appended by the simulation.
//!
//! Every record is a small `Copy` value: the shape description plus the
//! view, resource slot and depth that were current when it was appended.

use std::cmp::Ordering;

use strata_core::alloc::ArenaSpan;
use strata_core::math::Vec2;

use crate::color::Color;

/// Resource slot used by records that sample no caller texture.
pub const NO_RESOURCE: u32 = u32::MAX;

/// Partition key of a record: owning view first, then resource.
///
/// Records are batched together only when their keys are equal. Depth is not
/// part of the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey {
    pub view: u32,
    pub resource: u32,
}

impl PartitionKey {
    pub const fn new(view: u32, resource: u32) -> Self {
        Self { view, resource }
    }
}

/// A shape plus the state captured when it was appended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Command<T> {
    pub shape: T,
    pub view: u32,
    pub resource: u32,
    /// Depth layer the command was appended on; larger is nearer.
    pub layer: u32,
    /// `layer` mapped into `[0, 1)` for the GPU record.
    pub depth: f32,
}

impl<T> Command<T> {
    #[inline]
    pub fn key(&self) -> PartitionKey {
        PartitionKey::new(self.view, self.resource)
    }

    /// Batching order: partition key, then depth back to front.
    #[inline]
    pub fn draw_order(&self, other: &Self) -> Ordering {
        self.key()
            .cmp(&other.key())
            .then_with(|| self.layer.cmp(&other.layer))
    }
}

/// A textured quad in world or screen units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Center of the sprite.
    pub position: Vec2,
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    pub color: Color,
    pub rotation: f32,
}

impl Sprite {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            color: Color::WHITE,
            rotation: 0.0,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Sample a sub-rectangle of the texture.
    pub fn with_uv(mut self, uv_min: Vec2, uv_max: Vec2) -> Self {
        self.uv_min = uv_min;
        self.uv_max = uv_max;
        self
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }
}

/// Untextured primitives sharing one pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Quad {
        center: Vec2,
        size: Vec2,
        rotation: f32,
        color: Color,
    },
    Line {
        start: Vec2,
        end: Vec2,
        width: f32,
        color: Color,
    },
    Circle {
        center: Vec2,
        radius: f32,
        /// Ring thickness; `0.0` fills the disc.
        thickness: f32,
        color: Color,
    },
}

/// A run of text stored in the frame's text arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Text {
    pub span: ArenaSpan,
    /// Baseline origin of the first line.
    pub position: Vec2,
    /// Pixel size; glyph metrics are scaled from the font's native size.
    pub size: f32,
    pub color: Color,
}

/// A screen-space UI rectangle, optionally textured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiElement {
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    pub color: Color,
}

impl UiElement {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            color: Color::WHITE,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_uv(mut self, uv_min: Vec2, uv_max: Vec2) -> Self {
        self.uv_min = uv_min;
        self.uv_max = uv_max;
        self
    }
}

pub type SpriteCommand = Command<Sprite>;
pub type PrimitiveCommand = Command<Primitive>;
pub type TextCommand = Command<Text>;
pub type UiCommand = Command<UiElement>;
