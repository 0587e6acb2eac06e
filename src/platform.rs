//! Contracts consumed from the native platform: graphics and audio devices,
//! media decoding, the rendering context and the window event pump.
//!
//! Nothing here is implemented by the crate. Backends plug in through these
//! traits and the engine only ever talks to them.

use std::path::{Path, PathBuf};

use futures::future::LocalBoxFuture;

use crate::error::{AppError, LoadError};
use crate::input::KeyEvent;
use crate::layout::FontSample;
use crate::resource::FontSpec;
use crate::style::Style;
use crate::types::{Edges, Rect};

/// Device handle for an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Device handle for an uploaded audio sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

/// Pixel buffer produced by the image decoder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Audio buffer produced by the audio decoder.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedAudio {
    pub data: Vec<u8>,
}

/// What to hand the image decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    File(PathBuf),
    Bytes(Vec<u8>),
    /// Inline text content such as SVG markup.
    Utf8(String),
}

pub trait GraphicsDevice {
    fn create_texture(&mut self, image: &DecodedImage) -> Result<TextureId, LoadError>;
    fn create_font_texture(&mut self, sample: &FontSample) -> Result<TextureId, LoadError>;
    fn destroy_texture(&mut self, texture: TextureId);
}

pub trait AudioDevice {
    fn create_sample(&mut self, audio: &DecodedAudio) -> Result<SampleId, LoadError>;
    fn destroy_sample(&mut self, sample: SampleId);
    fn play(&mut self, sample: SampleId);
}

/// Asynchronous decode services. Futures must own everything they touch.
pub trait MediaLoader {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>>;
    fn load_image(&self, input: ImageInput) -> LocalBoxFuture<'static, Result<DecodedImage, LoadError>>;
    fn load_font_sample(&self, spec: &FontSpec)
    -> LocalBoxFuture<'static, Result<FontSample, LoadError>>;
    fn load_audio(&self, path: &Path) -> LocalBoxFuture<'static, Result<DecodedAudio, LoadError>>;
}

/// One glyph copied from the font texture onto the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphQuad {
    pub source: Rect,
    pub dest: Rect,
}

/// Immediate-mode drawing surface. Coordinates are absolute.
pub trait RenderingContext {
    /// Make `style` the current paint state (colors, opacity).
    fn push_style(&mut self, style: &Style);
    fn pop_style(&mut self);
    fn push_clip_rect(&mut self, rect: Rect);
    fn pop_clip_rect(&mut self);
    fn fill_rect(&mut self, rect: Rect);
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32);
    fn border(&mut self, rect: Rect, widths: Edges);
    fn rounded_border(&mut self, rect: Rect, radius: f32, width: f32);
    fn blit(&mut self, texture: TextureId, dest: Rect);
    fn blit_cap_insets(&mut self, texture: TextureId, cap_insets: Edges, dest: Rect);
    fn draw_glyph_run(&mut self, texture: TextureId, glyphs: &[GlyphQuad]);
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    Key(KeyEvent),
    Resize { width: f32, height: f32 },
    Fullscreen(bool),
    Quit,
}

/// Native window: event pump, surface and size.
pub trait Window {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    fn fullscreen(&self) -> bool;
    fn attach(&mut self) -> Result<(), AppError>;
    fn detach(&mut self);
    fn process_events(&mut self) -> Vec<PlatformEvent>;
    fn context(&mut self) -> &mut dyn RenderingContext;
    fn present(&mut self);
}
