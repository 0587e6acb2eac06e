use std::fmt;
use std::rc::Rc;

use futures::FutureExt;

use crate::error::LoadError;
use crate::layout::FontSample;
use crate::platform::{GraphicsDevice, MediaLoader, TextureId};
use crate::style::RenderProps;
use crate::types::{FontStyle, FontWeight};

use super::{LoadFuture, LoadOutcome};

/// Font face at a pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub style: FontStyle,
    pub weight: FontWeight,
    pub size: f32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            style: FontStyle::Normal,
            weight: FontWeight::Normal,
            size,
        }
    }

    pub fn with_style(mut self, style: FontStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }

    /// Font spec from text style props; needs a family and a size.
    pub fn from_props(props: &RenderProps) -> Option<Self> {
        let family = props.font_family.as_ref()?;
        let size = props.font_size?;
        Some(Self {
            family: family.clone(),
            style: props.font_style,
            weight: props.font_weight,
            size,
        })
    }

    /// Resource key: `family-style-weight-size`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.family,
            self.style.keyword(),
            self.weight.keyword(),
            self.size
        )
    }
}

#[derive(Debug)]
pub struct FontResource {
    spec: FontSpec,
    sample: Option<Rc<FontSample>>,
    texture: Option<TextureId>,
}

impl FontResource {
    pub(super) fn new(spec: FontSpec) -> Self {
        Self {
            spec,
            sample: None,
            texture: None,
        }
    }

    pub fn spec(&self) -> &FontSpec {
        &self.spec
    }

    /// Glyph metrics, kept across detach so a reattach skips the load.
    pub fn sample(&self) -> Option<&Rc<FontSample>> {
        self.sample.as_ref()
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub(super) fn has_sample(&self) -> bool {
        self.sample.is_some()
    }

    pub(super) fn load(&self, loader: Rc<dyn MediaLoader>) -> LoadFuture {
        loader
            .load_font_sample(&self.spec)
            .map(|result| match result {
                Ok(sample) => LoadOutcome::Font(sample),
                Err(err) => LoadOutcome::Failed(err),
            })
            .boxed_local()
    }

    pub(super) fn set_sample(&mut self, sample: FontSample) {
        self.sample = Some(Rc::new(sample));
    }

    pub(super) fn attach(&mut self, graphics: &mut dyn GraphicsDevice) -> Result<(), LoadError> {
        let sample = self
            .sample
            .as_ref()
            .ok_or_else(|| LoadError::InvalidData("font has no sample".into()))?;
        self.texture = Some(graphics.create_font_texture(sample)?);
        Ok(())
    }

    pub(super) fn detach(&mut self, graphics: &mut dyn GraphicsDevice) {
        if let Some(texture) = self.texture.take() {
            graphics.destroy_texture(texture);
        }
    }
}
