use std::path::PathBuf;
use std::rc::Rc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::FutureExt;
use futures::future;

use crate::error::LoadError;
use crate::platform::{DecodedImage, GraphicsDevice, ImageInput, MediaLoader, TextureId};
use crate::types::Edges;

use super::source::{Source, SourceType};
use super::{EpochGuard, LoadFuture, LoadOutcome};

/// Decoded image state and, once attached, its texture.
#[derive(Debug)]
pub struct ImageResource {
    source: Source,
    width: u32,
    height: u32,
    aspect_ratio: f32,
    has_dimensions: bool,
    texture: Option<TextureId>,
    decoded: Option<DecodedImage>,
}

impl ImageResource {
    pub(super) fn new(source: Source) -> Self {
        Self {
            source,
            width: 0,
            height: 0,
            aspect_ratio: 0.0,
            has_dimensions: false,
            texture: None,
            decoded: None,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width over height, 0 when the height is 0.
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// True once a decode has reported the image size.
    pub fn has_dimensions(&self) -> bool {
        self.has_dimensions
    }

    pub fn texture(&self) -> Option<TextureId> {
        self.texture
    }

    pub fn cap_insets(&self) -> Option<Edges> {
        self.source.cap_insets
    }

    /// Start fetching and decoding. Remote sources re-check the guard between
    /// the fetch and the decode.
    pub(super) fn load(&self, loader: Rc<dyn MediaLoader>, guard: EpochGuard) -> LoadFuture {
        let input = match self.source.kind {
            SourceType::File => Ok(ImageInput::File(PathBuf::from(&self.source.uri))),
            SourceType::Base64 => BASE64
                .decode(self.source.data.as_deref().unwrap_or_default())
                .map(ImageInput::Bytes)
                .map_err(|e| LoadError::InvalidData(e.to_string())),
            SourceType::Utf8 => Ok(ImageInput::Utf8(self.source.data.clone().unwrap_or_default())),
            SourceType::Remote => {
                let url = self.source.uri.clone();
                return async move {
                    let bytes = match loader.fetch(&url).await {
                        Ok(bytes) => bytes,
                        Err(err) => return LoadOutcome::Failed(err),
                    };
                    if guard.is_stale() {
                        return LoadOutcome::Stale;
                    }
                    decode(loader, ImageInput::Bytes(bytes)).await
                }
                .boxed_local();
            }
        };

        match input {
            Ok(input) => decode(loader, input).boxed_local(),
            Err(err) => future::ready(LoadOutcome::Failed(err)).boxed_local(),
        }
    }

    pub(super) fn set_decoded(&mut self, image: DecodedImage) {
        self.width = image.width;
        self.height = image.height;
        self.aspect_ratio = if image.height > 0 {
            image.width as f32 / image.height as f32
        } else {
            0.0
        };
        self.has_dimensions = true;
        self.decoded = Some(image);
    }

    /// Upload the decoded pixels. The pixel buffer is released either way.
    pub(super) fn attach(&mut self, graphics: &mut dyn GraphicsDevice) -> Result<(), LoadError> {
        let decoded = self
            .decoded
            .take()
            .ok_or_else(|| LoadError::InvalidData("image has no decoded pixels".into()))?;
        self.texture = Some(graphics.create_texture(&decoded)?);
        Ok(())
    }

    pub(super) fn detach(&mut self, graphics: &mut dyn GraphicsDevice) {
        if let Some(texture) = self.texture.take() {
            graphics.destroy_texture(texture);
        }
        self.decoded = None;
    }

    pub(super) fn clear(&mut self) {
        self.decoded = None;
    }
}

async fn decode(loader: Rc<dyn MediaLoader>, input: ImageInput) -> LoadOutcome {
    match loader.load_image(input).await {
        Ok(image) => LoadOutcome::Image(image),
        Err(err) => LoadOutcome::Failed(err),
    }
}
