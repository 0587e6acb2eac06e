//! Stub platform used by unit tests: counting devices, a scripted media
//! loader, a recording rendering context and a scripted window.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, LoadError};
use crate::layout::{CodepointMetrics, FontSample, LayoutTree};
use crate::platform::{
    AudioDevice, DecodedAudio, DecodedImage, GlyphQuad, GraphicsDevice, ImageInput, MediaLoader, PlatformEvent,
    RenderingContext, SampleId, TextureId, Window,
};
use crate::resource::{Devices, FontSpec, ResourceManager};
use crate::style::Style;
use crate::types::{Edges, Rect};
use crate::view::ViewTree;

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Devices
// =============================================================================

#[derive(Debug, Default)]
pub struct StubGraphics {
    /// Fail the next texture upload.
    pub fail_next: bool,
    pub created: Vec<TextureId>,
    pub destroyed: Vec<TextureId>,
    next: u64,
}

impl StubGraphics {
    fn upload(&mut self) -> Result<TextureId, LoadError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(LoadError::Device("upload failed".into()));
        }
        self.next += 1;
        let id = TextureId(self.next);
        self.created.push(id);
        Ok(id)
    }
}

impl GraphicsDevice for StubGraphics {
    fn create_texture(&mut self, _image: &DecodedImage) -> Result<TextureId, LoadError> {
        self.upload()
    }

    fn create_font_texture(&mut self, _sample: &FontSample) -> Result<TextureId, LoadError> {
        self.upload()
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.destroyed.push(texture);
    }
}

#[derive(Debug, Default)]
pub struct StubAudio {
    pub played: Vec<SampleId>,
    next: u64,
}

impl AudioDevice for StubAudio {
    fn create_sample(&mut self, _audio: &DecodedAudio) -> Result<SampleId, LoadError> {
        self.next += 1;
        Ok(SampleId(self.next))
    }

    fn destroy_sample(&mut self, _sample: SampleId) {}

    fn play(&mut self, sample: SampleId) {
        self.played.push(sample);
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Answers immediately unless a key was deferred. Keys containing
/// "missing" fail.
///
/// Call keys: the file path, `bytes:<len>`, `utf8:<text>` or `fetch:<url>`.
#[derive(Default)]
pub struct ScriptedLoader {
    calls: RefCell<Vec<String>>,
    font_calls: Cell<usize>,
    deferred: RefCell<HashSet<String>>,
    pending: RefCell<HashMap<String, oneshot::Sender<()>>>,
}

impl ScriptedLoader {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn font_calls(&self) -> usize {
        self.font_calls.get()
    }

    /// Hold the answer for `key` until [`resolve`](Self::resolve).
    pub fn defer(&self, key: &str) {
        self.deferred.borrow_mut().insert(key.to_string());
    }

    pub fn resolve(&self, key: &str) {
        self.deferred.borrow_mut().remove(key);
        if let Some(tx) = self.pending.borrow_mut().remove(key) {
            let _ = tx.send(());
        }
    }

    fn answer<T: 'static>(&self, key: String, value: Result<T, LoadError>) -> LocalBoxFuture<'static, Result<T, LoadError>> {
        self.calls.borrow_mut().push(key.clone());
        let value = if key.contains("missing") {
            Err(LoadError::Io(format!("{key} not found")))
        } else {
            value
        };
        if self.deferred.borrow().contains(&key) {
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().insert(key, tx);
            return async move {
                rx.await.map_err(|_| LoadError::Io("cancelled".into()))?;
                value
            }
            .boxed_local();
        }
        futures::future::ready(value).boxed_local()
    }
}

impl MediaLoader for ScriptedLoader {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, LoadError>> {
        self.answer(format!("fetch:{url}"), Ok(vec![1, 2, 3]))
    }

    fn load_image(&self, input: ImageInput) -> LocalBoxFuture<'static, Result<DecodedImage, LoadError>> {
        let key = match &input {
            ImageInput::File(path) => path.display().to_string(),
            ImageInput::Bytes(bytes) => format!("bytes:{}", bytes.len()),
            ImageInput::Utf8(text) => format!("utf8:{text}"),
        };
        let image = DecodedImage {
            width: 64,
            height: 32,
            pixels: vec![0; 64 * 32 * 4],
        };
        self.answer(key, Ok(image))
    }

    fn load_font_sample(&self, spec: &FontSpec) -> LocalBoxFuture<'static, Result<FontSample, LoadError>> {
        self.font_calls.set(self.font_calls.get() + 1);
        let sample = mono_sample(spec.size);
        let key = spec.key();
        let value = if key.contains("missing") {
            Err(LoadError::Io(format!("{key} not found")))
        } else {
            Ok(sample)
        };
        futures::future::ready(value).boxed_local()
    }

    fn load_audio(&self, path: &Path) -> LocalBoxFuture<'static, Result<DecodedAudio, LoadError>> {
        self.answer(path.display().to_string(), Ok(DecodedAudio { data: vec![0; 16] }))
    }
}

/// Monospace sample covering printable ASCII, every glyph `size * 0.6` wide.
pub fn mono_sample(size: f32) -> FontSample {
    let advance = (size * 0.6).round().max(1.0);
    let line_height = (size * 1.2).round().max(1.0);
    let mut sample = FontSample::new(size, line_height);
    for (i, c) in (' '..='~').enumerate() {
        sample.insert_glyph(
            c,
            CodepointMetrics {
                source: Rect::new(i as f32 * advance, 0.0, advance, line_height),
                dest_width: advance,
                dest_height: line_height,
                x_offset: 0.0,
                y_offset: 0.0,
                x_advance: advance,
            },
        );
    }
    sample
}

// =============================================================================
// Fixtures
// =============================================================================

pub struct TestDevices {
    pub graphics: Rc<RefCell<StubGraphics>>,
    pub audio: Rc<RefCell<StubAudio>>,
    pub loader: Rc<ScriptedLoader>,
}

impl TestDevices {
    pub fn devices(&self) -> Devices {
        Devices {
            graphics: self.graphics.clone(),
            audio: Some(self.audio.clone()),
            loader: self.loader.clone(),
        }
    }
}

pub fn test_devices() -> TestDevices {
    TestDevices {
        graphics: Rc::new(RefCell::new(StubGraphics::default())),
        audio: Rc::new(RefCell::new(StubAudio::default())),
        loader: Rc::new(ScriptedLoader::default()),
    }
}

/// Empty view tree over stub devices, resources resolved without a base path.
pub fn test_tree() -> (ViewTree, TestDevices) {
    let devices = test_devices();
    let resources = Rc::new(RefCell::new(ResourceManager::new(devices.devices())));
    let tree = ViewTree::new(LayoutTree::shared(), resources).unwrap();
    (tree, devices)
}

// =============================================================================
// Rendering
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    PushStyle,
    PopStyle,
    PushClip(Rect),
    PopClip,
    FillRect(Rect),
    FillRoundedRect(Rect, f32),
    Border(Rect, Edges),
    RoundedBorder(Rect, f32, f32),
    Blit(TextureId, Rect),
    BlitCapInsets(TextureId, Edges, Rect),
    /// Texture and glyph count.
    GlyphRun(TextureId, usize),
}

#[derive(Debug, Default)]
pub struct RecordingContext {
    pub ops: Vec<DrawOp>,
}

impl RenderingContext for RecordingContext {
    fn push_style(&mut self, _style: &Style) {
        self.ops.push(DrawOp::PushStyle);
    }

    fn pop_style(&mut self) {
        self.ops.push(DrawOp::PopStyle);
    }

    fn push_clip_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::PushClip(rect));
    }

    fn pop_clip_rect(&mut self) {
        self.ops.push(DrawOp::PopClip);
    }

    fn fill_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::FillRect(rect));
    }

    fn fill_rounded_rect(&mut self, rect: Rect, radius: f32) {
        self.ops.push(DrawOp::FillRoundedRect(rect, radius));
    }

    fn border(&mut self, rect: Rect, widths: Edges) {
        self.ops.push(DrawOp::Border(rect, widths));
    }

    fn rounded_border(&mut self, rect: Rect, radius: f32, width: f32) {
        self.ops.push(DrawOp::RoundedBorder(rect, radius, width));
    }

    fn blit(&mut self, texture: TextureId, dest: Rect) {
        self.ops.push(DrawOp::Blit(texture, dest));
    }

    fn blit_cap_insets(&mut self, texture: TextureId, cap_insets: Edges, dest: Rect) {
        self.ops.push(DrawOp::BlitCapInsets(texture, cap_insets, dest));
    }

    fn draw_glyph_run(&mut self, texture: TextureId, glyphs: &[GlyphQuad]) {
        self.ops.push(DrawOp::GlyphRun(texture, glyphs.len()));
    }
}

// =============================================================================
// Window
// =============================================================================

/// Shared view into a [`StubWindow`] after it moved into an application.
#[derive(Clone, Default)]
pub struct WindowHandle {
    pub events: Rc<RefCell<Vec<PlatformEvent>>>,
    /// Draw ops of each presented frame.
    pub frames: Rc<RefCell<Vec<Vec<DrawOp>>>>,
    pub attaches: Rc<Cell<u32>>,
    pub detaches: Rc<Cell<u32>>,
}

impl WindowHandle {
    pub fn push(&self, event: PlatformEvent) {
        self.events.borrow_mut().push(event);
    }
}

pub struct StubWindow {
    width: f32,
    height: f32,
    context: RecordingContext,
    handle: WindowHandle,
}

impl StubWindow {
    pub fn new(width: f32, height: f32) -> (Self, WindowHandle) {
        let handle = WindowHandle::default();
        let window = Self {
            width,
            height,
            context: RecordingContext::default(),
            handle: handle.clone(),
        };
        (window, handle)
    }
}

impl Window for StubWindow {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn fullscreen(&self) -> bool {
        false
    }

    fn attach(&mut self) -> Result<(), AppError> {
        self.handle.attaches.set(self.handle.attaches.get() + 1);
        Ok(())
    }

    fn detach(&mut self) {
        self.handle.detaches.set(self.handle.detaches.get() + 1);
    }

    fn process_events(&mut self) -> Vec<PlatformEvent> {
        std::mem::take(&mut *self.handle.events.borrow_mut())
    }

    fn context(&mut self) -> &mut dyn RenderingContext {
        &mut self.context
    }

    fn present(&mut self) {
        let ops = std::mem::take(&mut self.context.ops);
        self.handle.frames.borrow_mut().push(ops);
    }
}
