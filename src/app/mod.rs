//! Application - the frame loop tying window, resources, animations,
//! layout, focus and drawing together.
//!
//! One [`tick`](Application::tick) does, in order:
//!
//! 1. drain window events (keys go to the focus manager)
//! 2. step animations
//! 3. drain resource work within its time budget
//! 4. lay out if the tree or the viewport changed
//! 5. draw and present if anything is still dirty
//!
//! # Example
//!
//! ```ignore
//! use small_screen::{AppConfig, Application, Element};
//!
//! let mut app = Application::new(window, devices, AppConfig::default())?;
//! app.render(&Element::boxed().child(Element::text("hello")))?;
//! app.run()?; // blocks until stop() or close()
//! app.destroy();
//! ```

mod layout_manager;

pub use layout_manager::LayoutManager;

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use spark_signals::{Signal, signal};
use tracing::{debug, error, info};

use crate::animation::AnimationManager;
use crate::animation::AnimationScheduler;
use crate::error::{AppError, FocusError};
use crate::event::EventEmitter;
use crate::focus::FocusManager;
use crate::layout::LayoutTree;
use crate::platform::{PlatformEvent, Window};
use crate::reconciler::{Element, mount};
use crate::resource::{DEFAULT_BUDGET, Devices, FontSpec, ResourceManager, ResourceRef, SourceSpec};
use crate::view::{SharedResources, ViewId, ViewTree};

// =============================================================================
// Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Frames per second for [`Application::run`], 1..=60.
    pub fps: u32,
    /// Base directory for relative resource sources.
    pub resource_path: PathBuf,
    /// Resource work allowed per tick.
    pub resource_budget: Duration,
    /// Viewport used until the window reports a size.
    pub initial_width: f32,
    pub initial_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            resource_path: PathBuf::new(),
            resource_budget: DEFAULT_BUDGET,
            initial_width: 1280.0,
            initial_height: 720.0,
        }
    }
}

impl AppConfig {
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.clamp(1, 60);
        self
    }

    pub fn with_resource_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resource_path = path.into();
        self
    }

    pub fn with_resource_budget(mut self, budget: Duration) -> Self {
        self.resource_budget = budget;
        self
    }

    pub fn with_initial_size(mut self, width: f32, height: f32) -> Self {
        self.initial_width = width;
        self.initial_height = height;
        self
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.clamp(1, 60)))
    }
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A tick ran; milliseconds since the previous one.
    Frame(f32),
    /// `close` was requested. Emitted once.
    Closing,
}

/// Clonable handle that ends [`Application::run`] from inside callbacks.
#[derive(Debug, Clone)]
pub struct StopHandle(Rc<Cell<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.set(false);
    }

    pub fn is_running(&self) -> bool {
        self.0.get()
    }
}

// =============================================================================
// Application
// =============================================================================

pub struct Application {
    config: AppConfig,
    window: Box<dyn Window>,
    resources: SharedResources,
    animations: AnimationManager,
    tree: ViewTree,
    focus: FocusManager,
    layout: LayoutManager,
    events: EventEmitter<AppEvent>,
    width: Signal<f32>,
    height: Signal<f32>,
    fullscreen: Signal<bool>,
    attached: bool,
    closing: bool,
    destroyed: bool,
    running: Rc<Cell<bool>>,
}

impl Application {
    pub fn new(window: Box<dyn Window>, devices: Devices, config: AppConfig) -> Result<Self, AppError> {
        let resources = Rc::new(RefCell::new(
            ResourceManager::new(devices)
                .with_base_path(config.resource_path.clone())
                .with_budget(config.resource_budget),
        ));
        let tree = ViewTree::new(LayoutTree::shared(), resources.clone())?;

        let width = if window.width() > 0.0 { window.width() } else { config.initial_width };
        let height = if window.height() > 0.0 { window.height() } else { config.initial_height };
        let fullscreen = window.fullscreen();

        Ok(Self {
            config,
            window,
            resources,
            animations: AnimationManager::new(),
            tree,
            focus: FocusManager::new(),
            layout: LayoutManager::new(),
            events: EventEmitter::new(),
            width: signal(width),
            height: signal(height),
            fullscreen: signal(fullscreen),
            attached: false,
            closing: false,
            destroyed: false,
            running: Rc::new(Cell::new(false)),
        })
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Open the window, then let resources load onto the devices.
    pub fn attach(&mut self) -> Result<(), AppError> {
        if self.attached {
            return Err(AppError::AlreadyAttached);
        }
        self.window.attach()?;
        self.resources.borrow_mut().attach();
        self.attached = true;
        let root = self.tree.root();
        self.tree.mark_dirty(root);
        info!("application attached");
        Ok(())
    }

    /// Release device resources, then the window.
    pub fn detach(&mut self) -> Result<(), AppError> {
        if !self.attached {
            return Err(AppError::NotAttached);
        }
        self.resources.borrow_mut().detach();
        self.window.detach();
        self.attached = false;
        info!("application detached");
        Ok(())
    }

    /// Tear everything down. Later calls are no-ops.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.running.set(false);
        if self.attached {
            self.resources.borrow_mut().detach();
            self.window.detach();
            self.attached = false;
        }
        self.focus.clear_focus(&self.tree);
        if let Err(err) = self.tree.clear() {
            error!(error = %err, "failed to clear view tree");
        }
        self.resources.borrow_mut().destroy();
        self.animations.clear();
        self.events.clear();
        info!("application destroyed");
    }

    /// Attach if needed and mark the loop as running.
    pub fn start(&mut self) -> Result<(), AppError> {
        if !self.attached {
            self.attach()?;
        }
        self.running.set(true);
        Ok(())
    }

    pub fn stop(&self) {
        self.running.set(false);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Ask the application to shut down. The next tick destroys it.
    pub fn close(&mut self) {
        if self.closing {
            return;
        }
        self.closing = true;
        self.events.emit(&AppEvent::Closing);
    }

    /// Tick at the configured frame rate until stopped or closed.
    pub fn run(&mut self) -> Result<(), AppError> {
        self.start()?;
        let interval = self.config.frame_interval();
        let mut last = Instant::now();
        while self.is_running() {
            let now = Instant::now();
            let delta = now.duration_since(last).as_secs_f32() * 1000.0;
            last = now;

            if !self.tick(delta)? {
                break;
            }
            if let Some(rest) = interval.checked_sub(now.elapsed()) {
                thread::sleep(rest);
            }
        }
        Ok(())
    }

    /// Run one frame. Returns false once the application is gone.
    pub fn tick(&mut self, delta: f32) -> Result<bool, AppError> {
        if self.destroyed {
            return Ok(false);
        }
        let root = self.tree.root();

        for event in self.window.process_events() {
            match event {
                PlatformEvent::Key(key) => {
                    if key.is_press() {
                        self.focus.on_key_down(&self.tree, &key)?;
                    }
                }
                PlatformEvent::Resize { width, height } => {
                    debug!(width, height, "window resized");
                    self.width.set(width);
                    self.height.set(height);
                    self.tree.mark_dirty(root);
                }
                PlatformEvent::Fullscreen(fullscreen) => {
                    self.fullscreen.set(fullscreen);
                }
                PlatformEvent::Quit => self.close(),
            }
        }

        if self.closing {
            self.destroy();
            return Ok(false);
        }

        if self.animations.run(delta) {
            self.tree.mark_dirty(root);
        }
        if self.resources.borrow_mut().run() {
            self.tree.mark_dirty(root);
        }
        if self.layout.run(&mut self.tree, self.width.get(), self.height.get())? {
            self.tree.mark_dirty(root);
        }

        self.events.emit(&AppEvent::Frame(delta));

        if self.attached && self.tree.is_dirty(root) {
            self.tree.draw(self.window.context())?;
            self.window.present();
        }
        Ok(true)
    }

    // -------------------------------------------------------------------------
    // Scene
    // -------------------------------------------------------------------------

    /// Replace the scene under the root with `element`.
    pub fn render(&mut self, element: &Element) -> Result<ViewId, AppError> {
        self.tree.clear()?;
        self.focus.forget_destroyed(&self.tree);
        let root = self.tree.root();
        Ok(mount(&mut self.tree, root, element)?)
    }

    /// Focus the view carrying `id`. Returns whether focus moved.
    pub fn set_focus_by_id(&mut self, id: &str) -> Result<bool, AppError> {
        let view = self.tree.get_view_by_id(id).ok_or(FocusError::UnknownView)?;
        Ok(self.focus.set_focus(&self.tree, view)?)
    }

    pub fn focused_id(&self) -> Option<String> {
        let view = self.tree.get(self.focus.focused()?)?;
        view.id().map(str::to_string)
    }

    pub fn focus(&self) -> &FocusManager {
        &self.focus
    }

    pub fn focus_mut(&mut self) -> &mut FocusManager {
        &mut self.focus
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ViewTree {
        &mut self.tree
    }

    // -------------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------------

    pub fn add_image(&self, spec: impl Into<SourceSpec>) -> Result<ResourceRef, AppError> {
        Ok(self.resources.borrow_mut().add_image(spec)?)
    }

    pub fn add_font(&self, spec: FontSpec) -> Result<ResourceRef, AppError> {
        Ok(self.resources.borrow_mut().add_font(spec)?)
    }

    pub fn add_audio(&self, spec: impl Into<SourceSpec>) -> Result<ResourceRef, AppError> {
        Ok(self.resources.borrow_mut().add_audio(spec)?)
    }

    /// Play an attached audio resource.
    pub fn play(&self, id: &str) -> Result<(), AppError> {
        Ok(self.resources.borrow().play(id)?)
    }

    pub fn resources(&self) -> &SharedResources {
        &self.resources
    }

    // -------------------------------------------------------------------------
    // Animations and events
    // -------------------------------------------------------------------------

    pub fn animations(&self) -> AnimationScheduler {
        self.animations.scheduler()
    }

    pub fn events(&self) -> &EventEmitter<AppEvent> {
        &self.events
    }

    // -------------------------------------------------------------------------
    // Display state
    // -------------------------------------------------------------------------

    pub fn width(&self) -> f32 {
        self.width.get()
    }

    pub fn height(&self) -> f32 {
        self.height.get()
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen.get()
    }

    pub fn width_signal(&self) -> Signal<f32> {
        self.width.clone()
    }

    pub fn height_signal(&self) -> Signal<f32> {
        self.height.clone()
    }

    pub fn fullscreen_signal(&self) -> Signal<bool> {
        self.fullscreen.clone()
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        self.destroy();
    }
}
