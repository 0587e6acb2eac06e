//! Resource lifecycle: images, fonts and audio.
//!
//! Every resource walks a strict state machine (see [`ResourceState`]) and is
//! reference counted inside a [`ResourceManager`]. Loads are asynchronous and
//! polled from [`ResourceManager::run`]; attaches upload to the device and are
//! processed from a time-boxed work queue so a burst of new media cannot stall
//! a frame.
//!
//! Async results are guarded by an epoch counter: detaching or releasing a
//! resource bumps its epoch, and a completion carrying an older epoch is
//! discarded without touching the resource.

mod audio;
mod font;
mod image;
mod source;
mod state;

pub use audio::AudioResource;
pub use font::{FontResource, FontSpec};
pub use image::ImageResource;
pub use source::{
    DataUri, Source, SourcePolicy, SourceSpec, SourceType, parse_data_uri, to_source,
};
pub use state::ResourceState;

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::LocalBoxFuture;
use futures::stream::FuturesUnordered;
use futures::task::noop_waker_ref;
use futures::{FutureExt, StreamExt};
use indexmap::IndexMap;
use tracing::{debug, error, trace, warn};

use crate::error::{LoadError, ResourceError, StateTransitionError};
use crate::event::EventEmitter;
use crate::layout::FontSample;
use crate::platform::{AudioDevice, DecodedAudio, DecodedImage, GraphicsDevice, MediaLoader};

/// Default per-run work budget.
pub const DEFAULT_BUDGET: Duration = Duration::from_millis(10);

// =============================================================================
// Devices
// =============================================================================

/// The platform services resources load through and attach to.
#[derive(Clone)]
pub struct Devices {
    pub graphics: Rc<RefCell<dyn GraphicsDevice>>,
    pub audio: Option<Rc<RefCell<dyn AudioDevice>>>,
    pub loader: Rc<dyn MediaLoader>,
}

// =============================================================================
// Resource
// =============================================================================

/// Notifications emitted on state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceEvent {
    Loaded,
    Attached,
    Error(String),
    Detached,
}

#[derive(Debug)]
pub enum ResourceKind {
    Image(ImageResource),
    Font(FontResource),
    Audio(AudioResource),
}

pub type ResourceRef = Rc<RefCell<Resource>>;

pub(crate) type LoadFuture = LocalBoxFuture<'static, LoadOutcome>;

pub(crate) enum LoadOutcome {
    Image(DecodedImage),
    Font(FontSample),
    Audio(DecodedAudio),
    Failed(LoadError),
    /// The owning resource moved on while the load was in flight.
    Stale,
}

/// Lets an in-flight load notice that its resource was reset.
#[derive(Clone)]
pub(crate) struct EpochGuard {
    cell: Rc<Cell<u64>>,
    epoch: u64,
}

impl EpochGuard {
    pub(crate) fn is_stale(&self) -> bool {
        self.cell.get() != self.epoch
    }
}

enum LoadStart {
    Pending(u64, LoadFuture),
    Ready,
}

pub struct Resource {
    id: String,
    state: ResourceState,
    ref_count: u32,
    kind: ResourceKind,
    events: Rc<EventEmitter<ResourceEvent>>,
    pending: Vec<ResourceEvent>,
    epoch: Rc<Cell<u64>>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("ref_count", &self.ref_count)
            .finish()
    }
}

impl Resource {
    fn new(id: String, kind: ResourceKind) -> Self {
        Self {
            id,
            state: ResourceState::Init,
            ref_count: 1,
            kind,
            events: Rc::new(EventEmitter::new()),
            pending: Vec::new(),
            epoch: Rc::new(Cell::new(0)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn is_attached(&self) -> bool {
        self.state == ResourceState::Attached
    }

    pub fn has_error(&self) -> bool {
        self.state == ResourceState::Error
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn as_image(&self) -> Option<&ImageResource> {
        match &self.kind {
            ResourceKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&FontResource> {
        match &self.kind {
            ResourceKind::Font(font) => Some(font),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioResource> {
        match &self.kind {
            ResourceKind::Audio(audio) => Some(audio),
            _ => None,
        }
    }

    /// Event emitter for this resource. Events fire after the resource's
    /// borrow is released, so listeners may inspect it.
    pub fn events(&self) -> Rc<EventEmitter<ResourceEvent>> {
        self.events.clone()
    }

    fn transition(&mut self, to: ResourceState) -> Result<(), StateTransitionError> {
        self.state.check(&self.id, to)?;
        let from = self.state;
        self.state = to;

        match to {
            ResourceState::Loaded => self.pending.push(ResourceEvent::Loaded),
            ResourceState::Attached => self.pending.push(ResourceEvent::Attached),
            ResourceState::Init | ResourceState::Detached if from == ResourceState::Attached => {
                self.pending.push(ResourceEvent::Detached)
            }
            _ => {}
        }
        Ok(())
    }

    fn fail(&mut self, err: &LoadError) -> Result<(), StateTransitionError> {
        self.transition(ResourceState::Error)?;
        self.pending.push(ResourceEvent::Error(err.to_string()));
        match &mut self.kind {
            ResourceKind::Image(image) => image.clear(),
            ResourceKind::Audio(audio) => audio.clear(),
            ResourceKind::Font(_) => {}
        }
        Ok(())
    }

    fn begin_load(&mut self, loader: &Rc<dyn MediaLoader>) -> Result<LoadStart, ResourceError> {
        self.transition(ResourceState::Loading)?;

        if let ResourceKind::Font(font) = &self.kind {
            if font.has_sample() {
                self.transition(ResourceState::Loaded)?;
                return Ok(LoadStart::Ready);
            }
        }

        let epoch = self.epoch.get();
        let guard = EpochGuard {
            cell: self.epoch.clone(),
            epoch,
        };
        let future = match &self.kind {
            ResourceKind::Image(image) => image.load(loader.clone(), guard),
            ResourceKind::Font(font) => font.load(loader.clone()),
            ResourceKind::Audio(audio) => audio.load(loader.clone()),
        };
        Ok(LoadStart::Pending(epoch, future))
    }

    /// Apply a finished load. Returns `Ok(false)` when the result is stale.
    fn complete_load(&mut self, epoch: u64, outcome: LoadOutcome) -> Result<bool, ResourceError> {
        if epoch != self.epoch.get() || self.state != ResourceState::Loading {
            return Ok(false);
        }

        let outcome = match outcome {
            LoadOutcome::Stale => return Ok(false),
            LoadOutcome::Failed(err) => {
                self.fail(&err)?;
                return Err(err.into());
            }
            other => other,
        };

        let applied = match (outcome, &mut self.kind) {
            (LoadOutcome::Image(decoded), ResourceKind::Image(image)) => {
                image.set_decoded(decoded);
                true
            }
            (LoadOutcome::Font(sample), ResourceKind::Font(font)) => {
                font.set_sample(sample);
                true
            }
            (LoadOutcome::Audio(decoded), ResourceKind::Audio(audio)) => {
                audio.set_decoded(decoded);
                true
            }
            _ => false,
        };

        if !applied {
            let err = LoadError::InvalidData("load result does not match resource kind".into());
            self.fail(&err)?;
            return Err(err.into());
        }

        self.transition(ResourceState::Loaded)?;
        Ok(true)
    }

    fn attach(&mut self, devices: &Devices) -> Result<(), ResourceError> {
        self.state.check(&self.id, ResourceState::Attached)?;

        let result = match &mut self.kind {
            ResourceKind::Image(image) => image.attach(&mut *devices.graphics.borrow_mut()),
            ResourceKind::Font(font) => font.attach(&mut *devices.graphics.borrow_mut()),
            ResourceKind::Audio(audio) => match &devices.audio {
                Some(device) => audio.attach(&mut *device.borrow_mut()),
                None => Err(LoadError::NoDevice("audio")),
            },
        };

        match result {
            Ok(()) => Ok(self.transition(ResourceState::Attached)?),
            Err(err) => {
                self.fail(&err)?;
                Err(err.into())
            }
        }
    }

    /// Release device handles and fall back to a loadable state. In-flight
    /// loads are invalidated.
    fn detach(&mut self, devices: &Devices) -> Result<(), ResourceError> {
        match self.state {
            ResourceState::Attached => {
                let to = match &mut self.kind {
                    ResourceKind::Image(image) => {
                        image.detach(&mut *devices.graphics.borrow_mut());
                        ResourceState::Init
                    }
                    ResourceKind::Font(font) => {
                        font.detach(&mut *devices.graphics.borrow_mut());
                        ResourceState::Init
                    }
                    ResourceKind::Audio(audio) => {
                        match &devices.audio {
                            Some(device) => audio.detach(Some(&mut *device.borrow_mut())),
                            None => audio.detach(None),
                        }
                        ResourceState::Detached
                    }
                };
                self.transition(to)?;
            }
            ResourceState::Loading | ResourceState::Loaded => {
                self.epoch.set(self.epoch.get() + 1);
                match &mut self.kind {
                    ResourceKind::Image(image) => image.clear(),
                    ResourceKind::Audio(audio) => audio.clear(),
                    ResourceKind::Font(_) => {}
                }
                self.transition(ResourceState::Init)?;
            }
            ResourceState::Init | ResourceState::Detached | ResourceState::Error => {}
        }
        Ok(())
    }
}

/// Run `f` on the resource, then emit whatever events it queued once the
/// borrow is released.
fn dispatch<R>(resource: &ResourceRef, f: impl FnOnce(&mut Resource) -> R) -> R {
    let (result, emitter, events) = {
        let mut r = resource.borrow_mut();
        let result = f(&mut r);
        let events = std::mem::take(&mut r.pending);
        (result, r.events.clone(), events)
    };
    for event in &events {
        emitter.emit(event);
    }
    result
}

// =============================================================================
// Manager
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkOp {
    Load,
    Attach,
    Skip,
}

struct WorkItem {
    id: String,
    resource: ResourceRef,
    op: WorkOp,
}

struct CompletedLoad {
    id: String,
    resource: ResourceRef,
    epoch: u64,
    outcome: LoadOutcome,
}

/// Owns every resource of an application and drives their lifecycle.
pub struct ResourceManager {
    devices: Devices,
    resources: IndexMap<String, ResourceRef>,
    queue: VecDeque<WorkItem>,
    in_flight: FuturesUnordered<LocalBoxFuture<'static, CompletedLoad>>,
    attached: bool,
    base_path: PathBuf,
    budget: Duration,
}

impl ResourceManager {
    pub fn new(devices: Devices) -> Self {
        Self {
            devices,
            resources: IndexMap::new(),
            queue: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            attached: false,
            base_path: PathBuf::new(),
            budget: DEFAULT_BUDGET,
        }
    }

    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = path.into();
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Look up without touching the reference count.
    pub fn get(&self, id: &str) -> Option<ResourceRef> {
        self.resources.get(id).cloned()
    }

    pub fn add_image(&mut self, spec: impl Into<SourceSpec>) -> Result<ResourceRef, ResourceError> {
        let source = to_source(&spec.into(), &self.base_path, SourcePolicy::IMAGE)?;
        let id = source.alias.clone();
        self.add(id, ResourceKind::Image(ImageResource::new(source)))
    }

    pub fn add_audio(&mut self, spec: impl Into<SourceSpec>) -> Result<ResourceRef, ResourceError> {
        let source = to_source(&spec.into(), &self.base_path, SourcePolicy::AUDIO)?;
        let id = source.alias.clone();
        self.add(id, ResourceKind::Audio(AudioResource::new(source)))
    }

    pub fn add_font(&mut self, spec: FontSpec) -> Result<ResourceRef, ResourceError> {
        let id = spec.key();
        self.add(id, ResourceKind::Font(FontResource::new(spec)))
    }

    fn add(&mut self, id: String, kind: ResourceKind) -> Result<ResourceRef, ResourceError> {
        if self.resources.contains_key(&id) {
            return Err(ResourceError::Duplicate(id));
        }

        let resource = Rc::new(RefCell::new(Resource::new(id.clone(), kind)));
        if self.attached {
            self.enqueue(&id, &resource, WorkOp::Load);
        }
        self.resources.insert(id, resource.clone());
        Ok(resource)
    }

    /// Take another reference to an existing resource.
    pub fn acquire(&mut self, id: &str) -> Option<ResourceRef> {
        let resource = self.resources.get(id)?;
        resource.borrow_mut().ref_count += 1;
        Some(resource.clone())
    }

    pub fn acquire_by_source(&mut self, spec: &SourceSpec) -> Option<ResourceRef> {
        self.acquire(spec.id())
    }

    pub fn acquire_font(&mut self, spec: &FontSpec) -> Option<ResourceRef> {
        self.acquire(&spec.key())
    }

    /// Drop a reference. At zero the resource is detached and removed, and
    /// queued work for it is skipped. Returns whether it was removed.
    pub fn release(&mut self, id: &str) -> bool {
        let Some(resource) = self.resources.get(id).cloned() else {
            return false;
        };

        {
            let mut r = resource.borrow_mut();
            r.ref_count = r.ref_count.saturating_sub(1);
            if r.ref_count > 0 {
                return false;
            }
        }

        let devices = self.devices.clone();
        if let Err(err) = dispatch(&resource, |r| r.detach(&devices)) {
            error!(id = %id, error = %err, "failed to detach released resource");
        }

        for item in self.queue.iter_mut().filter(|item| item.id == id) {
            item.op = WorkOp::Skip;
        }

        self.resources.shift_remove(id);
        debug!(id = %id, "resource removed");
        true
    }

    pub fn release_by_source(&mut self, spec: &SourceSpec) -> bool {
        self.release(spec.id())
    }

    pub fn release_font(&mut self, spec: &FontSpec) -> bool {
        self.release(&spec.key())
    }

    /// Devices are available: queue a load for every resource not in error.
    pub fn attach(&mut self) {
        if self.attached {
            return;
        }
        self.attached = true;

        let pending: Vec<(String, ResourceRef)> = self
            .resources
            .iter()
            .filter(|(_, r)| !r.borrow().has_error())
            .map(|(id, r)| (id.clone(), r.clone()))
            .collect();

        for (id, resource) in pending {
            self.enqueue(&id, &resource, WorkOp::Load);
        }
    }

    /// Devices are going away: drop pending work and detach everything.
    pub fn detach(&mut self) {
        self.queue.clear();
        self.in_flight = FuturesUnordered::new();
        self.attached = false;

        let devices = self.devices.clone();
        for (id, resource) in &self.resources {
            if let Err(err) = dispatch(resource, |r| r.detach(&devices)) {
                error!(id = %id, error = %err, "failed to detach resource");
            }
        }
    }

    /// Detach and forget every resource.
    pub fn destroy(&mut self) {
        self.detach();
        self.resources.clear();
    }

    /// Play an attached audio resource.
    pub fn play(&self, id: &str) -> Result<(), ResourceError> {
        let resource = self
            .resources
            .get(id)
            .ok_or_else(|| ResourceError::Unknown(id.to_string()))?;
        let sample = resource
            .borrow()
            .as_audio()
            .and_then(AudioResource::sample)
            .ok_or_else(|| ResourceError::Unknown(id.to_string()))?;
        let device = self.devices.audio.as_ref().ok_or(LoadError::NoDevice("audio"))?;
        device.borrow_mut().play(sample);
        Ok(())
    }

    /// Drain queued work within the time budget.
    ///
    /// Returns true when at least one resource was attached, i.e. something
    /// new can be drawn.
    pub fn run(&mut self) -> bool {
        if !self.attached {
            return false;
        }

        let start = Instant::now();
        let mut dirty = false;

        self.poll_loads();

        while let Some(item) = self.queue.pop_front() {
            match item.op {
                WorkOp::Load => self.start_load(item),
                WorkOp::Attach => {
                    let devices = self.devices.clone();
                    match dispatch(&item.resource, |r| {
                        if r.state() == ResourceState::Loaded {
                            r.attach(&devices).map(|_| true)
                        } else {
                            Ok(false)
                        }
                    }) {
                        Ok(attached) => dirty |= attached,
                        Err(err) => error!(id = %item.id, error = %err, "failed to attach resource"),
                    }
                }
                WorkOp::Skip => trace!(id = %item.id, "skipping released resource"),
            }

            if start.elapsed() > self.budget {
                break;
            }
        }

        self.poll_loads();
        dirty
    }

    fn enqueue(&mut self, id: &str, resource: &ResourceRef, op: WorkOp) {
        self.queue.push_back(WorkItem {
            id: id.to_string(),
            resource: resource.clone(),
            op,
        });
    }

    fn start_load(&mut self, item: WorkItem) {
        let state = item.resource.borrow().state();
        if !matches!(state, ResourceState::Init | ResourceState::Detached) {
            return;
        }

        let loader = self.devices.loader.clone();
        match dispatch(&item.resource, |r| r.begin_load(&loader)) {
            Ok(LoadStart::Ready) => self.enqueue(&item.id, &item.resource, WorkOp::Attach),
            Ok(LoadStart::Pending(epoch, future)) => {
                let WorkItem { id, resource, .. } = item;
                self.in_flight.push(
                    async move {
                        let outcome = future.await;
                        CompletedLoad {
                            id,
                            resource,
                            epoch,
                            outcome,
                        }
                    }
                    .boxed_local(),
                );
            }
            Err(err) => error!(id = %item.id, error = %err, "failed to start resource load"),
        }
    }

    fn poll_loads(&mut self) {
        let mut cx = Context::from_waker(noop_waker_ref());
        while let Poll::Ready(Some(done)) = self.in_flight.poll_next_unpin(&mut cx) {
            self.finish_load(done);
        }
    }

    fn finish_load(&mut self, done: CompletedLoad) {
        let CompletedLoad {
            id,
            resource,
            epoch,
            outcome,
        } = done;

        match dispatch(&resource, |r| r.complete_load(epoch, outcome)) {
            Ok(true) => {
                let current = self
                    .resources
                    .get(&id)
                    .is_some_and(|r| Rc::ptr_eq(r, &resource));
                if self.attached && current {
                    self.enqueue(&id, &resource, WorkOp::Attach);
                }
            }
            Ok(false) => trace!(id = %id, "discarding stale load result"),
            Err(err) => warn!(id = %id, error = %err, "failed to load resource"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{TestDevices, init_tracing, test_devices};

    fn manager() -> (ResourceManager, TestDevices) {
        let devices = test_devices();
        (ResourceManager::new(devices.devices()).with_base_path("/res"), devices)
    }

    fn state(r: &ResourceRef) -> ResourceState {
        r.borrow().state()
    }

    #[test]
    fn test_add_and_duplicate() {
        let (mut rm, _) = manager();
        let image = rm.add_image("a.png").unwrap();
        assert_eq!(image.borrow().id(), "a.png");
        assert_eq!(image.borrow().ref_count(), 1);
        assert!(matches!(rm.add_image("a.png"), Err(ResourceError::Duplicate(id)) if id == "a.png"));
    }

    #[test]
    fn test_ref_count_removes_at_zero() {
        let (mut rm, _) = manager();
        rm.add_image("a.png").unwrap();
        rm.acquire("a.png").unwrap();
        rm.acquire_by_source(&SourceSpec::new("a.png")).unwrap();

        assert!(!rm.release("a.png"));
        assert!(!rm.release("a.png"));
        assert!(rm.get("a.png").is_some());
        assert!(rm.release("a.png"));
        assert!(rm.get("a.png").is_none());
        assert!(rm.acquire("a.png").is_none());
    }

    #[test]
    fn test_image_load_then_attach() {
        let (mut rm, devices) = manager();
        let image = rm.add_image("a.png").unwrap();
        rm.attach();

        assert!(!rm.run());
        assert_eq!(state(&image), ResourceState::Loaded);
        assert_eq!(devices.loader.calls(), vec!["/res/a.png".to_string()]);

        assert!(rm.run());
        assert_eq!(state(&image), ResourceState::Attached);
        let r = image.borrow();
        let img = r.as_image().unwrap();
        assert!(img.has_dimensions());
        assert_eq!((img.width(), img.height()), (64, 32));
        assert_eq!(img.aspect_ratio(), 2.0);
        assert!(img.texture().is_some());
    }

    #[test]
    fn test_nothing_runs_while_detached() {
        let (mut rm, devices) = manager();
        let image = rm.add_image("a.png").unwrap();
        assert!(!rm.run());
        assert_eq!(state(&image), ResourceState::Init);
        assert!(devices.loader.calls().is_empty());
    }

    #[test]
    fn test_load_failure_is_isolated() {
        init_tracing();
        let (mut rm, _) = manager();
        let bad = rm.add_image("missing.png").unwrap();
        let good = rm.add_image("b.png").unwrap();
        rm.attach();
        rm.run();
        rm.run();

        assert_eq!(state(&bad), ResourceState::Error);
        assert_eq!(state(&good), ResourceState::Attached);
    }

    #[test]
    fn test_attach_failure_goes_to_error() {
        let (mut rm, devices) = manager();
        let image = rm.add_image("a.png").unwrap();
        devices.graphics.borrow_mut().fail_next = true;
        rm.attach();
        rm.run();
        assert!(!rm.run());
        assert_eq!(state(&image), ResourceState::Error);

        // Error resources are not reloaded on the next attach.
        rm.detach();
        rm.attach();
        rm.run();
        assert_eq!(state(&image), ResourceState::Error);
    }

    #[test]
    fn test_detach_resets_and_reattach_reloads() {
        let (mut rm, devices) = manager();
        let image = rm.add_image("a.png").unwrap();
        rm.attach();
        rm.run();
        rm.run();
        let texture = image.borrow().as_image().and_then(ImageResource::texture).unwrap();

        rm.detach();
        assert_eq!(state(&image), ResourceState::Init);
        assert_eq!(devices.graphics.borrow().destroyed, vec![texture]);

        rm.attach();
        rm.run();
        rm.run();
        assert_eq!(state(&image), ResourceState::Attached);
    }

    #[test]
    fn test_release_during_load_discards_result() {
        let (mut rm, devices) = manager();
        devices.loader.defer("/res/slow.png");
        let image = rm.add_image("slow.png").unwrap();
        rm.attach();
        rm.run();
        assert_eq!(state(&image), ResourceState::Loading);

        assert!(rm.release("slow.png"));
        assert_eq!(state(&image), ResourceState::Init);

        devices.loader.resolve("/res/slow.png");
        rm.run();
        assert_eq!(state(&image), ResourceState::Init);
        assert!(devices.graphics.borrow().created.is_empty());
    }

    #[test]
    fn test_release_marks_queued_work_skipped() {
        let (mut rm, devices) = manager();
        rm.attach();
        rm.add_image("a.png").unwrap();
        assert!(rm.release("a.png"));
        rm.run();
        assert!(devices.loader.calls().is_empty());
    }

    #[test]
    fn test_events_fire_after_borrow() {
        let (mut rm, _) = manager();
        let image = rm.add_image("a.png").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        let weak = Rc::downgrade(&image);
        image.borrow().events().on(move |event| {
            let state = weak.upgrade().map(|r| r.borrow().state());
            s.borrow_mut().push((event.clone(), state));
        });

        rm.attach();
        rm.run();
        rm.run();
        rm.detach();

        assert_eq!(
            *seen.borrow(),
            vec![
                (ResourceEvent::Loaded, Some(ResourceState::Loaded)),
                (ResourceEvent::Attached, Some(ResourceState::Attached)),
                (ResourceEvent::Detached, Some(ResourceState::Init)),
            ]
        );
    }

    #[test]
    fn test_font_key_and_cached_sample() {
        let (mut rm, devices) = manager();
        let spec = FontSpec::new("Roboto", 16.0);
        let font = rm.add_font(spec.clone()).unwrap();
        assert_eq!(font.borrow().id(), "Roboto-normal-normal-16");
        assert!(rm.acquire_font(&spec).is_some());

        rm.attach();
        rm.run();
        rm.run();
        assert_eq!(state(&font), ResourceState::Attached);
        assert!(font.borrow().as_font().and_then(FontResource::sample).is_some());

        // A reattach reuses the sample without another load.
        rm.detach();
        rm.attach();
        rm.run();
        assert_eq!(state(&font), ResourceState::Attached);
        assert_eq!(devices.loader.font_calls(), 1);
    }

    #[test]
    fn test_audio_lifecycle() {
        let (mut rm, devices) = manager();
        let audio = rm.add_audio("click.wav").unwrap();
        assert!(rm.add_audio("data:;base64,AAAA").is_err());

        rm.attach();
        rm.run();
        rm.run();
        assert_eq!(state(&audio), ResourceState::Attached);

        rm.play("click.wav").unwrap();
        assert_eq!(devices.audio.borrow().played.len(), 1);

        rm.detach();
        assert_eq!(state(&audio), ResourceState::Detached);
        rm.attach();
        rm.run();
        rm.run();
        assert_eq!(state(&audio), ResourceState::Attached);
    }

    #[test]
    fn test_base64_image() {
        let (mut rm, devices) = manager();
        let image = rm.add_image("data:image/png;base64,AAECAw==").unwrap();
        rm.attach();
        rm.run();
        assert_eq!(state(&image), ResourceState::Loaded);
        assert_eq!(devices.loader.calls(), vec!["bytes:4".to_string()]);
    }

    #[test]
    fn test_remote_image_fetches_then_decodes() {
        let (mut rm, devices) = manager();
        let image = rm.add_image("https://example.com/a.png").unwrap();
        rm.attach();
        rm.run();
        assert_eq!(state(&image), ResourceState::Loaded);
        assert_eq!(
            devices.loader.calls(),
            vec!["fetch:https://example.com/a.png".to_string(), "bytes:3".to_string()]
        );
    }

    #[test]
    fn test_budget_defers_work() {
        let devices = test_devices();
        let mut rm = ResourceManager::new(devices.devices()).with_budget(Duration::ZERO);
        rm.add_image("a.png").unwrap();
        rm.add_image("b.png").unwrap();
        rm.attach();

        rm.run();
        assert_eq!(devices.loader.calls().len(), 1);
        rm.run();
        assert_eq!(devices.loader.calls().len(), 2);
    }
}
