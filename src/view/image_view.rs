use std::cell::{Cell, RefCell};
use std::rc::Rc;

use taffy::NodeId;
use tracing::warn;

use crate::error::ViewError;
use crate::event::ListenerId;
use crate::layout::{BoxGeometry, Measure, SharedLayout};
use crate::platform::RenderingContext;
use crate::resource::{ResourceRef, SourceSpec};
use crate::style::Style;
use crate::types::{ObjectFit, Rect};

use super::{Props, SharedResources, mark_dirty_on_load, stop_watching};

/// Current image of a view, shared with the layout node's measure context.
struct ImageSlot {
    current: RefCell<Option<(SourceSpec, ResourceRef)>>,
    /// Load listener on the current resource, if it was not decoded yet.
    listener: Cell<Option<ListenerId>>,
}

impl Measure for ImageSlot {
    fn measure(&self, _width: Option<f32>, _height: Option<f32>) -> (f32, f32) {
        let current = self.current.borrow();
        let Some((_, resource)) = current.as_ref() else {
            return (0.0, 0.0);
        };
        let resource = resource.borrow();
        match resource.as_image() {
            Some(image) if image.has_dimensions() => (image.width() as f32, image.height() as f32),
            _ => (0.0, 0.0),
        }
    }
}

pub(super) struct ImageView {
    slot: Rc<ImageSlot>,
}

impl ImageView {
    pub(super) fn new(
        layout: &SharedLayout,
        node: NodeId,
        resources: &SharedResources,
        props: &Props,
    ) -> Result<Self, ViewError> {
        let slot = Rc::new(ImageSlot {
            current: RefCell::new(None),
            listener: Cell::new(None),
        });
        layout.borrow_mut().set_measure(node, Some(slot.clone()))?;
        let mut view = Self { slot };
        view.update(layout, node, resources, props.src.as_ref())?;
        Ok(view)
    }

    /// Swap the image resource when `src` changes. An invalid source is
    /// logged and leaves the view empty.
    pub(super) fn update(
        &mut self,
        layout: &SharedLayout,
        node: NodeId,
        resources: &SharedResources,
        src: Option<&SourceSpec>,
    ) -> Result<(), ViewError> {
        if self.slot.current.borrow().as_ref().map(|(spec, _)| spec) == src {
            return Ok(());
        }

        self.release(resources);
        if let Some(spec) = src {
            let resource = {
                let mut rm = resources.borrow_mut();
                match rm.acquire_by_source(spec) {
                    Some(resource) => Some(resource),
                    None => rm
                        .add_image(spec.clone())
                        .map_err(|err| warn!(src = %spec.id(), error = %err, "invalid image src"))
                        .ok(),
                }
            };
            if let Some(resource) = resource {
                self.slot.listener.set(watch_load(layout, node, &self.slot, &resource));
                *self.slot.current.borrow_mut() = Some((spec.clone(), resource));
            }
        }

        layout.borrow_mut().mark_dirty(node)?;
        Ok(())
    }

    pub(super) fn release(&mut self, resources: &SharedResources) {
        let previous = self.slot.current.borrow_mut().take();
        if let Some((spec, resource)) = previous {
            stop_watching(&resource, self.slot.listener.take());
            resources.borrow_mut().release_by_source(&spec);
        }
    }

    /// Fit the attached image into the content box.
    pub(super) fn draw(
        &self,
        style: &Style,
        geometry: &BoxGeometry,
        rect: Rect,
        clip: bool,
        ctx: &mut dyn RenderingContext,
    ) {
        let current = self.slot.current.borrow();
        let Some((_, resource)) = current.as_ref() else {
            return;
        };
        let resource = resource.borrow();
        if !resource.is_attached() {
            return;
        }
        let Some(image) = resource.as_image() else {
            return;
        };
        let Some(texture) = image.texture() else {
            return;
        };

        let content = rect.inset(geometry.border).inset(geometry.padding);
        let dest = fit_image(style, content, image.width() as f32, image.height() as f32);

        ctx.push_style(style);
        if clip {
            ctx.push_clip_rect(content);
        }
        match image.cap_insets() {
            Some(insets) => ctx.blit_cap_insets(texture, insets, dest),
            None => ctx.blit(texture, dest),
        }
        if clip {
            ctx.pop_clip_rect();
        }
        ctx.pop_style();
    }
}

fn watch_load(layout: &SharedLayout, node: NodeId, slot: &Rc<ImageSlot>, resource: &ResourceRef) -> Option<ListenerId> {
    if resource.borrow().as_image().is_some_and(|i| i.has_dimensions()) {
        return None;
    }
    let slot = Rc::downgrade(slot);
    Some(mark_dirty_on_load(layout, node, resource, move |loaded| {
        slot.upgrade().is_some_and(|slot| {
            slot.current
                .borrow()
                .as_ref()
                .is_some_and(|(_, r)| Rc::ptr_eq(r, loaded))
        })
    }))
}

/// Destination rect of a `width` x `height` image inside `content` under the
/// style's `objectFit` and `objectPosition`.
pub fn fit_image(style: &Style, content: Rect, width: f32, height: f32) -> Rect {
    let props = style.props();
    if width <= 0.0 || height <= 0.0 {
        return content;
    }

    let scale_x = content.width / width;
    let scale_y = content.height / height;
    let (w, h) = match props.object_fit {
        ObjectFit::Fill => return content,
        ObjectFit::Contain => {
            let s = scale_x.min(scale_y);
            (width * s, height * s)
        }
        ObjectFit::Cover => {
            let s = scale_x.max(scale_y);
            (width * s, height * s)
        }
        ObjectFit::None => (width, height),
        ObjectFit::ScaleDown => {
            let s = scale_x.min(scale_y).min(1.0);
            (width * s, height * s)
        }
    };

    Rect::new(
        content.x + props.object_position_x.offset(content.width, w),
        content.y + props.object_position_y.offset(content.height, h),
        w,
        h,
    )
}
