use tracing::warn;

use crate::layout::BoxGeometry;
use crate::platform::RenderingContext;
use crate::resource::{ResourceRef, SourceSpec};
use crate::style::Style;
use crate::types::{BackgroundClip, Rect};

use super::SharedResources;

/// Container view state: the background image reference, if the style has one.
#[derive(Default)]
pub(super) struct BoxView {
    background: Option<(SourceSpec, ResourceRef)>,
}

impl BoxView {
    pub(super) fn new(resources: &SharedResources, style: &Style) -> Self {
        let mut view = Self::default();
        view.update(resources, style);
        view
    }

    /// Follow the style's `backgroundImage`, swapping the resource reference
    /// only when the source changes.
    pub(super) fn update(&mut self, resources: &SharedResources, style: &Style) {
        let wanted = style.props().background_image.as_ref();
        if self.background.as_ref().map(|(spec, _)| spec) == wanted {
            return;
        }

        self.release(resources);
        let Some(spec) = wanted else {
            return;
        };

        let mut rm = resources.borrow_mut();
        let resource = match rm.acquire_by_source(spec) {
            Some(resource) => Some(resource),
            None => match rm.add_image(spec.clone()) {
                Ok(resource) => Some(resource),
                Err(err) => {
                    warn!(src = %spec.id(), error = %err, "invalid background image");
                    None
                }
            },
        };
        self.background = resource.map(|r| (spec.clone(), r));
    }

    pub(super) fn release(&mut self, resources: &SharedResources) {
        if let Some((spec, _)) = self.background.take() {
            resources.borrow_mut().release_by_source(&spec);
        }
    }

    /// Background fill, then background image, then border. `rect` is the
    /// absolute border box.
    pub(super) fn paint(&self, style: &Style, geometry: &BoxGeometry, rect: Rect, ctx: &mut dyn RenderingContext) {
        if style.is_layout_only() {
            return;
        }
        let props = style.props();
        let radius = props.border_radius as f32;

        let fill = match props.background_clip {
            BackgroundClip::BorderBox => rect,
            BackgroundClip::PaddingBox => rect.inset(geometry.border),
        };

        if props.background_color.is_some() {
            if style.has_border_radius() {
                ctx.fill_rounded_rect(fill, radius);
            } else {
                ctx.fill_rect(fill);
            }
        }

        if let Some((_, resource)) = &self.background {
            let resource = resource.borrow();
            if let Some(image) = resource.as_image().filter(|_| resource.is_attached()) {
                if let Some(texture) = image.texture() {
                    match image.cap_insets() {
                        Some(insets) => ctx.blit_cap_insets(texture, insets, fill),
                        None => ctx.blit(texture, fill),
                    }
                }
            }
        }

        if props.border_color.is_some() && !geometry.border.is_zero() {
            if style.has_border_radius() {
                ctx.rounded_border(rect, radius, geometry.border.top);
            } else {
                ctx.border(rect, geometry.border);
            }
        }
    }
}
