use std::cell::RefCell;
use std::rc::Rc;

use taffy::NodeId;
use tracing::warn;

use crate::error::ViewError;
use crate::event::ListenerId;
use crate::layout::{BoxGeometry, FontSample, Measure, SharedLayout, TextLayout};
use crate::platform::RenderingContext;
use crate::resource::{FontResource, FontSpec, ResourceRef};
use crate::style::Style;
use crate::types::{Rect, TextOverflow};

use super::{Props, SharedResources, mark_dirty_on_load, stop_watching};

struct TextState {
    /// Content after `textTransform`.
    text: String,
    font: Option<(FontSpec, ResourceRef)>,
    font_listener: Option<ListenerId>,
    max_lines: u32,
    ellipsize: bool,
    layout: TextLayout,
}

impl TextState {
    fn font_sample(&self) -> Option<Rc<FontSample>> {
        let (_, resource) = self.font.as_ref()?;
        let resource = resource.borrow();
        resource.as_font().and_then(FontResource::sample).cloned()
    }
}

struct TextMeasure(Rc<RefCell<TextState>>);

impl Measure for TextMeasure {
    fn measure(&self, width: Option<f32>, height: Option<f32>) -> (f32, f32) {
        let Ok(mut state) = self.0.try_borrow_mut() else {
            return (0.0, 0.0);
        };
        if state.text.is_empty() {
            return (0.0, 0.0);
        }
        let Some(sample) = state.font_sample() else {
            return (0.0, 0.0);
        };
        let TextState {
            text,
            max_lines,
            ellipsize,
            layout,
            ..
        } = &mut *state;
        layout.layout(
            text,
            &sample,
            *max_lines,
            *ellipsize,
            width.unwrap_or(0.0),
            height.unwrap_or(0.0),
        )
    }
}

pub(super) struct TextView {
    state: Rc<RefCell<TextState>>,
}

impl TextView {
    pub(super) fn new(
        layout: &SharedLayout,
        node: NodeId,
        resources: &SharedResources,
        props: &Props,
        style: &Style,
    ) -> Result<Self, ViewError> {
        let state = Rc::new(RefCell::new(TextState {
            text: String::new(),
            font: None,
            font_listener: None,
            max_lines: 0,
            ellipsize: false,
            layout: TextLayout::new(),
        }));
        layout
            .borrow_mut()
            .set_measure(node, Some(Rc::new(TextMeasure(state.clone()))))?;

        let mut view = Self { state };
        view.update(layout, node, resources, props.text.as_deref(), style, style)?;
        Ok(view)
    }

    /// Transformed content.
    pub(super) fn text(&self) -> String {
        self.state.borrow().text.clone()
    }

    /// Apply new content and text style. The cached layout is dropped and
    /// the node marked dirty only when something it depends on changed.
    pub(super) fn update(
        &mut self,
        layout: &SharedLayout,
        node: NodeId,
        resources: &SharedResources,
        text: Option<&str>,
        old_style: &Style,
        style: &Style,
    ) -> Result<(), ViewError> {
        let props = style.props();
        let transformed = props.text_transform.apply(text.unwrap_or_default());
        let ellipsize = props.text_overflow == TextOverflow::Ellipsis;
        let spec = FontSpec::from_props(props);

        let mut state = self.state.borrow_mut();
        let font_changed = state.font.as_ref().map(|(s, _)| s) != spec.as_ref();
        let changed = font_changed
            || state.text != transformed
            || state.max_lines != props.max_lines
            || state.ellipsize != ellipsize
            || old_style.props().line_height != props.line_height;

        state.text = transformed;
        state.max_lines = props.max_lines;
        state.ellipsize = ellipsize;

        if font_changed {
            if let Some((old, resource)) = state.font.take() {
                stop_watching(&resource, state.font_listener.take());
                resources.borrow_mut().release_font(&old);
            }
            if let Some(spec) = spec {
                let resource = {
                    let mut rm = resources.borrow_mut();
                    match rm.acquire_font(&spec) {
                        Some(resource) => Some(resource),
                        None => rm
                            .add_font(spec.clone())
                            .map_err(|err| warn!(font = %spec, error = %err, "failed to add font"))
                            .ok(),
                    }
                };
                if let Some(resource) = resource {
                    let weak = Rc::downgrade(&self.state);
                    state.font_listener = Some(mark_dirty_on_load(layout, node, &resource, move |loaded| {
                        weak.upgrade().is_some_and(|state| {
                            state.try_borrow().is_ok_and(|state| {
                                state.font.as_ref().is_some_and(|(_, r)| Rc::ptr_eq(r, loaded))
                            })
                        })
                    }));
                    state.font = Some((spec, resource));
                }
            }
        }

        if changed {
            state.layout.reset();
            drop(state);
            layout.borrow_mut().mark_dirty(node)?;
        }
        Ok(())
    }

    pub(super) fn release(&mut self, resources: &SharedResources) {
        let (font, listener) = {
            let mut state = self.state.borrow_mut();
            (state.font.take(), state.font_listener.take())
        };
        if let Some((spec, resource)) = font {
            stop_watching(&resource, listener);
            resources.borrow_mut().release_font(&spec);
        }
    }

    /// Lay the text out in the content box and draw it as one glyph run.
    pub(super) fn draw(&self, style: &Style, geometry: &BoxGeometry, rect: Rect, ctx: &mut dyn RenderingContext) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if state.text.is_empty() {
            return;
        }
        let Some((_, resource)) = state.font.as_ref() else {
            return;
        };
        let (texture, sample) = {
            let resource = resource.borrow();
            if !resource.is_attached() {
                return;
            }
            let Some(font) = resource.as_font() else {
                return;
            };
            match (font.texture(), font.sample()) {
                (Some(texture), Some(sample)) => (texture, sample.clone()),
                _ => return,
            }
        };

        let content = rect.inset(geometry.border).inset(geometry.padding);
        let TextState {
            text,
            max_lines,
            ellipsize,
            layout,
            ..
        } = &mut *state;
        layout.layout(text, &sample, *max_lines, *ellipsize, content.width, content.height);
        let run = layout.glyph_run(&sample, content.x, content.y, style.props().text_align);
        if run.is_empty() {
            return;
        }

        ctx.push_style(style);
        ctx.draw_glyph_run(texture, &run);
        ctx.pop_style();
    }
}
