//! Style property to layout node bindings.
//!
//! Each layout-affecting style key maps onto a field of the node's
//! `taffy::Style`. Keyword values use the flexbox names (`row`, `space-between`,
//! `no-wrap`). Dimensions accept numbers (points), `"N%"` strings and, where the
//! property allows it, `"auto"`.

use taffy::{
    AlignContent as TaffyAlignContent, AlignItems as TaffyAlignItems,
    Dimension as TaffyDimension, Display as TaffyDisplay, FlexDirection as TaffyFlexDirection,
    FlexWrap as TaffyFlexWrap, JustifyContent as TaffyJustifyContent, LengthPercentage,
    LengthPercentageAuto, Overflow as TaffyOverflow, Position as TaffyPosition,
};

use crate::error::StyleError;
use crate::types::{
    Align, Dimension, Display, FlexDirection, FlexWrap, JustifyContent, Overflow, PositionType,
};

use super::{AnimatedValue, Style, StyleValue};

/// Every style key that affects layout.
pub const LAYOUT_KEYS: &[&str] = &[
    "alignItems",
    "alignContent",
    "alignSelf",
    "border",
    "borderLeft",
    "borderTop",
    "borderRight",
    "borderBottom",
    "display",
    "flex",
    "flexBasis",
    "flexGrow",
    "flexShrink",
    "flexWrap",
    "flexDirection",
    "height",
    "justifyContent",
    "margin",
    "marginLeft",
    "marginTop",
    "marginRight",
    "marginBottom",
    "maxHeight",
    "maxWidth",
    "minHeight",
    "minWidth",
    "overflow",
    "padding",
    "paddingLeft",
    "paddingTop",
    "paddingRight",
    "paddingBottom",
    "left",
    "top",
    "right",
    "bottom",
    "position",
    "width",
];

pub fn is_layout_key(key: &str) -> bool {
    LAYOUT_KEYS.contains(&key)
}

/// Default node style: column direction and no shrinking, as embedded
/// flexbox engines lay out.
pub fn default_node_style() -> taffy::Style {
    taffy::Style {
        flex_direction: TaffyFlexDirection::Column,
        flex_shrink: 0.0,
        ..Default::default()
    }
}

// =============================================================================
// VALUE PARSING
// =============================================================================

/// A style value reduced to what a binding consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BindValue<'a> {
    Number(f32),
    Keyword(&'a str),
}

impl<'a> BindValue<'a> {
    fn from_style_value(value: &'a StyleValue) -> Option<Self> {
        match value {
            StyleValue::Number(n) => Some(Self::Number(*n)),
            StyleValue::Animated(v) => Some(Self::Number(v.get())),
            StyleValue::Text(s) => Some(Self::Keyword(s)),
            _ => None,
        }
    }
}

fn dimension(key: &str, value: BindValue, allow_auto: bool) -> Result<Dimension, StyleError> {
    let dim = match value {
        BindValue::Number(n) if n.is_finite() => Some(Dimension::Points(n)),
        BindValue::Number(_) => None,
        BindValue::Keyword(s) => Dimension::parse(s),
    };

    match dim {
        Some(Dimension::Auto) if !allow_auto => Err(StyleError::invalid(key, "auto")),
        Some(dim) => Ok(dim),
        None => Err(invalid(key, value)),
    }
}

fn number(key: &str, value: BindValue) -> Result<f32, StyleError> {
    match value {
        BindValue::Number(n) if n.is_finite() => Ok(n),
        _ => Err(invalid(key, value)),
    }
}

fn keyword<'a>(key: &str, value: BindValue<'a>) -> Result<&'a str, StyleError> {
    match value {
        BindValue::Keyword(s) => Ok(s),
        BindValue::Number(_) => Err(invalid(key, value)),
    }
}

fn lookup<T>(key: &str, value: BindValue, parse: fn(&str) -> Option<T>) -> Result<T, StyleError> {
    parse(keyword(key, value)?).ok_or_else(|| invalid(key, value))
}

fn invalid(key: &str, value: BindValue) -> StyleError {
    match value {
        BindValue::Number(n) => StyleError::invalid(key, n),
        BindValue::Keyword(s) => StyleError::invalid(key, format!("{s:?}")),
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

fn to_taffy_dimension(dim: Dimension) -> TaffyDimension {
    match dim {
        Dimension::Auto => TaffyDimension::Auto,
        Dimension::Points(n) => TaffyDimension::Length(n),
        Dimension::Percent(p) => TaffyDimension::Percent(p / 100.0),
    }
}

fn to_taffy_lpa(dim: Dimension) -> LengthPercentageAuto {
    match dim {
        Dimension::Auto => LengthPercentageAuto::Auto,
        Dimension::Points(n) => LengthPercentageAuto::Length(n),
        Dimension::Percent(p) => LengthPercentageAuto::Percent(p / 100.0),
    }
}

fn to_taffy_lp(dim: Dimension) -> LengthPercentage {
    match dim {
        Dimension::Points(n) => LengthPercentage::Length(n),
        Dimension::Percent(p) => LengthPercentage::Percent(p / 100.0),
        Dimension::Auto => LengthPercentage::Length(0.0),
    }
}

fn to_taffy_flex_direction(dir: FlexDirection) -> TaffyFlexDirection {
    match dir {
        FlexDirection::Column => TaffyFlexDirection::Column,
        FlexDirection::Row => TaffyFlexDirection::Row,
        FlexDirection::ColumnReverse => TaffyFlexDirection::ColumnReverse,
        FlexDirection::RowReverse => TaffyFlexDirection::RowReverse,
    }
}

fn to_taffy_flex_wrap(wrap: FlexWrap) -> TaffyFlexWrap {
    match wrap {
        FlexWrap::NoWrap => TaffyFlexWrap::NoWrap,
        FlexWrap::Wrap => TaffyFlexWrap::Wrap,
        FlexWrap::WrapReverse => TaffyFlexWrap::WrapReverse,
    }
}

fn to_taffy_justify_content(justify: JustifyContent) -> Option<TaffyJustifyContent> {
    Some(match justify {
        JustifyContent::FlexStart => TaffyJustifyContent::FlexStart,
        JustifyContent::Center => TaffyJustifyContent::Center,
        JustifyContent::FlexEnd => TaffyJustifyContent::FlexEnd,
        JustifyContent::SpaceBetween => TaffyJustifyContent::SpaceBetween,
        JustifyContent::SpaceAround => TaffyJustifyContent::SpaceAround,
        JustifyContent::SpaceEvenly => TaffyJustifyContent::SpaceEvenly,
    })
}

/// Item alignment. Distribution keywords have no item meaning and fall back
/// to flex-start.
fn to_taffy_align_items(align: Align) -> Option<TaffyAlignItems> {
    match align {
        Align::Auto => None,
        Align::Stretch => Some(TaffyAlignItems::Stretch),
        Align::Center => Some(TaffyAlignItems::Center),
        Align::FlexEnd => Some(TaffyAlignItems::FlexEnd),
        Align::Baseline => Some(TaffyAlignItems::Baseline),
        Align::FlexStart | Align::SpaceBetween | Align::SpaceAround | Align::SpaceEvenly => {
            Some(TaffyAlignItems::FlexStart)
        }
    }
}

fn to_taffy_align_content(align: Align) -> Option<TaffyAlignContent> {
    match align {
        Align::Auto => None,
        Align::Stretch => Some(TaffyAlignContent::Stretch),
        Align::FlexStart | Align::Baseline => Some(TaffyAlignContent::FlexStart),
        Align::Center => Some(TaffyAlignContent::Center),
        Align::FlexEnd => Some(TaffyAlignContent::FlexEnd),
        Align::SpaceBetween => Some(TaffyAlignContent::SpaceBetween),
        Align::SpaceAround => Some(TaffyAlignContent::SpaceAround),
        Align::SpaceEvenly => Some(TaffyAlignContent::SpaceEvenly),
    }
}

fn to_taffy_overflow(overflow: Overflow) -> TaffyOverflow {
    match overflow {
        Overflow::Visible => TaffyOverflow::Visible,
        Overflow::Hidden => TaffyOverflow::Clip,
        Overflow::Scroll => TaffyOverflow::Scroll,
    }
}

/// Read back the overflow keyword from a node style.
pub fn overflow_of(style: &taffy::Style) -> Overflow {
    match style.overflow.x {
        TaffyOverflow::Visible => Overflow::Visible,
        TaffyOverflow::Clip | TaffyOverflow::Hidden => Overflow::Hidden,
        TaffyOverflow::Scroll => Overflow::Scroll,
    }
}

// =============================================================================
// BINDING
// =============================================================================

/// Apply one style property to a node style.
///
/// Returns `Ok(false)` for keys that do not affect layout.
pub fn apply_property(
    node: &mut taffy::Style,
    key: &str,
    value: BindValue,
) -> Result<bool, StyleError> {
    let edge_lpa = |node: &mut taffy::Style, which: Edge, allow_auto| -> Result<(), StyleError> {
        let v = to_taffy_lpa(dimension(key, value, allow_auto)?);
        set_edge(&mut node.margin, which, v);
        Ok(())
    };

    match key {
        "alignItems" => node.align_items = to_taffy_align_items(lookup(key, value, Align::from_keyword)?),
        "alignSelf" => node.align_self = to_taffy_align_items(lookup(key, value, Align::from_keyword)?),
        "alignContent" => {
            node.align_content = to_taffy_align_content(lookup(key, value, Align::from_keyword)?)
        }
        "justifyContent" => {
            node.justify_content =
                to_taffy_justify_content(lookup(key, value, JustifyContent::from_keyword)?)
        }
        "display" => {
            node.display = match lookup(key, value, Display::from_keyword)? {
                Display::Flex => TaffyDisplay::Flex,
                Display::None => TaffyDisplay::None,
            }
        }
        "flexDirection" => {
            node.flex_direction = to_taffy_flex_direction(lookup(key, value, FlexDirection::from_keyword)?)
        }
        "flexWrap" => node.flex_wrap = to_taffy_flex_wrap(lookup(key, value, FlexWrap::from_keyword)?),
        "overflow" => {
            let o = to_taffy_overflow(lookup(key, value, Overflow::from_keyword)?);
            node.overflow = taffy::Point { x: o, y: o };
        }
        "position" => {
            node.position = match lookup(key, value, PositionType::from_keyword)? {
                PositionType::Relative => TaffyPosition::Relative,
                PositionType::Absolute => TaffyPosition::Absolute,
            }
        }
        "flex" => {
            // Positive flex grows from a zero basis without shrinking; negative shrinks.
            let f = number(key, value)?;
            if f > 0.0 {
                node.flex_grow = f;
                node.flex_shrink = 0.0;
                node.flex_basis = TaffyDimension::Length(0.0);
            } else if f < 0.0 {
                node.flex_grow = 0.0;
                node.flex_shrink = -f;
            } else {
                node.flex_grow = 0.0;
                node.flex_shrink = 0.0;
            }
        }
        "flexGrow" => node.flex_grow = number(key, value)?.max(0.0),
        "flexShrink" => node.flex_shrink = number(key, value)?.max(0.0),
        "flexBasis" => node.flex_basis = to_taffy_dimension(dimension(key, value, true)?),
        "width" => node.size.width = to_taffy_dimension(dimension(key, value, true)?),
        "height" => node.size.height = to_taffy_dimension(dimension(key, value, true)?),
        "minWidth" => node.min_size.width = to_taffy_dimension(dimension(key, value, false)?),
        "minHeight" => node.min_size.height = to_taffy_dimension(dimension(key, value, false)?),
        "maxWidth" => node.max_size.width = to_taffy_dimension(dimension(key, value, false)?),
        "maxHeight" => node.max_size.height = to_taffy_dimension(dimension(key, value, false)?),
        "margin" => edge_lpa(node, Edge::All, true)?,
        "marginLeft" => edge_lpa(node, Edge::Left, true)?,
        "marginTop" => edge_lpa(node, Edge::Top, true)?,
        "marginRight" => edge_lpa(node, Edge::Right, true)?,
        "marginBottom" => edge_lpa(node, Edge::Bottom, true)?,
        "left" | "top" | "right" | "bottom" => {
            let v = to_taffy_lpa(dimension(key, value, true)?);
            let which = Edge::from_key(key);
            set_edge(&mut node.inset, which, v);
        }
        "padding" | "paddingLeft" | "paddingTop" | "paddingRight" | "paddingBottom" => {
            let v = to_taffy_lp(dimension(key, value, false)?);
            set_edge(&mut node.padding, Edge::from_key(key), v);
        }
        "border" | "borderLeft" | "borderTop" | "borderRight" | "borderBottom" => {
            let width = number(key, value)?;
            if width < 0.0 {
                return Err(invalid(key, value));
            }
            set_edge(&mut node.border, Edge::from_key(key), LengthPercentage::Length(width));
        }
        _ => return Ok(false),
    }

    Ok(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    All,
    Left,
    Top,
    Right,
    Bottom,
}

impl Edge {
    fn from_key(key: &str) -> Self {
        if key.ends_with("Left") || key == "left" {
            Self::Left
        } else if key.ends_with("Top") || key == "top" {
            Self::Top
        } else if key.ends_with("Right") || key == "right" {
            Self::Right
        } else if key.ends_with("Bottom") || key == "bottom" {
            Self::Bottom
        } else {
            Self::All
        }
    }
}

fn set_edge<T: Copy>(rect: &mut taffy::Rect<T>, edge: Edge, value: T) {
    match edge {
        Edge::All => {
            rect.left = value;
            rect.top = value;
            rect.right = value;
            rect.bottom = value;
        }
        Edge::Left => rect.left = value,
        Edge::Top => rect.top = value,
        Edge::Right => rect.right = value,
        Edge::Bottom => rect.bottom = value,
    }
}

/// Check a value against its layout binding without touching a real node.
pub fn validate_property(key: &str, value: &StyleValue) -> Result<(), StyleError> {
    if !is_layout_key(key) {
        return Ok(());
    }
    let bind = BindValue::from_style_value(value)
        .ok_or_else(|| StyleError::invalid(key, format!("{value:?}")))?;
    let mut scratch = default_node_style();
    apply_property(&mut scratch, key, bind).map(|_| ())
}

/// Push one property, typically called when an animated value changes.
pub fn bind_style_property(
    node: &mut taffy::Style,
    key: &str,
    value: f32,
) -> Result<bool, StyleError> {
    apply_property(node, key, BindValue::Number(value))
}

/// Apply every layout property of `style` onto `node`.
///
/// Returns the animated values bound to layout keys so the caller can observe
/// them and re-push single properties as they change. Edge shorthands are
/// applied before their per-edge keys so `marginLeft` wins over `margin`.
pub fn bind_style(
    node: &mut taffy::Style,
    style: &Style,
) -> Result<Vec<(String, AnimatedValue)>, StyleError> {
    let mut animated = Vec::new();
    let (shorthands, rest): (Vec<_>, Vec<_>) = style
        .values()
        .filter(|(key, _)| is_layout_key(key))
        .partition(|(key, _)| matches!(key.as_str(), "margin" | "padding" | "border" | "flex"));

    for (key, value) in shorthands.into_iter().chain(rest) {
        if let Some(bind) = BindValue::from_style_value(value) {
            apply_property(node, key, bind)?;
        }
        if let StyleValue::Animated(v) = value {
            animated.push((key.clone(), v.clone()));
        }
    }

    Ok(animated)
}
