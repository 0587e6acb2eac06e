//! Style - immutable, validated style objects.
//!
//! A [`Style`] is built once from one or more [`StylePart`]s (plain fragments
//! or previously built styles), later parts overriding earlier ones. Values are
//! validated at construction and summary hints are computed so drawing code
//! never re-inspects the raw map.
//!
//! # Example
//!
//! ```
//! use small_screen::style::{Style, StyleFragment};
//!
//! let base = Style::new(StyleFragment::new().set("width", 100).set("color", "#fff")).unwrap();
//! let merged = Style::compose([base.as_part(), StyleFragment::new().set("width", 50).as_part()]).unwrap();
//! assert_eq!(merged.number("width"), Some(50.0));
//! ```

pub mod bindings;
mod value;

pub use value::{AnimatedValue, ObserverId};

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::error::StyleError;
use crate::resource::SourceSpec;
use crate::types::{
    BackgroundClip, Color, FontStyle, FontWeight, ObjectFit, TextAlign, TextOverflow,
    TextTransform,
};

// =============================================================================
// Values
// =============================================================================

/// A single style property value.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Number(f32),
    Text(String),
    Color(Color),
    Animated(AnimatedValue),
    Source(SourceSpec),
}

impl StyleValue {
    /// Current numeric value, reading through animated values.
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Animated(v) => Some(v.get()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f32> for StyleValue {
    fn from(v: f32) -> Self {
        Self::Number(v)
    }
}

impl From<i32> for StyleValue {
    fn from(v: i32) -> Self {
        Self::Number(v as f32)
    }
}

impl From<u32> for StyleValue {
    fn from(v: u32) -> Self {
        Self::Number(v as f32)
    }
}

impl From<&str> for StyleValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Color> for StyleValue {
    fn from(v: Color) -> Self {
        Self::Color(v)
    }
}

impl From<AnimatedValue> for StyleValue {
    fn from(v: AnimatedValue) -> Self {
        Self::Animated(v)
    }
}

impl From<SourceSpec> for StyleValue {
    fn from(v: SourceSpec) -> Self {
        Self::Source(v)
    }
}

/// Unvalidated property bag used as style input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleFragment {
    values: IndexMap<String, StyleValue>,
}

impl StyleFragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<StyleValue>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn as_part(&self) -> StylePart<'_> {
        StylePart::Fragment(self)
    }
}

/// One input to [`Style::compose`].
#[derive(Debug, Clone, Copy)]
pub enum StylePart<'a> {
    Fragment(&'a StyleFragment),
    Style(&'a Style),
}

impl<'a> From<&'a StyleFragment> for StylePart<'a> {
    fn from(f: &'a StyleFragment) -> Self {
        Self::Fragment(f)
    }
}

impl<'a> From<&'a Style> for StylePart<'a> {
    fn from(s: &'a Style) -> Self {
        Self::Style(s)
    }
}

// =============================================================================
// Hints and typed properties
// =============================================================================

bitflags! {
    /// Precomputed summaries checked during draw.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StyleHints: u8 {
        const HAS_BORDER = 1 << 0;
        const HAS_PADDING = 1 << 1;
        const HAS_BORDER_RADIUS = 1 << 2;
        /// No background, border or background image: nothing to paint.
        const LAYOUT_ONLY = 1 << 3;
        const ANIMATED = 1 << 4;
    }
}

/// Image anchoring along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectPosition {
    Point(f32),
    /// Fraction of the free space, 0.0 to 1.0.
    Percent(f32),
    /// Flush with the right edge.
    Right,
    /// Flush with the bottom edge.
    Bottom,
}

impl Default for ObjectPosition {
    fn default() -> Self {
        Self::Percent(0.5)
    }
}

impl ObjectPosition {
    fn parse(value: &StyleValue, horizontal: bool) -> Option<Self> {
        match value {
            StyleValue::Number(n) if n.is_finite() => Some(Self::Point(*n)),
            StyleValue::Text(s) => {
                if let Some(p) = s.strip_suffix('%') {
                    return p.trim().parse::<f32>().ok().map(|p| Self::Percent(p / 100.0));
                }
                match (s.as_str(), horizontal) {
                    ("left", true) | ("top", false) => Some(Self::Point(0.0)),
                    ("right", true) => Some(Self::Right),
                    ("bottom", false) => Some(Self::Bottom),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Offset of a `content` sized box inside `available` space.
    pub fn offset(self, available: f32, content: f32) -> f32 {
        match self {
            Self::Point(p) => p,
            Self::Percent(p) => (available - content) * p,
            Self::Right | Self::Bottom => available - content,
        }
    }
}

/// Paint-side properties extracted from the value map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderProps {
    pub color: Option<Color>,
    pub border_color: Option<Color>,
    pub background_color: Option<Color>,
    pub tint_color: Option<Color>,
    pub text_align: TextAlign,
    pub font_family: Option<String>,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_size: Option<f32>,
    pub line_height: Option<f32>,
    /// 0 means unlimited.
    pub max_lines: u32,
    pub text_overflow: TextOverflow,
    pub text_transform: TextTransform,
    pub object_fit: ObjectFit,
    pub object_position_x: ObjectPosition,
    pub object_position_y: ObjectPosition,
    pub border_radius: u32,
    pub background_clip: BackgroundClip,
    pub background_image: Option<SourceSpec>,
}

// =============================================================================
// Style
// =============================================================================

/// Immutable, validated style.
///
/// There are no setters: a changed style is a new `Style`. Equality compares
/// property values, so two styles built from the same fragments are equal
/// while remaining distinct instances.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    values: IndexMap<String, StyleValue>,
    hints: StyleHints,
    animated: Vec<String>,
    props: RenderProps,
}

impl Style {
    /// Build from a single fragment.
    pub fn new(fragment: StyleFragment) -> Result<Self, StyleError> {
        Self::from_values(fragment.values)
    }

    /// Merge fragments and styles in order, later keys winning.
    pub fn compose<'a>(parts: impl IntoIterator<Item = StylePart<'a>>) -> Result<Self, StyleError> {
        let mut values = IndexMap::new();
        for part in parts {
            let source = match part {
                StylePart::Fragment(f) => &f.values,
                StylePart::Style(s) => &s.values,
            };
            for (key, value) in source {
                values.insert(key.clone(), value.clone());
            }
        }
        Self::from_values(values)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_part(&self) -> StylePart<'_> {
        StylePart::Style(self)
    }

    fn from_values(mut values: IndexMap<String, StyleValue>) -> Result<Self, StyleError> {
        for (key, value) in values.iter_mut() {
            validate(key, value)?;
        }

        let props = render_props(&values);
        let animated: Vec<String> = values
            .iter()
            .filter(|(_, v)| matches!(v, StyleValue::Animated(_)))
            .map(|(k, _)| k.clone())
            .collect();

        let positive = |key: &str| match values.get(key) {
            Some(StyleValue::Animated(_)) => true,
            Some(StyleValue::Number(n)) => *n > 0.0,
            Some(StyleValue::Text(text)) => text
                .trim()
                .trim_end_matches('%')
                .parse::<f32>()
                .is_ok_and(|n| n > 0.0),
            _ => false,
        };
        let any = |keys: &[&str]| keys.iter().any(|k| positive(k));

        let mut hints = StyleHints::empty();
        if any(&["border", "borderLeft", "borderTop", "borderRight", "borderBottom"]) {
            hints |= StyleHints::HAS_BORDER;
        }
        if any(&["padding", "paddingLeft", "paddingTop", "paddingRight", "paddingBottom"]) {
            hints |= StyleHints::HAS_PADDING;
        }
        if props.border_radius > 0 {
            hints |= StyleHints::HAS_BORDER_RADIUS;
        }
        let paints_border = props.border_color.is_some() && hints.contains(StyleHints::HAS_BORDER);
        if props.background_color.is_none() && props.background_image.is_none() && !paints_border {
            hints |= StyleHints::LAYOUT_ONLY;
        }
        if !animated.is_empty() {
            hints |= StyleHints::ANIMATED;
        }

        Ok(Self {
            values,
            hints,
            animated,
            props,
        })
    }

    pub fn get(&self, key: &str) -> Option<&StyleValue> {
        self.values.get(key)
    }

    pub fn values(&self) -> impl Iterator<Item = (&String, &StyleValue)> {
        self.values.iter()
    }

    /// Numeric value of a property, read live for animated values.
    pub fn number(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(StyleValue::as_number)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn hints(&self) -> StyleHints {
        self.hints
    }

    pub fn has_border(&self) -> bool {
        self.hints.contains(StyleHints::HAS_BORDER)
    }

    pub fn has_padding(&self) -> bool {
        self.hints.contains(StyleHints::HAS_PADDING)
    }

    pub fn has_border_radius(&self) -> bool {
        self.hints.contains(StyleHints::HAS_BORDER_RADIUS)
    }

    pub fn is_layout_only(&self) -> bool {
        self.hints.contains(StyleHints::LAYOUT_ONLY)
    }

    /// Names of properties bound to [`AnimatedValue`]s.
    pub fn animated_properties(&self) -> &[String] {
        &self.animated
    }

    pub fn props(&self) -> &RenderProps {
        &self.props
    }

    /// Opacity in 0..=1, read live when animated.
    pub fn opacity(&self) -> f32 {
        self.number("opacity").map_or(1.0, |o| o.clamp(0.0, 1.0))
    }
}

// =============================================================================
// Validation
// =============================================================================

const COLOR_KEYS: &[&str] = &["color", "borderColor", "backgroundColor", "tintColor"];

fn validate(key: &str, value: &mut StyleValue) -> Result<(), StyleError> {
    if let Some(normalized) = normalize(key, value)? {
        *value = normalized;
    }
    Ok(())
}

/// Check one property. Returns a replacement when the stored form differs
/// from the input (colors packed, `maxLines: "none"` to 0, sources parsed).
fn normalize(key: &str, value: &StyleValue) -> Result<Option<StyleValue>, StyleError> {
    let fail = || StyleError::invalid(key, format!("{value:?}"));

    if COLOR_KEYS.contains(&key) {
        let color = match value {
            StyleValue::Color(c) => *c,
            StyleValue::Text(s) => Color::parse(s).ok_or_else(|| StyleError::invalid(key, s))?,
            StyleValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= 16_777_215.0 => {
                Color::from_rgb_int(*n as u32)
            }
            _ => return Err(fail()),
        };
        return Ok(Some(StyleValue::Color(color)));
    }

    let non_negative_int = |n: f32| n >= 0.0 && n.fract() == 0.0;

    match (key, value) {
        ("maxLines", StyleValue::Text(s)) if s == "none" => Ok(Some(StyleValue::Number(0.0))),
        ("maxLines", StyleValue::Number(n)) if non_negative_int(*n) => Ok(None),
        ("borderRadius", StyleValue::Number(n)) if non_negative_int(*n) => Ok(None),
        ("fontSize" | "lineHeight", StyleValue::Number(n)) if *n >= 0.0 => Ok(None),
        ("opacity", StyleValue::Number(n)) if (0.0..=1.0).contains(n) => Ok(None),
        ("borderRadius" | "opacity", StyleValue::Animated(_)) => Ok(None),
        ("fontFamily", StyleValue::Text(_)) => Ok(None),
        ("backgroundImage", StyleValue::Source(_)) => Ok(None),
        ("backgroundImage", StyleValue::Text(s)) if !s.is_empty() => {
            Ok(Some(StyleValue::Source(SourceSpec::from(s.as_str()))))
        }
        (
            "maxLines" | "borderRadius" | "fontSize" | "lineHeight" | "opacity" | "fontFamily"
            | "backgroundImage",
            _,
        ) => Err(fail()),
        ("objectPositionX" | "objectPositionY", _) => ObjectPosition::parse(value, key == "objectPositionX")
            .map(|_| None)
            .ok_or_else(fail),
        ("textAlign", _) => check_keyword(key, value, TextAlign::from_keyword),
        ("fontWeight", _) => check_keyword(key, value, FontWeight::from_keyword),
        ("fontStyle", _) => check_keyword(key, value, FontStyle::from_keyword),
        ("textOverflow", _) => check_keyword(key, value, TextOverflow::from_keyword),
        ("textTransform", _) => check_keyword(key, value, TextTransform::from_keyword),
        ("objectFit", _) => check_keyword(key, value, ObjectFit::from_keyword),
        ("backgroundClip", _) => check_keyword(key, value, BackgroundClip::from_keyword),
        _ => bindings::validate_property(key, value).map(|_| None),
    }
}

fn check_keyword<T>(
    key: &str,
    value: &StyleValue,
    parse: fn(&str) -> Option<T>,
) -> Result<Option<StyleValue>, StyleError> {
    value
        .as_str()
        .and_then(parse)
        .map(|_| None)
        .ok_or_else(|| StyleError::invalid(key, format!("{value:?}")))
}

fn render_props(values: &IndexMap<String, StyleValue>) -> RenderProps {
    let color = |key: &str| match values.get(key) {
        Some(StyleValue::Color(c)) => Some(*c),
        _ => None,
    };
    let text = |key: &str| values.get(key).and_then(StyleValue::as_str);
    let number = |key: &str| values.get(key).and_then(StyleValue::as_number);

    RenderProps {
        color: color("color"),
        border_color: color("borderColor"),
        background_color: color("backgroundColor"),
        tint_color: color("tintColor"),
        text_align: text("textAlign").and_then(TextAlign::from_keyword).unwrap_or_default(),
        font_family: text("fontFamily").map(str::to_string),
        font_weight: text("fontWeight").and_then(FontWeight::from_keyword).unwrap_or_default(),
        font_style: text("fontStyle").and_then(FontStyle::from_keyword).unwrap_or_default(),
        font_size: number("fontSize"),
        line_height: number("lineHeight"),
        max_lines: number("maxLines").map_or(0, |n| n as u32),
        text_overflow: text("textOverflow").and_then(TextOverflow::from_keyword).unwrap_or_default(),
        text_transform: text("textTransform")
            .and_then(TextTransform::from_keyword)
            .unwrap_or_default(),
        object_fit: text("objectFit").and_then(ObjectFit::from_keyword).unwrap_or_default(),
        object_position_x: values
            .get("objectPositionX")
            .and_then(|v| ObjectPosition::parse(v, true))
            .unwrap_or_default(),
        object_position_y: values
            .get("objectPositionY")
            .and_then(|v| ObjectPosition::parse(v, false))
            .unwrap_or_default(),
        border_radius: number("borderRadius").map_or(0, |n| n.max(0.0) as u32),
        background_clip: text("backgroundClip")
            .and_then(BackgroundClip::from_keyword)
            .unwrap_or_default(),
        background_image: match values.get("backgroundImage") {
            Some(StyleValue::Source(s)) => Some(s.clone()),
            _ => None,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_are_packed() {
        let style = Style::new(
            StyleFragment::new()
                .set("color", "#ff0000")
                .set("backgroundColor", 0x00ff00)
                .set("borderColor", Color::BLUE),
        )
        .unwrap();

        assert_eq!(style.props().color, Some(Color::RED));
        assert_eq!(style.props().background_color, Some(Color::rgb(0, 255, 0)));
        assert_eq!(style.get("borderColor"), Some(&StyleValue::Color(Color::BLUE)));
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(Style::new(StyleFragment::new().set("color", "nope")).is_err());
        assert!(Style::new(StyleFragment::new().set("borderRadius", 2.5)).is_err());
        assert!(Style::new(StyleFragment::new().set("maxLines", -1)).is_err());
        assert!(Style::new(StyleFragment::new().set("opacity", 2)).is_err());
        assert!(Style::new(StyleFragment::new().set("width", "wide")).is_err());

        let err = Style::new(StyleFragment::new().set("textAlign", "middle")).unwrap_err();
        let StyleError::Validation { property, .. } = err;
        assert_eq!(property, "textAlign");
    }

    #[test]
    fn test_unknown_properties_pass_through() {
        let style = Style::new(StyleFragment::new().set("rotate", "45deg")).unwrap();
        assert_eq!(style.get("rotate").and_then(StyleValue::as_str), Some("45deg"));
    }

    #[test]
    fn test_max_lines_none() {
        let style = Style::new(StyleFragment::new().set("maxLines", "none")).unwrap();
        assert_eq!(style.props().max_lines, 0);
        let style = Style::new(StyleFragment::new().set("maxLines", 3)).unwrap();
        assert_eq!(style.props().max_lines, 3);
    }

    #[test]
    fn test_compose_later_wins_and_revalidates() {
        let base = Style::new(StyleFragment::new().set("color", "red").set("width", 10)).unwrap();
        let overlay = StyleFragment::new().set("width", 20);
        let merged = Style::compose([base.as_part(), overlay.as_part()]).unwrap();

        assert_eq!(merged.number("width"), Some(20.0));
        assert_eq!(merged.props().color, Some(Color::RED));
    }

    #[test]
    fn test_identical_content_is_equal_but_distinct() {
        let a = Style::new(StyleFragment::new().set("width", 5)).unwrap();
        let b = Style::new(StyleFragment::new().set("width", 5)).unwrap();
        assert_eq!(a, b);
        assert!(!std::ptr::eq(&a, &b));
    }

    #[test]
    fn test_hints() {
        let style = Style::new(
            StyleFragment::new()
                .set("border", 2)
                .set("borderColor", "white")
                .set("padding", 4)
                .set("borderRadius", 6),
        )
        .unwrap();
        assert!(style.has_border());
        assert!(style.has_padding());
        assert!(style.has_border_radius());
        assert!(!style.is_layout_only());

        let plain = Style::new(StyleFragment::new().set("width", 100)).unwrap();
        assert!(plain.is_layout_only());
        assert!(!plain.has_border());

        let zero = Style::new(StyleFragment::new().set("padding", "0%")).unwrap();
        assert!(!zero.has_padding());
        let percent = Style::new(StyleFragment::new().set("padding", "10%")).unwrap();
        assert!(percent.has_padding());
    }

    #[test]
    fn test_animated_properties_tracked() {
        let opacity = AnimatedValue::new(0.5);
        let style = Style::new(
            StyleFragment::new()
                .set("opacity", opacity.clone())
                .set("height", AnimatedValue::new(3.0)),
        )
        .unwrap();

        assert!(style.hints().contains(StyleHints::ANIMATED));
        assert_eq!(style.animated_properties(), &["opacity".to_string(), "height".to_string()]);
        assert_eq!(style.opacity(), 0.5);
        opacity.set(0.25);
        assert_eq!(style.opacity(), 0.25);
    }

    #[test]
    fn test_object_position() {
        let style = Style::new(
            StyleFragment::new()
                .set("objectPositionX", "right")
                .set("objectPositionY", "25%"),
        )
        .unwrap();
        assert_eq!(style.props().object_position_x, ObjectPosition::Right);
        assert_eq!(style.props().object_position_y, ObjectPosition::Percent(0.25));
        assert_eq!(ObjectPosition::default().offset(100.0, 50.0), 25.0);

        assert!(Style::new(StyleFragment::new().set("objectPositionX", "bottom")).is_err());
    }

    #[test]
    fn test_background_image_source() {
        let style = Style::new(StyleFragment::new().set("backgroundImage", "bg.png")).unwrap();
        assert_eq!(
            style.props().background_image.as_ref().map(|s| s.uri.as_str()),
            Some("bg.png")
        );
        assert!(!style.is_layout_only());
    }
}
