//! Core value types for small-screen.
//!
//! Colors, geometry and the keyword enums shared by styles, layout and drawing.
//! Everything here is plain data: `Copy`, comparable, and free of engine state.

// =============================================================================
// Color
// =============================================================================

/// Packed 32-bit ARGB color.
///
/// Using a single integer keeps comparisons exact and lets the graphics
/// backend consume the value without conversion. Opaque colors carry
/// alpha 0xFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    pub const TRANSPARENT: Self = Self(0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(255, 0, 0);
    pub const GREEN: Self = Self::rgb(0, 128, 0);
    pub const BLUE: Self = Self::rgb(0, 0, 255);

    /// Create an opaque color from 8-bit channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Create a color from 8-bit channels including alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Create an opaque color from a 0xRRGGBB integer.
    ///
    /// ```
    /// use small_screen::types::Color;
    ///
    /// assert_eq!(Color::from_rgb_int(0xff0000), Color::rgb(255, 0, 0));
    /// ```
    pub const fn from_rgb_int(rgb: u32) -> Self {
        Self(0xFF00_0000 | (rgb & 0x00FF_FFFF))
    }

    #[inline]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn a(self) -> u8 {
        (self.0 >> 24) as u8
    }

    #[inline]
    pub const fn is_opaque(self) -> bool {
        self.a() == 255
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.a() == 0
    }

    /// Same color with a different alpha channel.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r(), self.g(), self.b(), a)
    }

    /// Linear interpolation between two colors.
    pub fn lerp(from: Self, to: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;

        Self::rgba(
            mix(from.r(), to.r()),
            mix(from.g(), to.g()),
            mix(from.b(), to.b()),
            mix(from.a(), to.a()),
        )
    }

    /// Parse hex color string (#RGB, #RGBA, #RRGGBB, #RRGGBBAA).
    ///
    /// ```
    /// use small_screen::types::Color;
    ///
    /// assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
    /// assert_eq!(Color::from_hex("#ff000080"), Some(Color::rgba(255, 0, 0, 128)));
    /// assert!(Color::from_hex("#gg0000").is_none());
    /// ```
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;

        fn hex_digit(c: u8) -> Option<u8> {
            match c {
                b'0'..=b'9' => Some(c - b'0'),
                b'a'..=b'f' => Some(c - b'a' + 10),
                b'A'..=b'F' => Some(c - b'A' + 10),
                _ => None,
            }
        }

        fn hex_byte(s: &[u8], i: usize) -> Option<u8> {
            Some((hex_digit(s[i])? << 4) | hex_digit(s[i + 1])?)
        }

        fn short(s: &[u8], i: usize) -> Option<u8> {
            let d = hex_digit(s[i])?;
            Some((d << 4) | d)
        }

        let bytes = hex.as_bytes();
        match bytes.len() {
            3 => Some(Self::rgb(short(bytes, 0)?, short(bytes, 1)?, short(bytes, 2)?)),
            4 => Some(Self::rgba(
                short(bytes, 0)?,
                short(bytes, 1)?,
                short(bytes, 2)?,
                short(bytes, 3)?,
            )),
            6 => Some(Self::rgb(
                hex_byte(bytes, 0)?,
                hex_byte(bytes, 2)?,
                hex_byte(bytes, 4)?,
            )),
            8 => Some(Self::rgba(
                hex_byte(bytes, 0)?,
                hex_byte(bytes, 2)?,
                hex_byte(bytes, 4)?,
                hex_byte(bytes, 6)?,
            )),
            _ => None,
        }
    }

    /// Parse `rgb(r, g, b)` or `rgba(r, g, b, a)` where `a` is 0-1.
    fn from_function(input: &str) -> Option<Self> {
        let (name, rest) = input.split_once('(')?;
        let args = rest.strip_suffix(')')?;
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();

        let channel = |s: &str| -> Option<u8> {
            let v = s.parse::<f32>().ok()?;
            (0.0..=255.0).contains(&v).then_some(v as u8)
        };

        match (name.trim(), parts.as_slice()) {
            ("rgb", [r, g, b]) => Some(Self::rgb(channel(r)?, channel(g)?, channel(b)?)),
            ("rgba", [r, g, b, a]) => {
                let a = a.parse::<f32>().ok()?;
                if !(0.0..=1.0).contains(&a) {
                    return None;
                }
                Some(Self::rgba(
                    channel(r)?,
                    channel(g)?,
                    channel(b)?,
                    (a * 255.0).round() as u8,
                ))
            }
            _ => None,
        }
    }

    /// Parse any supported color format.
    ///
    /// Supports hex, `rgb()`/`rgba()`, `transparent` and a basic set of
    /// named colors.
    ///
    /// ```
    /// use small_screen::types::Color;
    ///
    /// assert_eq!(Color::parse("blue"), Some(Color::BLUE));
    /// assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::RED));
    /// assert!(Color::parse("not-a-color").is_none());
    /// ```
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if input.starts_with('#') {
            return Self::from_hex(input);
        }

        let lower = input.to_ascii_lowercase();
        if lower.contains('(') {
            return Self::from_function(&lower);
        }

        named_color(&lower)
    }
}

fn named_color(name: &str) -> Option<Color> {
    let rgb = match name {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => 0x000000,
        "white" => 0xffffff,
        "red" => 0xff0000,
        "green" => 0x008000,
        "lime" => 0x00ff00,
        "blue" => 0x0000ff,
        "yellow" => 0xffff00,
        "cyan" | "aqua" => 0x00ffff,
        "magenta" | "fuchsia" => 0xff00ff,
        "gray" | "grey" => 0x808080,
        "silver" => 0xc0c0c0,
        "maroon" => 0x800000,
        "olive" => 0x808000,
        "navy" => 0x000080,
        "purple" => 0x800080,
        "teal" => 0x008080,
        "orange" => 0xffa500,
        "pink" => 0xffc0cb,
        _ => return None,
    };
    Some(Color::from_rgb_int(rgb))
}

// =============================================================================
// Dimension
// =============================================================================

/// A layout length: absolute points, percentage of the parent, or auto.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Points(f32),
    /// Percentage of parent size (0-100).
    Percent(f32),
}

impl Dimension {
    /// Parse a textual dimension: `"auto"`, `"50%"` or a plain number.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input == "auto" {
            return Some(Self::Auto);
        }
        if let Some(percent) = input.strip_suffix('%') {
            return percent.trim().parse::<f32>().ok().filter(|v| v.is_finite()).map(Self::Percent);
        }
        input.parse::<f32>().ok().filter(|v| v.is_finite()).map(Self::Points)
    }
}

impl From<f32> for Dimension {
    fn from(value: f32) -> Self {
        Self::Points(value)
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Axis-aligned rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Move the rect by an offset.
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Shrink the rect by per-edge insets.
    pub fn inset(self, edges: Edges) -> Self {
        Self {
            x: self.x + edges.left,
            y: self.y + edges.top,
            width: (self.width - edges.left - edges.right).max(0.0),
            height: (self.height - edges.top - edges.bottom).max(0.0),
        }
    }

    /// Compute intersection of two rects.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        (x2 > x1 && y2 > y1).then(|| Rect::new(x1, y1, x2 - x1, y2 - y1))
    }
}

/// Per-edge values (border widths, padding, insets).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Edges {
    pub const ZERO: Self = Self::all(0.0);

    pub const fn all(value: f32) -> Self {
        Self {
            left: value,
            top: value,
            right: value,
            bottom: value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.left == 0.0 && self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0
    }
}

// =============================================================================
// Keyword enums
// =============================================================================

/// Implements `from_keyword` / `keyword` for a style enum.
macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $($kw:literal)|+),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            /// Look up a style keyword.
            pub fn from_keyword(keyword: &str) -> Option<Self> {
                match keyword {
                    $($($kw)|+ => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Canonical keyword for this value.
            pub fn keyword(self) -> &'static str {
                match self {
                    $(Self::$variant => keyword_enum!(@first $($kw)|+),)+
                }
            }
        }
    };
    (@first $first:literal $(| $rest:literal)*) => { $first };
}

keyword_enum! {
    /// Flex direction for container layout. Column is the default, as on
    /// embedded flexbox engines.
    FlexDirection {
        Column => "column",
        ColumnReverse => "column-reverse",
        Row => "row",
        RowReverse => "row-reverse",
    }
}

keyword_enum! {
    FlexWrap {
        NoWrap => "no-wrap" | "nowrap",
        Wrap => "wrap",
        WrapReverse => "wrap-reverse",
    }
}

keyword_enum! {
    JustifyContent {
        FlexStart => "flex-start",
        Center => "center",
        FlexEnd => "flex-end",
        SpaceBetween => "space-between",
        SpaceAround => "space-around",
        SpaceEvenly => "space-evenly",
    }
}

keyword_enum! {
    /// Shared keyword set for align-items, align-self and align-content.
    Align {
        Auto => "auto",
        FlexStart => "flex-start",
        Center => "center",
        FlexEnd => "flex-end",
        Stretch => "stretch",
        Baseline => "baseline",
        SpaceBetween => "space-between",
        SpaceAround => "space-around",
        SpaceEvenly => "space-evenly",
    }
}

keyword_enum! {
    Display {
        Flex => "flex",
        None => "none",
    }
}

keyword_enum! {
    Overflow {
        Visible => "visible",
        Hidden => "hidden",
        Scroll => "scroll",
    }
}

keyword_enum! {
    PositionType {
        Relative => "relative" | "static",
        Absolute => "absolute",
    }
}

keyword_enum! {
    TextAlign {
        Left => "left",
        Center => "center",
        Right => "right",
    }
}

keyword_enum! {
    TextOverflow {
        Clip => "clip",
        Ellipsis => "ellipsis",
    }
}

keyword_enum! {
    FontWeight {
        Normal => "normal",
        Bold => "bold",
    }
}

keyword_enum! {
    FontStyle {
        Normal => "normal",
        Italic => "italic",
    }
}

keyword_enum! {
    TextTransform {
        None => "none",
        Lowercase => "lowercase",
        Uppercase => "uppercase",
    }
}

keyword_enum! {
    ObjectFit {
        Fill => "fill",
        Contain => "contain",
        Cover => "cover",
        None => "none",
        ScaleDown => "scale-down",
    }
}

keyword_enum! {
    BackgroundClip {
        BorderBox => "border-box",
        PaddingBox => "padding-box",
    }
}

impl TextAlign {
    /// Index into a per-line alignment offset table.
    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }
}

impl TextTransform {
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::None => text.to_string(),
            Self::Lowercase => text.to_lowercase(),
            Self::Uppercase => text.to_uppercase(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_packing() {
        let c = Color::rgba(0x11, 0x22, 0x33, 0x44);
        assert_eq!(c.0, 0x4411_2233);
        assert_eq!((c.r(), c.g(), c.b(), c.a()), (0x11, 0x22, 0x33, 0x44));
        assert!(Color::WHITE.is_opaque());
        assert!(Color::TRANSPARENT.is_transparent());
    }

    #[test]
    fn test_color_from_hex_formats() {
        assert_eq!(Color::from_hex("#FFFFFF"), Some(Color::from_rgb_int(0xFFFFFF)));
        assert_eq!(Color::from_hex("#FFF"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("#FFFFFFDD").map(|c| c.0), Some(0xDDFF_FFFF));
        assert_eq!(Color::from_hex("#FFFD").map(|c| c.0), Some(0xDDFF_FFFF));
    }

    #[test]
    fn test_color_from_hex_invalid() {
        assert!(Color::from_hex("ffffff").is_none());
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#zzz").is_none());
        assert!(Color::from_hex("#").is_none());
    }

    #[test]
    fn test_color_parse_functions() {
        assert_eq!(Color::parse("rgb(0, 0, 255)"), Some(Color::BLUE));
        assert_eq!(Color::parse("RGBA(255, 0, 0, 0.5)"), Some(Color::rgba(255, 0, 0, 128)));
        assert!(Color::parse("rgb(300, 0, 0)").is_none());
        assert!(Color::parse("rgba(0, 0, 0, 2)").is_none());
        assert!(Color::parse("rgb(1, 2)").is_none());
    }

    #[test]
    fn test_color_parse_keywords() {
        assert_eq!(Color::parse("transparent"), Some(Color::TRANSPARENT));
        assert_eq!(Color::parse("  White "), Some(Color::WHITE));
        assert!(Color::parse("").is_none());
        assert!(Color::parse("blurple").is_none());
    }

    #[test]
    fn test_color_lerp() {
        let mid = Color::lerp(Color::BLACK, Color::WHITE, 0.5);
        assert_eq!(mid.r(), 128);
        assert_eq!(Color::lerp(Color::BLACK, Color::WHITE, 2.0), Color::WHITE);
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!(Dimension::parse("auto"), Some(Dimension::Auto));
        assert_eq!(Dimension::parse("50%"), Some(Dimension::Percent(50.0)));
        assert_eq!(Dimension::parse("12"), Some(Dimension::Points(12.0)));
        assert_eq!(Dimension::parse("wide"), None);
        assert_eq!(Dimension::parse("%"), None);
    }

    #[test]
    fn test_rect_intersect_and_inset() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersect(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert_eq!(a.intersect(&Rect::new(20.0, 0.0, 1.0, 1.0)), None);

        let inner = a.inset(Edges { left: 1.0, top: 2.0, right: 3.0, bottom: 4.0 });
        assert_eq!(inner, Rect::new(1.0, 2.0, 6.0, 4.0));
    }

    #[test]
    fn test_keyword_enums() {
        assert_eq!(FlexDirection::default(), FlexDirection::Column);
        assert_eq!(FlexDirection::from_keyword("row-reverse"), Some(FlexDirection::RowReverse));
        assert_eq!(FlexWrap::from_keyword("nowrap"), Some(FlexWrap::NoWrap));
        assert_eq!(FlexWrap::NoWrap.keyword(), "no-wrap");
        assert_eq!(ObjectFit::from_keyword("scale-down"), Some(ObjectFit::ScaleDown));
        assert_eq!(TextOverflow::from_keyword("fade"), None);
        assert_eq!(TextAlign::Right.index(), 2);
    }

    #[test]
    fn test_text_transform() {
        assert_eq!(TextTransform::Uppercase.apply("Hello"), "HELLO");
        assert_eq!(TextTransform::Lowercase.apply("Hello"), "hello");
        assert_eq!(TextTransform::None.apply("Hello"), "Hello");
    }
}
