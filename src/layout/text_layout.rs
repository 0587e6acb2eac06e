//! Greedy line breaking over a font sample.
//!
//! Lays a string out as a stream of glyph/space/newline quads plus one set of
//! alignment offsets per line. The result is cached until one of the inputs
//! changes, so a text view can measure during layout and draw afterwards with
//! a single pass.

use std::collections::HashMap;

use crate::platform::GlyphQuad;
use crate::types::{Rect, TextAlign};

const SPACE: char = ' ';
const DOT: char = '.';
const NEWLINE: char = '\n';
const ELLIPSIS: char = '\u{2026}';
const REPLACEMENT: char = '\u{FFFD}';
const QUESTION: char = '?';

// =============================================================================
// FONT SAMPLE
// =============================================================================

/// Placement of one codepoint in the font texture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CodepointMetrics {
    /// Region of the font texture holding the glyph.
    pub source: Rect,
    pub dest_width: f32,
    pub dest_height: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_advance: f32,
}

/// Glyph metrics of a font rendered at one pixel size, plus the pixels of
/// the glyph atlas they index into.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontSample {
    ascent: f32,
    line_height: f32,
    metrics: HashMap<char, CodepointMetrics>,
    kerning: HashMap<(char, char), f32>,
    pub atlas_width: u32,
    pub atlas_height: u32,
    pub atlas_pixels: Vec<u8>,
}

impl FontSample {
    pub fn new(ascent: f32, line_height: f32) -> Self {
        Self {
            ascent,
            line_height,
            ..Default::default()
        }
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn insert_glyph(&mut self, codepoint: char, metrics: CodepointMetrics) {
        self.metrics.insert(codepoint, metrics);
    }

    pub fn with_glyph(mut self, codepoint: char, metrics: CodepointMetrics) -> Self {
        self.insert_glyph(codepoint, metrics);
        self
    }

    pub fn set_kerning(&mut self, left: char, right: char, amount: f32) {
        self.kerning.insert((left, right), amount);
    }

    pub fn metrics(&self, codepoint: char) -> Option<&CodepointMetrics> {
        self.metrics.get(&codepoint)
    }

    pub fn kerning(&self, left: char, right: char) -> f32 {
        self.kerning
            .get(&(left, right))
            .copied()
            .unwrap_or(0.0)
    }

    fn fallback(&self) -> Option<&CodepointMetrics> {
        self.metrics(REPLACEMENT).or_else(|| self.metrics(QUESTION))
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quad {
    Glyph { metrics: CodepointMetrics, advance: f32 },
    Space(f32),
    NewLine,
}

#[derive(Debug, Clone, PartialEq)]
struct Inputs {
    text: String,
    max_lines: u32,
    ellipsize: bool,
    width: f32,
    height: f32,
    line_height: f32,
}

/// Laid out text. `width`/`height` of 0 mean unbounded, `max_lines` of 0
/// means no line limit.
#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    quads: Vec<Quad>,
    line_offsets: Vec<[f32; 3]>,
    measured: (f32, f32),
    inputs: Option<Inputs>,
}

impl TextLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached result; the next `layout` call recomputes.
    pub fn reset(&mut self) {
        self.quads.clear();
        self.line_offsets.clear();
        self.measured = (0.0, 0.0);
        self.inputs = None;
    }

    /// Measured size of the last layout.
    pub fn measured(&self) -> (f32, f32) {
        self.measured
    }

    pub fn line_count(&self) -> usize {
        self.line_offsets.len()
    }

    /// Horizontal offset of a line for the given alignment.
    pub fn line_offset(&self, line: usize, align: TextAlign) -> f32 {
        self.line_offsets
            .get(line)
            .map_or(0.0, |offsets| offsets[align.index()])
    }

    pub fn is_valid_for(&self, text: &str, max_lines: u32, ellipsize: bool, width: f32, height: f32) -> bool {
        self.inputs.as_ref().is_some_and(|i| {
            i.text == text
                && i.max_lines == max_lines
                && i.ellipsize == ellipsize
                && i.width == width
                && i.height == height
        })
    }

    /// Break `text` into lines and return the measured (width, height).
    pub fn layout(
        &mut self,
        text: &str,
        sample: &FontSample,
        max_lines: u32,
        ellipsize: bool,
        width: f32,
        height: f32,
    ) -> (f32, f32) {
        let line_height = sample.line_height();
        if let Some(inputs) = &self.inputs {
            if inputs.line_height == line_height && self.is_valid_for(text, max_lines, ellipsize, width, height) {
                return self.measured;
            }
        }

        self.quads.clear();
        self.line_offsets.clear();

        let ellipsis = sample
            .metrics(ELLIPSIS)
            .map(|m| (*m, 1u32))
            .or_else(|| sample.metrics(DOT).map(|m| (*m, 3u32)));
        let ellipsis_width = ellipsis.map_or(0.0, |(m, repeat)| m.x_advance * repeat as f32);
        let ellipsize = ellipsize && ellipsis.is_some();
        let space_advance = sample
            .metrics(SPACE)
            .or_else(|| sample.fallback())
            .map_or(0.0, |m| m.x_advance);

        let mut cursor = 0.0f32;
        let mut y = 0.0f32;
        let mut max_width = 0.0f32;
        // (quad index, cursor before that quad)
        let mut last_space: Option<(usize, f32)> = None;
        let mut ellipsis_at: Option<(usize, f32)> = None;
        let mut previous: Option<char> = None;

        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            let before = previous.replace(c);

            if c == NEWLINE {
                if self.can_advance(y, line_height, height, max_lines) {
                    self.push_line(width, cursor);
                    max_width = max_width.max(cursor);
                    last_space = None;
                    ellipsis_at = None;
                    cursor = 0.0;
                    y += line_height;
                    self.quads.push(Quad::NewLine);
                    continue;
                }
                cursor = self.ellipsize(ellipsize, ellipsis, ellipsis_at, cursor);
                break;
            }

            let Some(metrics) = sample.metrics(c).or_else(|| sample.fallback()).copied() else {
                continue;
            };

            if c == SPACE {
                if cursor == 0.0 || before == Some(SPACE) {
                    continue;
                }
                if width != 0.0 && cursor + space_advance > width {
                    if !self.can_advance(y, line_height, height, max_lines) {
                        cursor = self.ellipsize(ellipsize, ellipsis, ellipsis_at, cursor);
                        break;
                    }
                    self.push_line(width, cursor);
                    max_width = max_width.max(cursor);
                    last_space = None;
                    ellipsis_at = None;
                    cursor = 0.0;
                    y += line_height;
                    self.quads.push(Quad::NewLine);
                } else {
                    last_space = Some((self.quads.len(), cursor));
                    self.quads.push(Quad::Space(space_advance));
                    cursor += space_advance;
                }
                continue;
            }

            let mut advance = metrics.x_advance;

            if cursor > 0.0 && cursor + ellipsis_width <= width {
                ellipsis_at = Some((self.quads.len(), cursor));
            }

            if width != 0.0 && cursor + advance > width {
                if !self.can_advance(y, line_height, height, max_lines) {
                    cursor = self.ellipsize(ellipsize, ellipsis, ellipsis_at, cursor);
                    break;
                }
                match last_space.take() {
                    Some((index, space_cursor)) => {
                        self.push_line(width, space_cursor);
                        max_width = max_width.max(space_cursor);
                        cursor -= space_cursor + space_advance;
                        self.quads[index] = Quad::NewLine;
                        ellipsis_at = (cursor > 0.0 && cursor + ellipsis_width <= width)
                            .then_some((self.quads.len(), cursor));
                    }
                    None => {
                        self.push_line(width, cursor);
                        max_width = max_width.max(cursor);
                        cursor = 0.0;
                        ellipsis_at = None;
                        self.quads.push(Quad::NewLine);
                    }
                }
                y += line_height;
            }

            if let Some(&next) = chars.peek() {
                advance += sample.kerning(c, next);
            }
            cursor += advance;
            self.quads.push(Quad::Glyph { metrics, advance });
        }

        if cursor > 0.0 {
            self.push_line(width, cursor);
            max_width = max_width.max(cursor);
            y += line_height;
        }

        self.measured = (max_width.ceil(), y);
        self.inputs = Some(Inputs {
            text: text.to_string(),
            max_lines,
            ellipsize,
            width,
            height,
            line_height,
        });
        self.measured
    }

    /// Screen quads for the laid out glyphs, with `origin` the top-left of
    /// the content box.
    pub fn glyph_run(&self, sample: &FontSample, origin_x: f32, origin_y: f32, align: TextAlign) -> Vec<GlyphQuad> {
        let mut run = Vec::with_capacity(self.quads.len());
        let mut line = 0;
        let mut dx = self.line_offset(line, align);
        let mut dy = 0.0;

        for quad in &self.quads {
            match *quad {
                Quad::Glyph { metrics, advance } => {
                    run.push(GlyphQuad {
                        source: metrics.source,
                        dest: Rect::new(
                            origin_x + dx + metrics.x_offset,
                            origin_y + dy + sample.ascent() + metrics.y_offset,
                            metrics.dest_width,
                            metrics.dest_height,
                        ),
                    });
                    dx += advance;
                }
                Quad::Space(advance) => dx += advance,
                Quad::NewLine => {
                    line += 1;
                    dx = self.line_offset(line, align);
                    dy += sample.line_height();
                }
            }
        }
        run
    }

    fn can_advance(&self, y: f32, line_height: f32, height: f32, max_lines: u32) -> bool {
        let lines = self.line_offsets.len() as u32;
        (max_lines == 0 || lines + 1 < max_lines) && (height == 0.0 || y + 2.0 * line_height <= height)
    }

    fn push_line(&mut self, width: f32, line_width: f32) {
        self.line_offsets
            .push([0.0, (width - line_width) / 2.0, width - line_width]);
    }

    fn ellipsize(
        &mut self,
        enabled: bool,
        ellipsis: Option<(CodepointMetrics, u32)>,
        at: Option<(usize, f32)>,
        cursor: f32,
    ) -> f32 {
        let (Some((metrics, repeat)), Some((index, at_cursor))) = (ellipsis, at) else {
            return cursor;
        };
        if !enabled {
            return cursor;
        }
        self.quads.truncate(index);
        for _ in 0..repeat {
            self.quads.push(Quad::Glyph {
                metrics,
                advance: metrics.x_advance,
            });
        }
        at_cursor + metrics.x_advance * repeat as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(advance: f32) -> CodepointMetrics {
        CodepointMetrics {
            source: Rect::new(0.0, 0.0, advance, 10.0),
            dest_width: advance,
            dest_height: 10.0,
            x_advance: advance,
            ..Default::default()
        }
    }

    /// Every printable ascii glyph is 10 wide, lines are 20 high.
    fn mono() -> FontSample {
        let mut sample = FontSample::new(8.0, 20.0);
        for c in ' '..='~' {
            sample.insert_glyph(c, glyph(10.0));
        }
        sample.insert_glyph(ELLIPSIS, glyph(10.0));
        sample
    }

    #[test]
    fn test_single_line_unbounded() {
        let mut layout = TextLayout::new();
        assert_eq!(layout.layout("hello", &mono(), 0, false, 0.0, 0.0), (50.0, 20.0));
        assert_eq!(layout.line_count(), 1);
    }

    #[test]
    fn test_wraps_on_space() {
        let mut layout = TextLayout::new();
        let size = layout.layout("aaa bbb", &mono(), 0, false, 50.0, 0.0);
        assert_eq!(size, (30.0, 40.0));
        assert_eq!(layout.line_count(), 2);
        assert_eq!(layout.glyph_run(&mono(), 0.0, 0.0, TextAlign::Left).len(), 6);
    }

    #[test]
    fn test_exact_fit_does_not_wrap() {
        let mut layout = TextLayout::new();
        assert_eq!(layout.layout("ab", &mono(), 0, false, 20.0, 0.0), (20.0, 20.0));
    }

    #[test]
    fn test_leading_and_double_spaces_skipped() {
        let mut layout = TextLayout::new();
        assert_eq!(layout.layout("  a  b", &mono(), 0, false, 0.0, 0.0), (30.0, 20.0));
    }

    #[test]
    fn test_breaks_mid_word_without_space() {
        let mut layout = TextLayout::new();
        let size = layout.layout("abcdef", &mono(), 0, false, 30.0, 0.0);
        assert_eq!(size, (30.0, 40.0));
    }

    #[test]
    fn test_explicit_newline() {
        let mut layout = TextLayout::new();
        assert_eq!(layout.layout("ab\ncde", &mono(), 0, false, 0.0, 0.0), (30.0, 40.0));
        assert_eq!(layout.line_count(), 2);
    }

    #[test]
    fn test_max_lines_with_ellipsis() {
        let mut layout = TextLayout::new();
        let sample = mono();
        let size = layout.layout("aaaa bbbb cccc", &sample, 1, true, 50.0, 0.0);
        assert_eq!(size.1, 20.0);
        assert_eq!(layout.line_count(), 1);
        let run = layout.glyph_run(&sample, 0.0, 0.0, TextAlign::Left);
        // "aaaa" trimmed to fit the ellipsis inside 50
        assert!(run.len() <= 5);
        assert!(size.0 <= 50.0);
    }

    #[test]
    fn test_ellipsis_falls_back_to_dots() {
        let mut sample = FontSample::new(8.0, 20.0);
        for c in ['a', '.'] {
            sample.insert_glyph(c, glyph(5.0));
        }
        let mut layout = TextLayout::new();
        layout.layout("aaaaaaaaaaaa", &sample, 1, true, 30.0, 0.0);
        let run = layout.glyph_run(&sample, 0.0, 0.0, TextAlign::Left);
        assert_eq!(run.len(), 6);
    }

    #[test]
    fn test_height_limit() {
        let mut layout = TextLayout::new();
        let size = layout.layout("a b c d", &mono(), 0, false, 10.0, 40.0);
        assert_eq!(size.1, 40.0);
    }

    #[test]
    fn test_alignment_offsets() {
        let mut layout = TextLayout::new();
        layout.layout("ab", &mono(), 0, false, 100.0, 0.0);
        assert_eq!(layout.line_offset(0, TextAlign::Left), 0.0);
        assert_eq!(layout.line_offset(0, TextAlign::Center), 40.0);
        assert_eq!(layout.line_offset(0, TextAlign::Right), 80.0);

        let run = layout.glyph_run(&mono(), 5.0, 5.0, TextAlign::Right);
        assert_eq!(run[0].dest, Rect::new(85.0, 13.0, 10.0, 10.0));
    }

    #[test]
    fn test_missing_glyph_uses_fallback() {
        let mut sample = FontSample::new(8.0, 20.0).with_glyph('?', glyph(7.0));
        sample.insert_glyph('a', glyph(10.0));
        let mut layout = TextLayout::new();
        assert_eq!(layout.layout("a\u{4e2d}", &sample, 0, false, 0.0, 0.0), (17.0, 20.0));
    }

    #[test]
    fn test_kerning_applied() {
        let mut sample = mono();
        sample.set_kerning('A', 'V', -2.0);
        let mut layout = TextLayout::new();
        assert_eq!(layout.layout("AV", &sample, 0, false, 0.0, 0.0), (18.0, 20.0));
    }

    #[test]
    fn test_kerning_pairs_outside_bmp_are_distinct() {
        let mut sample = mono();
        sample.set_kerning('\u{1F600}', 'a', -3.0);
        assert_eq!(sample.kerning('\u{1F600}', 'a'), -3.0);
        assert_eq!(sample.kerning('\u{F600}', 'a'), 0.0);
    }

    #[test]
    fn test_cache_until_inputs_change() {
        let mut layout = TextLayout::new();
        layout.layout("abc", &mono(), 0, false, 0.0, 0.0);
        assert!(layout.is_valid_for("abc", 0, false, 0.0, 0.0));
        assert!(!layout.is_valid_for("abc", 0, false, 20.0, 0.0));
        layout.reset();
        assert!(!layout.is_valid_for("abc", 0, false, 0.0, 0.0));
    }
}
