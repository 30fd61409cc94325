//! three.js typeface fonts
//!
//! A typeface file is JSON: a map of glyphs, each with an advance (`ha`) and
//! an outline string of whitespace-separated commands in font units:
//!
//! - `m x y` move to
//! - `l x y` line to
//! - `q x y cx cy` quadratic curve to (x, y) with control (cx, cy)
//! - `b x y c1x c1y c2x c2y` cubic curve to (x, y) with two controls
//!
//! Glyph outlines are scaled by `size / resolution` during layout.

use glam::Vec2;
use serde::Deserialize;
use std::collections::HashMap;

/// Glyph substituted for characters missing from the font
const FALLBACK_GLYPH: &str = "?";

fn default_resolution() -> f32 {
    1000.0
}

/// Font-unit bounding box of the whole face
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "xMin", default)]
    pub x_min: f32,
    #[serde(rename = "xMax", default)]
    pub x_max: f32,
    #[serde(rename = "yMin", default)]
    pub y_min: f32,
    #[serde(rename = "yMax", default)]
    pub y_max: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Glyph {
    /// Horizontal advance in font units
    pub ha: f32,
    #[serde(default)]
    pub x_min: f32,
    #[serde(default)]
    pub x_max: f32,
    /// Outline commands; absent for blank glyphs such as space
    #[serde(default)]
    pub o: Option<String>,
}

/// A parsed typeface font
#[derive(Debug, Clone, Deserialize)]
pub struct Typeface {
    pub glyphs: HashMap<String, Glyph>,
    #[serde(rename = "familyName", default)]
    pub family_name: String,
    #[serde(default = "default_resolution")]
    pub resolution: f32,
    #[serde(rename = "boundingBox", default)]
    pub bounding_box: BoundingBox,
    #[serde(rename = "underlineThickness", default)]
    pub underline_thickness: f32,
}

/// A single outline drawing command in layout space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlineCommand {
    MoveTo(Vec2),
    LineTo(Vec2),
    QuadTo { control: Vec2, to: Vec2 },
    CubicTo { control1: Vec2, control2: Vec2, to: Vec2 },
}

impl OutlineCommand {
    fn map(self, f: impl Fn(Vec2) -> Vec2) -> Self {
        match self {
            OutlineCommand::MoveTo(p) => OutlineCommand::MoveTo(f(p)),
            OutlineCommand::LineTo(p) => OutlineCommand::LineTo(f(p)),
            OutlineCommand::QuadTo { control, to } => OutlineCommand::QuadTo {
                control: f(control),
                to: f(to),
            },
            OutlineCommand::CubicTo {
                control1,
                control2,
                to,
            } => OutlineCommand::CubicTo {
                control1: f(control1),
                control2: f(control2),
                to: f(to),
            },
        }
    }
}

/// Errors produced while reading a typeface
#[derive(Debug)]
pub enum TypefaceError {
    /// The file is not valid typeface JSON
    Json(serde_json::Error),
    /// Outline contains a command letter other than m, l, q, b or z
    UnknownCommand(String),
    /// Outline ended in the middle of a command
    MissingCoordinate,
    /// A coordinate could not be parsed as a number
    InvalidNumber(String),
    /// Resolution must be positive to scale glyphs
    InvalidResolution(f32),
}

impl std::fmt::Display for TypefaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypefaceError::Json(error) => write!(f, "Invalid typeface JSON: {}", error),
            TypefaceError::UnknownCommand(cmd) => write!(f, "Unknown outline command '{}'", cmd),
            TypefaceError::MissingCoordinate => write!(f, "Outline command is missing coordinates"),
            TypefaceError::InvalidNumber(token) => {
                write!(f, "Invalid outline coordinate '{}'", token)
            }
            TypefaceError::InvalidResolution(resolution) => {
                write!(f, "Invalid typeface resolution {}", resolution)
            }
        }
    }
}

impl std::error::Error for TypefaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TypefaceError::Json(error) => Some(error),
            _ => None,
        }
    }
}

/// Parse a glyph outline string into commands (font units, unscaled)
pub fn parse_outline(outline: &str) -> Result<Vec<OutlineCommand>, TypefaceError> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();

    while let Some(token) = tokens.next() {
        let command = match token {
            "m" => OutlineCommand::MoveTo(next_point(&mut tokens)?),
            "l" => OutlineCommand::LineTo(next_point(&mut tokens)?),
            "q" => {
                let to = next_point(&mut tokens)?;
                let control = next_point(&mut tokens)?;
                OutlineCommand::QuadTo { control, to }
            }
            "b" => {
                let to = next_point(&mut tokens)?;
                let control1 = next_point(&mut tokens)?;
                let control2 = next_point(&mut tokens)?;
                OutlineCommand::CubicTo {
                    control1,
                    control2,
                    to,
                }
            }
            // Contours are closed implicitly by the next move
            "z" => continue,
            other => return Err(TypefaceError::UnknownCommand(other.to_string())),
        };
        commands.push(command);
    }

    Ok(commands)
}

fn next_number<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<f32, TypefaceError> {
    let token = tokens.next().ok_or(TypefaceError::MissingCoordinate)?;
    token
        .parse::<f32>()
        .map_err(|_| TypefaceError::InvalidNumber(token.to_string()))
}

fn next_point<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<Vec2, TypefaceError> {
    let x = next_number(tokens)?;
    let y = next_number(tokens)?;
    Ok(Vec2::new(x, y))
}

impl Typeface {
    pub fn from_json(json: &str) -> Result<Self, TypefaceError> {
        let typeface: Typeface = serde_json::from_str(json).map_err(TypefaceError::Json)?;
        if typeface.resolution <= 0.0 {
            return Err(TypefaceError::InvalidResolution(typeface.resolution));
        }
        Ok(typeface)
    }

    /// Look up a glyph, falling back to `?` for unknown characters
    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        let mut buf = [0u8; 4];
        self.glyphs
            .get(c.encode_utf8(&mut buf) as &str)
            .or_else(|| self.glyphs.get(FALLBACK_GLYPH))
    }

    /// Distance between baselines of consecutive lines at the given size
    pub fn line_height(&self, size: f32) -> f32 {
        let scale = size / self.resolution;
        (self.bounding_box.y_max - self.bounding_box.y_min + self.underline_thickness) * scale
    }

    /// Lay out `text` at `size` world units per em.
    ///
    /// Returns the outline commands of every glyph, already scaled and
    /// offset. Each glyph contour begins with a `MoveTo`. A newline starts a
    /// new line one line-height below.
    pub fn layout(&self, text: &str, size: f32) -> Result<Vec<OutlineCommand>, TypefaceError> {
        let scale = size / self.resolution;
        let line_height = self.line_height(size);

        let mut commands = Vec::new();
        let mut offset = Vec2::ZERO;

        for c in text.chars() {
            if c == '\n' {
                offset.x = 0.0;
                offset.y -= line_height;
                continue;
            }

            let Some(glyph) = self.glyph(c) else {
                log::warn!(
                    "Character '{}' is missing from font '{}'",
                    c,
                    self.family_name
                );
                continue;
            };

            if let Some(outline) = &glyph.o {
                let origin = offset;
                commands.extend(
                    parse_outline(outline)?
                        .into_iter()
                        .map(|command| command.map(|p| p * scale + origin)),
                );
            }

            offset.x += glyph.ha * scale;
        }

        Ok(commands)
    }
}
