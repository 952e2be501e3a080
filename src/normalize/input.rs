//! Typed views of the JSON input shapes.
//!
//! Untyped `image_data` / `gif_data` values are classified exactly once,
//! here, into [`InputFormat`] and [`AnimationInput`]. Everything downstream
//! matches on the enums.

use serde_json::Value;

use crate::error::{PmugError, Result};

/// A single image in one of the supported encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum InputFormat {
    /// Rows of `#RRGGBB` strings.
    HexGrid(Vec<Vec<String>>),
    /// Rows of `[r, g, b]` or `[r, g, b, a]` tuples.
    RgbGrid(Vec<Vec<Vec<i64>>>),
    /// Base64 encoded PNG/JPEG/... bytes.
    Base64Raster(String),
    /// Rows of indices into a palette of `#RRGGBB` strings.
    PaletteIndexed {
        palette: Vec<String>,
        pixels: Vec<Vec<i64>>,
    },
}

impl InputFormat {
    /// Classify an untyped JSON value.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(InputFormat::Base64Raster(s.clone())),
            Value::Array(_) => parse_grid(value, None),
            Value::Object(map) => {
                let pixels = map
                    .get("pixels")
                    .or_else(|| map.get("pixel_matrix"))
                    .ok_or_else(|| PmugError::Validation {
                        message: "Image object has no \"pixels\" field".to_string(),
                        help: Some(
                            "Use {\"palette\": [...], \"pixels\": [[...]]} for palette art"
                                .to_string(),
                        ),
                    })?;

                match map.get("palette") {
                    Some(palette) => {
                        let palette = parse_palette_entries(palette)?;
                        parse_grid(pixels, Some(&palette))
                    }
                    None => parse_grid(pixels, None),
                }
            }
            other => Err(PmugError::Validation {
                message: format!("Unsupported image data: {}", type_name(other)),
                help: Some(
                    "Send a hex grid, an RGB grid, a base64 string or a palette object"
                        .to_string(),
                ),
            }),
        }
    }

    /// Human-readable name of the encoding.
    pub fn name(&self) -> &'static str {
        match self {
            InputFormat::HexGrid(_) => "hex-grid",
            InputFormat::RgbGrid(_) => "rgb-grid",
            InputFormat::Base64Raster(_) => "base64-raster",
            InputFormat::PaletteIndexed { .. } => "palette-indexed",
        }
    }

    /// `(width, height)` implied by a grid: the first row's length and the
    /// row count. `None` for raster input, which has no intrinsic grid.
    pub fn grid_size(&self) -> Option<(u32, u32)> {
        fn size<T>(rows: &[Vec<T>]) -> (u32, u32) {
            let width = rows.first().map_or(0, Vec::len);
            (
                u32::try_from(width).unwrap_or(u32::MAX),
                u32::try_from(rows.len()).unwrap_or(u32::MAX),
            )
        }

        match self {
            InputFormat::HexGrid(rows) => Some(size(rows)),
            InputFormat::RgbGrid(rows) => Some(size(rows)),
            InputFormat::PaletteIndexed { pixels, .. } => Some(size(pixels)),
            InputFormat::Base64Raster(_) => None,
        }
    }
}

/// One frame of an animation as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// Caller-supplied sequence position, if any.
    pub index: Option<i64>,
    pub pixels: InputFormat,
    /// Display time in milliseconds; `None` means "use the frame delay".
    pub duration_ms: Option<i64>,
}

/// Animation input in one of the supported shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationInput {
    /// Explicit frames.
    Frames {
        frames: Vec<FrameInput>,
        frame_delay_ms: Option<i64>,
        loop_count: Option<i64>,
    },
    /// A base64 encoded GIF to be normalized onto the device canvas.
    EncodedGif(String),
}

impl AnimationInput {
    /// Classify an untyped JSON value.
    ///
    /// Accepts `{"frames": [...], "palette"?, "frame_delay"?, "loop_count"?}`,
    /// a bare array of frames, or a base64 GIF string.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(AnimationInput::EncodedGif(s.clone())),
            Value::Array(items) => Ok(AnimationInput::Frames {
                frames: parse_frames(items, None)?,
                frame_delay_ms: None,
                loop_count: None,
            }),
            Value::Object(map) => {
                let items = map
                    .get("frames")
                    .and_then(Value::as_array)
                    .ok_or_else(|| PmugError::Validation {
                        message: "Animation object has no \"frames\" array".to_string(),
                        help: Some("Use {\"frames\": [{\"pixels\": ..., \"duration\": 100}]}".to_string()),
                    })?;

                let palette = map.get("palette").map(parse_palette_entries).transpose()?;
                let frame_delay_ms = map
                    .get("frame_delay")
                    .map(|v| as_int(v, "frame_delay"))
                    .transpose()?;
                let loop_count = map
                    .get("loop_count")
                    .map(|v| as_int(v, "loop_count"))
                    .transpose()?;

                Ok(AnimationInput::Frames {
                    frames: parse_frames(items, palette.as_deref())?,
                    frame_delay_ms,
                    loop_count,
                })
            }
            other => Err(PmugError::Validation {
                message: format!("Unsupported animation data: {}", type_name(other)),
                help: Some("Send a frames object, a frame array or a base64 GIF".to_string()),
            }),
        }
    }
}

fn parse_frames(items: &[Value], palette: Option<&[String]>) -> Result<Vec<FrameInput>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => {
                let pixels = map
                    .get("pixels")
                    .or_else(|| map.get("pixel_matrix"))
                    .ok_or_else(|| {
                        PmugError::validation(format!("Frame {} has no \"pixels\" field", i))
                    })?;

                let frame_palette = match map.get("palette") {
                    Some(p) => Some(parse_palette_entries(p)?),
                    None => palette.map(<[String]>::to_vec),
                };

                let duration_ms = map
                    .get("duration")
                    .map(|v| as_int(v, "duration"))
                    .transpose()?;
                let index = map
                    .get("frame_index")
                    .map(|v| as_int(v, "frame_index"))
                    .transpose()?;

                Ok(FrameInput {
                    index,
                    pixels: parse_grid(pixels, frame_palette.as_deref())?,
                    duration_ms,
                })
            }
            Value::Array(_) => Ok(FrameInput {
                index: None,
                pixels: parse_grid(item, palette)?,
                duration_ms: None,
            }),
            other => Err(PmugError::validation(format!(
                "Frame {} is a {}, expected an object or a pixel grid",
                i,
                type_name(other)
            ))),
        })
        .collect()
}

/// Classify a 2D grid by the type of its first cell.
fn parse_grid(value: &Value, palette: Option<&[String]>) -> Result<InputFormat> {
    let rows = value.as_array().ok_or_else(|| {
        PmugError::validation(format!("Pixel grid is a {}, expected an array of rows", type_name(value)))
    })?;

    let first_cell = rows
        .iter()
        .filter_map(Value::as_array)
        .find_map(|row| row.first());

    match (first_cell, palette) {
        (Some(Value::Number(_)), Some(palette)) => Ok(InputFormat::PaletteIndexed {
            palette: palette.to_vec(),
            pixels: map_cells(rows, |v, y, x| as_int(v, &format!("pixel [{}][{}]", y, x)))?,
        }),
        (Some(Value::Number(_)), None) => Err(PmugError::Validation {
            message: "Grid contains palette indices but no palette was given".to_string(),
            help: Some("Add a \"palette\" list of #RRGGBB colours".to_string()),
        }),
        (Some(Value::Array(_)), _) => Ok(InputFormat::RgbGrid(map_cells(rows, |v, y, x| {
            let components = v.as_array().ok_or_else(|| {
                PmugError::validation(format!("Pixel [{}][{}] is not an RGB tuple", y, x))
            })?;
            components
                .iter()
                .map(|c| as_int(c, &format!("pixel [{}][{}] component", y, x)))
                .collect()
        })?)),
        _ => Ok(InputFormat::HexGrid(map_cells(rows, |v, y, x| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                PmugError::validation(format!("Pixel [{}][{}] is not a hex colour string", y, x))
            })
        })?)),
    }
}

fn map_cells<T>(
    rows: &[Value],
    mut f: impl FnMut(&Value, usize, usize) -> Result<T>,
) -> Result<Vec<Vec<T>>> {
    rows.iter()
        .enumerate()
        .map(|(y, row)| {
            let cells = row
                .as_array()
                .ok_or_else(|| PmugError::validation(format!("Row {} is not an array", y)))?;
            cells.iter().enumerate().map(|(x, v)| f(v, y, x)).collect()
        })
        .collect()
}

fn parse_palette_entries(value: &Value) -> Result<Vec<String>> {
    let entries = value.as_array().ok_or_else(|| {
        PmugError::validation(format!("Palette is a {}, expected an array", type_name(value)))
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str().map(str::to_string).ok_or_else(|| {
                PmugError::validation(format!("Palette entry {} is not a string", i))
            })
        })
        .collect()
}

fn as_int(value: &Value, what: &str) -> Result<i64> {
    value.as_i64().ok_or_else(|| {
        PmugError::validation(format!("{} must be an integer, got {}", what, value))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
