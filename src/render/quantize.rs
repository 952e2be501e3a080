//! Colour quantization for indexed GIF frames.
//!
//! Device frames are small and usually pixel art, so quantization is exact
//! whenever a colour table can hold every colour. Only photographic input
//! falls through to lossy reduction.

use std::collections::{HashMap, HashSet};

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Maximum entries in a GIF colour table.
pub const MAX_TABLE_COLOURS: usize = 256;

/// NeuQuant sampling speed (1 = best, 30 = fastest).
const NEUQUANT_SPEED: i32 = 10;

/// How colour tables are assigned to animation frames.
///
/// `PerFrame` gives every frame its own local table. It is exact for small
/// frames but lets colours drift between frames when a frame needs lossy
/// reduction. `Shared` uses one global table for the whole animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PalettePolicy {
    #[default]
    PerFrame,
    Shared,
}

impl PalettePolicy {
    pub fn from_shared(shared: bool) -> Self {
        if shared {
            PalettePolicy::Shared
        } else {
            PalettePolicy::PerFrame
        }
    }
}

/// One frame mapped onto a colour table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrame {
    /// Flat RGB colour table; empty when the frame uses the global table.
    pub palette: Vec<u8>,
    /// One table index per pixel, row-major.
    pub indices: Vec<u8>,
}

/// Quantize each frame independently.
pub fn quantize_per_frame(frames: &[RgbImage]) -> Vec<IndexedFrame> {
    frames.iter().map(quantize_frame).collect()
}

/// Quantize all frames onto a single shared table.
///
/// Returns the flat RGB table and one index buffer per frame.
pub fn quantize_shared(frames: &[RgbImage]) -> (Vec<u8>, Vec<IndexedFrame>) {
    let table = exact_table(frames.iter()).unwrap_or_else(colour_cube);
    let lookup: HashMap<[u8; 3], u8> = table
        .iter()
        .enumerate()
        .map(|(i, c)| (*c, i as u8))
        .collect();

    let indexed = frames
        .iter()
        .map(|frame| IndexedFrame {
            palette: Vec::new(),
            indices: frame
                .pixels()
                .map(|p| match lookup.get(&p.0) {
                    Some(&i) => i,
                    None => nearest_index(p.0, &table),
                })
                .collect(),
        })
        .collect();

    (flatten(&table), indexed)
}

/// Quantize a single frame onto its own table.
pub fn quantize_frame(frame: &RgbImage) -> IndexedFrame {
    match exact_table(std::iter::once(frame)) {
        Some(table) => {
            let lookup: HashMap<[u8; 3], u8> = table
                .iter()
                .enumerate()
                .map(|(i, c)| (*c, i as u8))
                .collect();
            IndexedFrame {
                palette: flatten(&table),
                indices: frame.pixels().map(|p| lookup[&p.0]).collect(),
            }
        }
        None => {
            let quantized = gif::Frame::from_rgb_speed(
                frame.width() as u16,
                frame.height() as u16,
                frame.as_raw(),
                NEUQUANT_SPEED,
            );
            IndexedFrame {
                palette: quantized.palette.unwrap_or_default(),
                indices: quantized.buffer.into_owned(),
            }
        }
    }
}

/// Every distinct colour across `frames`, in first-seen order, or `None`
/// if there are more than a colour table can hold.
pub fn exact_table<'a>(frames: impl Iterator<Item = &'a RgbImage>) -> Option<Vec<[u8; 3]>> {
    let mut seen: HashSet<[u8; 3]> = HashSet::new();
    let mut table = Vec::new();

    for frame in frames {
        for pixel in frame.pixels() {
            if seen.insert(pixel.0) {
                if table.len() == MAX_TABLE_COLOURS {
                    return None;
                }
                table.push(pixel.0);
            }
        }
    }

    Some(table)
}

/// A 6×7×6 RGB cube (252 colours); green gets the extra level.
fn colour_cube() -> Vec<[u8; 3]> {
    let level = |i: u32, n: u32| (i * 255 / (n - 1)) as u8;
    let mut cube = Vec::with_capacity(6 * 7 * 6);
    for r in 0..6 {
        for g in 0..7 {
            for b in 0..6 {
                cube.push([level(r, 6), level(g, 7), level(b, 6)]);
            }
        }
    }
    cube
}

/// Index of the nearest table colour.
fn nearest_index(colour: [u8; 3], table: &[[u8; 3]]) -> u8 {
    let mut best_index = 0;
    let mut best_dist = u32::MAX;

    for (i, candidate) in table.iter().enumerate() {
        let dist = colour_distance(colour, *candidate);
        if dist < best_dist {
            best_dist = dist;
            best_index = i;
        }
    }

    best_index as u8
}

/// Weighted RGB distance (the "redmean" approximation), cheaper than a
/// perceptual colour space and close enough for LED output.
fn colour_distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    let rmean = (a[0] as i32 + b[0] as i32) / 2;
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;

    let r_weight = 2 + (rmean >> 8);
    let g_weight = 4;
    let b_weight = 2 + ((255 - rmean) >> 8);

    (r_weight * dr * dr + g_weight * dg * dg + b_weight * db * db) as u32
}

fn flatten(table: &[[u8; 3]]) -> Vec<u8> {
    table.iter().flatten().copied().collect()
}
