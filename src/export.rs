//! Writing captured frames to disk.
//!
//! Frame stacks use a small binary layout:
//! 4 magic bytes, then frame count, width and height as little-endian
//! `u32`, then every frame's pixels as one byte each, row-major.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};
use tracing::{info, warn};

use crate::raster::{Frame, FrameStack};
use crate::Error;

const MAGIC: &[u8; 4] = b"RDKF";
// magic + frame count + width + height
const HEADER_SIZE: usize = 4 + 3 * 4;

fn export_err(path: &Path, what: &str) -> Error {
    Error::Export(format!("{}: {}", path.display(), what))
}

pub fn encode_stack(stack: &FrameStack) -> Vec<u8> {
    let frame_size = stack.width() * stack.height();
    let mut buf = Vec::with_capacity(HEADER_SIZE + stack.len() * frame_size);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&(stack.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(stack.width() as u32).to_le_bytes());
    buf.extend_from_slice(&(stack.height() as u32).to_le_bytes());
    for frame in stack {
        buf.extend_from_slice(&frame.to_bytes());
    }
    buf
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let bytes: [u8; 4] = [
        data[offset], data[offset + 1],
        data[offset + 2], data[offset + 3],
    ];
    u32::from_le_bytes(bytes)
}

pub fn write_stack(path: &Path, stack: &FrameStack) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let blank = stack.iter().filter(|f| f.peak() == 0.0).count();
    if blank == stack.len() && !stack.is_empty() {
        warn!(path = %path.display(), "every frame in the stack is blank");
    }
    fs::write(path, encode_stack(stack))?;
    info!(path = %path.display(), frames = stack.len(), "wrote frame stack");
    Ok(())
}

pub fn read_stack(path: &Path) -> crate::Result<FrameStack> {
    let data = fs::read(path)?;
    if data.len() < HEADER_SIZE {
        return Err(export_err(path, "file shorter than header"));
    }
    if &data[0..4] != MAGIC {
        return Err(export_err(path, "not a frame stack"));
    }
    let count = read_u32(&data, 4) as usize;
    let width = read_u32(&data, 8) as usize;
    let height = read_u32(&data, 12) as usize;
    let (frame_size, expected) = width
        .checked_mul(height)
        .and_then(|frame_size| {
            let body = count.checked_mul(frame_size)?;
            Some((frame_size, body.checked_add(HEADER_SIZE)?))
        })
        .ok_or_else(|| export_err(path, "header sizes overflow"))?;
    if data.len() != expected {
        return Err(export_err(
            path,
            &format!("expected {} frames of {}x{}, got {} bytes", count, width, height, data.len()),
        ));
    }

    let mut stack = FrameStack::with_capacity(width, height, count);
    let mut offset = HEADER_SIZE;
    for _ in 0..count {
        let pixels = data[offset..offset + frame_size].iter().map(|&b| b as f32).collect();
        offset += frame_size;
        let frame = Frame::from_pixels(width, height, pixels)
            .ok_or_else(|| export_err(path, "frame size mismatch"))?;
        stack.push(frame);
    }
    Ok(stack)
}

/// One binary PGM (`P5`) per frame, `{prefix}_{index:04}.pgm` inside `dir`.
pub fn write_pgm_sequence(dir: &Path, prefix: &str, stack: &FrameStack) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(stack.len());
    for (index, frame) in stack.iter().enumerate() {
        let path = dir.join(format!("{}_{:04}.pgm", prefix, index));
        let image = GrayImage::from_raw(frame.width() as u32, frame.height() as u32, frame.to_bytes())
            .ok_or_else(|| export_err(&path, "frame does not fit its dimensions"))?;
        image
            .save_with_format(&path, ImageFormat::Pnm)
            .map_err(|e| export_err(&path, &e.to_string()))?;
        paths.push(path);
    }
    info!(dir = %dir.display(), frames = paths.len(), "wrote pgm sequence");
    Ok(paths)
}

/// File name for one trial's stack.
pub fn trial_file_name(index: usize, direction: f64) -> String {
    format!("trial_{:03}_{:03}.rdkf", index, direction.round() as i64)
}
