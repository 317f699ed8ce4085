//! Shared helpers for `prism-engine` integration tests.
//!
//! GPU tests run against a headless [`OffscreenContext`] and skip when the
//! machine has no usable adapter, unless `PRISM_REQUIRE_GPU` is set.

#![allow(dead_code)]

use prism_engine::RenderError;
use prism_engine::device::{OffscreenContext, OffscreenInit};
use prism_engine::paint::Color;
use prism_engine::render::Vertex;

pub fn require_gpu() -> bool {
    let Ok(raw) = std::env::var("PRISM_REQUIRE_GPU") else {
        return false;
    };

    let v = raw.trim();
    v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
}

pub fn skip_or_panic(test_name: &str, reason: &str) {
    if require_gpu() {
        panic!("PRISM_REQUIRE_GPU is enabled but {test_name} cannot run: {reason}");
    }
    eprintln!("skipping {test_name}: {reason}");
}

/// Headless context, or `None` (after logging) when no adapter is available.
pub fn offscreen(test_name: &str, init: OffscreenInit) -> Option<OffscreenContext> {
    match pollster::block_on(OffscreenContext::new(init)) {
        Ok(ctx) => Some(ctx),
        Err(RenderError::DeviceCreation(reason)) => {
            skip_or_panic(test_name, &reason);
            None
        }
        Err(err) => panic!("unexpected offscreen setup error: {err}"),
    }
}

pub fn triangle() -> Vec<Vertex> {
    vec![
        Vertex::new([0.0, 0.5, 0.0], Color::RED),
        Vertex::new([-0.5, -0.5, 0.0], Color::GREEN),
        Vertex::new([0.5, -0.5, 0.0], Color::BLUE),
    ]
}

/// Triangle confined to the left half of clip space.
pub fn left_triangle() -> Vec<Vertex> {
    vec![
        Vertex::new([-0.6, 0.4, 0.0], Color::WHITE),
        Vertex::new([-0.9, -0.4, 0.0], Color::WHITE),
        Vertex::new([-0.3, -0.4, 0.0], Color::WHITE),
    ]
}

/// RGBA8 pixel at `(x, y)` of a tightly packed `width`-wide readback.
pub fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

pub fn to_rgba8(color: Color) -> [u8; 4] {
    color.to_array().map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

pub fn assert_near(actual: [u8; 4], expected: [u8; 4]) {
    let close = actual
        .iter()
        .zip(expected.iter())
        .all(|(a, e)| a.abs_diff(*e) <= 2);
    assert!(close, "pixel {actual:?} is not close to {expected:?}");
}
