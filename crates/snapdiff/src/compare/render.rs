use image::{Rgba, RgbaImage};

use crate::canonical::ExtractError;
use crate::snapshot::Snapshot;

/// Difference visualization of `old` against `new`.
///
/// The canvas covers both inputs (max width x max height, max scale) and is
/// opaque black. `new` is drawn at the origin, then `old` on top with a
/// difference blend: unchanged pixels stay black, changed pixels light up in
/// proportion to their per-channel difference.
pub fn render(old: &Snapshot, new: &Snapshot) -> Result<Snapshot, ExtractError> {
    let old_px = old.raster()?.to_rgba8();
    let new_px = new.raster()?.to_rgba8();

    let width = old_px.width().max(new_px.width());
    let height = old_px.height().max(new_px.height());
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));

    for (x, y, src) in new_px.enumerate_pixels() {
        let dst = canvas.get_pixel_mut(x, y);
        blend(dst, src, |_, s| s);
    }
    for (x, y, src) in old_px.enumerate_pixels() {
        let dst = canvas.get_pixel_mut(x, y);
        blend(dst, src, |d, s| d.abs_diff(s));
    }

    Ok(Snapshot::new(canvas, old.scale().max(new.scale())))
}

/// Composite straight-alpha `src` onto the opaque `dst` through `mode`.
fn blend(dst: &mut Rgba<u8>, src: &Rgba<u8>, mode: impl Fn(u8, u8) -> u8) {
    let alpha = src[3] as u32;
    for c in 0..3 {
        let d = dst[c] as u32;
        let mixed = mode(dst[c], src[c]) as u32;
        dst[c] = ((d * (255 - alpha) + mixed * alpha + 127) / 255) as u8;
    }
}
