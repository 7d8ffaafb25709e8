//! On-disk texture layout and the patch/decode operations.
//!
//! A texture occupies `width*height` index bytes (one palette index per
//! pixel, row-major) immediately followed by a fixed 768-byte palette
//! region of 256 interleaved R,G,B triples. Patching never changes the
//! buffer length and never touches bytes outside that region.

use crate::error::{Error, Result};
use crate::quant;
use crate::raster::{Raster, RGBA};
use arrayvec::ArrayVec;
use rgb::RGB8;
use std::iter;

pub const PALETTE_LEN: usize = 256;
pub const PALETTE_BYTES: usize = PALETTE_LEN * 3;

pub type Palette = ArrayVec<RGB8, PALETTE_LEN>;

/// Location and dimensions of one texture inside a model buffer.
#[derive(Clone, Debug)]
pub struct TextureDesc {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// Absolute offset of the index plane within the model buffer.
    pub offset: usize,
}

impl TextureDesc {
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Total bytes occupied: index plane plus the fixed palette region.
    #[inline]
    pub fn region_len(&self) -> usize {
        self.pixel_count() + PALETTE_BYTES
    }

    pub fn check_bounds(&self, buf_len: usize) -> Result<()> {
        let end = self
            .offset
            .checked_add(self.region_len())
            .ok_or(Error::Range {
                offset: self.offset,
                end: usize::MAX,
                len: buf_len,
            })?;
        if end > buf_len {
            return Err(Error::Range {
                offset: self.offset,
                end,
                len: buf_len,
            });
        }
        Ok(())
    }
}

/// Maps every pixel to its nearest palette entry by squared RGB distance.
/// Alpha is ignored. Ties go to the lowest index, and an exact match ends
/// the search early.
pub fn map_pixels(raster: &Raster, palette: &Palette) -> Vec<u8> {
    debug_assert!(!palette.is_empty());
    let mut indices = Vec::with_capacity(raster.pixels().len());
    for p in raster.pixels() {
        let mut best = 0u8;
        let mut best_dist = i32::MAX;
        for (i, c) in palette.iter().enumerate() {
            let dr = p.r as i32 - c.r as i32;
            let dg = p.g as i32 - c.g as i32;
            let db = p.b as i32 - c.b as i32;
            let dist = dr * dr + dg * dg + db * db;
            if dist < best_dist {
                best_dist = dist;
                best = i as u8;
                if dist == 0 {
                    break;
                }
            }
        }
        indices.push(best);
    }
    indices
}

/// Quantizes a raster of exactly the texture's dimensions and writes it
/// into a copy of the model buffer. The input buffer is never mutated and
/// no byte outside the texture region changes.
pub fn patch_texture(buf: &[u8], desc: &TextureDesc, raster: &Raster) -> Result<Vec<u8>> {
    desc.check_bounds(buf.len())?;
    if (raster.width(), raster.height()) != (desc.width, desc.height) {
        return Err(Error::Raster(format!(
            "raster is {}x{} but texture {:?} is {}x{}",
            raster.width(),
            raster.height(),
            desc.name,
            desc.width,
            desc.height
        )));
    }

    let sample = raster.sample_for_palette();
    let palette = quant::build_palette(&sample);
    let indices = map_pixels(raster, &palette);

    let mut out = buf.to_vec();
    write_texture(&mut out, desc, &indices, &palette);
    Ok(out)
}

fn write_texture(buf: &mut [u8], desc: &TextureDesc, indices: &[u8], palette: &Palette) {
    let pal_off = desc.offset + desc.pixel_count();
    buf[desc.offset..pal_off].copy_from_slice(indices);

    let black = RGB8::new(0, 0, 0);
    let colors = palette.iter().copied().chain(iter::repeat(black));
    for (slot, color) in buf[pal_off..pal_off + PALETTE_BYTES]
        .chunks_exact_mut(3)
        .zip(colors)
    {
        slot[0] = color.r;
        slot[1] = color.g;
        slot[2] = color.b;
    }
}

/// Reconstructs a texture's RGBA raster from the model buffer, for
/// previews and extraction. Every pixel comes out fully opaque. The
/// palette region always holds a full 256 entries, so an index byte can
/// never be out of range here.
pub fn decode_texture(buf: &[u8], desc: &TextureDesc) -> Result<Raster> {
    desc.check_bounds(buf.len())?;
    let pal_off = desc.offset + desc.pixel_count();
    let indices = &buf[desc.offset..pal_off];
    let pal = &buf[pal_off..pal_off + PALETTE_BYTES];
    let pixels = indices
        .iter()
        .map(|&i| {
            let j = i as usize * 3;
            RGBA::new(pal[j], pal[j + 1], pal[j + 2], 255)
        })
        .collect();
    Raster::new(desc.width, desc.height, pixels)
}

/// The full replacement pipeline: decode the image bytes, resample to the
/// texture's dimensions, quantize and patch.
pub fn replace_texture(buf: &[u8], desc: &TextureDesc, image_bytes: &[u8]) -> Result<Vec<u8>> {
    desc.check_bounds(buf.len())?;
    let raster = Raster::decode(image_bytes)?.resized(desc.width, desc.height)?;
    patch_texture(buf, desc, &raster)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: RGBA = RGBA {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
    const WHITE: RGBA = RGBA {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    fn desc(width: u32, height: u32, offset: usize) -> TextureDesc {
        TextureDesc {
            name: "test".into(),
            width,
            height,
            offset,
        }
    }

    fn checkerboard(width: u32, height: u32) -> Raster {
        let pixels = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| if (x + y) % 2 == 0 { BLACK } else { WHITE })
            })
            .collect();
        Raster::new(width, height, pixels).unwrap()
    }

    /// Buffer with a non-repeating byte pattern so shifted writes show up.
    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn palette_of(colors: &[RGB8]) -> Palette {
        colors.iter().copied().collect()
    }

    #[test]
    fn patch_preserves_length() {
        let raster = checkerboard(4, 4);
        let d = desc(4, 4, 100);
        let buf = patterned(2000);
        let out = patch_texture(&buf, &d, &raster).unwrap();
        assert_eq!(out.len(), buf.len());
    }

    #[test]
    fn patch_leaves_outside_bytes_untouched() {
        let raster = checkerboard(4, 4);
        let d = desc(4, 4, 100);
        let buf = patterned(2000);
        let out = patch_texture(&buf, &d, &raster).unwrap();
        assert_eq!(out[..100], buf[..100]);
        let end = 100 + d.region_len();
        assert_eq!(out[end..], buf[end..]);
    }

    #[test]
    fn black_white_scenario() {
        // 8 black and 8 white pixels must survive quantization exactly
        let raster = checkerboard(4, 4);
        let d = desc(4, 4, 16);
        let out = patch_texture(&patterned(1000), &d, &raster).unwrap();

        let plane = &out[16..32];
        let pal = &out[32..32 + PALETTE_BYTES];
        let color_of = |i: u8| [pal[i as usize * 3], pal[i as usize * 3 + 1], pal[i as usize * 3 + 2]];
        let blacks = plane.iter().filter(|&&i| color_of(i) == [0, 0, 0]).count();
        let whites = plane
            .iter()
            .filter(|&&i| color_of(i) == [255, 255, 255])
            .count();
        assert_eq!(blacks, 8);
        assert_eq!(whites, 8);
    }

    #[test]
    fn indices_stay_within_palette() {
        let raster = checkerboard(4, 4);
        let d = desc(4, 4, 0);
        let out = patch_texture(&patterned(1000), &d, &raster).unwrap();
        // two distinct colors, so the exact path yields a 2-entry palette
        assert!(out[..16].iter().all(|&i| i < 2));
    }

    #[test]
    fn unused_palette_slots_are_black() {
        let raster = checkerboard(4, 4);
        let d = desc(4, 4, 0);
        let out = patch_texture(&patterned(1000), &d, &raster).unwrap();
        assert!(out[16 + 2 * 3..16 + PALETTE_BYTES].iter().all(|&b| b == 0));
    }

    #[test]
    fn range_error_scenario() {
        // 1000 + 64*64 + 768 = 5864 > 5000
        let d = desc(64, 64, 1000);
        let buf = patterned(5000);
        let raster = checkerboard(64, 64);
        let err = patch_texture(&buf, &d, &raster).unwrap_err();
        match err {
            Error::Range { offset, end, len } => {
                assert_eq!((offset, end, len), (1000, 5864, 5000));
            }
            other => panic!("expected Range error, got {other}"),
        }
    }

    #[test]
    fn patch_rejects_mismatched_raster() {
        let d = desc(8, 8, 0);
        let err = patch_texture(&patterned(2000), &d, &checkerboard(4, 4)).unwrap_err();
        assert!(matches!(err, Error::Raster(_)));
    }

    #[test]
    fn round_trip_is_exact_for_small_color_counts() {
        let pixels = (0..64u32)
            .map(|i| RGBA::new((i * 4) as u8, 0, (255 - i * 2) as u8, 255))
            .collect::<Vec<_>>();
        let raster = Raster::new(8, 8, pixels).unwrap();
        let d = desc(8, 8, 50);
        let out = patch_texture(&patterned(2000), &d, &raster).unwrap();
        let back = decode_texture(&out, &d).unwrap();
        assert_eq!(back.pixels(), raster.pixels());
    }

    #[test]
    fn repatching_is_deterministic() {
        let raster = checkerboard(16, 16);
        let d = desc(16, 16, 123);
        let buf = patterned(4000);
        let a = patch_texture(&buf, &d, &raster).unwrap();
        let b = patch_texture(&buf, &d, &raster).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mapper_breaks_ties_toward_lowest_index() {
        let red = RGB8::new(200, 0, 0);
        let palette = palette_of(&[red, red]);
        let raster = Raster::new(1, 1, vec![RGBA::new(200, 0, 0, 255)]).unwrap();
        assert_eq!(map_pixels(&raster, &palette), vec![0]);
    }

    #[test]
    fn mapper_ignores_alpha() {
        let palette = palette_of(&[RGB8::new(0, 0, 0), RGB8::new(250, 250, 250)]);
        let raster = Raster::new(1, 2, vec![RGBA::new(250, 250, 250, 0), RGBA::new(0, 0, 0, 7)])
            .unwrap();
        assert_eq!(map_pixels(&raster, &palette), vec![1, 0]);
    }

    #[test]
    fn mapper_picks_nearest() {
        let palette = palette_of(&[
            RGB8::new(0, 0, 0),
            RGB8::new(128, 128, 128),
            RGB8::new(255, 255, 255),
        ]);
        let raster = Raster::new(
            3,
            1,
            vec![
                RGBA::new(10, 10, 10, 255),
                RGBA::new(120, 130, 125, 255),
                RGBA::new(240, 255, 250, 255),
            ],
        )
        .unwrap();
        assert_eq!(map_pixels(&raster, &palette), vec![0, 1, 2]);
    }

    #[test]
    fn decode_is_fully_opaque() {
        let raster = checkerboard(4, 4);
        let d = desc(4, 4, 0);
        let out = patch_texture(&patterned(1000), &d, &raster).unwrap();
        let back = decode_texture(&out, &d).unwrap();
        assert!(back.pixels().iter().all(|p| p.a == 255));
    }

    #[test]
    fn decode_reads_handwritten_region() {
        let d = desc(2, 1, 4);
        let mut buf = vec![0u8; 4 + d.region_len()];
        buf[4] = 1; // second palette entry
        buf[5] = 0;
        let pal_off = 4 + 2;
        buf[pal_off..pal_off + 6].copy_from_slice(&[10, 20, 30, 40, 50, 60]);
        let back = decode_texture(&buf, &d).unwrap();
        assert_eq!(back.pixels()[0], RGBA::new(40, 50, 60, 255));
        assert_eq!(back.pixels()[1], RGBA::new(10, 20, 30, 255));
    }

    #[test]
    fn bounds_check_overflow_is_a_range_error() {
        let d = desc(0xffff, 0xffff, usize::MAX - 100);
        assert!(matches!(d.check_bounds(1000), Err(Error::Range { .. })));
    }
}
