//! Palette construction. Inputs with few enough distinct colors keep them
//! verbatim; anything richer goes through a competitive-learning network
//! that converges 256 units onto the sample's color distribution.

use crate::error::{Error, Result};
use crate::raster::Raster;
use crate::texture::{Palette, PALETTE_LEN};
use itertools::Itertools;
use rgb::RGB8;

/// Pixel visiting strides, coprime with common raster sizes so successive
/// samples are decorrelated without an RNG.
const PRIMES: [usize; 4] = [499, 491, 487, 503];

/// Learning-rate and radius decay steps spread over one pass.
const CYCLES: usize = 100;

// Network colors are kept in fixed point with this many fractional bits.
const NET_BIAS_SHIFT: i32 = 4;

// Frequency/bias bookkeeping for the winner search.
const INT_BIAS_SHIFT: i32 = 16;
const INT_BIAS: i32 = 1 << INT_BIAS_SHIFT;
const GAMMA_SHIFT: i32 = 10;
const BETA_SHIFT: i32 = 10;
const BETA: i32 = INT_BIAS >> BETA_SHIFT;
const BETA_GAMMA: i32 = INT_BIAS << (GAMMA_SHIFT - BETA_SHIFT);

// Neighborhood radius starts at an eighth of the network and shrinks to zero.
const INIT_RADIUS: i32 = (PALETTE_LEN >> 3) as i32;
const RADIUS_BIAS_SHIFT: i32 = 6;
const RADIUS_BIAS: i32 = 1 << RADIUS_BIAS_SHIFT;
const RADIUS_DEC: i32 = 30;

const ALPHA_BIAS_SHIFT: i32 = 10;
const INIT_ALPHA: i32 = 1 << ALPHA_BIAS_SHIFT;
const ALPHA_DEC: i32 = 30;

const RAD_BIAS_SHIFT: i32 = 8;
const RAD_BIAS: i32 = 1 << RAD_BIAS_SHIFT;
const ALPHA_RAD_BIAS: i32 = 1 << (ALPHA_BIAS_SHIFT + RAD_BIAS_SHIFT);

/// Builds a palette of up to 256 colors representative of the sample.
/// Degenerate samples are recovered with a grayscale ramp rather than
/// failing the whole patch.
pub fn build_palette(sample: &Raster) -> Palette {
    let pixels = sample
        .pixels()
        .iter()
        .map(|p| RGB8::new(p.r, p.g, p.b))
        .collect::<Vec<_>>();
    match quantize(&pixels) {
        Ok(palette) => palette,
        Err(e) => {
            log::warn!("{e}; falling back to a grayscale ramp");
            gray_ramp()
        }
    }
}

fn quantize(pixels: &[RGB8]) -> Result<Palette> {
    if pixels.is_empty() {
        return Err(Error::Quantization("no pixels to sample"));
    }
    if let Some(palette) = exact_palette(pixels) {
        log::debug!("sample fits {} exact palette entries", palette.len());
        return Ok(palette);
    }
    let mut net = Network::new();
    net.learn(pixels);
    Ok(net.palette())
}

/// Inputs that already fit the palette budget keep their colors verbatim,
/// in first-appearance order.
fn exact_palette(pixels: &[RGB8]) -> Option<Palette> {
    let mut palette = Palette::new();
    for color in pixels.iter().copied().unique() {
        palette.try_push(color).ok()?;
    }
    Some(palette)
}

fn gray_ramp() -> Palette {
    (0..PALETTE_LEN)
        .map(|i| {
            let v = i as u8;
            RGB8::new(v, v, v)
        })
        .collect()
}

/// Self-organizing map of 256 color units. All arithmetic is integer and
/// the visiting order is a fixed stride, so a given sample always produces
/// the same palette.
struct Network {
    units: Vec<[i32; 3]>,
    freq: Vec<i32>,
    bias: Vec<i32>,
}

impl Network {
    fn new() -> Self {
        // units start spread along the gray diagonal
        let units = (0..PALETTE_LEN)
            .map(|i| {
                let v = ((i << (NET_BIAS_SHIFT as usize + 8)) / PALETTE_LEN) as i32;
                [v, v, v]
            })
            .collect();
        Self {
            units,
            freq: vec![INT_BIAS / PALETTE_LEN as i32; PALETTE_LEN],
            bias: vec![0; PALETTE_LEN],
        }
    }

    /// One pass over the sample in prime-stride order, moving the winning
    /// unit and its neighborhood toward each pixel while the learning rate
    /// and radius decay.
    fn learn(&mut self, pixels: &[RGB8]) {
        let len = pixels.len();
        let delta = (len / CYCLES).max(1);
        let step = PRIMES
            .into_iter()
            .find(|&p| len % p != 0)
            .unwrap_or(PRIMES[3]);

        let mut alpha = INIT_ALPHA;
        let mut radius = INIT_RADIUS * RADIUS_BIAS;
        let mut rad = radius >> RADIUS_BIAS_SHIFT;
        let mut pos = 0usize;
        for i in 1..=len {
            let p = pixels[pos];
            let r = (p.r as i32) << NET_BIAS_SHIFT;
            let g = (p.g as i32) << NET_BIAS_SHIFT;
            let b = (p.b as i32) << NET_BIAS_SHIFT;

            let winner = self.contest(r, g, b);
            self.nudge(winner, alpha, r, g, b);
            if rad > 0 {
                self.nudge_neighbors(winner, rad, alpha, r, g, b);
            }

            pos += step;
            if pos >= len {
                pos -= len;
            }
            if i % delta == 0 {
                alpha -= alpha / ALPHA_DEC;
                radius -= radius / RADIUS_DEC;
                rad = radius >> RADIUS_BIAS_SHIFT;
            }
        }
    }

    /// Finds the winning unit for a color. The raw nearest unit collects a
    /// frequency penalty, so rarely-winning units get a chance and the map
    /// spreads over the whole distribution.
    fn contest(&mut self, r: i32, g: i32, b: i32) -> usize {
        let mut best = (i32::MAX, 0usize);
        let mut best_biased = (i32::MAX, 0usize);
        for (i, unit) in self.units.iter().enumerate() {
            let dist = (unit[0] - r).abs() + (unit[1] - g).abs() + (unit[2] - b).abs();
            if dist < best.0 {
                best = (dist, i);
            }
            let biased = dist - (self.bias[i] >> (INT_BIAS_SHIFT - NET_BIAS_SHIFT));
            if biased < best_biased.0 {
                best_biased = (biased, i);
            }
            let beta_freq = self.freq[i] >> BETA_SHIFT;
            self.freq[i] -= beta_freq;
            self.bias[i] += beta_freq << GAMMA_SHIFT;
        }
        self.freq[best.1] += BETA;
        self.bias[best.1] -= BETA_GAMMA;
        best_biased.1
    }

    fn nudge(&mut self, i: usize, alpha: i32, r: i32, g: i32, b: i32) {
        let u = &mut self.units[i];
        u[0] -= alpha * (u[0] - r) / INIT_ALPHA;
        u[1] -= alpha * (u[1] - g) / INIT_ALPHA;
        u[2] -= alpha * (u[2] - b) / INIT_ALPHA;
    }

    fn nudge_neighbors(&mut self, i: usize, rad: i32, alpha: i32, r: i32, g: i32, b: i32) {
        let lo = i.saturating_sub(rad as usize);
        let hi = (i + rad as usize).min(PALETTE_LEN - 1);
        let rad_sq = rad * rad;
        for j in lo..=hi {
            if j == i {
                continue;
            }
            let d = j as i32 - i as i32;
            let a = alpha * ((rad_sq - d * d) * RAD_BIAS) / rad_sq;
            let u = &mut self.units[j];
            u[0] -= a * (u[0] - r) / ALPHA_RAD_BIAS;
            u[1] -= a * (u[1] - g) / ALPHA_RAD_BIAS;
            u[2] -= a * (u[2] - b) / ALPHA_RAD_BIAS;
        }
    }

    fn palette(&self) -> Palette {
        self.units
            .iter()
            .map(|u| {
                RGB8::new(
                    unbias_channel(u[0]),
                    unbias_channel(u[1]),
                    unbias_channel(u[2]),
                )
            })
            .collect()
    }
}

#[inline]
fn unbias_channel(v: i32) -> u8 {
    (v >> NET_BIAS_SHIFT).clamp(0, 255) as u8
}
