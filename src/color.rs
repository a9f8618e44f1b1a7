//! Color identity and quantization
//!
//! - `ColorKey`: hashable 16-bit-per-channel identity of an RGBA color, with a
//!   fixed 32-byte encoding (four 8-byte varint slots)
//! - `quantize`: nearest member of a reference set by squared channel distance
//! - `WEB_SAFE`: the 216-color reference set used to bound histogram size

use image::Rgba;

/// Size of an encoded `ColorKey`
pub const KEY_BYTES: usize = 32;

const SLOT_BYTES: usize = 8;

/// The 6x6x6 web-safe color cube, red-major then green then blue
pub const WEB_SAFE: [Rgba<u8>; 216] = build_web_safe();

const fn build_web_safe() -> [Rgba<u8>; 216] {
    let mut out = [Rgba([0, 0, 0, 0xff]); 216];
    let mut i = 0;
    while i < 216 {
        out[i] = Rgba([
            (i / 36 * 0x33) as u8,
            (i / 6 % 6 * 0x33) as u8,
            (i % 6 * 0x33) as u8,
            0xff,
        ]);
        i += 1;
    }
    out
}

// ============================================================================
// COLOR KEY
// ============================================================================

/// Channel values (R, G, B, A) widened to 16 bits, usable as a map key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorKey(pub [u32; 4]);

impl ColorKey {
    pub fn new(color: Rgba<u8>) -> Self {
        let [r, g, b, a] = color.0;
        Self([r as u32 * 0x101, g as u32 * 0x101, b as u32 * 0x101, a as u32 * 0x101])
    }

    /// Reduce back to 8 bits per channel
    pub fn color(&self) -> Rgba<u8> {
        let [r, g, b, a] = self.0;
        Rgba([(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8, (a >> 8) as u8])
    }

    /// Encode each channel as an unsigned varint in its own 8-byte slot
    pub fn to_bytes(&self) -> [u8; KEY_BYTES] {
        let mut buf = [0u8; KEY_BYTES];
        for (i, &v) in self.0.iter().enumerate() {
            let n = i * SLOT_BYTES;
            put_uvarint(&mut buf[n..n + SLOT_BYTES], v as u64);
        }
        buf
    }

    pub fn from_bytes(buf: &[u8; KEY_BYTES]) -> Self {
        let mut key = [0u32; 4];
        for (i, slot) in key.iter_mut().enumerate() {
            let n = i * SLOT_BYTES;
            *slot = uvarint(&buf[n..n + SLOT_BYTES]) as u32;
        }
        Self(key)
    }

    /// Sum of squared channel differences
    pub fn distance(&self, other: &ColorKey) -> u64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| {
                let d = a.abs_diff(b) as u64;
                d * d
            })
            .sum()
    }
}

/// Writes `v` little-endian in 7-bit groups. The slot must be wide enough,
/// which holds for any u32 in an 8-byte slot.
fn put_uvarint(buf: &mut [u8], mut v: u64) -> usize {
    let mut i = 0;
    while v >= 0x80 {
        buf[i] = (v as u8) | 0x80;
        v >>= 7;
        i += 1;
    }
    buf[i] = v as u8;
    i + 1
}

/// Reads a varint; an unterminated slot decodes as 0
fn uvarint(buf: &[u8]) -> u64 {
    let mut x = 0u64;
    let mut shift = 0;
    for &b in buf {
        if b < 0x80 {
            return x | (b as u64) << shift;
        }
        x |= ((b & 0x7f) as u64) << shift;
        shift += 7;
    }
    0
}

// ============================================================================
// QUANTIZATION
// ============================================================================

/// Closest color in `reference`; the first of several equally close wins.
/// Only an empty reference set yields `None`.
pub fn quantize(reference: &[Rgba<u8>], color: Rgba<u8>) -> Option<Rgba<u8>> {
    let key = ColorKey::new(color);
    let mut best = None;
    let mut best_distance = u64::MAX;

    for &candidate in reference {
        let distance = key.distance(&ColorKey::new(candidate));
        if distance < best_distance {
            best = Some(candidate);
            best_distance = distance;
            if distance == 0 {
                break;
            }
        }
    }

    best
}

/// `quantize(&WEB_SAFE, color)` without the linear scan.
///
/// The cube is separable and every member is opaque, so the nearest member is
/// the per-channel nearest multiple of 0x33. Integer channels never sit
/// exactly between two levels, so no tie-break is involved.
pub fn quantize_web_safe(color: Rgba<u8>) -> Rgba<u8> {
    let level = |c: u8| ((c as u16 + 25) / 51 * 51) as u8;
    let [r, g, b, _] = color.0;
    Rgba([level(r), level(g), level(b), 0xff])
}
