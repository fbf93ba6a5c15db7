//! PNG 16-bit grayscale codec: the only writable projection-map format
//! (spec §6). Grounded on the `png` crate usage in the map-server example's
//! tile renderer (`Encoder`/`ColorType`/`BitDepth`), adapted from RGBA8
//! render output to single-channel 16-bit elevation.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{raise, ErrorKind, Result};
use crate::map::{Map, MapInfo};
use crate::projection::{self, Projection};
use crate::quantize;

use super::Codec;

/// Render `v` as a C99 `%a` hex-float (e.g. `0x1.921fb54442d18p+1`), exact
/// to the bit for any finite, normal `f64` — the wire format spec §6
/// mandates for `Comment`'s six coordinate fields.
fn format_hex_float(v: f64) -> String {
    if v == 0.0 {
        return if v.is_sign_negative() { "-0x0p+0".to_string() } else { "0x0p+0".to_string() };
    }
    let bits = v.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let raw_exp = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0xf_ffff_ffff_ffff;
    let exp = raw_exp - 1023;
    let mantissa_hex = format!("{mantissa:013x}");
    let trimmed = mantissa_hex.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{sign}0x1p{exp:+}")
    } else {
        format!("{sign}0x1.{trimmed}p{exp:+}")
    }
}

/// Parse a `%a` hex-float written by [`format_hex_float`] (or any other
/// conforming writer producing a normalized `0x1.<hex>p<exp>` mantissa, or
/// the zero forms `0x0p+0`/`-0x0p+0`). Subnormal input is not supported —
/// none of this crate's coordinate fields ever land in that range.
fn parse_hex_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let rest = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X"))?;
    let p_idx = rest.find(['p', 'P'])?;
    let (mantissa_part, exp_part) = rest.split_at(p_idx);
    let exp: i64 = exp_part[1..].parse().ok()?;

    let (int_part, frac_part) = mantissa_part.split_once('.').unwrap_or((mantissa_part, ""));

    let bits: u64 = if int_part == "0" {
        if frac_part.chars().any(|c| c != '0') {
            return None;
        }
        0
    } else if int_part == "1" {
        let mut mantissa: u64 = 0;
        for (i, c) in frac_part.chars().enumerate() {
            if i >= 13 {
                break;
            }
            mantissa |= (c.to_digit(16)? as u64) << (4 * (12 - i));
        }
        let biased_exp = u64::try_from(exp + 1023).ok()?;
        (biased_exp << 52) | mantissa
    } else {
        return None;
    };

    let signed_bits = if negative { bits | (1 << 63) } else { bits };
    Some(f64::from_bits(signed_bits))
}

/// The `"topography"` object carried in the PNG's `Comment` text chunk.
/// The six coordinate fields are `%a` hex-float text, per spec §6, so a
/// file this library writes is bit-for-bit readable by any conforming
/// reader (and vice versa) — plain JSON decimals would round-trip fine
/// against themselves but would not match the wire format other
/// implementations produce or expect.
#[derive(Serialize, Deserialize)]
struct Topography {
    x0: String,
    y0: String,
    z0: String,
    x1: String,
    y1: String,
    z1: String,
    projection: String,
}

#[derive(Serialize, Deserialize)]
struct CommentChunk {
    topography: Topography,
}

pub(crate) struct PngCodec;

impl Codec for PngCodec {
    fn extensions(&self) -> &'static [&'static str] {
        &["png"]
    }

    fn load(&self, path: &Path) -> Result<Map> {
        let file = File::open(path).map_err(|e| raise!("PngCodec::load", ErrorKind::BadFormat, "open {path:?}: {e}"))?;
        let decoder = ::png::Decoder::new(file);
        let mut reader = decoder
            .read_info()
            .map_err(|e| raise!("PngCodec::load", ErrorKind::BadFormat, "{path:?}: {e}"))?;

        if reader.info().bit_depth != ::png::BitDepth::Sixteen
            || reader.info().color_type != ::png::ColorType::Grayscale
        {
            return Err(raise!("PngCodec::load", ErrorKind::BadFormat, "{path:?} is not 16-bit grayscale"));
        }

        let comment = reader
            .info()
            .uncompressed_latin1_text
            .iter()
            .find(|chunk| chunk.keyword == "Comment")
            .ok_or_else(|| raise!("PngCodec::load", ErrorKind::BadFormat, "{path:?}: missing Comment chunk"))?
            .text
            .clone();
        let comment: CommentChunk = serde_json::from_str(&comment)
            .map_err(|e| raise!("PngCodec::load", ErrorKind::BadJson, "{path:?}: {e}"))?;
        let topo = comment.topography;
        let field = |name: &str, text: &str| -> Result<f64> {
            parse_hex_float(text).ok_or_else(|| raise!("PngCodec::load", ErrorKind::BadJson, "{path:?}: bad hex-float in {name}: {text:?}"))
        };
        let x0 = field("x0", &topo.x0)?;
        let y0 = field("y0", &topo.y0)?;
        let z0 = field("z0", &topo.z0)?;
        let x1 = field("x1", &topo.x1)?;
        let y1 = field("y1", &topo.y1)?;
        let z1 = field("z1", &topo.z1)?;

        let mut buf = vec![0u8; reader.output_buffer_size()];
        let frame = reader
            .next_frame(&mut buf)
            .map_err(|e| raise!("PngCodec::load", ErrorKind::BadFormat, "{path:?}: {e}"))?;
        let (nx, ny) = (frame.width as usize, frame.height as usize);

        let dx = if nx <= 1 { 0.0 } else { (x1 - x0) / (nx - 1) as f64 };
        let dy = if ny <= 1 { 0.0 } else { (y1 - y0) / (ny - 1) as f64 };
        let dz = quantize::step(z0, z1);

        // Rows are stored top-to-bottom; row 0 is the northernmost (highest y).
        let mut data = vec![0u16; nx * ny];
        for row in 0..ny {
            let j = ny - 1 - row;
            for i in 0..nx {
                let idx = row * nx + i;
                data[j * nx + i] = u16::from_be_bytes([buf[2 * idx], buf[2 * idx + 1]]);
            }
        }

        let info = MapInfo { x0, dx, nx, y0, dy, ny, z0, z1 };
        let projection = if topo.projection.is_empty() || topo.projection == "None" {
            Projection::None
        } else {
            projection::configure(&topo.projection)?
        };

        Ok(Map::from_raw(info, dz, projection, data))
    }

    fn dump(&self, path: &Path, map: &Map) -> Result<()> {
        let info = map.info();
        let (nx, ny) = (info.nx, info.ny);

        let file = File::create(path).map_err(|e| raise!("PngCodec::dump", ErrorKind::BadFormat, "create {path:?}: {e}"))?;
        let w = BufWriter::new(file);
        let mut encoder = ::png::Encoder::new(w, nx as u32, ny as u32);
        encoder.set_color(::png::ColorType::Grayscale);
        encoder.set_depth(::png::BitDepth::Sixteen);

        let topo = Topography {
            x0: format_hex_float(info.x0),
            y0: format_hex_float(info.y0),
            z0: format_hex_float(info.z0),
            x1: format_hex_float(info.x1()),
            y1: format_hex_float(info.y1()),
            z1: format_hex_float(info.z1),
            projection: projection::name(&map.projection()),
        };
        let comment = serde_json::to_string(&CommentChunk { topography: topo })
            .map_err(|e| raise!("PngCodec::dump", ErrorKind::BadJson, "{e}"))?;
        encoder
            .add_text_chunk("Comment".to_string(), comment)
            .map_err(|e| raise!("PngCodec::dump", ErrorKind::BadFormat, "{e}"))?;

        let mut writer = encoder
            .write_header()
            .map_err(|e| raise!("PngCodec::dump", ErrorKind::BadFormat, "{path:?}: {e}"))?;

        let mut buf = vec![0u8; nx * ny * 2];
        for row in 0..ny {
            let j = ny - 1 - row;
            for i in 0..nx {
                let bytes = map.data()[j * nx + i].to_be_bytes();
                let idx = row * nx + i;
                buf[2 * idx] = bytes[0];
                buf[2 * idx + 1] = bytes[1];
            }
        }
        writer
            .write_image_data(&buf)
            .map_err(|e| raise!("PngCodec::dump", ErrorKind::BadFormat, "{path:?}: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapSpec;

    #[test]
    fn roundtrip_bit_exact() {
        let spec = MapSpec { x0: 0.0, x1: 2.0, nx: 3, y0: 0.0, y1: 2.0, ny: 3, z0: -10.0, z1: 990.0 };
        let mut map = Map::create(spec, None).unwrap();
        for j in 0..3 {
            for i in 0..3 {
                map.fill(i, j, -10.0 + (i + j) as f64 * 100.0).unwrap();
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        map.dump(&path).unwrap();
        let back = Map::load(&path).unwrap();

        assert_eq!(back.data(), map.data());
        let (info, name) = back.meta();
        assert_eq!(info.x0, map.info().x0);
        assert_eq!(info.z1, map.info().z1);
        assert_eq!(name, "None");
    }

    #[test]
    fn hex_float_roundtrips_exactly() {
        for v in [0.0, -0.0, 1.0, -1.0, 0.5, 496_000.0, -5_067_000.25, 1e-300, 1e300, std::f64::consts::PI] {
            let text = format_hex_float(v);
            let back = parse_hex_float(&text).unwrap_or_else(|| panic!("failed to parse {text:?}"));
            assert_eq!(back.to_bits(), v.to_bits(), "{v} -> {text} -> {back}");
        }
    }

    #[test]
    fn hex_float_matches_known_c99_form() {
        // glibc's `printf("%a", M_PI)` prints this (minimal-digit form);
        // our encoder always emits the full 13 hex digits, but both
        // denote the same bit pattern.
        assert_eq!(parse_hex_float("0x1.921fb54442d18p+1").unwrap().to_bits(), std::f64::consts::PI.to_bits());
    }

    #[test]
    fn hex_float_rejects_garbage() {
        assert!(parse_hex_float("not a float").is_none());
        assert!(parse_hex_float("0x2.0p+0").is_none());
    }
}
