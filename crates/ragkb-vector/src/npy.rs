//! Minimal NumPy `.npy` codec for 2-D float matrices.
//!
//! Reads format versions 1.0-3.0 with `descr` `<f4` or `<f8` in C order
//! (`<f8` is narrowed to `f32`). Writes version 1.0 `<f4`.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;
use std::path::Path;

use ragkb_core::{Error, Result};

use crate::matrix::EmbeddingMatrix;

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGN: usize = 64;

pub fn decode(bytes: &[u8], origin: &Path) -> Result<EmbeddingMatrix> {
    let bad = |reason: &str| Error::malformed(origin, reason);
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(bad("missing .npy magic"));
    }
    let (header_len, header_start) = match bytes[6] {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (LittleEndian::read_u32(&bytes[8..12]) as usize, 12),
        v => return Err(bad(&format!("unsupported .npy version {v}"))),
    };
    let data_start = header_start + header_len;
    let header = bytes
        .get(header_start..data_start)
        .and_then(|h| std::str::from_utf8(h).ok())
        .ok_or_else(|| bad("truncated header"))?;

    let descr = header_value(header, "descr").ok_or_else(|| bad("header has no descr"))?;
    let width = match descr.trim_matches(|c| c == '\'' || c == '"') {
        "<f4" => 4,
        "<f8" => 8,
        other => return Err(bad(&format!("unsupported dtype {other}, expected <f4 or <f8"))),
    };
    if header_value(header, "fortran_order") != Some("False") {
        return Err(bad("fortran_order arrays are not supported"));
    }
    let shape = header_value(header, "shape").ok_or_else(|| bad("header has no shape"))?;
    let dims: Vec<usize> = shape
        .trim_matches(|c| c == '(' || c == ')')
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| bad(&format!("bad shape {shape}"))))
        .collect::<Result<_>>()?;
    let [rows, dim] = dims[..] else {
        return Err(bad(&format!("expected a 2-D array, got shape {shape}")));
    };

    let payload = &bytes[data_start..];
    let count = rows.checked_mul(dim).ok_or_else(|| bad(&format!("shape {shape} overflows")))?;
    if Some(payload.len()) != count.checked_mul(width) {
        return Err(bad(&format!("expected {rows}x{dim} values of {width} bytes, found {} bytes", payload.len())));
    }
    let mut data = vec![0f32; count];
    if width == 4 {
        LittleEndian::read_f32_into(payload, &mut data);
    } else {
        let mut wide = vec![0f64; count];
        LittleEndian::read_f64_into(payload, &mut wide);
        for (d, w) in data.iter_mut().zip(wide) { *d = w as f32; }
    }
    EmbeddingMatrix::from_raw(data, rows, dim)
}

pub fn encode<W: Write>(matrix: &EmbeddingMatrix, mut out: W) -> std::io::Result<()> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows(),
        matrix.dim()
    );
    // magic + version + u16 length + header + '\n' is padded to ALIGN bytes
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGN - unpadded % ALIGN) % ALIGN;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    out.write_all(MAGIC)?;
    out.write_all(&[1, 0])?;
    let header_len = u16::try_from(header.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "npy header too long"))?;
    out.write_u16::<LittleEndian>(header_len)?;
    out.write_all(header.as_bytes())?;
    for &v in matrix.as_slice() {
        out.write_f32::<LittleEndian>(v)?;
    }
    out.flush()
}

fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("'{key}':");
    let start = header.find(&needle)? + needle.len();
    let rest = header[start..].trim_start();
    if rest.starts_with('(') {
        rest.find(')').map(|end| &rest[..=end])
    } else {
        rest.find([',', '}']).map(|end| rest[..end].trim())
    }
}
