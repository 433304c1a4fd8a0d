//! Little-endian primitives of the map format.
//!
//! Writers append to an in-memory buffer and cannot fail. Readers pull from a
//! byte slice and report running out of data as an `UnexpectedEof` error.

use std::io::{self, Read};

pub fn write_u8(w: &mut Vec<u8>, v: u8) {
    w.push(v);
}

pub fn write_i32_le(w: &mut Vec<u8>, v: i32) {
    w.extend_from_slice(&v.to_le_bytes());
}

pub fn write_u32_le(w: &mut Vec<u8>, v: u32) {
    w.extend_from_slice(&v.to_le_bytes());
}

/// Writes a length-prefixed string, cutting it to at most `max_bytes` on a
/// character boundary.
pub fn write_string(w: &mut Vec<u8>, s: &str, max_bytes: usize) {
    let s = truncate_to_boundary(s, max_bytes);
    write_i32_le(w, s.len() as i32);
    w.extend_from_slice(s.as_bytes());
}

pub fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

pub fn read_exact<const N: usize, R: Read>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    Ok(read_exact::<1, _>(r)?[0])
}

pub fn read_i32_le<R: Read>(r: &mut R) -> io::Result<i32> {
    Ok(i32::from_le_bytes(read_exact::<4, _>(r)?))
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact::<4, _>(r)?))
}

pub fn read_bytes<R: Read>(r: &mut R, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
