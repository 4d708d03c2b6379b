//! Data element type and array class codes.

pub const HEADER_SIZE: usize = 128;
pub const HEADER_TEXT_SIZE: usize = 116;
pub const VERSION: u16 = 0x0100;
/// The endian indicator "IM" read as a little-endian u16.
pub const ENDIAN_LE: u16 = 0x4d49;
/// The endian indicator "MI" read as a little-endian u16.
pub const ENDIAN_BE: u16 = 0x494d;

pub const MI_INT8: u32 = 1;
pub const MI_UINT8: u32 = 2;
pub const MI_INT16: u32 = 3;
pub const MI_UINT16: u32 = 4;
pub const MI_INT32: u32 = 5;
pub const MI_UINT32: u32 = 6;
pub const MI_SINGLE: u32 = 7;
pub const MI_DOUBLE: u32 = 9;
pub const MI_INT64: u32 = 12;
pub const MI_UINT64: u32 = 13;
pub const MI_MATRIX: u32 = 14;
pub const MI_COMPRESSED: u32 = 15;
pub const MI_UTF8: u32 = 16;
pub const MI_UTF16: u32 = 17;

pub const MX_CELL: u8 = 1;
pub const MX_STRUCT: u8 = 2;
pub const MX_OBJECT: u8 = 3;
pub const MX_CHAR: u8 = 4;
pub const MX_SPARSE: u8 = 5;

pub const FLAG_COMPLEX: u32 = 0x0800;

/// Rounds `len` up to the 8-byte element boundary.
pub fn padded_len(len: usize) -> usize {
    (len + 7) / 8 * 8
}
