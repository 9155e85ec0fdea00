//! Wire codec for the RoboDK remote API
//!
//! The protocol is not self-describing: each command fixes the order and shape
//! of its arguments and results, and the primitives below carry no type tags.
//!
//! | Primitive | Encoding |
//! |---|---|
//! | int | 4 bytes, big-endian, two's complement |
//! | line | raw UTF-8 bytes + LF, no length prefix |
//! | array | int count N + N×8 bytes big-endian f64 |
//! | matrix | int rows + int cols + rows×cols×8 bytes, column-major |
//! | pose | 16×8 bytes, column-major, no header |
//! | xyz | 3×8 bytes, no header |
//! | item | out: 8-byte id; in: 8-byte id + 4-byte type tag |
//! | pointer | 8-byte id |
//!
//! Encoders append to any [`BufMut`]; decoders pull from any [`Read`]. Neither
//! side retries or recovers: I/O failures propagate to the caller.

use std::io::Read;

use bytes::{Buf, BufMut};
use tracing::{trace, warn};

use crate::error::Result;
use crate::protocol::types::{Mat, Pose};

/// Line terminator of the text primitive
pub const LF: u8 = b'\n';

/// Placeholder substituted for line breaks in multi-line text
pub const LINE_BREAK_TOKEN: &str = "<<br>>";

/// Upper bound of a single read while receiving a matrix payload
pub const MATRIX_CHUNK_SIZE: usize = 512;

/// Size of a pose payload in bytes
pub const POSE_SIZE: usize = 16 * 8;

/// Round a double to the nearest int, ties to even
///
/// Used wherever a real-valued quantity occupies an int slot; values are never
/// truncated.
pub fn round_to_int(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Replace CRLF and LF with [`LINE_BREAK_TOKEN`] so text fits one line
pub fn escape_line_breaks(text: &str) -> String {
    text.replace("\r\n", LINE_BREAK_TOKEN)
        .replace('\n', LINE_BREAK_TOKEN)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a 32-bit int
pub fn put_int<B: BufMut>(buf: &mut B, value: i32) {
    buf.put_i32(value);
}

/// Encode a double in an int slot (rounded, see [`round_to_int`])
pub fn put_int_rounded<B: BufMut>(buf: &mut B, value: f64) {
    buf.put_i32(round_to_int(value));
}

/// Encode a text line
///
/// The text must not contain LF; use [`escape_line_breaks`] first for
/// multi-line content.
pub fn put_line<B: BufMut>(buf: &mut B, text: &str) {
    buf.put_slice(text.as_bytes());
    buf.put_u8(LF);
}

/// Encode a count-prefixed array of doubles
pub fn put_array<B: BufMut>(buf: &mut B, values: &[f64]) {
    buf.put_i32(values.len() as i32);
    for &v in values {
        buf.put_f64(v);
    }
}

/// Encode a size-prefixed matrix, column by column
///
/// A matrix with a zero dimension sends its header and no payload.
pub fn put_matrix<B: BufMut>(buf: &mut B, mat: &Mat) {
    buf.put_i32(mat.rows() as i32);
    buf.put_i32(mat.cols() as i32);
    for &v in mat.as_slice() {
        buf.put_f64(v);
    }
}

/// Encode a pose as 16 column-major doubles
///
/// A non-homogeneous pose is logged and sent unchanged.
pub fn put_pose<B: BufMut>(buf: &mut B, pose: &Pose) {
    if !pose.is_homogeneous() {
        warn!(last_row = ?pose.matrix[3], "Pose is not homogeneous");
    }
    for v in pose.to_column_major() {
        buf.put_f64(v);
    }
}

/// Encode an XYZ point as three doubles
pub fn put_xyz<B: BufMut>(buf: &mut B, xyz: &[f64; 3]) {
    for &v in xyz {
        buf.put_f64(v);
    }
}

/// Encode an item reference (id only)
pub fn put_item_id<B: BufMut>(buf: &mut B, id: u64) {
    buf.put_u64(id);
}

/// Encode a generic 64-bit pointer
pub fn put_ptr<B: BufMut>(buf: &mut B, ptr: u64) {
    buf.put_u64(ptr);
}

// ============================================================================
// Decoding
// ============================================================================

fn read_fixed<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    reader.read_exact(&mut bytes)?;
    Ok(bytes)
}

fn invalid_data(msg: String) -> crate::error::RobolinkError {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg).into()
}

/// Byte length of `values` doubles
fn payload_len(values: usize) -> Result<usize> {
    values
        .checked_mul(8)
        .ok_or_else(|| invalid_data(format!("payload of {} doubles overflows", values)))
}

/// Read `total` bytes in pieces of at most [`MATRIX_CHUNK_SIZE`]
///
/// The buffer grows only as bytes arrive, so a bogus size header ends in an
/// I/O error instead of a huge allocation.
fn read_chunked<R: Read>(reader: &mut R, total: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(total.min(MATRIX_CHUNK_SIZE));
    let mut chunk = [0u8; MATRIX_CHUNK_SIZE];
    while bytes.len() < total {
        let n = (total - bytes.len()).min(MATRIX_CHUNK_SIZE);
        reader.read_exact(&mut chunk[..n])?;
        bytes.extend_from_slice(&chunk[..n]);
    }
    Ok(bytes)
}

/// Decode a 32-bit int
pub fn read_int<R: Read>(reader: &mut R) -> Result<i32> {
    let bytes = read_fixed::<R, 4>(reader)?;
    Ok((&bytes[..]).get_i32())
}

/// Decode a text line (terminator excluded)
///
/// Reads byte by byte until LF, so nothing past the terminator is consumed.
pub fn read_line<R: Read>(reader: &mut R) -> Result<String> {
    let mut line = Vec::new();
    loop {
        let [byte] = read_fixed::<R, 1>(reader)?;
        if byte == LF {
            break;
        }
        line.push(byte);
    }
    trace!(len = line.len(), "Received line");
    Ok(String::from_utf8(line)?)
}

/// Decode a count-prefixed array of doubles
///
/// A count of zero (or less) yields the one-element array `[0.0]`, matching
/// what every RoboDK client returns for an empty array.
pub fn read_array<R: Read>(reader: &mut R) -> Result<Vec<f64>> {
    let count = read_int(reader)?;
    if count <= 0 {
        return Ok(vec![0.0]);
    }
    let bytes = read_chunked(reader, payload_len(count as usize)?)?;
    let mut buf = &bytes[..];
    Ok((0..count).map(|_| buf.get_f64()).collect())
}

/// Decode a size-prefixed matrix
///
/// The payload is received in reads of at most [`MATRIX_CHUNK_SIZE`] bytes and
/// reassembled before decoding.
pub fn read_matrix<R: Read>(reader: &mut R) -> Result<Mat> {
    let rows = read_int(reader)?;
    let cols = read_int(reader)?;
    if rows < 0 || cols < 0 {
        return Err(invalid_data(format!(
            "negative matrix size {}x{}",
            rows, cols
        )));
    }
    let (rows, cols) = (rows as usize, cols as usize);
    let values = rows
        .checked_mul(cols)
        .ok_or_else(|| invalid_data(format!("matrix size {}x{} overflows", rows, cols)))?;
    let total = payload_len(values)?;

    let bytes = read_chunked(reader, total)?;
    trace!(rows, cols, bytes = total, "Received matrix");

    let mut buf = &bytes[..];
    let data = (0..values).map(|_| buf.get_f64()).collect();
    Mat::from_column_major(rows, cols, data)
}

/// Decode a pose (16 column-major doubles)
pub fn read_pose<R: Read>(reader: &mut R) -> Result<Pose> {
    let bytes = read_fixed::<R, POSE_SIZE>(reader)?;
    let mut buf = &bytes[..];
    let mut values = [0.0; 16];
    for v in values.iter_mut() {
        *v = buf.get_f64();
    }
    Ok(Pose::from_column_major(&values))
}

/// Decode an XYZ point
pub fn read_xyz<R: Read>(reader: &mut R) -> Result<[f64; 3]> {
    let bytes = read_fixed::<R, 24>(reader)?;
    let mut buf = &bytes[..];
    Ok([buf.get_f64(), buf.get_f64(), buf.get_f64()])
}

/// Decode a generic 64-bit pointer
pub fn read_ptr<R: Read>(reader: &mut R) -> Result<u64> {
    let bytes = read_fixed::<R, 8>(reader)?;
    Ok((&bytes[..]).get_u64())
}

/// Decode an item reference as `(id, type tag)`
///
/// The id and the tag arrive as two separate primitives.
pub fn read_item_raw<R: Read>(reader: &mut R) -> Result<(u64, i32)> {
    let id = read_ptr(reader)?;
    let item_type = read_int(reader)?;
    Ok((id, item_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::io::Cursor;
    use crate::error::RobolinkError;

    /// Reader that hands out at most `step` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        max_request: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.max_request = self.max_request.max(buf.len());
            let n = buf.len().min(self.step).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_int_boundaries() {
        for value in [0, 1, -1, i32::MAX, i32::MIN, 20500] {
            let mut buf = BytesMut::new();
            put_int(&mut buf, value);
            assert_eq!(buf.len(), 4);
            assert_eq!(read_int(&mut Cursor::new(buf.to_vec())).unwrap(), value);
        }
    }

    #[test]
    fn test_int_big_endian() {
        let mut buf = BytesMut::new();
        put_int(&mut buf, 0x01020304);
        assert_eq!(&buf[..], &[0x01, 0x02, 0x03, 0x04]);

        let mut buf = BytesMut::new();
        put_int(&mut buf, -2);
        assert_eq!(&buf[..], &[0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn test_float_in_int_slot_is_rounded() {
        assert_eq!(round_to_int(2.6), 3);
        assert_eq!(round_to_int(-2.6), -3);
        assert_eq!(round_to_int(2.4), 2);
        // ties go to even, never truncated towards zero
        assert_eq!(round_to_int(2.5), 2);
        assert_eq!(round_to_int(3.5), 4);
        assert_eq!(round_to_int(0.999 * 1000.0), 999);

        let mut buf = BytesMut::new();
        put_int_rounded(&mut buf, 1.9);
        assert_eq!(read_int(&mut Cursor::new(buf.to_vec())).unwrap(), 2);
    }

    #[test]
    fn test_line_framing() {
        let mut buf = BytesMut::new();
        put_line(&mut buf, "G_Item");
        assert_eq!(&buf[..], b"G_Item\n");

        // nothing after the terminator is consumed
        let mut cursor = Cursor::new(b"Robot 1\nnext".to_vec());
        assert_eq!(read_line(&mut cursor).unwrap(), "Robot 1");
        assert_eq!(cursor.position(), 8);
        assert_eq!(read_line(&mut Cursor::new(b"\n".to_vec())).unwrap(), "");
    }

    #[test]
    fn test_line_break_escaping() {
        assert_eq!(
            escape_line_breaks("a\r\nb\nc"),
            "a<<br>>b<<br>>c"
        );
    }

    #[test]
    fn test_truncated_line_is_io_error() {
        let err = read_line(&mut Cursor::new(b"no terminator".to_vec())).unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_array_roundtrip() {
        for values in [vec![1.5], vec![0.0, -90.0, 90.0, 0.0, 45.0, 180.0]] {
            let mut buf = BytesMut::new();
            put_array(&mut buf, &values);
            assert_eq!(buf.len(), 4 + values.len() * 8);
            assert_eq!(read_array(&mut Cursor::new(buf.to_vec())).unwrap(), values);
        }
    }

    #[test]
    fn test_empty_array_decodes_as_single_zero() {
        let mut buf = BytesMut::new();
        put_array(&mut buf, &[]);
        assert_eq!(&buf[..], &[0, 0, 0, 0]);
        assert_eq!(read_array(&mut Cursor::new(buf.to_vec())).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_matrix_column_major() {
        let mat = Mat::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();
        let mut buf = BytesMut::new();
        put_matrix(&mut buf, &mat);

        let mut expected = BytesMut::new();
        expected.put_i32(3);
        expected.put_i32(2);
        for v in [1.0, 3.0, 5.0, 2.0, 4.0, 6.0] {
            expected.put_f64(v);
        }
        assert_eq!(buf, expected);
        assert_eq!(read_matrix(&mut Cursor::new(buf.to_vec())).unwrap(), mat);
    }

    #[test]
    fn test_matrix_degenerate_shapes() {
        for (rows, cols) in [(0, 0), (0, 4), (3, 0)] {
            let mat = Mat::zeros(rows, cols);
            let mut buf = BytesMut::new();
            put_matrix(&mut buf, &mat);
            assert_eq!(buf.len(), 8);
            let decoded = read_matrix(&mut Cursor::new(buf.to_vec())).unwrap();
            assert_eq!((decoded.rows(), decoded.cols()), (rows, cols));
            assert!(decoded.is_empty());
        }

        let one = Mat::from_columns(&[[42.0]]).unwrap();
        let mut buf = BytesMut::new();
        put_matrix(&mut buf, &one);
        assert_eq!(read_matrix(&mut Cursor::new(buf.to_vec())).unwrap(), one);
    }

    #[test]
    fn test_matrix_received_in_bounded_chunks() {
        let columns: Vec<Vec<f64>> = (0..100)
            .map(|i| vec![i as f64, i as f64 * 2.0, -(i as f64)])
            .collect();
        let mat = Mat::from_columns(&columns).unwrap();
        let mut buf = BytesMut::new();
        put_matrix(&mut buf, &mat);

        let mut reader = Trickle {
            data: buf.to_vec(),
            pos: 0,
            step: 37,
            max_request: 0,
        };
        assert_eq!(read_matrix(&mut reader).unwrap(), mat);
        assert!(reader.max_request <= MATRIX_CHUNK_SIZE);
    }

    #[test]
    fn test_negative_matrix_size_rejected() {
        let mut buf = BytesMut::new();
        buf.put_i32(-1);
        buf.put_i32(3);
        assert!(read_matrix(&mut Cursor::new(buf.to_vec())).is_err());
    }

    #[test]
    fn test_oversized_matrix_header_is_rejected() {
        let mut buf = BytesMut::new();
        buf.put_i32(i32::MAX);
        buf.put_i32(i32::MAX);
        match read_matrix(&mut Cursor::new(buf.to_vec())) {
            Err(RobolinkError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::InvalidData)
            }
            other => panic!("expected invalid data, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_large_payload_fails_without_allocating_it() {
        let mut buf = BytesMut::new();
        buf.put_i32(40_000);
        buf.put_i32(40_000);
        buf.put_f64(1.0);
        match read_matrix(&mut Cursor::new(buf.to_vec())) {
            Err(RobolinkError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof)
            }
            other => panic!("expected end of stream, got {:?}", other),
        }

        let mut buf = BytesMut::new();
        buf.put_i32(i32::MAX);
        buf.put_f64(2.0);
        assert!(read_array(&mut Cursor::new(buf.to_vec())).is_err());
    }

    #[test]
    fn test_pose_is_exactly_128_bytes() {
        let pose = Pose::translation(100.0, -50.0, 300.0) * Pose::rot_z(0.3);
        let mut buf = BytesMut::new();
        put_pose(&mut buf, &pose);
        assert_eq!(buf.len(), POSE_SIZE);
        // translation x is element 12 (column 3, row 0)
        assert_eq!((&buf[12 * 8..13 * 8]).get_f64(), 100.0);
        assert_eq!(read_pose(&mut Cursor::new(buf.to_vec())).unwrap(), pose);
    }

    #[test]
    fn test_non_homogeneous_pose_roundtrips_bit_exact() {
        let mut pose = Pose::identity();
        pose.set(3, 0, 0.25);
        pose.set(3, 3, -7.0);
        pose.set(2, 1, f64::MIN_POSITIVE);
        let mut buf = BytesMut::new();
        put_pose(&mut buf, &pose);
        let decoded = read_pose(&mut Cursor::new(buf.to_vec())).unwrap();
        for (a, b) in pose
            .to_column_major()
            .iter()
            .zip(decoded.to_column_major().iter())
        {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_item_and_pointer_layout() {
        let mut buf = BytesMut::new();
        put_item_id(&mut buf, 0x0102030405060708);
        assert_eq!(&buf[..], &[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut incoming = BytesMut::new();
        incoming.put_u64(99);
        incoming.put_i32(2);
        assert_eq!(
            read_item_raw(&mut Cursor::new(incoming.to_vec())).unwrap(),
            (99, 2)
        );

        let mut buf = BytesMut::new();
        put_ptr(&mut buf, u64::MAX);
        assert_eq!(read_ptr(&mut Cursor::new(buf.to_vec())).unwrap(), u64::MAX);
    }

    #[test]
    fn test_xyz() {
        let mut buf = BytesMut::new();
        put_xyz(&mut buf, &[1.0, 2.0, 3.0]);
        assert_eq!(buf.len(), 24);
        assert_eq!(
            read_xyz(&mut Cursor::new(buf.to_vec())).unwrap(),
            [1.0, 2.0, 3.0]
        );
    }
}
