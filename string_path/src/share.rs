//! Compact, URL safe encoding of a finished sequence.
//!
//! Layout before compression, all integers big-endian:
//!
//! ```text
//! [version: u8][shape: u8][width: u16][height: u16][nail count: u16][nail: u16]...
//! ```
//!
//! The buffer is gzip compressed and then base64url encoded without padding.

use std::io::{Read, Write};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};

use crate::{
    algorithm::Computation,
    params::{TableShape, LINE_COUNT_RANGE},
};

pub const VERSION: u8 = 1;
const HEADER_LEN: usize = 8;
/// Largest decompressed payload accepted: a header and one nail per line at
/// the highest line count, plus the starting nail.
pub const MAX_PAYLOAD_LEN: usize = HEADER_LEN + 2 * (*LINE_COUNT_RANGE.end() + 1);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    Circle = 0,
    Rectangle = 1,
}

impl TryFrom<u8> for ShapeKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Circle),
            1 => Ok(Self::Rectangle),
            other => Err(Error::UnknownShape(other)),
        }
    }
}

impl From<&TableShape> for ShapeKind {
    fn from(value: &TableShape) -> Self {
        match value {
            TableShape::Circle { .. } => Self::Circle,
            TableShape::Rectangle { .. } => Self::Rectangle,
        }
    }
}

/// Everything needed to redraw a shared sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shared {
    pub shape: ShapeKind,
    /// Millimeters.
    pub width: u16,
    /// Millimeters.
    pub height: u16,
    pub nail_count: u16,
    pub sequence: Vec<u16>,
}

impl Shared {
    pub fn from_computation(computation: &Computation) -> Result<Self, Error> {
        let shape = &computation.parameters.shape;
        let (width, height) = shape.dimensions();
        let narrow = |value: usize| u16::try_from(value).map_err(|_| Error::Overflow(value));
        let millimeters = |value: f64| narrow(value.round().max(0.0) as usize);
        Ok(Self {
            shape: shape.into(),
            width: millimeters(width)?,
            height: millimeters(height)?,
            nail_count: narrow(computation.nails.len())?,
            sequence: computation
                .sequence
                .iter()
                .map(|&nail| narrow(nail))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Physical outline described by the header.
    pub fn table_shape(&self) -> TableShape {
        match self.shape {
            ShapeKind::Circle => TableShape::Circle {
                hoop_diameter: self.width as f64,
            },
            ShapeKind::Rectangle => TableShape::Rectangle {
                width: self.width as f64,
                height: self.height as f64,
            },
        }
    }
}

pub fn encode(shared: &Shared) -> Result<String, Error> {
    let mut raw = Vec::with_capacity(HEADER_LEN + 2 * shared.sequence.len());
    raw.push(VERSION);
    raw.push(shared.shape as u8);
    for value in [shared.width, shared.height, shared.nail_count]
        .into_iter()
        .chain(shared.sequence.iter().copied())
    {
        raw.extend_from_slice(&value.to_be_bytes());
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&raw)?;
    Ok(URL_SAFE_NO_PAD.encode(encoder.finish()?))
}

pub fn decode(code: &str) -> Result<Shared, Error> {
    let compressed = URL_SAFE_NO_PAD.decode(code.trim())?;
    let mut raw = Vec::new();
    GzDecoder::new(compressed.as_slice())
        .take(MAX_PAYLOAD_LEN as u64 + 1)
        .read_to_end(&mut raw)?;
    if raw.len() > MAX_PAYLOAD_LEN {
        return Err(Error::TooLarge);
    }

    if raw.len() < HEADER_LEN {
        return Err(Error::Truncated(raw.len()));
    }
    if raw[0] != VERSION {
        return Err(Error::UnknownVersion(raw[0]));
    }
    let shape = ShapeKind::try_from(raw[1])?;
    let body = &raw[HEADER_LEN..];
    if body.len() % 2 != 0 {
        return Err(Error::OddLength(body.len()));
    }
    let read = |at: usize| u16::from_be_bytes([raw[at], raw[at + 1]]);
    Ok(Shared {
        shape,
        width: read(2),
        height: read(4),
        nail_count: read(6),
        sequence: body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid share code: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Share code could not be (de)compressed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Share code payload is {0} bytes, shorter than its header")]
    Truncated(usize),
    #[error("Unknown share code version {0}")]
    UnknownVersion(u8),
    #[error("Unknown shape type {0}")]
    UnknownShape(u8),
    #[error("Share code sequence has an odd number of bytes ({0})")]
    OddLength(usize),
    #[error("Share code payload is larger than {max} bytes", max = MAX_PAYLOAD_LEN)]
    TooLarge,
    #[error("{0} does not fit in a share code")]
    Overflow(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(raw: &[u8]) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw).unwrap();
        URL_SAFE_NO_PAD.encode(encoder.finish().unwrap())
    }

    fn sample() -> Shared {
        Shared {
            shape: ShapeKind::Rectangle,
            width: 600,
            height: 400,
            nail_count: 288,
            sequence: vec![0, 143, 12, 287, 40],
        }
    }

    #[test]
    fn round_trip() {
        let code = encode(&sample()).unwrap();
        assert!(!code.contains(['+', '/', '=']));
        assert_eq!(decode(&code).unwrap(), sample());
    }

    #[test]
    fn header_is_big_endian() {
        let code = pack(&[1, 0, 0x01, 0xF4, 0x01, 0xF4, 0x01, 0x20, 0x00, 0x05]);
        let shared = decode(&code).unwrap();
        assert_eq!(shared.shape, ShapeKind::Circle);
        assert_eq!((shared.width, shared.height, shared.nail_count), (500, 500, 288));
        assert_eq!(shared.sequence, [5]);
        assert_eq!(
            shared.table_shape(),
            TableShape::Circle {
                hoop_diameter: 500.0
            }
        );
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!(matches!(
            decode(&pack(&[2, 0, 0, 1, 0, 1, 0, 4])),
            Err(Error::UnknownVersion(2))
        ));
        assert!(matches!(
            decode(&pack(&[1, 7, 0, 1, 0, 1, 0, 4])),
            Err(Error::UnknownShape(7))
        ));
        assert!(matches!(
            decode(&pack(&[1, 0, 0, 1, 0, 1, 0, 4, 0])),
            Err(Error::OddLength(1))
        ));
        assert!(matches!(decode(&pack(&[1, 0, 0])), Err(Error::Truncated(3))));
        assert!(matches!(decode("not base64!"), Err(Error::Base64(_))));
        let mut oversized = vec![1, 0, 0, 1, 0, 1, 0, 4];
        oversized.resize(MAX_PAYLOAD_LEN + 2, 0);
        assert!(matches!(decode(&pack(&oversized)), Err(Error::TooLarge)));
        let mut largest = vec![1, 0, 0, 1, 0, 1, 0, 4];
        largest.resize(MAX_PAYLOAD_LEN, 0);
        assert_eq!(decode(&pack(&largest)).unwrap().sequence.len(), 10001);
        assert!(matches!(
            decode(&URL_SAFE_NO_PAD.encode(b"plain bytes")),
            Err(Error::Io(_))
        ));
    }
}
