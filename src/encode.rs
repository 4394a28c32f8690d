// Flat wire form of an upload: a run of (x, y, count) triples.
//
// Each triple is x as a u32, y as a big-endian integer exactly as wide as
// the field (see Field::byte_len), then count as a u32, all in network
// order.  A payload is valid only if it is a whole number of triples.

use byteorder::{ByteOrder, NetworkEndian, WriteBytesExt};
use num::bigint::BigUint;

use crate::data::AggregatePoint;
use crate::error::{Error, Result};
use crate::math::Field;

pub fn triple_len(field: &Field) -> usize {
    4 + field.byte_len() + 4
}

pub fn encode_points(points: &[AggregatePoint], field: &Field) -> Result<Vec<u8>> {
    let width = field.byte_len();
    let mut out = Vec::with_capacity(points.len() * triple_len(field));
    for p in points {
        let y = field.element(p.y.clone())?.to_bytes_be();
        // y is reduced, so it fits in `width` bytes.
        out.write_u32::<NetworkEndian>(p.x)?;
        out.resize(out.len() + width - y.len(), 0);
        out.extend_from_slice(&y);
        out.write_u32::<NetworkEndian>(p.count)?;
    }
    Ok(out)
}

pub fn decode_points(payload: &[u8], field: &Field) -> Result<Vec<AggregatePoint>> {
    let len = triple_len(field);
    if payload.len() % len != 0 {
        return Err(Error::Encoding("payload is not a whole number of triples"));
    }
    let width = field.byte_len();

    payload
        .chunks_exact(len)
        .map(|triple| {
            let (x, rest) = triple.split_at(4);
            let (y, count) = rest.split_at(width);
            Ok(AggregatePoint::new(
                NetworkEndian::read_u32(x),
                field.element(BigUint::from_bytes_be(y))?,
                NetworkEndian::read_u32(count),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        let field = Field::mersenne127();
        assert_eq!(triple_len(&field), 24);

        let points = vec![AggregatePoint::new(3, BigUint::from(0x0102u32), 2)];
        let bytes = encode_points(&points, &field).unwrap();
        let mut expected = vec![0, 0, 0, 3];
        expected.extend_from_slice(&[0; 14]);
        expected.extend_from_slice(&[1, 2]);
        expected.extend_from_slice(&[0, 0, 0, 2]);
        assert_eq!(bytes, expected);

        assert_eq!(decode_points(&bytes, &field).unwrap(), points);
    }

    #[test]
    fn empty_payload() {
        let field = Field::mersenne127();
        assert_eq!(encode_points(&[], &field).unwrap(), Vec::<u8>::new());
        assert!(decode_points(&[], &field).unwrap().is_empty());
    }

    #[test]
    fn ragged_payload() {
        let field = Field::mersenne127();
        let points = vec![
            AggregatePoint::new(1, BigUint::from(9u32), 1),
            AggregatePoint::new(2, BigUint::from(8u32), 3),
        ];
        let bytes = encode_points(&points, &field).unwrap();
        assert!(matches!(
            decode_points(&bytes[..bytes.len() - 1], &field),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn unreduced_values_rejected() {
        let field = Field::from_u64(65537).unwrap();
        assert_eq!(field.byte_len(), 3);
        let too_big = vec![AggregatePoint::new(1, BigUint::from(65537u32), 1)];
        assert!(matches!(
            encode_points(&too_big, &field),
            Err(Error::ValueOutOfRange)
        ));

        let bytes = [0, 0, 0, 1, 0xff, 0xff, 0xff, 0, 0, 0, 1];
        assert!(matches!(
            decode_points(&bytes, &field),
            Err(Error::ValueOutOfRange)
        ));
    }
}
