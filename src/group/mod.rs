//! Fixed-width binary encoding of group elements and scalars.
//!
//! Every point and scalar travels as its canonical compressed arkworks encoding,
//! without length prefixes. Sizes are a property of the group, so transcripts
//! built from them can be parsed back purely from the protocol structure.

pub mod hiding;

use ark_ec::CurveGroup;
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha3::digest::XofReader;
use thiserror::Error;

pub use hiding::HidingPoint;

/// Extra bytes drawn when reducing a uniform byte string into a scalar, so the
/// modular bias stays below 2^-128.
const WIDE_REDUCTION_MARGIN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("buffer too short: needed {needed} bytes, {available} available")]
    ShortBuffer { needed: usize, available: usize },

    #[error("bytes do not encode a valid group element")]
    InvalidPoint,

    #[error("bytes do not encode a canonical scalar")]
    InvalidScalar,
}

/// Length in bytes of an encoded point of `C`.
pub fn point_len<C: CurveGroup>() -> usize {
    C::zero().compressed_size()
}

/// Length in bytes of an encoded scalar of `F`.
pub fn scalar_len<F: PrimeField>() -> usize {
    F::zero().compressed_size()
}

pub fn encode_point<C: CurveGroup>(point: &C, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    point
        .serialize_compressed(out)
        .map_err(|_| EncodingError::InvalidPoint)
}

pub fn encode_scalar<F: PrimeField>(scalar: &F, out: &mut Vec<u8>) -> Result<(), EncodingError> {
    scalar
        .serialize_compressed(out)
        .map_err(|_| EncodingError::InvalidScalar)
}

/// Marshals a single point into a fresh buffer.
pub fn point_bytes<C: CurveGroup>(point: &C) -> Result<Vec<u8>, EncodingError> {
    let mut out = Vec::with_capacity(point_len::<C>());
    encode_point(point, &mut out)?;
    Ok(out)
}

/// Decodes one point from the front of `input`, advancing the slice.
pub fn decode_point<C: CurveGroup>(input: &mut &[u8]) -> Result<C, EncodingError> {
    let len = point_len::<C>();
    let bytes = take(input, len)?;
    C::deserialize_compressed(bytes).map_err(|_| EncodingError::InvalidPoint)
}

/// Decodes one scalar from the front of `input`, advancing the slice.
pub fn decode_scalar<F: PrimeField>(input: &mut &[u8]) -> Result<F, EncodingError> {
    let len = scalar_len::<F>();
    let bytes = take(input, len)?;
    F::deserialize_compressed(bytes).map_err(|_| EncodingError::InvalidScalar)
}

fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8], EncodingError> {
    if input.len() < len {
        return Err(EncodingError::ShortBuffer {
            needed: len,
            available: input.len(),
        });
    }
    let (head, rest) = input.split_at(len);
    *input = rest;
    Ok(head)
}

/// Draws a scalar from a public byte stream by wide modular reduction.
pub fn scalar_from_xof<F: PrimeField>(reader: &mut impl XofReader) -> F {
    let mut buf = vec![0u8; scalar_len::<F>() + WIDE_REDUCTION_MARGIN];
    reader.read(&mut buf);
    F::from_le_bytes_mod_order(&buf)
}

/// Draws `n` scalars from a public byte stream.
pub fn scalars_from_xof<F: PrimeField>(reader: &mut impl XofReader, n: usize) -> Vec<F> {
    (0..n).map(|_| scalar_from_xof(reader)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::{Fr, G1Projective};
    use ark_ec::PrimeGroup;
    use ark_ff::UniformRand;
    use ark_std::test_rng;
    use sha3::digest::{ExtendableOutput, Update};
    use sha3::Shake256;

    #[test]
    fn test_point_codec_consumes_exact_width() {
        let mut rng = test_rng();
        let a = G1Projective::generator() * Fr::rand(&mut rng);
        let b = G1Projective::generator() * Fr::rand(&mut rng);

        let mut buf = Vec::new();
        encode_point(&a, &mut buf).unwrap();
        encode_point(&b, &mut buf).unwrap();
        assert_eq!(buf.len(), 2 * point_len::<G1Projective>());

        let mut cursor = &buf[..];
        assert_eq!(decode_point::<G1Projective>(&mut cursor).unwrap(), a);
        assert_eq!(decode_point::<G1Projective>(&mut cursor).unwrap(), b);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_decode_reports_short_buffer() {
        let buf = vec![0u8; scalar_len::<Fr>() - 1];
        let mut cursor = &buf[..];
        let err = decode_scalar::<Fr>(&mut cursor).unwrap_err();
        assert!(matches!(err, EncodingError::ShortBuffer { .. }));
    }

    #[test]
    fn test_decode_rejects_non_canonical_scalar() {
        let buf = vec![0xffu8; scalar_len::<Fr>()];
        let mut cursor = &buf[..];
        assert_eq!(
            decode_scalar::<Fr>(&mut cursor).unwrap_err(),
            EncodingError::InvalidScalar
        );
    }

    #[test]
    fn test_xof_scalars_are_deterministic() {
        let mut hasher = Shake256::default();
        hasher.update(b"seed");
        let mut r1 = hasher.clone().finalize_xof();
        let mut r2 = hasher.finalize_xof();
        let a: Vec<Fr> = scalars_from_xof(&mut r1, 3);
        let b: Vec<Fr> = scalars_from_xof(&mut r2, 3);
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }
}
