//! Uniform-looking point encodings (Elligator 2).
//!
//! Twisted Edwards curves are birationally equivalent to Montgomery curves
//! `B·v² = u³ + A·u² + u`, on which Elligator 2 gives an injective map from
//! roughly half of the points to field elements in `[0, (p-1)/2]`. Those
//! field elements are written little-endian with their unused top bits
//! randomized, so for fields close to a power of two the result cannot be
//! told apart from random bytes.
//!
//! Random bytes decode to points of any order, so a uniformly random
//! low-order point is added before encoding. [`HidingPoint::prime_component`]
//! strips it again on the receiving side.

use ark_ec::twisted_edwards::{Affine, Projective, TECurveConfig};
use ark_ec::{CurveGroup, PrimeGroup};
use ark_ff::{BigInteger, Field, One, PrimeField, UniformRand, Zero};
use ark_std::rand::RngCore;

use super::EncodingError;

/// A group whose elements may have a representation indistinguishable from
/// uniformly random bytes.
pub trait HidingPoint: CurveGroup {
    /// Length of every hidden encoding.
    fn hide_len() -> usize;

    /// Encodes this point plus a random element of the cofactor subgroup.
    ///
    /// Returns `None` when the sum has no hidden representation; callers
    /// pick a fresh point and retry.
    fn hide_encode<R: RngCore + ?Sized>(&self, rng: &mut R) -> Option<Vec<u8>>;

    /// Maps any `hide_len()` bytes to a point. Only fails on short input.
    fn hide_decode(bytes: &[u8]) -> Result<Self, EncodingError>;

    /// Projection onto the prime-order subgroup, dropping any low-order
    /// component. Points of the prime-order subgroup are left unchanged.
    fn prime_component(&self) -> Self;
}

/// Montgomery-form constants of a twisted Edwards curve, plus the Elligator
/// non-square `z`.
struct MontgomeryForm<F> {
    a: F,
    b_inv: F,
    z: F,
}

impl<F: PrimeField> MontgomeryForm<F> {
    fn of<P: TECurveConfig<BaseField = F>>() -> Self {
        let a_minus_d = P::COEFF_A - P::COEFF_D;
        // a != d for every non-degenerate twisted Edwards curve.
        let a = F::from(2u64) * (P::COEFF_A + P::COEFF_D) / a_minus_d;
        let b_inv = a_minus_d / F::from(4u64);

        let mut candidate = 2u64;
        let z = loop {
            let z = F::from(candidate);
            if z.sqrt().is_none() {
                break z;
            }
            candidate += 1;
        };

        Self { a, b_inv, z }
    }

    /// Right-hand side of the curve equation divided by `B`.
    fn rhs(&self, u: F) -> F {
        u * (u.square() + self.a * u + F::one()) * self.b_inv
    }
}

fn is_negative<F: PrimeField>(x: &F) -> bool {
    x.into_bigint() > F::MODULUS_MINUS_ONE_DIV_TWO
}

fn non_negative<F: PrimeField>(x: F) -> F {
    if is_negative(&x) {
        -x
    } else {
        x
    }
}

/// A uniformly random element of the cofactor subgroup.
///
/// Uniform points of the whole curve come from random `y` coordinates; their
/// low-order components are uniform too.
fn random_torsion<P, R>(rng: &mut R) -> Projective<P>
where
    P: TECurveConfig,
    P::BaseField: PrimeField,
    R: RngCore + ?Sized,
{
    let one = P::BaseField::one();
    loop {
        let y = P::BaseField::rand(rng);
        let y2 = y.square();
        let Some(den_inv) = (P::COEFF_A - P::COEFF_D * y2).inverse() else {
            continue;
        };
        let Some(mut x) = ((one - y2) * den_inv).sqrt() else {
            continue;
        };
        if rng.next_u32() & 1 == 1 {
            x = -x;
        }
        let point: Projective<P> = Affine::<P>::new_unchecked(x, y).into();
        return point - point.prime_component();
    }
}

/// Bit index from which encodings carry random padding instead of value bits.
fn value_bits<F: PrimeField>() -> usize {
    F::MODULUS_BIT_SIZE as usize - 1
}

impl<P> HidingPoint for Projective<P>
where
    P: TECurveConfig,
    P::BaseField: PrimeField,
{
    fn hide_len() -> usize {
        (P::BaseField::MODULUS_BIT_SIZE as usize + 7) / 8
    }

    fn hide_encode<R: RngCore + ?Sized>(&self, rng: &mut R) -> Option<Vec<u8>> {
        let mont = MontgomeryForm::<P::BaseField>::of::<P>();
        let affine = (*self + random_torsion::<P, R>(rng)).into_affine();
        let (x, y) = (affine.x, affine.y);

        let one = P::BaseField::one();
        let u = (one + y) * (one - y).inverse()?;
        let v = u * x.inverse()?;
        let u_plus_a = u + mont.a;
        if v.is_zero() || u_plus_a.is_zero() {
            return None;
        }

        let r_squared = if is_negative(&v) {
            -u / (mont.z * u_plus_a)
        } else {
            -u_plus_a / (mont.z * u)
        };
        let r = non_negative(r_squared.sqrt()?);

        let len = Self::hide_len();
        let mut out = r.into_bigint().to_bytes_le();
        out.resize(len, 0);

        let pad_from = value_bits::<P::BaseField>();
        let mut noise = vec![0u8; len];
        rng.fill_bytes(&mut noise);
        for bit in pad_from..len * 8 {
            out[bit / 8] |= noise[bit / 8] & (1 << (bit % 8));
        }
        Some(out)
    }

    fn hide_decode(bytes: &[u8]) -> Result<Self, EncodingError> {
        let len = Self::hide_len();
        if bytes.len() < len {
            return Err(EncodingError::ShortBuffer {
                needed: len,
                available: bytes.len(),
            });
        }
        let mut repr = bytes[..len].to_vec();
        for bit in value_bits::<P::BaseField>()..len * 8 {
            repr[bit / 8] &= !(1 << (bit % 8));
        }
        let r = P::BaseField::from_le_bytes_mod_order(&repr);

        let mont = MontgomeryForm::<P::BaseField>::of::<P>();
        let one = P::BaseField::one();
        let Some(denominator_inv) = (one + mont.z * r.square()).inverse() else {
            return Ok(Self::zero());
        };
        let w = -mont.a * denominator_inv;

        let (u, v) = match mont.rhs(w).sqrt() {
            Some(root) => (w, non_negative(root)),
            None => {
                let u = -w - mont.a;
                match mont.rhs(u).sqrt() {
                    Some(root) => (u, -non_negative(root)),
                    None => return Ok(Self::zero()),
                }
            }
        };

        // Points of small order have no affine Edwards image.
        let (Some(v_inv), Some(u_plus_one_inv)) = (v.inverse(), (u + one).inverse()) else {
            return Ok(Self::zero());
        };
        let x = u * v_inv;
        let y = (u - one) * u_plus_one_inv;
        Ok(Affine::<P>::new_unchecked(x, y).into())
    }

    fn prime_component(&self) -> Self {
        // h·(h⁻¹ mod r) is 1 modulo r and kills the cofactor subgroup.
        (*self * P::COFACTOR_INV).mul_bigint(P::COFACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::PrimeGroup;
    use ark_ed25519::{EdwardsProjective, Fr};
    use ark_ff::UniformRand;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    type BabyJubjub = ark_ed_on_bn254::EdwardsProjective;

    fn encodable_point<C: HidingPoint, R: RngCore>(rng: &mut R) -> (C, Vec<u8>) {
        loop {
            let point = C::generator() * C::ScalarField::rand(rng);
            if let Some(bytes) = point.hide_encode(rng) {
                return (point, bytes);
            }
        }
    }

    #[test]
    fn test_ed25519_hide_len_is_key_len() {
        assert_eq!(EdwardsProjective::hide_len(), 32);
    }

    #[test]
    fn test_hidden_points_decode_to_themselves() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let (point, bytes) = encodable_point::<EdwardsProjective, _>(&mut rng);
            assert_eq!(bytes.len(), EdwardsProjective::hide_len());
            let decoded = EdwardsProjective::hide_decode(&bytes).unwrap();
            assert_eq!(decoded.prime_component(), point);
        }
    }

    #[test]
    fn test_hiding_is_generic_over_edwards_curves() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..8 {
            let (point, bytes) = encodable_point::<BabyJubjub, _>(&mut rng);
            assert_eq!(BabyJubjub::hide_decode(&bytes).unwrap().prime_component(), point);
        }
    }

    #[test]
    fn test_roughly_half_of_points_are_encodable() {
        let mut rng = StdRng::seed_from_u64(3);
        let trials = 200;
        let encodable = (0..trials)
            .filter(|_| {
                let point = EdwardsProjective::generator() * Fr::rand(&mut rng);
                point.hide_encode(&mut rng).is_some()
            })
            .count();
        assert!(encodable > trials / 4 && encodable < trials * 3 / 4);
    }

    #[test]
    fn test_padding_bits_are_randomized() {
        let mut rng = StdRng::seed_from_u64(5);
        let (point, _) = encodable_point::<EdwardsProjective, _>(&mut rng);
        let top_bits: std::collections::HashSet<u8> = (0..64)
            .filter_map(|_| point.hide_encode(&mut rng))
            .map(|bytes| bytes[31] & 0xc0)
            .collect();
        assert!(top_bits.len() > 1);
    }

    #[test]
    fn test_decode_accepts_arbitrary_bytes() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..32 {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            let point = EdwardsProjective::hide_decode(&bytes).unwrap();
            assert!(point.into_affine().is_on_curve());
        }
    }

    fn in_prime_subgroup(point: &EdwardsProjective) -> bool {
        point.mul_bigint(Fr::MODULUS).is_zero()
    }

    #[test]
    fn test_prime_component_drops_low_order_part() {
        let mut rng = StdRng::seed_from_u64(13);
        let point = EdwardsProjective::generator() * Fr::rand(&mut rng);
        assert_eq!(point.prime_component(), point);

        let torsion = random_torsion::<ark_ed25519::EdwardsConfig, _>(&mut rng);
        assert!(torsion.mul_bigint([8u64]).is_zero());
        assert_eq!((point + torsion).prime_component(), point);
    }

    #[test]
    fn test_hidden_encodings_match_random_bytes_on_subgroup_membership() {
        let mut rng = StdRng::seed_from_u64(17);
        let samples = 600;

        let mut honest = 0;
        let mut encoded = 0;
        while encoded < samples {
            let point = EdwardsProjective::generator() * Fr::rand(&mut rng);
            let Some(bytes) = point.hide_encode(&mut rng) else {
                continue;
            };
            encoded += 1;
            if in_prime_subgroup(&EdwardsProjective::hide_decode(&bytes).unwrap()) {
                honest += 1;
            }
        }

        let random = (0..samples)
            .filter(|_| {
                let mut bytes = [0u8; 32];
                rng.fill_bytes(&mut bytes);
                in_prime_subgroup(&EdwardsProjective::hide_decode(&bytes).unwrap())
            })
            .count();

        // About one in eight either way with cofactor 8.
        assert!(honest < samples / 3, "honest encodings in subgroup: {honest}");
        assert!(random < samples / 3, "random bytes in subgroup: {random}");
        assert!(honest.abs_diff(random) < 60, "honest {honest} vs random {random}");
    }

    #[test]
    fn test_decode_rejects_short_input() {
        assert!(matches!(
            EdwardsProjective::hide_decode(&[0u8; 31]),
            Err(EncodingError::ShortBuffer { .. })
        ));
    }
}
