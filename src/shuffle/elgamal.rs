use ark_ec::CurveGroup;
use ark_ff::UniformRand;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};

/// ElGamal pair `(r·G, r·H + M)` encrypting `M` under the public key `H`.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, CanonicalSerialize, CanonicalDeserialize,
)]
#[serde(bound(
    serialize = "C: CanonicalSerialize",
    deserialize = "C: CanonicalDeserialize"
))]
pub struct ElGamalCiphertext<C: CurveGroup> {
    #[serde(with = "crate::crypto_serde::curve")]
    pub c1: C,
    #[serde(with = "crate::crypto_serde::curve")]
    pub c2: C,
}

impl<C: CurveGroup> ElGamalCiphertext<C> {
    pub fn new(c1: C, c2: C) -> Self {
        Self { c1, c2 }
    }

    /// Encrypt a message (curve point) using ElGamal encryption
    /// Returns ElGamalCiphertext(r*G, M + r*PK)
    pub fn encrypt(message: C, randomness: C::ScalarField, public_key: C) -> Self {
        // Start with (0, M) and add encryption layer
        Self::new(C::zero(), message).add_encryption_layer(randomness, public_key)
    }

    pub fn add_encryption_layer(&self, randomness: C::ScalarField, public_key: C) -> Self {
        let generator = C::generator();

        Self {
            c1: self.c1 + generator * randomness,
            c2: self.c2 + public_key * randomness,
        }
    }

    pub fn decrypt(&self, private_key: C::ScalarField) -> C {
        self.c2 - self.c1 * private_key
    }

    /// Splits a list of ciphertexts into the `X` and `Y` vectors a shuffle works on.
    pub fn split(ciphertexts: &[Self]) -> (Vec<C>, Vec<C>) {
        ciphertexts.iter().map(|ct| (ct.c1, ct.c2)).unzip()
    }

    /// Inverse of [`ElGamalCiphertext::split`].
    pub fn join(x: &[C], y: &[C]) -> Vec<Self> {
        x.iter()
            .zip(y)
            .map(|(c1, c2)| Self::new(*c1, *c2))
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct ElGamalKeys<C: CurveGroup> {
    pub private_key: C::ScalarField,
    pub public_key: C,
}

impl<C: CurveGroup> ElGamalKeys<C> {
    pub fn new(private_key: C::ScalarField) -> Self {
        let generator = C::generator();
        let public_key = generator * private_key;
        Self {
            private_key,
            public_key,
        }
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(C::ScalarField::rand(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::serde::{assert_round_trip_eq, assert_round_trip_json};
    use ark_ec::PrimeGroup;
    use ark_grumpkin::Projective as GrumpkinProjective;
    use ark_std::test_rng;

    type Curve = GrumpkinProjective;
    type Scalar = <Curve as PrimeGroup>::ScalarField;

    #[test]
    fn ciphertext_serde_round_trip() {
        let generator = Curve::generator();
        let ciphertext = ElGamalCiphertext::new(
            generator * Scalar::from(7u64),
            generator * Scalar::from(11u64),
        );
        assert_round_trip_eq(&ciphertext);
        assert_round_trip_json(&ciphertext);
    }

    #[test]
    fn layered_encryption_decrypts() {
        let mut rng = test_rng();
        let keys = ElGamalKeys::<Curve>::generate(&mut rng);
        let message = Curve::generator() * Scalar::from(42u64);

        let ciphertext = ElGamalCiphertext::encrypt(message, Scalar::rand(&mut rng), keys.public_key)
            .add_encryption_layer(Scalar::rand(&mut rng), keys.public_key);
        assert_eq!(ciphertext.decrypt(keys.private_key), message);
    }

    #[test]
    fn split_and_join_are_inverse() {
        let mut rng = test_rng();
        let cts: Vec<ElGamalCiphertext<Curve>> = (0..4)
            .map(|_| ElGamalCiphertext::new(Curve::rand(&mut rng), Curve::rand(&mut rng)))
            .collect();
        let (x, y) = ElGamalCiphertext::split(&cts);
        assert_eq!(ElGamalCiphertext::join(&x, &y), cts);
    }
}
