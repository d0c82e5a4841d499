//! Sampling and combination of group elements.
//!
//! Every random element of the scheme goes through [`random_scalar`], which reads from the random
//! source with [`RngCore::try_fill_bytes`]. Random group elements are then derived as multiples of
//! the fixed generators, which is uniform because the groups have prime order.
use crate::error::Result;

use bls12_381_plus::{group::Group, G1Affine, G1Projective, G2Projective, Scalar};
use rand::RngCore;

/// Amount of random bytes that are reduced modulo the group order.
///
/// 48 bytes keep the bias of the reduction negligible.
const SCALAR_SEED_BYTES: usize = 48;

pub(crate) fn random_scalar<R: RngCore>(mut rng: R) -> Result<Scalar> {
    let mut okm = [0; SCALAR_SEED_BYTES];
    rng.try_fill_bytes(&mut okm)?;
    Ok(Scalar::from_okm(&okm))
}

pub(crate) fn random_g1<R: RngCore>(rng: R) -> Result<G1Projective> {
    Ok(<G1Projective as Group>::generator() * random_scalar(rng)?)
}

pub(crate) fn random_g2<R: RngCore>(rng: R) -> Result<G2Projective> {
    Ok(<G2Projective as Group>::generator() * random_scalar(rng)?)
}

/// Computes `g3 + Σ h_i · id_i` for the given identity path.
///
/// The sum is accumulated in a fresh projective point, `g3` and `hs` are only read. Callers must
/// have checked that `identity` is not longer than `hs`.
pub(crate) fn identity_product(g3: &G1Affine, hs: &[G1Affine], identity: &[Scalar]) -> G1Projective {
    debug_assert!(identity.len() <= hs.len());
    hs.iter()
        .zip(identity)
        .map(|(h, i)| h * i)
        .sum::<G1Projective>()
        + g3
}
