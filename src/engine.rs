// Cipher and decipher arbitrary-length messages under one RSA key pair.

use crate::error::{Result, RsaError};
use crate::keygen::{KeyGenConfig, KeyGenerator};
use crate::keys::{KeyPair, Role};
use crate::modpow::mod_pow;
use crate::padding::PaddingCodec;

use log::{debug, trace};
use num_bigint::BigUint;
use num_traits::One;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

const SELF_CHECK_VALUE: &[u8] = b"the quick brown fox jumps over the lazy dog";

/// RSA over fixed-width blocks, with a role choosing which key ciphers.
///
/// The engine holds no mutable state: `cipher` and `decipher` are pure
/// functions of their input and the key pair, and blocks are processed in
/// parallel.
#[derive(Debug, Clone)]
pub struct RsaEngine {
    keys: KeyPair,
    role: Role,
    codec: PaddingCodec,
}

impl RsaEngine {
    pub fn with_generated_keys(config: KeyGenConfig, role: Role) -> Result<Self> {
        Self::with_generated_keys_from_rng(config, role, &mut StdRng::from_entropy())
    }

    pub fn with_generated_keys_from_rng<R: Rng + ?Sized>(
        config: KeyGenConfig,
        role: Role,
        rng: &mut R,
    ) -> Result<Self> {
        let keys = KeyGenerator::new(config)?.generate(rng)?;
        Self::with_keys(keys, role)
    }

    /// Build an engine around an existing key pair.
    ///
    /// Fails with `KeyIntegrityFailure` unless a fixed value survives
    /// ciphering with either key and deciphering with the other.
    pub fn with_keys(keys: KeyPair, role: Role) -> Result<Self> {
        check_key_integrity(&keys)?;
        debug!("{}-bit key pair passed its self-check", keys.bits());
        let codec = PaddingCodec::new(keys.block_width());
        Ok(Self { keys, role, codec })
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.keys
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn block_width(&self) -> usize {
        self.codec.block_width()
    }

    pub fn cipher(&self, message: &[u8]) -> Vec<u8> {
        let blocks = self.codec.encode(message);
        trace!("ciphering {} bytes as {} blocks", message.len(), blocks.len());
        let (exponent, modulus) = self.keys.key_for(self.role);
        blocks
            .par_iter()
            .map(|block| {
                debug_assert!(BigUint::from_bytes_be(block) < *modulus);
                self.apply(exponent, modulus, block)
            })
            .collect::<Vec<_>>()
            .concat()
    }

    pub fn decipher(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let width = self.block_width();
        if ciphertext.len() % width != 0 {
            return Err(RsaError::MalformedCiphertext(format!(
                "length {} is not a multiple of the {width}-byte block width",
                ciphertext.len()
            )));
        }
        trace!("deciphering {} blocks", ciphertext.len() / width);
        let (exponent, modulus) = self.keys.key_for(self.role.opposite());
        let blocks: Vec<Vec<u8>> = ciphertext
            .par_chunks(width)
            .map(|block| self.apply(exponent, modulus, block))
            .collect();
        self.codec.decode(&blocks)
    }

    fn apply(&self, exponent: &BigUint, modulus: &BigUint, block: &[u8]) -> Vec<u8> {
        let value = mod_pow(&BigUint::from_bytes_be(block), exponent, modulus);
        to_fixed_width(&value, self.block_width())
    }
}

fn check_key_integrity(keys: &KeyPair) -> Result<()> {
    let value = self_check_value(keys.modulus());
    for role in [Role::Public, Role::Private] {
        let (exponent, modulus) = keys.key_for(role);
        let ciphered = mod_pow(&value, exponent, modulus);
        let (exponent, modulus) = keys.key_for(role.opposite());
        let deciphered = mod_pow(&ciphered, exponent, modulus);
        if deciphered != value {
            return Err(RsaError::KeyIntegrityFailure);
        }
    }
    Ok(())
}

/// The fixed check value reduced modulo `n`. Zero and one are fixed points of
/// every exponent, so they are replaced with two.
fn self_check_value(n: &BigUint) -> BigUint {
    let value = BigUint::from_bytes_be(SELF_CHECK_VALUE) % n;
    if value <= BigUint::one() {
        BigUint::from(2u64)
    } else {
        value
    }
}

/// Big-endian bytes of `value`, left-padded with zeros to `width`.
fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    debug_assert!(bytes.len() <= width);
    let mut out = vec![0u8; width];
    out[width - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::padding::{SENTINEL, TERMINATOR};

    use rstest::rstest;

    use std::sync::OnceLock;

    // 251 * 257, e = 7, d = 7^-1 mod 250 * 256
    fn tiny_keys() -> KeyPair {
        KeyPair::from_parts(
            BigUint::from(9_143u64),
            BigUint::from(7u64),
            BigUint::from(64_507u64),
        )
        .unwrap()
    }

    fn keys_512() -> &'static KeyPair {
        static KEYS: OnceLock<KeyPair> = OnceLock::new();
        KEYS.get_or_init(|| {
            KeyGenerator::new(KeyGenConfig::default().with_key_bits(512))
                .unwrap()
                .generate(&mut StdRng::from_seed([21; 32]))
                .unwrap()
        })
    }

    fn engine(role: Role) -> RsaEngine {
        RsaEngine::with_keys(keys_512().clone(), role).unwrap()
    }

    #[test]
    fn scenario_a_round_trips_repeated_message_over_2048_bit_keys() {
        let mut rng = StdRng::from_seed([101; 32]);
        let keys = KeyGenerator::new(KeyGenConfig::default())
            .unwrap()
            .generate(&mut rng)
            .unwrap();
        let public = RsaEngine::with_keys(keys.clone(), Role::Public).unwrap();
        let private = RsaEngine::with_keys(keys, Role::Private).unwrap();
        let message = "Hello, world!".repeat(100).into_bytes();
        assert_eq!(message.len(), 1300);
        assert_eq!(public.block_width(), 256);

        let encrypted = public.cipher(&message);
        let signed = private.cipher(&message);

        assert_eq!(encrypted.len(), 6 * 256);
        assert_eq!(public.decipher(&encrypted).unwrap(), message);
        assert_eq!(private.decipher(&signed).unwrap(), message);
        assert_ne!(encrypted, signed);
    }

    #[rstest]
    #[case(Role::Public)]
    #[case(Role::Private)]
    fn scenario_b_empty_message_is_one_padding_block(#[case] role: Role) {
        let engine = engine(role);

        let ciphertext = engine.cipher(b"");

        assert_eq!(ciphertext.len(), engine.block_width());
        assert_eq!(engine.decipher(&ciphertext).unwrap(), b"");
    }

    #[rstest]
    #[case(b"\x80".to_vec())]
    #[case(b"last byte is the terminator value\x80".to_vec())]
    #[case(vec![TERMINATOR; 63])]
    #[case(vec![TERMINATOR; 200])]
    fn scenario_c_message_ending_in_terminator_value_round_trips(#[case] message: Vec<u8>) {
        let engine = engine(Role::Public);

        let ciphertext = engine.cipher(&message);

        assert_eq!(engine.decipher(&ciphertext).unwrap(), message);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn scenario_d_payload_aligned_message_gets_extra_block(#[case] n_payloads: usize) {
        let engine = engine(Role::Private);
        let payload_width = engine.block_width() - 1;
        let message: Vec<u8> = (0..n_payloads * payload_width).map(|i| i as u8).collect();

        let ciphertext = engine.cipher(&message);

        assert_eq!(ciphertext.len(), (n_payloads + 1) * engine.block_width());
        assert_eq!(engine.decipher(&ciphertext).unwrap(), message);
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"A".as_slice())]
    #[case(b"\x00".as_slice())]
    #[case(b"\xff\xff\xff\xff".as_slice())]
    #[case(b"Factoring is hard.".as_slice())]
    fn tiny_key_round_trips_in_both_roles(#[case] message: &[u8]) {
        for role in [Role::Public, Role::Private] {
            let engine = RsaEngine::with_keys(tiny_keys(), role).unwrap();

            let ciphertext = engine.cipher(message);

            assert_eq!(ciphertext.len(), 2 * (message.len() + 1));
            assert_eq!(engine.decipher(&ciphertext).unwrap(), message);
        }
    }

    #[test]
    fn cipher_is_deterministic_and_blockwise() {
        let engine = RsaEngine::with_keys(tiny_keys(), Role::Public).unwrap();

        let whole = engine.cipher(b"AB");
        let again = engine.cipher(b"AB");

        // Each one-byte payload is ciphered independently.
        assert_eq!(whole, again);
        assert_eq!(whole[..2], engine.cipher(b"A")[..2]);
        assert_eq!(whole[2..4], engine.cipher(b"B")[..2]);
    }

    #[test]
    fn signature_is_only_recovered_with_the_public_key() {
        let signer = engine(Role::Private);
        let wrong_key_reader = engine(Role::Public);
        let message = b"signed by the private key";

        let signature = signer.cipher(message);

        assert_eq!(signer.decipher(&signature).unwrap(), message);
        assert_ne!(
            wrong_key_reader.decipher(&signature).ok(),
            Some(message.to_vec())
        );
    }

    #[rstest]
    #[case(1)]
    #[case(63)]
    #[case(65)]
    fn decipher_rejects_ciphertext_of_partial_block(#[case] len: usize) {
        let engine = engine(Role::Public);

        let result = engine.decipher(&vec![0u8; len]);

        assert!(matches!(result, Err(RsaError::MalformedCiphertext(_))));
    }

    #[test]
    fn decipher_rejects_empty_ciphertext() {
        let engine = engine(Role::Public);

        let result = engine.decipher(b"");

        assert!(matches!(result, Err(RsaError::MalformedCiphertext(_))));
    }

    #[test]
    fn decipher_does_not_recover_message_ciphered_under_another_key() {
        let other_keys = KeyGenerator::new(KeyGenConfig::default().with_key_bits(512))
            .unwrap()
            .generate(&mut StdRng::from_seed([22; 32]))
            .unwrap();
        let other = RsaEngine::with_keys(other_keys, Role::Public).unwrap();
        let message = b"not for you";
        let ciphertext = other.cipher(message);

        let result = engine(Role::Public).decipher(&ciphertext);

        assert_ne!(result.ok(), Some(message.to_vec()));
    }

    #[test]
    fn with_keys_rejects_pair_that_fails_self_check() {
        // d is not the inverse of e modulo the totient.
        let keys = KeyPair::from_parts(
            BigUint::from(9_145u64),
            BigUint::from(7u64),
            BigUint::from(64_507u64),
        )
        .unwrap();

        let result = RsaEngine::with_keys(keys, Role::Public);

        assert_eq!(result.err(), Some(RsaError::KeyIntegrityFailure));
    }

    #[test]
    fn with_generated_keys_from_rng_builds_working_engine() {
        let mut rng = StdRng::from_seed([23; 32]);
        let config = KeyGenConfig::default().with_key_bits(256);

        let engine = RsaEngine::with_generated_keys_from_rng(config, Role::Private, &mut rng)
            .unwrap();

        assert_eq!(engine.role(), Role::Private);
        assert_eq!(engine.key_pair().bits(), 256);
        assert_eq!(engine.block_width(), 32);
        let ciphertext = engine.cipher(b"generated");
        assert_eq!(engine.decipher(&ciphertext).unwrap(), b"generated");
    }

    #[test]
    fn with_generated_keys_rejects_invalid_size() {
        let config = KeyGenConfig::default().with_key_bits(100);

        let result = RsaEngine::with_generated_keys(config, Role::Public);

        assert_eq!(result.err(), Some(RsaError::InvalidKeySize(100)));
    }

    #[test]
    fn plaintext_blocks_start_with_sentinel_below_modulus() {
        let keys = keys_512();
        let codec = PaddingCodec::new(keys.block_width());

        for block in codec.encode(&[0xff; 200]) {
            assert_eq!(block[0], SENTINEL);
            assert!(BigUint::from_bytes_be(&block) < *keys.modulus());
        }
    }

    #[rstest]
    #[case(BigUint::from_bytes_be(SELF_CHECK_VALUE))]
    #[case(BigUint::from_bytes_be(SELF_CHECK_VALUE) - 1u32)]
    #[case(BigUint::from_bytes_be(SELF_CHECK_VALUE) / 3u32)]
    fn self_check_value_avoids_fixed_points(#[case] n: BigUint) {
        let value = self_check_value(&n);

        assert!(value > BigUint::one());
    }

    #[test]
    fn self_check_value_is_reduced_below_modulus() {
        let n = BigUint::from(64_507u64);

        let value = self_check_value(&n);

        assert!(value < n);
        assert_eq!(value, BigUint::from_bytes_be(SELF_CHECK_VALUE) % &n);
    }

    #[test]
    fn to_fixed_width_left_pads_small_values() {
        let padded = to_fixed_width(&BigUint::from(0x0102u64), 4);

        assert_eq!(padded, vec![0, 0, 1, 2]);
    }
}
