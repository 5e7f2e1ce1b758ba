//! `WireGuard` key types.
//!
//! `WireGuard` uses Curve25519 for key exchange. Keys are 32 bytes and travel
//! as standard base64 (44 characters). Private, public and preshared keys are
//! distinct types so one can never be passed where another is expected.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use subtle::ConstantTimeEq;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{Result, WireGuardError};

/// `WireGuard` key size in bytes (256-bit Curve25519 keys).
pub const KEY_SIZE: usize = 32;

fn array_from_slice(bytes: &[u8]) -> Result<[u8; KEY_SIZE]> {
    <[u8; KEY_SIZE]>::try_from(bytes).map_err(|_| {
        WireGuardError::InvalidKey(format!("expected {KEY_SIZE} bytes, got {}", bytes.len()))
    })
}

fn decode_base64(s: &str) -> Result<[u8; KEY_SIZE]> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(s.trim())?;
    array_from_slice(&bytes)
}

fn encode_base64(bytes: &[u8; KEY_SIZE]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn is_zero(bytes: &[u8; KEY_SIZE]) -> bool {
    bytes.iter().all(|&b| b == 0)
}

/// Text form, `FromStr` and serde (base64 string) shared by all key kinds.
macro_rules! base64_key_impls {
    ($ty:ident) => {
        impl $ty {
            /// Creates a key from a byte slice.
            ///
            /// # Errors
            ///
            /// Returns an error if the slice is not exactly 32 bytes.
            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                array_from_slice(bytes).map(Self)
            }

            /// Returns the raw bytes of the key.
            #[must_use]
            pub const fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.0
            }

            /// Encodes the key as base64.
            #[must_use]
            pub fn to_base64(&self) -> String {
                encode_base64(&self.0)
            }

            /// Decodes a key from base64.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is not valid base64 or wrong length.
            pub fn from_base64(s: &str) -> Result<Self> {
                decode_base64(s).map(Self)
            }
        }

        impl FromStr for $ty {
            type Err = WireGuardError;

            fn from_str(s: &str) -> Result<Self> {
                Self::from_base64(s)
            }
        }

        impl Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.to_base64())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                Self::from_base64(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A `WireGuard` private key (Curve25519 scalar, 32 bytes).
///
/// Any 32 bytes can be held, but only a clamped value is valid; see
/// [`PrivateKey::is_valid`]. The all-zero default is never valid.
#[derive(Clone, Default)]
pub struct PrivateKey([u8; KEY_SIZE]);

base64_key_impls!(PrivateKey);

impl PrivateKey {
    /// Generates a new random, clamped private key.
    ///
    /// Panics if the operating system entropy source is unavailable.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self::from_bytes_array(clamp(bytes))
    }

    /// Creates a private key from a 32-byte array, without clamping.
    #[must_use]
    pub const fn from_bytes_array(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns whether the key is a clamped Curve25519 scalar.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_clamped(&self.0)
    }

    /// Derives the corresponding public key.
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::InvalidKey`] if the key is not clamped.
    pub fn public_key(&self) -> Result<PublicKey> {
        if !self.is_valid() {
            return Err(WireGuardError::InvalidKey(
                "private key is not a clamped Curve25519 scalar".to_string(),
            ));
        }
        let secret = StaticSecret::from(self.0);
        Ok(PublicKey::from(X25519PublicKey::from(&secret)))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PrivateKey {}

/// A `WireGuard` public key (Curve25519 point, 32 bytes).
///
/// The all-zero value means "absent" and is not valid.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_SIZE]);

base64_key_impls!(PublicKey);

impl PublicKey {
    /// Creates a public key from raw bytes.
    #[must_use]
    pub const fn from_bytes_array(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns whether the key is non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !is_zero(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b64 = self.to_base64();
        let short = &b64[..8.min(b64.len())];
        write!(f, "PublicKey({short}...)")
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl From<X25519PublicKey> for PublicKey {
    fn from(key: X25519PublicKey) -> Self {
        Self::from_bytes_array(*key.as_bytes())
    }
}

/// A `WireGuard` preshared key (symmetric, 32 bytes, no clamping).
///
/// The all-zero value means "absent" and is not valid.
#[derive(Clone)]
pub struct PresharedKey([u8; KEY_SIZE]);

base64_key_impls!(PresharedKey);

impl PresharedKey {
    /// Generates a new random preshared key from OS entropy.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Creates a preshared key from raw bytes.
    #[must_use]
    pub const fn from_bytes_array(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns whether the key is non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !is_zero(&self.0)
    }
}

impl fmt::Debug for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresharedKey").field("key", &"[REDACTED]").finish()
    }
}

impl fmt::Display for PresharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl PartialEq for PresharedKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for PresharedKey {}

/// A `WireGuard` key pair (private + public).
#[derive(Clone)]
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generates a new random key pair.
    #[must_use]
    pub fn generate() -> Self {
        let (private, public) = generate_keypair();
        Self { private, public }
    }

    /// Creates a key pair from an existing private key.
    ///
    /// # Errors
    ///
    /// Returns [`WireGuardError::InvalidKey`] if the key is not clamped.
    pub fn from_private_key(private: PrivateKey) -> Result<Self> {
        let public = private.public_key()?;
        Ok(Self { private, public })
    }

    /// Returns a reference to the private key.
    #[must_use]
    pub const fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Returns a reference to the public key.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Splits the pair into its two halves.
    #[must_use]
    pub fn into_parts(self) -> (PrivateKey, PublicKey) {
        (self.private, self.public)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}

/// Applies Curve25519 scalar clamping.
#[must_use]
pub const fn clamp(mut bytes: [u8; KEY_SIZE]) -> [u8; KEY_SIZE] {
    bytes[0] &= 0xF8;
    bytes[31] &= 0x7F;
    bytes[31] |= 0x40;
    bytes
}

fn is_clamped(bytes: &[u8; KEY_SIZE]) -> bool {
    bytes[0] & 0xF8 == bytes[0] && bytes[31] & 0x80 == 0 && bytes[31] & 0x40 == 0x40
}

/// Generates a new random, clamped private key.
#[must_use]
pub fn generate_private_key() -> PrivateKey {
    PrivateKey::generate()
}

/// Derives a public key from a private key.
///
/// # Errors
///
/// Returns [`WireGuardError::InvalidKey`] if the key is not clamped.
pub fn derive_public_key(private: &PrivateKey) -> Result<PublicKey> {
    private.public_key()
}

/// Generates a new `WireGuard` keypair.
#[must_use]
pub fn generate_keypair() -> (PrivateKey, PublicKey) {
    let private = PrivateKey::generate();
    // A freshly generated key is always clamped.
    let secret = StaticSecret::from(private.0);
    let public = PublicKey::from(X25519PublicKey::from(&secret));
    (private, public)
}

/// Generates a new random preshared key.
#[must_use]
pub fn generate_preshared_key() -> PresharedKey {
    PresharedKey::generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_hex(s: &str) -> [u8; KEY_SIZE] {
        let mut out = [0u8; KEY_SIZE];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).expect("hex");
        }
        out
    }

    #[test]
    fn generated_private_key_is_clamped() {
        for _ in 0..64 {
            let key = generate_private_key();
            let b = key.as_bytes();
            assert_eq!(b[0] & 0xF8, b[0]);
            assert_eq!(b[31] & 0x80, 0);
            assert_eq!(b[31] & 0x40, 0x40);
            assert!(key.is_valid());
        }
    }

    #[test]
    fn rfc7748_vector() {
        // Alice's scalar from RFC 7748 section 6.1, pre-clamped.
        let private = PrivateKey::from_bytes_array(clamp(from_hex(
            "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a",
        )));
        let expected = PublicKey::from_bytes_array(from_hex(
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a",
        ));
        assert_eq!(derive_public_key(&private).expect("clamped"), expected);
    }

    #[test]
    fn unclamped_private_key_is_rejected() {
        let raw = from_hex("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a");
        let private = PrivateKey::from_bytes_array(raw);
        assert!(!private.is_valid());
        let err = derive_public_key(&private).expect_err("unclamped key");
        assert!(matches!(err, WireGuardError::InvalidKey(_)));
    }

    #[test]
    fn zero_keys_are_invalid() {
        assert!(!PrivateKey::default().is_valid());
        assert!(!PublicKey::default().is_valid());
        assert!(!PresharedKey::from_bytes_array([0u8; KEY_SIZE]).is_valid());
        assert!(PublicKey::from_bytes_array([1u8; KEY_SIZE]).is_valid());
    }

    #[test]
    fn generate_keypair_matches_derivation() {
        let (private, public) = generate_keypair();
        assert_eq!(private.public_key().expect("clamped"), public);
        assert_eq!(private.public_key().expect("clamped"), public);
    }

    #[test]
    fn different_private_keys_produce_different_public_keys() {
        let (_, a) = generate_keypair();
        let (_, b) = generate_keypair();
        assert_ne!(a, b);
    }

    #[test]
    fn base64_text_form_is_44_chars() {
        let (private, public) = generate_keypair();
        assert_eq!(private.to_base64().len(), 44);
        assert_eq!(public.to_string().len(), 44);
        assert_eq!(generate_preshared_key().to_base64().len(), 44);
    }

    #[test]
    fn private_key_base64_roundtrip() {
        let private = generate_private_key();
        let decoded: PrivateKey = private.to_base64().parse().expect("decode failed");
        assert_eq!(private, decoded);
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(PrivateKey::from_bytes(&[0u8; 16]).is_err());
        assert!(PublicKey::from_base64("AAAA").is_err());
        assert!(PresharedKey::from_base64("%%%").is_err());
    }

    #[test]
    fn secret_debug_redacts() {
        let debug = format!("{:?} {:?}", generate_private_key(), generate_preshared_key());
        assert_eq!(debug.matches("REDACTED").count(), 2);
        let kp = KeyPair::generate();
        assert!(format!("{kp:?}").contains("REDACTED"));
    }

    #[test]
    fn keypair_from_private_key() {
        let private = generate_private_key();
        let expected = private.public_key().expect("clamped");
        let keypair = KeyPair::from_private_key(private).expect("clamped");
        assert_eq!(keypair.public_key(), &expected);
        assert!(KeyPair::from_private_key(PrivateKey::default()).is_err());
    }

    #[test]
    fn public_key_serde_is_base64_string() {
        let (_, public) = generate_keypair();
        let json = serde_json::to_string(&public).expect("serialize failed");
        assert_eq!(json, format!("\"{}\"", public.to_base64()));
        let back: PublicKey = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(public, back);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clamp_always_yields_valid_key(bytes in prop::array::uniform32(any::<u8>())) {
                prop_assert!(PrivateKey::from_bytes_array(clamp(bytes)).is_valid());
            }

            #[test]
            fn derivation_is_deterministic(bytes in prop::array::uniform32(any::<u8>())) {
                let private = PrivateKey::from_bytes_array(clamp(bytes));
                let a = private.public_key();
                let b = private.public_key();
                prop_assert!(a.is_ok());
                prop_assert_eq!(a.ok(), b.ok());
            }

            #[test]
            fn validity_matches_clamp_fixed_point(bytes in prop::array::uniform32(any::<u8>())) {
                let private = PrivateKey::from_bytes_array(bytes);
                prop_assert_eq!(private.is_valid(), clamp(bytes) == bytes);
                prop_assert_eq!(private.public_key().is_ok(), private.is_valid());
            }
        }
    }
}
