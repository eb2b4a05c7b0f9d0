//! Finite field Diffie-Hellman over the MODP groups of
//! [RFC3526](https://tools.ietf.org/html/rfc3526).

use ikev2::entropy::EntropySource;
use ikev2::error::{Error, ErrorKind, Result};
use ikev2_wire::DhGroup;

use num_bigint::BigUint;
use zeroize::Zeroizing;

/// Give up on an entropy source that keeps producing unusable exponents
const MAX_PRIVATE_KEY_ATTEMPTS: usize = 8;

/// 3072-bit MODP group prime (RFC 3526 section 4)
const MODP_3072_PRIME: [u8; 384] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xc9, 0x0f, 0xda, 0xa2,
    0x21, 0x68, 0xc2, 0x34, 0xc4, 0xc6, 0x62, 0x8b, 0x80, 0xdc, 0x1c, 0xd1,
    0x29, 0x02, 0x4e, 0x08, 0x8a, 0x67, 0xcc, 0x74, 0x02, 0x0b, 0xbe, 0xa6,
    0x3b, 0x13, 0x9b, 0x22, 0x51, 0x4a, 0x08, 0x79, 0x8e, 0x34, 0x04, 0xdd,
    0xef, 0x95, 0x19, 0xb3, 0xcd, 0x3a, 0x43, 0x1b, 0x30, 0x2b, 0x0a, 0x6d,
    0xf2, 0x5f, 0x14, 0x37, 0x4f, 0xe1, 0x35, 0x6d, 0x6d, 0x51, 0xc2, 0x45,
    0xe4, 0x85, 0xb5, 0x76, 0x62, 0x5e, 0x7e, 0xc6, 0xf4, 0x4c, 0x42, 0xe9,
    0xa6, 0x37, 0xed, 0x6b, 0x0b, 0xff, 0x5c, 0xb6, 0xf4, 0x06, 0xb7, 0xed,
    0xee, 0x38, 0x6b, 0xfb, 0x5a, 0x89, 0x9f, 0xa5, 0xae, 0x9f, 0x24, 0x11,
    0x7c, 0x4b, 0x1f, 0xe6, 0x49, 0x28, 0x66, 0x51, 0xec, 0xe4, 0x5b, 0x3d,
    0xc2, 0x00, 0x7c, 0xb8, 0xa1, 0x63, 0xbf, 0x05, 0x98, 0xda, 0x48, 0x36,
    0x1c, 0x55, 0xd3, 0x9a, 0x69, 0x16, 0x3f, 0xa8, 0xfd, 0x24, 0xcf, 0x5f,
    0x83, 0x65, 0x5d, 0x23, 0xdc, 0xa3, 0xad, 0x96, 0x1c, 0x62, 0xf3, 0x56,
    0x20, 0x85, 0x52, 0xbb, 0x9e, 0xd5, 0x29, 0x07, 0x70, 0x96, 0x96, 0x6d,
    0x67, 0x0c, 0x35, 0x4e, 0x4a, 0xbc, 0x98, 0x04, 0xf1, 0x74, 0x6c, 0x08,
    0xca, 0x18, 0x21, 0x7c, 0x32, 0x90, 0x5e, 0x46, 0x2e, 0x36, 0xce, 0x3b,
    0xe3, 0x9e, 0x77, 0x2c, 0x18, 0x0e, 0x86, 0x03, 0x9b, 0x27, 0x83, 0xa2,
    0xec, 0x07, 0xa2, 0x8f, 0xb5, 0xc5, 0x5d, 0xf0, 0x6f, 0x4c, 0x52, 0xc9,
    0xde, 0x2b, 0xcb, 0xf6, 0x95, 0x58, 0x17, 0x18, 0x39, 0x95, 0x49, 0x7c,
    0xea, 0x95, 0x6a, 0xe5, 0x15, 0xd2, 0x26, 0x18, 0x98, 0xfa, 0x05, 0x10,
    0x15, 0x72, 0x8e, 0x5a, 0x8a, 0xaa, 0xc4, 0x2d, 0xad, 0x33, 0x17, 0x0d,
    0x04, 0x50, 0x7a, 0x33, 0xa8, 0x55, 0x21, 0xab, 0xdf, 0x1c, 0xba, 0x64,
    0xec, 0xfb, 0x85, 0x04, 0x58, 0xdb, 0xef, 0x0a, 0x8a, 0xea, 0x71, 0x57,
    0x5d, 0x06, 0x0c, 0x7d, 0xb3, 0x97, 0x0f, 0x85, 0xa6, 0xe1, 0xe4, 0xc7,
    0xab, 0xf5, 0xae, 0x8c, 0xdb, 0x09, 0x33, 0xd7, 0x1e, 0x8c, 0x94, 0xe0,
    0x4a, 0x25, 0x61, 0x9d, 0xce, 0xe3, 0xd2, 0x26, 0x1a, 0xd2, 0xee, 0x6b,
    0xf1, 0x2f, 0xfa, 0x06, 0xd9, 0x8a, 0x08, 0x64, 0xd8, 0x76, 0x02, 0x73,
    0x3e, 0xc8, 0x6a, 0x64, 0x52, 0x1f, 0x2b, 0x18, 0x17, 0x7b, 0x20, 0x0c,
    0xbb, 0xe1, 0x17, 0x57, 0x7a, 0x61, 0x5d, 0x6c, 0x77, 0x09, 0x88, 0xc0,
    0xba, 0xd9, 0x46, 0xe2, 0x08, 0xe2, 0x4f, 0xa0, 0x74, 0xe5, 0xab, 0x31,
    0x43, 0xdb, 0x5b, 0xfc, 0xe0, 0xfd, 0x10, 0x8e, 0x4b, 0x82, 0xd1, 0x20,
    0xa9, 0x3a, 0xd2, 0xca, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Constants defining a MODP group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParameters {
    pub prime: BigUint,
    pub generator: BigUint,
    /// Size in bytes of public values and shared secrets on the wire
    pub byte_width: usize,
}

pub fn group_parameters(group: DhGroup) -> GroupParameters {
    match group {
        DhGroup::Modp3072 => GroupParameters {
            prime: BigUint::from_bytes_be(&MODP_3072_PRIME),
            generator: BigUint::from(2u32),
            byte_width: MODP_3072_PRIME.len(),
        },
    }
}

/// Left-pad a big-endian value with zeros to `width` bytes.
fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    let mut padded = vec![0u8; width.saturating_sub(bytes.len())];
    padded.extend_from_slice(&bytes);
    padded
}

/// The DH shared secret g^ir, padded to the group width.
pub struct SharedSecret(Zeroizing<Vec<u8>>);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

/// An ephemeral key pair for one IKE_SA_INIT exchange.
///
/// The private exponent is wiped when the pair is dropped.
pub struct KeyPair {
    group: DhGroup,
    private_key: Zeroizing<Vec<u8>>,
    public_value: BigUint,
}

impl KeyPair {
    /// Draw a private exponent of the group's width from `entropy`.
    pub fn generate<E: EntropySource + ?Sized>(group: DhGroup, entropy: &E) -> Result<Self> {
        let width = group_parameters(group).byte_width;
        for _ in 0..MAX_PRIVATE_KEY_ATTEMPTS {
            let candidate = Zeroizing::new(entropy.random_bytes(width)?);
            match Self::from_private_key(group, &candidate) {
                Ok(pair) => return Ok(pair),
                Err(err) if *err.kind() == ErrorKind::InvalidPublicValue => continue,
                Err(err) => return Err(err),
            }
        }
        Err(Error::new(ErrorKind::Entropy)
            .context(|| "no usable Diffie-Hellman exponent".to_string()))
    }

    /// Build a pair from a big-endian private exponent `x`, which must
    /// satisfy 1 < x < p-1.
    pub fn from_private_key(group: DhGroup, private_key: &[u8]) -> Result<Self> {
        let params = group_parameters(group);
        let x = BigUint::from_bytes_be(private_key);
        check_range(&x, &params.prime)?;
        let public_value = params.generator.modpow(&x, &params.prime);
        Ok(Self {
            group,
            private_key: Zeroizing::new(private_key.to_vec()),
            public_value,
        })
    }

    pub fn group(&self) -> DhGroup {
        self.group
    }

    /// g^x mod p
    pub fn public_value(&self) -> &BigUint {
        &self.public_value
    }

    /// Compute g^ir from the responder's public value.
    pub fn shared_secret(&self, peer_group: DhGroup, peer_public: &BigUint) -> Result<SharedSecret> {
        if peer_group != self.group {
            return Err(Error::new(ErrorKind::InvalidDiffieHellmanGroup).context(|| {
                format!("offered {:?}, peer answered {:?}", self.group, peer_group)
            }));
        }
        let params = group_parameters(self.group);
        check_range(peer_public, &params.prime)?;

        let x = BigUint::from_bytes_be(&self.private_key);
        let secret = peer_public.modpow(&x, &params.prime);
        Ok(SharedSecret(Zeroizing::new(to_fixed_width(
            &secret,
            params.byte_width,
        ))))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("group", &self.group)
            .field("public_value", &self.public_value)
            .finish_non_exhaustive()
    }
}

/// Reject 0, 1, p-1 and anything not reduced mod p.
fn check_range(value: &BigUint, prime: &BigUint) -> Result<()> {
    let one = BigUint::from(1u32);
    if *value <= one || *value >= prime - &one {
        return Err(Error::new(ErrorKind::InvalidPublicValue)
            .context(|| format!("value has {} bits", value.bits())));
    }
    Ok(())
}
