//! Initiator configuration.

use ikev2::error::{Error, ErrorKind, Result};
use ikev2_wire::{Attribute, DhGroup, EncryptionAlgorithm, PrfAlgorithm, Proposal, Transform};

use std::ops::RangeInclusive;
use std::time::Duration;

/// Nonce sizes allowed by RFC 7296 section 3.9
pub const NONCE_LEN_RANGE: RangeInclusive<usize> = 16..=256;

/// AES key sizes
pub const ENCRYPTION_KEY_BITS: [u16; 3] = [128, 192, 256];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Group offered in the SA payload and used for the KE payload
    pub dh_group: DhGroup,

    /// Key Length attribute of the AES-GCM-16 offer
    pub encryption_key_bits: u16,

    pub prf: PrfAlgorithm,

    /// Length of the initiator nonce in bytes
    pub nonce_len: usize,

    /// Cookie round trips to tolerate before giving up
    pub max_cookie_retries: u8,

    /// How long to wait for each response
    pub receive_timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            dh_group: DhGroup::Modp3072,
            encryption_key_bits: 256,
            prf: PrfAlgorithm::HmacSha256,
            nonce_len: 32,
            max_cookie_retries: 3,
            receive_timeout: Duration::from_secs(10),
        }
    }
}

impl HandshakeConfig {
    pub fn builder() -> HandshakeConfigBuilder {
        HandshakeConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if !NONCE_LEN_RANGE.contains(&self.nonce_len) {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "nonce length must be between 16 and 256 bytes",
            )));
        }
        if !ENCRYPTION_KEY_BITS.contains(&self.encryption_key_bits) {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "encryption key length must be 128, 192 or 256 bits",
            )));
        }
        if self.receive_timeout.is_zero() {
            return Err(Error::new(ErrorKind::InvalidConfig(
                "receive timeout must be non-zero",
            )));
        }
        Ok(())
    }

    /// The single IKE proposal this initiator offers.
    pub fn proposal(&self) -> Proposal {
        Proposal::Ike {
            spi: vec![],
            transforms: vec![
                Transform::Encryption(EncryptionAlgorithm::AesGcm16(vec![Attribute::KeyLength(
                    self.encryption_key_bits,
                )])),
                Transform::Prf(self.prf),
                Transform::DiffieHellman(self.dh_group),
            ],
        }
    }
}

/// Builder for [`HandshakeConfig`], starting from the defaults.
#[derive(Clone, Debug, Default)]
pub struct HandshakeConfigBuilder {
    config: HandshakeConfig,
}

impl HandshakeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dh_group(mut self, group: DhGroup) -> Self {
        self.config.dh_group = group;
        self
    }

    pub fn with_encryption_key_bits(mut self, bits: u16) -> Self {
        self.config.encryption_key_bits = bits;
        self
    }

    pub fn with_prf(mut self, prf: PrfAlgorithm) -> Self {
        self.config.prf = prf;
        self
    }

    pub fn with_nonce_len(mut self, len: usize) -> Self {
        self.config.nonce_len = len;
        self
    }

    pub fn with_max_cookie_retries(mut self, retries: u8) -> Self {
        self.config.max_cookie_retries = retries;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.config.receive_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HandshakeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = HandshakeConfig::builder().build().unwrap();
        assert_eq!(config, HandshakeConfig::default());
        assert_eq!(config.encryption_key_bits, 256);
        assert_eq!(config.nonce_len, 32);
        assert_eq!(config.max_cookie_retries, 3);
    }

    #[test]
    fn builder_overrides() {
        let config = HandshakeConfig::builder()
            .with_encryption_key_bits(128)
            .with_nonce_len(64)
            .with_max_cookie_retries(0)
            .with_receive_timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(config.encryption_key_bits, 128);
        assert_eq!(config.nonce_len, 64);
        assert_eq!(config.max_cookie_retries, 0);
        assert_eq!(config.receive_timeout, Duration::from_millis(250));
    }

    #[rstest(builder,
        case::short_nonce(HandshakeConfig::builder().with_nonce_len(15)),
        case::long_nonce(HandshakeConfig::builder().with_nonce_len(257)),
        case::odd_key_length(HandshakeConfig::builder().with_encryption_key_bits(160)),
        case::zero_timeout(HandshakeConfig::builder().with_receive_timeout(Duration::ZERO)),
    )]
    fn invalid(builder: HandshakeConfigBuilder) {
        assert!(matches!(
            builder.build().map_err(|err| err.into_kind()),
            Err(ErrorKind::InvalidConfig(_))
        ));
    }

    #[test]
    fn proposal_carries_key_length() {
        let config = HandshakeConfig::builder()
            .with_encryption_key_bits(192)
            .build()
            .unwrap();
        let proposal = config.proposal();
        assert_eq!(
            proposal.transforms()[0],
            Transform::Encryption(EncryptionAlgorithm::AesGcm16(vec![Attribute::KeyLength(192)]))
        );
        assert_eq!(proposal.transforms().len(), 3);
    }
}
