//! SKEYSEED and the seven IKE SA keys (RFC 7296 section 2.14).

use crate::prf::Prf;

use ikev2::error::{Error, ErrorKind, Result};
use ikev2_wire::{IkePacket, PrfAlgorithm};

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Sizes in bytes of the keys carved out of the keystream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySizes {
    /// SK_d, SK_pi and SK_pr
    pub prf: usize,
    /// SK_ai and SK_ar
    pub integrity: usize,
    /// SK_ei and SK_er
    pub encryption: usize,
}

impl KeySizes {
    /// Sizes for the transforms the responder chose.
    pub fn negotiated(response: &IkePacket) -> Result<Self> {
        Ok(Self {
            prf: response.prf_key_size()?,
            integrity: response.integrity_key_size()?,
            encryption: response.encryption_key_size()?,
        })
    }

    /// 3 PRF keys, 2 integrity keys and 2 encryption keys.
    pub fn keystream_len(&self) -> Result<usize> {
        self.prf
            .checked_mul(3)
            .zip(self.integrity.checked_mul(2))
            .zip(self.encryption.checked_mul(2))
            .and_then(|((prf, integrity), encryption)| {
                prf.checked_add(integrity)?.checked_add(encryption)
            })
            .ok_or_else(|| Error::new(ErrorKind::KeystreamTooLong))
    }
}

/// SKEYSEED = prf(Ni | Nr, g^ir)
pub fn skeyseed<P: Prf + ?Sized>(
    prf: &P,
    nonce_i: &[u8],
    nonce_r: &[u8],
    shared_secret: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let mut key = Zeroizing::new(Vec::with_capacity(nonce_i.len() + nonce_r.len()));
    key.extend_from_slice(nonce_i);
    key.extend_from_slice(nonce_r);
    Ok(Zeroizing::new(prf.compute(&key, shared_secret)?))
}

/// Keys of an IKE SA, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    /// Derives CHILD_SA keys
    pub sk_d: Vec<u8>,
    pub sk_ai: Vec<u8>,
    pub sk_ar: Vec<u8>,
    pub sk_ei: Vec<u8>,
    pub sk_er: Vec<u8>,
    /// Used when building the initiator's AUTH payload
    pub sk_pi: Vec<u8>,
    /// Used when checking the responder's AUTH payload
    pub sk_pr: Vec<u8>,
}

impl KeyMaterial {
    /// ```text
    /// {SK_d | SK_ai | SK_ar | SK_ei | SK_er | SK_pi | SK_pr}
    ///                 = prf+ (SKEYSEED, Ni | Nr | SPIi | SPIr)
    /// ```
    pub fn derive(
        prf: PrfAlgorithm,
        sizes: KeySizes,
        shared_secret: &[u8],
        nonce_i: &[u8],
        nonce_r: &[u8],
        spi_i: u64,
        spi_r: u64,
    ) -> Result<Self> {
        let skeyseed = skeyseed(&prf, nonce_i, nonce_r, shared_secret)?;

        let mut seed = Vec::with_capacity(nonce_i.len() + nonce_r.len() + 16);
        seed.extend_from_slice(nonce_i);
        seed.extend_from_slice(nonce_r);
        seed.extend_from_slice(&spi_i.to_be_bytes());
        seed.extend_from_slice(&spi_r.to_be_bytes());

        let keystream_len = sizes.keystream_len()?;
        let keystream = prf.prf_plus(&skeyseed, &seed, keystream_len)?;
        tracing::debug!(
            keystream_len,
            prf = ?prf,
            "derived IKE SA keys"
        );

        let mut rest: &[u8] = &keystream;
        let mut next = |len: usize| {
            let (key, tail) = rest.split_at(len);
            rest = tail;
            key.to_vec()
        };
        Ok(Self {
            sk_d: next(sizes.prf),
            sk_ai: next(sizes.integrity),
            sk_ar: next(sizes.integrity),
            sk_ei: next(sizes.encryption),
            sk_er: next(sizes.encryption),
            sk_pi: next(sizes.prf),
            sk_pr: next(sizes.prf),
        })
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("sk_d", &self.sk_d.len())
            .field("sk_ai", &self.sk_ai.len())
            .field("sk_ar", &self.sk_ar.len())
            .field("sk_ei", &self.sk_ei.len())
            .field("sk_er", &self.sk_er.len())
            .field("sk_pi", &self.sk_pi.len())
            .field("sk_pr", &self.sk_pr.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ikev2_wire::{
        Attribute, EncryptionAlgorithm, ExchangeType, Header, IkeFlags, Payload, Proposal,
        Transform,
    };

    const SPI_I: u64 = 0x0102030405060708;
    const SPI_R: u64 = 0x1112131415161718;

    fn gcm_256() -> KeySizes {
        KeySizes {
            prf: 32,
            integrity: 16,
            encryption: 32,
        }
    }

    #[test]
    fn keystream_length() {
        assert_eq!(gcm_256().keystream_len(), Ok(192));
        let gcm_128 = KeySizes {
            encryption: 16,
            ..gcm_256()
        };
        assert_eq!(gcm_128.keystream_len(), Ok(160));
        let huge = KeySizes {
            prf: usize::MAX,
            ..gcm_256()
        };
        assert_eq!(
            huge.keystream_len(),
            Err(Error::new(ErrorKind::KeystreamTooLong))
        );
    }

    #[test]
    fn sizes_from_response() {
        let response = IkePacket {
            header: Header {
                initiator_spi: SPI_I,
                responder_spi: SPI_R,
                message_id: 0,
            },
            exchange_type: ExchangeType::IkeSaInit,
            flags: IkeFlags::RESPONSE,
            payloads: vec![Payload::SecurityAssociation(vec![Proposal::Ike {
                spi: vec![],
                transforms: vec![
                    Transform::Encryption(EncryptionAlgorithm::AesGcm16(vec![
                        Attribute::KeyLength(256),
                    ])),
                    Transform::Prf(PrfAlgorithm::HmacSha256),
                ],
            }])],
        };
        assert_eq!(KeySizes::negotiated(&response), Ok(gcm_256()));

        let without_sa = IkePacket {
            payloads: vec![],
            ..response
        };
        assert_eq!(
            KeySizes::negotiated(&without_sa),
            Err(Error::new(ErrorKind::NotNegotiated("PRF")))
        );
    }

    #[test]
    fn known_answer() {
        let prf = PrfAlgorithm::HmacSha256;
        let nonce_i = [0x11; 32];
        let nonce_r = [0x22; 32];
        let shared_secret = [0x33; 384];

        assert_eq!(
            hex::encode(skeyseed(&prf, &nonce_i, &nonce_r, &shared_secret).unwrap().as_slice()),
            "5361f9218a83690f9e6396201c9fc5ac56950032b529922aea31b64c1f87a812"
        );

        let keys = KeyMaterial::derive(
            prf,
            gcm_256(),
            &shared_secret,
            &nonce_i,
            &nonce_r,
            SPI_I,
            SPI_R,
        )
        .unwrap();
        assert_eq!(
            hex::encode(&keys.sk_d),
            "05f022630a5ea3b2cbd6c2bc2fedd544c3c5dbaecb26b9f45e25407ab9f151c4"
        );
        assert_eq!(hex::encode(&keys.sk_ai), "5ebade4ca7d19912e42ea8ab9e997245");
        assert_eq!(hex::encode(&keys.sk_ar), "64145de7cfecee9ed09ebb75c2118895");
        assert_eq!(
            hex::encode(&keys.sk_ei),
            "6a8e68b1e522873f91bca5126f32377ed73f0360c301e2611d9a5a731dc710fd"
        );
        assert_eq!(
            hex::encode(&keys.sk_er),
            "2a98fd00d0940805c070fe5ff9ad18ecbba4a9745e1ecd0dff9a9ed3ef19ada5"
        );
        assert_eq!(
            hex::encode(&keys.sk_pi),
            "e2c8a818099a8f253f6f58b9b41afde138c7cd0da2fb3f9c99a8552127b486e4"
        );
        assert_eq!(
            hex::encode(&keys.sk_pr),
            "b679d17cf9b66d758ba26b6820bb2e3ef88c404244d75e1738eddf3469527d62"
        );
    }

    #[test]
    fn keys_partition_the_keystream() {
        let prf = PrfAlgorithm::HmacSha256;
        let keys = KeyMaterial::derive(prf, gcm_256(), &[0x01; 384], b"Ni", b"Nr", SPI_I, SPI_R)
            .unwrap();

        let skeyseed = skeyseed(&prf, b"Ni", b"Nr", &[0x01; 384]).unwrap();
        let mut seed = b"NiNr".to_vec();
        seed.extend_from_slice(&SPI_I.to_be_bytes());
        seed.extend_from_slice(&SPI_R.to_be_bytes());
        let keystream = prf.prf_plus(&skeyseed, &seed, 192).unwrap();

        let concatenated = [
            &keys.sk_d[..],
            &keys.sk_ai[..],
            &keys.sk_ar[..],
            &keys.sk_ei[..],
            &keys.sk_er[..],
            &keys.sk_pi[..],
            &keys.sk_pr[..],
        ]
        .concat();
        assert_eq!(concatenated, keystream.as_slice());
        assert_eq!(
            [
                keys.sk_d.len(),
                keys.sk_ai.len(),
                keys.sk_ar.len(),
                keys.sk_ei.len(),
                keys.sk_er.len(),
                keys.sk_pi.len(),
                keys.sk_pr.len()
            ],
            [32, 16, 16, 32, 32, 32, 32]
        );
    }

    #[test]
    fn debug_shows_lengths_only() {
        let keys = KeyMaterial::derive(
            PrfAlgorithm::HmacSha256,
            gcm_256(),
            &[0x01; 384],
            b"Ni",
            b"Nr",
            SPI_I,
            SPI_R,
        )
        .unwrap();
        assert_eq!(
            format!("{:?}", keys),
            "KeyMaterial { sk_d: 32, sk_ai: 16, sk_ar: 16, sk_ei: 32, sk_er: 32, sk_pi: 32, sk_pr: 32 }"
        );
    }
}
