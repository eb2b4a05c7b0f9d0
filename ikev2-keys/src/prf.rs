//! Pseudo-random functions and prf+ (RFC 7296 section 2.13).

use ikev2::error::{Error, ErrorKind, Result};
use ikev2_wire::PrfAlgorithm;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

pub trait Prf {
    /// Output size in bytes, also the preferred key size.
    fn output_len(&self) -> usize;

    fn compute(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>>;

    /// Expand `key` and `seed` into exactly `len` bytes.
    ///
    /// ```text
    /// prf+ (K,S) = T1 | T2 | T3 | T4 | ...
    ///
    /// T1 = prf (K, S | 0x01)
    /// T2 = prf (K, T1 | S | 0x02)
    /// T3 = prf (K, T2 | S | 0x03)
    /// ```
    ///
    /// The block counter is one octet, so at most 255 blocks can be produced.
    fn prf_plus(&self, key: &[u8], seed: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>> {
        let block_len = self.output_len();
        let blocks = len
            .checked_add(block_len.saturating_sub(1))
            .and_then(|rounded| rounded.checked_div(block_len))
            .ok_or_else(|| Error::new(ErrorKind::KeystreamTooLong))?;
        if blocks > usize::from(u8::MAX) {
            return Err(Error::new(ErrorKind::KeystreamTooLong)
                .context(|| format!("{} bytes needs {} blocks", len, blocks)));
        }

        let mut output = Zeroizing::new(Vec::with_capacity(blocks * block_len));
        let mut previous = Zeroizing::new(Vec::new());
        for counter in 1..=blocks as u8 {
            let mut input = Zeroizing::new(Vec::with_capacity(previous.len() + seed.len() + 1));
            input.extend_from_slice(&previous);
            input.extend_from_slice(seed);
            input.push(counter);

            previous = Zeroizing::new(self.compute(key, &input)?);
            output.extend_from_slice(&previous);
        }
        output.truncate(len);
        Ok(output)
    }
}

impl Prf for PrfAlgorithm {
    fn output_len(&self) -> usize {
        self.key_size()
    }

    fn compute(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            PrfAlgorithm::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)
                    .map_err(|err| Error::new(ErrorKind::InvalidKeyLength).context(|| err.to_string()))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}
