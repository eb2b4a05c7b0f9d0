//! Cryptographically secure random source.

use crate::error::{Error, ErrorKind, Result};

use rand::rngs::OsRng;
use rand::RngCore;

/// Source of secure random bytes shared by concurrent handshakes.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` entirely or fail with [`ErrorKind::Entropy`].
    fn fill(&self, dest: &mut [u8]) -> Result<()>;

    fn random_bytes(&self, count: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; count];
        self.fill(&mut bytes)?;
        Ok(bytes)
    }
}

/// The operating system's random number generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|err| Error::new(ErrorKind::Entropy).context(|| err.to_string()))
    }
}

impl<T: EntropySource + ?Sized> EntropySource for &T {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        (**self).fill(dest)
    }
}
