// SPDX-License-Identifier: MPL-2.0

//! Sources of cryptographically secure random bytes.

use rand_core::{CryptoRng, OsRng, RngCore, TryRngCore};
use std::future::Future;

/// Errors propagated by entropy sources.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EntropyError {
    /// The operating system's random number generator failed.
    #[error("OS entropy source failed: {0}")]
    Os(#[from] rand_core::OsError),

    /// The source can't provide any more bytes.
    #[error("entropy source unavailable: {0}")]
    Unavailable(String),
}

/// A supplier of uniformly random bytes.
///
/// Implementations must either fill the whole buffer with secure randomness or fail. Falling back
/// to a non-cryptographic generator is not allowed.
pub trait EntropySource {
    /// Fill `dest` with random bytes. This may suspend while entropy is gathered.
    fn fill_bytes(
        &mut self,
        dest: &mut [u8],
    ) -> impl Future<Output = Result<(), EntropyError>> + Send;
}

/// Entropy from the operating system, via `getrandom`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsEntropySource;

impl EntropySource for OsEntropySource {
    async fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng.try_fill_bytes(dest)?;
        Ok(())
    }
}

/// Adapter turning a [`CryptoRng`] into an [`EntropySource`].
///
/// This is mostly useful with seeded generators, to make sampling reproducible. Only generators
/// marked as cryptographically secure are accepted:
///
/// ```compile_fail
/// use rand_core::RngCore;
/// use securerand::entropy::RngEntropySource;
///
/// struct Zeros;
///
/// impl RngCore for Zeros {
///     fn next_u32(&mut self) -> u32 {
///         0
///     }
///
///     fn next_u64(&mut self) -> u64 {
///         0
///     }
///
///     fn fill_bytes(&mut self, dest: &mut [u8]) {
///         dest.fill(0);
///     }
/// }
///
/// let _ = RngEntropySource::new(Zeros);
/// ```
#[derive(Clone, Debug)]
pub struct RngEntropySource<R>(R);

impl<R: CryptoRng> RngEntropySource<R> {
    /// Wrap a generator.
    pub fn new(rng: R) -> Self {
        Self(rng)
    }

    /// Unwrap the generator.
    pub fn into_inner(self) -> R {
        self.0
    }
}

impl<R: CryptoRng + Send> EntropySource for RngEntropySource<R> {
    async fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        RngCore::fill_bytes(&mut self.0, dest);
        Ok(())
    }
}

/// An entropy source replaying a fixed script of bytes, for testing.
///
/// Bytes are handed out in order. Once the script is exhausted, every request fails with
/// [`EntropyError::Unavailable`]. The source counts calls and bytes served so tests can check
/// how much entropy an operation consumed.
#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
#[derive(Clone, Debug, Default)]
pub struct ScriptedEntropySource {
    script: Vec<u8>,
    position: usize,
    calls: usize,
}

#[cfg(any(test, feature = "test-util"))]
impl ScriptedEntropySource {
    /// Construct a source that will serve `script`.
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: script.into(),
            position: 0,
            calls: 0,
        }
    }

    /// Number of `fill_bytes` calls made so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Number of bytes served so far.
    pub fn bytes_served(&self) -> usize {
        self.position
    }

    /// Number of bytes left in the script.
    pub fn remaining(&self) -> usize {
        self.script.len() - self.position
    }
}

#[cfg(any(test, feature = "test-util"))]
impl EntropySource for ScriptedEntropySource {
    async fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        self.calls += 1;
        if dest.len() > self.remaining() {
            return Err(EntropyError::Unavailable(format!(
                "script exhausted: requested {} bytes, {} left",
                dest.len(),
                self.remaining()
            )));
        }
        let end = self.position + dest.len();
        dest.copy_from_slice(&self.script[self.position..end]);
        self.position = end;
        Ok(())
    }
}
