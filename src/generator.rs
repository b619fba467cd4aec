// SPDX-License-Identifier: MPL-2.0

//! Uniform sampling of integers by masking and rejection.
//!
//! To draw from `[min, max]`, the sampler computes `range = max - min`, reads just enough random
//! bytes to cover `range`, packs them little-endian into a candidate and clears the bits above
//! the bit width of `range`. A candidate no greater than `range` is accepted and offset by `min`.
//! Anything else is thrown away and a fresh candidate is drawn. Candidates are never reduced
//! modulo `range + 1`, as that would skew the distribution towards small values.

use crate::{
    bound::{validate, Number, ValidatedRange},
    entropy::{EntropyError, EntropySource},
    params::SamplingParameters,
};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// Errors propagated by [`SecureRandom`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SecureRandomError {
    /// The lower bound is missing.
    #[error("min is not defined")]
    MinNotDefined,

    /// The upper bound is missing.
    #[error("max is not defined")]
    MaxNotDefined,

    /// The lower bound is not a whole number.
    #[error("min must be an integer, got {0}")]
    MinNotInteger(Number),

    /// The upper bound is not a whole number.
    #[error("max must be an integer, got {0}")]
    MaxNotInteger(Number),

    /// The upper bound is not strictly greater than the lower bound.
    #[error("max ({max}) must be greater than min ({min})")]
    MaxNotGreaterThanMin {
        /// The lower bound.
        min: Number,
        /// The upper bound.
        max: Number,
    },

    /// The lower bound is not a safe integer.
    #[error("min must be a safe integer, got {0}")]
    MinOutOfSafeRange(Number),

    /// The upper bound is not a safe integer.
    #[error("max must be a safe integer, got {0}")]
    MaxOutOfSafeRange(Number),

    /// The distance between the bounds is not a safe integer.
    #[error("range between min ({min}) and max ({max}) must be a safe integer")]
    RangeOutOfSafeRange {
        /// The lower bound.
        min: i64,
        /// The upper bound.
        max: i64,
    },

    /// The entropy source failed. This is never retried.
    #[error("failed to draw random bytes: {0}")]
    EntropySourceUnavailable(#[from] EntropyError),

    /// Every candidate was rejected within the configured attempt limit.
    #[error("no candidate accepted after {0} attempts")]
    AttemptsExhausted(u32),
}

/// Configuration for [`SecureRandom`].
///
/// Embedding applications can load this from their own configuration files; the `random_int`
/// tool reads it as JSON with `--config`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Upper limit on the number of candidates drawn per sample. With `None`, sampling retries
    /// until a candidate is accepted.
    ///
    /// Each candidate is accepted with probability greater than one half, so a limit of `k`
    /// fails spuriously with probability less than `2^-k`.
    pub max_attempts: Option<NonZeroU32>,
}

/// Generator of uniformly distributed integers in an inclusive range.
#[derive(Clone, Debug)]
pub struct SecureRandom<S> {
    source: S,
    config: GeneratorConfig,
}

impl<S: EntropySource> SecureRandom<S> {
    /// Construct a generator drawing bytes from `source`, retrying without limit.
    pub fn new(source: S) -> Self {
        Self::with_config(source, GeneratorConfig::default())
    }

    /// Construct a generator with the given configuration.
    pub fn with_config(source: S, config: GeneratorConfig) -> Self {
        Self { source, config }
    }

    /// The generator's configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The underlying entropy source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Consume the generator, returning the entropy source.
    pub fn into_source(self) -> S {
        self.source
    }

    /// Draw an integer `r` with `min <= r <= max`, uniformly at random.
    pub async fn generate(
        &mut self,
        min: impl Into<Number>,
        max: impl Into<Number>,
    ) -> Result<i64, SecureRandomError> {
        self.generate_from(Some(min.into()), Some(max.into())).await
    }

    /// Like [`Self::generate`], for bounds that may be missing.
    ///
    /// Bounds are validated before any entropy is consumed. A bound of zero is a valid bound,
    /// only `None` counts as missing.
    pub async fn generate_from(
        &mut self,
        min: Option<Number>,
        max: Option<Number>,
    ) -> Result<i64, SecureRandomError> {
        let range = validate(min, max)?;
        self.sample(&range).await
    }

    /// Draw an integer uniformly from a range that has already been validated.
    pub async fn sample(&mut self, range: &ValidatedRange) -> Result<i64, SecureRandomError> {
        let params = SamplingParameters::for_range(range.span());
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..params.bytes_requested()];

        let mut attempts = 0u32;
        loop {
            attempts = attempts.saturating_add(1);
            if let Err(e) = self.source.fill_bytes(bytes).await {
                warn!("entropy source failed after {attempts} attempts: {e}");
                return Err(e.into());
            }

            let candidate = params.apply_mask(LittleEndian::read_uint(bytes, bytes.len()));
            if let Some(value) = range.offset(candidate) {
                if attempts > 1 {
                    debug!(
                        "accepted candidate for range [{}, {}] after {attempts} attempts",
                        range.min(),
                        range.max()
                    );
                }
                return Ok(value);
            }
            trace!("rejected candidate {candidate} > {}", range.span());

            if let Some(max_attempts) = self.config.max_attempts {
                if attempts >= max_attempts.get() {
                    debug!("giving up after {attempts} rejected candidates");
                    return Err(SecureRandomError::AttemptsExhausted(attempts));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bound::MAX_SAFE_INTEGER, entropy::ScriptedEntropySource};
    use assert_matches::assert_matches;
    use futures::executor::block_on;

    fn scripted(script: impl Into<Vec<u8>>) -> SecureRandom<ScriptedEntropySource> {
        SecureRandom::new(ScriptedEntropySource::new(script))
    }

    #[test]
    fn accepts_first_candidate() {
        let mut rng = scripted([7]);
        assert_eq!(block_on(rng.generate(0, 10)).unwrap(), 7);
        assert_eq!(rng.source().calls(), 1);
    }

    #[test]
    fn upper_bound_is_inclusive() {
        // range = 10, mask = 0b1111. A candidate equal to the range is accepted.
        let mut rng = scripted([10]);
        assert_eq!(block_on(rng.generate(0, 10)).unwrap(), 10);

        let mut rng = scripted([0, 1]);
        assert_eq!(block_on(rng.generate(5, 6)).unwrap(), 5);
        assert_eq!(block_on(rng.generate(5, 6)).unwrap(), 6);
    }

    #[test]
    fn masks_high_bits() {
        // 0xf3 & 0b1111 = 3.
        let mut rng = scripted([0xf3]);
        assert_eq!(block_on(rng.generate(100, 110)).unwrap(), 103);
    }

    #[test]
    fn retries_rejected_candidate() {
        // 0x0c & 0b1111 = 12 > 10 is rejected, then 0x04 is accepted.
        let mut rng = scripted([0x0c, 0x04]);
        assert_eq!(block_on(rng.generate(-5, 5)).unwrap(), -1);
        assert_eq!(rng.source().calls(), 2);
        assert_eq!(rng.source().bytes_served(), 2);
    }

    #[test]
    fn never_reduces_modulo_range() {
        // Every candidate in the script is above the range after masking. Reducing any of them
        // would produce a value, so the only correct outcome is running out of entropy.
        let mut rng = scripted([0x0b, 0x1c, 0xfd, 0x0e, 0x0f]);
        let err = block_on(rng.generate(0, 10)).unwrap_err();
        assert_matches!(
            err,
            SecureRandomError::EntropySourceUnavailable(EntropyError::Unavailable(_))
        );
        assert_eq!(rng.source().calls(), 6);
        assert_eq!(rng.source().bytes_served(), 5);
    }

    #[test]
    fn little_endian_packing() {
        // range = 1000 needs 10 bits over 2 bytes. 0x03e8 = 1000.
        let mut rng = scripted([0xe8, 0x03]);
        assert_eq!(block_on(rng.generate(0, 1000)).unwrap(), 1000);

        // 0xfc01 & 0x3ff = 1.
        let mut rng = scripted([0x01, 0xfc]);
        assert_eq!(block_on(rng.generate(0, 1000)).unwrap(), 1);
    }

    #[test]
    fn power_of_two_range() {
        // range = 256 needs 9 bits. 0x0100 is exactly the range.
        let mut rng = scripted([0x00, 0x01]);
        assert_eq!(block_on(rng.generate(0, 256)).unwrap(), 256);

        // range = 255 fits in one byte and nothing is ever rejected.
        let mut rng = scripted([0xff, 0x00]);
        assert_eq!(block_on(rng.generate(0, 255)).unwrap(), 255);
        assert_eq!(block_on(rng.generate(0, 255)).unwrap(), 0);
        assert_eq!(rng.source().calls(), 2);
    }

    #[test]
    fn widest_range() {
        let mut script = vec![0xff; 7];
        script.extend([0x2a, 0, 0, 0, 0, 0, 0]);
        let mut rng = scripted(script);
        assert_eq!(block_on(rng.generate(0, MAX_SAFE_INTEGER)).unwrap(), MAX_SAFE_INTEGER);
        assert_eq!(
            block_on(rng.generate(-MAX_SAFE_INTEGER, 0)).unwrap(),
            -MAX_SAFE_INTEGER + 42
        );
        assert_eq!(rng.source().remaining(), 0);
    }

    #[test]
    fn validation_consumes_no_entropy() {
        let mut rng = scripted([0; 16]);
        assert_matches!(
            block_on(rng.generate_from(None, Some(1.into()))),
            Err(SecureRandomError::MinNotDefined)
        );
        assert_matches!(
            block_on(rng.generate_from(Some(1.into()), None)),
            Err(SecureRandomError::MaxNotDefined)
        );
        assert_matches!(block_on(rng.generate(0.5, 1)), Err(SecureRandomError::MinNotInteger(_)));
        assert_matches!(block_on(rng.generate(0, 1.5)), Err(SecureRandomError::MaxNotInteger(_)));
        assert_matches!(
            block_on(rng.generate(3, 3)),
            Err(SecureRandomError::MaxNotGreaterThanMin { .. })
        );
        assert_matches!(
            block_on(rng.generate(-MAX_SAFE_INTEGER - 1, 0)),
            Err(SecureRandomError::MinOutOfSafeRange(_))
        );
        assert_matches!(
            block_on(rng.generate(0, MAX_SAFE_INTEGER + 1)),
            Err(SecureRandomError::MaxOutOfSafeRange(_))
        );
        assert_matches!(
            block_on(rng.generate(-1, MAX_SAFE_INTEGER)),
            Err(SecureRandomError::RangeOutOfSafeRange { .. })
        );
        assert_eq!(rng.source().calls(), 0);
    }

    #[test]
    fn entropy_failure_is_not_retried() {
        let mut rng = scripted(Vec::new());
        let err = block_on(rng.generate(0, 10)).unwrap_err();
        assert_matches!(err, SecureRandomError::EntropySourceUnavailable(_));
        assert_eq!(rng.source().calls(), 1);
    }

    #[test]
    fn attempt_limit() {
        let config = GeneratorConfig {
            max_attempts: NonZeroU32::new(3),
        };
        let mut rng = SecureRandom::with_config(ScriptedEntropySource::new([0xf; 4]), config);
        let err = block_on(rng.generate(0, 10)).unwrap_err();
        assert_matches!(err, SecureRandomError::AttemptsExhausted(3));
        assert_eq!(rng.source().calls(), 3);

        // An accepted candidate on the last allowed attempt still succeeds.
        let mut rng =
            SecureRandom::with_config(ScriptedEntropySource::new([0xf, 0xf, 0x2]), config);
        assert_eq!(block_on(rng.generate(0, 10)).unwrap(), 2);
    }

    #[test]
    fn config_from_json() {
        let config: GeneratorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GeneratorConfig::default());

        let config: GeneratorConfig = serde_json::from_str(r#"{"max_attempts": 64}"#).unwrap();
        assert_eq!(config.max_attempts, NonZeroU32::new(64));

        serde_json::from_str::<GeneratorConfig>(r#"{"max_attempts": 0}"#).unwrap_err();
        serde_json::from_str::<GeneratorConfig>(r#"{"retries": 1}"#).unwrap_err();
    }

    #[test]
    fn error_messages() {
        let err = SecureRandomError::MaxNotGreaterThanMin {
            min: Number::Int(4),
            max: Number::Float(1.5),
        };
        assert_eq!(err.to_string(), "max (1.5) must be greater than min (4)");
        assert_eq!(
            SecureRandomError::MinOutOfSafeRange(Number::Int(1 << 60)).to_string(),
            format!("min must be a safe integer, got {}", 1i128 << 60)
        );
    }
}
