// SPDX-License-Identifier: MPL-2.0

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # securerand
//!
//! Cryptographically secure random integers, uniformly distributed over an inclusive range.
//!
//! Random bytes are masked down to the bit width of the range and out-of-range candidates are
//! rejected, so the output carries no modulo bias. Bounds are checked against the range of
//! integers that an `f64` represents exactly (see [`bound::MAX_SAFE_INTEGER`]).
//!
//! ```no_run
//! # futures::executor::block_on(async {
//! let roll = securerand::secure_random_integer(1, 6).await?;
//! assert!((1..=6).contains(&roll));
//! # Ok::<(), securerand::generator::SecureRandomError>(())
//! # }).unwrap();
//! ```
//!
//! Randomness is supplied through the [`entropy::EntropySource`] trait. The operating system is
//! used by default; any other source can be plugged into a [`generator::SecureRandom`].

pub mod bound;
pub mod entropy;
pub mod generator;
pub mod params;

use bound::Number;
use entropy::OsEntropySource;
use generator::{SecureRandom, SecureRandomError};

/// Draw an integer `r` with `min <= r <= max` using entropy from the operating system.
pub async fn secure_random_integer(
    min: impl Into<Number>,
    max: impl Into<Number>,
) -> Result<i64, SecureRandomError> {
    SecureRandom::new(OsEntropySource).generate(min, max).await
}
