//! Remedial code generation and format rules.
//!
//! A remedial code is 6 characters drawn uniformly and independently from
//! `A-Z0-9`. Uniqueness is not checked here; the store owns that constraint and
//! reports [`CodeError::GenerationCollision`], which [`CodeAttempts`] turns
//! into another draw.

use crate::error::CodeError;
use rand::{Rng, thread_rng};
use tracing::warn;

/// Number of characters in a remedial code.
pub const CODE_LENGTH: usize = 6;

/// The 36-symbol alphabet codes are drawn from.
pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default cap on generation attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Draws a fresh code from the thread-local RNG.
pub fn generate_code() -> String {
    generate_code_with(&mut thread_rng())
}

/// Draws a fresh code from the given RNG. Seeded RNGs make this deterministic.
pub fn generate_code_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trims surrounding whitespace and upper-cases a raw submission.
///
/// Callers run this before handing a code to
/// [`validate_submission`](crate::attendance::validate_submission), which is
/// case-sensitive.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// True iff `code` is exactly [`CODE_LENGTH`] characters from [`CODE_ALPHABET`].
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Errors that may stand for "this code is already taken".
pub trait CodeCollision {
    fn collided_code(&self) -> Option<&str>;
}

impl CodeCollision for CodeError {
    fn collided_code(&self) -> Option<&str> {
        match self {
            CodeError::GenerationCollision { code } => Some(code),
            CodeError::CodeSpaceExhausted { .. } => None,
        }
    }
}

/// Bounded supply of fresh codes for one assignment.
///
/// Yields at most `max_attempts` codes, never fewer than one. Each store result
/// goes through [`CodeAttempts::settle`]; when the supply runs dry the caller
/// returns [`CodeAttempts::exhausted`].
#[derive(Debug)]
pub struct CodeAttempts {
    limit: u32,
    drawn: u32,
}

impl CodeAttempts {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            limit: max_attempts.max(1),
            drawn: 0,
        }
    }

    /// `None` when the attempt hit a taken code and another draw is due,
    /// otherwise the final result.
    pub fn settle<T, E>(&self, result: Result<T, E>) -> Option<Result<T, E>>
    where
        E: CodeCollision,
    {
        if let Err(err) = &result {
            if let Some(code) = err.collided_code() {
                warn!(attempt = self.drawn, %code, "remedial code collision, retrying");
                return None;
            }
        }
        Some(result)
    }

    pub fn exhausted(&self) -> CodeError {
        CodeError::CodeSpaceExhausted {
            attempts: self.limit,
        }
    }
}

impl Iterator for CodeAttempts {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.drawn >= self.limit {
            return None;
        }
        self.drawn += 1;
        Some(generate_code())
    }
}

/// Repeatedly generates a code and hands it to `try_store` until the store
/// accepts one.
///
/// `try_store` returns [`CodeError::GenerationCollision`] when the code is
/// taken; any other error is returned as-is. After `max_attempts` collisions
/// the result is [`CodeError::CodeSpaceExhausted`].
pub fn assign_with_retry<T, F>(max_attempts: u32, mut try_store: F) -> Result<T, CodeError>
where
    F: FnMut(String) -> Result<T, CodeError>,
{
    let mut attempts = CodeAttempts::new(max_attempts);
    while let Some(code) = attempts.next() {
        if let Some(done) = attempts.settle(try_store(code)) {
            return done;
        }
    }
    Err(attempts.exhausted())
}
