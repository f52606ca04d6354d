//! Hard/soft result carrier.
//!
//! Bulk operations such as "list every process" can fail outright (the
//! kernel refused the listing) or succeed with per-item anomalies (one
//! process exited before its name was read). [`Outcome`] carries both: a
//! `Result` for the operation itself and an accumulated list of soft errors
//! that travels alongside either arm.
//!
//! Because the primary value lives in a `Result`, an outcome can never hold
//! a value and a hard error at the same time.

use crate::error::{Error, Result};

/// Result of an operation plus the soft errors encountered along the way.
#[derive(Debug)]
#[must_use]
pub struct Outcome<T> {
    /// The value, or the hard error that prevented producing one.
    pub result: Result<T>,
    /// Per-item anomalies that did not invalidate the result.
    pub soft_errors: Vec<Error>,
}

impl<T> Outcome<T> {
    /// A successful outcome with no soft errors.
    pub fn ok(value: T) -> Self {
        Self {
            result: Ok(value),
            soft_errors: Vec::new(),
        }
    }

    /// A failed outcome with no soft errors.
    pub fn fail(error: Error) -> Self {
        Self {
            result: Err(error),
            soft_errors: Vec::new(),
        }
    }

    /// Wrap a plain `Result`.
    pub fn from_result(result: Result<T>) -> Self {
        Self {
            result,
            soft_errors: Vec::new(),
        }
    }

    /// Attach soft errors, keeping any already present.
    pub fn with_soft_errors(mut self, errors: impl IntoIterator<Item = Error>) -> Self {
        self.soft_errors.extend(errors);
        self
    }

    /// Record one more soft error.
    pub fn push_soft(&mut self, error: Error) {
        self.soft_errors.push(error);
    }

    /// Whether the operation produced a value.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Whether the operation failed outright.
    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }

    /// Borrow the value, if any.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    /// Borrow the hard error, if any.
    pub fn hard_error(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }

    /// Discard soft errors and return the plain result.
    pub fn into_result(self) -> Result<T> {
        self.result
    }

    /// Separate the result from the soft errors.
    pub fn split(self) -> (Result<T>, Vec<Error>) {
        (self.result, self.soft_errors)
    }

    /// Transform the value, keeping soft errors.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            result: self.result.map(f),
            soft_errors: self.soft_errors,
        }
    }

    /// Chain a dependent operation, accumulating soft errors from both.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        let mut soft_errors = self.soft_errors;
        match self.result {
            Ok(value) => {
                let next = f(value);
                soft_errors.extend(next.soft_errors);
                Outcome {
                    result: next.result,
                    soft_errors,
                }
            }
            Err(err) => Outcome {
                result: Err(err),
                soft_errors,
            },
        }
    }
}

impl<T> From<Result<T>> for Outcome<T> {
    fn from(result: Result<T>) -> Self {
        Outcome::from_result(result)
    }
}
