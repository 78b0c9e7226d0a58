//! Payload validation.
//!
//! Request DTOs implement [`Validate`], usually by chaining [`Check`] rules:
//!
//! ```
//! use warden_core::{Check, FieldErrors, Validate};
//!
//! struct NewProduct {
//!     name: String,
//! }
//!
//! impl Validate for NewProduct {
//!     fn validate(&self) -> Result<(), FieldErrors> {
//!         Check::new().required("name", &self.name).finish()
//!     }
//! }
//!
//! let err = NewProduct { name: String::new() }.validate().unwrap_err();
//! assert_eq!(err.fields()["name"], "is required");
//! ```

use crate::error::FieldErrors;
use regex::Regex;
use std::sync::OnceLock;

/// Implemented by payloads that can check their own field constraints.
pub trait Validate {
    /// Returns every failing field, or `Ok(())`.
    fn validate(&self) -> Result<(), FieldErrors>;
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
            .expect("valid regex")
    })
}

/// Accumulates field failures. Every rule runs; nothing short-circuits.
#[derive(Debug, Default)]
pub struct Check {
    errors: FieldErrors,
}

impl Check {
    /// Starts an empty check.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails if `value` is empty or whitespace.
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.add(field, "is required");
        }
        self
    }

    /// Fails if `values` is empty.
    pub fn required_list<T>(mut self, field: &str, values: &[T]) -> Self {
        if values.is_empty() {
            self.errors.add(field, "is required");
        }
        self
    }

    /// Fails if a non-empty `value` is not an email address.
    ///
    /// An empty value is left to [`Check::required`].
    pub fn email(mut self, field: &str, value: &str) -> Self {
        if !value.is_empty() && !email_regex().is_match(value) {
            self.errors.add(field, "must be a valid email address");
        }
        self
    }

    /// Fails if `value` differs from `other`, naming `other_field` in the message.
    pub fn equal_field(mut self, field: &str, value: &str, other_field: &str, other: &str) -> Self {
        if value != other {
            self.errors
                .add(field, format!("must be equal to {other_field}"));
        }
        self
    }

    /// Fails if any of `values` is not in `allowed`.
    pub fn one_of<S: AsRef<str>>(mut self, field: &str, values: &[S], allowed: &[&str]) -> Self {
        if let Some(bad) = values
            .iter()
            .map(AsRef::as_ref)
            .find(|v| !allowed.contains(v))
        {
            self.errors.add(
                field,
                format!("{bad} is not one of [{}]", allowed.join(" ")),
            );
        }
        self
    }

    /// Ends the check.
    pub fn finish(self) -> Result<(), FieldErrors> {
        self.errors.into_result()
    }
}
