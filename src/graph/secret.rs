//! Secret wrapper for values that must not leak into logs or records.
//!
//! A [`Secret`] prints as `[secret]` through `Debug`, `Display` and
//! `Serialize`. The plaintext is only reachable through [`Secret::expose`]
//! or [`Secret::into_inner`].

use serde::{Serialize, Serializer};
use std::fmt;

/// Placeholder printed in place of secret plaintext.
pub const REDACTED: &str = "[secret]";

/// A value whose plaintext must be deliberately unwrapped to read.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret<T> {
    value: T,
}

impl<T> Secret<T> {
    /// Wraps a value.
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Exposes the plaintext.
    pub const fn expose(&self) -> &T {
        &self.value
    }

    /// Consumes the wrapper and returns the plaintext.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Transforms the plaintext while keeping it wrapped.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Secret<U> {
        Secret::new(f(self.value))
    }
}

impl<T> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({REDACTED})")
    }
}

impl<T> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> Serialize for Secret<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted_everywhere() {
        let secret = Secret::from("hunter2");

        assert_eq!(format!("{secret}"), REDACTED);
        assert!(!format!("{secret:?}").contains("hunter2"));
        assert_eq!(
            serde_json::to_string(&secret).expect("serialize"),
            "\"[secret]\""
        );
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_map_keeps_value_wrapped() {
        let secret = Secret::from("abc").map(|s| s.len());
        assert_eq!(*secret.expose(), 3);
        assert_eq!(secret.to_string(), REDACTED);
    }
}
