//! Result alias and tap combinators.
//!
//! Best-effort paths (cleanup, side effects that are not reconciled state)
//! still need their failures recorded. These combinators attach the logging
//! without unwrapping.

use crate::error::Error;

/// The standard Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Tap-style combinators for any Result type.
pub trait GenericResultExt<T, E> {
    /// Perform a side effect on the Ok value without consuming the Result.
    fn tap_ok<F: FnOnce(&T)>(self, f: F) -> Self;

    /// Perform a side effect on the Err value without consuming the Result.
    fn tap_err<F: FnOnce(&E)>(self, f: F) -> Self;
}

impl<T, E> GenericResultExt<T, E> for std::result::Result<T, E> {
    fn tap_ok<F: FnOnce(&T)>(self, f: F) -> Self {
        if let Ok(ref v) = self {
            f(v);
        }
        self
    }

    fn tap_err<F: FnOnce(&E)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_ok() {
        let mut observed = 0;
        let result: std::result::Result<i32, &str> = Ok(42);
        let _ = result.tap_ok(|v| observed = *v);
        assert_eq!(observed, 42);
    }

    #[test]
    fn test_tap_err_leaves_result_untouched() {
        let mut observed = String::new();
        let result: std::result::Result<i32, &str> = Err("error");
        let returned = result.tap_err(|e| observed = (*e).to_string());
        assert_eq!(observed, "error");
        assert_eq!(returned, Err("error"));
    }
}
