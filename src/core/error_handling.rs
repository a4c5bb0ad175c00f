//! Generic error reporting helpers
//!
//! Errors that can be fixed by the person running the host (a bad manifest,
//! a missing artifact) get their own message in the log. Everything else is
//! reported under the operation that failed, with the detail at debug level.

/// Distinguishes errors the user can act on from internal failures.
///
/// When `is_user_actionable()` is true, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    fn user_message(&self) -> Option<&str>;
}

/// Log a failed operation at error level
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message().filter(|_| error.is_user_actionable()) {
        Some(user_msg) => log::error!("{}: {}", operation_context, user_msg),
        None => log::error!("{} failed: {}", operation_context, error),
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

/// Same as [`log_error_with_context`] but at warning level, for failures
/// the host is expected to survive.
pub fn log_warning_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message().filter(|_| error.is_user_actionable()) {
        Some(user_msg) => log::warn!("{}: {}", operation_context, user_msg),
        None => log::warn!("{}: {}", operation_context, error),
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct ManifestTypo {
        message: String,
    }

    impl fmt::Display for ManifestTypo {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl std::error::Error for ManifestTypo {}

    impl ContextualError for ManifestTypo {
        fn is_user_actionable(&self) -> bool {
            true
        }

        fn user_message(&self) -> Option<&str> {
            Some(&self.message)
        }
    }

    #[derive(Debug)]
    struct LoaderCrash;

    impl fmt::Display for LoaderCrash {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "loader crashed")
        }
    }

    impl std::error::Error for LoaderCrash {}

    impl ContextualError for LoaderCrash {
        fn is_user_actionable(&self) -> bool {
            false
        }

        fn user_message(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn test_user_actionable_error_exposes_message() {
        let error = ManifestTypo {
            message: "unknown key 'pth'".to_string(),
        };
        assert!(error.is_user_actionable());
        assert_eq!(error.user_message(), Some("unknown key 'pth'"));
        log_error_with_context(&error, "Reading manifest");
    }

    #[test]
    fn test_system_error_has_no_user_message() {
        let error = LoaderCrash;
        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);
        log_warning_with_context(&error, "Loading plugin");
    }
}
