//! Process exit codes
//!
//! Scripts rely on these values; treat them as stable.

use oget_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Finished, or stopped by the user
    Success = 0,
    /// Operation failed
    GeneralError = 1,
    /// Invalid arguments or source expression
    UsageError = 2,
    /// Endpoint unreachable or transient failure that outlived retries
    NetworkError = 3,
    /// Credentials rejected or permission denied
    AuthError = 4,
    /// Alias, bucket or object does not exist
    NotFound = 5,
}

impl ExitCode {
    /// Exit code for a core error
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::InvalidPath(_) => ExitCode::UsageError,
            Error::AliasNotFound(_) | Error::NotFound(_) => ExitCode::NotFound,
            Error::AccessDenied(_) => ExitCode::AuthError,
            Error::Network(_) => ExitCode::NetworkError,
            Error::Cancelled => ExitCode::Success,
            Error::Config(_)
            | Error::InvalidTarget(_)
            | Error::IsDirectory(_)
            | Error::PartialWrite { .. }
            | Error::Io(_)
            | Error::General(_) => ExitCode::GeneralError,
        }
    }

    /// Exit code for a setup failure; unknown errors are general failures
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<Error>())
            .map(Self::from_error)
            .unwrap_or(ExitCode::GeneralError)
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            ExitCode::from_error(&Error::NotFound("s3/a/b".into())),
            ExitCode::NotFound
        );
        assert_eq!(
            ExitCode::from_error(&Error::AccessDenied("s3/a/b".into())),
            ExitCode::AuthError
        );
        assert_eq!(
            ExitCode::from_error(&Error::Network("timeout".into())),
            ExitCode::NetworkError
        );
        assert_eq!(
            ExitCode::from_error(&Error::IsDirectory("s3/a/dir".into())),
            ExitCode::GeneralError
        );
        assert_eq!(
            ExitCode::from_error(&Error::InvalidPath("x".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from_error(&Error::InvalidTarget("target 'out' is not a folder".into())),
            ExitCode::GeneralError
        );
    }

    #[test]
    fn test_anyhow_downcast_through_context() {
        let result: std::result::Result<(), Error> = Err(Error::AliasNotFound("nope".into()));
        let err = result.context("Failed to connect alias 'nope'").unwrap_err();
        assert_eq!(ExitCode::from_anyhow(&err), ExitCode::NotFound);

        let plain = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_anyhow(&plain), ExitCode::GeneralError);
    }
}
