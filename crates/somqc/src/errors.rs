//! Error handling and exit codes.

use somqc_core::constants::exit_codes;
use somqc_core::error::QcError;

/// Map an analysis error to its exit code.
pub fn handle_error(err: &QcError) -> i32 {
    match err {
        QcError::Config(_) => exit_codes::ERROR_CONFIG,
        QcError::Data(_)
        | QcError::Statistical(_)
        | QcError::Source { .. }
        | QcError::Pool(_)
        | QcError::Shutdown(_)
        | QcError::Busy
        | QcError::Io(_) => exit_codes::ERROR_GENERIC,
    }
}

/// Exit code for any error bubbling out of [`crate::app::run`].
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<QcError>()
        .map_or(exit_codes::ERROR_GENERIC, handle_error)
}
