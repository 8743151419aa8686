//! Error taxonomy shared by every somqc crate.

/// Error type for sheet analysis and batch orchestration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QcError {
    /// Malformed or insufficient observation data in one sheet.
    #[error("data error: {0}")]
    Data(String),

    /// The significance test could not be computed.
    #[error("statistical error: {0}")]
    Statistical(String),

    /// The host's data-access callback failed for a sheet.
    #[error("cannot read sheet '{sheet}': {reason}")]
    Source {
        /// Sheet identifier passed to the data source.
        sheet: String,
        /// Reason reported by the data source.
        reason: String,
    },

    /// Work could not be submitted to the worker pool.
    #[error("worker pool error: {0}")]
    Pool(String),

    /// The worker pool did not stop cleanly.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// A batch run is already in flight.
    #[error("a batch run is already in progress")]
    Busy,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error while loading or exporting data.
    #[error("I/O error: {0}")]
    Io(String),
}

impl QcError {
    /// Shorthand for a [`QcError::Data`] error.
    #[must_use]
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Whether this error is recovered at the sheet boundary (the sheet is skipped).
    #[must_use]
    pub fn is_per_sheet(&self) -> bool {
        matches!(
            self,
            Self::Data(_) | Self::Statistical(_) | Self::Source { .. } | Self::Io(_)
        )
    }
}

impl From<std::io::Error> for QcError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = QcError::data("too few neurons");
        assert_eq!(err.to_string(), "data error: too few neurons");

        let err = QcError::Source {
            sheet: "Sheet3".into(),
            reason: "missing".into(),
        };
        assert_eq!(err.to_string(), "cannot read sheet 'Sheet3': missing");

        assert_eq!(
            QcError::Busy.to_string(),
            "a batch run is already in progress"
        );
    }

    #[test]
    fn per_sheet_classification() {
        assert!(QcError::data("x").is_per_sheet());
        assert!(QcError::Statistical("x".into()).is_per_sheet());
        assert!(!QcError::Pool("x".into()).is_per_sheet());
        assert!(!QcError::Busy.is_per_sheet());
    }

    #[test]
    fn io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: QcError = io.into();
        assert!(matches!(err, QcError::Io(_)));
    }
}
