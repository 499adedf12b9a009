//! CLI-level errors (wraps infrastructure errors)

use std::io;

use thiserror::Error;

use crate::application::ApplicationError;
use crate::exitcode;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("document has {0} problem(s)")]
    Invalid(usize),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        Self::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) => exitcode::USAGE,
            CliError::Invalid(_) => exitcode::DATAERR,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => exitcode::IOERR,
                InfraError::Json { .. } => exitcode::DATAERR,
                InfraError::Application(e) => application_exit_code(e),
            },
        }
    }
}

fn application_exit_code(e: &ApplicationError) -> i32 {
    match e {
        ApplicationError::Domain(_)
        | ApplicationError::Import(_)
        | ApplicationError::Invariants(_) => exitcode::DATAERR,
        ApplicationError::InvalidSystemId(_) => exitcode::USAGE,
        ApplicationError::SystemNotFound(_) => exitcode::NOINPUT,
        ApplicationError::Config { .. } => exitcode::CONFIG,
        ApplicationError::OperationFailed { source, .. } => match source.downcast_ref::<io::Error>() {
            Some(err) if err.kind() == io::ErrorKind::NotFound => exitcode::NOINPUT,
            Some(err) if err.kind() == io::ErrorKind::InvalidData => exitcode::DATAERR,
            Some(_) => exitcode::IOERR,
            None => exitcode::SOFTWARE,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn given_structural_rejection_when_mapping_then_exits_with_dataerr() {
        let err: CliError = ApplicationError::from(DomainError::RootPromotion("a".into())).into();
        assert_eq!(err.exit_code(), exitcode::DATAERR);
    }

    #[test]
    fn given_missing_input_file_when_mapping_then_exits_with_noinput() {
        let err: CliError = ApplicationError::OperationFailed {
            context: "read import document: missing.json".into(),
            source: Box::new(io::Error::new(io::ErrorKind::NotFound, "gone")),
        }
        .into();
        assert_eq!(err.exit_code(), exitcode::NOINPUT);
    }
}
