//! DynamoDB error mapping.
//!
//! Maps AWS SDK errors to [`Error`](crate::Error).

use std::fmt::{Debug, Display};

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::delete_table::DeleteTableError;

use crate::error::Error;

fn is_throttling(code: Option<&str>) -> bool {
    matches!(
        code,
        Some(
            "ProvisionedThroughputExceededException"
                | "RequestLimitExceeded"
                | "ThrottlingException"
        )
    )
}

/// Map any SDK error for an operation on `table_name`.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, table_name: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        return map_connection_error(DisplayErrorContext(&err));
    }

    let code = err.code();
    if code == Some("ResourceNotFoundException") {
        return Error::TableNotFound(table_name.to_string());
    }
    if is_throttling(code) {
        return Error::Throttled(err.message().unwrap_or("please retry").to_string());
    }

    Error::Service(DisplayErrorContext(&err).to_string())
}

/// Map a CreateTable SDK error.
pub fn map_create_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<CreateTableError, R>,
    table_name: &str,
) -> Error {
    match err.as_service_error() {
        Some(CreateTableError::ResourceInUseException(_)) => {
            Error::TableAlreadyExists(table_name.to_string())
        }
        Some(CreateTableError::LimitExceededException(e)) => Error::Throttled(
            e.message().unwrap_or("table limit exceeded").to_string(),
        ),
        _ => map_sdk_error(err, table_name),
    }
}

/// Map a DeleteTable SDK error.
pub fn map_delete_table_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteTableError, R>,
    table_name: &str,
) -> Error {
    match err.as_service_error() {
        Some(DeleteTableError::ResourceNotFoundException(_)) => {
            Error::TableNotFound(table_name.to_string())
        }
        Some(DeleteTableError::ResourceInUseException(_)) => Error::Service(format!(
            "Table {} is being created or updated and cannot be deleted yet",
            table_name
        )),
        _ => map_sdk_error(err, table_name),
    }
}

/// Map a generic connection/config error.
pub fn map_connection_error(err: impl Display) -> Error {
    Error::Connection(err.to_string())
}

/// Map a request builder error (a required field was not set).
pub fn map_build_error(err: impl Display) -> Error {
    Error::InvalidData(err.to_string())
}
