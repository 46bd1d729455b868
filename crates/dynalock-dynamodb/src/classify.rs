//! Mapping of DynamoDB SDK errors onto `StoreError`

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use dynalock_core::{BackendErrorKind, StoreError, StoreOperation};

/// Coarse kind of a DynamoDB service error, from its error code
pub fn kind_from_code(code: Option<&str>) -> BackendErrorKind {
    match code {
        Some(
            "ProvisionedThroughputExceededException"
            | "ThrottlingException"
            | "Throttling"
            | "RequestLimitExceeded"
            | "TooManyRequestsException",
        ) => BackendErrorKind::Throttled,
        Some(
            "AccessDeniedException"
            | "UnrecognizedClientException"
            | "InvalidSignatureException"
            | "IncompleteSignature"
            | "MissingAuthenticationToken"
            | "ExpiredTokenException",
        ) => BackendErrorKind::AccessDenied,
        Some("ResourceNotFoundException") => BackendErrorKind::ResourceNotFound,
        Some(
            "ValidationException"
            | "SerializationException"
            | "ItemCollectionSizeLimitExceededException",
        ) => BackendErrorKind::InvalidRequest,
        Some("InternalServerError" | "ServiceUnavailable" | "ServiceUnavailableException") => {
            BackendErrorKind::Unavailable
        }
        _ => BackendErrorKind::Other,
    }
}

/// Classify any SDK failure as a backend error
pub(crate) fn backend_error<E, R>(operation: StoreOperation, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    let kind = match &err {
        SdkError::ServiceError(ctx) => kind_from_code(ctx.err().code()),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            BackendErrorKind::Transport
        }
        SdkError::ConstructionFailure(_) => BackendErrorKind::InvalidRequest,
        _ => BackendErrorKind::Other,
    };

    StoreError::backend(operation, kind, DisplayErrorContext(&err).to_string())
}

/// Classify a `PutItem` failure; a failed condition means the lock is held
pub(crate) fn put_item_error<R: Debug>(err: SdkError<PutItemError, R>) -> StoreError {
    if let SdkError::ServiceError(ctx) = &err
        && ctx.err().is_conditional_check_failed_exception()
    {
        return StoreError::ConditionFailed;
    }

    backend_error(StoreOperation::ConditionalInsert, err)
}
