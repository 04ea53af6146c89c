use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use compliance_engine::traits::{AuditError, ExchangeRateError, LedgerError, SellerApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state of the resource. {0}")]
    ResourceConflict(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity => StatusCode::UNAUTHORIZED,
                AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCronSecret => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedIdentity(_) => StatusCode::BAD_REQUEST,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::ResourceConflict(_) => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No gateway identity was attached to the request.")]
    MissingIdentity,
    #[error("The gateway identity signature is invalid.")]
    InvalidSignature,
    #[error("The cron secret is missing or incorrect.")]
    InvalidCronSecret,
    #[error("The gateway identity is not in the correct format. {0}")]
    PoorlyFormattedIdentity(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        use LedgerError::*;
        match e {
            SellerNotFound(_) | OrderNotFound(_) | LotNotFound(_) | CommissionNotFound(_) | DisputeNotFound(_) |
            RefundNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderAlreadyExists(_) |
            InvalidOrderTransition(_, _, _) |
            InvalidLotState { .. } |
            LotNotYetRefundable(_) |
            LotStillSecuringExposure(_) |
            CommissionNotPending(_) |
            CommissionOrderNotCompleted(_, _) |
            CommissionNotOverdue(_) |
            DisputeAlreadyOpen(_) |
            InvalidDisputeState(_, _) |
            InvalidRefundState(_, _) => Self::ResourceConflict(e.to_string()),
            UnknownCurrency(_) | CurrencyMismatch(_, _) => Self::InvalidRequestBody(e.to_string()),
            LotOwnershipMismatch(_, _) => Self::InsufficientPermissions(e.to_string()),
            SellerError(e) => e.into(),
            DatabaseError(_) | EligibilityWriteRace(_) | ProviderError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<SellerApiError> for ServerError {
    fn from(e: SellerApiError) -> Self {
        match e {
            SellerApiError::SellerNotFound(_) | SellerApiError::PaymentAccountNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            SellerApiError::PaymentAccountOwnershipMismatch(_, _) => Self::InsufficientPermissions(e.to_string()),
            SellerApiError::UnknownCurrency(_) => Self::InvalidRequestBody(e.to_string()),
            SellerApiError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ExchangeRateError> for ServerError {
    fn from(e: ExchangeRateError) -> Self {
        match e {
            ExchangeRateError::RateDoesNotExist(_) => Self::NoRecordFound(e.to_string()),
            ExchangeRateError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<AuditError> for ServerError {
    fn from(e: AuditError) -> Self {
        Self::BackendError(e.to_string())
    }
}
