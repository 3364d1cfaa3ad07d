//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client (malformed ids, bodies).
    BadRequest(String),
    /// Error surfaced by the fulfillment core.
    Fulfillment(FulfillmentError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

/// Generic body for downstream outages; which service failed and why stays
/// in the logs, never in the response.
const COMMUNICATION_MESSAGE: &str = "A required service is temporarily unavailable; please try again";

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, String) {
    let status = match &err {
        FulfillmentError::EmptyCart
        | FulfillmentError::ProductUnavailable { .. }
        | FulfillmentError::PriceChanged { .. }
        | FulfillmentError::InsufficientStock { .. }
        | FulfillmentError::MissingParameter(_)
        | FulfillmentError::MalformedTransactionRef(_) => StatusCode::BAD_REQUEST,

        FulfillmentError::InvalidSignature => StatusCode::UNAUTHORIZED,
        FulfillmentError::NotOwner { .. } => StatusCode::FORBIDDEN,

        FulfillmentError::OrderNotFound(_) | FulfillmentError::PaymentNotFound(_) => {
            StatusCode::NOT_FOUND
        }

        // State machine rejections: the request was well-formed but the
        // resource is not in a state that admits it.
        FulfillmentError::InvalidOrderStatus { .. }
        | FulfillmentError::Order(_)
        | FulfillmentError::Payment(_) => StatusCode::CONFLICT,

        FulfillmentError::Communication(detail) => {
            tracing::warn!(error = %detail, "downstream service failure");
            return (StatusCode::BAD_GATEWAY, COMMUNICATION_MESSAGE.to_string());
        }

        FulfillmentError::Store(_) => {
            tracing::error!(error = %err, "store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, UserId};
    use domain::{OrderError, OrderStatus, ProductId};

    fn status_of(err: FulfillmentError) -> StatusCode {
        fulfillment_error_to_response(err).0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(FulfillmentError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(FulfillmentError::InsufficientStock {
                product_id: ProductId::new(10),
                available: 1,
                requested: 2,
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(FulfillmentError::InvalidSignature),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(FulfillmentError::NotOwner {
                user_id: UserId::new(),
                order_id: OrderId::new(),
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(FulfillmentError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(FulfillmentError::Order(OrderError::NotCancellable {
                status: OrderStatus::Paid,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(FulfillmentError::Communication("down".to_string())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_communication_body_is_generic() {
        let (status, message) = fulfillment_error_to_response(FulfillmentError::Communication(
            "Stock ledger error: inventory service unavailable".to_string(),
        ));
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(message, COMMUNICATION_MESSAGE);
        assert!(!message.contains("Stock ledger"));
        assert!(!message.contains("inventory"));
    }
}
