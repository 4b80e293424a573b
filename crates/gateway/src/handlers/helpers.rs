//! Shared handler helpers

use actix_web::http::StatusCode;
use actix_web::HttpResponse;

use crate::downstream::ProxyResponse;
use crate::models::ErrorResponse;

/// Copy a downstream response to the client byte-for-byte
pub fn relay(response: ProxyResponse) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    HttpResponse::build(status)
        .content_type("application/json")
        .body(response.body)
}

/// Opaque 502 body for downstream transport failures
pub fn transport_error() -> HttpResponse {
    HttpResponse::BadGateway().json(ErrorResponse::new(
        "bad_gateway",
        "Downstream service unavailable",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_preserves_status_and_body() {
        let response = relay(ProxyResponse::new(404, br#"{"error":"not found"}"#.to_vec()));
        assert_eq!(response.status().as_u16(), 404);
    }

    #[test]
    fn test_relay_maps_invalid_status_to_bad_gateway() {
        let response = relay(ProxyResponse::new(99, Vec::new()));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_transport_error_is_502() {
        assert_eq!(transport_error().status(), StatusCode::BAD_GATEWAY);
    }
}
