//! A local stand-in for the booking GraphQL server.

use std::net::{SocketAddr, TcpListener};

use axum::{
    http::{
        header::{CONTENT_TYPE, COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use nbc_core::booking_client::Session;

/// One completed booking with an address and one cancelled booking.
static UPSTREAM_RESPONSE: &str = r#"{
  "data": {
    "booking": {
      "id": null,
      "totalCount": 2,
      "bookings": [
        {
          "bookingId": "612345678",
          "businessName": "바른정형외과",
          "serviceName": "도수치료",
          "bookingStatusCode": "RC08",
          "isCompleted": true,
          "startDate": "2023-03-04T10:00:00+09:00",
          "endDate": "2023-03-04T10:30:00+09:00",
          "regDateTime": "2023-02-27T21:14:05+09:00",
          "completedDateTime": "2023-03-04T10:41:12+09:00",
          "cancelledDateTime": null,
          "business": {
            "addressJson": {
              "address": "서울특별시 강남구 테헤란로 152",
              "posLong": 127.0385419,
              "posLat": 37.5000776
            },
            "name": "바른정형외과",
            "serviceName": "바른정형외과 강남점"
          }
        },
        {
          "bookingId": "612345680",
          "businessName": "연남동 카페",
          "serviceName": "단체석",
          "bookingStatusCode": "RC04",
          "isCompleted": false,
          "startDate": "2023-03-12T18:00:00+09:00",
          "endDate": "2023-03-12T20:00:00+09:00",
          "regDateTime": "2023-03-02T12:30:00+09:00",
          "completedDateTime": null,
          "cancelledDateTime": "2023-03-05T08:00:00+09:00",
          "business": null
        }
      ]
    }
  }
}"#;

pub fn session() -> Session {
    Session::new("aut", "ses")
}

async fn graphql(headers: HeaderMap) -> Response {
    let mut cookies: Vec<&str> = headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split("; ").collect())
        .unwrap_or_default();
    cookies.sort_unstable();
    if cookies != ["NID_AUT=aut", "NID_SES=ses"] {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ([(CONTENT_TYPE, "application/json")], UPSTREAM_RESPONSE).into_response()
}

/// Serve `app` on an ephemeral loopback port.
pub fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(server);
    addr
}

/// Serve the stand-in at `/graphql` and return its address.
pub fn serve_upstream() -> SocketAddr {
    serve(Router::new().route("/graphql", post(graphql)))
}
