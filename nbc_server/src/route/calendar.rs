use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use nbc_core::ical::generator::Emitter;

use crate::snapshot::Snapshot;

/// Handle calendar requests.
///
/// Every request gets the current snapshot, nothing is fetched here.
pub async fn handler(State(snapshot): State<Snapshot>) -> Response {
    let body = snapshot.read().await.generate();
    ([(CONTENT_TYPE, "text/calendar; charset=utf-8")], body).into_response()
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufReader, Cursor},
        sync::Arc,
    };

    use axum::http::{header::CONTENT_TYPE, StatusCode};
    use nbc_core::{
        booking_client::{FetchOptions, Session},
        calendar::{self, GetIcalProperty},
        ical::IcalParser,
    };
    use tokio::sync::RwLock;

    use crate::{route::app, test_support};

    async fn get_feed(path: &str) -> (StatusCode, String, String) {
        let upstream = test_support::serve_upstream();
        let options = FetchOptions {
            endpoint: format!("http://{upstream}/graphql"),
            ..Default::default()
        };
        let calendar = calendar::get(&test_support::session(), &options)
            .await
            .unwrap();
        let addr = test_support::serve(app(Arc::new(RwLock::new(calendar))));
        let response = reqwest::get(format!("http://{addr}{path}")).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        (status, content_type, response.text().await.unwrap())
    }

    /// A completed booking with an address comes out as the only event.
    #[tokio::test]
    async fn test_serve_calendar() {
        let (status, content_type, body) = get_feed("/calendar").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("text/calendar"));
        let parsed: Vec<_> = IcalParser::new(BufReader::new(Cursor::new(body)))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].events.len(), 1);
        let event = &parsed[0].events[0];
        assert_eq!(
            event.get_ical_property_value("SUMMARY").unwrap(),
            "바른정형외과 - 도수치료"
        );
        assert_eq!(
            event.get_ical_property_value("LOCATION").unwrap(),
            "바른정형외과 강남점\\n서울특별시 강남구 테헤란로 152"
        );
        assert_eq!(
            event.get_ical_property_value("GEO").unwrap(),
            "37.5000776;127.0385419"
        );
        assert_eq!(
            event.get_ical_property_value("DTSTART").unwrap(),
            "20230304T010000Z"
        );
    }

    #[tokio::test]
    async fn test_serve_calendar_at_root() {
        let (status, _, body) = get_feed("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("BEGIN:VCALENDAR"));
        assert_eq!(body.matches("BEGIN:VEVENT").count(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_session() {
        let upstream = test_support::serve_upstream();
        let options = FetchOptions {
            endpoint: format!("http://{upstream}/graphql"),
            ..Default::default()
        };
        let result = calendar::get(&Session::new("expired", "expired"), &options).await;
        assert!(result.is_err());
    }
}
