//! Integration tests: Open-Meteo client against a local canned server, and
//! agenda composition over a real reminder store.

use std::time::Duration;

use chrono::{Local, NaiveDate, TimeZone};
use ethos_adapters::{
    AdapterError, OpenMeteoClient, WeatherConfig, WeatherSource, compose_agenda,
};
use ethos_store::ReminderStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answer one request with `status` and a JSON `body`; return the request
/// line that was received.
async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let mut received = Vec::new();
        while !String::from_utf8_lossy(&received).contains("\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&received)
            .lines()
            .next()
            .unwrap_or_default()
            .to_owned()
    });

    (format!("http://{addr}"), handle)
}

fn client(base_url: String) -> OpenMeteoClient {
    OpenMeteoClient::new(WeatherConfig {
        latitude: 41.27,
        longitude: -72.97,
        base_url,
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

const FORECAST: &str = r#"{
  "latitude": 41.27, "longitude": -72.97, "timezone": "America/New_York",
  "daily": {
    "time": ["2024-06-12"],
    "temperature_2m_max": [30.0],
    "precipitation_sum": [0.0],
    "wind_speed_10m_max": [11.2],
    "weather_code": [1]
  }
}"#;

#[tokio::test]
async fn fetches_and_parses_daily_forecast() {
    let (url, server) = serve_once("200 OK", FORECAST).await;

    let forecast = client(url).today().await.unwrap();
    assert_eq!(forecast.date, NaiveDate::from_ymd_opt(2024, 6, 12).unwrap());
    assert_eq!(forecast.max_temp_f(), 86.0);
    assert!(forecast.suggestion().starts_with("It's hot"));

    let request_line = server.await.unwrap();
    assert!(request_line.starts_with("GET /v1/forecast?"));
    assert!(request_line.contains("latitude=41.27"));
    assert!(request_line.contains("forecast_days=1"));
    assert!(request_line.contains("timezone=auto"));
}

#[tokio::test]
async fn error_status_is_request_failure() {
    let (url, _server) = serve_once("400 Bad Request", r#"{"error":true,"reason":"bad"}"#).await;
    let err = client(url).today().await.unwrap_err();
    assert!(matches!(err, AdapterError::RequestFailed { .. }));
}

#[tokio::test]
async fn agenda_lists_only_todays_pending_reminders() {
    let dir = tempfile::tempdir().unwrap();
    let store = ReminderStore::open(dir.path().join("reminders.json"));

    let at = |d: u32, h: u32| Local.with_ymd_and_hms(2024, 6, d, h, 0, 0).unwrap();
    store.add("morning run", at(12, 7), None).unwrap();
    store.add("team call", at(12, 16), Some("work")).unwrap();
    store.add("tomorrow thing", at(13, 9), None).unwrap();
    store.mark_and_collect_due(at(12, 8));

    let (url, _server) = serve_once("200 OK", FORECAST).await;
    let today = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
    let agenda = compose_agenda(&client(url), store.pending_on(today), today).await;

    assert!(agenda.forecast.is_some());
    let tasks: Vec<_> = agenda.reminders.iter().map(|r| r.task.as_str()).collect();
    assert_eq!(tasks, vec!["team call"]);
    assert!(agenda.render().contains("team call at 4:00 PM"));
}
