use std::sync::Arc;

use chrono::NaiveTime;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use doorstep::calendar::InMemoryCalendar;
use doorstep::config::Config;
use doorstep::engine::Engine;
use doorstep::intent::build_extractor;
use doorstep::model::BusinessHours;
use doorstep::route::HeuristicRouter;
use doorstep::wire;

/// Spin a wire front on an ephemeral port and return a connected client.
async fn connect() -> TcpStream {
    let hours = BusinessHours::new(
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        chrono_tz::UTC,
    );
    let calendar = Arc::new(InMemoryCalendar::new(chrono_tz::UTC));
    let router = Arc::new(HeuristicRouter::new(hours));
    let engine = Arc::new(Engine::new(calendar, router, hours));
    let extractor = build_extractor(&Config::from_env());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        wire::process_connection(socket, engine, extractor).await.ok();
    });
    TcpStream::connect(addr).await.unwrap()
}

async fn roundtrip(stream: &mut TcpStream, line: &str) -> serde_json::Value {
    stream.write_all(line.as_bytes()).await.unwrap();
    stream.write_all(b"\n").await.unwrap();
    let (read_half, _) = stream.split();
    let mut lines = BufReader::new(read_half).lines();
    let reply = lines.next_line().await.unwrap().unwrap();
    serde_json::from_str(&reply).unwrap()
}

#[tokio::test]
async fn book_then_availability_reflects_the_slot() {
    let mut client = connect().await;

    let reply = roundtrip(
        &mut client,
        r#"{"op":"book","request":{"customer_name":"Ada","address":"1 Main St","service":"cleaning","preferences":[{"date":"2026-03-02","time":"10:00:00"}]}}"#,
    )
    .await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["outcome"]["outcome"], "booked");
    assert_eq!(
        reply["outcome"]["appointment"]["interval"]["start"],
        "2026-03-02T10:00:00Z"
    );

    let reply = roundtrip(&mut client, r#"{"op":"availability","day":"2026-03-02"}"#).await;
    assert_eq!(reply["status"], "ok");
    let free = reply["free"].as_array().unwrap();
    // 120-minute cleaning at 10:00 splits the 09:00-17:00 day in two.
    assert_eq!(free.len(), 2);
    assert_eq!(free[0]["start"], "2026-03-02T09:00:00Z");
    assert_eq!(free[0]["end"], "2026-03-02T10:00:00Z");
    assert_eq!(free[1]["start"], "2026-03-02T12:00:00Z");
    assert_eq!(free[1]["end"], "2026-03-02T17:00:00Z");
}

#[tokio::test]
async fn free_text_message_books_via_the_extractor() {
    let mut client = connect().await;

    let reply = roundtrip(
        &mut client,
        r#"{"op":"message","text":"hi, my name is Maria Lopez, leaking pipe at 42 Oak Avenue, please come 2026-03-02 at 9am"}"#,
    )
    .await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["outcome"]["outcome"], "booked");
    let appt = &reply["outcome"]["appointment"];
    assert_eq!(appt["customer_name"], "Maria Lopez");
    assert_eq!(appt["service"], "plumbing");
    assert_eq!(appt["interval"]["start"], "2026-03-02T09:00:00Z");
}

#[tokio::test]
async fn exhausted_day_reports_no_slot() {
    let mut client = connect().await;

    let book = r#"{"op":"book","request":{"customer_name":"Ada","address":"1 Main St","service":"plumbing","preferences":[{"date":"2026-03-02","time":"09:00:00"}]}}"#;
    let first = roundtrip(&mut client, book).await;
    assert_eq!(first["outcome"]["outcome"], "booked");

    // Fill the rest of the day with cleanings until, between bookings and the
    // router's travel margins, nothing wide enough for a 60-minute visit is left.
    for hour in ["11:00:00", "13:00:00", "15:00:00"] {
        let line = format!(
            r#"{{"op":"book","request":{{"customer_name":"Bo","address":"2 Main St","service":"cleaning","preferences":[{{"date":"2026-03-02","time":"{hour}"}}]}}}}"#
        );
        let reply = roundtrip(&mut client, &line).await;
        assert_eq!(reply["status"], "ok", "setup booking failed: {reply}");
    }

    let reply = roundtrip(&mut client, book).await;
    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["outcome"]["outcome"], "no_slot_available");
}

#[tokio::test]
async fn malformed_request_returns_error_line() {
    let mut client = connect().await;
    let reply = roundtrip(&mut client, r#"{"op":"dance"}"#).await;
    assert_eq!(reply["status"], "error");
    assert_eq!(reply["retryable"], false);
}
