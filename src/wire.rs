use std::io;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::engine::Engine;
use crate::intent::{IntentError, IntentExtractor};
use crate::model::{BookingRequest, SchedulingOutcome, TimeInterval};

// ── JSON-lines front ─────────────────────────────────────────────
//
// One JSON request per line, one JSON response per line. Deliberately thin:
// everything interesting happens in the engine.

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WireRequest {
    /// Structured booking request, e.g. a form submission.
    Book {
        request: BookingRequest,
        #[serde(default)]
        day: Option<NaiveDate>,
    },
    /// Free-text customer message; runs the intent extractor first.
    Message { text: String },
    /// Read-only free-interval listing.
    Availability { day: NaiveDate },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum WireResponse {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        outcome: Option<SchedulingOutcome>,
        #[serde(skip_serializing_if = "Option::is_none")]
        free: Option<Vec<TimeInterval>>,
    },
    Error {
        error: String,
        retryable: bool,
    },
}

impl WireResponse {
    fn outcome(outcome: SchedulingOutcome) -> Self {
        WireResponse::Ok {
            outcome: Some(outcome),
            free: None,
        }
    }

    fn error(error: impl Into<String>, retryable: bool) -> Self {
        WireResponse::Error {
            error: error.into(),
            retryable,
        }
    }
}

pub async fn process_connection(
    socket: TcpStream,
    engine: Arc<Engine>,
    extractor: Arc<dyn IntentExtractor>,
) -> io::Result<()> {
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&line, &engine, &extractor).await;
        let mut out = serde_json::to_string(&response).map_err(io::Error::other)?;
        out.push('\n');
        write_half.write_all(out.as_bytes()).await?;
    }
    Ok(())
}

async fn handle_line(
    line: &str,
    engine: &Engine,
    extractor: &Arc<dyn IntentExtractor>,
) -> WireResponse {
    let request: WireRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => return WireResponse::error(format!("bad request: {e}"), false),
    };

    match request {
        WireRequest::Book { request, day } => {
            let today = Utc::now().with_timezone(&engine.hours().tz).date_naive();
            let request = request.normalized(today);
            book(engine, request, day).await
        }
        WireRequest::Message { text } => match extractor.extract(&text).await {
            // Extractors are not required to normalize; hosted variants hand
            // back the model's JSON as-is.
            Ok(request) => {
                let today = Utc::now().with_timezone(&engine.hours().tz).date_naive();
                book(engine, request.normalized(today), None).await
            }
            Err(e) => {
                let retryable = matches!(e, IntentError::Unavailable(_));
                WireResponse::error(e.to_string(), retryable)
            }
        },
        WireRequest::Availability { day } => match engine.list_availability(day).await {
            Ok(free) => WireResponse::Ok {
                outcome: None,
                free: Some(free),
            },
            Err(e) => WireResponse::error(e.to_string(), e.is_retryable()),
        },
    }
}

/// Book against the given day, defaulting to the most-preferred date. The
/// request reaches here normalized, so a first preference always exists.
async fn book(engine: &Engine, request: BookingRequest, day: Option<NaiveDate>) -> WireResponse {
    let Some(day) = day.or_else(|| request.preferences.first().map(|p| p.date)) else {
        return WireResponse::error("no target day in request", false);
    };
    match engine.attempt_booking(&request, day).await {
        Ok(outcome) => WireResponse::outcome(outcome),
        Err(e) => WireResponse::error(e.to_string(), e.is_retryable()),
    }
}
