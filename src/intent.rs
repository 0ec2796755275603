use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::Config;
use crate::model::{BookingRequest, ServiceKind, TimePreference};
use crate::observability;

/// Parses free-text customer messages into a structured booking request.
/// One polymorphic capability with config-selected variants, not parallel
/// modules per backend.
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, message: &str) -> Result<BookingRequest, IntentError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentError {
    /// The backing extractor cannot be reached. Callers may fall back to a
    /// degraded extractor rather than failing the message.
    Unavailable(String),
    /// The message (or the model reply) did not yield a booking request.
    Unparseable(String),
}

impl std::fmt::Display for IntentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntentError::Unavailable(msg) => write!(f, "intent extractor unavailable: {msg}"),
            IntentError::Unparseable(msg) => write!(f, "could not extract booking intent: {msg}"),
        }
    }
}

impl std::error::Error for IntentError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorKind {
    #[default]
    RuleBased,
    HostedModel,
    StructuredModel,
}

impl std::str::FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rule-based" | "rules" => Ok(ExtractorKind::RuleBased),
            "hosted-model" | "hosted" => Ok(ExtractorKind::HostedModel),
            "structured-model" | "structured" => Ok(ExtractorKind::StructuredModel),
            other => Err(format!("unknown extractor kind: {other}")),
        }
    }
}

/// Wire the configured extractor. Hosted variants are wrapped so that an
/// unreachable model degrades to the rule-based parser instead of erroring.
pub fn build_extractor(config: &Config) -> std::sync::Arc<dyn IntentExtractor> {
    let rules = RuleBasedExtractor::new(config.timezone);
    match (config.extractor, &config.model_endpoint) {
        (ExtractorKind::RuleBased, _) | (_, None) => std::sync::Arc::new(rules),
        (kind, Some(endpoint)) => std::sync::Arc::new(FallbackExtractor {
            primary: Box::new(HostedExtractor {
                client: reqwest::Client::new(),
                endpoint: endpoint.clone(),
                api_key: config.model_api_key.clone(),
                model: config.model_name.clone(),
                structured: kind == ExtractorKind::StructuredModel,
            }),
            rules,
        }),
    }
}

// ── Rule-based variant ───────────────────────────────────

pub struct RuleBasedExtractor {
    tz: Tz,
    name_re: Regex,
    address_re: Regex,
    date_re: Regex,
    time_re: Regex,
}

impl RuleBasedExtractor {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            name_re: Regex::new(r"(?i)(?:my name is|this is|i am|i'm)\s+([a-z][\w'-]*(?:\s+[a-z][\w'-]*)?)")
                .expect("name pattern"),
            address_re: Regex::new(r"(?i)\b(?:at|address is)\s+(\d+[^,.;!?]*)")
                .expect("address pattern"),
            date_re: Regex::new(r"(?i)\b(today|tomorrow|\d{4}-\d{2}-\d{2})\b")
                .expect("date pattern"),
            time_re: Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("time pattern"),
        }
    }

    fn service_of(message: &str) -> ServiceKind {
        let lower = message.to_ascii_lowercase();
        let catalogue: [(&[&str], ServiceKind); 5] = [
            (&["clean"], ServiceKind::Cleaning),
            (&["plumb", "leak", "pipe", "drain"], ServiceKind::Plumbing),
            (&["electric", "outlet", "wiring"], ServiceKind::Electrical),
            (&["landscap", "lawn", "garden"], ServiceKind::Landscaping),
            (&["repair", "fix", "broken"], ServiceKind::Repair),
        ];
        for (keywords, kind) in catalogue {
            if keywords.iter().any(|k| lower.contains(k)) {
                return kind;
            }
        }
        ServiceKind::Other
    }

    fn dates_of(&self, message: &str, today: NaiveDate) -> Vec<NaiveDate> {
        self.date_re
            .captures_iter(message)
            .filter_map(|c| match c[1].to_ascii_lowercase().as_str() {
                "today" => Some(today),
                "tomorrow" => today.succ_opt(),
                iso => iso.parse().ok(),
            })
            .collect()
    }

    fn times_of(&self, message: &str) -> Vec<NaiveTime> {
        self.time_re
            .captures_iter(message)
            .filter_map(|c| {
                let minute: u32 = c.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
                let meridiem = c.get(3).map(|m| m.as_str().to_ascii_lowercase());
                // Bare numbers without a colon or am/pm are street numbers, not times.
                if c.get(2).is_none() && meridiem.is_none() {
                    return None;
                }
                let mut hour: u32 = c[1].parse().ok()?;
                match meridiem.as_deref() {
                    Some("pm") if hour < 12 => hour += 12,
                    Some("am") if hour == 12 => hour = 0,
                    _ => {}
                }
                NaiveTime::from_hms_opt(hour, minute, 0)
            })
            .collect()
    }
}

#[async_trait]
impl IntentExtractor for RuleBasedExtractor {
    async fn extract(&self, message: &str) -> Result<BookingRequest, IntentError> {
        let address = self
            .address_re
            .captures(message)
            .map(|c| c[1].trim().to_string())
            .ok_or_else(|| IntentError::Unparseable("no service address found".into()))?;
        let customer_name = self
            .name_re
            .captures(message)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "customer".into());

        let today = Utc::now().with_timezone(&self.tz).date_naive();
        let dates = self.dates_of(message, today);
        let times = self.times_of(message);
        let nine = NaiveTime::from_hms_opt(9, 0, 0)
            .ok_or_else(|| IntentError::Unparseable("bad clock".into()))?;
        let preferences = (0..dates.len().max(times.len()))
            .filter_map(|i| {
                let date = dates.get(i).or_else(|| dates.last()).copied()?;
                let time = times.get(i).or_else(|| times.last()).copied().unwrap_or(nine);
                Some(TimePreference::new(date, time))
            })
            .collect();

        Ok(BookingRequest {
            customer_name,
            address,
            service: Self::service_of(message),
            preferences,
            notes: None,
        }
        .normalized(today))
    }
}

// ── Hosted variants ──────────────────────────────────────

const INTENT_PROMPT: &str = "Extract the booking request from the customer message. \
Reply with a JSON object: {\"customer_name\", \"address\", \"service\" \
(cleaning|repair|plumbing|electrical|landscaping), \"preferences\": \
[{\"date\": \"YYYY-MM-DD\", \"time\": \"HH:MM:SS\"}], \"notes\"}.";

/// Hosted completion endpoint. `structured` requests a schema-constrained
/// reply and decodes it strictly; the plain variant scrapes the first JSON
/// object out of free text.
struct HostedExtractor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    structured: bool,
}

impl HostedExtractor {
    fn body(&self, message: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": format!("{INTENT_PROMPT}\n\nCustomer message: {message}"),
        });
        if self.structured {
            body["response_format"] = serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": "booking_request",
                    "schema": {
                        "type": "object",
                        "required": ["customer_name", "address", "service"],
                        "properties": {
                            "customer_name": {"type": "string"},
                            "address": {"type": "string"},
                            "service": {"type": "string"},
                            "preferences": {"type": "array"},
                            "notes": {"type": ["string", "null"]},
                        },
                    },
                },
            });
        }
        body
    }
}

#[async_trait]
impl IntentExtractor for HostedExtractor {
    async fn extract(&self, message: &str) -> Result<BookingRequest, IntentError> {
        let mut req = self.client.post(&self.endpoint).json(&self.body(message));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let resp = req
            .send()
            .await
            .map_err(|e| IntentError::Unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| IntentError::Unavailable(e.to_string()))?;
        let reply: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| IntentError::Unavailable(e.to_string()))?;

        if self.structured {
            let json = reply
                .get("json")
                .ok_or_else(|| IntentError::Unparseable("reply missing `json` field".into()))?;
            serde_json::from_value(json.clone())
                .map_err(|e| IntentError::Unparseable(e.to_string()))
        } else {
            let text = reply
                .get("text")
                .and_then(|t| t.as_str())
                .ok_or_else(|| IntentError::Unparseable("reply missing `text` field".into()))?;
            let object = json_slice(text)
                .ok_or_else(|| IntentError::Unparseable("no JSON object in reply".into()))?;
            serde_json::from_str(object).map_err(|e| IntentError::Unparseable(e.to_string()))
        }
    }
}

/// First `{...}` slice of a free-text model reply.
fn json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

/// Hosted extractor with a rule-based safety net: `Unavailable` degrades to
/// the local parser, `Unparseable` propagates (retrying locally on a message
/// the model already read would hide real extraction bugs).
struct FallbackExtractor {
    primary: Box<dyn IntentExtractor>,
    rules: RuleBasedExtractor,
}

#[async_trait]
impl IntentExtractor for FallbackExtractor {
    async fn extract(&self, message: &str) -> Result<BookingRequest, IntentError> {
        match self.primary.extract(message).await {
            Err(IntentError::Unavailable(msg)) => {
                tracing::warn!(error = %msg, "hosted extractor unavailable, using rule-based parser");
                metrics::counter!(observability::INTENT_FALLBACK_TOTAL).increment(1);
                self.rules.extract(message).await
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleBasedExtractor {
        RuleBasedExtractor::new(chrono_tz::UTC)
    }

    #[tokio::test]
    async fn parses_a_full_message() {
        let req = rules()
            .extract(
                "Hi, my name is Maria Lopez. I have a leaking pipe at 42 Oak Avenue, \
                 could someone come 2026-03-05 at 2pm?",
            )
            .await
            .unwrap();
        assert_eq!(req.customer_name, "Maria Lopez");
        assert_eq!(req.address, "42 Oak Avenue");
        assert_eq!(req.service, ServiceKind::Plumbing);
        assert_eq!(
            req.preferences,
            vec![TimePreference::new(
                NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
                NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            )]
        );
    }

    #[tokio::test]
    async fn missing_address_is_unparseable() {
        let err = rules().extract("please clean my house").await.unwrap_err();
        assert!(matches!(err, IntentError::Unparseable(_)));
    }

    #[tokio::test]
    async fn missing_name_defaults() {
        let req = rules()
            .extract("need the lawn mowed at 7 Birch Road tomorrow")
            .await
            .unwrap();
        assert_eq!(req.customer_name, "customer");
        assert_eq!(req.service, ServiceKind::Landscaping);
        assert_eq!(req.preferences.len(), 1);
        assert_eq!(
            req.preferences[0].time,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn unrecognized_service_maps_to_other() {
        let req = rules()
            .extract("this is Bo, something odd happening at 9 Pine St")
            .await
            .unwrap();
        assert_eq!(req.service, ServiceKind::Other);
    }

    #[tokio::test]
    async fn no_dates_or_times_synthesizes_default_preference() {
        let req = rules()
            .extract("my name is Ann, deep clean at 12 Cedar Lane please")
            .await
            .unwrap();
        assert_eq!(req.preferences.len(), 1);
        assert_eq!(req.preferences[0].time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn street_numbers_are_not_times() {
        let req = rules()
            .extract("my name is Ann, clean at 1230 Cedar Lane on 2026-03-05")
            .await
            .unwrap();
        assert_eq!(req.address, "1230 Cedar Lane on 2026-03-05");
        assert_eq!(req.preferences[0].time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn ranked_preferences_keep_message_order() {
        let req = rules()
            .extract(
                "I'm Sam, fix the heater at 3 Fir Court on 2026-03-05 10:30 \
                 or 2026-03-06 9:00am",
            )
            .await
            .unwrap();
        assert_eq!(
            req.preferences,
            vec![
                TimePreference::new(
                    NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
                    NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
                ),
                TimePreference::new(
                    NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                ),
            ]
        );
    }

    /// Primary that always fails with a fixed error.
    struct FailingExtractor(IntentError);

    #[async_trait]
    impl IntentExtractor for FailingExtractor {
        async fn extract(&self, _message: &str) -> Result<BookingRequest, IntentError> {
            Err(self.0.clone())
        }
    }

    #[tokio::test]
    async fn unavailable_primary_falls_back_to_rules() {
        let extractor = FallbackExtractor {
            primary: Box::new(FailingExtractor(IntentError::Unavailable("down".into()))),
            rules: rules(),
        };
        let req = extractor
            .extract("my name is Ann, deep clean at 12 Cedar Lane please")
            .await
            .unwrap();
        assert_eq!(req.customer_name, "Ann");
        assert_eq!(req.service, ServiceKind::Cleaning);
    }

    #[tokio::test]
    async fn unparseable_primary_does_not_fall_back() {
        // A parseable message, so a fallback run would have succeeded.
        let extractor = FallbackExtractor {
            primary: Box::new(FailingExtractor(IntentError::Unparseable("garbled".into()))),
            rules: rules(),
        };
        let err = extractor
            .extract("my name is Ann, deep clean at 12 Cedar Lane please")
            .await
            .unwrap_err();
        assert_eq!(err, IntentError::Unparseable("garbled".into()));
    }

    #[test]
    fn json_slice_finds_the_object() {
        assert_eq!(
            json_slice("Sure! Here you go: {\"a\": 1} hope that helps"),
            Some("{\"a\": 1}")
        );
        assert_eq!(json_slice("no json here"), None);
    }

    #[test]
    fn extractor_kind_parses() {
        assert_eq!("rule-based".parse(), Ok(ExtractorKind::RuleBased));
        assert_eq!("hosted".parse(), Ok(ExtractorKind::HostedModel));
        assert_eq!("structured-model".parse(), Ok(ExtractorKind::StructuredModel));
        assert!("psychic".parse::<ExtractorKind>().is_err());
    }
}
