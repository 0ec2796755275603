use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::intent::ExtractorKind;
use crate::model::BusinessHours;

/// Process configuration, read once at startup from `DOORSTEP_*` environment
/// variables. Anything unset falls back to a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    /// Calendar timezone; one policy for the whole system.
    pub timezone: Tz,
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub extractor: ExtractorKind,
    pub model_endpoint: Option<String>,
    pub model_api_key: Option<String>,
    pub model_name: String,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        let open_hour: u32 = env_parse("DOORSTEP_OPEN_HOUR").unwrap_or(9);
        let close_hour: u32 = env_parse("DOORSTEP_CLOSE_HOUR").unwrap_or(17);
        Self {
            bind: std::env::var("DOORSTEP_BIND").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("DOORSTEP_PORT").unwrap_or(7310),
            max_connections: env_parse("DOORSTEP_MAX_CONNECTIONS").unwrap_or(256),
            metrics_port: env_parse("DOORSTEP_METRICS_PORT"),
            timezone: env_parse("DOORSTEP_TZ").unwrap_or(chrono_tz::UTC),
            open: NaiveTime::from_hms_opt(open_hour.min(23), 0, 0)
                .unwrap_or(NaiveTime::MIN),
            close: NaiveTime::from_hms_opt(close_hour.min(23), 0, 0)
                .unwrap_or(NaiveTime::MIN),
            extractor: env_parse("DOORSTEP_EXTRACTOR").unwrap_or_default(),
            model_endpoint: std::env::var("DOORSTEP_MODEL_ENDPOINT").ok(),
            model_api_key: std::env::var("DOORSTEP_MODEL_API_KEY").ok(),
            model_name: std::env::var("DOORSTEP_MODEL_NAME")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
        }
    }

    pub fn business_hours(&self) -> BusinessHours {
        BusinessHours::new(self.open, self.close, self.timezone)
    }
}
