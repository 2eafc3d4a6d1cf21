use chrono::{NaiveDate, Utc};

/// Runtime configuration. Every field has a default and a corresponding
/// environment override so deployments stay file-free.
#[derive(Clone)]
pub struct Config {
    /// Base URL the static game documents are served from.
    pub data_base_url: String,
    /// Optional feedback endpoint; feedback is disabled when unset.
    pub feedback_url: Option<String>,
    pub sqlite_path: String,
    pub max_attempts: u32,
    pub suggestion_limit: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_base_url: lookup("DATA_BASE_URL")
                .unwrap_or_else(|| "https://finansle.no/data/".to_string()),
            feedback_url: lookup("FEEDBACK_URL"),
            sqlite_path: lookup("SQLITE_PATH").unwrap_or_else(|| "./finansle.sqlite".to_string()),
            max_attempts: lookup("MAX_ATTEMPTS").and_then(|v| v.parse().ok()).unwrap_or(6),
            suggestion_limit: lookup("SUGGESTION_LIMIT").and_then(|v| v.parse().ok()).unwrap_or(8),
        }
    }
}

/// Current calendar date; the whole game keys off this.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_when_nothing_set() {
        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg.data_base_url, "https://finansle.no/data/");
        assert_eq!(cfg.sqlite_path, "./finansle.sqlite");
        assert_eq!(cfg.max_attempts, 6);
        assert_eq!(cfg.suggestion_limit, 8);
        assert!(cfg.feedback_url.is_none());
    }

    #[test]
    fn test_config_overrides_applied() {
        let cfg = Config::from_lookup(|key| match key {
            "DATA_BASE_URL" => Some("http://localhost:8080/data/".to_string()),
            "FEEDBACK_URL" => Some("http://localhost:8080/feedback".to_string()),
            "MAX_ATTEMPTS" => Some("4".to_string()),
            _ => None,
        });
        assert_eq!(cfg.data_base_url, "http://localhost:8080/data/");
        assert_eq!(cfg.feedback_url.as_deref(), Some("http://localhost:8080/feedback"));
        assert_eq!(cfg.max_attempts, 4);
        assert_eq!(cfg.suggestion_limit, 8);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let cfg = Config::from_lookup(|key| match key {
            "MAX_ATTEMPTS" => Some("many".to_string()),
            "SUGGESTION_LIMIT" => Some("-3".to_string()),
            _ => None,
        });
        assert_eq!(cfg.max_attempts, 6);
        assert_eq!(cfg.suggestion_limit, 8);
    }
}
