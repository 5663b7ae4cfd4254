use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[serde(alias = "long", alias = "Long", alias = "BUY", alias = "buy")]
    Long,
    #[serde(alias = "short", alias = "Short", alias = "SELL", alias = "sell")]
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    /// Parse the stored column value; anything other than LONG is a short
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("LONG") {
            Direction::Long
        } else {
            Direction::Short
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub asset: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub position_size: f64,
    pub entry_date: NaiveDateTime,
    pub exit_date: NaiveDateTime,
    pub direction: Direction,
    pub strategy: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub screenshot_path: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub owner_id: i64,
}

impl Trade {
    /// Signed profit: (exit - entry) * size, negated for shorts
    pub fn pnl(&self) -> f64 {
        let raw = (self.exit_price - self.entry_price) * self.position_size;
        match self.direction {
            Direction::Long => raw,
            Direction::Short => -raw,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl() > 0.0
    }

    /// PnL normalised by the entry notional (size * entry price).
    /// A zero notional yields 0 rather than an infinite return.
    pub fn return_ratio(&self) -> f64 {
        let notional = self.position_size * self.entry_price;
        if notional == 0.0 {
            0.0
        } else {
            self.pnl() / notional
        }
    }

    pub fn holding_hours(&self) -> f64 {
        (self.exit_date - self.entry_date).num_seconds() as f64 / 3600.0
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Body of `POST /trades` and `PUT /trades/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeInput {
    pub asset: String,
    pub entry_price: f64,
    pub exit_price: f64,
    pub position_size: f64,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub entry_date: NaiveDateTime,
    #[serde(deserialize_with = "deserialize_datetime")]
    pub exit_date: NaiveDateTime,
    pub direction: Direction,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub screenshot_path: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TradeInput {
    /// Trimmed, de-duplicated tags in first-seen order
    pub fn normalized_tags(&self) -> Vec<String> {
        normalize_tags(self.tags.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeFilters {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    /// Comma-separated; a trade matches when it carries any of them
    pub tags: Option<String>,
}

impl TradeFilters {
    pub fn tag_list(&self) -> Vec<String> {
        parse_tag_list(self.tags.as_deref())
    }
}

/// Split a comma-separated `?tags=` value into normalized tags
pub fn parse_tag_list(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) => normalize_tags(&raw.split(',').map(str::to_string).collect::<Vec<_>>()),
        None => Vec::new(),
    }
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Accepts `YYYY-MM-DDTHH:MM:SS[.f]`, a space separator, RFC 3339 with offset
/// (converted to UTC), or a bare date (midnight).
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("Invalid isoformat string: '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(entry: f64, exit: f64, size: f64, direction: Direction) -> Trade {
        let date = parse_datetime("2024-01-02T10:00:00").unwrap();
        Trade {
            id: 1,
            asset: "NIFTY".to_string(),
            entry_price: entry,
            exit_price: exit,
            position_size: size,
            entry_date: date,
            exit_date: date,
            direction,
            strategy: None,
            tags: vec![],
            screenshot_path: None,
            notes: None,
            created_at: date,
            owner_id: 1,
        }
    }

    #[test]
    fn test_pnl_sign_follows_direction() {
        assert_eq!(trade(100.0, 110.0, 1.0, Direction::Long).pnl(), 10.0);
        assert_eq!(trade(100.0, 110.0, 1.0, Direction::Short).pnl(), -10.0);
        assert_eq!(trade(50.0, 40.0, 2.0, Direction::Short).pnl(), 20.0);
    }

    #[test]
    fn test_zero_notional_return_is_zero() {
        assert_eq!(trade(0.0, 10.0, 1.0, Direction::Long).return_ratio(), 0.0);
        assert_eq!(trade(100.0, 110.0, 2.0, Direction::Long).return_ratio(), 0.1);
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-05T09:15:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05 09:15:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05T10:15:00+01:00"), Some(expected));
        assert_eq!(
            parse_datetime("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_datetime("05/03/2024"), None);
    }

    #[test]
    fn test_trade_input_accepts_lowercase_direction_and_missing_optionals() {
        let json = r#"{
            "asset": "INFY",
            "entry_price": 1500.0,
            "exit_price": 1520.5,
            "position_size": 10,
            "entry_date": "2024-01-15T09:30:00",
            "exit_date": "2024-01-15T15:00:00",
            "direction": "long"
        }"#;
        let input: TradeInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.direction, Direction::Long);
        assert!(input.strategy.is_none());
        assert!(input.normalized_tags().is_empty());
    }

    #[test]
    fn test_trade_input_rejects_bad_date() {
        let json = r#"{
            "asset": "INFY", "entry_price": 1, "exit_price": 2, "position_size": 1,
            "entry_date": "yesterday", "exit_date": "2024-01-15", "direction": "SHORT"
        }"#;
        let err = serde_json::from_str::<TradeInput>(json).unwrap_err();
        assert!(err.to_string().contains("Invalid isoformat string"));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " breakout ".to_string(),
            "".to_string(),
            "breakout".to_string(),
            "fomo".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["breakout", "fomo"]);

        let filters = TradeFilters {
            tags: Some("a, b,,a".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.tag_list(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_tag_list_blank_input() {
        assert!(parse_tag_list(None).is_empty());
        assert!(parse_tag_list(Some(" , ,")).is_empty());
        assert_eq!(parse_tag_list(Some("swing")), vec!["swing"]);
    }
}
