use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;

/// Direction of a journaled position.
///
/// Only `short` and `short_scalp` invert the sign of price movement. Any other
/// value, including ones this crate has never seen, is valued as a long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum PositionType {
    #[default]
    Long,
    Short,
    ShortScalp,
    Other(String),
}

impl PositionType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "long" | "" => PositionType::Long,
            "short" => PositionType::Short,
            "short_scalp" => PositionType::ShortScalp,
            other => PositionType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PositionType::Long => "long",
            PositionType::Short => "short",
            PositionType::ShortScalp => "short_scalp",
            PositionType::Other(s) => s,
        }
    }

    pub fn is_short(&self) -> bool {
        matches!(self, PositionType::Short | PositionType::ShortScalp)
    }
}

impl Serialize for PositionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PositionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_str()
            .map(PositionType::parse)
            .unwrap_or_default())
    }
}

/// A journaled trade as stored in the user's document.
///
/// Deserialization never fails on bad field shapes: numbers may arrive as JSON
/// numbers or numeric strings, and anything unreadable becomes `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawTrade")]
pub struct Trade {
    pub entry_date: Option<NaiveDate>,
    pub entry_price: Option<Decimal>,
    pub exit_price: Option<Decimal>,
    pub shares: Option<Decimal>,
    pub position_type: PositionType,
    pub entry_fees: Option<Decimal>,
    pub exit_fees: Option<Decimal>,
    pub setup_id: Option<String>,
}

impl Trade {
    pub fn new(
        entry_date: NaiveDate,
        position_type: PositionType,
        entry_price: Decimal,
        exit_price: Option<Decimal>,
        shares: Decimal,
    ) -> Self {
        Self {
            entry_date: Some(entry_date),
            entry_price: Some(entry_price),
            exit_price,
            shares: Some(shares),
            position_type,
            ..Default::default()
        }
    }

    pub fn with_fees(mut self, entry_fees: Decimal, exit_fees: Decimal) -> Self {
        self.entry_fees = Some(entry_fees);
        self.exit_fees = Some(exit_fees);
        self
    }

    pub fn with_setup(mut self, setup_id: impl Into<String>) -> Self {
        self.setup_id = Some(setup_id.into());
        self
    }
}

/// Wire shape of a trade before normalization. Every field is kept as a raw
/// JSON value so a single malformed field cannot reject the whole document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrade {
    #[serde(default)]
    entry_date: Option<Value>,
    #[serde(default)]
    date: Option<Value>,
    #[serde(default)]
    entry_price: Option<Value>,
    #[serde(default)]
    exit_price: Option<Value>,
    #[serde(default)]
    shares: Option<Value>,
    #[serde(default)]
    position_type: Option<Value>,
    #[serde(default)]
    entry_fees: Option<Value>,
    #[serde(default)]
    exit_fees: Option<Value>,
    #[serde(default)]
    setup_id: Option<Value>,
}

impl From<RawTrade> for Trade {
    fn from(raw: RawTrade) -> Self {
        let entry_date = raw
            .entry_date
            .as_ref()
            .and_then(date_from_value)
            .or_else(|| raw.date.as_ref().and_then(date_from_value));

        Self {
            entry_date,
            entry_price: raw.entry_price.as_ref().and_then(decimal_from_value),
            exit_price: raw.exit_price.as_ref().and_then(decimal_from_value),
            shares: raw.shares.as_ref().and_then(decimal_from_value),
            position_type: raw
                .position_type
                .as_ref()
                .and_then(Value::as_str)
                .map(PositionType::parse)
                .unwrap_or_default(),
            entry_fees: raw.entry_fees.as_ref().and_then(decimal_from_value),
            exit_fees: raw.exit_fees.as_ref().and_then(decimal_from_value),
            setup_id: raw.setup_id.as_ref().and_then(id_from_value),
        }
    }
}

/// A named trading strategy a trade can be tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setup {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Setup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(id_from_value(&value).unwrap_or_default())
}

/// Read a monetary or quantity field leniently.
pub fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        // Going through the textual form keeps `100.1` exact instead of
        // inheriting the binary float error.
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain)),
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
        }
        _ => None,
    }
}

/// Read a calendar date from an ISO string (`2024-06-03` or a full
/// timestamp) or from a stored timestamp object carrying `seconds`.
pub fn date_from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let day = s.get(..10).unwrap_or(s);
            NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
        }
        Value::Object(map) => map
            .get("seconds")
            .or_else(|| map.get("_seconds"))
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|ts| ts.date_naive()),
        _ => None,
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
