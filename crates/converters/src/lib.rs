use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use unit_table::Category;

pub mod round;

pub use round::round6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvertError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unsupported conversion: {category} {from} -> {to}")]
    UnsupportedConversion { category: String, from: String, to: String },
}

/// Which side of the (fromUnit, toUnit) pair supplies the factor
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// fromUnit -> toUnit
    From,
    /// toUnit -> fromUnit, looked up in that orientation
    To,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "from" => Some(Direction::From),
            "to" => Some(Direction::To),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::From => "from",
            Direction::To => "to",
        }
    }
}

/// Body of `POST /api/convert`. Every field is optional on the wire so that
/// missing data is reported as `InvalidInput` instead of a decode failure.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub from_unit: Option<String>,
    pub to_unit: Option<String>,
    pub value: Option<Value>,
    pub direction: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvertResponse { pub result: f64 }

/// A convert request that passed validation and resolved to a table factor.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversion {
    pub category: Category,
    pub from_unit: String,
    pub to_unit: String,
    pub value: f64,
    pub direction: Direction,
    pub factor: f64,
}

impl Conversion {
    pub fn result(&self) -> f64 { round6(self.value * self.factor) }
}

impl ConvertRequest {
    pub fn validate(self) -> Result<Conversion, ConvertError> {
        let category = required_str("type", self.category)?;
        let from_unit = required_str("fromUnit", self.from_unit)?;
        let to_unit = required_str("toUnit", self.to_unit)?;
        let value = finite_number("value", self.value.as_ref())?;
        // anything but "from" is the reverse lookup
        let direction = match self.direction.as_deref() {
            Some("from") => Direction::From,
            _ => Direction::To,
        };

        let unsupported = || ConvertError::UnsupportedConversion {
            category: category.clone(),
            from: from_unit.clone(),
            to: to_unit.clone(),
        };
        let cat = Category::parse(&category).ok_or_else(unsupported)?;
        let factor = match direction {
            Direction::From => unit_table::lookup(cat, &from_unit, &to_unit),
            Direction::To => unit_table::lookup(cat, &to_unit, &from_unit),
        }
        .ok_or_else(unsupported)?;
        if !(value * factor).is_finite() {
            return Err(ConvertError::InvalidInput(format!("{value} {from_unit} is out of range for {to_unit}")));
        }

        Ok(Conversion { category: cat, from_unit, to_unit, value, direction, factor })
    }
}

/// Validate, look up the factor, multiply and round. Never touches the store.
pub fn handle_convert(req: ConvertRequest) -> Result<ConvertResponse, ConvertError> {
    let conversion = req.validate()?;
    let result = conversion.result();
    tracing::debug!(
        category = %conversion.category,
        from = %conversion.from_unit,
        to = %conversion.to_unit,
        direction = conversion.direction.as_str(),
        value = conversion.value,
        result,
        "converted"
    );
    Ok(ConvertResponse { result })
}

/// Body of `POST /api/save`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub from_unit: Option<String>,
    pub to_unit: Option<String>,
    pub input_value: Option<Value>,
    pub result: Option<Value>,
    pub direction: Option<String>,
}

/// A history row before the store assigns its id and timestamp
#[derive(Clone, Debug, PartialEq)]
pub struct NewHistoryRecord {
    pub category: String,
    pub from_unit: String,
    pub to_unit: String,
    pub input_value: f64,
    pub result: f64,
    pub direction: Option<Direction>,
}

impl SaveRequest {
    pub fn validate(self) -> Result<NewHistoryRecord, ConvertError> {
        let category = required_str("type", self.category)?;
        let from_unit = required_str("fromUnit", self.from_unit)?;
        let to_unit = required_str("toUnit", self.to_unit)?;
        let input_value = finite_number("inputValue", self.input_value.as_ref())?;
        let result = finite_number("result", self.result.as_ref())?;
        let direction = match self.direction.as_deref() {
            None | Some("") => None,
            Some(d) => Some(
                Direction::parse(d)
                    .ok_or_else(|| ConvertError::InvalidInput(format!("direction must be \"from\" or \"to\", got {d:?}")))?,
            ),
        };
        Ok(NewHistoryRecord { category, from_unit, to_unit, input_value, result, direction })
    }
}

impl From<&Conversion> for NewHistoryRecord {
    fn from(c: &Conversion) -> Self {
        NewHistoryRecord {
            category: c.category.as_str().to_string(),
            from_unit: c.from_unit.clone(),
            to_unit: c.to_unit.clone(),
            input_value: c.value,
            result: c.result(),
            direction: Some(c.direction),
        }
    }
}

fn required_str(field: &str, v: Option<String>) -> Result<String, ConvertError> {
    match v {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ConvertError::InvalidInput(format!("{field} is required"))),
    }
}

/// Numbers pass through; numeric strings are coerced.
fn finite_number(field: &str, v: Option<&Value>) -> Result<f64, ConvertError> {
    let n = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
        .ok_or_else(|| ConvertError::InvalidInput(format!("{field} must be a finite number")))
}
