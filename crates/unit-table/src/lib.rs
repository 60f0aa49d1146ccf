use serde::{Deserialize, Serialize};

/// Measurement domain whose units convert into each other through the table
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category { Length, Volume }

impl Category {
    pub const ALL: [Category; 2] = [Category::Length, Category::Volume];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "length" => Some(Category::Length),
            "volume" => Some(Category::Volume),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Length => "length",
            Category::Volume => "volume",
        }
    }

    fn rows(self) -> &'static [Row] {
        match self {
            Category::Length => LENGTH,
            Category::Volume => VOLUME,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// A selectable unit: machine name plus display label
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Unit { pub value: &'static str, pub label: &'static str }

/// One source unit and its factors towards every target unit of the category.
struct Row { unit: Unit, factors: &'static [(&'static str, f64)] }

// Literal factors; reverse pairs are independent approximations, not reciprocals.
static LENGTH: &[Row] = &[
    Row {
        unit: Unit { value: "meter", label: "Meters" },
        factors: &[("meter", 1.0), ("kilometer", 0.001), ("foot", 3.28084), ("mile", 0.000621371)],
    },
    Row {
        unit: Unit { value: "kilometer", label: "Kilometers" },
        factors: &[("meter", 1000.0), ("kilometer", 1.0), ("foot", 3280.84), ("mile", 0.621371)],
    },
    Row {
        unit: Unit { value: "foot", label: "Feet" },
        factors: &[("meter", 0.3048), ("kilometer", 0.0003048), ("foot", 1.0), ("mile", 0.000189394)],
    },
    Row {
        unit: Unit { value: "mile", label: "Miles" },
        factors: &[("meter", 1609.34), ("kilometer", 1.60934), ("foot", 5280.0), ("mile", 1.0)],
    },
];

static VOLUME: &[Row] = &[
    Row {
        unit: Unit { value: "liter", label: "Liters" },
        factors: &[("liter", 1.0), ("milliliter", 1000.0), ("cup", 4.22675), ("gallon", 0.264172)],
    },
    Row {
        unit: Unit { value: "milliliter", label: "Milliliters" },
        factors: &[("liter", 0.001), ("milliliter", 1.0), ("cup", 0.00422675), ("gallon", 0.000264172)],
    },
    Row {
        unit: Unit { value: "cup", label: "Cups" },
        factors: &[("liter", 0.236588), ("milliliter", 236.588), ("cup", 1.0), ("gallon", 0.0625)],
    },
    Row {
        unit: Unit { value: "gallon", label: "Gallons" },
        factors: &[("liter", 3.78541), ("milliliter", 3785.41), ("cup", 16.0), ("gallon", 1.0)],
    },
];

/// Factor that multiplies a value in `from` to get a value in `to`.
/// `None` when either unit is not part of the category.
pub fn lookup(category: Category, from: &str, to: &str) -> Option<f64> {
    category
        .rows()
        .iter()
        .find(|row| row.unit.value == from)?
        .factors
        .iter()
        .find(|(unit, _)| *unit == to)
        .map(|(_, factor)| *factor)
}

/// Units of a category in display order
pub fn units(category: Category) -> Vec<Unit> {
    category.rows().iter().map(|row| row.unit).collect()
}
