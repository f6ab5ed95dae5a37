use serde::{Deserialize, Serialize};

pub const POUNDS_TO_KILOGRAMS: f64 = 0.453592;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
    G,
}

impl WeightUnit {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "kg" => Some(WeightUnit::Kg),
            "lb" => Some(WeightUnit::Lb),
            "g" => Some(WeightUnit::G),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
            WeightUnit::G => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub value: f64,
    pub unit: WeightUnit,
}

impl Weight {
    pub fn to_kilograms(&self) -> f64 {
        match self.unit {
            WeightUnit::Kg => self.value,
            WeightUnit::Lb => self.value * POUNDS_TO_KILOGRAMS,
            WeightUnit::G => self.value / 1000.0,
        }
    }
}

/// Inventory item owned by the external inventory system. This service only
/// reads props to resolve names and weights for packed containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prop {
    pub id: String,
    pub name: String,
    pub show_id: Option<String>,
    pub weight: Option<Weight>,
}
