use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::extract::Parsed;

/// Aggregate nutrients for a whole meal.
///
/// Macronutrient keys the prompt asks for: `calories`, `protein`, `fats`,
/// `carbohydrates`, `fiber`, `sugar`. Micronutrients use `<name>_mg` / `<name>_ug`.
/// Both groups are passed through as the model wrote them; unknown keys survive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientTotals {
    #[serde(default)]
    pub macronutrients: Map<String, Value>,
    #[serde(default)]
    pub micronutrients: Map<String, Value>,
}

impl NutrientTotals {
    /// `{"totals": {...}}`, the shape the model is asked to produce.
    pub fn into_wrapped(self) -> Value {
        let mut totals = Map::new();
        totals.insert("macronutrients".into(), Value::Object(self.macronutrients));
        totals.insert("micronutrients".into(), Value::Object(self.micronutrients));

        let mut root = Map::new();
        root.insert("totals".into(), Value::Object(totals));
        Value::Object(root)
    }

    pub fn macro_value(&self, key: &str) -> Option<f64> {
        self.macronutrients.get(key).and_then(Value::as_f64)
    }
}

/// Reduce whatever the model sent to a complete [`NutrientTotals`].
pub fn normalize_totals(parsed: Parsed) -> NutrientTotals {
    let Parsed::Object(mut root) = parsed else {
        return NutrientTotals::default();
    };

    match root.remove("totals") {
        Some(Value::Object(mut totals)) => NutrientTotals {
            macronutrients: take_group(&mut totals, "macronutrients"),
            micronutrients: take_group(&mut totals, "micronutrients"),
        },
        _ => NutrientTotals::default(),
    }
}

fn take_group(totals: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match totals.remove(key) {
        Some(Value::Object(group)) => group,
        _ => Map::new(),
    }
}

/// Reduce whatever the model sent to a list of food records.
///
/// Arrays are trusted as-is, a bare object becomes a one-item list, anything else is
/// an empty list.
pub fn normalize_foods(parsed: Parsed) -> Vec<Value> {
    match parsed {
        Parsed::Array(items) => items,
        Parsed::Object(item) => vec![Value::Object(item)],
        Parsed::Scalar(_) | Parsed::Invalid => Vec::new(),
    }
}
