use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ordered line item. Always the product of [`normalize_order`]; by the
/// time a value of this type exists, `item` is non-empty and `quantity` is
/// positive. Duplicate item names across lines are legal and never merged:
/// each line is a distinct order event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item: String,
    pub quantity: u32,
    #[serde(default)]
    pub price: f64,
}

impl OrderLine {
    pub fn new(item: impl Into<String>, quantity: u32, price: f64) -> Self {
        Self { item: item.into(), quantity, price }
    }
}

/// Normalizes a model-supplied `order` payload into clean order lines.
///
/// The upstream model emits the order in whatever shape it pleases: a JSON
/// array, a string containing a JSON array, a Python-style repr, entries
/// that are themselves encoded strings, and key names drawn from
/// `item`/`name`/`product` and `quantity`/`qty`. All of that duck typing is
/// resolved here, at the decode boundary, and nowhere else.
///
/// Entries are dropped (never erroring) when they are not keyed records,
/// when the resolved name is empty, or when the quantity is missing,
/// uncoercible, or not positive. `price` is kept as given, defaulting to 0.
pub fn normalize_order(raw: &Value) -> Vec<OrderLine> {
    let entries = match raw {
        Value::Array(entries) => entries.clone(),
        Value::String(text) => match parse_sequence(text) {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let record = match entry {
            Value::Object(map) => Value::Object(map),
            Value::String(text) => match parse_sequence(&text) {
                Some(Value::Object(map)) => Value::Object(map),
                _ => continue,
            },
            _ => continue,
        };

        let Some(item) = resolve_name(&record) else { continue };
        let Some(quantity) = resolve_quantity(&record) else { continue };
        if quantity <= 0 {
            continue;
        }

        let price = record.get("price").and_then(Value::as_f64).unwrap_or(0.0);
        lines.push(OrderLine { item, quantity: quantity as u32, price });
    }

    lines
}

fn resolve_name(record: &Value) -> Option<String> {
    for key in ["item", "name", "product"] {
        if let Some(name) = record.get(key).and_then(Value::as_str) {
            if !name.is_empty() {
                return Some(name.to_owned());
            }
        }
    }
    None
}

fn resolve_quantity(record: &Value) -> Option<i64> {
    for key in ["quantity", "qty"] {
        match record.get(key) {
            Some(Value::Number(number)) => {
                if let Some(quantity) = number.as_i64() {
                    return Some(quantity);
                }
                // Floats truncate toward zero, matching integer coercion.
                if let Some(quantity) = number.as_f64() {
                    return Some(quantity as i64);
                }
            }
            Some(Value::String(text)) => {
                return text.trim().parse::<i64>().ok();
            }
            _ => continue,
        }
    }
    None
}

/// Strict JSON parse with a lenient second try that rewrites Python-style
/// reprs (single quotes, True/False/None) into JSON before parsing.
fn parse_sequence(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }

    let rewritten = text
        .replace('\'', "\"")
        .replace("True", "true")
        .replace("False", "false")
        .replace("None", "null");
    serde_json::from_str::<Value>(&rewritten).ok()
}
