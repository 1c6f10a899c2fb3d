//! The record emitted for every accepted export row.

use serde::ser::{Serialize, SerializeMap, Serializer};

pub const BASE_PRODUCTS_KEY: &str = "baseProducts";
pub const ADDON_PRODUCTS_KEY: &str = "addonProducts";
pub const RENTAL_DATE_KEY: &str = "rentalDate";

/// One schedule row: column label → cleaned text, in header order, plus the
/// rental items split into base and add-on products and the date stamp.
///
/// Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    columns: Vec<(String, String)>,
    pub base_products: String,
    pub addon_products: String,
    pub rental_date: String,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value; a repeated label overwrites the earlier value.
    pub fn set(&mut self, label: &str, value: String) {
        match self.columns.iter_mut().find(|(l, _)| l == label) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((label.to_string(), value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Column labels and values in header order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }
}

impl Serialize for ParsedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let reserved = [BASE_PRODUCTS_KEY, ADDON_PRODUCTS_KEY, RENTAL_DATE_KEY];
        let mut map = serializer.serialize_map(Some(self.columns.len() + 3))?;
        for (label, value) in &self.columns {
            if !reserved.contains(&label.as_str()) {
                map.serialize_entry(label, value)?;
            }
        }
        map.serialize_entry(BASE_PRODUCTS_KEY, &self.base_products)?;
        map.serialize_entry(ADDON_PRODUCTS_KEY, &self.addon_products)?;
        map.serialize_entry(RENTAL_DATE_KEY, &self.rental_date)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn test_set_overwrites_and_keeps_order() {
        let mut r = ParsedRecord::new();
        r.set("지점", "강남".into());
        r.set("고객명", "홍길동".into());
        r.set("지점", "서초".into());
        let cols: Vec<_> = r.columns().collect();
        assert_eq!(cols, vec![("지점", "서초"), ("고객명", "홍길동")]);
        assert_eq!(r.get("고객명"), Some("홍길동"));
        assert_eq!(r.get("연락처"), None);
    }

    #[test]
    fn test_serializes_flat() {
        let mut r = ParsedRecord::new();
        r.set("고객명", "홍길동".into());
        r.base_products = "장화".into();
        r.addon_products = "우산".into();
        r.rental_date = "2025-12-10".into();

        assert_json_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({
                "고객명": "홍길동",
                "baseProducts": "장화",
                "addonProducts": "우산",
                "rentalDate": "2025-12-10"
            })
        );
    }
}
