//! Raw upstream rows.

use std::collections::HashMap;

use crate::columns::Column;

/// One upstream row: column → raw cell text, as decoded by the fetch layer.
///
/// Headers that do not resolve to a known [`Column`] are ignored. When two
/// headers resolve to the same column, the first one inserted wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: HashMap<Column, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cell under an upstream header. Returns the resolved column.
    pub fn insert(&mut self, header: &str, value: impl Into<String>) -> Option<Column> {
        let column = Column::from_header(header)?;
        self.cells.entry(column).or_insert_with(|| value.into());
        Some(column)
    }

    /// Builder-style insert by column.
    pub fn with(mut self, column: Column, value: impl Into<String>) -> Self {
        self.cells.entry(column).or_insert_with(|| value.into());
        self
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.cells.get(&column).map(String::as_str)
    }

    pub fn has(&self, column: Column) -> bool {
        self.cells.contains_key(&column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (header, value) in iter {
            row.insert(header.as_ref(), value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_headers_on_insert() {
        let row: RawRow = [("Ticker", "AAPL"), ("market_cap", "3.9T"), ("P/E", "30")]
            .into_iter()
            .collect();
        assert_eq!(row.get(Column::Ticker), Some("AAPL"));
        assert_eq!(row.get(Column::MarketCap), Some("3.9T"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn first_header_wins() {
        let mut row = RawRow::new();
        assert_eq!(row.insert("Ticker", "AAA"), Some(Column::Ticker));
        assert_eq!(row.insert("Symbol", "BBB"), Some(Column::Ticker));
        assert_eq!(row.get(Column::Ticker), Some("AAA"));
    }

    #[test]
    fn unknown_header_is_reported() {
        let mut row = RawRow::new();
        assert_eq!(row.insert("Beta", "1.2"), None);
        assert!(row.is_empty());
    }
}
