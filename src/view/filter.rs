use crate::core::{Record, Value};
use std::cmp::Ordering;

/// Condition on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    Lt(Value),
    /// Integer column within `[start, end)`.
    Range { start: i64, end: i64 },
}

impl Predicate {
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Predicate::Eq(expected) => value == expected,
            Predicate::Lt(bound) => matches!(value.compare(bound), Ok(Ordering::Less)),
            Predicate::Range { start, end } => value
                .as_i64()
                .map(|v| v >= *start && v < *end)
                .unwrap_or(false),
        }
    }
}

/// Conjunction of column predicates over one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<(String, Predicate)>,
    allow_full_scan: bool,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push((column.to_string(), Predicate::Eq(value.into())));
        self
    }

    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.predicates
            .push((column.to_string(), Predicate::Lt(value.into())));
        self
    }

    pub fn range(mut self, column: &str, start: i64, end: i64) -> Self {
        self.predicates
            .push((column.to_string(), Predicate::Range { start, end }));
        self
    }

    /// Permits resolving this filter by scanning the whole table.
    /// Meant for load-time and maintenance work only.
    pub fn allow_full_scan(mut self) -> Self {
        self.allow_full_scan = true;
        self
    }

    pub fn full_scan_allowed(&self) -> bool {
        self.allow_full_scan
    }

    pub fn predicates(&self) -> &[(String, Predicate)] {
        &self.predicates
    }

    /// The integer bound by equality on `column`, if any.
    pub fn eq_int(&self, column: &str) -> Option<i64> {
        self.predicates.iter().find_map(|(c, p)| match p {
            Predicate::Eq(v) if c == column => v.as_i64(),
            _ => None,
        })
    }

    pub fn eq_value(&self, column: &str) -> Option<&Value> {
        self.predicates.iter().find_map(|(c, p)| match p {
            Predicate::Eq(v) if c == column => Some(v),
            _ => None,
        })
    }

    pub fn range_of(&self, column: &str) -> Option<(i64, i64)> {
        self.predicates.iter().find_map(|(c, p)| match p {
            Predicate::Range { start, end } if c == column => Some((*start, *end)),
            _ => None,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates
            .iter()
            .all(|(column, predicate)| predicate.matches(record.get(column)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjunction() {
        let record = Record::new()
            .with("OL_O_ID", 15i64)
            .with("OL_I_ID", 7i64)
            .with("S_QUANTITY", 4i64);

        assert!(Filter::new().eq("OL_I_ID", 7i64).range("OL_O_ID", 10, 20).matches(&record));
        assert!(!Filter::new().range("OL_O_ID", 16, 20).matches(&record));
        assert!(Filter::new().lt("S_QUANTITY", 5i64).matches(&record));
        assert!(!Filter::new().lt("S_QUANTITY", 4i64).matches(&record));
        assert!(!Filter::new().eq("MISSING", 1i64).matches(&record));
    }

    #[test]
    fn test_accessors() {
        let filter = Filter::new().eq("A", 3i64).range("B", 1, 4).eq("C", "x");
        assert_eq!(filter.eq_int("A"), Some(3));
        assert_eq!(filter.eq_int("C"), None);
        assert_eq!(filter.range_of("B"), Some((1, 4)));
        assert!(!filter.full_scan_allowed());
    }
}
