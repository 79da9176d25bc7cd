//! The boundary between the mapper and a live database handle.

use crate::value::Value;

/// One result row: column names paired with their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Look up a column by name, ignoring ASCII case.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Remove and return a column's value, ignoring ASCII case.
    pub fn take(&mut self, column: &str) -> Option<Value> {
        let idx = self
            .columns
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(column))?;
        Some(std::mem::replace(&mut self.columns[idx].1, Value::Null))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Outcome of a data-modifying statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Executed {
    pub affected: usize,
    /// First generated-key row, in the order the columns were requested.
    pub generated: Option<Vec<Value>>,
}

/// A handle the mapper prepares and runs statements against.
///
/// Parameters are passed as groups that are bound left-to-right, so an
/// update can hand over its SET values and its key values separately.
/// Implementations hold no locks; callers serialize access to a session.
pub trait Session {
    fn query(&self, sql: &str, params: &[&[Value]]) -> rusqlite::Result<Vec<Row>>;

    /// Run a data-modifying statement. When `returning` is non-empty the
    /// listed columns of each affected row are requested back.
    fn execute(
        &self,
        sql: &str,
        returning: &[&str],
        params: &[&[Value]],
    ) -> rusqlite::Result<Executed>;
}

/// Flatten parameter groups into one bind list, left to right.
pub fn flatten<'a>(params: &'a [&'a [Value]]) -> impl Iterator<Item = &'a Value> {
    params.iter().flat_map(|group| group.iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_ignores_case() {
        let row = Row::new(vec![
            ("ID".to_string(), Value::Integer(4)),
            ("name".to_string(), Value::Text("Oats".to_string())),
        ]);
        assert_eq!(row.get("id"), Some(&Value::Integer(4)));
        assert_eq!(row.get("NAME"), Some(&Value::Text("Oats".to_string())));
        assert_eq!(row.get("unit"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_take() {
        let mut row = Row::new(vec![("unit".to_string(), Value::Text("cup".to_string()))]);
        assert_eq!(row.take("UNIT"), Some(Value::Text("cup".to_string())));
        assert_eq!(row.get("unit"), Some(&Value::Null));
        assert_eq!(row.take("missing"), None);
    }

    #[test]
    fn test_flatten_groups_in_order() {
        let set = [Value::Text("grains".to_string()), Value::Null];
        let keys = [Value::Integer(7)];
        let flat: Vec<_> = flatten(&[&set[..], &keys[..]]).cloned().collect();
        assert_eq!(
            flat,
            vec![
                Value::Text("grains".to_string()),
                Value::Null,
                Value::Integer(7)
            ]
        );
    }
}
