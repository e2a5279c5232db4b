/// A rectangular table of string cells with named columns, as handed over by
/// the upload/UI collaborator. Rows are padded or truncated to the header
/// width so downstream code can index cells without bounds anxiety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, mut rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Convenience constructor for literal tables in tests and demos.
    pub fn from_str_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            columns.iter().map(|c| (*c).to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_padded_to_header_width() {
        let table = RawTable::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![vec!["1".to_string()], vec![
                "1".to_string(),
                "2".to_string(),
                "3".to_string(),
                "4".to_string(),
            ]],
        );
        assert!(table.rows().iter().all(|r| r.len() == 3));
    }

    #[test]
    fn test_column_index_is_exact() {
        let table = RawTable::from_str_rows(&["Date", "Clicks"], &[&["2024-01-01", "5"]]);
        assert_eq!(table.column_index("Clicks"), Some(1));
        assert_eq!(table.column_index("clicks"), None);
    }
}
