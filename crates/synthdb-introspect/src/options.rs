/// Options that control how introspection behaves.
#[derive(Debug, Clone, Default)]
pub struct IntrospectOptions {
    /// Restrict the snapshot to these tables (matched case-insensitively).
    pub tables: Option<Vec<String>>,
    /// Skip tables that have no columns.
    pub skip_empty_tables: bool,
}

impl IntrospectOptions {
    pub fn includes(&self, table: &str) -> bool {
        match &self.tables {
            Some(tables) => tables.iter().any(|name| name.eq_ignore_ascii_case(table)),
            None => true,
        }
    }
}
