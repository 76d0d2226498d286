use std::fmt;
use std::fmt::Write;

use crate::value::SqlValue;

/// Rendered SQL text together with its positional parameters.
///
/// Parameter `n` (1-based) corresponds to the `@pn` placeholder in the text.
#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlValue>,
}

impl Statement {
    pub(crate) fn new(sql: String, params: Vec<SqlValue>) -> Self {
        Self { sql, params }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }

    /// A standalone script declaring every parameter before the statement,
    /// suitable for pasting into a query window.
    pub fn to_script(&self) -> String {
        let mut script = String::new();
        for (index, param) in self.params.iter().enumerate() {
            let _ = writeln!(
                script,
                "DECLARE @p{} {} = {};",
                index + 1,
                param.sql_type(),
                param.to_literal()
            );
        }
        script.push_str(&self.sql);
        script
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
