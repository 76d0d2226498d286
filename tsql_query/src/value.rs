use serde::Serialize;

/// A scalar bound as a statement parameter.
///
/// Filter values never reach the SQL text; they are rendered as `@pN`
/// placeholders and carried next to the text in a [crate::Statement].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// The T-SQL type used when the parameter is declared in a script.
    pub fn sql_type(&self) -> &'static str {
        match self {
            SqlValue::Null => "NVARCHAR(MAX)",
            SqlValue::Bool(_) => "BIT",
            SqlValue::Int(_) => "BIGINT",
            SqlValue::Float(_) => "FLOAT",
            SqlValue::Text(_) => "NVARCHAR(MAX)",
        }
    }

    /// Literal form, only used for diagnostic scripts.
    pub fn to_literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(b) => (if *b { "1" } else { "0" }).to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => format!("N'{}'", s.replace('\'', "''")),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

macro_rules! int_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::Int(i64::from(value))
                }
            }
        )*
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        SqlValue::Float(f64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        SqlValue::Text(value.clone())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => SqlValue::Null,
        }
    }
}
