//! Per-build configuration.
//!
//! `BuildOptions` can be constructed in code or deserialized from a
//! config document (unknown keys are rejected):
//!
//! ```
//! use tsql_query::prelude::*;
//!
//! let options: BuildOptions = serde_json::from_str(
//!     r#"{ "skip": 20, "length": 10, "for_json": { "mode": "path" } }"#,
//! ).unwrap();
//! assert_eq!(options.indentation, "  ");
//! ```

use serde::{Deserialize, Serialize};

/// `FOR JSON` shaping mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonMode {
    Path,
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForJson {
    pub mode: JsonMode,
    #[serde(default)]
    pub include_null_values: bool,
    #[serde(default)]
    pub without_array_wrapper: bool,
}

impl ForJson {
    pub fn path() -> Self {
        Self::new(JsonMode::Path)
    }

    pub fn auto() -> Self {
        Self::new(JsonMode::Auto)
    }

    pub fn new(mode: JsonMode) -> Self {
        Self {
            mode,
            include_null_values: false,
            without_array_wrapper: false,
        }
    }

    pub fn include_null_values(mut self) -> Self {
        self.include_null_values = true;
        self
    }

    pub fn without_array_wrapper(mut self) -> Self {
        self.without_array_wrapper = true;
        self
    }

    pub(crate) fn clause(&self) -> String {
        let mut clause = String::from(match self.mode {
            JsonMode::Path => "FOR JSON PATH",
            JsonMode::Auto => "FOR JSON AUTO",
        });
        if self.include_null_values {
            clause.push_str(", INCLUDE_NULL_VALUES");
        }
        if self.without_array_wrapper {
            clause.push_str(", WITHOUT_ARRAY_WRAPPER");
        }
        clause
    }
}

/// Options for one build pass.
///
/// `skip`, `length` and `for_json` apply to the outermost query only and
/// take precedence over the query's own pagination. Nested queries get
/// their pagination from the column or query they come from, and inherit
/// `indentation`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildOptions {
    pub skip: Option<u64>,
    pub length: Option<u64>,
    pub for_json: Option<ForJson>,
    pub indentation: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            skip: None,
            length: None,
            for_json: None,
            indentation: "  ".to_string(),
        }
    }
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn for_json(mut self, for_json: ForJson) -> Self {
        self.for_json = Some(for_json);
        self
    }

    pub fn indentation(mut self, indentation: impl Into<String>) -> Self {
        self.indentation = indentation.into();
        self
    }

    pub(crate) fn nested(
        &self,
        skip: Option<u64>,
        length: Option<u64>,
        for_json: Option<ForJson>,
    ) -> Self {
        Self {
            skip,
            length,
            for_json,
            indentation: self.indentation.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_clause_joins_flags_with_commas() {
        let clause = ForJson::path()
            .include_null_values()
            .without_array_wrapper()
            .clause();
        assert_eq!(
            clause,
            "FOR JSON PATH, INCLUDE_NULL_VALUES, WITHOUT_ARRAY_WRAPPER"
        );
        assert_eq!(ForJson::auto().clause(), "FOR JSON AUTO");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = serde_json::from_str::<BuildOptions>(r#"{ "offset": 3 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn nested_keeps_indentation_only() {
        let outer = BuildOptions::new().skip(4).length(2).indentation("\t");
        let nested = outer.nested(None, Some(1), None);
        assert_eq!(nested.skip, None);
        assert_eq!(nested.length, Some(1));
        assert_eq!(nested.indentation, "\t");
    }
}
