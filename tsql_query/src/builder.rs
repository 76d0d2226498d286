/// Stand-in for one indentation unit while a statement is being rendered.
///
/// Every unit is substituted with [crate::BuildOptions::indentation] once
/// the whole statement is built, so nested text can be produced before the
/// final indentation string matters.
pub const INDENT_PLACEHOLDER: char = '\u{1f}';

/// Text buffer for one build pass.
#[derive(Default)]
pub(crate) struct SqlWriter {
    buf: String,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    pub fn push(&mut self, str: &str) {
        self.buf.push_str(str);
    }

    pub fn indent(&mut self, level: usize) {
        self.buf
            .extend(std::iter::repeat(INDENT_PLACEHOLDER).take(level));
    }

    pub fn newline(&mut self) {
        self.buf.push('\n');
    }

    /// One full line at `level`.
    pub fn line(&mut self, level: usize, str: &str) {
        self.indent(level);
        self.push(str);
        self.newline();
    }

    /// Text with placeholders intact, for embedding into another writer.
    pub fn into_raw(self) -> String {
        self.buf
    }

    pub fn finish(self, indentation: &str) -> String {
        let sql = self.buf.replace(INDENT_PLACEHOLDER, indentation);
        sql.trim_end().to_string()
    }
}

/// `[name]`, with `]` doubled.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

/// `'text'`, with `'` doubled.
pub(crate) fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
