use std::collections::HashMap;
use std::io::Write;

use tracing::warn;

use crate::page::Page;

/// Page rendered as lines of text: each image reload and label change is
/// written to `out` as it happens.
pub struct TerminalPage<W: Write> {
    out: W,
    fields: HashMap<String, String>,
}

impl<W: Write> TerminalPage<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            fields: HashMap::new(),
        }
    }

    /// Stand-in for typing into a form field.
    pub fn type_into(&mut self, field: &str, value: &str) {
        self.fields.insert(field.to_string(), value.to_string());
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TerminalPage<W> {
    fn emit(&mut self, label: &str, value: &str) {
        let written = writeln!(self.out, "{label:<6} {value}").and_then(|()| self.out.flush());
        if let Err(err) = written {
            warn!(label, value, error = %err, "page update not written");
        }
    }
}

impl<W: Write> Page for TerminalPage<W> {
    fn set_image_source(&mut self, src: &str) {
        self.emit("image", src);
    }

    fn set_display_text(&mut self, text: &str) {
        self.emit("smiles", text);
    }

    fn form_value(&self, field: &str) -> Option<String> {
        self.fields.get(field).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn writes_one_line_per_update() {
        let mut page = TerminalPage::new(Vec::new());
        page.set_image_source("content.png?42");
        page.set_display_text("CCO");
        let out = String::from_utf8(page.into_inner()).unwrap();
        assert_eq!(out, "image  content.png?42\nsmiles CCO\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn write_failures_do_not_lose_form_state() {
        let mut page = TerminalPage::new(BrokenPipe);
        page.type_into("symbol_text", "O");
        page.set_image_source("content.png?1");
        page.set_display_text("O");
        assert_eq!(page.form_value("symbol_text").as_deref(), Some("O"));
    }

    #[test]
    fn typed_values_are_readable() {
        let mut page = TerminalPage::new(Vec::new());
        page.type_into("symbol_text", "Cl");
        assert_eq!(page.form_value("symbol_text").as_deref(), Some("Cl"));
        assert_eq!(page.form_value("other"), None);
    }
}
