//! Text table output

use std::io::{self, Write};
use tabled::{builder::Builder, settings::Style};

/// Sink for a result table
///
/// Headers are set once, before the first row. `render` writes the buffered
/// table and clears it so the renderer can be reused for the next table.
pub trait TableRenderer {
    fn set_headers(&mut self, headers: Vec<String>);

    fn append_row(&mut self, row: Vec<String>);

    fn render(&mut self, out: &mut dyn Write) -> io::Result<()>;
}

/// ASCII table rendered with `tabled`
#[derive(Debug, Default)]
pub struct TabledRenderer {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabledRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TableRenderer for TabledRenderer {
    fn set_headers(&mut self, headers: Vec<String>) {
        self.headers = headers;
    }

    fn append_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn render(&mut self, out: &mut dyn Write) -> io::Result<()> {
        let mut builder = Builder::default();
        builder.push_record(std::mem::take(&mut self.headers));
        for row in self.rows.drain(..) {
            builder.push_record(row);
        }

        let mut table = builder.build();
        table.with(Style::ascii());
        writeln!(out, "{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headers_and_rows() {
        let mut renderer = TabledRenderer::new();
        renderer.set_headers(vec!["word".into(), "count".into()]);
        renderer.append_row(vec!["hamlet".into(), "42".into()]);

        let mut out = Vec::new();
        renderer.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("word"));
        assert!(text.contains("hamlet"));
        assert!(text.contains("42"));
        assert!(text.lines().next().unwrap().starts_with('+'));
    }

    #[test]
    fn render_clears_buffer() {
        let mut renderer = TabledRenderer::new();
        renderer.set_headers(vec!["a".into()]);
        renderer.append_row(vec!["first".into()]);
        renderer.render(&mut Vec::new()).unwrap();

        renderer.set_headers(vec!["b".into()]);
        renderer.append_row(vec!["second".into()]);
        let mut out = Vec::new();
        renderer.render(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("second"));
        assert!(!text.contains("first"));
    }
}
