//! Styled terminal output for CLI commands.
//!
//! Everything goes to stderr; stdout is reserved for the instruction trace
//! and guest output.

use console::style;

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", style("→").cyan(), message);
}

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Print a header/section title.
pub fn header(message: &str) {
    eprintln!("\n{}", style(message).bold());
}

/// Print a path output (like "-> /path/to/file").
pub fn path_output(path: &std::path::Path) {
    eprintln!("  {} {}", style("→").dim(), style(path.display()).dim());
}

// ============================================================================
// Table output (for run statistics)
// ============================================================================

/// Column alignment.
#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// A builder for markdown-style tables.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl Table {
    pub fn new(headers: Vec<&str>) -> Self {
        let count = headers.len();
        Self {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            alignments: vec![Alignment::Left; count],
        }
    }

    pub fn with_alignments(mut self, alignments: Vec<Alignment>) -> Self {
        self.alignments = alignments;
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.len());
                }
            }
        }

        let mut output = String::new();

        output.push('|');
        for (header, &w) in self.headers.iter().zip(&widths) {
            output.push_str(&format!(" {header:^w$} |"));
        }
        output.push('\n');

        output.push('|');
        for (i, &width) in widths.iter().enumerate() {
            let sep = match self.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => format!(":{:-<w$}|", "", w = width + 1),
                Alignment::Right => format!("{:-<w$}:|", "", w = width + 1),
            };
            output.push_str(&sep);
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, cell) in row.iter().enumerate() {
                let w = widths.get(i).copied().unwrap_or(0);
                let formatted = match self.alignments.get(i).copied().unwrap_or_default() {
                    Alignment::Left => format!(" {cell:<w$} |"),
                    Alignment::Right => format!(" {cell:>w$} |"),
                };
                output.push_str(&formatted);
            }
            output.push('\n');
        }

        output
    }

    /// Print the table to stderr.
    pub fn print(&self) {
        eprint!("{}", self.render());
    }
}
