//! Pipe table analysis.
//!
//! Rows are split on `|`, the delimiter row (cells made only of `:` and `-`)
//! is removed and turned into per-column alignments, and every row is padded
//! to the same column count.

use std::sync::LazyLock;

use regex::Regex;

static DELIMITER_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("invalid delimiter cell regex"));

/// Horizontal alignment of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    /// Alignment encoded by a delimiter cell such as `:---:`.
    #[must_use]
    pub fn from_delimiter(cell: &str) -> Self {
        let cell = cell.trim();
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) if cell.len() > 1 => Self::Center,
            (false, true) => Self::Right,
            _ => Self::Left,
        }
    }
}

/// Rows, alignments and header flag of a parsed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub rows: Vec<Vec<String>>,
    pub alignments: Vec<Alignment>,
    pub has_header: bool,
}

impl TableLayout {
    /// Analyze the raw lines of a pipe table.
    #[must_use]
    pub fn analyze<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut rows = Vec::with_capacity(lines.len());
        let mut alignments = None;

        for line in lines {
            let cells = split_row(line.as_ref());
            if alignments.is_none() && is_delimiter_row(&cells) {
                alignments = Some(cells.iter().map(|c| Alignment::from_delimiter(c)).collect());
                continue;
            }
            rows.push(cells);
        }

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, String::new());
        }

        let has_header = alignments.is_some();
        let mut alignments: Vec<Alignment> = alignments.unwrap_or_default();
        alignments.resize(columns, Alignment::Left);

        Self {
            rows,
            alignments,
            has_header,
        }
    }

    /// Number of columns after padding.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.alignments.len()
    }
}

/// Split a table line into trimmed cells.
///
/// One leading and one trailing pipe are optional.
#[must_use]
pub fn split_row(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(|cell| cell.trim().to_owned()).collect()
}

/// Whether every cell of a row is a delimiter cell.
#[must_use]
pub fn is_delimiter_row<S: AsRef<str>>(cells: &[S]) -> bool {
    !cells.is_empty() && cells.iter().all(|c| DELIMITER_CELL.is_match(c.as_ref().trim()))
}

/// Column alignments derived from a delimiter row.
///
/// Returns `None` when the line is not a delimiter row.
#[must_use]
pub fn parse_alignment_row(line: &str) -> Option<Vec<Alignment>> {
    let cells = split_row(line);
    is_delimiter_row(&cells).then(|| cells.iter().map(|c| Alignment::from_delimiter(c)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alignment_row() {
        assert_eq!(
            parse_alignment_row("|:---|---:|:---:|"),
            Some(vec![Alignment::Left, Alignment::Right, Alignment::Center])
        );
        assert_eq!(
            parse_alignment_row("| --- | --- |"),
            Some(vec![Alignment::Left, Alignment::Left])
        );
        assert_eq!(parse_alignment_row("| a | b |"), None);
    }

    #[test]
    fn test_split_row_optional_outer_pipes() {
        assert_eq!(split_row("| a | b |"), vec!["a", "b"]);
        assert_eq!(split_row("a | b"), vec!["a", "b"]);
        assert_eq!(split_row("| a |  |"), vec!["a", ""]);
    }

    #[test]
    fn test_analyze_with_header() {
        let layout = TableLayout::analyze(&[
            "| Name | Qty | Note |",
            "|:-----|----:|:----:|",
            "| apple | 3 | fresh |",
            "| pear | 10 |",
        ]);

        assert!(layout.has_header);
        assert_eq!(
            layout.alignments,
            vec![Alignment::Left, Alignment::Right, Alignment::Center]
        );
        assert_eq!(layout.rows.len(), 3);
        assert_eq!(layout.rows[2], vec!["pear", "10", ""]);
        assert_eq!(layout.columns(), 3);
    }

    #[test]
    fn test_analyze_without_delimiter_row() {
        let layout = TableLayout::analyze(&["| a | b |", "| c | d | e |"]);

        assert!(!layout.has_header);
        assert_eq!(layout.alignments, vec![Alignment::Left; 3]);
        assert_eq!(layout.rows[0], vec!["a", "b", ""]);
    }

    #[test]
    fn test_alignment_from_delimiter_edge_cases() {
        assert_eq!(Alignment::from_delimiter(":"), Alignment::Left);
        assert_eq!(Alignment::from_delimiter("-:"), Alignment::Right);
        assert_eq!(Alignment::from_delimiter(":-"), Alignment::Left);
    }
}
