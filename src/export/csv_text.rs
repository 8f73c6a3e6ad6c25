use anyhow::Result;
use serde::{Deserialize, Serialize};

/// How cell text is wrapped into a CSV field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    /// Wrap every cell in double quotes exactly as rendered. Embedded quotes
    /// are left alone, which is what the dashboard's export button produces.
    #[default]
    Verbatim,
    /// Wrap every cell in double quotes and double any embedded quote
    Escaped,
}

/// Serialize rows of cell text into CSV
///
/// Cells are joined with `,` and rows with `\n`, without a trailing newline.
/// A row with no cells becomes an empty line; no rows give an empty string.
pub fn rows_to_csv(rows: &[Vec<String>], style: QuoteStyle) -> Result<String> {
    let lines = rows
        .iter()
        .map(|row| row_to_line(row, style))
        .collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

fn row_to_line(row: &[String], style: QuoteStyle) -> Result<String> {
    if row.is_empty() {
        return Ok(String::new());
    }

    match style {
        QuoteStyle::Verbatim => Ok(row
            .iter()
            .map(|cell| format!("\"{}\"", cell))
            .collect::<Vec<_>>()
            .join(",")),
        QuoteStyle::Escaped => {
            let mut wtr = csv::WriterBuilder::new()
                .quote_style(csv::QuoteStyle::Always)
                .double_quote(true)
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(Vec::new());
            wtr.write_record(row)?;
            let mut bytes = wtr.into_inner().map_err(|e| e.into_error())?;
            if bytes.last() == Some(&b'\n') {
                bytes.pop();
            }
            Ok(String::from_utf8(bytes)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_verbatim_scenario() {
        let rows = table(&[&["Name", "Score"], &["Ann", "10"]]);
        let csv = rows_to_csv(&rows, QuoteStyle::Verbatim).unwrap();
        assert_eq!(csv, "\"Name\",\"Score\"\n\"Ann\",\"10\"");
    }

    #[test]
    fn test_no_rows_is_empty() {
        assert_eq!(rows_to_csv(&[], QuoteStyle::Verbatim).unwrap(), "");
        assert_eq!(rows_to_csv(&[], QuoteStyle::Escaped).unwrap(), "");
    }

    #[test]
    fn test_verbatim_keeps_embedded_quotes() {
        let rows = table(&[&["say \"hi\""]]);
        let csv = rows_to_csv(&rows, QuoteStyle::Verbatim).unwrap();
        assert_eq!(csv, "\"say \"hi\"\"");
    }

    #[test]
    fn test_escaped_doubles_quotes() {
        let rows = table(&[&["say \"hi\"", "A,B"]]);
        let csv = rows_to_csv(&rows, QuoteStyle::Escaped).unwrap();
        assert_eq!(csv, "\"say \"\"hi\"\"\",\"A,B\"");
    }

    #[test]
    fn test_empty_row_becomes_blank_line() {
        let rows = vec![vec![], vec!["x".to_string()]];
        assert_eq!(rows_to_csv(&rows, QuoteStyle::Verbatim).unwrap(), "\n\"x\"");
        assert_eq!(rows_to_csv(&rows, QuoteStyle::Escaped).unwrap(), "\n\"x\"");
    }

    #[test]
    fn test_quote_style_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            style: QuoteStyle,
        }
        let parsed: Wrapper = toml::from_str("style = \"escaped\"").unwrap();
        assert_eq!(parsed.style, QuoteStyle::Escaped);
    }
}
