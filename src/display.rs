use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::client::Page;
use crate::export::TableRows;
use crate::refresh::Indicator;

/// Terminal counterpart of the page's live badge
///
/// The flag is shared with whoever draws the screen; `show`/`hide` only flip
/// it and announce the change.
#[derive(Debug, Clone, Default)]
pub struct LiveBadge {
    visible: Arc<AtomicBool>,
}

impl LiveBadge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn render(&self) -> String {
        if self.is_visible() {
            format!("{}", "● LIVE".green().bold())
        } else {
            format!("{}", "❚❚ PAUSED".dark_grey())
        }
    }
}

impl Indicator for LiveBadge {
    fn show(&mut self) {
        if !self.visible.swap(true, Ordering::SeqCst) {
            println!("{}", self.render());
        }
    }

    fn hide(&mut self) {
        if self.visible.swap(false, Ordering::SeqCst) {
            println!("{}", self.render());
        }
    }
}

/// Build a terminal table from extracted rows, first row as header
pub fn build_table(rows: &TableRows) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut rows = rows.iter();
    if let Some(header) = rows.next() {
        table.set_header(
            header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    }
    for row in rows {
        table.add_row(row.clone());
    }
    table
}

pub fn display_rows(page: Page, rows: &TableRows, badge: &LiveBadge) {
    let fetched_at = chrono::Local::now().format("%H:%M:%S");
    println!(
        "{} {} {}",
        page.title().blue().bold(),
        badge.render(),
        format!("(updated {})", fetched_at).dark_grey()
    );

    if rows.is_empty() {
        println!("{}", "No table found on this page.".yellow());
        return;
    }

    println!("{}", build_table(rows));
    let data_rows = rows.len().saturating_sub(1);
    println!("{}", format!("{} rows", data_rows).green());
}

/// Clear the terminal before a redraw
pub fn clear_screen() {
    print!("{esc}[2J{esc}[1;1H", esc = 27 as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table_uses_first_row_as_header() {
        let rows = vec![
            vec!["Nama".to_string(), "NIM".to_string()],
            vec!["Ann".to_string(), "123".to_string()],
        ];
        let rendered = build_table(&rows).to_string();
        assert!(rendered.contains("Nama"));
        assert!(rendered.contains("123"));
    }

    #[test]
    fn test_badge_visibility_is_shared() {
        let badge = LiveBadge::new();
        let mut handle = badge.clone();
        handle.show();
        assert!(badge.is_visible());
        handle.hide();
        assert!(!badge.is_visible());
    }
}
