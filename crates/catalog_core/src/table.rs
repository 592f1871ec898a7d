use scraper::{ElementRef, Html, Selector};

use crate::RowIdentity;

/// Attribute carrying a row's stable identifier, when the table renders one.
pub const ROW_ID_ATTRIBUTE: &str = "data-row-id";

/// A row as it was rendered at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    pub stable_id: Option<String>,
    pub cells: Vec<String>,
}

impl RenderedRow {
    /// Full rendered text, cells separated by tabs like `innerText` of a table row.
    pub fn rendered_text(&self) -> String {
        self.cells.join("\t")
    }

    pub fn identity(&self) -> RowIdentity {
        RowIdentity::new(self.stable_id.as_deref(), &self.rendered_text())
    }
}

/// CSS selectors for the parts of the table a snapshot reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelectors {
    pub header_cell: String,
    pub data_row: String,
    /// Matched inside each data row.
    pub data_cell: String,
}

impl Default for TableSelectors {
    fn default() -> Self {
        Self {
            header_cell: "thead th".to_string(),
            data_row: "tbody tr".to_string(),
            data_cell: "td".to_string(),
        }
    }
}

/// Point-in-time view of the table: header names and body rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableSnapshot {
    pub headers: Vec<String>,
    pub rows: Vec<RenderedRow>,
}

/// Parse the table's `outerHTML` into a snapshot.
///
/// Reading the whole table in one evaluation keeps headers and rows consistent
/// with each other even while the page keeps re-rendering. A selector that does
/// not parse matches nothing.
pub fn parse_table_html(html: &str, selectors: &TableSelectors) -> TableSnapshot {
    let fragment = Html::parse_fragment(html);
    let header_sel = Selector::parse(&selectors.header_cell).ok();
    let row_sel = Selector::parse(&selectors.data_row).ok();
    let cell_sel = Selector::parse(&selectors.data_cell).ok();

    let headers = header_sel
        .as_ref()
        .map(|sel| fragment.select(sel).map(element_text).collect())
        .unwrap_or_default();

    let rows = match (row_sel.as_ref(), cell_sel.as_ref()) {
        (Some(row_sel), Some(cell_sel)) => fragment
            .select(row_sel)
            .map(|row| RenderedRow {
                stable_id: row.value().attr(ROW_ID_ATTRIBUTE).map(str::to_string),
                cells: row.select(cell_sel).map(element_text).collect(),
            })
            .collect(),
        _ => Vec::new(),
    };

    TableSnapshot { headers, rows }
}

/// Visible text with runs of whitespace collapsed, trimmed.
fn element_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
