use std::fmt;

use catalog_core::TableSelectors;

/// CSS selector with an optional visible-text filter.
///
/// With a text filter, only elements whose `innerText` contains the text match,
/// and of nested matches only the innermost is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    /// Semantic name used in logs and errors.
    pub role: &'static str,
    pub css: &'static str,
    pub text: Option<&'static str>,
}

impl Locator {
    pub const fn css(role: &'static str, css: &'static str) -> Self {
        Self {
            role,
            css,
            text: None,
        }
    }

    pub const fn with_text(role: &'static str, css: &'static str, text: &'static str) -> Self {
        Self {
            role,
            css,
            text: Some(text),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text {
            Some(text) => write!(f, "{} ({} containing {:?})", self.role, self.css, text),
            None => write!(f, "{} ({})", self.role, self.css),
        }
    }
}

/// Every selector the harvester uses, by semantic role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorTable {
    pub login_email: Locator,
    pub login_password: Locator,
    pub login_submit: Locator,
    pub launch_action: Locator,
    pub access_denied: Locator,
    pub alerts: Locator,
    pub dashboard_landmark: Locator,
    pub menu_dashboard: Locator,
    pub menu_inventory: Locator,
    pub menu_products: Locator,
    pub menu_full_catalog: Locator,
    pub table_root: Locator,
    pub header_cell: Locator,
    pub data_row: Locator,
    /// Matched inside each data row.
    pub data_cell: Locator,
    pub total_label: Locator,
    pub next_page: Locator,
    pub loading_indicator: Locator,
    /// Scroll container candidates in preference order; the page's scrolling
    /// root is the fallback when none exists.
    pub scroll_candidates: Vec<&'static str>,
}

impl LocatorTable {
    /// Menu clicks from the dashboard to the catalog table, in order.
    pub fn catalog_path(&self) -> [Locator; 4] {
        [
            self.menu_dashboard,
            self.menu_inventory,
            self.menu_products,
            self.menu_full_catalog,
        ]
    }

    /// Selectors the table snapshot is parsed with.
    pub fn table_selectors(&self) -> TableSelectors {
        TableSelectors {
            header_cell: self.header_cell.css.to_string(),
            data_row: self.data_row.css.to_string(),
            data_cell: self.data_cell.css.to_string(),
        }
    }
}

impl Default for LocatorTable {
    fn default() -> Self {
        Self {
            login_email: Locator::css("login email", "input#email"),
            login_password: Locator::css("login password", "input[type=\"password\"]"),
            login_submit: Locator::css("login submit", "button[type=\"submit\"]"),
            launch_action: Locator::with_text("launch action", "button, a", "Launch Challenge"),
            access_denied: Locator::with_text("access denied", "body *", "Access denied"),
            alerts: Locator::css("alerts", "[role='alert']"),
            dashboard_landmark: Locator::with_text("dashboard landmark", "body *", "Dashboard"),
            menu_dashboard: Locator::with_text("Dashboard", "button", "Dashboard"),
            menu_inventory: Locator::with_text("Inventory", "h3.font-medium", "Inventory"),
            menu_products: Locator::with_text("Products", "h3.font-medium", "Products"),
            menu_full_catalog: Locator::with_text("Full Catalog", "h3", "Full Catalog"),
            table_root: Locator::css("table root", "table"),
            header_cell: Locator::css("header cell", "table thead th"),
            data_row: Locator::css("data row", "table tbody tr"),
            data_cell: Locator::css("data cell", "td"),
            total_label: Locator::with_text(
                "total label",
                "div.text-sm.text-muted-foreground",
                "Showing",
            ),
            next_page: Locator::with_text("next page", "button", "Next"),
            loading_indicator: Locator::css("loading indicator", "div[role='progressbar']"),
            scroll_candidates: vec!["div[role=\"grid\"]", "table"],
        }
    }
}
