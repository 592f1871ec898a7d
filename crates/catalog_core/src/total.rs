use std::sync::LazyLock;

use regex::Regex;

/// Target used when the "Showing X of N" label cannot be read or parsed.
pub const DEFAULT_ADVISORY_TOTAL: usize = 100;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// How the advisory total was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalSource {
    /// Integer following "of" in a "Showing X of N" label.
    Structured,
    /// Last integer found anywhere in the label.
    LastInteger,
    /// Nothing parseable; fixed default.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvisoryTotal {
    pub value: usize,
    pub source: TotalSource,
}

/// Parse the advisory total from the table's count label.
///
/// Never fails: an absent or unparseable label yields `default`.
pub fn parse_advisory_total(label: Option<&str>, default: usize) -> AdvisoryTotal {
    let Some(text) = label else {
        return AdvisoryTotal {
            value: default,
            source: TotalSource::Default,
        };
    };

    if let Some(value) = structured_total(text) {
        return AdvisoryTotal {
            value,
            source: TotalSource::Structured,
        };
    }

    match INTEGER
        .find_iter(text)
        .last()
        .and_then(|m| m.as_str().parse::<usize>().ok())
    {
        Some(value) => AdvisoryTotal {
            value,
            source: TotalSource::LastInteger,
        },
        None => AdvisoryTotal {
            value: default,
            source: TotalSource::Default,
        },
    }
}

fn structured_total(text: &str) -> Option<usize> {
    let (_, after) = text.split_once(" of ")?;
    let token = after.split_whitespace().next()?;
    token
        .trim_matches(|c: char| !c.is_ascii_digit())
        .replace(',', "")
        .parse()
        .ok()
}
