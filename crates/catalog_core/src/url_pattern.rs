use url::Url;

/// Glob over absolute URLs: `**` matches any run of characters, `*` any run
/// without `/`. The fragment is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPattern {
    glob: String,
}

impl UrlPattern {
    pub fn new(glob: impl Into<String>) -> Self {
        Self { glob: glob.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let normalized = match Url::parse(candidate) {
            Ok(mut url) => {
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => candidate.to_string(),
        };
        glob_match(self.glob.as_bytes(), normalized.as_bytes())
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.glob)
    }
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match pattern {
        [] => text.is_empty(),
        [b'*', b'*', rest @ ..] => (0..=text.len()).any(|i| glob_match(rest, &text[i..])),
        [b'*', rest @ ..] => {
            let limit = text.iter().position(|&c| c == b'/').unwrap_or(text.len());
            (0..=limit).any(|i| glob_match(rest, &text[i..]))
        }
        [p, rest @ ..] => match text {
            [t, text_rest @ ..] if t == p => glob_match(rest, text_rest),
            _ => false,
        },
    }
}
