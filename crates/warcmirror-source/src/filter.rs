use regex::Regex;

use crate::error::SourceError;

/// Filename filter compiled from a shell-style glob.
///
/// `*` matches any run of characters, `?` matches exactly one; everything
/// else is literal. The whole name must match, so `*.warc.gz` accepts
/// `x.warc.gz` but not `x.warc.gz.idx`.
#[derive(Clone, Debug)]
pub struct GlobFilter {
    regex: Regex,
    pattern: String,
}

impl GlobFilter {
    pub fn new(pattern: &str) -> Result<Self, SourceError> {
        let regex = Regex::new(&glob_to_regex(pattern))?;
        Ok(Self {
            regex,
            pattern: pattern.to_owned(),
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The original glob, used in cache keys.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    out
}
