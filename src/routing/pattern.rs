use crate::error::{MantleError, Result};
use crate::routing::RouteParams;
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// A route path compiled into an anchored regular expression.
///
/// Each `{name}` becomes a named group matching one or more non-`/`
/// characters; everything else matches literally.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
    names: Vec<String>,
}

impl RoutePattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut expression = String::with_capacity(pattern.len() + 16);
        let mut names = Vec::new();
        let mut last = 0;

        expression.push('^');
        for captures in PLACEHOLDER.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if names.iter().any(|existing| existing == name.as_str()) {
                return Err(MantleError::InvalidRoute {
                    pattern: pattern.to_string(),
                    reason: format!("placeholder '{}' appears twice", name.as_str()),
                });
            }
            expression.push_str(&regex::escape(&pattern[last..whole.start()]));
            expression.push_str(&format!("(?P<{}>[^/]+)", name.as_str()));
            names.push(name.as_str().to_string());
            last = whole.end();
        }
        expression.push_str(&regex::escape(&pattern[last..]));
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|err| MantleError::InvalidRoute {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            names,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match the full `path`, returning the captured parameters.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let captures = self.regex.captures(path)?;
        let entries = self
            .names
            .iter()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|value| (name.clone(), value.as_str().to_string()))
            })
            .collect();
        Some(RouteParams::from_pairs(entries))
    }
}
