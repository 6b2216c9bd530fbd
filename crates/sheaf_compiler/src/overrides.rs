//! Variable overrides for Sass sources.
//!
//! Sass evaluates variables eagerly, so simply appending `$name: value;` after
//! the sources would only affect rules that come later. To make an override
//! win everywhere, as if applied after all sources were parsed, the entry
//! stylesheet declares every override first and each declaration of an
//! overridden variable in the sources is rewritten to `!default`, which keeps
//! the already-assigned override.
//!
//! A declaration is recognized when it starts a line (indentation allowed) or
//! follows a `;`, `{` or `}`. Declarations inside blocks are rewritten too,
//! so the override also beats block-local values.

use std::borrow::Cow;
use std::collections::BTreeMap;

use regex::Regex;

/// A compiled set of variable overrides.
#[derive(Debug)]
pub struct OverrideSet {
    entries: Vec<(String, String)>,
    declaration: Option<Regex>,
}

impl OverrideSet {
    /// Builds the set from `name -> value` pairs.
    ///
    /// Names may carry a `$` or `@` sigil; it is dropped.
    pub fn new(overrides: &BTreeMap<String, String>) -> Result<Self, regex::Error> {
        let entries: Vec<(String, String)> = overrides
            .iter()
            .map(|(name, value)| (bare_name(name).to_string(), value.trim().to_string()))
            .filter(|(name, _)| !name.is_empty())
            .collect();

        let declaration = if entries.is_empty() {
            None
        } else {
            let names: Vec<String> = entries.iter().map(|(name, _)| name_pattern(name)).collect();
            let pattern = format!(
                r#"(?m)(?:^|[;{{}}])[ \t]*(?P<decl>\$(?P<name>{})[ \t]*:(?P<value>(?:[^;"']|"[^"]*"|'[^']*')*?)(?:[ \t]*!(?:default|global))*[ \t]*);"#,
                names.join("|")
            );
            Some(Regex::new(&pattern)?)
        };

        Ok(Self {
            entries,
            declaration,
        })
    }

    /// Returns `true` when there is nothing to override.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declarations placed at the top of the entry stylesheet.
    pub fn prelude(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("${name}: {value};\n"))
            .collect()
    }

    /// Turns declarations of overridden variables into `!default` ones.
    pub fn rewrite<'a>(&self, source: &'a str) -> Cow<'a, str> {
        let Some(regex) = &self.declaration else {
            return Cow::Borrowed(source);
        };

        let mut out = String::new();
        let mut copied = 0;
        let mut at = 0;
        while let Some(caps) = regex.captures_at(source, at) {
            let (Some(decl), Some(name), Some(value)) =
                (caps.name("decl"), caps.name("name"), caps.name("value"))
            else {
                break;
            };
            out.push_str(&source[copied..decl.start()]);
            out.push_str(&format!("${}:{} !default", name.as_str(), value.as_str()));
            // The terminating `;` stays in the source so it can lead the next match.
            copied = decl.end();
            at = decl.end();
        }

        if copied == 0 {
            Cow::Borrowed(source)
        } else {
            out.push_str(&source[copied..]);
            Cow::Owned(out)
        }
    }
}

/// Drops a leading `$` or `@` sigil.
pub fn bare_name(name: &str) -> &str {
    name.trim().trim_start_matches(['$', '@'])
}

/// Sass treats `-` and `_` in identifiers as the same character.
fn name_pattern(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '_' => "[-_]".to_string(),
            other => regex::escape(&other.to_string()),
        })
        .collect()
}
