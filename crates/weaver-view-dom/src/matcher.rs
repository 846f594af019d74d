//! Host element patterns.
//!
//! Used to pick out elements whose content is captured verbatim on the way
//! back, and elements treated as inline objects by the whitespace rules.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use weaver_view::ViewElement;

use crate::error::ConfigError;
use crate::host::HostDom;

/// Declarative element pattern.
///
/// `name` is compared ignoring ASCII case, unless it is written as
/// `/regex/`. Every listed class must be present. Attributes map to `None`
/// when only their presence matters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPattern {
    pub name: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, Option<String>>,
}

impl ElementPattern {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn name_regex(regex: &str) -> Self {
        Self::name(format!("/{regex}/"))
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        self.attributes.insert(key.into(), value.map(str::to_string));
        self
    }
}

#[derive(Debug)]
enum NameMatch {
    Exact(SmolStr),
    Regex(Regex),
}

impl NameMatch {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(expected) => expected.eq_ignore_ascii_case(name),
            NameMatch::Regex(regex) => regex.is_match(name),
        }
    }
}

#[derive(Debug)]
struct CompiledPattern {
    name: Option<NameMatch>,
    classes: Vec<String>,
    attributes: Vec<(String, Option<String>)>,
}

/// A set of compiled patterns. An element matches when any pattern does.
#[derive(Debug)]
pub struct Matcher {
    field: &'static str,
    patterns: Vec<CompiledPattern>,
}

impl Matcher {
    /// `field` names the configuration entry patterns come from, for errors.
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            patterns: Vec::new(),
        }
    }

    pub fn add(&mut self, pattern: &ElementPattern) -> Result<(), ConfigError> {
        let name = match pattern.name.as_deref() {
            None => None,
            Some(name) if name.len() >= 2 && name.starts_with('/') && name.ends_with('/') => {
                let source = &name[1..name.len() - 1];
                let regex = Regex::new(source).map_err(|source_err| ConfigError::Pattern {
                    field: self.field,
                    pattern: name.to_string(),
                    source: source_err,
                })?;
                Some(NameMatch::Regex(regex))
            }
            Some(name) => Some(NameMatch::Exact(SmolStr::new(name))),
        };
        self.patterns.push(CompiledPattern {
            name,
            classes: pattern.classes.clone(),
            attributes: pattern
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether the host element matches any pattern. Non-elements never match.
    pub fn matches<H: HostDom>(&self, dom: &H, node: &H::Node) -> bool {
        dom.is_element(node)
            && self.matches_parts(&dom.node_name(node), |key| dom.attribute(node, key))
    }

    /// Whether the view element matches any pattern.
    pub fn matches_view(&self, element: &ViewElement) -> bool {
        self.matches_parts(element.name(), |key| element.attribute(key))
    }

    fn matches_parts(&self, name: &str, attribute: impl Fn(&str) -> Option<String>) -> bool {
        let classes = attribute("class").unwrap_or_default();

        self.patterns.iter().any(|pattern| {
            pattern.name.as_ref().is_none_or(|m| m.matches(name))
                && pattern
                    .classes
                    .iter()
                    .all(|class| classes.split_whitespace().any(|c| c == class))
                && pattern
                    .attributes
                    .iter()
                    .all(|(key, expected)| match (attribute(key), expected) {
                        (Some(_), None) => true,
                        (Some(actual), Some(expected)) => actual == *expected,
                        (None, _) => false,
                    })
        })
    }
}
