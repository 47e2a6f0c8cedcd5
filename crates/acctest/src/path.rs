//! Attribute paths into state trees.

use objects::Value;
use serde::{Deserialize, Deserializer};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Key(String),
    Index(usize),
}

/// Path to one node of an attribute tree, e.g. `ipv6.address[0].name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrPath {
    steps: Vec<Step>,
}

impl AttrPath {
    /// Path to a top-level attribute.
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            steps: vec![Step::Key(root.into())],
        }
    }

    /// Descend into an object key.
    #[must_use]
    pub fn at_map_key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(Step::Key(key.into()));
        self
    }

    /// Descend into a list element.
    #[must_use]
    pub fn at_slice_index(mut self, index: usize) -> Self {
        self.steps.push(Step::Index(index));
        self
    }

    /// Parse the dotted form produced by `Display`.
    pub fn parse(text: &str) -> Result<Self, String> {
        let mut steps = Vec::new();
        for segment in text.split('.') {
            let (key, mut rest) = match segment.find('[') {
                Some(pos) => segment.split_at(pos),
                None => (segment, ""),
            };
            if key.is_empty() {
                return Err(format!("invalid attribute path '{text}'"));
            }
            steps.push(Step::Key(key.to_string()));
            while !rest.is_empty() {
                let close = rest
                    .find(']')
                    .ok_or_else(|| format!("unclosed index in '{text}'"))?;
                let index = rest[1..close]
                    .parse()
                    .map_err(|_| format!("invalid index in '{text}'"))?;
                steps.push(Step::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(format!("invalid attribute path '{text}'"));
                }
            }
        }
        Ok(Self { steps })
    }

    /// Follow the path; `None` when a step does not exist.
    pub fn resolve<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.steps.iter().try_fold(root, |node, step| match step {
            Step::Key(key) => node.get(key),
            Step::Index(i) => node.as_list().and_then(|items| items.get(*i)),
        })
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            match step {
                Step::Key(key) if i == 0 => write!(f, "{key}")?,
                Step::Key(key) => write!(f, ".{key}")?,
                Step::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for AttrPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        AttrPath::parse(&text).map_err(serde::de::Error::custom)
    }
}
