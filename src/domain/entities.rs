//! Domain entities: core data structures

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::script::{Literal, Script};
use crate::domain::shard::{KeyOrder, ShardEntry, ShardIndex};

static HREF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s#/?:][^\s#?:]*(?:\?[^\s#]*)?(?:#[^\s#]+)?$").unwrap());

static SCRIPT_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Relative page URL, optionally followed by `#anchor`.
///
/// The anchor is an opaque generator-assigned token and is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Href(String);

impl Href {
    /// Accepts relative URLs only: no scheme, no leading `/`, no whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        HREF_PATTERN.is_match(s).then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Page part, without the fragment.
    pub fn page(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(page, _)| page)
    }

    pub fn fragment(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, fragment)| fragment)
    }

    /// Same URL with the fragment dropped; `None` when there is no fragment.
    pub fn without_fragment(&self) -> Option<Self> {
        self.fragment().map(|_| Self(self.page().to_string()))
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Href {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Href::parse(&value).ok_or_else(|| format!("not a relative URL: {value:?}"))
    }
}

impl From<Href> for String {
    fn from(href: Href) -> Self {
        href.0
    }
}

/// Child list of a navigation node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Children {
    /// No children (`null` in the script).
    #[default]
    Leaf,
    /// Inline children, in authoring order.
    Nodes(Vec<NavNode>),
    /// Children stored in the sibling script `<name>.js`, declared as `var <name>`.
    Deferred(String),
}

/// Entry of the navigation tree: label, target and children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub label: String,
    pub href: Href,
    #[serde(default)]
    pub children: Children,
}

impl NavNode {
    pub fn leaf(label: impl Into<String>, href: Href) -> Self {
        Self {
            label: label.into(),
            href,
            children: Children::Leaf,
        }
    }

    pub fn with_children(label: impl Into<String>, href: Href, children: Vec<NavNode>) -> Self {
        Self {
            label: label.into(),
            href,
            children: Children::Nodes(children),
        }
    }

    pub fn deferred(label: impl Into<String>, href: Href, script: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href,
            children: Children::Deferred(script.into()),
        }
    }

    /// Inline children; empty for leaves and deferred lists.
    pub fn child_nodes(&self) -> &[NavNode] {
        match &self.children {
            Children::Nodes(nodes) => nodes,
            Children::Leaf | Children::Deferred(_) => &[],
        }
    }

    pub fn deferred_script(&self) -> Option<&str> {
        match &self.children {
            Children::Deferred(name) => Some(name),
            _ => None,
        }
    }

    /// Depth-first pre-order traversal of this node and its inline descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn count(&self) -> usize {
        self.walk().count()
    }

    /// Number of levels, counting this node as 1.
    pub fn depth(&self) -> usize {
        1 + self
            .child_nodes()
            .iter()
            .map(NavNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Check label and deferred script name of this node and every descendant.
    /// Hrefs are valid by construction.
    pub fn validate(&self, location: &str) -> DomainResult<()> {
        if self.label.is_empty() {
            return Err(DomainError::malformed(location, "label is empty"));
        }
        match &self.children {
            Children::Leaf => Ok(()),
            Children::Deferred(name) => validate_script_name(name, location),
            Children::Nodes(nodes) => nodes
                .iter()
                .enumerate()
                .try_for_each(|(i, child)| child.validate(&format!("{location}[2][{i}]"))),
        }
    }

    /// Convert a `[ "label", "href", children ]` literal.
    pub fn from_literal(literal: &Literal, location: &str) -> DomainResult<Self> {
        let parts = literal.as_array().ok_or_else(|| {
            DomainError::malformed(location, format!("expected array, found {}", literal.kind()))
        })?;
        if !(2..=3).contains(&parts.len()) {
            return Err(DomainError::malformed(
                location,
                format!("expected 2 or 3 elements, found {}", parts.len()),
            ));
        }

        let label = match &parts[0] {
            Literal::Str(s) if !s.is_empty() => s.clone(),
            Literal::Str(_) => return Err(DomainError::malformed(location, "label is empty")),
            other => {
                return Err(DomainError::malformed(
                    location,
                    format!("label must be a string, found {}", other.kind()),
                ))
            }
        };

        let href = match &parts[1] {
            Literal::Str(s) => Href::parse(s).ok_or_else(|| {
                DomainError::malformed(location, format!("invalid href {s:?}"))
            })?,
            other => {
                return Err(DomainError::malformed(
                    location,
                    format!("href must be a string, found {}", other.kind()),
                ))
            }
        };

        let children = match parts.get(2) {
            None | Some(Literal::Null) => Children::Leaf,
            Some(Literal::Str(name)) => {
                validate_script_name(name, location)?;
                Children::Deferred(name.clone())
            }
            Some(list @ Literal::Array(_)) => {
                Children::Nodes(Self::list_from_literal(list, &format!("{location}[2]"))?)
            }
            Some(other) => {
                return Err(DomainError::malformed(
                    location,
                    format!("children must be null, a script name or an array, found {}", other.kind()),
                ))
            }
        };

        Ok(Self {
            label,
            href,
            children,
        })
    }

    /// Convert an array literal of node tuples.
    pub fn list_from_literal(literal: &Literal, location: &str) -> DomainResult<Vec<Self>> {
        let items = literal.as_array().ok_or_else(|| {
            DomainError::malformed(location, format!("expected array, found {}", literal.kind()))
        })?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| Self::from_literal(item, &format!("{location}[{i}]")))
            .collect()
    }
}

fn validate_script_name(name: &str, location: &str) -> DomainResult<()> {
    if SCRIPT_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(DomainError::malformed(
            location,
            format!("invalid child script name {name:?}"),
        ))
    }
}

/// Pre-order iterator over a node and its inline descendants.
pub struct Walk<'a> {
    stack: Vec<&'a NavNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a NavNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse push keeps authoring order on pop
        self.stack.extend(node.child_nodes().iter().rev());
        Some(node)
    }
}

/// Variable names used in the generated scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNames {
    pub tree: String,
    pub index: String,
    pub sync_on: String,
    pub sync_off: String,
}

impl Default for ScriptNames {
    fn default() -> Self {
        Self {
            tree: "NAVTREE".into(),
            index: "NAVTREEINDEX".into(),
            sync_on: "SYNCONMSG".into(),
            sync_off: "SYNCOFFMSG".into(),
        }
    }
}

/// Contents of a `navtreedata.js` file: the navigation tree and the shard index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavData {
    /// Top-level entries; the generator emits exactly one root.
    pub tree: Vec<NavNode>,
    pub index: ShardIndex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_on_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_off_message: Option<String>,
}

impl NavData {
    /// Validate every node and wrap the tables.
    pub fn new(tree: Vec<NavNode>, index: ShardIndex, names: &ScriptNames) -> DomainResult<Self> {
        for (i, node) in tree.iter().enumerate() {
            node.validate(&format!("{}[{i}]", names.tree))?;
        }
        Ok(Self {
            tree,
            index,
            sync_on_message: None,
            sync_off_message: None,
        })
    }

    /// Parse and validate a `navtreedata.js` source.
    pub fn parse(src: &str, names: &ScriptNames, order: KeyOrder) -> DomainResult<Self> {
        let script = Script::parse(src)?;
        Self::from_script(&script, names, order)
    }

    pub fn from_script(script: &Script, names: &ScriptNames, order: KeyOrder) -> DomainResult<Self> {
        let tree_literal = script
            .get(&names.tree)
            .ok_or_else(|| DomainError::MissingDeclaration(names.tree.clone()))?;
        let tree = NavNode::list_from_literal(tree_literal, &names.tree)?;

        let index = match script.get(&names.index) {
            Some(literal) => {
                let items = literal.as_array().ok_or_else(|| {
                    DomainError::malformed(
                        &names.index,
                        format!("expected array, found {}", literal.kind()),
                    )
                })?;
                let entries = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let location = format!("{}[{i}]", names.index);
                        let s = item.as_str().ok_or_else(|| {
                            DomainError::malformed(
                                &location,
                                format!("expected string, found {}", item.kind()),
                            )
                        })?;
                        Href::parse(s).map(ShardEntry::new).ok_or_else(|| {
                            DomainError::malformed(&location, format!("invalid href {s:?}"))
                        })
                    })
                    .collect::<DomainResult<Vec<_>>>()?;
                ShardIndex::declared(entries, order, &names.index)?
            }
            None => ShardIndex::empty(order),
        };

        Ok(Self {
            tree,
            index,
            sync_on_message: optional_string(script, &names.sync_on)?,
            sync_off_message: optional_string(script, &names.sync_off)?,
        })
    }

    /// Pre-order traversal over every top-level entry.
    pub fn walk(&self) -> impl Iterator<Item = &NavNode> {
        self.tree.iter().flat_map(NavNode::walk)
    }

    pub fn node_count(&self) -> usize {
        self.walk().count()
    }

    pub fn deferred_count(&self) -> usize {
        self.walk().filter(|n| n.deferred_script().is_some()).count()
    }
}

fn optional_string(script: &Script, name: &str) -> DomainResult<Option<String>> {
    match script.get(name) {
        None => Ok(None),
        Some(Literal::Str(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DomainError::malformed(
            name,
            format!("expected string, found {}", other.kind()),
        )),
    }
}
