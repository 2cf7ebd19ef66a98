//! Alphabetical shard index and shard pages.
//!
//! The index is a sparse sorted list of boundary hrefs: entry `i` is the first
//! href stored in shard page `i` (`navtreeindex<i>.js`). A query is routed to
//! the last boundary that sorts at or before it.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, trace};

use crate::domain::entities::Href;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::script::Literal;

/// Normalisation applied to keys before comparing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyOrder {
    /// Plain byte-wise string comparison, as the generator sorts.
    #[default]
    Bytewise,
    /// ASCII case-folded comparison.
    CaseInsensitive,
}

impl KeyOrder {
    pub fn normalize<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match self {
            KeyOrder::Bytewise => Cow::Borrowed(key),
            KeyOrder::CaseInsensitive if key.bytes().any(|b| b.is_ascii_uppercase()) => {
                Cow::Owned(key.to_ascii_lowercase())
            }
            KeyOrder::CaseInsensitive => Cow::Borrowed(key),
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.normalize(a).cmp(&self.normalize(b))
    }

    pub fn equal(&self, a: &str, b: &str) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

impl fmt::Display for KeyOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrder::Bytewise => f.write_str("bytewise"),
            KeyOrder::CaseInsensitive => f.write_str("case-insensitive"),
        }
    }
}

impl FromStr for KeyOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bytewise" => Ok(KeyOrder::Bytewise),
            "case-insensitive" | "case_insensitive" => Ok(KeyOrder::CaseInsensitive),
            other => Err(format!(
                "unknown key order {other:?} (expected bytewise or case-insensitive)"
            )),
        }
    }
}

/// Boundary of a shard: the first href stored in that shard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardEntry {
    pub href: Href,
}

impl ShardEntry {
    pub fn new(href: Href) -> Self {
        Self { href }
    }

    pub fn key(&self) -> &str {
        self.href.as_str()
    }
}

/// Why a query could not be routed to a shard. Never fatal.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMiss {
    #[error("index unavailable: no shard entries")]
    Unavailable,

    #[error("empty query")]
    EmptyQuery,

    #[error("not found: query sorts before the first shard")]
    BeforeFirst,
}

/// Shard a query was routed to, covering `[entry, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardHit<'a> {
    pub shard: usize,
    pub entry: &'a ShardEntry,
    pub upper: Option<&'a ShardEntry>,
}

/// Sorted boundary list (`NAVTREEINDEX`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardIndex {
    entries: Vec<ShardEntry>,
    #[serde(skip)]
    order: KeyOrder,
}

impl ShardIndex {
    /// Wrap boundary entries, rejecting any that sort before their predecessor.
    pub fn new(entries: Vec<ShardEntry>, order: KeyOrder) -> DomainResult<Self> {
        Self::declared(entries, order, "index")
    }

    /// Like [`ShardIndex::new`], reporting positions against the script variable `var`.
    pub fn declared(entries: Vec<ShardEntry>, order: KeyOrder, var: &str) -> DomainResult<Self> {
        if let Some((i, (prev, next))) = entries
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| order.compare(a.key(), b.key()) == Ordering::Greater)
        {
            return Err(DomainError::malformed(
                format!("{var}[{}]", i + 1),
                format!(
                    "{:?} sorts before preceding entry {:?} ({order})",
                    next.key(),
                    prev.key()
                ),
            ));
        }
        Ok(Self { entries, order })
    }

    pub fn empty(order: KeyOrder) -> Self {
        Self {
            entries: Vec::new(),
            order,
        }
    }

    pub fn entries(&self) -> &[ShardEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn order(&self) -> KeyOrder {
        self.order
    }

    /// Route `query` to the last shard whose boundary sorts at or before it.
    #[instrument(level = "trace", skip(self))]
    pub fn lookup(&self, query: &str) -> Result<ShardHit<'_>, LookupMiss> {
        if self.entries.is_empty() {
            return Err(LookupMiss::Unavailable);
        }
        if query.is_empty() {
            return Err(LookupMiss::EmptyQuery);
        }
        let key = self.order.normalize(query);
        let after = self
            .entries
            .partition_point(|e| self.order.normalize(e.key()) <= key);
        trace!("lookup: {} boundaries at or before query", after);
        match after {
            0 => Err(LookupMiss::BeforeFirst),
            n => Ok(ShardHit {
                shard: n - 1,
                entry: &self.entries[n - 1],
                upper: self.entries.get(n),
            }),
        }
    }
}

/// Href and tree path of one navigable node in a shard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageEntry {
    pub href: Href,
    /// Child indices leading from the root node to this node; empty for the root.
    pub path: Vec<usize>,
}

/// Contents of a `navtreeindex<N>.js` shard page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ShardPage {
    pub entries: Vec<PageEntry>,
}

impl ShardPage {
    /// Convert a `{ "href":[0,1], ... }` object literal.
    pub fn from_literal(literal: &Literal, location: &str) -> DomainResult<Self> {
        let members = literal.as_object().ok_or_else(|| {
            DomainError::malformed(location, format!("expected object, found {}", literal.kind()))
        })?;
        let entries = members
            .iter()
            .map(|(key, value)| {
                let at = format!("{location}[{key:?}]");
                let href = Href::parse(key)
                    .ok_or_else(|| DomainError::malformed(&at, "key is not a relative URL"))?;
                let steps = value.as_array().ok_or_else(|| {
                    DomainError::malformed(&at, format!("expected array, found {}", value.kind()))
                })?;
                let path = steps
                    .iter()
                    .map(|step| match step {
                        Literal::Number(n) => usize::try_from(*n)
                            .map_err(|_| DomainError::malformed(&at, "path index out of range")),
                        other => Err(DomainError::malformed(
                            &at,
                            format!("path index must be a number, found {}", other.kind()),
                        )),
                    })
                    .collect::<DomainResult<Vec<_>>>()?;
                Ok(PageEntry { href, path })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    pub fn first_href(&self) -> Option<&Href> {
        self.entries.first().map(|e| &e.href)
    }

    /// Tree path stored for `href`, compared under `order`.
    pub fn path_of(&self, href: &str, order: KeyOrder) -> Option<&[usize]> {
        self.entries
            .iter()
            .find(|e| order.equal(e.href.as_str(), href))
            .map(|e| e.path.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::script::Script;
    use rstest::rstest;

    fn index(keys: &[&str], order: KeyOrder) -> ShardIndex {
        let entries = keys
            .iter()
            .map(|k| ShardEntry::new(Href::parse(k).unwrap()))
            .collect();
        ShardIndex::new(entries, order).unwrap()
    }

    #[rstest]
    #[case("p.html", 1, "m.html")]
    #[case("a.html", 0, "a.html")]
    #[case("m.html", 1, "m.html")]
    #[case("lz.html", 0, "a.html")]
    #[case("zebra.html", 2, "t.html")]
    fn given_boundaries_when_looking_up_then_returns_last_entry_at_or_before_query(
        #[case] query: &str,
        #[case] shard: usize,
        #[case] boundary: &str,
    ) {
        let idx = index(&["a.html", "m.html", "t.html"], KeyOrder::Bytewise);
        let hit = idx.lookup(query).unwrap();
        assert_eq!(hit.shard, shard);
        assert_eq!(hit.entry.key(), boundary);
    }

    #[test]
    fn given_hit_when_inspecting_then_upper_bound_is_next_boundary() {
        let idx = index(&["a.html", "m.html", "t.html"], KeyOrder::Bytewise);
        assert_eq!(idx.lookup("p.html").unwrap().upper.map(ShardEntry::key), Some("t.html"));
        assert_eq!(idx.lookup("v.html").unwrap().upper, None);
    }

    #[test]
    fn given_query_before_first_boundary_when_looking_up_then_not_found() {
        let idx = index(&["a.html", "m.html", "t.html"], KeyOrder::Bytewise);
        assert_eq!(idx.lookup("_"), Err(LookupMiss::BeforeFirst));
    }

    #[test]
    fn given_empty_index_when_looking_up_then_index_unavailable() {
        let idx = ShardIndex::empty(KeyOrder::Bytewise);
        assert_eq!(idx.lookup("anything"), Err(LookupMiss::Unavailable));
    }

    #[test]
    fn given_empty_query_when_looking_up_then_rejected() {
        let idx = index(&["a.html"], KeyOrder::Bytewise);
        assert_eq!(idx.lookup(""), Err(LookupMiss::EmptyQuery));
    }

    #[test]
    fn given_duplicate_boundaries_when_looking_up_then_routes_to_last_of_them() {
        let idx = index(&["a.html", "m.html", "m.html", "t.html"], KeyOrder::Bytewise);
        assert_eq!(idx.lookup("m.html").unwrap().shard, 2);
    }

    #[test]
    fn given_mixed_case_keys_when_case_insensitive_then_folds_before_comparing() {
        let idx = index(&["Alpha.html", "beta.html", "Gamma.html"], KeyOrder::CaseInsensitive);
        assert_eq!(idx.lookup("BETA.html").unwrap().shard, 1);
        assert_eq!(idx.lookup("delta.html").unwrap().shard, 1);

        let entries = ["Alpha.html", "beta.html", "Gamma.html"]
            .iter()
            .map(|k| ShardEntry::new(Href::parse(k).unwrap()))
            .collect();
        assert!(ShardIndex::new(entries, KeyOrder::Bytewise).is_err());
    }

    #[test]
    fn given_key_order_names_when_parsing_then_round_trips_display() {
        for order in [KeyOrder::Bytewise, KeyOrder::CaseInsensitive] {
            assert_eq!(order.to_string().parse::<KeyOrder>(), Ok(order));
        }
        assert!("natural".parse::<KeyOrder>().is_err());
    }

    #[test]
    fn given_shard_page_literal_when_converting_then_maps_hrefs_to_paths() {
        let script = Script::parse(
            r#"var NAVTREEINDEX0 =
{
"annotated.html":[2,0],
"classes.html":[2,1],
"index.html":[]
};"#,
        )
        .unwrap();
        let page = ShardPage::from_literal(script.get("NAVTREEINDEX0").unwrap(), "NAVTREEINDEX0")
            .unwrap();

        assert_eq!(page.entries.len(), 3);
        assert_eq!(page.first_href().map(Href::as_str), Some("annotated.html"));
        assert_eq!(page.path_of("classes.html", KeyOrder::Bytewise), Some(&[2, 1][..]));
        assert_eq!(page.path_of("index.html", KeyOrder::Bytewise), Some(&[][..]));
        assert_eq!(page.path_of("Classes.html", KeyOrder::Bytewise), None);
        assert_eq!(
            page.path_of("Classes.html", KeyOrder::CaseInsensitive),
            Some(&[2, 1][..])
        );
    }

    #[test]
    fn given_page_with_non_numeric_path_when_converting_then_fails() {
        let script = Script::parse(r#"var P = { "a.html": ["x"] };"#).unwrap();
        assert!(ShardPage::from_literal(script.get("P").unwrap(), "P").is_err());
    }
}
