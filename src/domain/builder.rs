//! Shard index builder: regenerates `NAVTREEINDEX` and its shard pages from a tree.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::domain::entities::{Href, NavNode};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::shard::{KeyOrder, PageEntry, ShardEntry, ShardIndex, ShardPage};

/// Number of hrefs per shard page the generator uses.
pub const DEFAULT_SHARD_SIZE: usize = 250;

/// Result of a build: boundary index plus one page per shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltIndex {
    pub index: ShardIndex,
    pub pages: Vec<ShardPage>,
}

/// Collects every navigable href of a tree and splits them into sorted shards.
pub struct ShardIndexBuilder {
    shard_size: usize,
    order: KeyOrder,
}

impl Default for ShardIndexBuilder {
    fn default() -> Self {
        Self {
            shard_size: DEFAULT_SHARD_SIZE,
            order: KeyOrder::default(),
        }
    }
}

impl ShardIndexBuilder {
    pub fn new(shard_size: usize, order: KeyOrder) -> DomainResult<Self> {
        if shard_size == 0 {
            return Err(DomainError::InvalidShardSize(shard_size));
        }
        Ok(Self { shard_size, order })
    }

    /// Build from the first top-level entry; paths are relative to it.
    ///
    /// When an href occurs more than once, the node visited last in pre-order
    /// wins, matching how a repeated key resolves in the generated object literal.
    #[instrument(level = "debug", skip_all)]
    pub fn build(&self, tree: &[NavNode]) -> DomainResult<BuiltIndex> {
        let mut entries: Vec<PageEntry> = Vec::new();
        if let Some(root) = tree.first() {
            let mut seen: HashMap<String, usize> = HashMap::new();
            let mut record = |href: &Href, path: Vec<usize>| {
                let key = self.order.normalize(href.as_str()).into_owned();
                match seen.get(&key) {
                    Some(&slot) => entries[slot] = PageEntry { href: href.clone(), path },
                    None => {
                        seen.insert(key, entries.len());
                        entries.push(PageEntry { href: href.clone(), path });
                    }
                }
            };
            record(&root.href, Vec::new());
            collect(root.child_nodes(), &mut Vec::new(), &mut record);
        }
        if tree.len() > 1 {
            debug!("build: ignoring {} additional top-level entries", tree.len() - 1);
        }

        entries.sort_by(|a, b| self.order.compare(a.href.as_str(), b.href.as_str()));

        let pages: Vec<ShardPage> = entries
            .chunks(self.shard_size)
            .map(|chunk| ShardPage {
                entries: chunk.to_vec(),
            })
            .collect();
        let boundaries = pages
            .iter()
            .filter_map(ShardPage::first_href)
            .cloned()
            .map(ShardEntry::new)
            .collect();
        debug!("build: {} hrefs in {} shards", entries.len(), pages.len());

        Ok(BuiltIndex {
            index: ShardIndex::new(boundaries, self.order)?,
            pages,
        })
    }
}

fn collect(nodes: &[NavNode], path: &mut Vec<usize>, record: &mut impl FnMut(&Href, Vec<usize>)) {
    for (i, node) in nodes.iter().enumerate() {
        path.push(i);
        record(&node.href, path.clone());
        collect(node.child_nodes(), path, record);
        path.pop();
    }
}
