//! Navigation data service
//!
//! Loads generated navigation scripts from a documentation directory,
//! resolves deferred child scripts, routes hrefs through the shard index
//! and regenerates shard pages.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult, DomainResultExt, IoResultExt};
use crate::config::Settings;
use crate::domain::writer::{write_nav_data, write_shard_page};
use crate::domain::{
    BuiltIndex, Children, DomainError, Href, LookupMiss, NavArena, NavData, NavNode, Script,
    ShardHit, ShardIndexBuilder, ShardPage,
};
use crate::infrastructure::traits::FileSystem;

/// Output format for [`NavigationService::export`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Generator script layout
    #[default]
    Js,
    /// Pretty-printed JSON
    Json,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Js => f.write_str("js"),
            ExportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(ExportFormat::Js),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown format {other:?} (expected js or json)")),
        }
    }
}

/// One step of a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub label: String,
    pub href: Href,
}

/// Where an href lives in the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Href that was found; the page without its anchor when the anchor is not indexed
    pub href: Href,
    pub shard: usize,
    pub path: Vec<usize>,
    /// Labels from the root node down to the located node
    pub breadcrumbs: Vec<Crumb>,
}

/// Service for loading and querying navigation data.
pub struct NavigationService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl NavigationService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Navigation data file for `path`: the file itself, or the configured data file in a directory.
    pub fn data_path(&self, path: &Path) -> PathBuf {
        if self.fs.is_dir(path) {
            path.join(&self.settings.data_file)
        } else {
            path.to_path_buf()
        }
    }

    /// Directory holding the scripts that accompany `path`.
    pub fn doc_dir(&self, path: &Path) -> PathBuf {
        if self.fs.is_dir(path) {
            return path.to_path_buf();
        }
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Load, validate and (if configured) expand deferred children.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<NavData> {
        let file = self.data_path(path);
        let mut data = self.load_raw(&file)?;

        if self.settings.resolve_deferred {
            let dir = self.doc_dir(&file);
            let mut active = Vec::new();
            let resolved = self.resolve_deferred(&dir, &mut data.tree, &mut active)?;
            debug!("load: resolved {} deferred child scripts", resolved);
        }

        info!(
            "loaded {}: {} nodes, {} shards",
            file.display(),
            data.node_count(),
            data.index.len()
        );
        Ok(data)
    }

    /// Load the data file exactly as written, leaving deferred children unresolved.
    pub fn load_raw(&self, path: &Path) -> ApplicationResult<NavData> {
        let file = self.data_path(path);
        debug!("load_raw: {}", file.display());
        let content = self
            .fs
            .read_to_string(&file)
            .with_path_context("read navigation data", &file)?;
        NavData::parse(
            &content,
            &self.settings.script_names(),
            self.settings.key_order,
        )
        .in_file(&file)
    }

    fn resolve_deferred(
        &self,
        dir: &Path,
        nodes: &mut [NavNode],
        active: &mut Vec<String>,
    ) -> ApplicationResult<usize> {
        let mut resolved = 0;
        for node in nodes.iter_mut() {
            if let Some(name) = node.deferred_script().map(str::to_string) {
                if active.contains(&name) {
                    warn!("child script {} references itself, left deferred", name);
                    continue;
                }
                match self.load_children_script(dir, &name)? {
                    Some(mut children) => {
                        active.push(name);
                        resolved += 1 + self.resolve_deferred(dir, &mut children, active)?;
                        active.pop();
                        node.children = Children::Nodes(children);
                    }
                    None => warn!(
                        "child script {}.js not found in {}, left deferred",
                        name,
                        dir.display()
                    ),
                }
            } else if let Children::Nodes(children) = &mut node.children {
                resolved += self.resolve_deferred(dir, children, active)?;
            }
        }
        Ok(resolved)
    }

    /// Parse `<dir>/<name>.js`; `None` when the file does not exist.
    pub fn load_children_script(
        &self,
        dir: &Path,
        name: &str,
    ) -> ApplicationResult<Option<Vec<NavNode>>> {
        let path = dir.join(format!("{name}.js"));
        if !self.fs.is_file(&path) {
            return Ok(None);
        }
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read child script", &path)?;
        let script = Script::parse(&content)
            .map_err(DomainError::from)
            .in_file(&path)?;
        let literal = script
            .get(name)
            .ok_or_else(|| DomainError::MissingDeclaration(name.to_string()))
            .in_file(&path)?;
        NavNode::list_from_literal(literal, name)
            .in_file(&path)
            .map(Some)
    }

    /// Route a query to its shard. Misses are reported, never fatal.
    pub fn lookup<'a>(&self, data: &'a NavData, query: &str) -> Result<ShardHit<'a>, LookupMiss> {
        let result = data.index.lookup(query);
        match &result {
            Ok(hit) => debug!("lookup: {:?} -> shard {}", query, hit.shard),
            Err(miss) => debug!("lookup: {:?} -> {}", query, miss),
        }
        result
    }

    pub fn shard_page_path(&self, dir: &Path, shard: usize) -> PathBuf {
        dir.join(format!("{}{}.js", self.settings.index_prefix, shard))
    }

    pub fn shard_page_var(&self, shard: usize) -> String {
        format!("{}{}", self.settings.index_var, shard)
    }

    /// Parse shard page `shard` from `dir`.
    pub fn load_shard_page(&self, dir: &Path, shard: usize) -> ApplicationResult<ShardPage> {
        let path = self.shard_page_path(dir, shard);
        let content = self
            .fs
            .read_to_string(&path)
            .with_path_context("read shard page", &path)?;
        let script = Script::parse(&content)
            .map_err(DomainError::from)
            .in_file(&path)?;
        let var = self.shard_page_var(shard);
        let literal = script
            .get(&var)
            .ok_or_else(|| DomainError::MissingDeclaration(var.clone()))
            .in_file(&path)?;
        ShardPage::from_literal(literal, &var).in_file(&path)
    }

    /// Shard page files present in `dir`, as (shard number, path), ordered by number.
    pub fn discover_shard_pages(&self, dir: &Path) -> ApplicationResult<Vec<(usize, PathBuf)>> {
        let pattern = Regex::new(&format!(
            r"^{}(\d+)\.js$",
            regex::escape(&self.settings.index_prefix)
        ))
        .map_err(|e| ApplicationError::Config {
            message: format!("index_prefix: {e}"),
        })?;

        let mut pages: Vec<(usize, PathBuf)> = self
            .fs
            .list_files(dir)
            .with_path_context("list documentation directory", dir)?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?;
                let shard = pattern.captures(name)?.get(1)?.as_str().parse().ok()?;
                Some((shard, path))
            })
            .collect();
        pages.sort_by_key(|(shard, _)| *shard);
        Ok(pages)
    }

    /// Find `href` in the tree through the shard index and its shard page.
    ///
    /// An href whose anchor is not indexed falls back to its page.
    #[instrument(level = "debug", skip(self, data))]
    pub fn locate(&self, dir: &Path, data: &NavData, href: &str) -> ApplicationResult<Location> {
        let target = Href::parse(href).ok_or_else(|| ApplicationError::NotLocated {
            href: href.to_string(),
            reason: "not a relative URL".into(),
        })?;

        match (self.locate_exact(dir, data, &target), target.without_fragment()) {
            (Err(ApplicationError::NotLocated { reason, .. }), Some(page)) => {
                debug!("locate: {} ({}), retrying {}", target, reason, page);
                self.locate_exact(dir, data, &page)
            }
            (result, _) => result,
        }
    }

    fn locate_exact(&self, dir: &Path, data: &NavData, href: &Href) -> ApplicationResult<Location> {
        let not_located = |reason: String| ApplicationError::NotLocated {
            href: href.to_string(),
            reason,
        };

        let shard = self
            .lookup(data, href.as_str())
            .map_err(|miss| not_located(miss.to_string()))?
            .shard;
        let page = self.load_shard_page(dir, shard)?;
        let path = page
            .path_of(href.as_str(), data.index.order())
            .ok_or_else(|| not_located(format!("not listed in shard page {shard}")))?
            .to_vec();

        let view = NavArena::from_nodes(&data.tree);
        let idx = view.find_by_path(&path).ok_or_else(|| {
            not_located(format!(
                "path {path:?} does not resolve in the loaded tree (deferred children not loaded?)"
            ))
        })?;
        let breadcrumbs = view
            .breadcrumbs(idx)
            .into_iter()
            .map(|d| Crumb {
                label: d.label.clone(),
                href: d.href.clone(),
            })
            .collect();

        Ok(Location {
            href: href.clone(),
            shard,
            path,
            breadcrumbs,
        })
    }

    /// Rebuild the shard index from the tree.
    pub fn build_index(
        &self,
        data: &NavData,
        shard_size: Option<usize>,
    ) -> ApplicationResult<BuiltIndex> {
        let builder = ShardIndexBuilder::new(
            shard_size.unwrap_or(self.settings.shard_size),
            data.index.order(),
        )?;
        Ok(builder.build(&data.tree)?)
    }

    /// Write shard pages and replace the boundary list in the data file.
    ///
    /// The data file keeps its tree exactly as written on disk; only
    /// `NAVTREEINDEX` changes. Returns the number of pages written.
    #[instrument(level = "debug", skip(self, built))]
    pub fn write_index(&self, path: &Path, built: &BuiltIndex) -> ApplicationResult<usize> {
        let file = self.data_path(path);
        let dir = self.doc_dir(&file);
        let mut on_disk = self.load_raw(&file)?;
        on_disk.index = built.index.clone();

        for (shard, page) in built.pages.iter().enumerate() {
            let page_path = self.shard_page_path(&dir, shard);
            self.fs
                .write(&page_path, &write_shard_page(&self.shard_page_var(shard), page))
                .with_write_context("write shard page", &page_path)?;
        }

        self.fs
            .write(&file, &write_nav_data(&on_disk, &self.settings.script_names()))
            .with_write_context("write navigation data", &file)?;

        for (shard, stale) in self.discover_shard_pages(&dir)? {
            if shard >= built.pages.len() {
                warn!("stale shard page left in place: {}", stale.display());
            }
        }
        info!("wrote {} shard pages to {}", built.pages.len(), dir.display());
        Ok(built.pages.len())
    }

    /// Serialize navigation data.
    pub fn export(&self, data: &NavData, format: ExportFormat) -> ApplicationResult<String> {
        match format {
            ExportFormat::Js => Ok(write_nav_data(data, &self.settings.script_names())),
            ExportFormat::Json => {
                serde_json::to_string_pretty(data).map_err(|source| {
                    ApplicationError::Serialization {
                        context: "serialize navigation data as JSON".into(),
                        source,
                    }
                })
            }
        }
    }
}
