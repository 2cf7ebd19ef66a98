//! Command dispatch and handlers

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::ExportFormat;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DomainError, NavArena, NavData};
use crate::infrastructure::di::{DataSource, ServiceContainer};
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Check { path }) => cmd_check(cli, path.as_deref()),
        Some(Commands::Tree { path, depth }) => cmd_tree(cli, path.as_deref(), *depth),
        Some(Commands::Lookup { key, path }) => cmd_lookup(cli, key, path.as_deref()),
        Some(Commands::Locate { href, path }) => cmd_locate(cli, href, path.as_deref()),
        Some(Commands::Index {
            path,
            shard_size,
            dry_run,
        }) => cmd_index(cli, path.as_deref(), *shard_size, *dry_run),
        Some(Commands::Export {
            path,
            format,
            output,
        }) => cmd_export(cli, path.as_deref(), *format, output.as_deref()),
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            generate(*shell, &mut cmd, "doxnav", &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

/// Directory whose local config applies to `path`.
fn config_dir_for(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_settings(cli: &Cli, path: Option<&Path>) -> CliResult<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load(Some(&config_dir_for(path)))?,
        None => {
            let base = Settings::load(None)?;
            Settings::load(Some(&base.doc_dir))?
        }
    };
    if let Some(order) = cli.key_order {
        settings.key_order = order;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn container(cli: &Cli, path: Option<&Path>) -> CliResult<ServiceContainer> {
    if cli.bundled && path.is_some() {
        return Err(CliError::InvalidArgs(
            "--bundled cannot be combined with a path".into(),
        ));
    }
    let settings = load_settings(cli, path)?;
    let source = if cli.bundled {
        DataSource::Bundled
    } else {
        DataSource::Path(
            path.map(Path::to_path_buf)
                .unwrap_or_else(|| settings.doc_dir.clone()),
        )
    };
    Ok(ServiceContainer::new(settings, source))
}

fn source_label(c: &ServiceContainer) -> String {
    c.data_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "bundled snapshot".into())
}

#[instrument(skip(cli))]
fn cmd_check(cli: &Cli, path: Option<&Path>) -> CliResult<()> {
    let c = container(cli, path)?;
    let data = c.nav_data()?;

    output::header("Navigation data");
    output::action("source", &source_label(&c));
    let view = NavArena::from_nodes(&data.tree);
    output::action("nodes", &view.len());
    output::action("depth", &view.depth());
    output::action("leaves", &view.leaf_labels().len());
    output::action("deferred", &data.deferred_count());
    output::action("shards", &data.index.len());
    output::action("key order", &data.index.order());

    let mut problems = 0;
    if let Some(dir) = c.doc_dir() {
        problems += check_shard_pages(&c, &dir, data)?;
        if c.settings.resolve_deferred && data.deferred_count() > 0 {
            output::warning(&format!(
                "{} deferred child scripts could not be loaded",
                data.deferred_count()
            ));
        }
    }

    if problems > 0 {
        return Err(ApplicationError::Domain(DomainError::malformed(
            "shard pages",
            format!("{problems} problems found"),
        ))
        .into());
    }
    output::success("navigation data is consistent");
    Ok(())
}

fn check_shard_pages(c: &ServiceContainer, dir: &Path, data: &NavData) -> CliResult<usize> {
    let pages = c.navigation.discover_shard_pages(dir)?;
    let mut problems = 0;

    for (shard, entry) in data.index.entries().iter().enumerate() {
        if !pages.iter().any(|(n, _)| *n == shard) {
            output::warning(&format!(
                "shard page missing: {}",
                c.navigation.shard_page_path(dir, shard).display()
            ));
            problems += 1;
            continue;
        }
        let page = c.navigation.load_shard_page(dir, shard)?;
        let first = page.first_href().map(|h| h.as_str()).unwrap_or_default();
        if !data.index.order().equal(first, entry.key()) {
            output::warning(&format!(
                "shard page {shard} starts with {first:?}, index says {:?}",
                entry.key()
            ));
            problems += 1;
        }
    }
    for (shard, stale) in pages.iter().filter(|(n, _)| *n >= data.index.len()) {
        output::warning(&format!(
            "shard page {shard} is not in the index: {}",
            stale.display()
        ));
        problems += 1;
    }
    Ok(problems)
}

#[instrument(skip(cli))]
fn cmd_tree(cli: &Cli, path: Option<&Path>, depth: Option<usize>) -> CliResult<()> {
    let c = container(cli, path)?;
    let data = c.nav_data()?;
    let view = NavArena::from_nodes(&data.tree);
    for tree in view.to_termtrees(depth) {
        output::info(&tree);
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_lookup(cli: &Cli, key: &str, path: Option<&Path>) -> CliResult<()> {
    let c = container(cli, path)?;
    let data = c.nav_data()?;

    match c.navigation.lookup(data, key) {
        Ok(hit) => {
            output::action("shard", &hit.shard);
            let upper = hit
                .upper
                .map(|e| format!("{:?}", e.key()))
                .unwrap_or_else(|| "end".into());
            output::action("range", &format!("[{:?}, {})", hit.entry.key(), upper));
            if let Some(dir) = c.doc_dir() {
                output::action(
                    "page",
                    &c.navigation.shard_page_path(&dir, hit.shard).display(),
                );
            }
            Ok(())
        }
        Err(miss) => Err(CliError::NotFound(format!("{key}: {miss}"))),
    }
}

#[instrument(skip(cli))]
fn cmd_locate(cli: &Cli, href: &str, path: Option<&Path>) -> CliResult<()> {
    let c = container(cli, path)?;
    let dir = c.doc_dir().ok_or_else(|| {
        CliError::Usage("locate reads shard pages: pass a documentation directory".into())
    })?;
    let data = c.nav_data()?;
    let location = c.navigation.locate(&dir, data, href)?;

    if location.href.as_str() != href {
        output::warning(&format!(
            "{href} is not indexed, showing its page {}",
            location.href
        ));
    }
    output::action("shard", &location.shard);
    output::action("path", &format!("[{}]", location.path.iter().join(",")));
    for (level, crumb) in location.breadcrumbs.iter().enumerate() {
        output::info(&format!(
            "{}{} ({})",
            "  ".repeat(level),
            crumb.label,
            crumb.href
        ));
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_index(
    cli: &Cli,
    path: Option<&Path>,
    shard_size: Option<usize>,
    dry_run: bool,
) -> CliResult<()> {
    let c = container(cli, path)?;
    let data = c.nav_data()?;
    let built = c.navigation.build_index(data, shard_size)?;

    if data.deferred_count() > 0 {
        output::warning(&format!(
            "{} deferred nodes unresolved; their descendants are not indexed",
            data.deferred_count()
        ));
    }

    if dry_run {
        output::header(&format!("{} shards", built.index.len()));
        for (shard, entry) in built.index.entries().iter().enumerate() {
            output::detail(&format!("{shard}: {}", entry.key()));
        }
        return Ok(());
    }

    let file = c.data_path().ok_or_else(|| {
        CliError::Usage("the bundled snapshot is read-only, use --dry-run".into())
    })?;
    let written = c.navigation.write_index(&file, &built)?;
    output::success(&format!(
        "wrote {written} shard pages and {} boundaries to {}",
        built.index.len(),
        file.display()
    ));
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_export(
    cli: &Cli,
    path: Option<&Path>,
    format: ExportFormat,
    output_path: Option<&Path>,
) -> CliResult<()> {
    let c = container(cli, path)?;
    let data = c.nav_data()?;
    let text = c.navigation.export(data, format)?;

    match output_path {
        Some(out) => {
            c.fs.ensure_parent(out)
                .and_then(|_| c.fs.write(out, &text))
                .map_err(|e| InfraError::io(format!("write {}", out.display()), e))?;
            output::success(&format!("exported {format} to {}", out.display()));
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    let settings = load_settings(cli, None)?;
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(global) => output::action("global", &describe_path(&global)),
                None => output::action("global", &"<unavailable>"),
            }
            output::action(
                "local",
                &describe_path(&local_config_path(&settings.doc_dir)),
            );
        }
        ConfigCommands::Init { global } => {
            let target = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".into())
                })?
            } else {
                local_config_path(&settings.doc_dir)
            };
            let fs = RealFileSystem;
            if fs.exists(&target) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    target.display()
                )));
            }
            fs.ensure_parent(&target)
                .and_then(|_| fs.write(&target, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", target.display()), e))?;
            output::success(&format!("created {}", target.display()));
        }
    }
    Ok(())
}

fn describe_path(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found)", path.display())
    }
}
