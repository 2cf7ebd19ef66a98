//! Integration tests for NavigationService against a generated documentation directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use doxnav::application::services::{ExportFormat, NavigationService};
use doxnav::application::ApplicationError;
use doxnav::config::Settings;
use doxnav::domain::{LookupMiss, NavArena};
use doxnav::infrastructure::traits::RealFileSystem;
use doxnav::util::testing;

const NAVTREEDATA: &str = r#"/*
@licstart  sample
@licend  sample
*/
var NAVTREE =
[
  [ "Demo", "index.html", [
    [ "Guide", "guide.html", [
      [ "Install", "guide.html#install", null ],
      [ "Usage", "usage.html", null ]
    ] ],
    [ "Files", "files.html", "files_dup" ]
  ] ]
];

var NAVTREEINDEX =
[
"files.html",
"index.html"
];

var SYNCONMSG = 'click to disable panel synchronisation';
var SYNCOFFMSG = 'click to enable panel synchronisation';
"#;

const FILES_DUP: &str = r#"var files_dup =
[
    [ "main.f90", "main_8f90.html", null ],
    [ "util.f90", "util_8f90.html", null ]
];
"#;

const NAVTREEINDEX0: &str = r#"var NAVTREEINDEX0 =
{
"files.html":[1],
"guide.html":[0],
"guide.html#install":[0,0]
};
"#;

const NAVTREEINDEX1: &str = r#"var NAVTREEINDEX1 =
{
"index.html":[],
"main_8f90.html":[1,0],
"usage.html":[0,1],
"util_8f90.html":[1,1]
};
"#;

#[fixture]
fn doc_dir() -> TempDir {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("navtreedata.js"), NAVTREEDATA).unwrap();
    fs::write(dir.path().join("files_dup.js"), FILES_DUP).unwrap();
    fs::write(dir.path().join("navtreeindex0.js"), NAVTREEINDEX0).unwrap();
    fs::write(dir.path().join("navtreeindex1.js"), NAVTREEINDEX1).unwrap();
    fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
    dir
}

fn service(settings: Settings) -> NavigationService {
    NavigationService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

fn labels(location: &doxnav::application::services::Location) -> Vec<&str> {
    location
        .breadcrumbs
        .iter()
        .map(|c| c.label.as_str())
        .collect()
}

// ============================================================
// load
// ============================================================

#[rstest]
fn given_doc_dir_when_load_then_deferred_children_are_resolved(doc_dir: TempDir) {
    let data = service(Settings::default()).load(doc_dir.path()).unwrap();

    assert_eq!(data.node_count(), 7);
    assert_eq!(data.deferred_count(), 0);
    assert_eq!(NavArena::from_nodes(&data.tree).depth(), 3);
    assert_eq!(data.index.len(), 2);
    assert_eq!(
        data.sync_on_message.as_deref(),
        Some("click to disable panel synchronisation")
    );
}

#[rstest]
fn given_data_file_path_when_load_then_same_as_directory(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let from_dir = nav.load(doc_dir.path()).unwrap();
    let from_file = nav.load(&doc_dir.path().join("navtreedata.js")).unwrap();
    assert_eq!(from_dir, from_file);
}

#[rstest]
fn given_missing_child_script_when_load_then_node_stays_deferred(doc_dir: TempDir) {
    fs::remove_file(doc_dir.path().join("files_dup.js")).unwrap();

    let data = service(Settings::default()).load(doc_dir.path()).unwrap();

    assert_eq!(data.node_count(), 5);
    assert_eq!(data.deferred_count(), 1);
}

#[rstest]
fn given_resolution_disabled_when_load_then_tree_is_as_written(doc_dir: TempDir) {
    let settings = Settings {
        resolve_deferred: false,
        ..Settings::default()
    };
    let data = service(settings).load(doc_dir.path()).unwrap();
    assert_eq!(data.deferred_count(), 1);
    assert_eq!(data.tree[0].child_nodes()[1].deferred_script(), Some("files_dup"));
}

#[rstest]
fn given_self_referencing_child_script_when_load_then_terminates(doc_dir: TempDir) {
    fs::write(
        doc_dir.path().join("files_dup.js"),
        r#"var files_dup = [ [ "again", "again.html", "files_dup" ] ];"#,
    )
    .unwrap();

    let data = service(Settings::default()).load(doc_dir.path()).unwrap();

    assert_eq!(data.node_count(), 6);
    assert_eq!(data.deferred_count(), 1);
}

#[rstest]
fn given_malformed_data_file_when_load_then_error_names_file(doc_dir: TempDir) {
    let file = doc_dir.path().join("navtreedata.js");
    fs::write(&file, "var NAVTREE = [ [ \"Demo\", \"index.html\", null ];").unwrap();

    let err = service(Settings::default()).load(&file).unwrap_err();

    assert!(matches!(err, ApplicationError::InFile { .. }));
    assert!(err.to_string().contains("navtreedata.js"), "{err}");
}

#[test]
fn given_missing_directory_when_load_then_operation_failed() {
    let err = service(Settings::default())
        .load(Path::new("/nonexistent/doxnav/html"))
        .unwrap_err();
    assert!(matches!(err, ApplicationError::OperationFailed { .. }));
}

// ============================================================
// lookup / shard pages
// ============================================================

#[rstest]
#[case("files.html", 0)]
#[case("guide.html#install", 0)]
#[case("index.html", 1)]
#[case("zzz.html", 1)]
fn given_query_when_lookup_then_routes_to_last_boundary_at_or_before(
    doc_dir: TempDir,
    #[case] query: &str,
    #[case] shard: usize,
) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    assert_eq!(nav.lookup(&data, query).unwrap().shard, shard);
}

#[rstest]
fn given_query_before_first_boundary_when_lookup_then_miss(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    assert_eq!(nav.lookup(&data, "annotated.html"), Err(LookupMiss::BeforeFirst));
}

#[rstest]
fn given_doc_dir_when_discover_shard_pages_then_ordered_by_number(doc_dir: TempDir) {
    fs::write(doc_dir.path().join("navtreeindex10.js"), "var NAVTREEINDEX10 = {};").unwrap();
    fs::write(doc_dir.path().join("navtreeindexX.js"), "").unwrap();

    let pages = service(Settings::default())
        .discover_shard_pages(doc_dir.path())
        .unwrap();

    let numbers: Vec<usize> = pages.iter().map(|(n, _)| *n).collect();
    assert_eq!(numbers, vec![0, 1, 10]);
}

#[rstest]
fn given_shard_page_when_loaded_then_first_href_matches_boundary(doc_dir: TempDir) {
    let page = service(Settings::default())
        .load_shard_page(doc_dir.path(), 1)
        .unwrap();
    assert_eq!(page.first_href().unwrap().as_str(), "index.html");
    assert_eq!(page.entries.len(), 4);
}

// ============================================================
// locate
// ============================================================

#[rstest]
fn given_indexed_href_when_locate_then_returns_path_and_breadcrumbs(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let location = nav.locate(doc_dir.path(), &data, "usage.html").unwrap();

    assert_eq!(location.shard, 1);
    assert_eq!(location.path, vec![0, 1]);
    assert_eq!(labels(&location), vec!["Demo", "Guide", "Usage"]);
}

#[rstest]
fn given_href_below_deferred_node_when_locate_then_walks_resolved_children(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let location = nav.locate(doc_dir.path(), &data, "main_8f90.html").unwrap();

    assert_eq!(location.path, vec![1, 0]);
    assert_eq!(labels(&location), vec!["Demo", "Files", "main.f90"]);
}

#[rstest]
fn given_root_href_when_locate_then_path_is_empty(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let location = nav.locate(doc_dir.path(), &data, "index.html").unwrap();

    assert!(location.path.is_empty());
    assert_eq!(labels(&location), vec!["Demo"]);
}

#[rstest]
fn given_unindexed_anchor_when_locate_then_falls_back_to_page(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let location = nav.locate(doc_dir.path(), &data, "usage.html#options").unwrap();

    assert_eq!(location.href.as_str(), "usage.html");
    assert_eq!(location.path, vec![0, 1]);
}

#[rstest]
fn given_unknown_href_when_locate_then_not_located(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let err = nav.locate(doc_dir.path(), &data, "missing.html").unwrap_err();

    assert!(matches!(err, ApplicationError::NotLocated { .. }), "{err}");
}

// ============================================================
// build_index / write_index
// ============================================================

#[rstest]
fn given_tree_when_build_index_then_boundaries_are_first_href_of_each_page(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let built = nav.build_index(&data, Some(3)).unwrap();

    let boundaries: Vec<&str> = built.index.entries().iter().map(|e| e.key()).collect();
    assert_eq!(boundaries, vec!["files.html", "index.html", "util_8f90.html"]);
    assert_eq!(built.pages.len(), 3);
}

#[rstest]
fn given_zero_shard_size_when_build_index_then_rejected(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    assert!(nav.build_index(&data, Some(0)).is_err());
}

#[rstest]
fn given_rebuilt_index_when_written_then_locate_uses_new_pages(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    let built = nav.build_index(&data, Some(3)).unwrap();

    let written = nav.write_index(doc_dir.path(), &built).unwrap();

    assert_eq!(written, 3);
    assert!(doc_dir.path().join("navtreeindex2.js").exists());

    // Tree keeps its deferred reference on disk; only the index changed
    let on_disk = fs::read_to_string(doc_dir.path().join("navtreedata.js")).unwrap();
    assert!(on_disk.contains(r#"[ "Files", "files.html", "files_dup" ]"#), "{on_disk}");
    assert!(on_disk.contains("\"util_8f90.html\"\n];"), "{on_disk}");

    let reloaded = nav.load(doc_dir.path()).unwrap();
    assert_eq!(reloaded.index, built.index);
    let location = nav
        .locate(doc_dir.path(), &reloaded, "util_8f90.html")
        .unwrap();
    assert_eq!(location.shard, 2);
    assert_eq!(location.path, vec![1, 1]);
}

#[rstest]
fn given_unreadable_data_file_when_write_index_then_no_pages_written(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    let built = nav.build_index(&data, Some(3)).unwrap();
    fs::write(doc_dir.path().join("navtreedata.js"), "var NAVTREE = [").unwrap();

    let err = nav.write_index(doc_dir.path(), &built).unwrap_err();

    assert!(matches!(err, ApplicationError::InFile { .. }), "{err}");
    assert!(!doc_dir.path().join("navtreeindex2.js").exists());
    assert_eq!(
        fs::read_to_string(doc_dir.path().join("navtreeindex0.js")).unwrap(),
        NAVTREEINDEX0
    );
}

#[rstest]
fn given_unwritable_shard_page_when_write_index_then_write_failed(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    let built = nav.build_index(&data, Some(3)).unwrap();
    fs::create_dir(doc_dir.path().join("navtreeindex2.js")).unwrap();

    let err = nav.write_index(doc_dir.path(), &built).unwrap_err();

    assert!(matches!(err, ApplicationError::WriteFailed { .. }), "{err}");
    assert!(err.to_string().contains("navtreeindex2.js"), "{err}");
}

#[rstest]
fn given_every_node_when_indexed_then_each_href_locates_to_itself(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();
    let built = nav.build_index(&data, Some(2)).unwrap();
    nav.write_index(doc_dir.path(), &built).unwrap();
    let data = nav.load(doc_dir.path()).unwrap();

    for node in data.walk() {
        let location = nav.locate(doc_dir.path(), &data, node.href.as_str()).unwrap();
        let last = location.breadcrumbs.last().unwrap();
        assert_eq!(last.href, node.href);
        assert_eq!(last.label, node.label);
    }
}

// ============================================================
// export
// ============================================================

#[rstest]
fn given_loaded_data_when_export_json_then_tree_and_index_present(doc_dir: TempDir) {
    let nav = service(Settings::default());
    let data = nav.load(doc_dir.path()).unwrap();

    let json = nav.export(&data, ExportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["tree"][0]["label"], "Demo");
    assert_eq!(value["tree"][0]["href"], "index.html");
    assert_eq!(value["index"]["entries"][1], "index.html");
}

#[rstest]
fn given_loaded_data_when_export_js_then_script_reloads_identically(doc_dir: TempDir) {
    let settings = Settings {
        resolve_deferred: false,
        ..Settings::default()
    };
    let nav = service(settings);
    let data = nav.load(doc_dir.path()).unwrap();

    let js = nav.export(&data, ExportFormat::Js).unwrap();
    let out = TempDir::new().unwrap();
    fs::write(out.path().join("navtreedata.js"), js).unwrap();

    assert_eq!(nav.load(out.path()).unwrap(), data);
}
