//! Script writer producing the generator's layout.
//!
//! Output parses back through [`Script::parse`](crate::domain::script::Script::parse)
//! into identical values.

use std::fmt::Write;

use itertools::Itertools;

use crate::domain::entities::{Children, NavData, NavNode, ScriptNames};
use crate::domain::shard::ShardPage;

/// Quote `s` with `quote`, escaping so the literal decodes back to `s`.
pub fn quote(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn write_node(out: &mut String, node: &NavNode, indent: usize) {
    let pad = " ".repeat(indent);
    let _ = write!(
        out,
        "{pad}[ {}, {}, ",
        quote(&node.label, '"'),
        quote(node.href.as_str(), '"')
    );
    match &node.children {
        Children::Leaf => out.push_str("null ]"),
        Children::Deferred(name) => {
            let _ = write!(out, "{} ]", quote(name, '"'));
        }
        Children::Nodes(nodes) if nodes.is_empty() => out.push_str("[] ]"),
        Children::Nodes(nodes) => {
            out.push_str("[\n");
            write_nodes(out, nodes, indent + 2);
            let _ = write!(out, "\n{pad}] ]");
        }
    }
}

fn write_nodes(out: &mut String, nodes: &[NavNode], indent: usize) {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        write_node(out, node, indent);
    }
}

/// Render a complete `navtreedata.js`.
pub fn write_nav_data(data: &NavData, names: &ScriptNames) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "var {} =\n[", names.tree);
    write_nodes(&mut out, &data.tree, 2);
    out.push_str("\n];\n\n");

    let _ = writeln!(out, "var {} =\n[", names.index);
    let boundaries = data
        .index
        .entries()
        .iter()
        .map(|e| quote(e.key(), '"'))
        .join(",\n");
    out.push_str(&boundaries);
    out.push_str("\n];\n");

    if data.sync_on_message.is_some() || data.sync_off_message.is_some() {
        out.push('\n');
    }
    if let Some(msg) = &data.sync_on_message {
        let _ = writeln!(out, "var {} = {};", names.sync_on, quote(msg, '\''));
    }
    if let Some(msg) = &data.sync_off_message {
        let _ = writeln!(out, "var {} = {};", names.sync_off, quote(msg, '\''));
    }
    out
}

/// Render a deferred child script `var <name> = [ ... ];`.
pub fn write_children_script(name: &str, nodes: &[NavNode]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "var {name} =\n[");
    write_nodes(&mut out, nodes, 4);
    out.push_str("\n];\n");
    out
}

/// Render a shard page `var <name> = { "href":[path], ... };`.
pub fn write_shard_page(name: &str, page: &ShardPage) -> String {
    let body = page
        .entries
        .iter()
        .map(|e| format!("{}:[{}]", quote(e.href.as_str(), '"'), e.path.iter().join(",")))
        .join(",\n");
    format!("var {name} =\n{{\n{body}\n}};\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Href;
    use crate::domain::script::Script;
    use crate::domain::shard::{KeyOrder, PageEntry, ShardEntry, ShardIndex};

    fn href(s: &str) -> Href {
        Href::parse(s).unwrap()
    }

    fn sample() -> NavData {
        let tree = vec![NavNode::with_children(
            "MODFLOW 6",
            href("index.html"),
            vec![
                NavNode::leaf("Todo List", href("todo.html")),
                NavNode::with_children(
                    "Modules",
                    href("namespaces.html"),
                    vec![NavNode::deferred(
                        "Modules List",
                        href("namespaces.html"),
                        "namespaces_dup",
                    )],
                ),
            ],
        )];
        let index = ShardIndex::new(
            vec![
                ShardEntry::new(href("_array_handlers_8f90.html")),
                ShardEntry::new(href("index.html#a1")),
            ],
            KeyOrder::Bytewise,
        )
        .unwrap();
        let mut data = NavData::new(tree, index, &ScriptNames::default()).unwrap();
        data.sync_on_message = Some("click to disable panel synchronisation".into());
        data.sync_off_message = Some("click to enable panel synchronisation".into());
        data
    }

    #[test]
    fn given_nav_data_when_writing_then_matches_generator_layout() {
        let expected = r#"var NAVTREE =
[
  [ "MODFLOW 6", "index.html", [
    [ "Todo List", "todo.html", null ],
    [ "Modules", "namespaces.html", [
      [ "Modules List", "namespaces.html", "namespaces_dup" ]
    ] ]
  ] ]
];

var NAVTREEINDEX =
[
"_array_handlers_8f90.html",
"index.html#a1"
];

var SYNCONMSG = 'click to disable panel synchronisation';
var SYNCOFFMSG = 'click to enable panel synchronisation';
"#;
        assert_eq!(write_nav_data(&sample(), &ScriptNames::default()), expected);
    }

    #[test]
    fn given_written_data_when_parsing_again_then_structurally_identical() {
        let data = sample();
        let names = ScriptNames::default();
        let reparsed = NavData::parse(&write_nav_data(&data, &names), &names, KeyOrder::Bytewise)
            .unwrap();
        assert_eq!(reparsed, data);
    }

    #[test]
    fn given_awkward_strings_when_quoting_then_parse_decodes_them_back() {
        for original in ["it's", "say \"hi\"", "back\\slash", "tab\there", "bell\u{7}", "ümlaut"] {
            for q in ['"', '\''] {
                let src = format!("var S = {};", quote(original, q));
                let script = Script::parse(&src).unwrap();
                assert_eq!(script.get("S").unwrap().as_str(), Some(original), "{src}");
            }
        }
    }

    #[test]
    fn given_shard_page_when_writing_then_emits_object_literal() {
        let page = ShardPage {
            entries: vec![
                PageEntry {
                    href: href("annotated.html"),
                    path: vec![2, 0],
                },
                PageEntry {
                    href: href("index.html"),
                    path: vec![],
                },
            ],
        };
        assert_eq!(
            write_shard_page("NAVTREEINDEX0", &page),
            "var NAVTREEINDEX0 =\n{\n\"annotated.html\":[2,0],\n\"index.html\":[]\n};\n"
        );
    }

    #[test]
    fn given_children_when_writing_script_then_declares_named_array() {
        let nodes = vec![NavNode::leaf("Alpha", href("alpha.html"))];
        let src = write_children_script("files_dup", &nodes);
        assert_eq!(src, "var files_dup =\n[\n    [ \"Alpha\", \"alpha.html\", null ]\n];\n");
        let script = Script::parse(&src).unwrap();
        assert_eq!(
            NavNode::list_from_literal(script.get("files_dup").unwrap(), "files_dup").unwrap(),
            nodes
        );
    }
}
