//! Parser for the indentation-structured status dump printed by the VLM
//! console's `show <name>` command.
//!
//! ```text
//! show
//!     shows
//!         type : broadcast
//!         inputs
//!             1 : file:///media/a.mkv
//!             2 : file:///media/b.mkv
//!         instances
//!             instance
//!                 state : playing
//!                 playlistindex : 1
//! >
//! ```
//!
//! Nesting depth is the width of the leading whitespace divided by
//! [`INDENT_UNIT`]. A line is `key: value` when it contains a colon and a bare
//! key otherwise. A bare key (or a key with nothing after the colon) becomes a
//! subtree when the following line is indented deeper.

use std::collections::BTreeMap;

use crate::error::AutoplayError;

pub const INDENT_UNIT: usize = 4;

/// Lines at this depth or shallower are the echoed command and the object
/// name, not part of the object's status.
const BANNER_DEPTH: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusValue {
    /// A bare key with no children.
    Empty,
    Scalar(String),
    Tree(StatusTree),
}

impl StatusValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            StatusValue::Scalar(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&StatusTree> {
        match self {
            StatusValue::Tree(tree) => Some(tree),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTree {
    entries: BTreeMap<String, StatusValue>,
}

impl StatusTree {
    /// Parses a `show` response, dropping the banner lines and the prompt.
    pub fn parse_show(command: &str, response: &str) -> Result<Self, AutoplayError> {
        parse_lines(command, response, Some(BANNER_DEPTH))
    }

    /// Parses an indented document where every non-blank line is data.
    pub fn parse(command: &str, text: &str) -> Result<Self, AutoplayError> {
        parse_lines(command, text, None)
    }

    pub fn get(&self, key: &str) -> Option<&StatusValue> {
        self.entries.get(key)
    }

    /// Follows a dot-separated path such as `instances.instance.state`.
    pub fn lookup(&self, path: &str) -> Option<&StatusValue> {
        let mut keys = path.split('.');
        let mut value = self.entries.get(keys.next()?)?;
        for key in keys {
            value = value.as_tree()?.entries.get(key)?;
        }
        Some(value)
    }

    pub fn scalar(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(StatusValue::as_scalar)
    }

    /// Number of children under `path`; zero when the path is absent or does
    /// not hold a subtree.
    pub fn count(&self, path: &str) -> usize {
        self.lookup(path)
            .and_then(StatusValue::as_tree)
            .map_or(0, StatusTree::len)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatusValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn insert(&mut self, key: String, value: StatusValue) {
        self.entries.insert(key, value);
    }
}

/// An open scope: the subtree being filled and the key it will be stored
/// under in its parent.
struct Scope {
    depth: usize,
    key: String,
    tree: StatusTree,
}

fn parse_lines(command: &str, text: &str, skip_through: Option<usize>) -> Result<StatusTree, AutoplayError> {
    let mut root = StatusTree::default();
    let mut root_depth: Option<usize> = None;
    let mut scopes: Vec<Scope> = Vec::new();
    let mut previous: Option<(usize, String)> = None;

    for raw in text.lines() {
        let line = raw.trim_end();
        let content = line.trim_start();
        if content.is_empty() {
            continue;
        }
        let depth = (line.len() - content.len()) / INDENT_UNIT;
        if skip_through.is_some_and(|banner| depth <= banner) {
            continue;
        }
        let root_depth = *root_depth.get_or_insert(depth);

        if let Some((last_depth, last_key)) = previous.take() {
            if depth > last_depth {
                let current = scopes.last().map_or(&root, |scope| &scope.tree);
                if let Some(StatusValue::Scalar(value)) = current.get(&last_key) {
                    return Err(AutoplayError::protocol_parse(
                        command,
                        format!("depth {depth}"),
                        format!("{content:?} is nested under `{last_key}`, which already holds {value:?}"),
                    ));
                }
                scopes.push(Scope {
                    depth,
                    key: last_key,
                    tree: StatusTree::default(),
                });
            } else {
                close_scopes(&mut root, &mut scopes, |scope_depth| scope_depth > depth.max(root_depth));
            }
        }

        let (key, value) = split_entry(content);
        let current = scopes.last_mut().map_or(&mut root, |scope| &mut scope.tree);
        current.insert(key.clone(), value);
        previous = Some((depth, key));
    }

    close_scopes(&mut root, &mut scopes, |_| true);
    Ok(root)
}

/// Pops every innermost scope for which `should_close` holds, attaching each
/// to its parent.
fn close_scopes(root: &mut StatusTree, scopes: &mut Vec<Scope>, should_close: impl Fn(usize) -> bool) {
    while scopes.last().is_some_and(|scope| should_close(scope.depth)) {
        let Some(scope) = scopes.pop() else { break };
        let parent = scopes.last_mut().map_or(&mut *root, |outer| &mut outer.tree);
        parent.insert(scope.key, StatusValue::Tree(scope.tree));
    }
}

fn split_entry(content: &str) -> (String, StatusValue) {
    match content.split_once(':') {
        Some((key, value)) => {
            let value = value.trim();
            let value = if value.is_empty() {
                StatusValue::Empty
            } else {
                StatusValue::Scalar(value.to_string())
            };
            (key.trim().to_string(), value)
        }
        None => (content.to_string(), StatusValue::Empty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOW_RESPONSE: &str = concat!(
        "show\r\n",
        "    shows\r\n",
        "        type : broadcast\r\n",
        "        enabled : yes\r\n",
        "        inputs\r\n",
        "            1 : file:///media/shows/a.mkv\r\n",
        "            2 : file:///media/shows/b.mkv\r\n",
        "            3 : file:///media/shows/c.mkv\r\n",
        "        output : \r\n",
        "        options\r\n",
        "        instances\r\n",
        "            instance\r\n",
        "                name : default\r\n",
        "                state : playing\r\n",
        "                playlistindex : 1\r\n",
        "> ",
    );

    fn scalar(text: &str) -> StatusValue {
        StatusValue::Scalar(text.to_string())
    }

    #[test]
    fn test_parse_nested_document() {
        let tree = StatusTree::parse("show", "a:\n    b: 1\n    c:\n        d: 2\n").unwrap();

        let mut c = StatusTree::default();
        c.insert("d".to_string(), scalar("2"));
        let mut a = StatusTree::default();
        a.insert("b".to_string(), scalar("1"));
        a.insert("c".to_string(), StatusValue::Tree(c));
        let mut expected = StatusTree::default();
        expected.insert("a".to_string(), StatusValue::Tree(a));

        assert_eq!(tree, expected);
    }

    #[test]
    fn test_parse_show_response() {
        let tree = StatusTree::parse_show("show shows", SHOW_RESPONSE).unwrap();
        assert_eq!(tree.scalar("type"), Some("broadcast"));
        assert_eq!(tree.count("inputs"), 3);
        assert_eq!(tree.scalar("inputs.2"), Some("file:///media/shows/b.mkv"));
        assert_eq!(tree.get("output"), Some(&StatusValue::Empty));
        assert_eq!(tree.get("options"), Some(&StatusValue::Empty));
        assert_eq!(tree.scalar("instances.instance.state"), Some("playing"));
        assert_eq!(tree.scalar("instances.instance.playlistindex"), Some("1"));
        assert!(tree.get(">").is_none(), "prompt must not become a key");
    }

    #[test]
    fn test_scalar_values_keep_inner_colons() {
        let tree = StatusTree::parse("show", "url : http://host:8080/x\n").unwrap();
        assert_eq!(tree.scalar("url"), Some("http://host:8080/x"));
    }

    #[test]
    fn test_nesting_under_scalar_is_rejected() {
        let err = StatusTree::parse("show shows", "a: 1\n    b: 2\n").unwrap_err();
        match err {
            AutoplayError::ProtocolParse { command, state, detail } => {
                assert_eq!(command, "show shows");
                assert_eq!(state, "depth 1");
                assert!(detail.contains("`a`"), "detail should name the key: {detail}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dedent_closes_several_scopes() {
        let text = "x\n    y\n        z\n            leaf: 1\nw: 2\n";
        let tree = StatusTree::parse("show", text).unwrap();
        assert_eq!(tree.scalar("x.y.z.leaf"), Some("1"));
        assert_eq!(tree.scalar("w"), Some("2"), "w belongs to the root after a three-level dedent");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let text = "a\n\n    b: 1\n   \n    c: 2\n";
        let tree = StatusTree::parse("show", text).unwrap();
        assert_eq!(tree.count("a"), 2);
    }

    #[test]
    fn test_missing_paths_are_none() {
        let tree = StatusTree::parse_show("show shows", SHOW_RESPONSE).unwrap();
        assert!(tree.lookup("instances.other.state").is_none());
        assert!(tree.scalar("type.deeper").is_none());
        assert_eq!(tree.count("missing"), 0);
        assert_eq!(tree.count("options"), 0);
    }

    #[test]
    fn test_banner_only_response_is_empty() {
        let tree = StatusTree::parse_show("show shows", "show\r\n    shows\r\n> ").unwrap();
        assert!(tree.is_empty());
    }
}
