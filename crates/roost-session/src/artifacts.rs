//! Virtual file extraction from generated answers.
//!
//! Scans fenced code blocks in the raw answer text for file-path
//! labels, keeps a path → content map, and rebuilds a directory tree
//! from scratch on every update. Detection is best-effort: an explicit
//! label on the line before the fence wins over a `File:` comment on
//! the first line of the block.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Shape a candidate path must have: slash-separated segments of
/// word-ish characters, no whitespace
static PATH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+(?:/[\w.@+-]+)*$").expect("valid regex"));

/// `File:`-labelled comment on the first line of a block, across the
/// common comment syntaxes
static COMMENT_LABEL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?://|#|--|/\*|<!--)\s*file(?:name)?\s*:\s*(\S+?)\s*(?:\*/|-->)?\s*$")
        .expect("valid regex")
});

/// Filenames that are conventionally extension-less
const SPECIAL_NAMES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "LICENSE",
    "Procfile",
    "Gemfile",
    "Rakefile",
    "Justfile",
    "Vagrantfile",
];

/// Fallback root name when extracted paths do not share one
const SYNTHETIC_ROOT: &str = "project";

/// One extracted file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// One node of the virtual directory tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

/// Incrementally repopulated path → content map over the growing
/// answer text. `update` always rescans the full text, so the map and
/// tree self-heal from any ordering anomaly.
#[derive(Debug, Default)]
pub struct ArtifactExtractor {
    files: BTreeMap<String, String>,
}

impl ArtifactExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rescan the full answer text and rebuild the map
    pub fn update(&mut self, answer: &str) {
        self.files.clear();
        for block in scan_blocks(answer) {
            let path = match detect_path(&block) {
                Some(path) => path,
                None => continue,
            };
            self.insert(path, block.content);
        }
    }

    /// Snapshot of all extracted files, sorted by path
    pub fn files(&self) -> Vec<VirtualFile> {
        self.files
            .iter()
            .map(|(path, content)| VirtualFile {
                path: path.clone(),
                content: content.clone(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build the directory tree. When every path shares one first
    /// segment that segment is the root as-is; otherwise everything is
    /// nested under a synthetic root.
    pub fn tree(&self) -> Option<TreeNode> {
        if self.files.is_empty() {
            return None;
        }

        let shared = self.files.keys().next()?.split('/').next()?;
        // Every path starts with the same segment, and that segment is
        // a directory for all of them (a lone top-level file gets the
        // synthetic root)
        let rooted = self
            .files
            .keys()
            .all(|path| path.contains('/') && path.split('/').next() == Some(shared));

        let mut root = if rooted {
            TreeNode {
                name: shared.to_string(),
                kind: NodeKind::Folder,
                children: Vec::new(),
            }
        } else {
            TreeNode {
                name: SYNTHETIC_ROOT.to_string(),
                kind: NodeKind::Folder,
                children: Vec::new(),
            }
        };

        for path in self.files.keys() {
            let segments: Vec<&str> = path.split('/').collect();
            let rest = if rooted { &segments[1..] } else { &segments[..] };
            insert_path(&mut root, rest);
        }
        sort_children(&mut root);
        Some(root)
    }

    /// Apply the stale-duplicate rules and store the entry
    fn insert(&mut self, path: String, content: String) {
        let (dir, name) = split_dir(&path);

        if !has_extension(name) && !is_special(name) {
            // An extensioned sibling with the same stem already covers
            // this file; the bare label is a stale duplicate
            let shadowed = self.files.keys().any(|existing| {
                let (edir, ename) = split_dir(existing);
                edir == dir && has_extension(ename) && stem(ename) == name
            });
            if shadowed {
                return;
            }
        } else if has_extension(name) {
            // The reverse order: drop a previously stored bare twin
            let bare = if dir.is_empty() {
                stem(name).to_string()
            } else {
                format!("{dir}/{}", stem(name))
            };
            if !is_special(stem(name)) {
                self.files.remove(&bare);
            }
        }

        self.files.insert(path, content);
    }
}

struct Block {
    /// Last non-blank line before the opening fence, if any
    label: Option<String>,
    content: String,
}

/// Walk the text line by line collecting fenced code blocks together
/// with the non-blank line preceding each fence
fn scan_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut label: Option<String> = None;
    let mut body: Option<Vec<&str>> = None;

    for line in text.lines() {
        let fence = line.trim_start().starts_with("```");
        match body.as_mut() {
            Some(lines) => {
                if fence {
                    blocks.push(Block {
                        label: label.take(),
                        content: lines.join("\n"),
                    });
                    body = None;
                } else {
                    lines.push(line);
                }
            }
            None => {
                if fence {
                    body = Some(Vec::new());
                } else if !line.trim().is_empty() {
                    label = Some(line.trim().to_string());
                }
            }
        }
    }
    // An unterminated trailing fence is still streaming; skip it
    blocks
}

/// Marker on the preceding line wins; a `File:` comment on the first
/// line of the block is the fallback
fn detect_path(block: &Block) -> Option<String> {
    if let Some(label) = block.label.as_deref() {
        if let Some(path) = marker_path(label) {
            return Some(path);
        }
    }
    let first_line = block.content.lines().next()?;
    comment_path(first_line)
}

/// Parse an explicit label line: `File: <path>` (bare or formatted),
/// or a formatted path on its own (`**src/app.js**`, `` `Makefile` ``,
/// `### src/app.js`)
fn marker_path(line: &str) -> Option<String> {
    let mut text = line.trim();
    text = text.trim_start_matches('#').trim();
    text = text
        .strip_prefix("**")
        .and_then(|t| t.strip_suffix("**"))
        .unwrap_or(text);
    text = text
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text);
    let text = text.trim().trim_end_matches(':').trim();

    let labelled = text
        .to_lowercase()
        .starts_with("file:")
        .then(|| text[5..].trim().to_string())
        .or_else(|| {
            text.to_lowercase()
                .starts_with("filename:")
                .then(|| text[9..].trim().to_string())
        });

    if let Some(candidate) = labelled {
        return PATH_PATTERN.is_match(&candidate).then_some(candidate);
    }

    // Without an explicit label the token must clearly look like a
    // file: a separator, an extension, or a known special name
    let formatted = line.trim() != text;
    let file_like =
        text.contains('/') || has_extension(text.rsplit('/').next()?) || is_special(text);
    (formatted && file_like && PATH_PATTERN.is_match(text)).then(|| text.to_string())
}

fn comment_path(line: &str) -> Option<String> {
    let captures = COMMENT_LABEL_PATTERN.captures(line)?;
    let candidate = captures.get(1)?.as_str();
    PATH_PATTERN.is_match(candidate).then(|| candidate.to_string())
}

fn split_dir(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

fn has_extension(name: &str) -> bool {
    match name.rfind('.') {
        Some(0) | None => false,
        Some(_) => true,
    }
}

fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

fn is_special(name: &str) -> bool {
    SPECIAL_NAMES.contains(&name)
}

fn insert_path(root: &mut TreeNode, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let kind = if rest.is_empty() {
        NodeKind::File
    } else {
        NodeKind::Folder
    };

    let idx = root
        .children
        .iter()
        .position(|c| c.name == *first && c.kind == kind);
    let idx = match idx {
        Some(idx) => idx,
        None => {
            root.children.push(TreeNode {
                name: (*first).to_string(),
                kind,
                children: Vec::new(),
            });
            root.children.len() - 1
        }
    };
    insert_path(&mut root.children[idx], rest);
}

fn sort_children(node: &mut TreeNode) {
    node.children.sort_by(|a, b| {
        let rank = |n: &TreeNode| match n.kind {
            NodeKind::Folder => 0,
            NodeKind::File => 1,
        };
        rank(a).cmp(&rank(b)).then_with(|| a.name.cmp(&b.name))
    });
    for child in &mut node.children {
        sort_children(child);
    }
}
