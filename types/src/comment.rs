//! Threaded comments.
//!
//! The backend returns comments as flat rows with an optional `parent_id`.
//! [`CommentThread::from_rows`] assembles them into a forest that renderers
//! walk depth-first.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeedItem, ItemId, Profile, VoteTally};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: ItemId,
    pub post_id: ItemId,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    pub author: Profile,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub votes: VoteTally,
}

impl FeedItem for Comment {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentNode {
    pub comment: Comment,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    #[must_use]
    pub fn leaf(comment: Comment) -> Self {
        Self {
            comment,
            children: Vec::new(),
        }
    }

    /// Number of comments in this subtree, including this one.
    #[must_use]
    pub fn len(&self) -> usize {
        let mut stack = vec![self];
        let mut count = 0;
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(&node.children);
        }
        count
    }

    fn find_mut(&mut self, id: &ItemId) -> Option<&mut CommentNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if &node.comment.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter_mut());
        }
        None
    }
}

// Reply chains can be arbitrarily deep; unlink them level by level.
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// All comments of one post as a forest of reply trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentThread {
    roots: Vec<CommentNode>,
}

impl CommentThread {
    /// Build the forest from flat rows.
    ///
    /// Siblings are ordered by `created_at` (stable for ties). Rows whose parent
    /// is not present are promoted to roots, and rows caught in a parent cycle
    /// are promoted in input order so nothing is silently dropped.
    #[must_use]
    pub fn from_rows(mut rows: Vec<Comment>) -> Self {
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let ids: HashSet<ItemId> = rows.iter().map(|c| c.id.clone()).collect();
        let mut children: HashMap<ItemId, Vec<Comment>> = HashMap::new();
        let mut root_rows = Vec::new();
        let mut order = Vec::with_capacity(rows.len());

        for row in rows {
            order.push(row.id.clone());
            match &row.parent_id {
                Some(parent) if ids.contains(parent) && parent != &row.id => {
                    children.entry(parent.clone()).or_default().push(row);
                }
                _ => root_rows.push(row),
            }
        }

        let mut visited = HashSet::new();
        let mut roots = Vec::with_capacity(root_rows.len());
        for row in root_rows {
            attach(row, &mut children, &mut visited, &mut roots);
        }

        // Whatever is left is only reachable through a cycle.
        for id in order {
            if visited.contains(&id) {
                continue;
            }
            let orphan = children
                .values_mut()
                .find_map(|siblings| {
                    siblings
                        .iter()
                        .position(|c| c.id == id)
                        .map(|pos| siblings.remove(pos))
                });
            if let Some(row) = orphan {
                attach(row, &mut children, &mut visited, &mut roots);
            }
        }

        Self { roots }
    }

    #[must_use]
    pub fn roots(&self) -> &[CommentNode] {
        &self.roots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roots.iter().map(CommentNode::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Insert a comment the viewer just created.
    ///
    /// Top-level comments go first; replies are appended under their parent.
    /// A reply whose parent is unknown becomes a root.
    pub fn insert(&mut self, comment: Comment) {
        if let Some(parent) = comment.parent_id.clone()
            && let Some(node) = self.roots.iter_mut().find_map(|r| r.find_mut(&parent))
        {
            node.children.push(CommentNode::leaf(comment));
            return;
        }
        self.roots.insert(0, CommentNode::leaf(comment));
    }

    /// Remove a comment and its replies. Returns the removed subtree.
    pub fn remove(&mut self, id: &ItemId) -> Option<CommentNode> {
        remove_from(&mut self.roots, id)
    }

    /// Depth-first traversal yielding `(depth, comment)`, roots at depth 0.
    #[must_use]
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            stack: self.roots.iter().rev().map(|node| (0, node)).collect(),
        }
    }
}

/// Build the subtree under `row` and push it onto `out`.
///
/// Works off an explicit stack so reply depth is bounded by the heap, not
/// the call stack.
fn attach(
    row: Comment,
    children: &mut HashMap<ItemId, Vec<Comment>>,
    visited: &mut HashSet<ItemId>,
    out: &mut Vec<CommentNode>,
) {
    let mut open = |row: Comment| {
        visited.insert(row.id.clone());
        let replies = children.remove(&row.id).unwrap_or_default();
        (CommentNode::leaf(row), replies.into_iter())
    };

    let mut stack = vec![open(row)];
    while let Some((_, replies)) = stack.last_mut() {
        if let Some(reply) = replies.next() {
            let frame = open(reply);
            stack.push(frame);
            continue;
        }
        let Some((done, _)) = stack.pop() else {
            break;
        };
        match stack.last_mut() {
            Some((parent, _)) => parent.children.push(done),
            None => out.push(done),
        }
    }
}

fn remove_from(nodes: &mut Vec<CommentNode>, id: &ItemId) -> Option<CommentNode> {
    let mut stack = vec![nodes];
    while let Some(siblings) = stack.pop() {
        if let Some(pos) = siblings.iter().position(|c| &c.comment.id == id) {
            return Some(siblings.remove(pos));
        }
        stack.extend(siblings.iter_mut().map(|c| &mut c.children));
    }
    None
}

pub struct DepthFirst<'a> {
    stack: Vec<(usize, &'a CommentNode)>,
}

impl<'a> Iterator for DepthFirst<'a> {
    type Item = (usize, &'a Comment);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, &node.comment))
    }
}
