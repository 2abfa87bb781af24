//! The mutable build-time tree and its immutable, cross-worker-shared
//! counterpart.
//!
//! Registration builds a chain of [`BuildNode`]s per call to
//! [`super::Router::register`], using `Rc<RefCell<_>>` so that an
//! alternation segment (`[a|b]`) can make two fixed-map keys alias the
//! same child — a single in-flight mutable tree, built on one thread.
//! `Rc`/`RefCell` are `!Send`/`!Sync`, so before the router can be handed
//! to the per-core workers it is frozen into [`FrozenNode`]s behind `Arc`,
//! which is `Send + Sync` over immutable data. Freezing walks the tree
//! once and memoizes by `Rc::as_ptr()` identity, so any subtree shared by
//! an alternation stays shared after the freeze instead of being
//! duplicated.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::router::Handler;

/// What kind of value a dynamic segment accepts, in the order it was
/// registered (first match wins, scanned after the fixed map misses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DynKind {
    /// `#` — every byte of the segment must be an ASCII digit, and the
    /// segment must be non-empty.
    Numeric,
    /// `*` — matches any segment, including an empty one.
    Wildcard,
}

impl DynKind {
    #[inline]
    pub(crate) fn matches(self, segment: &[u8]) -> bool {
        match self {
            DynKind::Numeric => !segment.is_empty() && segment.iter().all(|b| b.is_ascii_digit()),
            DynKind::Wildcard => true,
        }
    }
}

/// One node of the mutable, single-threaded build tree.
#[derive(Default)]
pub(crate) struct BuildNode {
    pub(crate) fixed: HashMap<String, Rc<RefCell<BuildNode>>>,
    pub(crate) dynamic: Vec<(DynKind, Rc<RefCell<BuildNode>>)>,
    pub(crate) handler: Option<Arc<Handler>>,
}

impl BuildNode {
    pub(crate) fn new_rc() -> Rc<RefCell<BuildNode>> {
        Rc::new(RefCell::new(BuildNode::default()))
    }
}

/// One node of the frozen, read-only tree shared across worker threads.
pub(crate) struct FrozenNode {
    pub(crate) fixed: HashMap<Box<[u8]>, Arc<FrozenNode>>,
    pub(crate) dynamic: Vec<(DynKind, Arc<FrozenNode>)>,
    pub(crate) handler: Option<Arc<Handler>>,
}

/// A single route-template segment, classified the way the source's
/// `appendStage` inspects only the leading (and, for alternation, the
/// trailing) byte of the segment rather than requiring an exact pattern.
pub(crate) enum Segment<'a> {
    Alternation(Vec<&'a str>),
    Numeric,
    Wildcard,
    Fixed(&'a str),
}

pub(crate) fn classify(part: &str) -> Segment<'_> {
    let bytes = part.as_bytes();
    if bytes.first() == Some(&b'[') && bytes.last() == Some(&b']') {
        let inner = &part[1..part.len() - 1];
        return Segment::Alternation(inner.split('|').collect());
    }
    match bytes.first() {
        Some(b'#') => Segment::Numeric,
        Some(b'*') => Segment::Wildcard,
        _ => Segment::Fixed(part),
    }
}

/// Extends a build chain by one template segment, attaching a fresh child
/// to `current` and returning it as the new chain tip.
pub(crate) fn append_stage(current: &Rc<RefCell<BuildNode>>, part: &str) -> Rc<RefCell<BuildNode>> {
    match classify(part) {
        Segment::Fixed(literal) => {
            let child = BuildNode::new_rc();
            current
                .borrow_mut()
                .fixed
                .insert(literal.to_string(), child.clone());
            child
        }
        Segment::Alternation(options) => {
            let child = BuildNode::new_rc();
            let mut node = current.borrow_mut();
            for option in options {
                node.fixed.insert(option.to_string(), child.clone());
            }
            drop(node);
            child
        }
        Segment::Numeric => {
            let child = BuildNode::new_rc();
            current
                .borrow_mut()
                .dynamic
                .push((DynKind::Numeric, child.clone()));
            child
        }
        Segment::Wildcard => {
            let child = BuildNode::new_rc();
            current
                .borrow_mut()
                .dynamic
                .push((DynKind::Wildcard, child.clone()));
            child
        }
    }
}

/// Splices a freshly built one-path chain (`source`) into an existing
/// tree (`target`), recursing into subtrees the two already share.
///
/// Mirrors the source's `mergeBranch` exactly, including its one sharp
/// edge: `target`'s handler and matcher are unconditionally overwritten
/// with `source`'s at *every* level the recursion visits — not only the
/// leaf. Registering `/foo/bar` after `/foo` silently clears the handler
/// that `/foo` alone installed, because the fresh chain's intermediate
/// "foo" node has no handler of its own. This is surprising but is the
/// documented, intentional behavior rather than an oversight: routes that
/// share a literal prefix with a registered leaf must be registered
/// bottom-up, or the prefix route must be re-registered last.
pub(crate) fn merge_branch(target: &Rc<RefCell<BuildNode>>, source: &Rc<RefCell<BuildNode>>) {
    let (fixed_entries, handler, dynamic) = {
        let source_ref = source.borrow();
        (
            source_ref
                .fixed
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Vec<_>>(),
            source_ref.handler.clone(),
            source_ref.dynamic.clone(),
        )
    };

    for (key, child) in fixed_entries {
        let existing = target.borrow().fixed.get(&key).cloned();
        match existing {
            Some(existing_child) => merge_branch(&existing_child, &child),
            None => {
                target.borrow_mut().fixed.insert(key, child);
            }
        }
    }

    let mut target_mut = target.borrow_mut();
    target_mut.handler = handler;
    target_mut.dynamic.extend(dynamic);
}

/// Freezes a build-tree root into an immutable, `Arc`-shared tree,
/// preserving any subtree aliasing introduced by alternation segments.
pub(crate) fn freeze(
    node: &Rc<RefCell<BuildNode>>,
    memo: &mut HashMap<*const RefCell<BuildNode>, Arc<FrozenNode>>,
) -> Arc<FrozenNode> {
    let ptr = Rc::as_ptr(node);
    if let Some(existing) = memo.get(&ptr) {
        return existing.clone();
    }

    let borrowed = node.borrow();
    let mut fixed = HashMap::with_capacity(borrowed.fixed.len());
    for (key, child) in borrowed.fixed.iter() {
        fixed.insert(key.as_bytes().to_vec().into_boxed_slice(), freeze(child, memo));
    }
    let mut dynamic = Vec::with_capacity(borrowed.dynamic.len());
    for (kind, child) in borrowed.dynamic.iter() {
        dynamic.push((*kind, freeze(child, memo)));
    }
    let handler = borrowed.handler.clone();
    drop(borrowed);

    let frozen = Arc::new(FrozenNode {
        fixed,
        dynamic,
        handler,
    });
    memo.insert(ptr, frozen.clone());
    frozen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_all_kinds() {
        assert!(matches!(classify("foo"), Segment::Fixed("foo")));
        assert!(matches!(classify("#"), Segment::Numeric));
        assert!(matches!(classify("#anything"), Segment::Numeric));
        assert!(matches!(classify("*"), Segment::Wildcard));
        assert!(matches!(classify("[a|b|c]"), Segment::Alternation(_)));
    }

    #[test]
    fn alternation_options_split_on_pipe() {
        match classify("[first|second]") {
            Segment::Alternation(opts) => assert_eq!(opts, vec!["first", "second"]),
            _ => panic!("expected alternation"),
        }
    }

    #[test]
    fn numeric_rejects_empty_and_non_digits() {
        assert!(DynKind::Numeric.matches(b"12345"));
        assert!(!DynKind::Numeric.matches(b""));
        assert!(!DynKind::Numeric.matches(b"12a"));
    }

    #[test]
    fn wildcard_matches_anything() {
        assert!(DynKind::Wildcard.matches(b""));
        assert!(DynKind::Wildcard.matches(b"whatever/ish"));
    }

    #[test]
    fn alternation_aliases_share_one_child() {
        let root = BuildNode::new_rc();
        let child = append_stage(&root, "[a|b]");
        let root_ref = root.borrow();
        assert!(Rc::ptr_eq(root_ref.fixed.get("a").unwrap(), root_ref.fixed.get("b").unwrap()));
        assert!(Rc::ptr_eq(root_ref.fixed.get("a").unwrap(), &child));
    }

    #[test]
    fn merge_overwrites_intermediate_handler() {
        let root = BuildNode::new_rc();
        let foo = append_stage(&root, "foo");
        foo.borrow_mut().handler = Some(Arc::new(|_req, _res| Ok(())) as Arc<Handler>);

        let fresh_root = BuildNode::new_rc();
        let fresh_foo = append_stage(&fresh_root, "foo");
        let fresh_bar = append_stage(&fresh_foo, "bar");
        fresh_bar.borrow_mut().handler = Some(Arc::new(|_req, _res| Ok(())) as Arc<Handler>);

        merge_branch(&root, &fresh_root);

        let root_ref = root.borrow();
        let foo_after = root_ref.fixed.get("foo").unwrap();
        assert!(foo_after.borrow().handler.is_none());
        assert!(foo_after.borrow().fixed.get("bar").unwrap().borrow().handler.is_some());
    }
}
