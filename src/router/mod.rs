//! The per-method route trie: registration-time tree building and
//! request-time lookup.
//!
//! A [`Router`] is mutable and single-threaded: every call to
//! [`Router::register`] parses a route template (`@METHOD/literal/[a|b]/#/*`)
//! into a fresh one-segment-per-node chain and splices it into the
//! appropriate method root(s). [`Router::freeze`] converts the tree into a
//! [`RouteTree`], an immutable structure cheap to clone (an array of
//! `Arc`s) that every worker thread holds its own copy of.

mod node;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use node::{append_stage, freeze, merge_branch, BuildNode, FrozenNode};

use crate::error::RouterError;
use crate::method::{Method, METHOD_COUNT};
use crate::request::Request;
use crate::response::Response;

/// The error type a handler may return; not part of the typed error
/// taxonomy in [`crate::error`] because handler failures are
/// application-defined. A handler that returns `Err` causes the
/// dispatcher to render a 500 response (§4.4).
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// The shape every registered route handler must have.
pub type Handler = dyn Fn(Request, &mut Response) -> HandlerResult + Send + Sync;

fn drop_empty<'a>(parts: &'a [&'a str]) -> &'a [&'a str] {
    let mut start = 0;
    while start < parts.len() && parts[start].is_empty() {
        start += 1;
    }
    &parts[start..]
}

/// Strips a leading `@METHOD` guard segment, if present, returning the
/// matched method (or [`Method::Unknown`] if there was no guard, or the
/// guard token didn't name a known method — both cases fall back to
/// "every method" at registration, per [`Method`]'s sentinel double-duty).
fn strip_method_guard<'a>(parts: &'a [&'a str]) -> (&'a [&'a str], Method) {
    match parts.first() {
        Some(first) if first.starts_with('@') && first.len() > 1 => {
            (&parts[1..], Method::recognize_guard(&first[1..]))
        }
        _ => (parts, Method::Unknown),
    }
}

/// The mutable, single-threaded route builder.
pub struct Router {
    roots: [Rc<std::cell::RefCell<BuildNode>>; METHOD_COUNT],
    started: Cell<bool>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            roots: std::array::from_fn(|_| BuildNode::new_rc()),
            started: Cell::new(false),
        }
    }

    /// Registers `handler` for `pattern`.
    ///
    /// `pattern` uses the route template grammar: an optional leading
    /// `@METHOD` guard, then `/`-separated segments each either a literal,
    /// an alternation `[a|b|c]`, a numeric wildcard `#`, or a free
    /// wildcard `*`. Registering two routes that share a literal prefix,
    /// where the shorter one is registered first, silently clears the
    /// shorter route's handler — see [`node::merge_branch`].
    ///
    /// Returns [`RouterError::AlreadyServing`] if called after
    /// [`Router::freeze`] has already run.
    pub fn register<F>(&self, pattern: &str, handler: F) -> Result<(), RouterError>
    where
        F: Fn(Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        if self.started.get() {
            return Err(RouterError::AlreadyServing);
        }

        let parts: Vec<&str> = pattern.split('/').collect();
        let parts = drop_empty(&parts);
        let (parts, method_guard) = strip_method_guard(parts);
        let parts = drop_empty(parts);

        let chain_root = BuildNode::new_rc();
        let mut current = chain_root.clone();
        for part in parts {
            current = append_stage(&current, part);
        }
        current.borrow_mut().handler = Some(Arc::new(handler) as Arc<Handler>);

        if method_guard != Method::Unknown {
            merge_branch(&self.roots[method_guard.as_index()], &chain_root);
        } else {
            for root in &self.roots {
                merge_branch(root, &chain_root);
            }
        }
        Ok(())
    }

    /// Freezes the tree into an immutable, cheaply cloneable [`RouteTree`]
    /// and marks this router closed to further registration.
    pub fn freeze(&self) -> RouteTree {
        self.started.set(true);
        let mut memo: HashMap<*const std::cell::RefCell<BuildNode>, Arc<FrozenNode>> =
            HashMap::new();
        let roots = std::array::from_fn(|i| freeze(&self.roots[i], &mut memo));
        RouteTree { roots }
    }
}

/// An immutable route tree, one per worker thread (cheap to `Clone`: it's
/// an array of `Arc`s over a tree built once at startup).
#[derive(Clone)]
pub struct RouteTree {
    roots: [Arc<FrozenNode>; METHOD_COUNT],
}

impl RouteTree {
    /// Finds the handler for `method`/`path`, or `None` for a 404.
    ///
    /// `path` is the raw request-line path view, leading slash included.
    /// The root path (`"/"`, or an empty path) resolves directly to the
    /// method root's own handler without entering the segment loop;
    /// every other path is split on `/` after the leading slash is
    /// stripped, so a trailing slash (`"/foo/"`) produces a trailing
    /// empty segment distinct from `"/foo"`.
    pub fn find(&self, method: Method, path: &[u8]) -> Option<Arc<Handler>> {
        let root = &self.roots[method.as_index()];
        if path.len() <= 1 {
            return root.handler.clone();
        }

        let mut node = root;
        for segment in path[1..].split(|&b| b == b'/') {
            if let Some(child) = node.fixed.get(segment) {
                node = child;
                continue;
            }
            match node.dynamic.iter().find(|(kind, _)| kind.matches(segment)) {
                Some((_, child)) => node = child,
                None => return None,
            }
        }
        node.handler.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_handler(_req: Request, _res: &mut Response) -> HandlerResult {
        Ok(())
    }

    #[test]
    fn root_path_resolves_without_segments() {
        let router = Router::new();
        router.register("@GET/", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/").is_some());
    }

    #[test]
    fn no_guard_registers_for_every_method() {
        let router = Router::new();
        router.register("/ping", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/ping").is_some());
        assert!(tree.find(Method::Post, b"/ping").is_some());
        assert!(tree.find(Method::Delete, b"/ping").is_some());
    }

    #[test]
    fn method_guard_restricts_to_one_method() {
        let router = Router::new();
        router.register("@POST/submit", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Post, b"/submit").is_some());
        assert!(tree.find(Method::Get, b"/submit").is_none());
    }

    #[test]
    fn numeric_wildcard_matches_digits_only() {
        let router = Router::new();
        router.register("@GET/item/#", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/item/42").is_some());
        assert!(tree.find(Method::Get, b"/item/abc").is_none());
    }

    #[test]
    fn free_wildcard_matches_anything() {
        let router = Router::new();
        router.register("@GET/greet/*", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/greet/world").is_some());
        assert!(tree.find(Method::Get, b"/greet/").is_some());
    }

    #[test]
    fn alternation_matches_any_option() {
        let router = Router::new();
        router.register("@GET/color/[red|green|blue]", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/color/red").is_some());
        assert!(tree.find(Method::Get, b"/color/blue").is_some());
        assert!(tree.find(Method::Get, b"/color/purple").is_none());
    }

    #[test]
    fn fixed_beats_dynamic_on_overlap() {
        // registration order: dynamic first, then the literal that should
        // still win because fixed-map lookup happens before dynamic scan.
        let router = Router::new();
        router.register("@GET/item/#", |_req, res: &mut Response| {
            res.status(200);
            Ok(())
        }).unwrap();
        router.register("@GET/item/featured", |_req, res: &mut Response| {
            res.status(201);
            Ok(())
        }).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/item/featured").is_some());
        assert!(tree.find(Method::Get, b"/item/123").is_some());
        assert!(tree.find(Method::Get, b"/item/abc").is_none());
    }

    #[test]
    fn trailing_slash_is_a_distinct_path() {
        let router = Router::new();
        router.register("@GET/foo", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/foo").is_some());
        assert!(tree.find(Method::Get, b"/foo/").is_none());
    }

    #[test]
    fn unmatched_path_is_none() {
        let router = Router::new();
        router.register("@GET/foo", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/bar").is_none());
    }

    #[test]
    fn register_after_freeze_is_rejected() {
        let router = Router::new();
        router.register("@GET/foo", ok_handler).unwrap();
        let _tree = router.freeze();
        let result = router.register("@GET/bar", ok_handler);
        assert_eq!(result, Err(RouterError::AlreadyServing));
    }

    #[test]
    fn shorter_prefix_handler_is_cleared_by_longer_registration() {
        // documents the merge-overwrite quirk inherited from the source.
        let router = Router::new();
        router.register("@GET/foo", ok_handler).unwrap();
        router.register("@GET/foo/bar", ok_handler).unwrap();
        let tree = router.freeze();
        assert!(tree.find(Method::Get, b"/foo").is_none());
        assert!(tree.find(Method::Get, b"/foo/bar").is_some());
    }
}
