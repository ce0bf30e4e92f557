//! The prefix tree behind [`Router`](super::Router).
//!
//! Every node owns one level of the path. Children are looked up with a fixed priority:
//! static segments first, then the node's single parameter child, then its wildcard child.
//! Lookup backtracks, so a static branch that fails deeper down still lets a parameter or
//! wildcard branch match.

use super::Route;
use super::pattern::{Segment, WILDCARD, tail};
use crate::error::RouteError;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    statics: HashMap<String, Node>,
    param: Option<Box<ParamChild>>,
    wildcard: Option<Box<Node>>,
    routes: HashMap<Method, Arc<Route>>,
}

#[derive(Debug, Clone)]
struct ParamChild {
    name: String,
    node: Node,
}

/// A value captured while walking the tree: the parameter name and the raw (undecoded) value.
pub(crate) type Capture<'n, 'p> = (&'n str, &'p str);

impl Node {
    /// Checks that `segments` can be inserted without renaming an existing parameter.
    pub(crate) fn check(&self, pattern: &str, segments: &[Segment<'_>]) -> Result<(), RouteError> {
        let mut node = self;
        for segment in segments {
            let child = match segment {
                Segment::Static(literal) => node.statics.get(*literal),
                Segment::Param(name) => match &node.param {
                    Some(param) if param.name != *name => {
                        return Err(RouteError::conflicting_param(pattern, name, &param.name));
                    }
                    Some(param) => Some(&param.node),
                    None => None,
                },
                Segment::Wildcard => node.wildcard.as_deref(),
            };

            match child {
                Some(child) => node = child,
                // the rest of the pattern creates fresh nodes
                None => return Ok(()),
            }
        }
        Ok(())
    }

    /// Inserts `route` under `method` at the node addressed by `segments`, creating nodes on the
    /// way. Returns the route it replaced, if any.
    ///
    /// Callers run [`Node::check`] first; a parameter child is reused as-is.
    pub(crate) fn insert(&mut self, segments: &[Segment<'_>], method: Method, route: Arc<Route>) -> Option<Arc<Route>> {
        let mut node = self;
        for segment in segments {
            node = match segment {
                Segment::Static(literal) => node.statics.entry((*literal).to_owned()).or_default(),
                Segment::Param(name) => {
                    let param = node.param.get_or_insert_with(|| {
                        Box::new(ParamChild { name: (*name).to_owned(), node: Node::default() })
                    });
                    &mut param.node
                }
                Segment::Wildcard => node.wildcard.get_or_insert_with(Box::default).as_mut(),
            };
        }
        node.routes.insert(method, route)
    }

    /// Walks the tree along `segments`, the non-empty segments of `path`, and returns the first
    /// terminal node that `accept` takes.
    ///
    /// Captured values are pushed onto `captures` in path order; branches that fail pop what
    /// they pushed, so on `None` the vector is left as it was. A wildcard captures the raw rest
    /// of `path`, so empty segments inside it are kept.
    pub(crate) fn find<'n, 'p, F>(
        &'n self,
        path: &'p str,
        segments: &[&'p str],
        captures: &mut Vec<Capture<'n, 'p>>,
        accept: &mut F,
    ) -> Option<&'n Node>
    where
        F: FnMut(&'n Node) -> bool,
    {
        let Some((first, rest)) = segments.split_first() else {
            return accept(self).then_some(self);
        };

        if let Some(child) = self.statics.get(*first) {
            if let Some(found) = child.find(path, rest, captures, accept) {
                return Some(found);
            }
        }

        if let Some(param) = &self.param {
            captures.push((param.name.as_str(), *first));
            if let Some(found) = param.node.find(path, rest, captures, accept) {
                return Some(found);
            }
            captures.pop();
        }

        if let Some(wildcard) = &self.wildcard {
            if accept(wildcard) {
                captures.push((WILDCARD, tail(path, segments.len())));
                return Some(wildcard);
            }
        }

        None
    }

    pub(crate) fn route(&self, method: &Method) -> Option<&Arc<Route>> {
        self.routes.get(method)
    }

    pub(crate) fn methods(&self) -> impl Iterator<Item = &Method> {
        self.routes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::router::pattern::{parse_pattern, split_path};
    use crate::router::route;
    use futures::FutureExt;

    type Found = (String, Vec<(String, String)>);

    fn leaf(pattern: &str) -> Arc<Route> {
        let builder = route().to(handler_fn(|_ctx| async { Ok(()) }.boxed()));
        Arc::new(Route::new(Method::GET, pattern, builder.middlewares, builder.handler.unwrap()))
    }

    fn tree(patterns: &[&str]) -> Node {
        let mut root = Node::default();
        for pattern in patterns {
            let segments = parse_pattern(pattern).unwrap();
            root.check(pattern, &segments).unwrap();
            root.insert(&segments, Method::GET, leaf(pattern));
        }
        root
    }

    fn lookup(root: &Node, path: &str) -> Option<Found> {
        let segments = split_path(path).collect::<Vec<_>>();
        let mut captures = Vec::new();
        let accept = &mut |node: &Node| node.route(&Method::GET).is_some();
        let node = root.find(path, &segments, &mut captures, accept)?;
        let pattern = node.route(&Method::GET)?.pattern().to_owned();
        Some((pattern, captures.into_iter().map(|(k, v)| (k.to_owned(), v.to_owned())).collect()))
    }

    fn found(pattern: &str, params: &[(&str, &str)]) -> Option<Found> {
        let params = params.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
        Some((pattern.to_owned(), params))
    }

    #[test]
    fn test_static_beats_param_beats_wildcard() {
        let root = tree(&["/users/*", "/users/:id", "/users/static"]);

        assert_eq!(lookup(&root, "/users/static"), found("/users/static", &[]));
        assert_eq!(lookup(&root, "/users/42"), found("/users/:id", &[("id", "42")]));
        assert_eq!(lookup(&root, "/users/42/posts"), found("/users/*", &[("*", "42/posts")]));
    }

    #[test]
    fn test_backtracking() {
        let root = tree(&["/users/static/edit", "/users/:id/profile", "/files/*"]);

        assert_eq!(lookup(&root, "/users/static/profile"), found("/users/:id/profile", &[("id", "static")]));
        assert_eq!(lookup(&root, "/users/static/edit"), found("/users/static/edit", &[]));
        assert_eq!(lookup(&root, "/users/static"), None);
    }

    #[test]
    fn test_wildcard_requires_a_segment() {
        let root = tree(&["/files/*"]);

        assert_eq!(lookup(&root, "/files"), None);
        assert_eq!(lookup(&root, "/files/"), None);
        assert_eq!(lookup(&root, "/files/a/b/c"), found("/files/*", &[("*", "a/b/c")]));
    }

    #[test]
    fn test_wildcard_keeps_raw_remainder() {
        let root = tree(&["/files/*", "/proxy/*"]);

        assert_eq!(lookup(&root, "/files/a//b.txt/"), found("/files/*", &[("*", "a//b.txt")]));
        assert_eq!(lookup(&root, "//files//a"), found("/files/*", &[("*", "a")]));
        assert_eq!(lookup(&root, "/proxy/http://x/y"), found("/proxy/*", &[("*", "http://x/y")]));
    }

    #[test]
    fn test_root_and_trailing_slash() {
        let root = tree(&["/", "/about"]);

        assert_eq!(lookup(&root, "/"), found("/", &[]));
        assert_eq!(lookup(&root, "/about/"), found("/about", &[]));
        assert_eq!(lookup(&root, "/missing"), None);
    }

    #[test]
    fn test_conflicting_param_names() {
        let root = tree(&["/users/:id"]);
        let segments = parse_pattern("/users/:name/posts").unwrap();

        assert_eq!(
            root.check("/users/:name/posts", &segments),
            Err(RouteError::conflicting_param("/users/:name/posts", "name", "id"))
        );
        let same_name = parse_pattern("/users/:id/posts").unwrap();
        assert!(root.check("/users/:id/posts", &same_name).is_ok());
    }

    #[test]
    fn test_insert_returns_replaced_route() {
        let mut root = tree(&["/users"]);
        let segments = parse_pattern("/users").unwrap();

        assert!(root.insert(&segments, Method::GET, leaf("/users")).is_some());
        assert!(root.insert(&segments, Method::POST, leaf("/users")).is_none());
        assert_eq!(root.methods().count(), 0);
        assert_eq!(root.statics["users"].methods().count(), 2);
    }
}
