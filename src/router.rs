use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::{BuildError, BuildErrors, BuiltRouter, ContextKey, Endpoint, Ptsq};

/// A node of the route tree.
#[derive(Debug, Clone)]
pub enum RouteNode {
    Router(Router),
    Endpoint(Endpoint),
}

impl From<Router> for RouteNode {
    fn from(router: Router) -> Self {
        Self::Router(router)
    }
}

impl From<Endpoint> for RouteNode {
    fn from(endpoint: Endpoint) -> Self {
        Self::Endpoint(endpoint)
    }
}

/// A tree of named endpoints and nested routers.
///
/// Declaration problems, like a duplicate name, don't fail immediately. They are collected and returned by [`Router::build`].
///
/// ```rust
/// use ptsq::{Ptsq, PtsqError, Router};
/// use serde_json::Value;
///
/// let p = Ptsq::new();
/// let router = p
///     .router()
///     .route("health", p.query(|_, _: Value| async { Ok::<_, PtsqError>("ok") }))
///     .nest("user", Router::new().route("list", p.query(|_, _: Value| async { Ok::<_, PtsqError>(Vec::<String>::new()) })));
///
/// assert!(router.build().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Router {
    children: BTreeMap<String, RouteNode>,
    requires: Vec<ContextKey>,
    errors: Vec<BuildError>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, name: impl Into<String>, node: impl Into<RouteNode>) -> Self {
        let name = name.into();
        if self.children.contains_key(&name) {
            self.errors.push(BuildError::DuplicateRoute { path: name });
            return self;
        }

        self.children.insert(name, node.into());
        self
    }

    pub fn nest(self, name: impl Into<String>, router: Router) -> Self {
        self.route(name, router)
    }

    /// Declare that calls into this router need a `T` in their context.
    ///
    /// A call whose initial context is missing a required value fails with `INTERNAL_SERVER_ERROR` before any routing happens.
    pub fn requires<T: Send + Sync + 'static>(mut self) -> Self {
        let key = ContextKey::of::<T>();
        if !self.requires.contains(&key) {
            self.requires.push(key);
        }
        self
    }

    /// Combine two routers, with `b` overriding `a` where both declare the same name.
    ///
    /// `b` must require at least the context `a` requires.
    pub fn merge(a: Router, b: Router) -> Result<Router, BuildError> {
        let missing = a
            .requires
            .iter()
            .filter(|key| !b.requires.contains(key))
            .map(ContextKey::name)
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(BuildError::ContextRequirements { missing });
        }

        let mut merged = a;
        merged.children.extend(b.children);
        merged.requires = b.requires;
        merged.errors.extend(b.errors);
        Ok(merged)
    }

    pub fn get(&self, name: &str) -> Option<&RouteNode> {
        self.children.get(name)
    }

    /// The children of this router, sorted by name.
    pub fn children(&self) -> impl Iterator<Item = (&str, &RouteNode)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn requirements(&self) -> &[ContextKey] {
        &self.requires
    }

    /// Build with the default [`Ptsq`] settings.
    pub fn build(self) -> Result<BuiltRouter, BuildErrors> {
        Ptsq::new().build(self)
    }

    /// Collect every declaration problem in this tree and every context key it requires.
    pub(crate) fn check(&self, path: &str, errors: &mut Vec<BuildError>, requires: &mut Vec<ContextKey>) {
        errors.extend(self.errors.iter().cloned().map(|err| match path {
            "" => err,
            prefix => err.prefixed(prefix),
        }));

        for key in &self.requires {
            if !requires.contains(key) {
                requires.push(*key);
            }
        }

        for (name, node) in &self.children {
            let route = join(path, name);
            if !is_valid_name(name) {
                errors.push(BuildError::InvalidName {
                    path: path.to_string(),
                    name: name.clone(),
                });
            }

            match node {
                RouteNode::Router(router) => router.check(&route, errors, requires),
                RouteNode::Endpoint(endpoint) => {
                    errors.extend(endpoint.errors.iter().cloned().map(|source| {
                        BuildError::IncompatibleArgs {
                            path: route.clone(),
                            source,
                        }
                    }));

                    let patterns = endpoint
                        .steps
                        .iter()
                        .filter_map(|step| step.args())
                        .chain(endpoint.args.iter())
                        .chain(std::iter::once(&endpoint.output))
                        .flat_map(|schema| schema.patterns())
                        .collect::<BTreeSet<_>>();
                    for pattern in patterns {
                        if let Err(err) = Regex::new(pattern) {
                            errors.push(BuildError::InvalidPattern {
                                path: route.clone(),
                                pattern: pattern.to_string(),
                                message: err.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }
}

pub(crate) fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Route names and wire route segments are non-empty runs of ASCII letters.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic())
}
