use crate::config::Match;
use crate::handler::Handler;
use http::Method;
use std::sync::Arc;

/// Outcome of matching a request against the configured routes
pub enum RouteMatch<'a> {
    Matched(&'a Arc<dyn Handler>),
    /// The path exists but not for this method. Carries the methods that
    /// would have matched.
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Router that matches incoming requests against configured routes
pub struct Router {
    routes: Vec<(Match, Arc<dyn Handler>)>,
}

impl Router {
    /// Creates a new router. Routes are tried in order; first match wins.
    pub fn new(routes: Vec<(Match, Arc<dyn Handler>)>) -> Self {
        Self { routes }
    }

    pub fn resolve(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut allowed = Vec::new();

        for (criteria, handler) in &self.routes {
            if criteria.path != path {
                continue;
            }
            match criteria.method {
                None => return RouteMatch::Matched(handler),
                Some(expected) if expected == *method => return RouteMatch::Matched(handler),
                Some(expected) => {
                    let expected = expected.as_method();
                    if !allowed.contains(&expected) {
                        allowed.push(expected);
                    }
                }
            }
        }

        if allowed.is_empty() {
            tracing::debug!(%method, path, "No route matched");
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed(allowed)
        }
    }
}
