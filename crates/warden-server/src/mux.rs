//! Method and path routing.
//!
//! A minimal router: routes are matched in registration order, segment by
//! segment, with `{name}` segments capturing a path parameter. It knows
//! nothing about middleware; the application adapter registers fully
//! composed chains on it.
//!
//! # Example
//!
//! ```rust
//! use warden_server::mux::{Mux, RouteLookup};
//! use http::Method;
//!
//! let mut mux = Mux::new();
//! mux.insert(Method::GET, "/v1/users/{id}", "get_user");
//! mux.insert(Method::POST, "/v1/users", "create_user");
//!
//! match mux.lookup(&Method::GET, "/v1/users/42") {
//!     RouteLookup::Found { value, params } => {
//!         assert_eq!(*value, "get_user");
//!         assert_eq!(params.get("id"), Some("42"));
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

use http::Method;
use warden_core::PathParams;

/// A segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// A literal segment (e.g., "users")
    Literal(String),

    /// A parameter segment (e.g., "{id}")
    Param(String),
}

#[derive(Debug, Clone)]
struct Route<T> {
    method: Method,
    pattern: String,
    segments: Vec<PathSegment>,
    value: T,
}

impl<T> Route<T> {
    fn parse_segments(pattern: &str) -> Vec<PathSegment> {
        pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => PathSegment::Param(name.to_string()),
                None => PathSegment::Literal(s.to_string()),
            })
            .collect()
    }

    fn match_path(&self, path: &str) -> Option<PathParams> {
        let actual: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if actual.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (segment, actual) in self.segments.iter().zip(actual) {
            match segment {
                PathSegment::Literal(expected) if expected == actual => {}
                PathSegment::Literal(_) => return None,
                PathSegment::Param(name) => params.insert(name.clone(), actual),
            }
        }
        Some(params)
    }
}

/// Outcome of [`Mux::lookup`].
#[derive(Debug)]
pub enum RouteLookup<'a, T> {
    /// A route matched method and path.
    Found {
        /// The registered value.
        value: &'a T,
        /// Captured path parameters.
        params: PathParams,
    },
    /// The path matched, but only for other methods.
    MethodNotAllowed {
        /// Methods registered for the path.
        allowed: Vec<Method>,
    },
    /// Nothing matched the path.
    NotFound,
}

/// HTTP request router.
#[derive(Debug, Clone)]
pub struct Mux<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for Mux<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> Mux<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` for `method` and `pattern`.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) {
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            segments: Route::<T>::parse_segments(pattern),
            value,
        });
    }

    /// Finds the route for a request.
    pub fn lookup(&self, method: &Method, path: &str) -> RouteLookup<'_, T> {
        let mut allowed = Vec::new();
        for route in &self.routes {
            if let Some(params) = route.match_path(path) {
                if route.method == *method {
                    return RouteLookup::Found {
                        value: &route.value,
                        params,
                    };
                }
                allowed.push(route.method.clone());
            }
        }

        if allowed.is_empty() {
            RouteLookup::NotFound
        } else {
            RouteLookup::MethodNotAllowed { allowed }
        }
    }

    /// Registered `(method, pattern)` pairs in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|r| (&r.method, r.pattern.as_str()))
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
