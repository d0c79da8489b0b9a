//! Router and Access Rule Index
//!
//! Organizes the application's access control into three permission tiers. Each
//! submodule declares the route families of its tier; [`AuthorizationTable::build`]
//! expands them, in tier order, into the ordered rule list consulted for every
//! request.

use axum::http::Method;

use crate::auth::Permission;

/// Routes open to anonymous callers (course catalogue, login, docs, health).
pub mod public;

/// Routes readable and writable by any authenticated role.
pub mod authenticated;

/// Routes whose update and delete operations are reserved for administrators.
pub mod admin;

/// Requirement applied when no rule matches: any authenticated role.
pub const DEFAULT_PERMISSION: Permission = Permission::User;

/// PathPattern
///
/// A route pattern. `/students/**` matches `/students` and everything below it on a
/// segment boundary; any other pattern must equal the path exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => p == path,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

/// RouteRule
///
/// A single (method, pattern) → permission entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub method: Method,
    pub pattern: PathPattern,
    pub permission: Permission,
}

impl RouteRule {
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        &self.method == method && self.pattern.matches(path)
    }
}

/// RouteGroup
///
/// Declarative form used by the tier modules: every method applies to every pattern.
pub struct RouteGroup {
    pub permission: Permission,
    pub methods: Vec<Method>,
    pub patterns: Vec<&'static str>,
}

impl RouteGroup {
    fn expand(&self) -> impl Iterator<Item = RouteRule> + '_ {
        self.patterns.iter().flat_map(move |pattern| {
            self.methods.iter().map(move |method| RouteRule {
                method: method.clone(),
                pattern: PathPattern::parse(pattern),
                permission: self.permission,
            })
        })
    }
}

/// AuthorizationTable
///
/// The ordered rule list. Built once in `main` and shared read-only through
/// `AppState`; there is no way to mutate it after construction.
#[derive(Debug, Clone)]
pub struct AuthorizationTable {
    rules: Vec<RouteRule>,
}

impl AuthorizationTable {
    /// build
    ///
    /// Assembles the application's rule set: public, then user, then admin groups.
    pub fn build() -> Self {
        let groups = public::groups()
            .into_iter()
            .chain(authenticated::groups())
            .chain(admin::groups());
        Self::from_groups(groups)
    }

    pub fn from_groups(groups: impl IntoIterator<Item = RouteGroup>) -> Self {
        let rules = groups
            .into_iter()
            .flat_map(|group| group.expand().collect::<Vec<_>>())
            .collect();
        Self { rules }
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    /// find
    ///
    /// Permission of the first rule matching `method` and `path`, if any.
    pub fn find(&self, method: &Method, path: &str) -> Option<Permission> {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.permission)
    }

    /// required_permission
    ///
    /// Like [`AuthorizationTable::find`], falling back to [`DEFAULT_PERMISSION`]
    /// for unlisted routes: anonymous callers are refused, any role is admitted.
    pub fn required_permission(&self, method: &Method, path: &str) -> Permission {
        self.find(method, path).unwrap_or(DEFAULT_PERMISSION)
    }
}
