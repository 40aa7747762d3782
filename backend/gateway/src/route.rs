//! Route registration records.

use keygate_core::{KeygateError, Method, PermissionSet};

/// A path, the methods it answers and whether callers must be authenticated.
///
/// Paths are matched exactly; `:` and `*` segments are not supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    path: String,
    methods: PermissionSet,
    requires_auth: bool,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: PermissionSet::no_access(),
            requires_auth: false,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.methods.enable(method);
        self
    }

    pub fn methods(mut self, methods: PermissionSet) -> Self {
        self.methods = methods;
        self
    }

    pub fn auth(mut self, enable: bool) -> Self {
        self.requires_auth = enable;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn allowed_methods(&self) -> &PermissionSet {
        &self.methods
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn is_method_supported(&self, method: Method) -> bool {
        self.methods.is_enabled(method)
    }

    pub(crate) fn validate(&self) -> Result<(), KeygateError> {
        if !self.path.starts_with('/') {
            return Err(KeygateError::Config(format!(
                "route path '{}' must start with '/'",
                self.path
            )));
        }
        if self.path.contains(&[':', '*', '{', '}'][..]) {
            return Err(KeygateError::Config(format!(
                "route path '{}' must not contain parameters",
                self.path
            )));
        }
        Ok(())
    }
}
