//! Methods and the per-endpoint permission bitmap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::KeygateError;

/// The closed set of methods a route or endpoint can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Pull,
    Delete,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Get, Method::Post, Method::Pull, Method::Delete];

    /// Slot in the `PermissionSet` bitmap. Always within `0..4`.
    pub const fn index(self) -> usize {
        match self {
            Method::Get => 0,
            Method::Post => 1,
            Method::Pull => 2,
            Method::Delete => 3,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Pull => "PULL",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = KeygateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PULL" => Ok(Method::Pull),
            "DELETE" => Ok(Method::Delete),
            _ => Err(KeygateError::MethodNotAllowed(s.to_string())),
        }
    }
}

/// Four independent flags, one per `Method`. No method implies another.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    #[serde(default)]
    get: bool,
    #[serde(default)]
    post: bool,
    #[serde(default)]
    pull: bool,
    #[serde(default)]
    delete: bool,
}

impl PermissionSet {
    pub fn new(get: bool, post: bool, pull: bool, delete: bool) -> Self {
        Self { get, post, pull, delete }
    }

    pub fn no_access() -> Self {
        Self::default()
    }

    pub fn full_access() -> Self {
        Self::new(true, true, true, true)
    }

    /// A set with exactly the given methods enabled.
    pub fn of(methods: &[Method]) -> Self {
        let mut set = Self::default();
        for method in methods {
            set.enable(*method);
        }
        set
    }

    fn slot_mut(&mut self, method: Method) -> &mut bool {
        match method {
            Method::Get => &mut self.get,
            Method::Post => &mut self.post,
            Method::Pull => &mut self.pull,
            Method::Delete => &mut self.delete,
        }
    }

    pub fn enable(&mut self, method: Method) -> &mut Self {
        *self.slot_mut(method) = true;
        self
    }

    pub fn disable(&mut self, method: Method) -> &mut Self {
        *self.slot_mut(method) = false;
        self
    }

    pub fn is_enabled(&self, method: Method) -> bool {
        match method {
            Method::Get => self.get,
            Method::Post => self.post,
            Method::Pull => self.pull,
            Method::Delete => self.delete,
        }
    }

    /// Enabled methods in GET, POST, PULL, DELETE order.
    pub fn methods(&self) -> Vec<Method> {
        Method::ALL.into_iter().filter(|m| self.is_enabled(*m)).collect()
    }

    pub fn is_empty(&self) -> bool {
        !(self.get || self.post || self.pull || self.delete)
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Permission[{}, {}, {}, {}]",
            self.get, self.post, self.pull, self.delete
        )
    }
}
