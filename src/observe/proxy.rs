use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::event::{ChangeEvent, ChangeSink, RequestId};
use super::value::{deep_equal, Node, Value};

/// Reading this key through a wrapper yields `true` and never traverses.
pub const IS_OBSERVED_KEY: &str = "__isObserved";
/// Reading this key through a wrapper yields the unwrapped container.
pub const RAW_TARGET_KEY: &str = "__target";

/// Keys that point back into infrastructure and must never be observed.
pub const DEFAULT_IGNORED: &[&str] = &["$app", "$pipeline", "$platform", "$host", "$plugins"];
/// Class of the per-turn handler object, which must keep its identity.
pub const TURN_CLASS: &str = "Turn";

#[derive(Debug, Clone)]
pub struct ObserveOptions {
    pub ignored: HashSet<String>,
    pub opaque_classes: HashSet<String>,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            ignored: DEFAULT_IGNORED.iter().map(|k| k.to_string()).collect(),
            opaque_classes: HashSet::from([TURN_CLASS.to_string()]),
        }
    }
}

impl ObserveOptions {
    pub fn ignore(mut self, key: &str) -> Self {
        self.ignored.insert(key.to_string());
        self
    }

    pub fn opaque_class(mut self, class: &str) -> Self {
        self.opaque_classes.insert(class.to_string());
        self
    }

    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored.contains(key)
    }

    fn is_opaque(&self, node: &Node) -> bool {
        node.class()
            .is_some_and(|class| self.opaque_classes.contains(class.as_ref()))
    }
}

/// Everything a wrapper tree shares: the request it belongs to, the rules
/// for what to skip, and where events go.
pub(crate) struct Scope {
    request_id: RequestId,
    options: Arc<ObserveOptions>,
    sink: Arc<dyn ChangeSink>,
}

/// Builds observation wrappers for one request.
pub struct Observer {
    scope: Arc<Scope>,
}

impl Observer {
    pub fn new(request_id: RequestId, options: Arc<ObserveOptions>, sink: Arc<dyn ChangeSink>) -> Self {
        Self {
            scope: Arc::new(Scope {
                request_id,
                options,
                sink,
            }),
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.scope.request_id
    }

    pub fn options(&self) -> &ObserveOptions {
        &self.scope.options
    }

    /// Wraps `target` rooted at `path`. Wrapping the same node at the same
    /// path twice yields equal wrappers.
    pub fn wrap(&self, target: &Node, path: &str) -> Observed {
        Observed::attach(target, path, &self.scope)
    }

    /// Like [`Observer::wrap`], passing scalars through. A wrapper from this
    /// observer is returned as is; one from another request is rebound to
    /// this one.
    pub fn wrap_value(&self, value: Value, path: &str) -> Value {
        match value {
            Value::Object(node) => Value::Observed(self.wrap(&node, path)),
            Value::Observed(observed) if Arc::ptr_eq(&observed.scope, &self.scope) => {
                Value::Observed(observed)
            }
            Value::Observed(observed) => Value::Observed(self.wrap(observed.target(), path)),
            other => other,
        }
    }
}

/// Interception layer over one container at one dot-path, for one request.
///
/// Reads of nested containers return child wrappers, created on first
/// access and cached in the parent slot when the slot is writable. A cached
/// wrapper is only reused by readers of the same request at the same path;
/// anyone else gets a fresh wrapper of the same node. Writes
/// always reach the target; those that change the value publish a
/// [`ChangeEvent`].
#[derive(Clone)]
pub struct Observed {
    target: Node,
    path: Arc<str>,
    scope: Arc<Scope>,
}

impl Observed {
    fn attach(target: &Node, path: &str, scope: &Arc<Scope>) -> Self {
        Self {
            target: target.clone(),
            path: Arc::from(path),
            scope: Arc::clone(scope),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn request_id(&self) -> RequestId {
        self.scope.request_id
    }

    /// The raw container behind the wrapper.
    pub fn target(&self) -> &Node {
        &self.target
    }

    pub fn is_raw(&self, node: &Node) -> bool {
        self.target.ptr_eq(node)
    }

    pub fn get(&self, key: &str) -> Value {
        match key {
            IS_OBSERVED_KEY => return Value::Bool(true),
            RAW_TARGET_KEY => return Value::Object(self.target.clone()),
            _ => {}
        }

        let value = self.target.get(key);
        let child_path = self.child_path(key);
        if let Value::Observed(cached) = &value {
            if Arc::ptr_eq(&cached.scope, &self.scope) && cached.path() == child_path {
                return value;
            }
        }
        let node = match &value {
            Value::Object(node) => node,
            // Cached by another request or reached through another path.
            Value::Observed(cached) => cached.target(),
            _ => return value,
        };
        if self.ignores(key) || self.scope.options.is_opaque(node) {
            return value.raw();
        }

        let child = Observed::attach(node, &child_path, &self.scope);
        // Read-only slots cannot cache the wrapper; every read rebuilds it.
        self.target.memoize(key, node, Value::Observed(child.clone()));
        Value::Observed(child)
    }

    /// Writes `value` under `key`. Returns false only when the target itself
    /// refused the write.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let previous = self.target.get(key);
        if !self.target.set(key, value.clone()) {
            debug!(path = %self.child_path(key), "write refused by target");
            return false;
        }
        if self.ignores(key) || deep_equal(&previous, &value) {
            return true;
        }

        self.scope.sink.publish(ChangeEvent {
            request_id: self.scope.request_id,
            key: key.to_string(),
            value: value.to_json(),
            path: self.child_path(key),
        });
        true
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.target.remove(key)
    }

    /// Appends to a list through the write path, so the append is observed.
    pub fn push(&self, value: Value) -> bool {
        if !self.target.is_array() {
            return false;
        }
        let index = self.target.len().to_string();
        self.set(&index, value)
    }

    pub fn keys(&self) -> Vec<String> {
        self.target.keys()
    }

    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    pub fn is_array(&self) -> bool {
        self.target.is_array()
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.target.to_json()
    }

    /// The ignored set names top-level keys only.
    fn ignores(&self, key: &str) -> bool {
        self.path.is_empty() && self.scope.options.is_ignored(key)
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }
}

impl PartialEq for Observed {
    fn eq(&self, other: &Self) -> bool {
        self.target.ptr_eq(&other.target)
            && self.path == other.path
            && Arc::ptr_eq(&self.scope, &other.scope)
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("path", &self.path)
            .field("request_id", &self.scope.request_id)
            .field("target", &self.target)
            .finish()
    }
}
