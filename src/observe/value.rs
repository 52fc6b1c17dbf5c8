use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;

use super::proxy::Observed;

/// Nesting past this depth is treated as unequal / serialized as null.
const MAX_DEPTH: usize = 64;

/// Largest f64 that still round-trips through an i64 without loss.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Furthest a list write may land past the current end. Writes beyond it are
/// refused instead of padding the list with nulls.
pub const MAX_LIST_GAP: usize = 1 << 16;

/// A dynamically typed value living in a context graph.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Timestamps are scalars here: they are never wrapped.
    Date(DateTime<Utc>),
    /// A raw, unobserved container.
    Object(Node),
    /// A container seen through an observation wrapper.
    Observed(Observed),
}

/// Shared handle to a mutable map or list.
///
/// Cloning a `Node` clones the handle, not the contents. Identity is
/// pointer identity (see [`Node::ptr_eq`]).
#[derive(Clone)]
pub struct Node {
    inner: Arc<RwLock<NodeData>>,
}

struct NodeData {
    body: Body,
    class: Option<Arc<str>>,
    readonly: HashSet<String>,
}

enum Body {
    Map(IndexMap<String, Value>),
    List(Vec<Value>),
}

impl Node {
    fn with_body(body: Body) -> Self {
        Self {
            inner: Arc::new(RwLock::new(NodeData {
                body,
                class: None,
                readonly: HashSet::new(),
            })),
        }
    }

    pub fn object() -> Self {
        Self::with_body(Body::Map(IndexMap::new()))
    }

    pub fn array() -> Self {
        Self::with_body(Body::List(Vec::new()))
    }

    /// Tags the node with a class name, the analogue of a constructor/prototype.
    pub fn with_class(self, class: &str) -> Self {
        self.inner.write().class = Some(Arc::from(class));
        self
    }

    /// Builder-style insert, used when assembling contexts.
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value.into());
        self
    }

    pub fn class(&self) -> Option<Arc<str>> {
        self.inner.read().class.clone()
    }

    pub fn is_array(&self) -> bool {
        matches!(self.inner.read().body, Body::List(_))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Reads `key`, yielding `Value::Null` when absent.
    pub fn get(&self, key: &str) -> Value {
        self.lookup(key).unwrap_or_default()
    }

    /// Reads `key`, distinguishing an absent key from a stored null.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let data = self.inner.read();
        match &data.body {
            Body::Map(map) => map.get(key).cloned(),
            Body::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i).cloned()),
        }
    }

    /// Stores `value` under `key`. Returns false when the key is read-only
    /// or not addressable (a non-index key on a list, or an index more than
    /// [`MAX_LIST_GAP`] past the end).
    pub fn set(&self, key: &str, value: Value) -> bool {
        let mut data = self.inner.write();
        if data.readonly.contains(key) {
            return false;
        }
        store(&mut data.body, key, value)
    }

    /// Stores `value` and freezes the key against further writes.
    pub fn define_readonly(&self, key: &str, value: impl Into<Value>) {
        let mut data = self.inner.write();
        if store(&mut data.body, key, value.into()) {
            data.readonly.insert(key.to_string());
        }
    }

    pub fn is_writable(&self, key: &str) -> bool {
        !self.inner.read().readonly.contains(key)
    }

    /// Removes `key`. List slots are left as null holes so indices stay stable.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut data = self.inner.write();
        if data.readonly.contains(key) {
            return None;
        }
        match &mut data.body {
            Body::Map(map) => map.shift_remove(key),
            Body::List(list) => key
                .parse::<usize>()
                .ok()
                .and_then(|i| list.get_mut(i))
                .map(std::mem::take),
        }
    }

    pub fn push(&self, value: impl Into<Value>) -> bool {
        let mut data = self.inner.write();
        match &mut data.body {
            Body::List(list) => {
                list.push(value.into());
                true
            }
            Body::Map(_) => false,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        match &self.inner.read().body {
            Body::Map(map) => map.keys().cloned().collect(),
            Body::List(list) => (0..list.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// Own entries in insertion (or index) order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        match &self.inner.read().body {
            Body::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Body::List(list) => list
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match &self.inner.read().body {
            Body::Map(map) => map.len(),
            Body::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> serde_json::Value {
        node_to_json(self, MAX_DEPTH)
    }

    /// Replaces the slot at `key` with `replacement`, but only while it still
    /// holds `expected` (raw or wrapped) and the key is writable.
    pub(crate) fn memoize(&self, key: &str, expected: &Node, replacement: Value) {
        let mut data = self.inner.write();
        if data.readonly.contains(key) {
            return;
        }
        let slot = match &mut data.body {
            Body::Map(map) => map.get_mut(key),
            Body::List(list) => key.parse::<usize>().ok().and_then(|i| list.get_mut(i)),
        };
        if let Some(slot) = slot {
            if slot.as_node().is_some_and(|current| current.ptr_eq(expected)) {
                *slot = replacement;
            }
        }
    }
}

fn store(body: &mut Body, key: &str, value: Value) -> bool {
    match body {
        Body::Map(map) => {
            map.insert(key.to_string(), value);
            true
        }
        Body::List(list) => {
            let Ok(index) = key.parse::<usize>() else {
                return false;
            };
            if index < list.len() {
                list[index] = value;
            } else if index - list.len() <= MAX_LIST_GAP {
                list.resize(index, Value::Null);
                list.push(value);
            } else {
                return false;
            }
            true
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.read();
        let (kind, len) = match &data.body {
            Body::Map(map) => ("map", map.len()),
            Body::List(list) => ("list", list.len()),
        };
        f.debug_struct("Node")
            .field("kind", &kind)
            .field("class", &data.class)
            .field("len", &len)
            .finish()
    }
}

impl Value {
    /// The container behind this value, looking through any wrapper.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Object(node) => Some(node),
            Value::Observed(observed) => Some(observed.target()),
            _ => None,
        }
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, Value::Observed(_))
    }

    /// Strips an observation wrapper, returning the raw container.
    pub fn raw(&self) -> Value {
        match self {
            Value::Observed(observed) => Value::Object(observed.target().clone()),
            other => other.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(node) => node.get(key),
            Value::Observed(observed) => observed.get(key),
            _ => Value::Null,
        }
    }

    /// Follows a dot-separated path of reads.
    pub fn path(&self, path: &str) -> Value {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self.clone(), |value, key| value.get(key))
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        match self {
            Value::Object(node) => node.set(key, value.into()),
            Value::Observed(observed) => observed.set(key, value.into()),
            _ => false,
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(node) => node.remove(key),
            Value::Observed(observed) => observed.remove(key),
            _ => None,
        }
    }

    pub fn push(&self, value: impl Into<Value>) -> bool {
        match self {
            Value::Object(node) => node.push(value),
            Value::Observed(observed) => observed.push(value.into()),
            _ => false,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.as_node().map(Node::keys).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.as_node().map_or(0, Node::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mirrors script truthiness: null, false, 0, NaN and "" are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::Object(_) | Value::Observed(_) => true,
        }
    }

    pub fn is_empty_container(&self) -> bool {
        self.as_node().is_some_and(Node::is_empty)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        value_to_json(self, MAX_DEPTH)
    }
}

fn value_to_json(value: &Value, depth: usize) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        Value::Object(node) => node_to_json(node, depth),
        Value::Observed(observed) => node_to_json(observed.target(), depth),
    }
}

fn node_to_json(node: &Node, depth: usize) -> serde_json::Value {
    if depth == 0 {
        return serde_json::Value::Null;
    }
    let entries = node.entries();
    if node.is_array() {
        serde_json::Value::Array(
            entries
                .iter()
                .map(|(_, v)| value_to_json(v, depth - 1))
                .collect(),
        )
    } else {
        serde_json::Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| {
                    let json = value_to_json(&v, depth - 1);
                    (k, json)
                })
                .collect(),
        )
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Structural equality that looks through observation wrappers.
///
/// Used only to suppress redundant change events, so it favours a simple
/// walk: shared nodes short-circuit, and graphs nested beyond the depth
/// ceiling compare unequal.
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    equal_at(a, b, MAX_DEPTH)
}

fn equal_at(a: &Value, b: &Value, depth: usize) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x == y,
        _ => match (a.as_node(), b.as_node()) {
            (Some(x), Some(y)) => nodes_equal(x, y, depth),
            _ => false,
        },
    }
}

fn nodes_equal(a: &Node, b: &Node, depth: usize) -> bool {
    if a.ptr_eq(b) {
        return true;
    }
    if depth == 0 || a.is_array() != b.is_array() || a.class() != b.class() {
        return false;
    }
    let left = a.entries();
    if left.len() != b.len() {
        return false;
    }
    left.iter().all(|(key, value)| {
        b.lookup(key)
            .is_some_and(|other| equal_at(value, &other, depth - 1))
    })
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        deep_equal(self, other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

impl_from_int!(i32, i64, u32, u64, usize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Object(node)
    }
}

impl From<Observed> for Value {
    fn from(observed: Observed) -> Self {
        Value::Observed(observed)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                let node = Node::array();
                for item in items {
                    node.push(Value::from(item));
                }
                Value::Object(node)
            }
            serde_json::Value::Object(map) => {
                let node = Node::object();
                for (k, v) in map {
                    node.set(k, Value::from(v));
                }
                Value::Object(node)
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(&json)
    }
}
