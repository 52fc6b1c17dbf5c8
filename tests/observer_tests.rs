use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use session_probe::debugger::SessionInstaller;
use session_probe::observe::{
    ChangeRecorder, Node, ObserveOptions, Observer, RequestId, Value, IS_OBSERVED_KEY,
    RAW_TARGET_KEY, TURN_CLASS,
};

fn observe(node: &Node) -> (Value, Arc<ChangeRecorder>) {
    let recorder = Arc::new(ChangeRecorder::new());
    let observer = Observer::new(
        RequestId::new(),
        Arc::new(ObserveOptions::default()),
        recorder.clone(),
    );
    (Value::Observed(observer.wrap(node, "")), recorder)
}

#[test]
fn test_nested_write_reports_dot_path() {
    let raw = Value::from(json!({"a": {"b": {"c": 0}}}));
    let (root, recorder) = observe(raw.as_node().unwrap());

    root.path("a.b").set("c", 5);

    let events = recorder.snapshot();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].path, "a.b.c");
    assert_eq!(events[0].key, "c");
    assert_eq!(events[0].value, json!(5));
}

#[test]
fn test_reads_are_transparent() {
    let raw = Value::from(json!({"user": {"name": "Ada", "tags": ["x", "y"]}, "n": 2}));
    let (root, recorder) = observe(raw.as_node().unwrap());

    let user = root.get("user");
    assert!(user.is_observed());
    assert_eq!(user.raw(), raw.get("user"));
    assert_eq!(root.path("user.tags.1"), Value::from("y"));
    assert_eq!(root.get("n"), Value::from(2));
    assert_eq!(root.to_json(), raw.to_json());
    assert!(recorder.is_empty(), "reads must never emit");
}

#[test]
fn test_child_wrapper_is_memoized_in_place() {
    let raw = Node::object().with("session", Node::object());
    let (root, _) = observe(&raw);

    let first = root.get("session");
    let second = root.get("session");
    assert_eq!(first.as_node().map(Node::len), Some(0));
    match (&first, &second) {
        (Value::Observed(a), Value::Observed(b)) => assert_eq!(a, b),
        other => panic!("expected wrappers, got {:?}", other),
    }
    // The parent slot now holds the wrapper itself.
    assert!(raw.get("session").is_observed());
}

#[test]
fn test_same_value_twice_emits_once() {
    let (root, recorder) = observe(&Node::object());

    root.set("count", 1);
    root.set("count", 1);
    assert_eq!(recorder.len(), 1);

    root.set("profile", Value::from(json!({"a": [1, 2]})));
    root.set("profile", Value::from(json!({"a": [1, 2]})));
    assert_eq!(recorder.len(), 2, "structurally equal objects are a no-op");

    root.set("count", 2);
    root.set("count", 3);
    assert_eq!(recorder.len(), 4);
}

#[test]
fn test_rewrap_does_not_double_emit() {
    let raw = Node::object().with("x", 0);
    let recorder = Arc::new(ChangeRecorder::new());
    let observer = Observer::new(RequestId::new(), Arc::new(ObserveOptions::default()), recorder.clone());

    let first = observer.wrap(&raw, "");
    let second = observer.wrap(&raw, "");
    assert_eq!(first, second);

    second.set("x", Value::from(7));
    assert_eq!(recorder.len(), 1);
}

#[test]
fn test_node_shared_between_requests_reports_to_each() {
    let store = Node::object().with("cache", Node::object().with("hits", 0));
    let options = Arc::new(ObserveOptions::default());
    let (r1, r2) = (RequestId::new(), RequestId::new());
    let (sink1, sink2) = (Arc::new(ChangeRecorder::new()), Arc::new(ChangeRecorder::new()));

    let first = SessionInstaller::new(options.clone(), sink1.clone())
        .instrument(r1, Value::Object(Node::object().with("store", store.clone())));
    first.path("store.cache").set("hits", 1);

    // `store` now caches the first request's wrapper for `cache`.
    let second = SessionInstaller::new(options, sink2.clone())
        .instrument(r2, Value::Object(Node::object().with("store", store.clone())));
    second.path("store.cache").set("hits", 2);
    first.path("store.cache").set("hits", 3);

    let values = |sink: &ChangeRecorder, id: RequestId| -> Vec<serde_json::Value> {
        sink.snapshot()
            .into_iter()
            .filter(|e| e.path == "store.cache.hits")
            .inspect(|e| assert_eq!(e.request_id, id))
            .map(|e| e.value)
            .collect()
    };
    assert_eq!(values(&*sink1, r1), vec![json!(1), json!(3)]);
    assert_eq!(values(&*sink2, r2), vec![json!(2)]);
    assert_eq!(Value::Object(store).path("cache.hits"), Value::from(3));
}

#[test]
fn test_wrapper_from_another_request_is_rebound() {
    let raw = Node::object();
    let options = Arc::new(ObserveOptions::default());
    let (sink1, sink2) = (Arc::new(ChangeRecorder::new()), Arc::new(ChangeRecorder::new()));
    let first = Observer::new(RequestId::new(), options.clone(), sink1.clone());
    let second = Observer::new(RequestId::new(), options, sink2.clone());

    let theirs = first.wrap_value(Value::Object(raw.clone()), "");
    let ours = second.wrap_value(theirs, "");
    ours.set("k", 1);

    assert!(sink1.is_empty());
    assert_eq!(sink2.for_request(second.request_id()).len(), 1);
}

#[test]
fn test_aliased_node_uses_the_path_it_was_reached_through() {
    let shared = Node::object();
    let raw = Node::object().with("a", shared.clone()).with("b", shared);
    let (root, recorder) = observe(&raw);

    let _ = root.get("a");
    root.get("b").set("k", 1);
    root.get("a").set("k", 2);
    assert_eq!(recorder.paths(), vec!["b.k", "a.k"]);
}

#[test]
fn test_wrapping_a_wrapper_returns_it() {
    let raw = Node::object();
    let recorder = Arc::new(ChangeRecorder::new());
    let observer = Observer::new(RequestId::new(), Arc::new(ObserveOptions::default()), recorder);
    let wrapped = observer.wrap_value(Value::Object(raw.clone()), "");
    let again = observer.wrap_value(wrapped.clone(), "other");
    assert!(again.is_observed());
    assert_eq!(again.as_node().map(|n| n.ptr_eq(&raw)), Some(true));
}

#[test]
fn test_readonly_nested_object_is_still_traversable() {
    let config = Node::object().with("level", 1);
    let raw = Node::object();
    raw.define_readonly("config", config.clone());
    let (root, recorder) = observe(&raw);

    let first = root.get("config");
    assert!(first.is_observed());
    assert_eq!(first.get("level"), Value::from(1));
    // The parent could not cache the wrapper.
    assert!(!raw.get("config").is_observed());

    first.set("level", 2);
    root.get("config").set("level", 3);
    let paths = recorder.paths();
    assert_eq!(paths, vec!["config.level", "config.level"]);
    assert_eq!(config.get("level"), Value::from(3));
}

#[test]
fn test_write_to_readonly_is_dropped_silently() {
    let raw = Node::object();
    raw.define_readonly("fixed", "yes");
    let (root, recorder) = observe(&raw);

    assert!(!root.set("fixed", "no"));
    assert_eq!(raw.get("fixed"), Value::from("yes"));
    assert!(recorder.is_empty());
}

#[test]
fn test_ignored_keys_stay_raw() {
    let platform = Node::object().with("name", "webhook");
    let raw = Node::object().with("$platform", platform.clone());
    let (root, recorder) = observe(&raw);

    let read = root.get("$platform");
    assert!(!read.is_observed());
    read.set("name", "other");
    assert!(recorder.is_empty());

    root.set("$platform", Node::object());
    assert!(recorder.is_empty(), "ignored keys are never diffed");
}

#[test]
fn test_dates_and_turn_objects_are_not_wrapped() {
    let turn = Node::object().with_class(TURN_CLASS).with("step", 1);
    let raw = Node::object()
        .with("createdAt", Utc::now())
        .with("handler", turn.clone());
    let (root, recorder) = observe(&raw);

    assert!(matches!(root.get("createdAt"), Value::Date(_)));
    let handler = root.get("handler");
    assert!(!handler.is_observed());
    assert!(handler.as_node().unwrap().ptr_eq(&turn));
    handler.set("step", 2);
    assert!(recorder.is_empty());
}

#[test]
fn test_sentinel_keys() {
    let raw = Node::object().with("a", 1);
    let (root, recorder) = observe(&raw);

    assert_eq!(root.get(IS_OBSERVED_KEY), Value::Bool(true));
    let target = root.get(RAW_TARGET_KEY);
    assert!(!target.is_observed());
    assert!(target.as_node().unwrap().ptr_eq(&raw));
    assert!(raw.get(IS_OBSERVED_KEY) == Value::Null);
    assert!(recorder.is_empty());
}

#[test]
fn test_replacing_nested_object_is_observed() {
    let raw = Value::from(json!({"session": {"id": "a"}}));
    let (root, recorder) = observe(raw.as_node().unwrap());

    let _ = root.get("session");
    root.set("session", Value::from(json!({"id": "b"})));
    root.path("session").set("id", "c");

    let events = recorder.snapshot();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].path, "session");
    assert_eq!(events[0].value, json!({"id": "b"}));
    assert_eq!(events[1].path, "session.id");
}

#[test]
fn test_array_writes_use_index_paths() {
    let raw = Value::from(json!({"items": ["a"]}));
    let (root, recorder) = observe(raw.as_node().unwrap());

    let items = root.get("items");
    items.set("0", "a");
    items.push("b");
    items.set("0", "z");

    let events = recorder.snapshot();
    let paths: Vec<&str> = events.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["items.1", "items.0"]);
    assert_eq!(raw.get("items").to_json(), json!(["z", "b"]));
}

#[test]
fn test_removal_passes_through_without_event() {
    let raw = Node::object().with("tmp", 1);
    let (root, recorder) = observe(&raw);
    assert_eq!(root.remove("tmp"), Some(Value::from(1)));
    assert!(raw.lookup("tmp").is_none());
    assert!(recorder.is_empty());
}

#[test]
fn test_value_is_snapshotted_at_write_time() {
    let (root, recorder) = observe(&Node::object());
    let profile = Node::object().with("age", 30);
    root.set("profile", profile.clone());
    profile.set("age", Value::from(31));
    assert_eq!(recorder.snapshot()[0].value, json!({"age": 30}));
}

#[test]
fn test_count_and_session_scenario() {
    let raw = Node::object().with("count", 0).with("session", Node::object());
    let recorder = Arc::new(ChangeRecorder::new());
    let installer = SessionInstaller::new(Arc::new(ObserveOptions::default()), recorder.clone());
    let request_id = RequestId::new();

    let root = installer.instrument(request_id, Value::Object(raw));
    assert!(recorder.is_empty(), "falsy and empty fields are not synced");

    root.set("count", 1);
    root.get("session").set("id", "abc");

    let events = recorder.snapshot();
    assert_eq!(events.len(), 2);
    assert_eq!(
        (events[0].key.as_str(), &events[0].value, events[0].path.as_str()),
        ("count", &json!(1), "count")
    );
    assert_eq!(
        (events[1].key.as_str(), &events[1].value, events[1].path.as_str()),
        ("id", &json!("abc"), "session.id")
    );
    assert!(events.iter().all(|e| e.request_id == request_id));
}

#[test]
fn test_initial_sync_emits_populated_top_level_fields() {
    let raw = Node::object()
        .with("name", "Ada")
        .with("visits", 3)
        .with("flags", Node::array())
        .with("empty", "")
        .with("$app", Node::object().with("secret", 1))
        .with("prefs", Node::object().with("lang", "en"));
    let recorder = Arc::new(ChangeRecorder::new());
    let installer = SessionInstaller::new(Arc::new(ObserveOptions::default()), recorder.clone());

    let root = installer.instrument(RequestId::new(), Value::Object(raw));
    assert!(root.is_observed());
    assert_eq!(recorder.paths(), vec!["name", "visits", "prefs"]);
    assert_eq!(recorder.snapshot()[2].value, json!({"lang": "en"}));

    // Empty containers skipped by the sync are still observed afterwards.
    root.get("flags").push(true);
    assert_eq!(recorder.paths().last().map(String::as_str), Some("flags.0"));
}

#[test]
fn test_falsy_values_participate_after_sync() {
    let raw = Node::object().with("enabled", false);
    let recorder = Arc::new(ChangeRecorder::new());
    let installer = SessionInstaller::new(Arc::new(ObserveOptions::default()), recorder.clone());
    let root = installer.instrument(RequestId::new(), Value::Object(raw));

    assert!(recorder.is_empty());
    root.set("enabled", true);
    root.set("enabled", false);
    root.set("label", "");
    assert_eq!(recorder.paths(), vec!["enabled", "enabled", "label"]);
}

#[test]
fn test_huge_array_index_is_refused_without_panic() {
    let raw = Value::from(json!({"items": ["a"]}));
    let (root, recorder) = observe(raw.as_node().unwrap());

    let items = root.get("items");
    assert!(!items.set(&usize::MAX.to_string(), 1));
    assert!(!items.set("4294967295", 1));
    assert_eq!(raw.get("items").to_json(), json!(["a"]));
    assert!(recorder.is_empty());
}

#[test]
fn test_ignored_names_only_apply_at_top_level() {
    let raw = Node::object().with("meta", Node::object().with("$app", Node::object()));
    let (root, recorder) = observe(&raw);

    let nested = root.path("meta.$app");
    assert!(nested.is_observed());
    nested.set("name", "demo");
    root.get("meta").set("$app", Node::object().with("name", "other"));
    assert_eq!(recorder.paths(), vec!["meta.$app.name", "meta.$app"]);
}
