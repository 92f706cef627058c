//! End-to-end augmentation: state writes to rendered output.

use std::cell::Cell;
use std::rc::Rc;

use spark_dom::{pipeline, Component, ComponentOptions, Document, StateError, Value};

fn counter_options(renders: Rc<Cell<usize>>) -> ComponentOptions {
    ComponentOptions::new()
        .state(Value::from(serde_json::json!({"count": 0})))
        .render(move |c| {
            renders.set(renders.get() + 1);
            format!("<span>{}</span>", c.get("count").unwrap())
        })
}

#[test]
fn test_construct_while_attached_renders_once_then_per_frame() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let renders = Rc::new(Cell::new(0));
    let counter = Component::augment(&doc, &el, counter_options(renders.clone()));

    // Exactly one synchronous initial render with count = 0
    assert_eq!(renders.get(), 1);
    assert_eq!(el.markup(), "<span>0</span>");
    assert!(counter.is_attached());
    assert!(counter.has_rendered());

    // setState, then one additional render at the next frame boundary
    counter
        .set_state(Value::from(serde_json::json!({"count": 1})))
        .unwrap();
    assert_eq!(renders.get(), 1);
    pipeline::tick(&doc);
    assert_eq!(renders.get(), 2);
    assert_eq!(el.markup(), "<span>1</span>");
}

#[test]
fn test_mutations_coalesce_into_one_flush() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let renders = Rc::new(Cell::new(0));
    let counter = Component::augment(&doc, &el, counter_options(renders.clone()));

    for n in 1..=5 {
        counter.set("count", n).unwrap();
    }
    counter.set("other", "x").unwrap();

    pipeline::tick(&doc);
    assert_eq!(renders.get(), 2, "five writes, one flush");
    assert_eq!(el.markup(), "<span>5</span>");

    // Nothing pending afterwards
    pipeline::tick(&doc);
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_unchanged_writes_schedule_nothing() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let renders = Rc::new(Cell::new(0));
    let counter = Component::augment(&doc, &el, counter_options(renders.clone()));

    counter.set("count", 0).unwrap();
    counter.set("nan", f64::NAN).unwrap();
    pipeline::settle(&doc);
    let base = renders.get();

    // NaN to NaN is equal; no flush
    counter.set("count", 0).unwrap();
    counter.set("nan", f64::NAN).unwrap();
    pipeline::settle(&doc);
    assert_eq!(renders.get(), base);
}

#[test]
fn test_mutation_during_render_schedules_fresh_flush() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let component = Component::augment(
        &doc,
        &el,
        ComponentOptions::new()
            .state(Value::from(serde_json::json!({"n": 0})))
            .render(|c| {
                let n = c.get("n").and_then(|v| v.as_f64()).unwrap_or(0.0);
                if n == 1.0 {
                    // Recorded into a fresh change set, never re-entering
                    // the in-progress flush
                    c.set("n", 2.0).unwrap();
                }
                format!("<i>{n}</i>")
            }),
    );

    component.set("n", 1.0).unwrap();
    pipeline::tick(&doc);
    assert_eq!(el.markup(), "<i>1</i>");

    pipeline::tick(&doc);
    assert_eq!(el.markup(), "<i>2</i>");

    // Settles: the second render does not mutate again
    pipeline::settle(&doc);
    assert_eq!(el.markup(), "<i>2</i>");
}

#[test]
fn test_non_reactive_component_never_renders_from_writes() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let renders = Rc::new(Cell::new(0));
    let renders_clone = renders.clone();
    let component = Component::augment(
        &doc,
        &el,
        ComponentOptions::new()
            .state(Value::from(serde_json::json!({"count": 0})))
            .reactive(false)
            .render(move |c| {
                renders_clone.set(renders_clone.get() + 1);
                format!("<span>{}</span>", c.get("count").unwrap())
            }),
    );

    // The initial render still happens
    assert_eq!(renders.get(), 1);

    // Writes merge but trigger nothing
    component.set("count", 5).unwrap();
    component
        .set_state(Value::from(serde_json::json!({"extra": true})))
        .unwrap();
    pipeline::settle(&doc);

    assert_eq!(renders.get(), 1);
    assert_eq!(component.get("count"), Some(Value::from(5)));
    assert_eq!(component.get("extra"), Some(Value::from(true)));
    assert_eq!(el.markup(), "<span>0</span>");
}

#[test]
fn test_writes_after_destroy_fail_loudly() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let component = Component::augment(
        &doc,
        &el,
        ComponentOptions::new().state(Value::from(serde_json::json!({"a": 1}))),
    );
    let state = component.state();
    component.destroy();
    component.destroy();

    assert!(component.is_destroyed());
    assert_eq!(component.set("a", 2), Err(StateError::StoreDestroyed));
    assert_eq!(state.set("a", 2), Err(StateError::StoreDestroyed));
    assert_eq!(
        component.set_state(Value::from(serde_json::json!({"a": 2}))),
        Err(StateError::StoreDestroyed)
    );

    // Lifecycle signals after teardown stay silent
    doc.root().remove_child(&el);
    pipeline::tick(&doc);
}

#[test]
fn test_augment_all() {
    let doc = Document::new();
    doc.root()
        .set_markup(r#"<div class="widget" id="a"></div><div class="widget" id="b"></div>"#);

    let components = Component::augment_all(&doc, ".widget", |el| {
        let label = el.attribute("id").unwrap_or_default();
        ComponentOptions::new()
            .state(Value::from(serde_json::json!({"label": label})))
            .render(|c| format!("<b>{}</b>", c.get("label").unwrap()))
    });

    assert_eq!(components.len(), 2);
    assert_eq!(doc.query("#a").unwrap().markup(), "<b>a</b>");
    assert_eq!(doc.query("#b").unwrap().markup(), "<b>b</b>");
}

#[test]
fn test_event_dispatch_and_inert_gate() {
    let doc = Document::new();
    let el = doc.create_element("div");
    doc.root().append_child(&el);

    let clicks = Rc::new(Cell::new(0));
    let clicks_clone = clicks.clone();
    let component = Component::augment(
        &doc,
        &el,
        ComponentOptions::new()
            .render(|_| r#"<button class="add">+</button>"#.to_string())
            .on_event("click", Some("button.add"), move |c, _event| {
                clicks_clone.set(clicks_clone.get() + 1);
                // The owning component arrives explicitly
                assert!(c.is_attached());
            }),
    );

    let button = el.query("button.add").unwrap();
    let event = spark_dom::Event::new("click", &button);
    assert_eq!(component.dispatch(&event), 1);
    assert_eq!(clicks.get(), 1);

    // Wrong kind or unmatched selector: no handler
    assert_eq!(component.dispatch(&spark_dom::Event::new("input", &button)), 0);

    // Inert components never invoke handlers
    component.destroy();
    assert_eq!(component.dispatch(&event), 0);
    assert_eq!(clicks.get(), 1);
}
