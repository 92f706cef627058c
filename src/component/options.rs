//! Component options - the builder handed to `Component::augment`.
//!
//! Everything a component can override lives here: initial state, the
//! render override (markup-returning or direct-writing), the render map
//! and `renderProps` declarations, lifecycle hooks, and delegated event
//! bindings. Hooks and handlers always receive the owning component as
//! an explicit first argument.

use indexmap::IndexMap;

use crate::events::EventHandler;
use crate::state::Value;

use super::Component;

// =============================================================================
// RENDER OVERRIDES
// =============================================================================

/// Full-render override returning the root's new markup.
pub type RenderFn = Box<dyn Fn(&Component) -> String>;
/// Alternate convention: the override writes the tree itself.
pub type DirectRenderFn = Box<dyn Fn(&Component)>;
/// Connect/disconnect hook.
pub type HookFn = Box<dyn Fn(&Component)>;
/// Attribute hook: `(component, name, old, new)`.
pub type AttributeHookFn = Box<dyn Fn(&Component, &str, Option<&str>, Option<&str>)>;
/// Visibility hook: `(component, entered)`.
pub type VisibilityHookFn = Box<dyn Fn(&Component, bool)>;

pub(crate) enum RenderKind {
    None,
    Markup(RenderFn),
    Direct(DirectRenderFn),
}

/// Where a render-map entry writes its output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// First matching descendant of the component root.
    Selector(String),
    /// Element carrying `ref="name"`.
    RefName(String),
}

impl Target {
    pub(crate) fn describe(&self) -> String {
        match self {
            Target::Selector(selector) => selector.clone(),
            Target::RefName(name) => format!("ref:{name}"),
        }
    }
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

pub(crate) struct RenderMapEntry {
    pub(crate) target: Target,
    pub(crate) render: RenderFn,
}

// =============================================================================
// COMPONENT OPTIONS
// =============================================================================

/// Builder for [`Component::augment`].
///
/// # Example
///
/// ```ignore
/// let options = ComponentOptions::new()
///     .state(Value::from(serde_json::json!({"count": 0})))
///     .render(|c| format!("<span>{}</span>", c.get("count").unwrap()))
///     .on_event("click", Some("button"), |c, _event| {
///         let n = c.get("count").and_then(|v| v.as_f64()).unwrap_or(0.0);
///         let _ = c.set("count", n + 1.0);
///     });
/// ```
pub struct ComponentOptions {
    pub(crate) state: Value,
    pub(crate) reactive: bool,
    pub(crate) render_on_create: bool,
    pub(crate) render: RenderKind,
    pub(crate) render_map: IndexMap<String, RenderMapEntry>,
    pub(crate) render_props: Option<Vec<String>>,
    pub(crate) on_connect: Option<HookFn>,
    pub(crate) on_disconnect: Option<HookFn>,
    pub(crate) on_attribute: Option<AttributeHookFn>,
    pub(crate) on_visibility: Option<VisibilityHookFn>,
    pub(crate) events: Vec<(String, Option<String>, EventHandler)>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        ComponentOptions {
            state: Value::empty_map(),
            reactive: true,
            render_on_create: true,
            render: RenderKind::None,
            render_map: IndexMap::new(),
            render_props: None,
            on_connect: None,
            on_disconnect: None,
            on_attribute: None,
            on_visibility: None,
            events: Vec::new(),
        }
    }

    /// Initial state (a map value).
    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = state.into();
        self
    }

    /// Disable reactivity: state becomes a plain snapshot, writes never
    /// schedule renders.
    pub fn reactive(mut self, reactive: bool) -> Self {
        self.reactive = reactive;
        self
    }

    /// Whether attaching performs the one initial render (default true).
    pub fn render_on_create(mut self, render_on_create: bool) -> Self {
        self.render_on_create = render_on_create;
        self
    }

    /// Full-render override: returns the root's new markup.
    pub fn render(mut self, render: impl Fn(&Component) -> String + 'static) -> Self {
        self.render = RenderKind::Markup(Box::new(render));
        self
    }

    /// Full-render override that writes the tree itself instead of
    /// returning markup.
    pub fn render_direct(mut self, render: impl Fn(&Component) + 'static) -> Self {
        self.render = RenderKind::Direct(Box::new(render));
        self
    }

    /// Declare a render-map entry: changes under `key` re-render only
    /// `target` with the partial render's markup.
    pub fn render_map(
        mut self,
        key: &str,
        target: impl Into<Target>,
        render: impl Fn(&Component) -> String + 'static,
    ) -> Self {
        self.render_map.insert(
            key.to_string(),
            RenderMapEntry {
                target: target.into(),
                render: Box::new(render),
            },
        );
        self
    }

    /// Restrict rendering to changes under these top-level keys.
    pub fn render_props<S: AsRef<str>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.render_props = Some(keys.into_iter().map(|k| k.as_ref().to_string()).collect());
        self
    }

    pub fn on_connect(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_connect = Some(Box::new(hook));
        self
    }

    pub fn on_disconnect(mut self, hook: impl Fn(&Component) + 'static) -> Self {
        self.on_disconnect = Some(Box::new(hook));
        self
    }

    /// Attribute-changed hook. Ignored while detached.
    pub fn on_attribute(
        mut self,
        hook: impl Fn(&Component, &str, Option<&str>, Option<&str>) + 'static,
    ) -> Self {
        self.on_attribute = Some(Box::new(hook));
        self
    }

    /// Visibility hook. Ignored while detached.
    pub fn on_visibility(mut self, hook: impl Fn(&Component, bool) + 'static) -> Self {
        self.on_visibility = Some(Box::new(hook));
        self
    }

    /// Delegated event binding. `selector` of `None` matches any target
    /// under the component root.
    pub fn on_event(
        mut self,
        kind: &str,
        selector: Option<&str>,
        handler: impl Fn(&Component, &crate::events::Event) + 'static,
    ) -> Self {
        self.events.push((
            kind.to_string(),
            selector.map(str::to_string),
            std::rc::Rc::new(handler),
        ));
        self
    }
}

impl Default for ComponentOptions {
    fn default() -> Self {
        ComponentOptions::new()
    }
}
