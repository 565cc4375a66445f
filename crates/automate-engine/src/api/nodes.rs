//! Methods available on materialized nodes.

use rhai::{Array, Dynamic, Engine, Map, NativeCallContext};

use super::{ApiContext, RhaiResult, opt_to_dynamic, selectors::nodes_to_array};
use crate::{node::UiNode, selector::Selector};

/// Register getters for a field under both call (`node.text()`) and property (`node.text`) forms.
macro_rules! node_getters {
    ($engine:expr, $($name:literal => |$n:ident| $body:expr,)*) => {
        $(
            $engine.register_fn($name, |$n: &mut UiNode| $body);
            $engine.register_get($name, |$n: &mut UiNode| $body);
        )*
    };
}

/// Register the node type and its operation set.
pub(super) fn register(engine: &mut Engine, ctx: &ApiContext) {
    engine.register_type_with_name::<UiNode>("UiNode");
    engine.register_fn("to_string", |n: &mut UiNode| n.to_string());
    engine.register_fn("to_debug", |n: &mut UiNode| format!("{:?}", n.info()));
    engine.register_fn("toString", |n: &mut UiNode| n.to_string());

    node_getters!(engine,
        "text" => |n| n.info().text.clone(),
        "id" => |n| n.info().id.clone(),
        "className" => |n| n.info().class_name.clone(),
        "desc" => |n| n.info().desc.clone(),
        "packageName" => |n| n.info().package_name.clone(),
        "content" => |n| n.info().content().to_string(),
        "clickable" => |n| n.info().clickable,
        "longClickable" => |n| n.info().long_clickable,
        "scrollable" => |n| n.info().scrollable,
        "enabled" => |n| n.info().enabled,
        "checked" => |n| n.info().checked,
        "selected" => |n| n.info().selected,
        "focusable" => |n| n.info().focusable,
        "focused" => |n| n.info().focused,
        "checkable" => |n| n.info().checkable,
        "editable" => |n| n.info().editable,
        "visibleToUser" => |n| n.info().visible_to_user,
        "depth" => |n| n.info().depth,
        "drawingOrder" => |n| n.info().drawing_order,
        "indexInParent" => |n| n.info().index_in_parent,
        "childCount" => |n| n.info().child_count,
        "left" => |n| n.bounds().left,
        "top" => |n| n.bounds().top,
        "right" => |n| n.bounds().right,
        "bottom" => |n| n.bounds().bottom,
        "width" => |n| n.bounds().width(),
        "height" => |n| n.bounds().height(),
        "centerX" => |n| n.bounds().center_x(),
        "centerY" => |n| n.bounds().center_y(),
    );
    engine.register_fn("bounds", |n: &mut UiNode| bounds_map(n));
    engine.register_fn("cachedChildren", |n: &mut UiNode| nodes_to_array(n.cached_children()));

    register_actions(engine, ctx);
    register_navigation(engine, ctx);
}

/// Bounds as a script map, with derived center and size.
fn bounds_map(node: &UiNode) -> Map {
    let b = node.bounds();
    let mut map = Map::new();
    for (key, value) in [
        ("left", b.left),
        ("top", b.top),
        ("right", b.right),
        ("bottom", b.bottom),
        ("centerX", b.center_x()),
        ("centerY", b.center_y()),
        ("width", b.width()),
        ("height", b.height()),
    ] {
        map.insert(key.into(), Dynamic::from(value));
    }
    map
}

/// Taps, text entry and scrolling.
fn register_actions(engine: &mut Engine, ctx: &ApiContext) {
    let bool_actions: [(&str, fn(&UiNode) -> bool); 4] = [
        ("click", UiNode::click),
        ("longClick", UiNode::long_click),
        ("scrollForward", UiNode::scroll_forward),
        ("scrollBackward", UiNode::scroll_backward),
    ];
    for (name, op) in bool_actions {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |nc: NativeCallContext, n: &mut UiNode| -> RhaiResult<bool> {
                c.guarded(nc.call_position(), || op(n))
            },
        );
    }
    let c = ctx.clone();
    engine.register_fn(
        "clickBounds",
        move |nc: NativeCallContext, n: &mut UiNode, dx: i64, dy: i64| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || n.click_bounds(dx, dy))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "setText",
        move |nc: NativeCallContext, n: &mut UiNode, text: &str| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || n.set_text(text))
        },
    );
}

/// Bounds-keyed tree navigation.
fn register_navigation(engine: &mut Engine, ctx: &ApiContext) {
    let single: [(&str, fn(&UiNode) -> Option<UiNode>); 5] = [
        ("parent", UiNode::parent),
        ("firstChild", UiNode::first_child),
        ("lastChild", UiNode::last_child),
        ("nextSibling", UiNode::next_sibling),
        ("previousSibling", UiNode::previous_sibling),
    ];
    for (name, op) in single {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |nc: NativeCallContext, n: &mut UiNode| -> RhaiResult<Dynamic> {
                c.guarded(nc.call_position(), || opt_to_dynamic(op(n)))
            },
        );
    }

    let c = ctx.clone();
    engine.register_fn(
        "children",
        move |nc: NativeCallContext, n: &mut UiNode| -> RhaiResult<Array> {
            c.guarded(nc.call_position(), || nodes_to_array(n.children()))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "child",
        move |nc: NativeCallContext, n: &mut UiNode, index: i64| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(n.child(index)))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "sibling",
        move |nc: NativeCallContext, n: &mut UiNode, index: i64| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(n.sibling(index)))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "find",
        move |nc: NativeCallContext, n: &mut UiNode, sel: Selector| -> RhaiResult<Array> {
            c.guarded(nc.call_position(), || nodes_to_array(n.find(&sel)))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "findOne",
        move |nc: NativeCallContext, n: &mut UiNode, sel: Selector| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(n.find_one(&sel)))
        },
    );
}
