//! Selector factories, chain methods and terminals.

use rhai::{Array, Dynamic, Engine, NativeCallContext};

use super::{ApiContext, RhaiResult, opt_to_dynamic};
use crate::{
    node::UiNode,
    selector::{ConditionKind, Selector, Shape},
};

/// Register the selector type and every function that builds or runs one.
pub(super) fn register(engine: &mut Engine, ctx: &ApiContext) {
    engine.register_type_with_name::<Selector>("Selector");
    engine.register_fn("to_string", |sel: &mut Selector| sel.to_json());
    engine.register_fn("to_debug", |sel: &mut Selector| format!("Selector({})", sel.to_json()));
    engine.register_fn("toString", |sel: &mut Selector| sel.to_json());
    engine.register_fn("conditions", |sel: &mut Selector| sel.len() as i64);

    let c = ctx.clone();
    engine.register_fn("newSelector", move || c.selector());

    for &kind in ConditionKind::ALL {
        register_condition(engine, ctx, kind);
    }
    register_terminals(engine, ctx);
    register_local_matching(engine, ctx);
}

/// Register the global factory and the chain method for one condition kind.
fn register_condition(engine: &mut Engine, ctx: &ApiContext, kind: ConditionKind) {
    let name = kind.name();
    match kind.shape() {
        Shape::Text(..) => {
            let c = ctx.clone();
            engine.register_fn(name, move |value: &str| c.selector().push(kind, value));
            engine.register_fn(name, move |sel: &mut Selector, value: &str| sel.push(kind, value));
        }
        Shape::Flag(_) => {
            let c = ctx.clone();
            engine.register_fn(name, move || c.selector().flag(kind, true));
            let c = ctx.clone();
            engine.register_fn(name, move |on: bool| c.selector().flag(kind, on));
            engine.register_fn(name, move |sel: &mut Selector| sel.flag(kind, true));
            engine.register_fn(name, move |sel: &mut Selector, on: bool| sel.flag(kind, on));
        }
        Shape::Depth | Shape::DrawingOrder => {
            let c = ctx.clone();
            engine.register_fn(name, move |n: i64| c.selector().number(kind, n));
            // Without an argument the call adds nothing.
            let c = ctx.clone();
            engine.register_fn(name, move || c.selector());
            engine.register_fn(name, move |sel: &mut Selector, n: i64| sel.number(kind, n));
            engine.register_fn(name, |sel: &mut Selector| sel.clone());
        }
    }
}

/// Register the bridge-backed terminal operations.
fn register_terminals(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn(
        "findOne",
        move |nc: NativeCallContext, sel: &mut Selector| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(sel.find_one()))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "findOnce",
        move |nc: NativeCallContext, sel: &mut Selector| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(sel.find_once(0)))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "findOnce",
        move |nc: NativeCallContext, sel: &mut Selector, index: i64| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(sel.find_once(index)))
        },
    );
    for name in ["findAll", "find"] {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |nc: NativeCallContext, sel: &mut Selector| -> RhaiResult<Array> {
                c.guarded(nc.call_position(), || nodes_to_array(sel.find_all()))
            },
        );
    }
    let c = ctx.clone();
    engine.register_fn(
        "waitFor",
        move |nc: NativeCallContext, sel: &mut Selector| -> RhaiResult<Dynamic> {
            let timeout = i64::try_from(c.config.default_wait_timeout_ms).unwrap_or(i64::MAX);
            c.guarded(nc.call_position(), || opt_to_dynamic(sel.wait_for(timeout)))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "waitFor",
        move |nc: NativeCallContext, sel: &mut Selector, timeout: i64| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || opt_to_dynamic(sel.wait_for(timeout)))
        },
    );

    let bool_terminals: [(&str, fn(&Selector) -> bool); 5] = [
        ("exists", Selector::exists),
        ("click", Selector::click),
        ("longClick", Selector::long_click),
        ("scrollForward", Selector::scroll_forward),
        ("scrollBackward", Selector::scroll_backward),
    ];
    for (name, op) in bool_terminals {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |nc: NativeCallContext, sel: &mut Selector| -> RhaiResult<bool> {
                c.guarded(nc.call_position(), || op(sel))
            },
        );
    }
    let c = ctx.clone();
    engine.register_fn(
        "setText",
        move |nc: NativeCallContext, sel: &mut Selector, text: &str| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || sel.set_text(text))
        },
    );
}

/// Register filtering of already materialized node arrays, which never reaches the host.
fn register_local_matching(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("findOne", move |arr: &mut Array, sel: Selector| {
        arr.iter()
            .filter_map(|item| item.clone().try_cast::<UiNode>())
            .find(|node| sel.matches(node.info(), &c.regexes))
            .map_or(Dynamic::UNIT, Dynamic::from)
    });
    let c = ctx.clone();
    engine.register_fn("find", move |arr: &mut Array, sel: Selector| -> Array {
        arr.iter()
            .filter(|item| {
                item.read_lock::<UiNode>()
                    .is_some_and(|node| sel.matches(node.info(), &c.regexes))
            })
            .cloned()
            .collect()
    });
    let c = ctx.clone();
    engine.register_fn("matches", move |sel: &mut Selector, node: UiNode| {
        sel.matches(node.info(), &c.regexes)
    });
}

/// Wrap nodes for the script.
pub(super) fn nodes_to_array(nodes: Vec<UiNode>) -> Array {
    nodes.into_iter().map(Dynamic::from).collect()
}
