//! Top-level functions: gestures, global actions, apps, clipboard and flow control.

use rhai::{Array, Dynamic, Engine, FLOAT, INT, NativeCallContext, Position};
use serde_json::{Value, json};

use super::{ApiContext, EXIT_TOKEN, RhaiResult, boxed_validation_error, terminated};
use crate::{selector::ConditionKind, verbs};

/// Register the global functions.
pub(super) fn register(engine: &mut Engine, ctx: &ApiContext) {
    register_flow(engine, ctx);
    register_gestures(engine, ctx);
    register_actions(engine, ctx);
}

/// `sleep`, `exit` and `setScreenMetrics`.
fn register_flow(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("sleep", move |nc: NativeCallContext, ms: INT| -> RhaiResult<()> {
        c.sleep(ms, nc.call_position())
    });
    let c = ctx.clone();
    engine.register_fn("sleep", move |nc: NativeCallContext, ms: FLOAT| -> RhaiResult<()> {
        c.sleep(ms as INT, nc.call_position())
    });
    engine.register_fn("exit", |nc: NativeCallContext| -> RhaiResult<()> {
        Err(terminated(EXIT_TOKEN, nc.call_position()))
    });
    let c = ctx.clone();
    engine.register_fn(
        "setScreenMetrics",
        move |nc: NativeCallContext, w: INT, h: INT| -> RhaiResult<()> {
            c.set_screen_metrics(w, h, nc.call_position())
        },
    );
}

/// Coordinate gestures. Coordinates pass through `setScreenMetrics` scaling.
fn register_gestures(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("click", move |nc: NativeCallContext, x: INT, y: INT| -> RhaiResult<bool> {
        let (x, y) = c.scale_point(x, y);
        c.guarded(nc.call_position(), || {
            c.bridge.call_bool(verbs::CLICK, &[x.to_string(), y.to_string()])
        })
    });
    let c = ctx.clone();
    engine.register_fn("click", move |nc: NativeCallContext, text: &str| -> RhaiResult<bool> {
        let sel = c.selector().push(ConditionKind::Text, text);
        c.guarded(nc.call_position(), || sel.click())
    });
    let c = ctx.clone();
    engine.register_fn(
        "longClick",
        move |nc: NativeCallContext, x: INT, y: INT| -> RhaiResult<bool> {
            let (x, y) = c.scale_point(x, y);
            c.guarded(nc.call_position(), || {
                c.bridge.call_bool(verbs::LONG_CLICK, &[x.to_string(), y.to_string()])
            })
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "press",
        move |nc: NativeCallContext, x: INT, y: INT, duration: INT| -> RhaiResult<bool> {
            let (x, y) = c.scale_point(x, y);
            c.guarded(nc.call_position(), || {
                c.bridge.call_bool(
                    verbs::PRESS,
                    &[x.to_string(), y.to_string(), duration.to_string()],
                )
            })
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "swipe",
        move |nc: NativeCallContext, x1: INT, y1: INT, x2: INT, y2: INT| -> RhaiResult<bool> {
            swipe(&c, nc.call_position(), [x1, y1, x2, y2], None)
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "swipe",
        move |nc: NativeCallContext, x1: INT, y1: INT, x2: INT, y2: INT, duration: INT| -> RhaiResult<bool> {
            swipe(&c, nc.call_position(), [x1, y1, x2, y2], Some(duration))
        },
    );
    for verb in [
        verbs::SWIPE_UP,
        verbs::SWIPE_DOWN,
        verbs::SWIPE_LEFT,
        verbs::SWIPE_RIGHT,
    ] {
        let c = ctx.clone();
        engine.register_fn(verb, move |nc: NativeCallContext| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || c.bridge.call_bool(verb, &[]))
        });
    }

    let c = ctx.clone();
    engine.register_fn(
        "gesture",
        move |nc: NativeCallContext, duration: INT, points: Array| -> RhaiResult<bool> {
            gesture(&c, nc.call_position(), duration, &points)
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "gesture",
        move |nc: NativeCallContext, duration: INT, p1: Array, p2: Array| -> RhaiResult<bool> {
            let points = vec![Dynamic::from(p1), Dynamic::from(p2)];
            gesture(&c, nc.call_position(), duration, &points)
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "gesture",
        move |nc: NativeCallContext,
              duration: INT,
              p1: Array,
              p2: Array,
              p3: Array|
              -> RhaiResult<bool> {
            let points = vec![Dynamic::from(p1), Dynamic::from(p2), Dynamic::from(p3)];
            gesture(&c, nc.call_position(), duration, &points)
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "gestures",
        move |nc: NativeCallContext, strokes: Array| -> RhaiResult<bool> {
            gestures(&c, nc.call_position(), &strokes)
        },
    );
}

/// Global actions, apps, text entry, clipboard and toasts.
fn register_actions(engine: &mut Engine, ctx: &ApiContext) {
    for verb in [
        verbs::BACK,
        verbs::HOME,
        verbs::RECENTS,
        verbs::NOTIFICATIONS,
        verbs::QUICK_SETTINGS,
    ] {
        let c = ctx.clone();
        engine.register_fn(verb, move |nc: NativeCallContext| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || c.bridge.call_bool(verb, &[]))
        });
    }

    let one_arg_bool = [
        ("launch", verbs::APP_LAUNCH),
        ("launchApp", verbs::APP_LAUNCH_APP),
        ("openUrl", verbs::OPEN_URL),
        ("setText", verbs::SET_TEXT),
        ("setClip", verbs::SET_CLIP),
    ];
    for (name, verb) in one_arg_bool {
        let c = ctx.clone();
        engine.register_fn(name, move |nc: NativeCallContext, arg: &str| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || c.bridge.call_bool(verb, &[arg.to_string()]))
        });
    }

    let c = ctx.clone();
    engine.register_fn("toast", move |nc: NativeCallContext, msg: Dynamic| -> RhaiResult<()> {
        let text = msg.to_string();
        c.guarded(nc.call_position(), || {
            c.bridge.call(verbs::TOAST, &[text]);
        })
    });
    let c = ctx.clone();
    engine.register_fn("getClip", move |nc: NativeCallContext| -> RhaiResult<String> {
        c.guarded(nc.call_position(), || c.bridge.call_text(verbs::GET_CLIP, &[]))
    });
    let c = ctx.clone();
    engine.register_fn("currentPackage", move |nc: NativeCallContext| -> RhaiResult<String> {
        c.guarded(nc.call_position(), || c.bridge.call_text(verbs::CURRENT_PACKAGE, &[]))
    });
}

/// Issue a scaled swipe.
fn swipe(ctx: &ApiContext, pos: Position, coords: [INT; 4], duration: Option<INT>) -> RhaiResult<bool> {
    let (x1, y1) = ctx.scale_point(coords[0], coords[1]);
    let (x2, y2) = ctx.scale_point(coords[2], coords[3]);
    let mut args = vec![x1.to_string(), y1.to_string(), x2.to_string(), y2.to_string()];
    if let Some(d) = duration {
        args.push(d.to_string());
    }
    ctx.guarded(pos, || ctx.bridge.call_bool(verbs::SWIPE, &args))
}

/// Read an `[x, y]` pair and scale it.
fn point(ctx: &ApiContext, pos: Position, value: &Dynamic) -> RhaiResult<Value> {
    let invalid = || boxed_validation_error(format!("expected [x, y] point, got {value}"), pos);
    let arr = value.read_lock::<Array>().ok_or_else(invalid)?;
    let [x, y] = arr.as_slice() else {
        return Err(invalid());
    };
    let coord = |d: &Dynamic| {
        d.as_int()
            .ok()
            .or_else(|| d.as_float().ok().map(|f| f as INT))
            .ok_or_else(invalid)
    };
    let (x, y) = ctx.scale_point(coord(x)?, coord(y)?);
    Ok(json!([x, y]))
}

/// Encode one stroke: `[delay?, duration, [x, y], ...]` with at least two points.
fn stroke(ctx: &ApiContext, pos: Position, prefix: &[INT], points: &[Dynamic]) -> RhaiResult<Value> {
    if points.len() < 2 {
        return Err(boxed_validation_error(
            format!("gesture needs at least two points, got {}", points.len()),
            pos,
        ));
    }
    let mut out: Vec<Value> = prefix.iter().map(|n| json!(n)).collect();
    for p in points {
        out.push(point(ctx, pos, p)?);
    }
    Ok(Value::Array(out))
}

/// `gesture(duration, [[x, y], ...])`.
fn gesture(ctx: &ApiContext, pos: Position, duration: INT, points: &[Dynamic]) -> RhaiResult<bool> {
    let payload = stroke(ctx, pos, &[duration], points)?.to_string();
    ctx.guarded(pos, || ctx.bridge.call_bool(verbs::GESTURE, &[payload]))
}

/// `gestures([[delay, duration, [x, y], ...], [duration, [x, y], ...]])`.
fn gestures(ctx: &ApiContext, pos: Position, strokes: &[Dynamic]) -> RhaiResult<bool> {
    let mut encoded = Vec::with_capacity(strokes.len());
    for entry in strokes {
        let invalid =
            || boxed_validation_error(format!("expected [delay?, duration, points...], got {entry}"), pos);
        let items = entry.read_lock::<Array>().ok_or_else(invalid)?;
        let numbers: Vec<INT> = items.iter().map_while(|d| d.as_int().ok()).collect();
        if numbers.is_empty() || numbers.len() > 2 {
            return Err(invalid());
        }
        encoded.push(stroke(ctx, pos, &numbers, &items[numbers.len()..])?);
    }
    let payload = Value::Array(encoded).to_string();
    ctx.guarded(pos, || ctx.bridge.call_bool(verbs::GESTURES, &[payload]))
}
