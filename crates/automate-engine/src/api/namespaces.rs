//! Namespace objects: `app`, `device`, `files`, `http`, `storages`, `console`, plus `shell`.

use rhai::{
    Dynamic, Engine, INT, Map, Module, NativeCallContext,
    serde::{from_dynamic, to_dynamic},
};
use serde_json::Value;

use super::{ApiContext, RhaiResult};
use crate::{
    bridge::{Bridge, decode_json},
    console::{Console, LogLevel},
    verbs,
};

/// `app` namespace.
#[derive(Clone)]
struct AppApi;

/// `device` namespace.
#[derive(Clone)]
struct DeviceApi;

/// `files` namespace.
#[derive(Clone)]
struct FilesApi;

/// `http` namespace.
#[derive(Clone)]
struct HttpApi;

/// `storages` namespace.
#[derive(Clone)]
struct StoragesApi;

/// `console` namespace.
#[derive(Clone)]
struct ConsoleApi {
    /// Output target.
    console: Console,
}

/// A named host-side key-value store. Only the name lives here.
#[derive(Clone)]
pub struct Storage {
    /// Namespace name.
    name: String,
    /// Host access.
    bridge: Bridge,
}

impl Storage {
    /// Bridge arguments `[name, key, extra...]`.
    fn args(&self, key: &str, extra: Option<String>) -> Vec<String> {
        let mut args = vec![self.name.clone(), key.to_string()];
        args.extend(extra);
        args
    }

    /// Stored value, decoded from JSON; plain text is returned verbatim.
    fn get(&self, key: &str) -> Option<Dynamic> {
        let raw = self.bridge.call(verbs::STORAGE_GET, &self.args(key, None))?;
        match decode_json(verbs::STORAGE_GET, &raw) {
            Some(Value::Null) => None,
            Some(value) => json_to_dynamic(&value),
            None if raw.is_empty() => None,
            None => Some(Dynamic::from(raw)),
        }
    }
}

/// Register the namespace constants and their methods.
pub(super) fn register(engine: &mut Engine, ctx: &ApiContext) {
    engine.register_type_with_name::<AppApi>("App");
    engine.register_type_with_name::<DeviceApi>("Device");
    engine.register_type_with_name::<FilesApi>("Files");
    engine.register_type_with_name::<HttpApi>("Http");
    engine.register_type_with_name::<StoragesApi>("Storages");
    engine.register_type_with_name::<Storage>("Storage");
    engine.register_type_with_name::<ConsoleApi>("Console");

    register_app(engine, ctx);
    register_device(engine, ctx);
    register_io(engine, ctx);
    register_storage(engine, ctx);
    register_console(engine);

    let mut module = Module::new();
    module.set_var("app", AppApi);
    module.set_var("device", DeviceApi);
    module.set_var("files", FilesApi);
    module.set_var("http", HttpApi);
    module.set_var("storages", StoragesApi);
    module.set_var(
        "console",
        ConsoleApi {
            console: ctx.console.clone(),
        },
    );
    engine.register_global_module(module.into());
}

/// `app.*`.
fn register_app(engine: &mut Engine, ctx: &ApiContext) {
    for (name, verb) in [
        ("launch", verbs::APP_LAUNCH),
        ("launchApp", verbs::APP_LAUNCH_APP),
        ("openUrl", verbs::OPEN_URL),
    ] {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |nc: NativeCallContext, _: &mut AppApi, arg: &str| -> RhaiResult<bool> {
                c.guarded(nc.call_position(), || c.bridge.call_bool(verb, &[arg.to_string()]))
            },
        );
    }
    let c = ctx.clone();
    engine.register_fn(
        "currentPackage",
        move |nc: NativeCallContext, _: &mut AppApi| -> RhaiResult<String> {
            c.guarded(nc.call_position(), || {
                c.bridge.call_text(verbs::APP_CURRENT_PACKAGE, &[])
            })
        },
    );
}

/// `device.*`.
fn register_device(engine: &mut Engine, ctx: &ApiContext) {
    for (name, verb) in [("width", verbs::DEVICE_WIDTH), ("height", verbs::DEVICE_HEIGHT)] {
        let c = ctx.clone();
        engine.register_get(
            name,
            move |nc: NativeCallContext, _: &mut DeviceApi| -> RhaiResult<INT> {
                c.guarded(nc.call_position(), || c.bridge.call_i64(verb, &[], 0))
            },
        );
    }
    let c = ctx.clone();
    engine.register_fn(
        "getBattery",
        move |nc: NativeCallContext, _: &mut DeviceApi| -> RhaiResult<INT> {
            c.guarded(nc.call_position(), || {
                c.bridge.call_i64(verbs::DEVICE_BATTERY, &[], -1)
            })
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "wakeUp",
        move |nc: NativeCallContext, _: &mut DeviceApi| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || c.bridge.call_bool(verbs::DEVICE_WAKE_UP, &[]))
        },
    );
}

/// `files.*`, `http.*` and `shell`.
fn register_io(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn(
        "read",
        move |nc: NativeCallContext, _: &mut FilesApi, path: &str| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || {
                c.bridge
                    .call(verbs::FILES_READ, &[path.to_string()])
                    .map_or(Dynamic::UNIT, Dynamic::from)
            })
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "write",
        move |nc: NativeCallContext, _: &mut FilesApi, path: &str, text: &str| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || {
                c.bridge
                    .call_bool(verbs::FILES_WRITE, &[path.to_string(), text.to_string()])
            })
        },
    );

    let c = ctx.clone();
    engine.register_fn(
        "get",
        move |nc: NativeCallContext, _: &mut HttpApi, url: &str| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || {
                json_answer(&c.bridge, verbs::HTTP_GET, &[url.to_string()])
            })
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "postForm",
        move |nc: NativeCallContext, _: &mut HttpApi, url: &str, form: Map| -> RhaiResult<Dynamic> {
            let body = dynamic_to_json(&Dynamic::from_map(form));
            c.guarded(nc.call_position(), || {
                json_answer(&c.bridge, verbs::HTTP_POST_FORM, &[url.to_string(), body])
            })
        },
    );

    let c = ctx.clone();
    engine.register_fn("shell", move |nc: NativeCallContext, cmd: &str| -> RhaiResult<Map> {
        c.guarded(nc.call_position(), || shell(&c.bridge, cmd, false))
    });
    let c = ctx.clone();
    engine.register_fn(
        "shell",
        move |nc: NativeCallContext, cmd: &str, opts: Map| -> RhaiResult<Map> {
            let root = opts
                .get("root")
                .and_then(|v| v.as_bool().ok())
                .unwrap_or(false);
            c.guarded(nc.call_position(), || shell(&c.bridge, cmd, root))
        },
    );
}

/// `storages.create` and the storage handle.
fn register_storage(engine: &mut Engine, ctx: &ApiContext) {
    let c = ctx.clone();
    engine.register_fn("create", move |_: &mut StoragesApi, name: &str| Storage {
        name: name.to_string(),
        bridge: c.bridge.clone(),
    });
    engine.register_get("name", |s: &mut Storage| s.name.clone());

    let c = ctx.clone();
    engine.register_fn(
        "get",
        move |nc: NativeCallContext, s: &mut Storage, key: &str| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || s.get(key).unwrap_or(Dynamic::UNIT))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "get",
        move |nc: NativeCallContext, s: &mut Storage, key: &str, default: Dynamic| -> RhaiResult<Dynamic> {
            c.guarded(nc.call_position(), || s.get(key).unwrap_or(default))
        },
    );
    let c = ctx.clone();
    engine.register_fn(
        "put",
        move |nc: NativeCallContext, s: &mut Storage, key: &str, value: Dynamic| -> RhaiResult<bool> {
            let encoded = dynamic_to_json(&value);
            c.guarded(nc.call_position(), || {
                s.bridge
                    .call_bool(verbs::STORAGE_PUT, &s.args(key, Some(encoded)))
            })
        },
    );
    for (name, verb) in [
        ("remove", verbs::STORAGE_REMOVE),
        ("contains", verbs::STORAGE_CONTAINS),
    ] {
        let c = ctx.clone();
        engine.register_fn(
            name,
            move |nc: NativeCallContext, s: &mut Storage, key: &str| -> RhaiResult<bool> {
                c.guarded(nc.call_position(), || s.bridge.call_bool(verb, &s.args(key, None)))
            },
        );
    }
    let c = ctx.clone();
    engine.register_fn(
        "clear",
        move |nc: NativeCallContext, s: &mut Storage| -> RhaiResult<bool> {
            c.guarded(nc.call_position(), || {
                s.bridge.call_bool(verbs::STORAGE_CLEAR, &[s.name.clone()])
            })
        },
    );
}

/// `console.log/info/warn/error/debug` with one to three arguments joined by spaces.
fn register_console(engine: &mut Engine) {
    for level in [LogLevel::Log, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
        let name = level.as_str();
        engine.register_fn(name, move |c: &mut ConsoleApi, a: Dynamic| {
            c.console.emit(level, &a.to_string());
        });
        engine.register_fn(name, move |c: &mut ConsoleApi, a: Dynamic, b: Dynamic| {
            c.console.emit(level, &format!("{a} {b}"));
        });
        engine.register_fn(
            name,
            move |c: &mut ConsoleApi, a: Dynamic, b: Dynamic, d: Dynamic| {
                c.console.emit(level, &format!("{a} {b} {d}"));
            },
        );
    }

    // Rhai routes the string returned by any `debug` function to `on_debug`.
    let name = LogLevel::Debug.as_str();
    engine.register_fn(name, |_: &mut ConsoleApi, a: Dynamic| a.to_string());
    engine.register_fn(name, |_: &mut ConsoleApi, a: Dynamic, b: Dynamic| {
        format!("{a} {b}")
    });
    engine.register_fn(
        name,
        |_: &mut ConsoleApi, a: Dynamic, b: Dynamic, d: Dynamic| format!("{a} {b} {d}"),
    );
}

/// Run a shell command on the host. Absent answers read as a failed command.
fn shell(bridge: &Bridge, cmd: &str, root: bool) -> Map {
    let args = [cmd.to_string(), root.to_string()];
    let mut out = Map::new();
    out.insert("code".into(), Dynamic::from_int(-1));
    out.insert("result".into(), Dynamic::from(String::new()));
    out.insert("error".into(), Dynamic::from(String::new()));
    if let Some(Value::Object(fields)) = bridge.call_json(verbs::SHELL, &args) {
        for (key, value) in fields {
            if let Some(v) = json_to_dynamic(&value) {
                out.insert(key.into(), v);
            }
        }
    }
    out
}

/// Call a JSON-answering verb and hand the decoded value to the script (`()` when absent).
fn json_answer(bridge: &Bridge, verb: &str, args: &[String]) -> Dynamic {
    bridge
        .call_json(verb, args)
        .and_then(|v| json_to_dynamic(&v))
        .unwrap_or(Dynamic::UNIT)
}

/// Convert host JSON into script values.
fn json_to_dynamic(value: &Value) -> Option<Dynamic> {
    to_dynamic(value).ok()
}

/// Encode a script value as JSON text. Values with no JSON form are sent as strings.
fn dynamic_to_json(value: &Dynamic) -> String {
    from_dynamic::<Value>(value)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| Value::String(value.to_string()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_values_encode_as_json() {
        assert_eq!(dynamic_to_json(&Dynamic::from_int(3)), "3");
        assert_eq!(dynamic_to_json(&Dynamic::from("hi".to_string())), r#""hi""#);
        let mut map = Map::new();
        map.insert("a".into(), Dynamic::from(true));
        assert_eq!(dynamic_to_json(&Dynamic::from_map(map)), r#"{"a":true}"#);
    }

    #[test]
    fn shell_defaults_when_host_is_silent() {
        let out = shell(&Bridge::detached(), "ls", false);
        assert_eq!(out["code"].as_int().unwrap(), -1);
        assert_eq!(out["result"].clone().into_string().unwrap(), "");
    }
}
