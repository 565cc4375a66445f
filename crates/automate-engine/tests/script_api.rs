use std::sync::Arc;

use automate_engine::{Engine, EngineConfig, EvalError, LogLevel, test_support::RecordingHost};
use parking_lot::Mutex;

/// A container node, third child of its own parent.
const PARENT: &str = r#"{"_text":"root","_indexInParent":2,"bounds":{"left":0,"top":0,"right":200,"bottom":400}}"#;

/// Two children of [`PARENT`].
const CHILDREN: &str = r#"[
    {"_text":"A","_id":"com.app:id/subtitle","bounds":{"left":0,"top":0,"right":200,"bottom":100}},
    {"_text":"B","_id":"com.app:id/title","bounds":{"left":0,"top":100,"right":200,"bottom":200}}
]"#;

/// Lookup key of [`PARENT`].
const PARENT_BOUNDS: &str = r#"{"left":0,"top":0,"right":200,"bottom":400}"#;

/// Engine bound to `host`, with no settle delay between focus and typing.
fn engine_with(host: &RecordingHost) -> Engine {
    let mut engine = Engine::new(EngineConfig {
        settle_delay_ms: 0,
        ..EngineConfig::default()
    });
    engine.initialize(host.capability());
    engine
}

/// Owned copies of `items`.
fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn navigation_sends_the_bounds_key() {
    let host = RecordingHost::new()
        .respond("selector.findOne", PARENT)
        .respond("uiobject.children", CHILDREN);
    let engine = engine_with(&host);
    let out = engine
        .evaluate(
            r#"let kids = text("root").findOne().children(); kids.findOne(id("title")).text()"#,
            "t",
        )
        .unwrap();
    assert_eq!(out, "B");
    assert_eq!(
        host.calls_to("uiobject.children")[0].args,
        strings(&[PARENT_BOUNDS])
    );
}

#[test]
fn node_navigation_verbs_lead_with_bounds() {
    let host = RecordingHost::new().respond("selector.findOne", PARENT);
    let engine = engine_with(&host);
    engine
        .evaluate(
            r#"let n = text("root").findOne();
               n.parent(); n.find(id("title")); n.scrollForward(); n.scrollBackward();"#,
            "t",
        )
        .unwrap();
    assert_eq!(
        host.verbs(),
        strings(&[
            "selector.findOne",
            "uiobject.parent",
            "uiobject.find",
            "uiobject.scrollForward",
            "uiobject.scrollBackward",
        ])
    );
    let calls = host.calls();
    assert_eq!(calls[1].args, strings(&[PARENT_BOUNDS]));
    assert_eq!(
        calls[2].args,
        strings(&[PARENT_BOUNDS, r#"[{"type":"id","value":"title"}]"#])
    );
    assert_eq!(calls[3].args, strings(&[PARENT_BOUNDS]));
    assert_eq!(calls[4].args, strings(&[PARENT_BOUNDS]));
}

#[test]
fn node_taps_target_the_center() {
    let host = RecordingHost::new()
        .respond("selector.findOne", PARENT)
        .respond("click", "true");
    let engine = engine_with(&host);
    let out = engine
        .evaluate(
            r#"let n = text("root").findOne(); n.longClick(); n.clickBounds(5, -10)"#,
            "t",
        )
        .unwrap();
    assert_eq!(out, "true");
    assert_eq!(host.calls_to("longClick")[0].args, strings(&["100", "200"]));
    assert_eq!(host.calls_to("click")[0].args, strings(&["105", "190"]));
}

#[test]
fn click_bounds_saturates_extreme_offsets() {
    let host = RecordingHost::new().respond("selector.findOne", PARENT);
    let engine = engine_with(&host);
    engine
        .evaluate(
            r#"let n = text("root").findOne();
               n.clickBounds(9223372036854775807, 0);
               n.clickBounds(-9223372036854775807 - 1, 9223372036854775807);"#,
            "t",
        )
        .unwrap();
    let taps = host.calls_to("click");
    assert_eq!(taps[0].args, strings(&["9223372036854775807", "200"]));
    assert_eq!(
        taps[1].args,
        strings(&["-9223372036854775708", "9223372036854775807"])
    );
}

#[test]
fn huge_host_bounds_do_not_overflow() {
    let host = RecordingHost::new().respond(
        "selector.findOne",
        r#"{"bounds":{"left":1e300,"top":1e300,"right":1e300,"bottom":1e300}}"#,
    );
    let engine = engine_with(&host);
    engine
        .evaluate(r#"let n = text("x").findOne(); n.click(); n.clickBounds(1, 1)"#, "t")
        .unwrap();
    let max = i64::MAX.to_string();
    let taps = host.calls_to("click");
    assert_eq!(taps[0].args, vec![max.clone(), max.clone()]);
    assert_eq!(taps[1].args, vec![max.clone(), max]);
}

#[test]
fn selector_terminals_send_the_condition_list() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    engine
        .evaluate(
            r#"let s = text("root");
               s.findOnce(); s.findOnce(3); s.click(); s.longClick(); s.setText("hi");
               s.scrollForward(); s.scrollBackward();"#,
            "t",
        )
        .unwrap();
    let cond = r#"[{"type":"text","value":"root"}]"#;
    let calls = host.calls();
    let sent: Vec<(&str, Vec<String>)> = calls
        .iter()
        .map(|c| (c.verb.as_str(), c.args.clone()))
        .collect();
    assert_eq!(
        sent,
        vec![
            ("selector.findOnce", strings(&[cond, "0"])),
            ("selector.findOnce", strings(&[cond, "3"])),
            ("selector.click", strings(&[cond])),
            ("selector.longClick", strings(&[cond])),
            ("selector.setText", strings(&[cond, "hi"])),
            ("selector.scrollForward", strings(&[cond])),
            ("selector.scrollBackward", strings(&[cond])),
        ]
    );
}

#[test]
fn sibling_navigation_uses_index_in_parent() {
    let host = RecordingHost::new().respond("selector.findOne", PARENT);
    let engine = engine_with(&host);
    engine
        .evaluate(
            r#"let n = text("root").findOne(); n.nextSibling(); n.previousSibling(); n.sibling(-1);"#,
            "t",
        )
        .unwrap();
    let indexes: Vec<String> = host
        .calls_to("uiobject.sibling")
        .into_iter()
        .map(|c| c.args[1].clone())
        .collect();
    assert_eq!(indexes, strings(&["3", "1", "-1"]));
}

#[test]
fn node_set_text_focuses_first() {
    let host = RecordingHost::new().respond("selector.findOne", PARENT);
    let engine = engine_with(&host);
    engine
        .evaluate(r#"text("root").findOne().setText("hello")"#, "t")
        .unwrap();
    assert_eq!(host.verbs(), strings(&["selector.findOne", "click", "setText"]));
    assert_eq!(host.calls_to("setText")[0].args, strings(&["hello"]));
}

#[test]
fn screen_metrics_scale_coordinates() {
    let host = RecordingHost::new()
        .respond("device.width", "2160")
        .respond("device.height", "3840");
    let engine = engine_with(&host);
    engine
        .evaluate("setScreenMetrics(1080, 1920); click(100, 200); swipe(0, 0, 10, 10, 300)", "t")
        .unwrap();
    assert_eq!(host.calls_to("click")[0].args, strings(&["200", "400"]));
    assert_eq!(
        host.calls_to("swipe")[0].args,
        strings(&["0", "0", "20", "20", "300"])
    );

    let err = engine.evaluate("setScreenMetrics(0, 10)", "t").unwrap_err();
    assert!(err.to_string().contains("invalid size"));
}

#[test]
fn gestures_encode_points_as_json() {
    let host = RecordingHost::new().respond("gesture", "true");
    let engine = engine_with(&host);
    let out = engine
        .evaluate("gesture(500, [[0, 0], [100, 100]])", "t")
        .unwrap();
    assert_eq!(out, "true");
    assert_eq!(
        host.calls_to("gesture")[0].args,
        strings(&["[500,[0,0],[100,100]]"])
    );

    engine
        .evaluate("gestures([[0, 200, [1, 2], [3, 4]], [300, [5, 6], [7, 8]]])", "t")
        .unwrap();
    assert_eq!(
        host.calls_to("gestures")[0].args,
        strings(&["[[0,200,[1,2],[3,4]],[300,[5,6],[7,8]]]"])
    );
}

#[test]
fn single_point_gesture_is_rejected_before_the_host() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let err = engine.evaluate("gesture(500, [[0, 0]])", "g.rhai").unwrap_err();
    match err {
        EvalError::Script {
            message, line, ..
        } => {
            assert_eq!(message, "gesture needs at least two points, got 1");
            assert_eq!(line, Some(1));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(host.calls_to("gesture").is_empty());
}

#[test]
fn console_feeds_buffer_and_sink() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    engine.set_log_sink(Some(Arc::new(move |level: &str, message: &str| {
        sink.lock().push(format!("{level}:{message}"));
    })));
    engine
        .evaluate(r#"console.log("a", 1); console.warn("careful"); print("p");"#, "t")
        .unwrap();

    let logs = engine.logs();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[0].message, "a 1");
    assert_eq!(logs[1].level, LogLevel::Warn);
    assert_eq!(logs[2].level, LogLevel::Log);
    assert_eq!(
        *seen.lock(),
        strings(&["log:a 1", "warn:careful", "log:p"])
    );
}

#[test]
fn console_debug_reaches_buffer_and_sink() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    engine.set_log_sink(Some(Arc::new(move |level: &str, message: &str| {
        sink.lock().push(format!("{level}:{message}"));
    })));
    let out = engine
        .evaluate(r#"console.debug("d", 2); console.info("i"); console.debug("a", "b", 3); 1"#, "t")
        .unwrap();
    assert_eq!(out, "1");

    let logs = engine.logs();
    let entries: Vec<(LogLevel, &str)> =
        logs.iter().map(|e| (e.level, e.message.as_str())).collect();
    assert_eq!(
        entries,
        vec![
            (LogLevel::Debug, "d 2"),
            (LogLevel::Info, "i"),
            (LogLevel::Debug, "a b 3"),
        ]
    );
    assert_eq!(*seen.lock(), strings(&["debug:d 2", "info:i", "debug:a b 3"]));
}

#[test]
fn storages_round_trip_json() {
    let host = RecordingHost::new()
        .respond("storage.put", "true")
        .respond("storage.get", r#"{"a":1}"#);
    let engine = engine_with(&host);
    let out = engine
        .evaluate(
            r#"let s = storages.create("cfg"); s.put("k", #{a: 1}); s.get("k").a"#,
            "t",
        )
        .unwrap();
    assert_eq!(out, "1");
    assert_eq!(
        host.calls_to("storage.put")[0].args,
        strings(&["cfg", "k", r#"{"a":1}"#])
    );
}

#[test]
fn storage_get_falls_back_to_default() {
    let host = RecordingHost::new().respond("storage.get", "null");
    let engine = engine_with(&host);
    let out = engine
        .evaluate(r#"storages.create("cfg").get("missing", 7)"#, "t")
        .unwrap();
    assert_eq!(out, "7");
}

#[test]
fn shell_and_http_decode_host_json() {
    let host = RecordingHost::new()
        .respond("shell", r#"{"code":0,"result":"x","error":""}"#)
        .respond("http.get", r#"{"statusCode":200,"body":"ok"}"#);
    let engine = engine_with(&host);
    assert_eq!(
        engine.evaluate(r#"shell("ls", #{root: true}).result"#, "t").unwrap(),
        "x"
    );
    assert_eq!(host.calls_to("shell")[0].args, strings(&["ls", "true"]));
    assert_eq!(
        engine.evaluate(r#"http.get("https://x").statusCode"#, "t").unwrap(),
        "200"
    );
}

#[test]
fn silent_host_reads_as_defaults() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    assert_eq!(engine.evaluate(r#"shell("ls").code"#, "t").unwrap(), "-1");
    assert_eq!(engine.evaluate(r#"files.read("/x")"#, "t").unwrap(), "undefined");
    assert_eq!(engine.evaluate("device.width", "t").unwrap(), "0");
    assert_eq!(engine.evaluate("device.getBattery()", "t").unwrap(), "-1");
    assert_eq!(engine.evaluate("currentPackage()", "t").unwrap(), "");
}
