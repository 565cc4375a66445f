use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use automate_engine::{Engine, EngineConfig, EvalError, test_support::RecordingHost};

/// A 100x100 node at the origin.
const SQUARE: &str = r#"{"_text":"OK","bounds":{"left":0,"top":0,"right":100,"bottom":100}}"#;

/// Engine bound to `host`, with no settle delay between focus and typing.
fn engine_with(host: &RecordingHost) -> Engine {
    let mut engine = Engine::new(EngineConfig {
        settle_delay_ms: 0,
        ..EngineConfig::default()
    });
    engine.initialize(host.capability());
    engine
}

#[test]
fn chain_serializes_in_call_order() {
    let host = RecordingHost::new().respond("selector.exists", "true");
    let engine = engine_with(&host);
    let out = engine
        .evaluate(r#"newSelector().text("OK").clickable(true).exists()"#, "t")
        .unwrap();
    assert_eq!(out, "true");
    assert_eq!(
        host.calls()[0].args,
        vec![r#"[{"type":"text","value":"OK"},{"type":"clickable","value":"true"}]"#.to_string()]
    );
}

#[test]
fn chain_methods_return_the_same_selector() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let out = engine
        .evaluate(
            r#"
            let s = newSelector();
            s.text("a");
            s.depth(2).drawingOrder().focusable();
            s.toString()
            "#,
            "t",
        )
        .unwrap();
    assert_eq!(
        out,
        r#"[{"type":"text","value":"a"},{"type":"depth","value":"2"},{"type":"focusable","value":"true"}]"#
    );
    assert!(host.calls().is_empty());
}

#[test]
fn node_click_taps_the_center() {
    let host = RecordingHost::new().respond("selector.findOne", SQUARE);
    let engine = engine_with(&host);
    engine.evaluate(r#"text("OK").findOne().click()"#, "t").unwrap();
    let taps = host.calls_to("click");
    assert_eq!(taps.len(), 1);
    assert_eq!(taps[0].args, vec!["50".to_string(), "50".to_string()]);
}

#[test]
fn wait_for_is_a_single_host_call() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let out = engine.evaluate(r#"text("never").waitFor(1000)"#, "t").unwrap();
    assert_eq!(out, "undefined");
    let calls = host.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].verb, "selector.waitFor");
    assert_eq!(calls[0].args[1], "1000");

    engine.evaluate(r#"text("never").waitFor()"#, "t").unwrap();
    assert_eq!(host.calls_to("selector.waitFor")[1].args[1], "10000");
}

#[test]
fn find_all_nodes_operate_independently() {
    let nodes = r#"[
        {"_text":"a","bounds":{"left":0,"top":0,"right":10,"bottom":10}},
        {"_text":"b","bounds":{"left":100,"top":100,"right":120,"bottom":140}},
        {"_text":"c","bounds":{"left":0,"top":200,"right":10,"bottom":210}}
    ]"#;
    let host = RecordingHost::new().respond("selector.findAll", nodes);
    let engine = engine_with(&host);
    let out = engine
        .evaluate(
            r#"let all = className("Button").findAll(); all[1].click(); all.len()"#,
            "t",
        )
        .unwrap();
    assert_eq!(out, "3");
    let taps = host.calls_to("click");
    assert_eq!(taps.len(), 1);
    assert_eq!(taps[0].args, vec!["110".to_string(), "120".to_string()]);
}

#[test]
fn reinitialize_never_reaches_the_old_host() {
    let old_calls = Arc::new(AtomicUsize::new(0));
    let seen = old_calls.clone();
    let mut engine = Engine::default();
    engine.initialize(Arc::new(move |_: &str, _: &[String]| {
        seen.fetch_add(1, Ordering::SeqCst);
        Some("true".to_string())
    }));
    assert_eq!(engine.evaluate("back()", "t").unwrap(), "true");
    assert_eq!(old_calls.load(Ordering::SeqCst), 1);

    let new_host = RecordingHost::new();
    engine.initialize(new_host.capability());
    assert_eq!(engine.evaluate("back(); home()", "t").unwrap(), "false");
    assert_eq!(new_host.verbs(), vec!["back", "home"]);
    assert_eq!(old_calls.load(Ordering::SeqCst), 1);

    engine.destroy();
    assert_eq!(engine.evaluate("back()", "t"), Err(EvalError::NotInitialized));
    assert_eq!(new_host.calls().len(), 2);
}

#[test]
fn interrupt_during_sleep_loop_cancels() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let handle = engine.interrupt_handle();
    let waker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        handle.interrupt();
    });
    let start = Instant::now();
    let err = engine
        .evaluate("while true { sleep(10); }", "loop")
        .unwrap_err();
    waker.join().unwrap();
    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(10));

    // The flag does not outlive the evaluation it cancelled.
    assert_eq!(engine.evaluate("1 + 1", "t").unwrap(), "2");
}

#[test]
fn interrupt_before_evaluate_cancels_it() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    engine.interrupt();
    assert_eq!(
        engine.evaluate("while true { sleep(10); }", "loop"),
        Err(EvalError::Cancelled)
    );
    assert_eq!(engine.evaluate_to_string("\"next\"", "t"), "next");
}

#[test]
fn tight_loops_are_cancellable_too() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let handle = engine.interrupt_handle();
    let waker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let err = engine.evaluate("let i = 0; loop { i += 1; }", "spin").unwrap_err();
    waker.join().unwrap();
    assert_eq!(err, EvalError::Cancelled);
}

#[test]
fn interrupt_raised_inside_a_property_read_cancels() {
    let mut engine = Engine::default();
    let handle = engine.interrupt_handle();
    engine.initialize(Arc::new(move |verb: &str, _: &[String]| {
        if verb == "device.width" {
            handle.interrupt();
        }
        Some("1080".to_string())
    }));
    assert_eq!(engine.evaluate("device.width", "t"), Err(EvalError::Cancelled));
    assert_eq!(engine.evaluate("device.height", "t").unwrap(), "1080");
}

#[test]
fn unbounded_sleep_still_cancels() {
    let host = RecordingHost::new();
    let engine = engine_with(&host);
    let handle = engine.interrupt_handle();
    let waker = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.interrupt();
    });
    let err = engine.evaluate("sleep(9223372036854775807)", "t").unwrap_err();
    waker.join().unwrap();
    assert_eq!(err, EvalError::Cancelled);
}

#[test]
fn only_literal_true_decodes_true() {
    let cases = [("true", "true"), ("TRUE", "false"), ("", "false"), ("1", "false")];
    for (answer, expected) in cases {
        let host = RecordingHost::new().respond("selector.exists", answer);
        let engine = engine_with(&host);
        assert_eq!(engine.evaluate(r#"text("a").exists()"#, "t").unwrap(), expected);
    }
    let silent = RecordingHost::new();
    let engine = engine_with(&silent);
    assert_eq!(engine.evaluate(r#"text("a").exists()"#, "t").unwrap(), "false");
}

#[test]
fn malformed_host_json_degrades() {
    let host = RecordingHost::new()
        .respond("selector.findOne", "{oops")
        .respond("selector.findAll", "[1,");
    let engine = engine_with(&host);
    assert_eq!(engine.evaluate(r#"text("a").findOne()"#, "t").unwrap(), "undefined");
    assert_eq!(engine.evaluate(r#"text("a").findAll().len()"#, "t").unwrap(), "0");
}
