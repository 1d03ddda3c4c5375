//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use parking_lot::Mutex;
use scriptlink::{CallbackRef, Edition, NativeObject, ScriptStruct, Variable};
use scriptlink_registry::MemoryVm;
use tracing_subscriber::filter::LevelFilter;

/// Route `tracing` output through the test harness' captured writer.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::TRACE)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, NativeObject)]
#[script(type_id = 0x2A)]
pub struct Weapon {
    pub damage: i32,
}

#[derive(Debug, NativeObject)]
#[script(type_id = 0x40)]
pub struct WorldRef {
    pub name: &'static str,
}

#[derive(Debug, NativeObject)]
#[script(type_id = 0x8D, effect)]
pub struct MagicEffect {
    pub magnitude: f32,
}

#[derive(ScriptStruct)]
#[script(object = "Actor", structure = "Stats")]
pub struct Stats;

#[derive(ScriptStruct)]
#[script(object = "Utility", structure = "Point")]
pub struct Point;

/// A VM with a small form hierarchy and two structures.
pub fn vm(edition: Edition) -> MemoryVm {
    init_tracing();
    MemoryVm::builder()
        .edition(edition)
        .object("Form", Some(0x04), None)
        .object("Weapon", Some(0x2A), Some("Form"))
        .object("ObjectReference", Some(0x40), Some("Form"))
        .object("Actor", Some(0x2B), Some("ObjectReference"))
        .object("ActiveMagicEffect", Some(0x8D), Some("Form"))
        .object("Quest", None, Some("Form"))
        .structure(
            "Actor",
            "Stats",
            [
                ("Health", "Int"),
                ("Name", "String"),
                ("Tags", "String[]"),
                ("Sidearm", "Weapon"),
            ],
        )
        .structure("Utility", "Point", [("X", "Float"), ("Y", "Float")])
        .reference_type(0x40)
        .active_effect_type(0x8D)
        .build()
        .expect("fixture VM should build")
}

/// A callback that records every result it receives.
pub fn recorder() -> (CallbackRef, Arc<Mutex<Vec<Variable>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: CallbackRef = Arc::new(move |result: &Variable| sink.lock().push(result.clone()));
    (callback, seen)
}
