//! Empty owner name.

use scriptlink::ScriptStruct;

#[derive(ScriptStruct)]
#[script(object = "", structure = "Stats")]
struct Stats;

fn main() {
    let _ = Stats;
}
