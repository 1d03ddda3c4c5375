//! Missing structure name.

use scriptlink::ScriptStruct;

#[derive(ScriptStruct)]
#[script(object = "Actor")]
struct Stats;

fn main() {
    let _ = Stats;
}
