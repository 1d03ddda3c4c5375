//! Tag separator inside a name.

use scriptlink::ScriptStruct;

#[derive(ScriptStruct)]
#[script(object = "Actor", structure = "Stats#2")]
struct Stats;

fn main() {
    let _ = Stats;
}
