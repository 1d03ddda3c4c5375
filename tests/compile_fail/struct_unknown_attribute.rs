//! Unknown attribute key.

use scriptlink::ScriptStruct;

#[derive(ScriptStruct)]
#[script(object = "Actor", structure = "Stats", owner = "Npc")]
struct Stats;

fn main() {
    let _ = Stats;
}
