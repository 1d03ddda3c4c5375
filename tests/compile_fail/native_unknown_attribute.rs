//! Unknown attribute key.

use scriptlink::NativeObject;

#[derive(NativeObject)]
#[script(type_id = 0x2A, name = "Sword")]
struct Sword;

fn main() {
    let _ = Sword;
}
