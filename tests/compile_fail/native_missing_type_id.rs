//! Missing type id.

use scriptlink::NativeObject;

#[derive(NativeObject)]
#[script(effect)]
struct Sword;

fn main() {
    let _ = Sword;
}
