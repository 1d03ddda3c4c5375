//! Structure proxies over VM-created instances.

mod common;

use std::sync::Arc;

use common::{Point, Stats, Weapon, vm};
use scriptlink::{
    Edition, NativeObject, StructTag, StructureProxy, Variable, VmRef, diagnostics, pack,
    type_descriptor, unpack,
};
use scriptlink_registry::MemoryVm;

#[test]
fn tags_join_owner_and_structure() {
    assert_eq!(Stats::TAG, "Actor#Stats");
    assert_eq!(Point::OBJECT, "Utility");
    assert_eq!(Point::STRUCTURE, "Point");
}

#[test]
fn new_instances_start_at_field_defaults() {
    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);

    let stats = StructureProxy::<Stats>::new(vm);
    assert!(!stats.is_null());
    assert_eq!(stats.find::<i32>(vm, "Health"), Some(0));
    assert_eq!(stats.find::<String>(vm, "Name").as_deref(), Some(""));
    assert_eq!(stats.find::<Vec<String>>(vm, "Tags"), Some(Vec::new()));
}

#[test]
fn insert_and_find() {
    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);

    let stats = StructureProxy::<Stats>::new(vm);
    assert!(stats.insert(vm, "health", 75));
    assert!(stats.insert(vm, "Tags", vec![String::from("brave"), String::from("tall")]));

    assert_eq!(stats.find::<i32>(vm, "HEALTH"), Some(75));
    assert_eq!(
        stats.find::<Vec<String>>(vm, "Tags"),
        Some(vec![String::from("brave"), String::from("tall")])
    );
}

#[test]
fn unknown_fields_warn_and_leave_the_instance_alone() {
    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);
    let stats = StructureProxy::<Stats>::with_fields(vm, [("Health", Variable::Int(3))]);
    diagnostics::take_failures();

    assert!(!stats.insert(vm, "Stamina", 10));
    assert_eq!(stats.find::<i32>(vm, "Stamina"), None);
    assert_eq!(stats.find::<i32>(vm, "Health"), Some(3));
    assert_eq!(diagnostics::take_failures(), 2);
}

#[test]
fn native_object_fields() {
    let machine = vm(Edition::NextGen);
    let pistol = Arc::new(Weapon { damage: 11 });
    machine.natives().register(Weapon::TYPE_ID, pistol.clone());
    let vm = VmRef::new(&machine);

    let stats = StructureProxy::<Stats>::new(vm);
    assert!(stats.insert(vm, "Sidearm", Some(Arc::clone(&pistol))));
    let back = stats.find::<Option<Arc<Weapon>>>(vm, "Sidearm").flatten();
    assert!(Arc::ptr_eq(&back.unwrap(), &pistol));
}

#[test]
fn unknown_structure_type_leaves_proxy_null() {
    #[derive(scriptlink::ScriptStruct)]
    #[script(object = "Actor", structure = "Missing")]
    struct Missing;

    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);
    diagnostics::take_failures();

    let proxy = StructureProxy::<Missing>::new(vm);
    assert!(proxy.is_null());
    assert_eq!(type_descriptor::<StructureProxy<Missing>>(vm), None);
    assert_eq!(diagnostics::take_failures(), 2);
}

#[test]
fn proxies_travel_as_struct_variables() {
    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);

    let point = StructureProxy::<Point>::with_fields(
        vm,
        [("X", Variable::Float(1.0)), ("Y", Variable::Float(-2.0))],
    );
    let packed = pack(vm, point.clone());
    assert!(matches!(packed, Variable::Struct(Some(_))));

    let back: StructureProxy<Point> = unpack(vm, &packed);
    assert_eq!(back.find::<f32>(vm, "y"), Some(-2.0));
    assert!(Arc::ptr_eq(back.instance().unwrap(), point.instance().unwrap()));

    let descriptor = type_descriptor::<StructureProxy<Point>>(vm).unwrap();
    assert_eq!(descriptor.struct_type().unwrap().name().as_str(), "Utility#Point");
}

#[test]
fn other_structure_types_are_rejected() {
    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);
    let point = pack(vm, StructureProxy::<Point>::new(vm));
    assert!(!point.is_null());
    diagnostics::take_failures();

    let stats: StructureProxy<Stats> = unpack(vm, &point);
    assert!(stats.is_null());
    assert_eq!(diagnostics::take_failures(), 1);
}

#[test]
fn null_proxies_pack_as_null_structs() {
    let machine = vm(Edition::NextGen);
    let vm = VmRef::new(&machine);

    let packed = pack(vm, StructureProxy::<Point>::null());
    assert_eq!(packed, Variable::Struct(None));
    assert!(unpack::<StructureProxy<Point>>(vm, &packed).is_null());
    assert!(unpack::<Option<StructureProxy<Point>>>(vm, &packed).is_none());
}

#[test]
fn tag_case_differs_from_the_registered_name() {
    let machine = MemoryVm::builder()
        .structure("actor", "stats", [("Health", "Int")])
        .build()
        .unwrap();
    let vm = VmRef::new(&machine);
    diagnostics::take_failures();

    let stats = StructureProxy::<Stats>::new(vm);
    assert!(!stats.is_null());
    assert_eq!(stats.instance().unwrap().struct_type().name().as_str(), "actor#stats");

    let back: StructureProxy<Stats> = unpack(vm, &pack(vm, stats.clone()));
    assert!(!back.is_null());
    assert!(Arc::ptr_eq(back.instance().unwrap(), stats.instance().unwrap()));
    assert_eq!(diagnostics::take_failures(), 0);
}
