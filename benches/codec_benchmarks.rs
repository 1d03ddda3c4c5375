//! Conversion and dispatch throughput against the in-memory VM.
//!
//! ```bash
//! cargo bench --bench codec_benchmarks
//! cargo bench --features profiling --bench codec_benchmarks
//! ```

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use scriptlink::{
    Edition, NativeObject, ScriptStruct, Static, StructureProxy, Variable, VirtualMachineExt,
    VmRef, pack, unpack,
};
use scriptlink_registry::MemoryVm;

#[derive(Debug, NativeObject)]
#[script(type_id = 0x2A)]
struct Weapon {
    damage: i32,
}

#[derive(ScriptStruct)]
#[script(object = "Actor", structure = "Stats")]
struct Stats;

fn machine(edition: Edition) -> MemoryVm {
    MemoryVm::builder()
        .edition(edition)
        .object("Form", Some(0x04), None)
        .object("Weapon", Some(0x2A), Some("Form"))
        .object("ObjectReference", Some(0x40), Some("Form"))
        .object("ActiveMagicEffect", Some(0x8D), Some("Form"))
        .structure("Actor", "Stats", [("Health", "Int"), ("Name", "String")])
        .build()
        .expect("benchmark VM should build")
}

fn scalar_benchmarks(c: &mut Criterion) {
    let vm = machine(Edition::NextGen);
    let vm = VmRef::new(&vm);
    let mut group = c.benchmark_group("codec/scalars");

    group.bench_function("pack_i32", |b| b.iter(|| pack(vm, black_box(42i32))));
    group.bench_function("unpack_i32", |b| {
        let packed = Variable::Int(42);
        b.iter(|| unpack::<i32>(vm, black_box(&packed)))
    });
    group.bench_function("pack_string", |b| {
        b.iter(|| pack(vm, black_box(String::from("Lorenzo's Artifact"))))
    });

    group.finish();
}

fn sequence_benchmarks(c: &mut Criterion) {
    let vm = machine(Edition::NextGen);
    let vm = VmRef::new(&vm);
    let mut group = c.benchmark_group("codec/sequences");

    for len in [16usize, 256, 4096] {
        let values: Vec<i32> = (0..len as i32).collect();
        let packed = pack(vm, values.clone());
        group.throughput(Throughput::Elements(len as u64));

        group.bench_with_input(BenchmarkId::new("pack", len), &values, |b, values| {
            b.iter(|| pack(vm, black_box(values.clone())))
        });
        group.bench_with_input(BenchmarkId::new("unpack", len), &packed, |b, packed| {
            b.iter(|| unpack::<Vec<i32>>(vm, black_box(packed)))
        });
    }

    group.finish();
}

fn object_benchmarks(c: &mut Criterion) {
    let machine = machine(Edition::NextGen);
    let sword = Arc::new(Weapon { damage: 18 });
    machine.natives().register(Weapon::TYPE_ID, sword.clone());
    let vm = VmRef::new(&machine);
    let packed = pack(vm, Some(Arc::clone(&sword)));
    let mut group = c.benchmark_group("codec/objects");

    group.bench_function("pack_bound", |b| {
        b.iter(|| pack(vm, black_box(Some(Arc::clone(&sword)))))
    });
    group.bench_function("unpack", |b| {
        b.iter(|| unpack::<Option<Arc<Weapon>>>(vm, black_box(&packed)).map(|w| w.damage))
    });

    group.finish();
}

fn structure_benchmarks(c: &mut Criterion) {
    let machine = machine(Edition::NextGen);
    let vm = VmRef::new(&machine);
    let stats = StructureProxy::<Stats>::new(vm);
    let mut group = c.benchmark_group("structure");

    group.bench_function("insert", |b| b.iter(|| stats.insert(vm, "Health", black_box(7))));
    group.bench_function("find", |b| b.iter(|| stats.find::<i32>(vm, black_box("health"))));

    group.finish();
}

fn dispatch_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for edition in [Edition::NextGen, Edition::Legacy] {
        let vm = machine(edition);
        vm.register_function("Math", "Add", |_: Static, a: i32, b: i32| a + b, None, false);
        group.bench_function(format!("{edition:?}/issue_and_run"), |b| {
            b.iter(|| {
                vm.dispatch_static_call("Math", "Add", None, (black_box(1), black_box(2)));
                vm.run_pending()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    scalar_benchmarks,
    sequence_benchmarks,
    object_benchmarks,
    structure_benchmarks,
    dispatch_benchmarks,
);
criterion_main!(benches);
