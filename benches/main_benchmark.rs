use criterion::{Criterion, criterion_group, criterion_main};
use rbuild::build::link_order_for;
use rbuild::config::{LinkOrderKind, LinkOrderRule, ProjectDescriptor};
use rbuild::depfile::DependencyRecord;
use rbuild::driver::{LinkerDriver, LinkerKind};
use std::hint::black_box;
use std::path::{Path, PathBuf};

const MOCK_PROJECT: &str = r#"
src_folder = "src"
working_folder = "build"
project_binary = "kernel"
compiler_c_cpp = "clang"
compiler_asm = "nasm"
linker = "ld.lld"

[targets.kernel]
sources = ["arch", "kernel", { path = "boot.inc", language = "asm" }]
flags_all = ["-O2", "-ffreestanding"]
defines_c_cpp = ["KERNEL"]
linker_order = [
  { name = "crt0.asm.o", weight = -10 },
  { name = "libk.a", weight = 10, kind = "extra" },
]
"#;

fn mock_depfile(headers: usize) -> String {
    let mut s = String::from("build/obj/kernel/main.c.o: src/kernel/main.c");
    for i in 0..headers {
        s.push_str(&format!(" \\\n  /usr/include/sys/header_{i}.h"));
    }
    s.push('\n');
    s
}

fn bench_depfile_parse(c: &mut Criterion) {
    let content = mock_depfile(200);
    c.bench_function("parse_dependency_record", |b| {
        b.iter(|| DependencyRecord::parse(black_box(&content)))
    });
}

fn bench_project_parse(c: &mut Criterion) {
    c.bench_function("parse_rbuild_toml", |b| {
        b.iter(|| {
            let _: ProjectDescriptor = toml::from_str(black_box(MOCK_PROJECT)).unwrap();
        })
    });
}

fn bench_link_order(c: &mut Criterion) {
    let base = Path::new("build/obj");
    let rules: Vec<LinkOrderRule> = (0..32)
        .map(|i| LinkOrderRule {
            name: format!("mod_{i}.c.o"),
            weight: i - 16,
            kind: if i % 2 == 0 {
                LinkOrderKind::Name
            } else {
                LinkOrderKind::Path
            },
        })
        .collect();
    let objects: Vec<PathBuf> = (0..500)
        .map(|i| base.join(format!("dir_{}/mod_{i}.c.o", i % 7)))
        .collect();

    c.bench_function("resolve_link_order_500", |b| {
        b.iter(|| {
            let mut linker = LinkerDriver::new(LinkerKind::Generic, "ld", vec![], vec![]);
            for obj in &objects {
                linker.add_file(link_order_for(&rules, base, obj), obj.clone());
            }
            black_box(linker.ordered_inputs())
        })
    });
}

criterion_group!(benches, bench_depfile_parse, bench_project_parse, bench_link_order);
criterion_main!(benches);
