// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hedkit::query::{compile_many, evaluate_with};
use hedkit::schema::SchemaGroup;
use hedkit::tabular::{Assembler, AssemblyOptions};

mod fixtures;
mod profiler;

// Group ids `query.compile` and `query.evaluate` and the case ids are kept stable.
fn benches_search(c: &mut Criterion) {
    let schemas = SchemaGroup::load(&["8.2.0"]).expect("schema");

    c.bench_function("query.compile", |b| {
        b.iter(|| black_box(compile_many(black_box(&fixtures::QUERIES)).0.len()))
    });

    let (handlers, _, _) = compile_many(&fixtures::QUERIES);
    let options = AssemblyOptions {
        include_context: true,
        ..AssemblyOptions::default()
    };
    let assembler = Assembler::new(&schemas, options).expect("assembler");

    let mut group = c.benchmark_group("query.evaluate");
    for case in fixtures::Case::ALL {
        let rows = assembler.assemble(&fixtures::table(case)).rows;
        group.throughput(Throughput::Elements((rows.len() * handlers.len()) as u64));
        for (mode, threshold) in [("sequential", usize::MAX), ("parallel", 1)] {
            group.bench_function(format!("{}_{mode}", case.id()), |b| {
                b.iter(|| {
                    let matrix = evaluate_with(black_box(&rows), &handlers, &schemas, threshold);
                    black_box(matrix.len())
                })
            });
        }
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_search
}
criterion_main!(benches);
