// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hedkit::schema::SchemaGroup;
use hedkit::tabular::{Assembler, AssemblyOptions};

mod fixtures;
mod profiler;

// Group ids `tabular.assemble` and `tabular.validate` and the case ids are kept stable so
// results stay comparable across refactors.
fn benches_assemble(c: &mut Criterion) {
    let schemas = SchemaGroup::load(&["8.2.0"]).expect("schema");

    {
        let mut group = c.benchmark_group("tabular.assemble");
        for case in fixtures::Case::ALL {
            let table = fixtures::table(case);
            group.throughput(Throughput::Elements(table.len() as u64));
            for (variant, include_context, replace_defs) in
                [("plain", false, false), ("context_defs", true, true)]
            {
                let options = AssemblyOptions {
                    remove_categories: vec!["Task".to_owned(), "Condition-variable".to_owned()],
                    include_context,
                    replace_defs,
                    ..AssemblyOptions::default()
                };
                let assembler = Assembler::new(&schemas, options).expect("assembler");
                group.bench_function(format!("{}_{variant}", case.id()), |b| {
                    b.iter(|| {
                        let assembly = assembler.assemble(black_box(&table));
                        black_box(assembly.rows.iter().flatten().count())
                    })
                });
            }
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("tabular.validate");
        let assembler = Assembler::new(&schemas, AssemblyOptions::default()).expect("assembler");
        let options = hedkit::hed::ValidationOptions::default();
        for case in fixtures::Case::ALL {
            let table = fixtures::table(case);
            group.throughput(Throughput::Elements(table.len() as u64));
            group.bench_function(case.id(), |b| {
                b.iter(|| black_box(assembler.validate(black_box(&table), &options).len()))
            });
        }
        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_assemble
}
criterion_main!(benches);
