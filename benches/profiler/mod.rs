// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Hedkit-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Hedkit and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::str::FromStr;
use std::time::Duration;

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Criterion with a flamegraph profiler attached. Knobs: `HEDKIT_PROFILE_FREQ`,
/// `HEDKIT_BENCH_SAMPLES`, `HEDKIT_BENCH_WARMUP_SECS`, `HEDKIT_BENCH_MEASURE_SECS`.
pub fn criterion() -> Criterion {
    let frequency = env_or("HEDKIT_PROFILE_FREQ", 100_i32).clamp(1, 1000);
    let samples = env_or("HEDKIT_BENCH_SAMPLES", 40_usize).clamp(10, 200);
    let warmup = env_or("HEDKIT_BENCH_WARMUP_SECS", 2_u64).clamp(1, 60);
    let measure = env_or("HEDKIT_BENCH_MEASURE_SECS", 5_u64).clamp(1, 120);

    Criterion::default()
        .sample_size(samples)
        .warm_up_time(Duration::from_secs(warmup))
        .measurement_time(Duration::from_secs(measure))
        .with_profiler(PProfProfiler::new(frequency, Output::Flamegraph(None)))
}
