//! Benchmarks for staleness propagation and lazy recomputation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tandem_core::config::PreferencesConfig;
use tandem_core::preferences::{
    InstanceOverrides, Preferences, SystemColorScheme, UserPreferences,
};
use tandem_core::reactive::{Derived, Runtime, Signal};

fn bench_fan_out_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out_write");

    for width in [10usize, 100, 1000] {
        let runtime = Runtime::new();
        let source = Signal::new(&runtime, 0u64);
        let derived: Vec<Derived<u64>> = (0..width as u64)
            .map(|offset| {
                let source = source.clone();
                Derived::new(&runtime, move || source.get() + offset)
            })
            .collect();
        for value in &derived {
            value.get();
        }

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            let mut i = 0u64;
            b.iter(|| {
                i += 1;
                source.set(black_box(i));
            })
        });
    }

    group.finish();
}

fn bench_chain_read(c: &mut Criterion) {
    let runtime = Runtime::new();
    let source = Signal::new(&runtime, 0u64);

    let mut tail = {
        let source = source.clone();
        Derived::new(&runtime, move || source.get())
    };
    for _ in 0..50 {
        let previous = tail.clone();
        tail = Derived::new(&runtime, move || previous.get() + 1);
    }

    c.bench_function("chain_read_after_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            source.set(i);
            black_box(tail.get())
        })
    });

    c.bench_function("chain_read_cached", |b| b.iter(|| black_box(tail.get())));
}

fn bench_system_scheme_flip(c: &mut Criterion) {
    let runtime = Runtime::new();
    let user = Signal::new(&runtime, UserPreferences::with_id("bench"));
    let instance = Signal::new(&runtime, InstanceOverrides::default());
    let preferences = Preferences::new(&runtime, user, instance, &PreferencesConfig::default());
    preferences.user_preferences();

    c.bench_function("system_scheme_flip", |b| {
        let mut dark = false;
        b.iter(|| {
            dark = !dark;
            let scheme = if dark {
                SystemColorScheme::Dark
            } else {
                SystemColorScheme::Light
            };
            preferences.set_system_color_scheme(scheme);
            black_box(preferences.user_preferences())
        })
    });
}

criterion_group!(
    benches,
    bench_fan_out_write,
    bench_chain_read,
    bench_system_scheme_flip
);
criterion_main!(benches);
