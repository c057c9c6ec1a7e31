use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use carehub_auth::{Action, PermissionPolicy, PermissionRule, ResourceType, Role};

/// Synthetic policy with `n` resource types per ordinary role.
fn wide_policy(n: usize) -> PermissionPolicy {
    let mut rules = Vec::new();
    for role in Role::ALL.into_iter().filter(|r| !r.is_super()) {
        for i in 0..n {
            rules.push(PermissionRule::allow(
                role,
                Action::READ,
                ResourceType::new(format!("resource_{i}")),
            ));
        }
    }
    PermissionPolicy::from_rules(rules)
}

fn bench_builtin_lookup(c: &mut Criterion) {
    let policy = PermissionPolicy::builtin();
    let mut group = c.benchmark_group("policy_lookup_builtin");

    group.bench_function("exact_allow", |b| {
        b.iter(|| {
            black_box(policy.is_allowed(
                black_box(Role::Nurse),
                &Action::READ,
                &ResourceType::PATIENT,
            ))
        })
    });

    group.bench_function("default_deny", |b| {
        b.iter(|| {
            black_box(policy.is_allowed(
                black_box(Role::Patient),
                &Action::DELETE,
                &ResourceType::ORGANIZATION,
            ))
        })
    });

    group.finish();
}

fn bench_table_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_lookup_table_size");

    for n in [10usize, 1_000, 10_000] {
        let policy = wide_policy(n);
        let probe = ResourceType::new(format!("resource_{}", n / 2));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(policy.is_allowed(Role::SuperAdmin, &Action::READ, &probe)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_builtin_lookup, bench_table_size);
criterion_main!(benches);
