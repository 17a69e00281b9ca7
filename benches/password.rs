//! 注册 / 登录路径上的 Argon2 开销

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use agora::services::validate_password;
use agora::utils::password::{hash_password, verify_password};

fn bench_hash_password(c: &mut Criterion) {
    let mut group = c.benchmark_group("password/hash");
    group.sample_size(20);

    for len in [8usize, 32, 128] {
        let password = "p".repeat(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &password, |b, pwd| {
            b.iter(|| hash_password(black_box(pwd)).expect("hash should succeed"));
        });
    }
    group.finish();
}

fn bench_login_check(c: &mut Criterion) {
    let password = "correct horse battery staple";
    let hash = hash_password(password).expect("hash should succeed");

    let mut group = c.benchmark_group("password/login");
    group.sample_size(20);

    group.bench_function("correct", |b| {
        b.iter(|| {
            assert!(verify_password(black_box(password), &hash).expect("verify should succeed"));
        });
    });

    group.bench_function("wrong", |b| {
        b.iter(|| {
            assert!(!verify_password(black_box("tr0ub4dor&3"), &hash).expect("verify should succeed"));
        });
    });

    group.finish();
}

fn bench_signup_password_path(c: &mut Criterion) {
    // 注册时先做规则校验再哈希
    c.bench_function("password/signup_validate_and_hash", |b| {
        b.iter(|| {
            validate_password(black_box("new-member-pass")).expect("valid password");
            hash_password("new-member-pass").expect("hash should succeed")
        });
    });
}

criterion_group!(
    benches,
    bench_hash_password,
    bench_login_check,
    bench_signup_password_path,
);
criterion_main!(benches);
