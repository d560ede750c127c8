// Criterion benchmarks for vkinder

use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use std::collections::HashSet;
use vkinder::core::{age_band, first_eligible, match_target_sex, parse_intent};
use vkinder::models::{DirectoryProfile, Sex};

fn create_candidate(id: i64) -> DirectoryProfile {
    DirectoryProfile {
        id,
        first_name: format!("User{}", id),
        last_name: "Test".to_string(),
        sex: Some(if id % 2 == 0 { Sex::Female } else { Sex::Male }),
        city: Some("Moscow".to_string()),
        birth_date: None,
        has_photo: true,
        is_closed: id % 5 == 0,
        can_access_closed: false,
    }
}

fn bench_age_band(c: &mut Criterion) {
    c.bench_function("age_band", |b| {
        b.iter(|| age_band(black_box(30), black_box(5)));
    });
}

fn bench_match_target_sex(c: &mut Criterion) {
    c.bench_function("match_target_sex", |b| {
        b.iter(|| match_target_sex(black_box("Мне нужна женщина")));
    });
}

fn bench_parse_intent(c: &mut Criterion) {
    c.bench_function("parse_intent", |b| {
        b.iter(|| parse_intent(black_box("❤️ В избранное")));
    });
}

fn bench_first_eligible(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_eligible");

    for page_size in [10, 50, 200].iter() {
        let page: Vec<DirectoryProfile> = (0..*page_size).map(create_candidate).collect();
        // Everything but the last profile has been seen
        let excluded: HashSet<i64> = (0..*page_size - 1).collect();

        group.bench_with_input(BenchmarkId::from_parameter(page_size), page_size, |b, _| {
            b.iter(|| first_eligible(black_box(&page), black_box(&excluded)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_age_band,
    bench_match_target_sex,
    bench_parse_intent,
    bench_first_eligible
);
criterion_main!(benches);
