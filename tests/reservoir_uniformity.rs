use std::collections::HashSet;

use rand::SeedableRng;
use rand::rngs::StdRng;

use sample_join::{
    InMemorySource, PrimaryFilter, Record, RecordSource, ReservoirSampler, SamplerConfig,
};

fn questions(n: i64) -> Vec<Record> {
    (1..=n)
        .map(|id| {
            Record::from_pairs([
                ("Id", id.to_string()),
                ("PostTypeId", "1".to_string()),
                ("OwnerUserId", (100 + id).to_string()),
            ])
        })
        .collect()
}

fn sampler(k: usize) -> ReservoirSampler {
    ReservoirSampler::new(SamplerConfig {
        sample_size: k,
        ..SamplerConfig::default()
    })
    .unwrap()
}

#[test]
fn every_item_is_selected_with_probability_k_over_n() {
    const N: i64 = 10;
    const K: usize = 3;
    const TRIALS: usize = 20_000;

    let records = questions(N);
    let sampler = sampler(K);
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut hits = vec![0usize; N as usize];

    for _ in 0..TRIALS {
        let sample = sampler
            .sample("posts", records.iter().cloned().map(Ok), &mut rng)
            .unwrap();
        assert_eq!(sample.len(), K);
        for key in sample.primary_keys.iter() {
            hits[(key - 1) as usize] += 1;
        }
    }

    // Expected 6000 per item; binomial sd is about 65.
    let expected = TRIALS * K / N as usize;
    for (idx, count) in hits.iter().enumerate() {
        assert!(
            count.abs_diff(expected) < 400,
            "item {} selected {} times, expected about {}",
            idx + 1,
            count,
            expected
        );
    }
}

#[test]
fn sample_size_is_min_of_k_and_qualifying_count() {
    let mut rng = StdRng::seed_from_u64(1);
    for (n, k, want) in [(0, 4, 0), (3, 4, 3), (4, 4, 4), (9, 4, 4)] {
        let sample = sampler(k)
            .sample("posts", questions(n).into_iter().map(Ok), &mut rng)
            .unwrap();
        assert_eq!(sample.len(), want, "n={n} k={k}");
        assert_eq!(sample.qualifying, n as u64);
    }
}

#[test]
fn short_streams_keep_encounter_order() {
    let mut rng = StdRng::seed_from_u64(9);
    let sample = sampler(10)
        .sample("posts", questions(4).into_iter().map(Ok), &mut rng)
        .unwrap();
    let ids: Vec<i64> = sample
        .records
        .iter()
        .map(|record| record.key("Id").unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
}

#[test]
fn key_sets_match_the_final_reservoir() {
    let mut rng = StdRng::seed_from_u64(77);
    let sample = sampler(5)
        .sample("posts", questions(200).into_iter().map(Ok), &mut rng)
        .unwrap();

    let from_records: HashSet<i64> = sample
        .records
        .iter()
        .map(|record| record.key("Id").unwrap())
        .collect();
    let from_keys: HashSet<i64> = sample.primary_keys.iter().collect();
    assert_eq!(from_records, from_keys);

    let owners: HashSet<i64> = sample.owner_keys.iter().collect();
    let expected_owners: HashSet<i64> = from_keys.iter().map(|id| id + 100).collect();
    assert_eq!(owners, expected_owners);
}

#[test]
fn non_qualifying_records_never_enter_the_sample() {
    let mut records = questions(20);
    for record in records.iter_mut().skip(1).step_by(2) {
        record.insert("PostTypeId", "2");
    }
    let source = InMemorySource::new("posts", records);
    let sampler = ReservoirSampler::new(SamplerConfig {
        sample_size: 50,
        seed: Some(4),
        ..SamplerConfig::default()
    })
    .unwrap();
    let sample = sampler.run(&source, "row").unwrap();
    assert_eq!(sample.qualifying, 10);
    assert!(sample.primary_keys.iter().all(|key| key % 2 == 1));

    let everything = ReservoirSampler::new(SamplerConfig {
        sample_size: 50,
        seed: Some(4),
        filter: PrimaryFilter::All,
        ..SamplerConfig::default()
    })
    .unwrap()
    .run(&source, "row")
    .unwrap();
    assert_eq!(everything.len(), 20);
    assert_eq!(everything.stats.source, source.id());
}
