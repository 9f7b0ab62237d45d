//! Shared test helpers for integration tests.

#![allow(dead_code)]

use rug::Integer;
use std::collections::BTreeSet;
use trialhunt::EngineConfig;

/// Odd primes in `[3, limit]` by simple trial division on `u64`.
pub fn naive_odd_primes(limit: u64) -> BTreeSet<Integer> {
    (3..=limit)
        .step_by(2)
        .filter(|&n| is_prime_u64(n))
        .map(Integer::from)
        .collect()
}

pub fn is_prime_u64(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

pub fn set_of(values: &[u32]) -> BTreeSet<Integer> {
    values.iter().map(|&v| Integer::from(v)).collect()
}

/// Small chunks so tests make several rounds quickly.
pub fn small_config(threads: usize) -> EngineConfig {
    EngineConfig {
        min_chunk_size: 10,
        max_chunk_size: 400,
        threads: Some(threads),
        qos: false,
    }
}
