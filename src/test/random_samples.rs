use itertools::Itertools;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    graph::{ExtSegment, RoadGraph},
    pipeline::{plan_stations, PlanConfig},
    primitives::Meters,
    solve::{check_plan, SolverBackend},
    test::sample::line_segments,
};

pub struct RandomInstance {
    pub segments: Vec<ExtSegment>,
    pub cities: Vec<Box<str>>,
    pub max_range: Meters,
}

/// A random chain with random step lengths, every node a city with probability 1/4.
pub fn random_instance(seed: u64) -> RandomInstance {
    let num_steps = 16;
    let length_range = 10..70;
    let max_range_range = 100..220;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let lengths: Vec<Meters> = (0..num_steps)
        .map(|_| rng.gen_range(length_range.clone()))
        .collect();
    let two_way = rng.gen_bool(0.5);
    let mut cities: Vec<Box<str>> = (0..=num_steps)
        .filter(|_| rng.gen_bool(0.25))
        .map(|idx| format!("n{}", idx).into())
        .collect_vec();
    if cities.len() < 2 {
        cities = vec!["n0".into(), format!("n{}", num_steps).into()];
    }

    RandomInstance {
        segments: line_segments(&lengths, two_way),
        cities,
        max_range: rng.gen_range(max_range_range),
    }
}

pub fn run(seed: u64, backend: SolverBackend) {
    let instance = random_instance(seed);
    let graph = RoadGraph::create(&instance.segments);
    let config = PlanConfig {
        max_range: instance.max_range,
        backend,
    };
    let planned = plan_stations(&graph, &instance.cities, &config)
        .unwrap_or_else(|err| panic!("Seed {} could not be planned: {:?}", seed, err));

    assert_eq!(
        check_plan(&planned.selection.trips, &planned.plan),
        Ok(()),
        "Seed {} produced an invalid plan",
        seed
    );
    info!(
        "Seed {}: {} cities, range {}, {} trips, {} stations",
        seed,
        instance.cities.len(),
        instance.max_range,
        planned.selection.trips.len(),
        planned.plan.num_stations()
    );
}

pub fn run_samples(num_samples: u64, backend: SolverBackend) {
    for seed in 0..num_samples {
        info!("\nSeed: {:}\n", seed);
        run(seed, backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_samples() {
        run_samples(5, SolverBackend::Microlp);
    }

    #[test]
    fn test_same_seed_same_instance() {
        let first = random_instance(7);
        let second = random_instance(7);
        assert_eq!(first.segments, second.segments);
        assert_eq!(first.cities, second.cities);
        assert_eq!(first.max_range, second.max_range);
    }
}
