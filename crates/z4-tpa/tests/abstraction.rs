//! Properties of the power abstractions

mod common;

use common::*;
use z4_arith::implies;
use z4_expr::{ChcExpr, Theory};
use z4_tpa::{
    AcceleratedBmc, Normalizer, PowerAbstraction, TpaConfig, TransitionSystem, TsVerdict,
};

fn engine_for(problem: &z4_tpa::ChcProblem, config: TpaConfig) -> PowerAbstraction {
    init_tracing();
    let normalized = Normalizer::new().normalize(problem).unwrap();
    let system = TransitionSystem::from_problem(&normalized).unwrap().system;
    PowerAbstraction::new(&system, config).unwrap()
}

#[test]
fn refinement_only_strengthens_exact_powers() {
    let mut engine = engine_for(&counter(40), TpaConfig::default());
    let mut snapshots: Vec<Vec<Option<ChcExpr>>> = Vec::new();
    for power in 1..=4 {
        assert_eq!(engine.check_power(power).unwrap(), TsVerdict::Unknown);
        snapshots.push((0..=power).map(|k| engine.exact_power(k).cloned()).collect());
    }
    for (older, newer) in snapshots.iter().zip(snapshots.iter().skip(1)) {
        for (old, new) in older.iter().zip(newer) {
            if let (Some(old), Some(new)) = (old, new) {
                assert!(implies(Theory::Integer, new, old).unwrap());
            }
        }
    }
}

#[test]
fn concrete_paths_satisfy_the_abstractions() {
    let mut engine = engine_for(&counter(40), TpaConfig::default());
    for power in 1..=4 {
        assert_eq!(engine.check_power(power).unwrap(), TsVerdict::Unknown);
    }
    for level in 1..=4u32 {
        let steps = 1i64 << (level - 1);
        let exact = engine.exact_power(level).unwrap();
        let two_step = ChcExpr::and(
            exact.clone(),
            z4_expr::TimeMachine::send_through_time(exact, 1).unwrap(),
        );
        let less_than = engine.less_than_power(level).unwrap();
        for start in -3..=3 {
            let path = int_model(&[
                ("ts::x0#0", start),
                ("ts::x0#1", start + steps),
                ("ts::x0#2", start + 2 * steps),
            ]);
            assert!(path.satisfies(exact).unwrap(), "level {level} from {start}");
            assert!(path.satisfies(&two_step).unwrap(), "level {level} from {start}");
            for shorter in 0..steps {
                let pair = int_model(&[("ts::x0#0", start), ("ts::x0#1", start + shorter)]);
                assert!(pair.satisfies(less_than).unwrap(), "level {level}, {shorter} steps");
            }
        }
    }
}

#[test]
fn abstraction_chain_composes() {
    let mut engine = engine_for(&counter(40), TpaConfig::default());
    for power in 1..=4 {
        engine.check_power(power).unwrap();
    }
    assert!(engine.verify_exact_power(4).unwrap());
    for level in 2..=4 {
        assert!(engine.verify_less_than_power(level).unwrap());
    }
}

#[test]
fn session_kinds_agree_on_verdicts() {
    for problem in [counter(6), bounded_counter(), lockstep()] {
        let verdicts: Vec<_> = [true, false]
            .into_iter()
            .map(|incremental| {
                let config = TpaConfig::builder()
                    .incremental_sessions(incremental)
                    .compute_witness(false)
                    .build();
                AcceleratedBmc::new(config).solve(&problem).unwrap()
            })
            .collect();
        assert_eq!(verdicts[0], verdicts[1]);
    }
}

#[test]
fn statistics_track_queries() {
    let mut bmc = AcceleratedBmc::new(TpaConfig::default());
    bmc.solve(&counter(6)).unwrap();
    let stats = bmc.stats();
    assert!(stats.exact_queries > 0);
    assert!(stats.less_than_queries > 0);
    assert!(stats.max_power >= 3);
    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["max_power"], stats.max_power);
}
