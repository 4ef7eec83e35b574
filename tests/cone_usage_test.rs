// SPDX-License-Identifier: Apache-2.0

//! End-to-end usage of the cone builder: build a netlist, extract a bounded
//! cone, then prove facts about signals by solving under assumptions.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use conesat::cone::{ConeBuilder, ConeOptions};
use conesat::index::ModIndex;
use conesat::netlist::{CellId, CellKind, Netlist, Sig, SigBit};
use conesat::sigmap::SigMap;

#[test]
fn test_prove_equivalence_through_cone() {
    let _ = env_logger::builder().is_test(true).try_init();

    // x = a & b and y = b & a compute the same function; z = a | b does not.
    let mut n = Netlist::new("m");
    let a = n.add_wire("a", 1);
    let b = n.add_wire("b", 1);
    let x = n.add_wire("x", 1);
    let y = n.add_wire("y", 1);
    let z = n.add_wire("z", 1);
    n.add_binary("g1", CellKind::And, n.wire_sig(a), n.wire_sig(b), n.wire_sig(x));
    n.add_binary("g2", CellKind::And, n.wire_sig(b), n.wire_sig(a), n.wire_sig(y));
    n.add_binary("g3", CellKind::Or, n.wire_sig(a), n.wire_sig(b), n.wire_sig(z));

    let sigmap = SigMap::build(&n);
    let index = ModIndex::build(&n, &sigmap);
    let mut cone = ConeBuilder::new(&n, &sigmap, &index, ConeOptions::default());
    let lx = cone.import_sig_bit(n.wire_bit(x, 0));
    let ly = cone.import_sig_bit(n.wire_bit(y, 0));
    let lz = cone.import_sig_bit(n.wire_bit(z, 0));
    cone.prepare().unwrap();
    assert_eq!(cone.admitted_cells().len(), 3);

    // x == y: no assignment makes them differ.
    cone.satgen.solver.assume(&[lx, !ly]);
    assert!(!cone.satgen.solver.solve().unwrap());
    cone.satgen.solver.assume(&[!lx, ly]);
    assert!(!cone.satgen.solver.solve().unwrap());

    // x != z: a = 1, b = 0 is a witness.
    cone.satgen.solver.assume(&[lz, !lx]);
    assert!(cone.satgen.solver.solve().unwrap());
}

#[test]
fn test_truncated_cone_leaves_deep_bits_free() {
    // A 3-deep chain explored with the default 2-round cap: the deepest
    // gate's output stays a free variable, so the solver can still satisfy
    // "deep output differs from what the full logic would force".
    let mut n = Netlist::new("m");
    let a = n.add_wire("a", 1);
    let b = n.add_wire("b", 1);
    let c = n.add_wire("c", 1);
    let d = n.add_wire("d", 1);
    let y1 = n.add_wire("y1", 1);
    let y2 = n.add_wire("y2", 1);
    let y3 = n.add_wire("y3", 1);
    n.add_binary("g1", CellKind::And, n.wire_sig(a), n.wire_sig(b), n.wire_sig(y1));
    n.add_binary("g2", CellKind::And, n.wire_sig(y1), n.wire_sig(c), n.wire_sig(y2));
    n.add_binary("g3", CellKind::And, n.wire_sig(y2), n.wire_sig(d), n.wire_sig(y3));

    let sigmap = SigMap::build(&n);
    let index = ModIndex::build(&n, &sigmap);
    let mut cone = ConeBuilder::new(&n, &sigmap, &index, ConeOptions::default());
    let ly3 = cone.import_sig_bit(n.wire_bit(y3, 0));
    cone.prepare().unwrap();
    assert_eq!(cone.admitted_cells().len(), 2);

    // y1 was imported as g2's input but its driver g1 was not admitted, so
    // y1 is unconstrained: the model can set it freely.
    let ly1 = cone.lookup_bit(n.wire_bit(y1, 0)).unwrap();
    cone.satgen.solver.assume(&[ly1, ly3]);
    assert!(cone.satgen.solver.solve().unwrap());
    cone.satgen.solver.assume(&[!ly1, ly3]);
    // y3 = y1 & c & d requires y1; with y1 assumed false this is UNSAT.
    assert!(!cone.satgen.solver.solve().unwrap());
}

/// Reference model of the round-bounded exploration: plain BFS over the
/// driver graph, no complexity or count budgets.
fn reference_admitted(
    index: &ModIndex,
    sigmap: &SigMap,
    seeds: &[SigBit],
    rounds: usize,
) -> HashSet<CellId> {
    let mut frontier: HashSet<SigBit> =
        seeds.iter().map(|bit| sigmap.canonicalize(*bit)).collect();
    let mut admitted = HashSet::new();
    for _ in 0..rounds {
        let drivers = index.get_drivers(frontier.iter().copied());
        frontier.clear();
        for driver in drivers {
            if admitted.insert(driver.cell) {
                frontier.extend(index.cell_inputs(driver.cell).iter().copied());
            }
        }
        if frontier.is_empty() {
            break;
        }
    }
    admitted
}

#[test]
fn test_random_dags_respect_round_cap() {
    let mut rng = StdRng::seed_from_u64(0);
    for trial in 0..8 {
        let mut n = Netlist::new("rand");
        let mut pool: Vec<SigBit> = (0..4)
            .map(|i| {
                let w = n.add_wire(&format!("in{}", i), 1);
                n.wire_bit(w, 0)
            })
            .collect();
        for g in 0..30 {
            let a = pool[rng.gen_range(0..pool.len())];
            let b = pool[rng.gen_range(0..pool.len())];
            let y = n.add_wire(&format!("n{}", g), 1);
            let kind = match rng.gen_range(0..3) {
                0 => CellKind::And,
                1 => CellKind::Or,
                _ => CellKind::Xor,
            };
            n.add_binary(
                &format!("g{}", g),
                kind,
                Sig::from_bit(a),
                Sig::from_bit(b),
                Sig::from_bit(n.wire_bit(y, 0)),
            );
            pool.push(n.wire_bit(y, 0));
        }
        let seeds: Vec<SigBit> = (0..3)
            .map(|_| pool[rng.gen_range(0..pool.len())])
            .collect();

        let sigmap = SigMap::build(&n);
        let index = ModIndex::build(&n, &sigmap);
        let mut previous: Option<HashSet<CellId>> = None;
        for rounds in 1..=3 {
            let options = ConeOptions {
                max_rounds: rounds,
                ..Default::default()
            };
            let mut cone = ConeBuilder::new(&n, &sigmap, &index, options);
            for &seed in &seeds {
                cone.import_sig_bit(seed);
            }
            cone.prepare().unwrap();
            let expected = reference_admitted(&index, &sigmap, &seeds, rounds);
            assert_eq!(
                cone.admitted_cells(),
                &expected,
                "trial {} with {} rounds",
                trial,
                rounds
            );
            // Raising the round cap only grows the admitted set.
            if let Some(prev) = &previous {
                assert!(prev.is_subset(cone.admitted_cells()));
            }
            previous = Some(cone.admitted_cells().clone());
        }
    }
}
