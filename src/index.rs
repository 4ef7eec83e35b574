// SPDX-License-Identifier: Apache-2.0

//! Bit-level driver/consumer index over a netlist.
//!
//! Built once per netlist (after canonicalization), this answers the two
//! questions cone exploration asks on every round: "which cells drive this
//! set of bits?" and "what are a cell's input/output bits?". The driver
//! lookup is batched -- exploration hands over its whole frontier at once
//! rather than probing bit by bit, which matters on wide fan-in cones.

use std::collections::{HashMap, HashSet};

use crate::netlist::{CellId, Netlist, SigBit};
use crate::sigmap::SigMap;

/// One driver of a signal bit: the driving cell and the index of the output
/// bit within that cell's `y` port.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct DriverBit {
    pub cell: CellId,
    pub bit: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ModIndex {
    driver_of: HashMap<SigBit, DriverBit>,
    cell_inputs: Vec<Vec<SigBit>>,
    cell_outputs: Vec<Vec<SigBit>>,
}

impl ModIndex {
    pub fn build(netlist: &Netlist, sigmap: &SigMap) -> Self {
        let mut driver_of = HashMap::new();
        let mut cell_inputs = Vec::with_capacity(netlist.cells.len());
        let mut cell_outputs = Vec::with_capacity(netlist.cells.len());
        for (id, cell) in netlist.cells.iter().enumerate() {
            let cell_id = CellId { id };

            let mut inputs = Vec::new();
            let mut seen = HashSet::new();
            for bit in cell.input_bits() {
                let bit = sigmap.canonicalize(bit);
                if seen.insert(bit) {
                    inputs.push(bit);
                }
            }
            cell_inputs.push(inputs);

            let mut outputs = Vec::new();
            let mut seen = HashSet::new();
            for (index, bit) in cell.output_bits().enumerate() {
                let bit = sigmap.canonicalize(bit);
                if bit.is_const() {
                    continue;
                }
                if seen.insert(bit) {
                    outputs.push(bit);
                    let prev = driver_of.insert(bit, DriverBit { cell: cell_id, bit: index });
                    debug_assert!(
                        prev.is_none(),
                        "bit {:?} has multiple drivers: {:?} and cell '{}'",
                        bit,
                        prev,
                        cell.name
                    );
                }
            }
            cell_outputs.push(outputs);
        }
        Self {
            driver_of,
            cell_inputs,
            cell_outputs,
        }
    }

    /// Batched driver lookup: returns the deduplicated driver pairs for all
    /// of `bits`, in a deterministic order. Bits without a driver (primary
    /// inputs, constants) simply contribute nothing.
    pub fn get_drivers<I>(&self, bits: I) -> Vec<DriverBit>
    where
        I: IntoIterator<Item = SigBit>,
    {
        let mut drivers: Vec<DriverBit> = bits
            .into_iter()
            .filter_map(|bit| self.driver_of.get(&bit).copied())
            .collect();
        drivers.sort_unstable();
        drivers.dedup();
        drivers
    }

    pub fn driver(&self, bit: SigBit) -> Option<DriverBit> {
        self.driver_of.get(&bit).copied()
    }

    /// Canonical input bits of a cell, deduplicated, in port order.
    pub fn cell_inputs(&self, cell: CellId) -> &[SigBit] {
        &self.cell_inputs[cell.id]
    }

    /// Canonical non-constant output bits of a cell, deduplicated.
    pub fn cell_outputs(&self, cell: CellId) -> &[SigBit] {
        &self.cell_outputs[cell.id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlist::CellKind;

    #[test]
    fn test_batched_driver_lookup_dedups_and_sorts() {
        let mut n = Netlist::new("t");
        let a = n.add_wire("a", 2);
        let y = n.add_wire("y", 2);
        let c = n.add_unary("buf", CellKind::Buf, n.wire_sig(a), n.wire_sig(y));
        let sigmap = SigMap::build(&n);
        let index = ModIndex::build(&n, &sigmap);

        let frontier = vec![
            n.wire_bit(y, 1),
            n.wire_bit(y, 0),
            n.wire_bit(y, 0),
            n.wire_bit(a, 0),
        ];
        let drivers = index.get_drivers(frontier);
        assert_eq!(
            drivers,
            vec![DriverBit { cell: c, bit: 0 }, DriverBit { cell: c, bit: 1 }]
        );
    }

    #[test]
    fn test_undriven_bits_yield_no_drivers() {
        let mut n = Netlist::new("t");
        let a = n.add_wire("a", 1);
        let sigmap = SigMap::build(&n);
        let index = ModIndex::build(&n, &sigmap);
        assert!(index.get_drivers(vec![n.wire_bit(a, 0)]).is_empty());
        assert!(index.driver(SigBit::Const(true)).is_none());
    }

    #[test]
    fn test_driver_resolves_through_aliases() {
        let mut n = Netlist::new("t");
        let a = n.add_wire("a", 1);
        let y = n.add_wire("y", 1);
        let y_alias = n.add_wire("y_alias", 1);
        n.connect(&n.wire_sig(y_alias), &n.wire_sig(y));
        let c = n.add_unary("inv", CellKind::Not, n.wire_sig(a), n.wire_sig(y));
        let sigmap = SigMap::build(&n);
        let index = ModIndex::build(&n, &sigmap);

        // Looking up the alias through its canonical form finds the driver.
        let canon = sigmap.canonicalize(n.wire_bit(y_alias, 0));
        assert_eq!(index.driver(canon), Some(DriverBit { cell: c, bit: 0 }));
    }

    #[test]
    fn test_cell_inputs_are_canonical_and_deduped() {
        let mut n = Netlist::new("t");
        let a = n.add_wire("a", 1);
        let a2 = n.add_wire("a2", 1);
        let y = n.add_wire("y", 1);
        n.connect(&n.wire_sig(a2), &n.wire_sig(a));
        // Both operands collapse to the same canonical bit.
        let c = n.add_binary("and", CellKind::And, n.wire_sig(a), n.wire_sig(a2), n.wire_sig(y));
        let sigmap = SigMap::build(&n);
        let index = ModIndex::build(&n, &sigmap);
        assert_eq!(index.cell_inputs(c), &[sigmap.canonicalize(n.wire_bit(a, 0))]);
    }
}
