// SPDX-License-Identifier: Apache-2.0

//! Minimal bit-level netlist data model.
//!
//! This is deliberately not a full RTLIL-style design database -- it carries
//! just enough structure for cone extraction: wires with a width and an
//! optional one-hot annotation, cells with a closed kind enumeration and
//! conventional `A`/`B`/`S`/`Y` ports, and alias pairs that feed the signal
//! canonicalizer. Cells and wires live in flat arenas and are referred to by
//! dense ids.

/// Reference to a wire in a [`Netlist`]'s wire arena.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct WireId {
    pub id: usize,
}

/// Reference to a cell in a [`Netlist`]'s cell arena.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellId {
    pub id: usize,
}

#[derive(Debug, Clone)]
pub struct Wire {
    pub name: String,
    pub width: usize,
    /// Marks the wire as one-hot encoded: at most one bit is true at a time.
    /// Cone extraction turns this into pairwise mutual-exclusion clauses.
    pub onehot: bool,
}

/// A single-bit signal reference: one bit of a wire, or a constant.
///
/// `Const` sorts before `Wire` so that when aliased bits are collapsed to
/// their minimum, a constant wins as the canonical representative.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum SigBit {
    Const(bool),
    Wire { wire: WireId, index: usize },
}

impl SigBit {
    pub fn is_const(&self) -> bool {
        matches!(self, SigBit::Const(_))
    }
}

/// An ordered, LSB-first sequence of signal bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sig {
    bits: Vec<SigBit>,
}

impl Sig {
    pub fn from_bits(bits: Vec<SigBit>) -> Self {
        Self { bits }
    }

    pub fn from_bit(bit: SigBit) -> Self {
        Self { bits: vec![bit] }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Iterates bits LSB to MSB.
    pub fn iter(&self) -> std::slice::Iter<'_, SigBit> {
        self.bits.iter()
    }

    pub fn get(&self, index: usize) -> SigBit {
        assert!(
            index < self.bits.len(),
            "bit index {} is out of bounds for signal of width {}",
            index,
            self.bits.len()
        );
        self.bits[index]
    }
}

/// The closed enumeration of cell kinds the cone engine understands.
///
/// Kinds map onto the usual word-level netlist operators. Anything a front
/// end cannot express here lands in `Unknown`, which complexity scoring
/// treats as maximally expensive so it is never admitted by default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellKind {
    // Pure routing.
    Buf,
    Concat,
    Slice { offset: usize },
    // Single-level boolean logic.
    Not,
    And,
    Or,
    Xor,
    Xnor,
    ReduceAnd,
    ReduceOr,
    ReduceXor,
    ReduceXnor,
    ReduceBool,
    LogicNot,
    LogicAnd,
    LogicOr,
    Eq,
    Ne,
    Mux,
    // Arithmetic / carry chains.
    Neg,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    // Shifters.
    Shl,
    Shr,
    // Multipliers and friends.
    Mul,
    Div,
    Mod,
    Pow,
    /// Anything else, e.g. a user-defined or blackbox cell type.
    Unknown(String),
}

/// One netlist cell. Ports follow the usual convention: `a` (and `b` for
/// binary kinds) are operand inputs, `s` is the mux select, `y` is the
/// output. Unused ports are `None`.
#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub kind: CellKind,
    pub a: Sig,
    pub b: Option<Sig>,
    pub s: Option<Sig>,
    pub y: Sig,
}

impl Cell {
    /// Iterates all input port bits (`a`, then `b`, then `s`), LSB first
    /// within each port.
    pub fn input_bits(&self) -> impl Iterator<Item = SigBit> + '_ {
        self.a
            .iter()
            .copied()
            .chain(self.b.iter().flat_map(|sig| sig.iter().copied()))
            .chain(self.s.iter().flat_map(|sig| sig.iter().copied()))
    }

    pub fn output_bits(&self) -> impl Iterator<Item = SigBit> + '_ {
        self.y.iter().copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Netlist {
    pub name: String,
    pub wires: Vec<Wire>,
    pub cells: Vec<Cell>,
    /// Pairs of bits tied together (e.g. by module connections); resolved
    /// into canonical representatives by `SigMap`.
    pub aliases: Vec<(SigBit, SigBit)>,
}

impl Netlist {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn add_wire(&mut self, name: &str, width: usize) -> WireId {
        self.wires.push(Wire {
            name: name.to_string(),
            width,
            onehot: false,
        });
        WireId {
            id: self.wires.len() - 1,
        }
    }

    pub fn add_onehot_wire(&mut self, name: &str, width: usize) -> WireId {
        let w = self.add_wire(name, width);
        self.wires[w.id].onehot = true;
        w
    }

    pub fn wire(&self, wire: WireId) -> &Wire {
        assert!(
            wire.id < self.wires.len(),
            "WireId out of bounds: {:?} (wires.len() = {})",
            wire,
            self.wires.len()
        );
        &self.wires[wire.id]
    }

    pub fn cell(&self, cell: CellId) -> &Cell {
        assert!(
            cell.id < self.cells.len(),
            "CellId out of bounds: {:?} (cells.len() = {})",
            cell,
            self.cells.len()
        );
        &self.cells[cell.id]
    }

    /// All bits of a wire as a signal, LSB first.
    pub fn wire_sig(&self, wire: WireId) -> Sig {
        let width = self.wire(wire).width;
        Sig::from_bits((0..width).map(|index| SigBit::Wire { wire, index }).collect())
    }

    pub fn wire_bit(&self, wire: WireId, index: usize) -> SigBit {
        assert!(
            index < self.wire(wire).width,
            "bit index {} is out of bounds for wire '{}' of width {}",
            index,
            self.wire(wire).name,
            self.wire(wire).width
        );
        SigBit::Wire { wire, index }
    }

    /// Ties two equal-width signals together bit for bit.
    pub fn connect(&mut self, lhs: &Sig, rhs: &Sig) {
        assert_eq!(
            lhs.width(),
            rhs.width(),
            "connect requires equal widths: {} vs {}",
            lhs.width(),
            rhs.width()
        );
        for (l, r) in lhs.iter().zip(rhs.iter()) {
            self.aliases.push((*l, *r));
        }
    }

    pub fn add_cell(
        &mut self,
        name: &str,
        kind: CellKind,
        a: Sig,
        b: Option<Sig>,
        s: Option<Sig>,
        y: Sig,
    ) -> CellId {
        self.cells.push(Cell {
            name: name.to_string(),
            kind,
            a,
            b,
            s,
            y,
        });
        CellId {
            id: self.cells.len() - 1,
        }
    }

    pub fn add_unary(&mut self, name: &str, kind: CellKind, a: Sig, y: Sig) -> CellId {
        self.add_cell(name, kind, a, None, None, y)
    }

    pub fn add_binary(&mut self, name: &str, kind: CellKind, a: Sig, b: Sig, y: Sig) -> CellId {
        self.add_cell(name, kind, a, Some(b), None, y)
    }

    /// `y = s ? b : a`, with a single-bit select.
    pub fn add_mux(&mut self, name: &str, a: Sig, b: Sig, s: SigBit, y: Sig) -> CellId {
        self.add_cell(name, CellKind::Mux, a, Some(b), Some(Sig::from_bit(s)), y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_sig_is_lsb_first() {
        let mut n = Netlist::new("t");
        let w = n.add_wire("w", 3);
        let sig = n.wire_sig(w);
        assert_eq!(sig.width(), 3);
        assert_eq!(sig.get(0), SigBit::Wire { wire: w, index: 0 });
        assert_eq!(sig.get(2), SigBit::Wire { wire: w, index: 2 });
    }

    #[test]
    fn test_cell_input_bits_cover_all_ports() {
        let mut n = Netlist::new("t");
        let a = n.add_wire("a", 1);
        let b = n.add_wire("b", 1);
        let s = n.add_wire("s", 1);
        let y = n.add_wire("y", 1);
        let c = n.add_mux(
            "m",
            n.wire_sig(a),
            n.wire_sig(b),
            n.wire_bit(s, 0),
            n.wire_sig(y),
        );
        let inputs: Vec<SigBit> = n.cell(c).input_bits().collect();
        assert_eq!(
            inputs,
            vec![n.wire_bit(a, 0), n.wire_bit(b, 0), n.wire_bit(s, 0)]
        );
    }

    #[test]
    fn test_const_sorts_before_wire() {
        let mut n = Netlist::new("t");
        let w = n.add_wire("w", 1);
        assert!(SigBit::Const(true) < n.wire_bit(w, 0));
    }
}
