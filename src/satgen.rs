// SPDX-License-Identifier: Apache-2.0

//! Structural (Tseitin-style) encoding of netlist cells into a SAT solver.
//!
//! `SatGen` wraps a `varisat` solver and maintains the mapping from canonical
//! signal bits to solver literals. Importing a bit is idempotent: the same
//! canonical bit always yields the same literal, and constant bits yield
//! literals pinned by a unit clause. `encode_cell` adds the clauses for one
//! cell's boolean/arithmetic function over its (imported) port literals;
//! encoding is idempotent per cell.
//!
//! We use varisat because it supports incrementality via assume/solve and
//! add_clause: callers keep pushing clauses as the cone grows and query
//! satisfiability under per-query assumptions afterwards.
//!
//! Coverage: wiring, single-level boolean logic, ripple-carry arithmetic and
//! unsigned comparisons, barrel shifters, and shift-and-add multiply. All
//! operands are zero-extended to the output width (unsigned semantics).
//! Divide/modulo/power and unknown cell kinds have no structural encoding
//! here and surface an [`EncodeError`]; cone exploration's complexity budget
//! keeps them out of the model in the default configuration.

use std::collections::{HashMap, HashSet};
use std::fmt;

use varisat::{ExtendFormula, Lit};

use crate::netlist::{Cell, CellId, CellKind, Netlist, SigBit};
use crate::sigmap::SigMap;

#[derive(Debug)]
pub enum EncodeError {
    /// The cell's function cannot be expressed by this encoder.
    UnsupportedCell { cell: String, kind: String },
    /// A port required by the cell's kind is absent.
    MissingPort { cell: String, port: char },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnsupportedCell { cell, kind } => {
                write!(f, "cell '{}' of kind {} has no structural SAT encoding", cell, kind)
            }
            EncodeError::MissingPort { cell, port } => {
                write!(f, "cell '{}' is missing required port {}", cell, port)
            }
        }
    }
}

impl std::error::Error for EncodeError {}

// Tseitin clauses for: y <=> a AND b.
// (¬a ∨ ¬b ∨ y) (a ∨ ¬y) (b ∨ ¬y)
fn tseitin_and(solver: &mut impl ExtendFormula, a: Lit, b: Lit, y: Lit) {
    solver.add_clause(&[!a, !b, y]);
    solver.add_clause(&[a, !y]);
    solver.add_clause(&[b, !y]);
}

// Tseitin clauses for: y <=> a OR b.
fn tseitin_or(solver: &mut impl ExtendFormula, a: Lit, b: Lit, y: Lit) {
    solver.add_clause(&[a, b, !y]);
    solver.add_clause(&[!a, y]);
    solver.add_clause(&[!b, y]);
}

// Tseitin clauses for: y <=> a XOR b.
fn tseitin_xor(solver: &mut impl ExtendFormula, a: Lit, b: Lit, y: Lit) {
    solver.add_clause(&[!a, !b, !y]);
    solver.add_clause(&[a, b, !y]);
    solver.add_clause(&[a, !b, y]);
    solver.add_clause(&[!a, b, y]);
}

// Clauses for: y <=> a.
fn tseitin_equiv(solver: &mut impl ExtendFormula, a: Lit, y: Lit) {
    solver.add_clause(&[!a, y]);
    solver.add_clause(&[a, !y]);
}

// Tseitin clauses for: y <=> (s ? b : a).
fn tseitin_mux(solver: &mut impl ExtendFormula, s: Lit, a: Lit, b: Lit, y: Lit) {
    solver.add_clause(&[!s, !b, y]);
    solver.add_clause(&[!s, b, !y]);
    solver.add_clause(&[s, !a, y]);
    solver.add_clause(&[s, a, !y]);
}

pub struct SatGen<'a> {
    pub solver: varisat::Solver<'a>,
    lit_of_bit: HashMap<SigBit, Lit>,
    encoded_cells: HashSet<CellId>,
    mutex_clauses: usize,
}

impl<'a> Default for SatGen<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SatGen<'a> {
    pub fn new() -> Self {
        Self {
            solver: varisat::Solver::new(),
            lit_of_bit: HashMap::new(),
            encoded_cells: HashSet::new(),
            mutex_clauses: 0,
        }
    }

    /// Returns the literal for `bit`, creating it on first import. Constant
    /// bits get a unit clause pinning their value, asserted exactly once.
    pub fn import_bit(&mut self, sigmap: &SigMap, bit: SigBit) -> Lit {
        let bit = sigmap.canonicalize(bit);
        self.import_canonical(bit)
    }

    /// Imports a multi-bit signal, one literal per bit, LSB first.
    pub fn import_sig(&mut self, sigmap: &SigMap, sig: &crate::netlist::Sig) -> Vec<Lit> {
        sig.iter().map(|bit| self.import_bit(sigmap, *bit)).collect()
    }

    /// Looks up the literal of an already-imported bit without importing it.
    pub fn lookup_bit(&self, sigmap: &SigMap, bit: SigBit) -> Option<Lit> {
        self.lit_of_bit.get(&sigmap.canonicalize(bit)).copied()
    }

    pub fn imported_bit_count(&self) -> usize {
        self.lit_of_bit.len()
    }

    /// Asserts that `i` and `j` cannot be true together: (¬i ∨ ¬j).
    pub fn assert_mutex(&mut self, i: Lit, j: Lit) {
        self.solver.add_clause(&[!i, !j]);
        self.mutex_clauses += 1;
    }

    pub fn mutex_clause_count(&self) -> usize {
        self.mutex_clauses
    }

    pub fn is_cell_encoded(&self, cell: CellId) -> bool {
        self.encoded_cells.contains(&cell)
    }

    pub fn encoded_cell_count(&self) -> usize {
        self.encoded_cells.len()
    }

    /// Encodes one cell's function as clauses over its port literals,
    /// importing the ports as needed. Idempotent per cell.
    pub fn encode_cell(
        &mut self,
        netlist: &Netlist,
        sigmap: &SigMap,
        cell_id: CellId,
    ) -> Result<(), EncodeError> {
        if self.encoded_cells.contains(&cell_id) {
            return Ok(());
        }
        let cell = netlist.cell(cell_id);
        let y = self.import_sig(sigmap, &cell.y);
        let a = self.import_sig(sigmap, &cell.a);
        let width = y.len();
        match &cell.kind {
            CellKind::Buf => {
                let a = self.extend(a, width);
                self.tie(&a, &y);
            }
            CellKind::Slice { offset } => {
                let src: Vec<Lit> = (0..width)
                    .map(|i| match a.get(offset + i) {
                        Some(lit) => *lit,
                        None => self.const_lit(false),
                    })
                    .collect();
                self.tie(&src, &y);
            }
            CellKind::Concat => {
                let b = self.import_port_b(sigmap, cell)?;
                let mut bits = a;
                bits.extend(b);
                let bits = self.extend(bits, width);
                self.tie(&bits, &y);
            }
            CellKind::Not => {
                let a = self.extend(a, width);
                for (ai, yi) in a.iter().zip(y.iter()) {
                    tseitin_equiv(&mut self.solver, !*ai, *yi);
                }
            }
            CellKind::And | CellKind::Or | CellKind::Xor | CellKind::Xnor => {
                let b = self.import_port_b(sigmap, cell)?;
                let a = self.extend(a, width);
                let b = self.extend(b, width);
                for i in 0..width {
                    match cell.kind {
                        CellKind::And => tseitin_and(&mut self.solver, a[i], b[i], y[i]),
                        CellKind::Or => tseitin_or(&mut self.solver, a[i], b[i], y[i]),
                        CellKind::Xor => tseitin_xor(&mut self.solver, a[i], b[i], y[i]),
                        CellKind::Xnor => tseitin_xor(&mut self.solver, a[i], b[i], !y[i]),
                        _ => unreachable!(),
                    }
                }
            }
            CellKind::ReduceAnd => {
                let r = self.and_reduce(&a);
                self.tie_scalar(r, &y);
            }
            CellKind::ReduceOr | CellKind::ReduceBool => {
                let r = self.or_reduce(&a);
                self.tie_scalar(r, &y);
            }
            CellKind::ReduceXor => {
                let r = self.xor_reduce(&a);
                self.tie_scalar(r, &y);
            }
            CellKind::ReduceXnor => {
                let r = self.xor_reduce(&a);
                self.tie_scalar(!r, &y);
            }
            CellKind::LogicNot => {
                let r = self.or_reduce(&a);
                self.tie_scalar(!r, &y);
            }
            CellKind::LogicAnd | CellKind::LogicOr => {
                let b = self.import_port_b(sigmap, cell)?;
                let ra = self.or_reduce(&a);
                let rb = self.or_reduce(&b);
                let r = if cell.kind == CellKind::LogicAnd {
                    self.and2(ra, rb)
                } else {
                    self.or2(ra, rb)
                };
                self.tie_scalar(r, &y);
            }
            CellKind::Eq | CellKind::Ne => {
                let b = self.import_port_b(sigmap, cell)?;
                let w = a.len().max(b.len());
                let a = self.extend(a, w);
                let b = self.extend(b, w);
                let r = self.eq_vec(&a, &b);
                let r = if cell.kind == CellKind::Ne { !r } else { r };
                self.tie_scalar(r, &y);
            }
            CellKind::Mux => {
                let b = self.import_port_b(sigmap, cell)?;
                let s = self.import_port_s(sigmap, cell)?;
                let a = self.extend(a, width);
                let b = self.extend(b, width);
                for i in 0..width {
                    tseitin_mux(&mut self.solver, s, a[i], b[i], y[i]);
                }
            }
            CellKind::Neg => {
                let a = self.extend(a, width);
                let inv: Vec<Lit> = a.iter().map(|lit| !*lit).collect();
                let f = self.const_lit(false);
                let t = self.const_lit(true);
                let zeros = vec![f; width];
                let sums = self.ripple_add(&inv, &zeros, t);
                self.tie(&sums, &y);
            }
            CellKind::Add => {
                let b = self.import_port_b(sigmap, cell)?;
                let a = self.extend(a, width);
                let b = self.extend(b, width);
                let f = self.const_lit(false);
                let sums = self.ripple_add(&a, &b, f);
                self.tie(&sums, &y);
            }
            CellKind::Sub => {
                let b = self.import_port_b(sigmap, cell)?;
                let a = self.extend(a, width);
                let b = self.extend(b, width);
                let binv: Vec<Lit> = b.iter().map(|lit| !*lit).collect();
                let t = self.const_lit(true);
                let sums = self.ripple_add(&a, &binv, t);
                self.tie(&sums, &y);
            }
            CellKind::Lt | CellKind::Le | CellKind::Gt | CellKind::Ge => {
                let b = self.import_port_b(sigmap, cell)?;
                let w = a.len().max(b.len());
                let a = self.extend(a, w);
                let b = self.extend(b, w);
                let r = match cell.kind {
                    CellKind::Lt => self.ult(&a, &b),
                    CellKind::Le => !self.ult(&b, &a),
                    CellKind::Gt => self.ult(&b, &a),
                    CellKind::Ge => !self.ult(&a, &b),
                    _ => unreachable!(),
                };
                self.tie_scalar(r, &y);
            }
            CellKind::Shl | CellKind::Shr => {
                let b = self.import_port_b(sigmap, cell)?;
                self.encode_shift(&cell.kind, a, &b, &y);
            }
            CellKind::Mul => {
                let b = self.import_port_b(sigmap, cell)?;
                self.encode_mul(a, b, &y);
            }
            CellKind::Div | CellKind::Mod | CellKind::Pow | CellKind::Unknown(_) => {
                return Err(EncodeError::UnsupportedCell {
                    cell: cell.name.clone(),
                    kind: format!("{:?}", cell.kind),
                });
            }
        }
        self.encoded_cells.insert(cell_id);
        Ok(())
    }

    fn import_canonical(&mut self, bit: SigBit) -> Lit {
        if let Some(lit) = self.lit_of_bit.get(&bit) {
            return *lit;
        }
        let lit = self.solver.new_lit();
        if let SigBit::Const(value) = bit {
            self.solver.add_clause(&[if value { lit } else { !lit }]);
        }
        self.lit_of_bit.insert(bit, lit);
        lit
    }

    fn const_lit(&mut self, value: bool) -> Lit {
        self.import_canonical(SigBit::Const(value))
    }

    fn import_port_b(&mut self, sigmap: &SigMap, cell: &Cell) -> Result<Vec<Lit>, EncodeError> {
        let b = cell.b.as_ref().ok_or_else(|| EncodeError::MissingPort {
            cell: cell.name.clone(),
            port: 'B',
        })?;
        Ok(self.import_sig(sigmap, b))
    }

    fn import_port_s(&mut self, sigmap: &SigMap, cell: &Cell) -> Result<Lit, EncodeError> {
        let s = cell.s.as_ref().ok_or_else(|| EncodeError::MissingPort {
            cell: cell.name.clone(),
            port: 'S',
        })?;
        debug_assert_eq!(s.width(), 1, "mux select must be a single bit");
        let lits = self.import_sig(sigmap, s);
        lits.first().copied().ok_or_else(|| EncodeError::MissingPort {
            cell: cell.name.clone(),
            port: 'S',
        })
    }

    /// Asserts `from[i] <=> to[i]` bit for bit.
    fn tie(&mut self, from: &[Lit], to: &[Lit]) {
        debug_assert_eq!(from.len(), to.len());
        for (f, t) in from.iter().zip(to.iter()) {
            tseitin_equiv(&mut self.solver, *f, *t);
        }
    }

    /// Ties a single-bit result to `y[0]` and forces the upper bits of `y`
    /// to zero.
    fn tie_scalar(&mut self, r: Lit, y: &[Lit]) {
        if let Some(y0) = y.first() {
            tseitin_equiv(&mut self.solver, r, *y0);
        }
        for yi in y.iter().skip(1) {
            self.solver.add_clause(&[!*yi]);
        }
    }

    fn fresh(&mut self) -> Lit {
        self.solver.new_lit()
    }

    fn and2(&mut self, a: Lit, b: Lit) -> Lit {
        let y = self.fresh();
        tseitin_and(&mut self.solver, a, b, y);
        y
    }

    fn or2(&mut self, a: Lit, b: Lit) -> Lit {
        let y = self.fresh();
        tseitin_or(&mut self.solver, a, b, y);
        y
    }

    fn xor2(&mut self, a: Lit, b: Lit) -> Lit {
        let y = self.fresh();
        tseitin_xor(&mut self.solver, a, b, y);
        y
    }

    /// `s ? b : a`.
    fn mux2(&mut self, s: Lit, a: Lit, b: Lit) -> Lit {
        let y = self.fresh();
        tseitin_mux(&mut self.solver, s, a, b, y);
        y
    }

    fn and_reduce(&mut self, lits: &[Lit]) -> Lit {
        match lits.split_first() {
            None => self.const_lit(true),
            Some((first, rest)) => {
                let mut acc = *first;
                for lit in rest {
                    acc = self.and2(acc, *lit);
                }
                acc
            }
        }
    }

    fn or_reduce(&mut self, lits: &[Lit]) -> Lit {
        match lits.split_first() {
            None => self.const_lit(false),
            Some((first, rest)) => {
                let mut acc = *first;
                for lit in rest {
                    acc = self.or2(acc, *lit);
                }
                acc
            }
        }
    }

    fn xor_reduce(&mut self, lits: &[Lit]) -> Lit {
        match lits.split_first() {
            None => self.const_lit(false),
            Some((first, rest)) => {
                let mut acc = *first;
                for lit in rest {
                    acc = self.xor2(acc, *lit);
                }
                acc
            }
        }
    }

    fn eq_vec(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        debug_assert_eq!(a.len(), b.len());
        let xnors: Vec<Lit> = a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| !self.xor2(*ai, *bi))
            .collect();
        self.and_reduce(&xnors)
    }

    /// Unsigned a < b, LSB-first chain: lt = (¬a_i ∧ b_i) ∨ ((a_i == b_i) ∧
    /// lt_below).
    fn ult(&mut self, a: &[Lit], b: &[Lit]) -> Lit {
        debug_assert_eq!(a.len(), b.len());
        let mut lt = self.const_lit(false);
        for (ai, bi) in a.iter().zip(b.iter()) {
            let lt_here = self.and2(!*ai, *bi);
            let eq_here = !self.xor2(*ai, *bi);
            let carry = self.and2(eq_here, lt);
            lt = self.or2(lt_here, carry);
        }
        lt
    }

    /// Ripple-carry sum of equal-width vectors; the final carry-out is
    /// dropped (results truncate to the output width).
    fn ripple_add(&mut self, a: &[Lit], b: &[Lit], mut carry: Lit) -> Vec<Lit> {
        debug_assert_eq!(a.len(), b.len());
        let mut sums = Vec::with_capacity(a.len());
        for (ai, bi) in a.iter().zip(b.iter()) {
            let axb = self.xor2(*ai, *bi);
            sums.push(self.xor2(axb, carry));
            let gen = self.and2(*ai, *bi);
            let prop = self.and2(axb, carry);
            carry = self.or2(gen, prop);
        }
        sums
    }

    /// Mux-ladder barrel shifter over the shift-amount bits of `b`. Amounts
    /// at or past the working width force zeros.
    fn encode_shift(&mut self, kind: &CellKind, a: Vec<Lit>, b: &[Lit], y: &[Lit]) {
        let w = a.len().max(y.len());
        let mut cur = self.extend(a, w);
        for (k, bk) in b.iter().enumerate() {
            let amount = 1usize.checked_shl(k as u32).filter(|n| *n < w);
            let f = self.const_lit(false);
            let shifted: Vec<Lit> = (0..w)
                .map(|i| {
                    let src = match (kind, amount) {
                        (_, None) => None,
                        (CellKind::Shl, Some(n)) => i.checked_sub(n),
                        (CellKind::Shr, Some(n)) => i.checked_add(n).filter(|j| *j < w),
                        _ => unreachable!(),
                    };
                    match src {
                        Some(j) => cur[j],
                        None => f,
                    }
                })
                .collect();
            cur = cur
                .iter()
                .zip(shifted.iter())
                .map(|(c, s)| self.mux2(*bk, *c, *s))
                .collect();
        }
        let keep: Vec<Lit> = cur[..y.len()].to_vec();
        self.tie(&keep, y);
    }

    /// Shift-and-add partial products, truncated to the output width.
    fn encode_mul(&mut self, a: Vec<Lit>, b: Vec<Lit>, y: &[Lit]) {
        let w = y.len();
        let a = self.extend(a, w);
        let b = self.extend(b, w);
        let f = self.const_lit(false);
        let mut acc = vec![f; w];
        for (k, bk) in b.iter().enumerate() {
            let row: Vec<Lit> = (0..w)
                .map(|i| match i.checked_sub(k) {
                    Some(j) => self.and2(a[j], *bk),
                    None => f,
                })
                .collect();
            acc = self.ripple_add(&acc, &row, f);
        }
        self.tie(&acc, y);
    }

    /// Zero-extends or truncates to `width`.
    fn extend(&mut self, mut lits: Vec<Lit>, width: usize) -> Vec<Lit> {
        if lits.len() < width {
            let f = self.const_lit(false);
            lits.resize(width, f);
        } else {
            lits.truncate(width);
        }
        lits
    }
}
