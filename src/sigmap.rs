// SPDX-License-Identifier: Apache-2.0

//! Signal canonicalization.
//!
//! Netlist connections tie bits together electrically; everything downstream
//! of the netlist (driver indexing, SAT literal import) wants a single
//! representative per alias class so that equivalent bits compare equal.
//! `SigMap` resolves the alias pairs recorded on a [`Netlist`] with a small
//! union-find and then flattens the result into a plain lookup table, so
//! `canonicalize` is a pure, idempotent read.

use std::collections::HashMap;

use crate::netlist::{Netlist, Sig, SigBit};

#[derive(Debug, Clone, Default)]
pub struct SigMap {
    /// Maps non-representative bits to their canonical representative. Bits
    /// absent from the map are their own representative.
    map: HashMap<SigBit, SigBit>,
}

fn find(parent: &mut HashMap<SigBit, SigBit>, mut bit: SigBit) -> SigBit {
    loop {
        let p = match parent.get(&bit) {
            None => return bit,
            Some(p) => *p,
        };
        match parent.get(&p) {
            None => return p,
            Some(gp) => {
                // Path halving.
                let gp = *gp;
                parent.insert(bit, gp);
                bit = gp;
            }
        }
    }
}

impl SigMap {
    /// Resolves all alias pairs of `netlist`. The representative of each
    /// alias class is its minimum bit, so constants win over wire bits and
    /// the choice is deterministic.
    pub fn build(netlist: &Netlist) -> Self {
        let mut parent: HashMap<SigBit, SigBit> = HashMap::new();
        for (a, b) in &netlist.aliases {
            let ra = find(&mut parent, *a);
            let rb = find(&mut parent, *b);
            if ra == rb {
                continue;
            }
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent.insert(child, root);
        }
        let keys: Vec<SigBit> = parent.keys().copied().collect();
        let mut map = HashMap::new();
        for key in keys {
            let root = find(&mut parent, key);
            if root != key {
                map.insert(key, root);
            }
        }
        Self { map }
    }

    /// Returns the canonical representative of `bit`. Idempotent and stable
    /// under repeated calls.
    pub fn canonicalize(&self, bit: SigBit) -> SigBit {
        *self.map.get(&bit).unwrap_or(&bit)
    }

    pub fn canonicalize_sig(&self, sig: &Sig) -> Sig {
        Sig::from_bits(sig.iter().map(|bit| self.canonicalize(*bit)).collect())
    }
}
