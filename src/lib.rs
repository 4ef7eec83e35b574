// SPDX-License-Identifier: Apache-2.0

//! Bounded logic-cone extraction into an incremental SAT model.
//!
//! Optimization passes that want to ask a SAT solver questions about a
//! handful of signal bits ("are these two bits always equal?", "is this
//! don't-care condition reachable?") cannot afford to encode a whole
//! million-gate netlist. [`cone::ConeBuilder`] pulls in just enough of the
//! surrounding combinational logic: it keeps a frontier of interesting bits,
//! discovers the cells driving them, admits cells into the SAT model subject
//! to a complexity/size/round budget, and expands the frontier to the
//! admitted cells' inputs. Bits left unexpanded become free solver variables,
//! which is conservative for the UNSAT-style proofs the callers run.

pub mod cone;
pub mod index;
pub mod netlist;
pub mod satgen;
pub mod sigmap;
