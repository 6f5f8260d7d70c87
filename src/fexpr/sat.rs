/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

use log::warn;

use super::{FeatureId, Terms};

/// Decides satisfiability of presence conditions.
///
/// The analyses treat this as a black box; swapping in a BDD or SAT backend only
/// requires implementing this trait
pub trait SatOracle {
    fn is_satisfiable(&mut self, terms: &Terms, id: FeatureId) -> bool;
}

/// Enumerates truth assignments over the atoms of the queried term.
///
/// Presence conditions of a single translation unit mention few distinct features,
/// so exhaustive evaluation is usually cheaper than a real solver. Terms over more
/// than [`BruteForceOracle::MAX_FEATURES`] features are conservatively reported
/// satisfiable
#[derive(Default, Clone, Copy, Debug)]
pub struct BruteForceOracle;

impl BruteForceOracle {
    pub const MAX_FEATURES: usize = 24;
}

impl SatOracle for BruteForceOracle {
    fn is_satisfiable(&mut self, terms: &Terms, id: FeatureId) -> bool {
        let atoms = terms.atoms(id);
        if atoms.len() > Self::MAX_FEATURES {
            warn!(
                "{} distinct features in one presence condition; assuming satisfiable",
                atoms.len()
            );
            return true;
        }

        (0u32..1u32 << atoms.len()).any(|assignment| {
            terms.eval(id, &|feature| {
                let bit = atoms.iter().position(|&atom| atom == feature).unwrap();
                assignment & (1u32 << bit) != 0
            })
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn enumeration() {
        let mut terms = Terms::new();
        let a = terms.atom(Symbol::intern("A"));
        let b = terms.atom(Symbol::intern("B"));
        let not_b = terms.not(b);
        let mixed = terms.and(a, not_b);
        let never = {
            let not_a = terms.not(a);
            terms.and(a, not_a)
        };

        let mut oracle = BruteForceOracle::default();
        assert!(oracle.is_satisfiable(&terms, mixed));
        assert!(!oracle.is_satisfiable(&terms, never));
        assert!(oracle.is_satisfiable(&terms, terms.always()));
        assert!(!oracle.is_satisfiable(&terms, terms.never()));
    }
}
