/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Presence conditions.
//!
//! Every AST node carries a boolean expression over feature symbols (its presence
//! condition) that decides in which configurations the node exists. Conditions are
//! hash consed into an arena so that they are cheap to copy and compare; all
//! satisfiability style queries go through a [`SatOracle`] and are memoized per
//! `(lhs, rhs)` pair because the analyses ask the same questions over and over

use index_vec::IndexVec;
use rustc_hash::FxHashMap;

use crate::symbol::Symbol;

pub use sat::{BruteForceOracle, SatOracle};

mod sat;

index_vec::define_index_type! {
    /// Handle to an interned presence condition term
    pub struct FeatureId = u32;
    DEBUG_FORMAT = "f{}";
}

/// The pre interned `true` constant (valid for every [`Terms`] arena)
pub fn always() -> FeatureId {
    FeatureId::from_usize(0)
}

/// The pre interned `false` constant (valid for every [`Terms`] arena)
pub fn never() -> FeatureId {
    FeatureId::from_usize(1)
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Term {
    True,
    False,
    Atom(Symbol),
    Not(FeatureId),
    And(FeatureId, FeatureId),
    Or(FeatureId, FeatureId),
}

/// The term arena. Construction only; queries live on [`Features`]
#[derive(Default)]
pub struct Terms {
    terms: IndexVec<FeatureId, Term>,
    interned: FxHashMap<Term, FeatureId>,
}

impl Terms {
    fn new() -> Self {
        let mut res = Self::default();
        res.intern(Term::True);
        res.intern(Term::False);
        res
    }

    fn intern(&mut self, term: Term) -> FeatureId {
        if let Some(&id) = self.interned.get(&term) {
            return id;
        }
        let id = self.terms.push(term);
        self.interned.insert(term, id);
        id
    }

    pub fn term(&self, id: FeatureId) -> Term {
        self.terms[id]
    }

    pub fn always(&self) -> FeatureId {
        always()
    }

    pub fn never(&self) -> FeatureId {
        never()
    }

    pub fn atom(&mut self, feature: Symbol) -> FeatureId {
        self.intern(Term::Atom(feature))
    }

    pub fn not(&mut self, operand: FeatureId) -> FeatureId {
        match self.terms[operand] {
            Term::True => self.never(),
            Term::False => self.always(),
            Term::Not(inner) => inner,
            _ => self.intern(Term::Not(operand)),
        }
    }

    pub fn and(&mut self, lhs: FeatureId, rhs: FeatureId) -> FeatureId {
        if lhs == rhs || rhs == self.always() {
            return lhs;
        }
        if lhs == self.always() {
            return rhs;
        }
        if lhs == self.never() || rhs == self.never() {
            return self.never();
        }
        // commutative; normalize the operand order to improve consing hits
        let (lhs, rhs) = if lhs < rhs { (lhs, rhs) } else { (rhs, lhs) };
        self.intern(Term::And(lhs, rhs))
    }

    pub fn or(&mut self, lhs: FeatureId, rhs: FeatureId) -> FeatureId {
        if lhs == rhs || rhs == self.never() {
            return lhs;
        }
        if lhs == self.never() {
            return rhs;
        }
        if lhs == self.always() || rhs == self.always() {
            return self.always();
        }
        let (lhs, rhs) = if lhs < rhs { (lhs, rhs) } else { (rhs, lhs) };
        self.intern(Term::Or(lhs, rhs))
    }

    pub fn implication(&mut self, lhs: FeatureId, rhs: FeatureId) -> FeatureId {
        let not_lhs = self.not(lhs);
        self.or(not_lhs, rhs)
    }

    /// All distinct feature symbols occurring in `id`, in first-occurrence order
    pub fn atoms(&self, id: FeatureId) -> Vec<Symbol> {
        let mut res = Vec::new();
        self.collect_atoms(id, &mut res);
        res
    }

    fn collect_atoms(&self, id: FeatureId, dst: &mut Vec<Symbol>) {
        match self.terms[id] {
            Term::True | Term::False => (),
            Term::Atom(feature) => {
                if !dst.contains(&feature) {
                    dst.push(feature)
                }
            }
            Term::Not(operand) => self.collect_atoms(operand, dst),
            Term::And(lhs, rhs) | Term::Or(lhs, rhs) => {
                self.collect_atoms(lhs, dst);
                self.collect_atoms(rhs, dst);
            }
        }
    }

    /// Evaluates `id` under a truth assignment of its atoms
    pub fn eval(&self, id: FeatureId, assignment: &impl Fn(Symbol) -> bool) -> bool {
        match self.terms[id] {
            Term::True => true,
            Term::False => false,
            Term::Atom(feature) => assignment(feature),
            Term::Not(operand) => !self.eval(operand, assignment),
            Term::And(lhs, rhs) => self.eval(lhs, assignment) && self.eval(rhs, assignment),
            Term::Or(lhs, rhs) => self.eval(lhs, assignment) || self.eval(rhs, assignment),
        }
    }

    pub fn pretty(&self, id: FeatureId) -> String {
        match self.terms[id] {
            Term::True => "1".to_string(),
            Term::False => "0".to_string(),
            Term::Atom(feature) => feature.as_str().to_string(),
            Term::Not(operand) => format!("!{}", self.pretty_atomic(operand)),
            Term::And(lhs, rhs) => {
                format!("{}&{}", self.pretty_atomic(lhs), self.pretty_atomic(rhs))
            }
            Term::Or(lhs, rhs) => {
                format!("{}|{}", self.pretty_atomic(lhs), self.pretty_atomic(rhs))
            }
        }
    }

    fn pretty_atomic(&self, id: FeatureId) -> String {
        match self.terms[id] {
            Term::And(_, _) | Term::Or(_, _) => format!("({})", self.pretty(id)),
            _ => self.pretty(id),
        }
    }
}

/// Presence condition store plus the memoized query surface of the feature oracle
pub struct Features {
    pub terms: Terms,
    oracle: Box<dyn SatOracle>,
    sat_cache: FxHashMap<FeatureId, bool>,
    implies_cache: FxHashMap<(FeatureId, FeatureId), bool>,
}

impl Default for Features {
    fn default() -> Self {
        Self::new()
    }
}

impl Features {
    pub fn new() -> Self {
        Self::with_oracle(Box::new(BruteForceOracle::default()))
    }

    pub fn with_oracle(oracle: Box<dyn SatOracle>) -> Self {
        Self {
            terms: Terms::new(),
            oracle,
            sat_cache: FxHashMap::default(),
            implies_cache: FxHashMap::default(),
        }
    }

    pub fn always(&self) -> FeatureId {
        self.terms.always()
    }

    pub fn never(&self) -> FeatureId {
        self.terms.never()
    }

    pub fn atom(&mut self, feature: Symbol) -> FeatureId {
        self.terms.atom(feature)
    }

    pub fn named_atom(&mut self, feature: &str) -> FeatureId {
        let feature = Symbol::intern(feature);
        self.terms.atom(feature)
    }

    pub fn not(&mut self, operand: FeatureId) -> FeatureId {
        self.terms.not(operand)
    }

    pub fn and(&mut self, lhs: FeatureId, rhs: FeatureId) -> FeatureId {
        self.terms.and(lhs, rhs)
    }

    pub fn or(&mut self, lhs: FeatureId, rhs: FeatureId) -> FeatureId {
        self.terms.or(lhs, rhs)
    }

    pub fn is_satisfiable(&mut self, id: FeatureId) -> bool {
        let Self {
            terms,
            oracle,
            sat_cache,
            ..
        } = self;
        *sat_cache
            .entry(id)
            .or_insert_with(|| oracle.is_satisfiable(terms, id))
    }

    pub fn is_tautology(&mut self, id: FeatureId) -> bool {
        let negated = self.terms.not(id);
        !self.is_satisfiable(negated)
    }

    pub fn is_contradiction(&mut self, id: FeatureId) -> bool {
        !self.is_satisfiable(id)
    }

    pub fn implies(&mut self, lhs: FeatureId, rhs: FeatureId) -> bool {
        if let Some(&res) = self.implies_cache.get(&(lhs, rhs)) {
            return res;
        }
        let not_rhs = self.terms.not(rhs);
        let counterexample = self.terms.and(lhs, not_rhs);
        let res = !self.is_satisfiable(counterexample);
        self.implies_cache.insert((lhs, rhs), res);
        res
    }

    pub fn equivalent(&mut self, lhs: FeatureId, rhs: FeatureId) -> bool {
        lhs == rhs || (self.implies(lhs, rhs) && self.implies(rhs, lhs))
    }

    /// `lhs` and `rhs` can hold at the same time
    pub fn compatible(&mut self, lhs: FeatureId, rhs: FeatureId) -> bool {
        let both = self.terms.and(lhs, rhs);
        self.is_satisfiable(both)
    }

    pub fn pretty(&self, id: FeatureId) -> String {
        self.terms.pretty(id)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn oracle_queries() {
        let mut feats = Features::new();
        let a = feats.named_atom("A");
        let b = feats.named_atom("B");
        let not_a = feats.not(a);
        let cover = feats.or(a, not_a);
        let conflict = feats.and(a, not_a);
        let both = feats.and(a, b);

        assert!(feats.is_tautology(cover));
        assert!(feats.is_contradiction(conflict));
        assert!(feats.is_satisfiable(both));
        assert!(feats.implies(both, a));
        assert!(!feats.implies(a, both));
        assert!(feats.equivalent(cover, feats.always()));
        assert!(!feats.compatible(a, not_a));
    }

    #[test]
    fn query_memo_is_stable() {
        let mut feats = Features::new();
        let a = feats.named_atom("A");
        let b = feats.named_atom("B");
        assert_eq!(feats.implies(a, b), feats.implies(a, b));
        assert!(feats.equivalent(a, a));
    }
}
