/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! The variability aware control flow graph.
//!
//! `succ` and `pred` compute the conditional successors and predecessors of one
//! AST node on demand, combining C control flow with presence condition logic
//! across `#ifdef` alternatives. Results are memoized per node identity and are
//! stable in content and order across repeated calls.
//!
//! A `FunctionDef` node doubles as the entry and the exit of its function:
//! the successors of the function are the first statements of its body, the
//! successor of every `return` is the `FunctionDef` and the predecessors of the
//! `FunctionDef` are all returns plus the fall through end of the body

use log::trace;
use rustc_hash::FxHashMap;

use crate::fexpr::{FeatureId, Features};
use crate::ir::ast::{Ast, Conditional, NodeKind};
use crate::ir::{AstEnv, NodeId};

pub use verify::CfgDiagnostic;

mod blocks;
mod filters;
mod pred;
mod succ;
mod verify;

#[cfg(test)]
mod test;

pub struct ControlFlow<'lt> {
    ast: &'lt Ast,
    env: &'lt AstEnv,
    feats: &'lt mut Features,
    succ_cache: FxHashMap<NodeId, Vec<NodeId>>,
    pred_cache: FxHashMap<NodeId, Vec<NodeId>>,
}

impl<'lt> ControlFlow<'lt> {
    pub fn new(ast: &'lt Ast, env: &'lt AstEnv, feats: &'lt mut Features) -> Self {
        Self {
            ast,
            env,
            feats,
            succ_cache: FxHashMap::default(),
            pred_cache: FxHashMap::default(),
        }
    }

    /// Conditional successors of `node`, unique by identity, in source order at
    /// each expansion level
    pub fn succ(&mut self, node: NodeId) -> Vec<NodeId> {
        if let Some(cached) = self.succ_cache.get(&node) {
            return cached.clone();
        }
        let ctx = self.env.presence(node);
        trace!(
            "succ of {:?} ({})",
            node,
            self.ast[node].variant_name()
        );
        let res = self.compute_succ(node, ctx);
        self.succ_cache.insert(node, res.clone());
        res
    }

    /// Conditional predecessors of `node`; the mirror image of [`succ`](Self::succ)
    pub fn pred(&mut self, node: NodeId) -> Vec<NodeId> {
        if let Some(cached) = self.pred_cache.get(&node) {
            return cached.clone();
        }
        let ctx = self.env.presence(node);
        trace!(
            "pred of {:?} ({})",
            node,
            self.ast[node].variant_name()
        );
        let res = self.compute_pred(node, ctx);
        self.pred_cache.insert(node, res.clone());
        res
    }

    // shared helpers

    fn enclosing_function(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.env.parent(node);
        while let Some(node) = current {
            if let NodeKind::FunctionDef { .. } = self.ast[node] {
                return Some(node);
            }
            current = self.env.parent(node);
        }
        None
    }

    fn enclosing_loop_or_switch(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.env.parent(node);
        while let Some(node) = current {
            match self.ast[node] {
                NodeKind::SwitchStatement { .. } => return Some(node),
                ref kind if kind.is_loop() => return Some(node),
                NodeKind::FunctionDef { .. } => return None,
                _ => (),
            }
            current = self.env.parent(node);
        }
        None
    }

    fn enclosing_loop(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.env.parent(node);
        while let Some(node) = current {
            if self.ast[node].is_loop() {
                return Some(node);
            }
            if let NodeKind::FunctionDef { .. } = self.ast[node] {
                return None;
            }
            current = self.env.parent(node);
        }
        None
    }

    /// The nearest switch whose body the node belongs to
    fn enclosing_switch(&self, node: NodeId) -> Option<NodeId> {
        let mut current = self.env.parent(node);
        while let Some(node) = current {
            match self.ast[node] {
                NodeKind::SwitchStatement { .. } => return Some(node),
                NodeKind::FunctionDef { .. } => return None,
                _ => (),
            }
            current = self.env.parent(node);
        }
        None
    }

    fn compatible(&mut self, lhs: FeatureId, rhs: FeatureId) -> bool {
        self.feats.compatible(lhs, rhs)
    }

    /// Leaf statements of a conditionally wrapped branch, filtered to the ones
    /// that can be present together with `ctx`
    fn stmt_leaves(&mut self, branch: &Conditional<NodeId>, ctx: FeatureId) -> Vec<NodeId> {
        let mut res = Vec::new();
        for leaf in branch.leaves() {
            let presence = self.env.presence(leaf);
            if self.compatible(presence, ctx) {
                push_unique(&mut res, leaf);
            }
        }
        res
    }

    /// Like [`stmt_leaves`](Self::stmt_leaves) but resolves statement
    /// expressions to their inner compound (control enters and leaves the
    /// braces, not the expression wrapper)
    fn expr_leaves(&mut self, expr: &Conditional<NodeId>, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        let mut res = Vec::new();
        for leaf in expr.leaves() {
            let presence = self.env.presence(leaf);
            if !self.compatible(presence, ctx) {
                continue;
            }
            match ast[leaf] {
                NodeKind::CompoundStatementExpr { compound } => push_unique(&mut res, compound),
                _ => push_unique(&mut res, leaf),
            }
        }
        res
    }
}

pub(super) fn push_unique(res: &mut Vec<NodeId>, node: NodeId) {
    if !res.contains(&node) {
        res.push(node)
    }
}

pub(super) fn dedup_preserve_order(nodes: Vec<NodeId>) -> Vec<NodeId> {
    let mut res = Vec::with_capacity(nodes.len());
    for node in nodes {
        push_unique(&mut res, node);
    }
    res
}
