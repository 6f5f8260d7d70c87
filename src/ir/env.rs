/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Side tables over a borrowed [`Ast`].
//!
//! The AST itself carries no back pointers; parent and sibling relations and the
//! presence conditions derived from the `Opt`/`Choice` wrappers are computed once
//! per translation unit and kept in parallel tables keyed by [`NodeId`]

use fixedbitset::FixedBitSet;
use index_vec::{index_vec, IndexVec};

use crate::fexpr::{self, FeatureId, Features};
use crate::ir::ast::{Ast, ChildGroup};
use crate::ir::NodeId;

pub struct AstEnv {
    parent: IndexVec<NodeId, Option<NodeId>>,
    prev: IndexVec<NodeId, Option<NodeId>>,
    next: IndexVec<NodeId, Option<NodeId>>,
    in_list: FixedBitSet,
    /// the annotation attached directly to the node (its `Opt` condition or the
    /// conjunction of `Choice` branch conditions leading to it)
    local: IndexVec<NodeId, FeatureId>,
    /// conjunction of all annotations along the root path
    presence: IndexVec<NodeId, FeatureId>,
    root: NodeId,
}

impl AstEnv {
    pub fn build(ast: &Ast, root: NodeId, feats: &mut Features) -> Self {
        let len = ast.node_count();
        let mut env = AstEnv {
            parent: index_vec![None; len],
            prev: index_vec![None; len],
            next: index_vec![None; len],
            in_list: FixedBitSet::with_capacity(len),
            local: index_vec![fexpr::always(); len],
            presence: index_vec![fexpr::always(); len],
            root,
        };

        let mut work = vec![root];
        let mut cond_leaves = Vec::new();
        while let Some(node) = work.pop() {
            let presence = env.presence[node];
            for group in ast[node].children() {
                match group {
                    ChildGroup::Plain(child) => {
                        env.parent[child] = Some(node);
                        env.presence[child] = presence;
                        work.push(child);
                    }
                    ChildGroup::Cond(cond) => {
                        cond_leaves.clear();
                        cond.for_each_annotated(
                            &mut feats.terms,
                            fexpr::always(),
                            &mut |local, &child| cond_leaves.push((local, child)),
                        );
                        for &(local, child) in &cond_leaves {
                            env.parent[child] = Some(node);
                            env.local[child] = local;
                            env.presence[child] = feats.terms.and(presence, local);
                            work.push(child);
                        }
                    }
                    ChildGroup::List(items) => {
                        for (position, item) in items.iter().enumerate() {
                            let child = item.value;
                            env.parent[child] = Some(node);
                            env.in_list.insert(child.index());
                            env.local[child] = item.condition;
                            env.presence[child] = feats.terms.and(presence, item.condition);
                            if position > 0 {
                                env.prev[child] = Some(items[position - 1].value);
                            }
                            if let Some(successor) = items.get(position + 1) {
                                env.next[child] = Some(successor.value);
                            }
                            work.push(child);
                        }
                    }
                }
            }
        }
        env
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent[node]
    }

    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.prev[node]
    }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.next[node]
    }

    /// The node lives in an `Opt` list container (and therefore has a sibling chain)
    pub fn is_list_item(&self, node: NodeId) -> bool {
        self.in_list.contains(node.index())
    }

    pub fn annotation(&self, node: NodeId) -> FeatureId {
        self.local[node]
    }

    pub fn presence(&self, node: NodeId) -> FeatureId {
        self.presence[node]
    }

    /// The annotations along the root path, outermost first, trivial ones skipped
    pub fn feature_set(&self, node: NodeId) -> Vec<FeatureId> {
        let mut res = Vec::new();
        let mut current = Some(node);
        while let Some(node) = current {
            if self.local[node] != fexpr::always() {
                res.push(self.local[node]);
            }
            current = self.parent[node];
        }
        res.reverse();
        res
    }

    /// `child` is `ancestor` or lies somewhere below it
    pub fn is_part_of(&self, child: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(child);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent[node];
        }
        false
    }

    /// All siblings after `node` in its list container, in source order
    pub fn following_siblings(&self, node: NodeId) -> Vec<NodeId> {
        let mut res = Vec::new();
        let mut current = self.next[node];
        while let Some(node) = current {
            res.push(node);
            current = self.next[node];
        }
        res
    }

    /// All siblings before `node` in its list container, closest first
    pub fn preceding_siblings(&self, node: NodeId) -> Vec<NodeId> {
        let mut res = Vec::new();
        let mut current = self.prev[node];
        while let Some(node) = current {
            res.push(node);
            current = self.prev[node];
        }
        res
    }
}
