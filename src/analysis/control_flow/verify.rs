/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Consistency check between the two traversal directions.
//!
//! A well formed graph is symmetric: every successor edge has the matching
//! predecessor edge and vice versa. Violations are reported as diagnostics and
//! never abort the analysis

use std::fmt;

use fixedbitset::FixedBitSet;
use log::debug;

use super::ControlFlow;
use crate::ir::ast::NodeKind;
use crate::ir::NodeId;

/// A missing edge between two control flow nodes, named together with the
/// presence condition of the node the edge starts from
#[derive(Clone, PartialEq, Eq)]
pub enum CfgDiagnostic {
    /// `to` is a successor of `from` but `from` is not a predecessor of `to`
    MissingPred {
        from: NodeId,
        to: NodeId,
        condition: String,
    },
    /// `from` is a predecessor of `to` but `to` is not a successor of `from`
    MissingSucc {
        from: NodeId,
        to: NodeId,
        condition: String,
    },
}

impl fmt::Debug for CfgDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CfgDiagnostic::MissingPred {
                from,
                to,
                condition,
            } => write!(
                f,
                "{:?} -> {:?} (under {}) has no matching predecessor edge",
                from, to, condition
            ),
            CfgDiagnostic::MissingSucc {
                from,
                to,
                condition,
            } => write!(
                f,
                "{:?} -> {:?} (under {}) has no matching successor edge",
                from, to, condition
            ),
        }
    }
}

/// Real control flow nodes. Compound and conditional constructs are
/// transparent (they are expanded and rolled up out of every edge list), so
/// symmetry is only meaningful for the nodes that can actually appear in edges
fn is_flow_node(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::DeclarationStatement { .. }
            | NodeKind::CaseStatement { .. }
            | NodeKind::DefaultStatement { .. }
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement
            | NodeKind::ReturnStatement { .. }
            | NodeKind::GotoStatement { .. }
            | NodeKind::LabelStatement { .. }
            | NodeKind::ExprStatement { .. }
            | NodeKind::FunctionDef { .. }
    )
}

impl ControlFlow<'_> {
    /// Checks pred/succ symmetry for every control flow node reachable from the
    /// statements below `root` (usually a `FunctionDef`)
    pub fn compare_succ_with_pred(&mut self, root: NodeId) -> Vec<CfgDiagnostic> {
        let ast = self.ast;

        // seed with the statement nodes of the subtree; condition expressions
        // and other flow nodes are discovered through the edges themselves
        let mut work = vec![root];
        let mut queued = FixedBitSet::with_capacity(ast.node_count());
        queued.insert(root.index());
        {
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                ast.for_each_child(node, &mut |child| {
                    if is_flow_node(&ast[child]) && !queued.put(child.index()) {
                        work.push(child);
                    }
                    stack.push(child);
                });
            }
        }

        let mut res = Vec::new();
        let mut checked = FixedBitSet::with_capacity(ast.node_count());
        while let Some(node) = work.pop() {
            if checked.put(node.index()) {
                continue;
            }

            for succ in self.succ(node) {
                if !self.pred(succ).contains(&node) {
                    let condition = self.feats.pretty(self.env.presence(node));
                    debug!("missing predecessor edge {:?} -> {:?}", node, succ);
                    res.push(CfgDiagnostic::MissingPred {
                        from: node,
                        to: succ,
                        condition,
                    });
                }
                if !queued.put(succ.index()) {
                    work.push(succ);
                }
            }

            for pred in self.pred(node) {
                if !self.succ(pred).contains(&node) {
                    let condition = self.feats.pretty(self.env.presence(pred));
                    debug!("missing successor edge {:?} -> {:?}", pred, node);
                    res.push(CfgDiagnostic::MissingSucc {
                        from: pred,
                        to: node,
                        condition,
                    });
                }
                if !queued.put(pred.index()) {
                    work.push(pred);
                }
            }
        }
        res
    }
}
