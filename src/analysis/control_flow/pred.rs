/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Predecessor traversal.
//!
//! The symmetric mirror of the successor walk. Candidates found by the sibling
//! and parent climbs may still be whole constructs; `roll_up` unfolds such a
//! candidate into its actual exit points (the last statements of a compound,
//! the condition and breaks of a loop, the tails of a switch) until only leaf
//! level control flow nodes remain. Jump statements never fall through, so they
//! dissolve into nothing when rolled up; their edges are added where the jump
//! target is the queried node itself

use fixedbitset::FixedBitSet;
use log::{debug, trace};

use super::blocks::FollowingElements;
use super::{dedup_preserve_order, ControlFlow};
use crate::fexpr::FeatureId;
use crate::ir::ast::{Conditional, NodeKind, Opt};
use crate::ir::NodeId;

impl ControlFlow<'_> {
    pub(super) fn compute_pred(&mut self, node: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let first = self.pred_step(node, ctx);
        self.roll_up_all(node, first, ctx)
    }

    /// Rolls up construct candidates until the list only contains leaves
    fn roll_up_all(&mut self, source: NodeId, mut res: Vec<NodeId>, ctx: FeatureId) -> Vec<NodeId> {
        let mut rolled = FixedBitSet::with_capacity(self.ast.node_count());
        loop {
            let mut position = None;
            for (index, &node) in res.iter().enumerate() {
                if self.needs_roll_up(node) {
                    position = Some(index);
                    break;
                }
            }
            let position = match position {
                Some(position) => position,
                None => break,
            };
            let node = res[position];
            if rolled.put(node.index()) {
                debug!("dropping re-rolled predecessor {:?}", node);
                res.remove(position);
                continue;
            }
            let replacement = self.roll_up(source, node, ctx);
            trace!(
                "rolling up {:?} ({}) into {:?}",
                node,
                self.ast[node].variant_name(),
                replacement
            );
            res.splice(position..=position, replacement);
        }
        dedup_preserve_order(res)
    }

    /// Jump statements are deliberately absent: whether a jump contributes an
    /// edge depends on how the candidate was found (an explicit jump edge
    /// stays, a fall through candidate dissolves in
    /// [`roll_up_jump_statements`](Self::roll_up_jump_statements))
    fn needs_roll_up(&self, node: NodeId) -> bool {
        matches!(
            self.ast[node],
            NodeKind::CompoundStatement { .. }
                | NodeKind::IfStatement { .. }
                | NodeKind::ElifStatement { .. }
                | NodeKind::SwitchStatement { .. }
                | NodeKind::WhileStatement { .. }
                | NodeKind::DoStatement { .. }
                | NodeKind::ForStatement { .. }
        )
    }

    /// One level of the predecessor relation for the queried node itself:
    /// jump targets get their incoming jump edges here, everything else is the
    /// plain reverse flow
    fn pred_step(&mut self, x: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[x] {
            // the function exit: every return plus the fall through end of the body
            NodeKind::FunctionDef { body, .. } => {
                let mut res = self.filter_return_statements(&[*body], ctx);
                match &ast[*body] {
                    NodeKind::CompoundStatement { items } => {
                        let items: Vec<NodeId> =
                            items.iter().rev().map(|item| item.value).collect();
                        match self.following_elements(&items, ctx) {
                            FollowingElements::Complete(tail) => {
                                let tail = self.roll_up_jump_statements(tail, ctx);
                                res.extend(tail)
                            }
                            FollowingElements::Partial(tail) => {
                                let tail = self.roll_up_jump_statements(tail, ctx);
                                res.extend(tail);
                                // a (conditionally) empty body flows straight
                                // from entry to exit
                                res.push(x);
                            }
                        }
                    }
                    _ => res.push(*body),
                }
                res
            }

            // switch dispatch edges onto its labels
            NodeKind::CaseStatement { .. } | NodeKind::DefaultStatement { .. } => {
                let mut res = match self.enclosing_switch(x) {
                    Some(switch) => match &ast[switch] {
                        NodeKind::SwitchStatement { expr, .. } => self.expr_leaves(expr, ctx),
                        _ => vec![],
                    },
                    None => {
                        structural_violation!("case label {:?} outside of a switch", x);
                        vec![]
                    }
                };
                res.extend(self.flow_pred(x, ctx));
                res
            }

            // goto edges onto a label; computed gotos reach every label
            NodeKind::LabelStatement { id } => {
                let mut res = Vec::new();
                if let Some(function) = self.enclosing_function(x) {
                    let body = self.function_body(function);
                    if let Some(name) = ast.name(*id) {
                        res.extend(self.filter_goto_statements(&[body], ctx, name));
                    }
                    res.extend(self.filter_computed_goto_statements(&[body], ctx));
                }
                res.extend(self.flow_pred(x, ctx));
                res
            }

            _ => self.flow_pred(x, ctx),
        }
    }

    /// The elements control leaves immediately before reaching `x`: preceding
    /// ifdef blocks in its list container, climbing to the parent when flow can
    /// enter past them
    pub(super) fn flow_pred(&mut self, x: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        if self.env.is_list_item(x) {
            let before = self.env.preceding_siblings(x);
            match self.following_elements(&before, ctx) {
                FollowingElements::Complete(res) => self.roll_up_jump_statements(res, ctx),
                FollowingElements::Partial(res) => {
                    let mut res = self.roll_up_jump_statements(res, ctx);
                    let container = self.env.parent(x).unwrap();
                    res.extend(self.container_entry_pred(container, ctx));
                    res
                }
            }
        } else {
            self.follow_pred(x, ctx)
        }
    }

    /// Jump target roll up for fall through candidates: a case label with a
    /// body stands for the exits of that body (case chains can nest), one
    /// without passes flow through itself. Jump statements never fall through,
    /// so breaks, continues, returns and gotos dissolve here; their edges are
    /// contributed where the jump target is the queried node
    fn roll_up_jump_statements(&mut self, nodes: Vec<NodeId>, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        let mut res = Vec::new();
        for node in nodes {
            match &ast[node] {
                NodeKind::CaseStatement {
                    body: Some(body), ..
                }
                | NodeKind::DefaultStatement { body: Some(body) } => {
                    let exits = self.stmt_leaves(body, ctx);
                    let exits = self.roll_up_jump_statements(exits, ctx);
                    res.extend(exits);
                }
                NodeKind::BreakStatement
                | NodeKind::ContinueStatement
                | NodeKind::ReturnStatement { .. }
                | NodeKind::GotoStatement { .. } => (),
                _ => res.push(node),
            }
        }
        res
    }

    /// The fall through exit points of a branch: its leaf statements with jump
    /// statements dissolved
    fn fall_through_exits(&mut self, branch: &Conditional<NodeId>, ctx: FeatureId) -> Vec<NodeId> {
        let leaves = self.stmt_leaves(branch, ctx);
        self.roll_up_jump_statements(leaves, ctx)
    }

    /// Predecessors of the first position inside a list container
    fn container_entry_pred(&mut self, container: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[container] {
            // the first elif is reached when the if condition fails
            NodeKind::IfStatement { condition, .. } => self.expr_leaves(condition, ctx),
            NodeKind::TranslationUnit { .. } => vec![],
            _ => self.follow_pred(container, ctx),
        }
    }

    /// What precedes the entry of `n`, decided by the parent of `n` and the
    /// syntactic role `n` plays in it
    fn follow_pred(&mut self, n: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        let parent = match self.env.parent(n) {
            Some(parent) => parent,
            None => return vec![],
        };

        match &ast[parent] {
            // the first statement of a function is entered from the FunctionDef
            NodeKind::FunctionDef { .. } => vec![parent],

            NodeKind::IfStatement {
                condition,
                then_branch,
                elifs,
                else_branch,
            } => {
                if condition.contains(n) {
                    self.flow_pred(parent, ctx)
                } else if then_branch.contains(n) {
                    self.expr_leaves(condition, ctx)
                } else if else_branch
                    .as_ref()
                    .map_or(false, |else_branch| else_branch.contains(n))
                {
                    self.elif_false_exits(elifs, condition, ctx)
                } else {
                    self.flow_pred(parent, ctx)
                }
            }

            NodeKind::ElifStatement {
                condition,
                then_branch,
            } => {
                if condition.contains(n) {
                    // the elif condition runs after the previous alternative failed
                    self.flow_pred(parent, ctx)
                } else if then_branch.contains(n) {
                    self.expr_leaves(condition, ctx)
                } else {
                    self.flow_pred(parent, ctx)
                }
            }

            NodeKind::SwitchStatement { expr, body } => {
                if expr.contains(n) {
                    self.flow_pred(parent, ctx)
                } else if body.contains(n) {
                    // statements before the first label are only reachable via
                    // the dispatch edge
                    self.expr_leaves(expr, ctx)
                } else {
                    self.flow_pred(parent, ctx)
                }
            }

            NodeKind::WhileStatement { condition, body } => {
                if condition.contains(n) {
                    let mut res = self.flow_pred(parent, ctx);
                    res.extend(self.fall_through_exits(body, ctx));
                    res.extend(self.loop_continues(parent, body, ctx));
                    res
                } else {
                    self.expr_leaves(condition, ctx)
                }
            }

            NodeKind::DoStatement { condition, body } => {
                if condition.contains(n) {
                    let mut res = self.fall_through_exits(body, ctx);
                    res.extend(self.loop_continues(parent, body, ctx));
                    res
                } else {
                    // entered from outside or from a true condition (back edge)
                    let mut res = self.flow_pred(parent, ctx);
                    res.extend(self.expr_leaves(condition, ctx));
                    res
                }
            }

            NodeKind::ForStatement {
                init,
                condition,
                increment,
                body,
            } => {
                let in_init = init.as_ref().map_or(false, |init| init.contains(n));
                let in_condition = condition
                    .as_ref()
                    .map_or(false, |condition| condition.contains(n));
                let in_increment = increment
                    .as_ref()
                    .map_or(false, |increment| increment.contains(n));

                if in_init {
                    self.flow_pred(parent, ctx)
                } else if in_condition {
                    let mut res = match init {
                        Some(init) => self.expr_leaves(init, ctx),
                        None => self.flow_pred(parent, ctx),
                    };
                    match increment {
                        Some(increment) => res.extend(self.expr_leaves(increment, ctx)),
                        None => {
                            res.extend(self.fall_through_exits(body, ctx));
                            res.extend(self.loop_continues(parent, body, ctx));
                        }
                    }
                    res
                } else if in_increment {
                    let mut res = self.fall_through_exits(body, ctx);
                    res.extend(self.loop_continues(parent, body, ctx));
                    res
                } else {
                    // body entry
                    match condition {
                        Some(condition) => self.expr_leaves(condition, ctx),
                        None => {
                            let mut res = match init {
                                Some(init) => self.expr_leaves(init, ctx),
                                None => self.flow_pred(parent, ctx),
                            };
                            match increment {
                                Some(increment) => res.extend(self.expr_leaves(increment, ctx)),
                                None => {
                                    res.extend(self.fall_through_exits(body, ctx));
                                    res.extend(self.loop_continues(parent, body, ctx));
                                }
                            }
                            res
                        }
                    }
                }
            }

            // the body of a label is entered from the label itself
            NodeKind::CaseStatement { .. } | NodeKind::DefaultStatement { .. } => vec![parent],

            _ => self.flow_pred(parent, ctx),
        }
    }

    /// Continue statements that re-enter this loop's continuation point
    fn loop_continues(
        &mut self,
        _loop_stmt: NodeId,
        body: &Conditional<NodeId>,
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        let roots = body.leaves();
        self.filter_continue_statements(&roots, ctx)
    }

    /// The false path out of an if cascade: the condition of the last
    /// alternative(s), falling back to the if condition itself
    fn elif_false_exits(
        &mut self,
        elifs: &[Opt<NodeId>],
        if_condition: &Conditional<NodeId>,
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        if elifs.is_empty() {
            return self.expr_leaves(if_condition, ctx);
        }
        let reversed: Vec<NodeId> = elifs.iter().rev().map(|item| item.value).collect();
        match self.following_elements(&reversed, ctx) {
            FollowingElements::Complete(heads) => self.elif_conditions(&heads, ctx),
            FollowingElements::Partial(heads) => {
                let mut res = self.elif_conditions(&heads, ctx);
                res.extend(self.expr_leaves(if_condition, ctx));
                res
            }
        }
    }

    fn elif_conditions(&mut self, elifs: &[NodeId], ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        let mut res = Vec::new();
        for &elif in elifs {
            if let NodeKind::ElifStatement { condition, .. } = &ast[elif] {
                res.extend(self.expr_leaves(condition, ctx));
            }
        }
        res
    }

    /// Replaces a construct predecessor by its actual exit points
    fn roll_up(&mut self, source: NodeId, node: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[node] {
            NodeKind::CompoundStatement { items } => {
                let items: Vec<NodeId> = items.iter().rev().map(|item| item.value).collect();
                match self.following_elements(&items, ctx) {
                    FollowingElements::Complete(tail) => self.roll_up_jump_statements(tail, ctx),
                    FollowingElements::Partial(tail) => {
                        let mut tail = self.roll_up_jump_statements(tail, ctx);
                        // flow can pass through an (under some configurations)
                        // empty compound
                        tail.extend(self.flow_pred(node, ctx));
                        tail
                    }
                }
            }

            NodeKind::IfStatement {
                condition,
                then_branch,
                elifs,
                else_branch,
            } => {
                let env = self.env;
                let source_in_else = else_branch.as_ref().map_or(false, |else_branch| {
                    let mut inside = false;
                    else_branch.for_each(&mut |&leaf| inside |= env.is_part_of(source, leaf));
                    inside
                });

                let mut res = Vec::new();
                if !source_in_else {
                    // exits of the then branch and of every elif branch; when
                    // the source sits in the else branch those are parallel
                    // arms, not predecessors
                    res.extend(self.fall_through_exits(then_branch, ctx));
                    for elif in elifs {
                        if let NodeKind::ElifStatement { then_branch, .. } = &ast[elif.value] {
                            res.extend(self.fall_through_exits(then_branch, ctx));
                        }
                    }
                }
                match else_branch {
                    Some(else_branch) => res.extend(self.fall_through_exits(else_branch, ctx)),
                    // without an else the failed condition itself falls out
                    None => res.extend(self.elif_false_exits(elifs, condition, ctx)),
                }
                res
            }

            // an elif in a candidate chain contributes its failed condition
            NodeKind::ElifStatement { condition, .. } => self.expr_leaves(condition, ctx),

            NodeKind::SwitchStatement { expr, body } => {
                let roots = body.leaves();
                let defaults = self.filter_default_statements(&roots, ctx);
                let mut res = Vec::new();
                if defaults.is_empty() {
                    // an unmatched value bypasses the body
                    res.extend(self.expr_leaves(expr, ctx));
                }
                res.extend(self.filter_break_statements(&roots, ctx));
                // the fall through tail of the body
                res.extend(self.fall_through_exits(body, ctx));
                res
            }

            NodeKind::WhileStatement { condition, body }
            | NodeKind::DoStatement { condition, body } => {
                let mut res = self.expr_leaves(condition, ctx);
                let roots = body.leaves();
                res.extend(self.filter_break_statements(&roots, ctx));
                res
            }

            NodeKind::ForStatement {
                condition, body, ..
            } => {
                let mut res = match condition {
                    Some(condition) => self.expr_leaves(condition, ctx),
                    // without a condition the loop only exits through breaks
                    None => vec![],
                };
                let roots = body.leaves();
                res.extend(self.filter_break_statements(&roots, ctx));
                res
            }

            _ => vec![node],
        }
    }
}
