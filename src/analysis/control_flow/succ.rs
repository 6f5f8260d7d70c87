/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Successor traversal.
//!
//! `succ_step` answers "where can control go after entering `x`" one level deep;
//! the expansion loop then replaces compound and conditional pass through nodes
//! (if/elif/switch/compound/do/while/for) by their leaf level successors until
//! only real control flow nodes remain

use fixedbitset::FixedBitSet;
use log::{debug, trace};

use super::blocks::FollowingElements;
use super::{dedup_preserve_order, ControlFlow};
use crate::fexpr::FeatureId;
use crate::ir::ast::NodeKind;
use crate::ir::NodeId;

/// Nodes that never appear in a final successor list; control passes through
/// them into their leaves. Case and default statements are real flow targets
/// (a switch dispatches onto them) and stay
fn is_pass_through(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::CompoundStatement { .. }
            | NodeKind::IfStatement { .. }
            | NodeKind::ElifStatement { .. }
            | NodeKind::SwitchStatement { .. }
            | NodeKind::WhileStatement { .. }
            | NodeKind::DoStatement { .. }
            | NodeKind::ForStatement { .. }
    )
}

impl ControlFlow<'_> {
    pub(super) fn compute_succ(&mut self, node: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let first = self.succ_step(node, ctx);
        self.expand_successors(first)
    }

    /// Iterates until no pass through node is left in the result. Termination:
    /// every replacement either strictly descends into a finite tree or the
    /// node is dropped by the revisit guard
    fn expand_successors(&mut self, mut res: Vec<NodeId>) -> Vec<NodeId> {
        let ast = self.ast;
        let mut expanded = FixedBitSet::with_capacity(ast.node_count());
        loop {
            let position = res.iter().position(|&node| is_pass_through(&ast[node]));
            let position = match position {
                Some(position) => position,
                None => break,
            };
            let node = res[position];
            if expanded.put(node.index()) {
                debug!("dropping re-expanded successor {:?}", node);
                res.remove(position);
                continue;
            }
            let ctx = self.env.presence(node);
            let replacement = self.succ_step(node, ctx);
            trace!(
                "expanding {:?} ({}) into {:?}",
                node,
                ast[node].variant_name(),
                replacement
            );
            res.splice(position..=position, replacement);
        }
        dedup_preserve_order(res)
    }

    /// One level of the successor relation: dispatch on the variant of `x`
    pub(super) fn succ_step(&mut self, x: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[x] {
            NodeKind::FunctionDef { body, .. } => match &ast[*body] {
                NodeKind::CompoundStatement { items } => {
                    let items: Vec<NodeId> = items.iter().map(|item| item.value).collect();
                    match self.following_elements(&items, ctx) {
                        FollowingElements::Complete(res) => res,
                        FollowingElements::Partial(mut res) => {
                            // a (conditionally) empty body starts at the exit
                            res.push(x);
                            res
                        }
                    }
                }
                _ => vec![*body],
            },

            NodeKind::ReturnStatement { .. } => match self.enclosing_function(x) {
                Some(function) => vec![function],
                None => {
                    structural_violation!("return statement {:?} outside of a function", x);
                    vec![]
                }
            },

            NodeKind::CompoundStatement { items } => {
                let items: Vec<NodeId> = items.iter().map(|item| item.value).collect();
                match self.following_elements(&items, ctx) {
                    FollowingElements::Complete(res) => res,
                    FollowingElements::Partial(mut res) => {
                        res.extend(self.stmt_succ(x, ctx));
                        res
                    }
                }
            }

            NodeKind::IfStatement { condition, .. } | NodeKind::ElifStatement { condition, .. } => {
                self.expr_leaves(condition, ctx)
            }

            NodeKind::SwitchStatement { expr, .. } => self.expr_leaves(expr, ctx),

            NodeKind::ForStatement {
                init,
                condition,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.expr_leaves(init, ctx)
                } else if let Some(condition) = condition {
                    self.expr_leaves(condition, ctx)
                } else {
                    self.stmt_leaves(body, ctx)
                }
            }

            NodeKind::WhileStatement { condition, .. } => self.expr_leaves(condition, ctx),

            NodeKind::DoStatement { body, .. } => self.stmt_leaves(body, ctx),

            NodeKind::BreakStatement => match self.enclosing_loop_or_switch(x) {
                Some(target) => self.stmt_succ(target, ctx),
                None => {
                    structural_violation!("break statement {:?} outside of a loop or switch", x);
                    vec![]
                }
            },

            NodeKind::ContinueStatement => match self.enclosing_loop(x) {
                Some(target) => self.loop_continuation(target, ctx),
                None => {
                    structural_violation!("continue statement {:?} outside of a loop", x);
                    vec![]
                }
            },

            NodeKind::GotoStatement { target } => {
                let function = match self.enclosing_function(x) {
                    Some(function) => function,
                    None => {
                        structural_violation!("goto statement {:?} outside of a function", x);
                        return vec![];
                    }
                };
                let body = self.function_body(function);
                match ast.name(*target) {
                    Some(name) => {
                        let labels = self.filter_label_statements(&[body], ctx, Some(name));
                        if labels.is_empty() {
                            // malformed goto falls through to the next statement
                            debug!("goto {:?} targets no label; treating as fall through", x);
                            self.stmt_succ(x, ctx)
                        } else {
                            labels
                        }
                    }
                    // a computed goto can reach every label of the function
                    None => self.filter_label_statements(&[body], ctx, None),
                }
            }

            NodeKind::CaseStatement {
                body: Some(body), ..
            }
            | NodeKind::DefaultStatement { body: Some(body) } => self.stmt_leaves(body, ctx),

            _ => self.stmt_succ(x, ctx),
        }
    }

    /// The continuation point of a loop: the increment of a `for`, otherwise
    /// the loop condition, otherwise the body start
    pub(super) fn loop_continuation(&mut self, target: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[target] {
            NodeKind::ForStatement {
                condition,
                increment,
                body,
                ..
            } => {
                if let Some(increment) = increment {
                    self.expr_leaves(increment, ctx)
                } else if let Some(condition) = condition {
                    self.expr_leaves(condition, ctx)
                } else {
                    self.stmt_leaves(body, ctx)
                }
            }
            NodeKind::WhileStatement { condition, .. } | NodeKind::DoStatement { condition, .. } => {
                self.expr_leaves(condition, ctx)
            }
            _ => {
                structural_violation!("{:?} is not a loop", target);
                vec![]
            }
        }
    }

    pub(super) fn function_body(&self, function: NodeId) -> NodeId {
        match self.ast[function] {
            NodeKind::FunctionDef { body, .. } => body,
            _ => function,
        }
    }

    /// The next elements at the level of `x`: the following ifdef blocks in its
    /// list container, climbing to the parent when flow can fall past them
    pub(super) fn stmt_succ(&mut self, x: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        if self.env.is_list_item(x) {
            let tail = self.env.following_siblings(x);
            match self.following_elements(&tail, ctx) {
                FollowingElements::Complete(res) => res,
                FollowingElements::Partial(mut res) => {
                    let container = self.env.parent(x).unwrap();
                    res.extend(self.follow_succ(container, ctx));
                    res
                }
            }
        } else {
            self.follow_succ(x, ctx)
        }
    }

    /// What executes after the construct `n` completes, decided by the parent
    /// of `n` and the syntactic role `n` plays in it
    fn follow_succ(&mut self, n: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        let parent = match self.env.parent(n) {
            Some(parent) => parent,
            None => return vec![],
        };

        match &ast[parent] {
            // the fall through end of a function body exits the function
            NodeKind::FunctionDef { .. } => vec![parent],

            NodeKind::IfStatement {
                condition,
                elifs,
                else_branch,
                ..
            } => {
                if condition.contains(n) {
                    let then_entry = self.if_then_entry(parent, ctx);
                    let mut res = then_entry;
                    if elifs.is_empty() {
                        res.extend(self.else_or_after(parent, ctx));
                    } else {
                        let items: Vec<NodeId> = elifs.iter().map(|item| item.value).collect();
                        match self.following_elements(&items, ctx) {
                            FollowingElements::Complete(elifs) => res.extend(elifs),
                            FollowingElements::Partial(elifs) => {
                                res.extend(elifs);
                                res.extend(self.else_or_after(parent, ctx));
                            }
                        }
                    }
                    res
                } else {
                    // a branch finished; continue after the whole if
                    self.stmt_succ(parent, ctx)
                }
            }

            NodeKind::ElifStatement {
                condition,
                then_branch,
            } => {
                let if_stmt = self.env.parent(parent).unwrap();
                if condition.contains(n) {
                    let mut res = self.stmt_leaves(then_branch, ctx);
                    // condition failed: try the next elif, the else branch or
                    // fall past the if
                    let tail = self.env.following_siblings(parent);
                    match self.following_elements(&tail, ctx) {
                        FollowingElements::Complete(elifs) => res.extend(elifs),
                        FollowingElements::Partial(elifs) => {
                            res.extend(elifs);
                            res.extend(self.else_or_after(if_stmt, ctx));
                        }
                    }
                    res
                } else {
                    self.stmt_succ(if_stmt, ctx)
                }
            }

            NodeKind::SwitchStatement { expr, body } => {
                if expr.contains(n) {
                    let roots = body.leaves();
                    let mut res = self.filter_case_statements(&roots, ctx);
                    let defaults = self.filter_default_statements(&roots, ctx);
                    if defaults.is_empty() {
                        // an unmatched value skips the body entirely
                        res.extend(self.stmt_succ(parent, ctx));
                    } else {
                        res.extend(defaults);
                    }
                    res
                } else {
                    self.stmt_succ(parent, ctx)
                }
            }

            NodeKind::WhileStatement { condition, body } => {
                if condition.contains(n) {
                    let mut res = self.stmt_leaves(body, ctx);
                    res.extend(self.stmt_succ(parent, ctx));
                    res
                } else {
                    self.expr_leaves(condition, ctx)
                }
            }

            NodeKind::DoStatement { condition, body } => {
                if condition.contains(n) {
                    let mut res = self.stmt_leaves(body, ctx);
                    res.extend(self.stmt_succ(parent, ctx));
                    res
                } else {
                    self.expr_leaves(condition, ctx)
                }
            }

            NodeKind::ForStatement {
                init,
                condition,
                increment,
                body,
            } => {
                if init.as_ref().map_or(false, |init| init.contains(n)) {
                    match condition {
                        Some(condition) => self.expr_leaves(condition, ctx),
                        None => self.stmt_leaves(body, ctx),
                    }
                } else if condition
                    .as_ref()
                    .map_or(false, |condition| condition.contains(n))
                {
                    let mut res = self.stmt_leaves(body, ctx);
                    res.extend(self.stmt_succ(parent, ctx));
                    res
                } else if increment
                    .as_ref()
                    .map_or(false, |increment| increment.contains(n))
                {
                    match condition {
                        Some(condition) => self.expr_leaves(condition, ctx),
                        None => self.stmt_leaves(body, ctx),
                    }
                } else {
                    // the body finished one iteration
                    self.loop_continuation(parent, ctx)
                }
            }

            // after the body of a case label flow continues with its sibling
            // (the fall through chain)
            NodeKind::CaseStatement { .. } | NodeKind::DefaultStatement { .. } => {
                self.stmt_succ(parent, ctx)
            }

            // leaving the braces of a statement expression continues wherever
            // the surrounding expression continues
            NodeKind::CompoundStatementExpr { .. } => self.stmt_succ(parent, ctx),

            _ => self.stmt_succ(parent, ctx),
        }
    }

    fn if_then_entry(&mut self, if_stmt: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[if_stmt] {
            NodeKind::IfStatement { then_branch, .. } => self.stmt_leaves(then_branch, ctx),
            _ => vec![],
        }
    }

    /// The false path past the last alternative of an if cascade: the else
    /// branch when there is one, the statement after the if otherwise
    fn else_or_after(&mut self, if_stmt: NodeId, ctx: FeatureId) -> Vec<NodeId> {
        let ast = self.ast;
        match &ast[if_stmt] {
            NodeKind::IfStatement {
                else_branch: Some(else_branch),
                ..
            } => self.stmt_leaves(else_branch, ctx),
            _ => self.stmt_succ(if_stmt, ctx),
        }
    }
}
