/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Scoped statement filters.
//!
//! Jump statements bind to the nearest enclosing construct that captures them,
//! so these traversals never descend into a nested construct of the capturing
//! kind: an inner switch captures `break` and `case`, an inner loop captures
//! `break` and `continue`, a nested function captures `return` and labels.
//! A statement is admitted only when its presence condition can imply `ctx`

use super::ControlFlow;
use crate::fexpr::FeatureId;
use crate::ir::ast::NodeKind;
use crate::ir::NodeId;
use crate::symbol::Symbol;

fn captures_break(kind: &NodeKind) -> bool {
    kind.is_loop() || matches!(kind, NodeKind::SwitchStatement { .. })
}

fn captures_continue(kind: &NodeKind) -> bool {
    kind.is_loop()
}

fn captures_case(kind: &NodeKind) -> bool {
    // loops do not capture case labels (Duff's device)
    matches!(kind, NodeKind::SwitchStatement { .. })
}

fn captures_function_scope(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::FunctionDef { .. })
}

impl ControlFlow<'_> {
    /// `presence -> ctx` is satisfiable; the admission test of every filter
    fn admits(&mut self, node: NodeId, ctx: FeatureId) -> bool {
        let presence = self.env.presence(node);
        let implication = self.feats.terms.implication(presence, ctx);
        self.feats.is_satisfiable(implication)
    }

    /// Preorder source order traversal from `roots`, collecting matches and
    /// refusing to descend into children that capture the searched jump
    fn filter_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
        matches: impl Fn(&NodeKind) -> bool,
        captures: impl Fn(&NodeKind) -> bool,
    ) -> Vec<NodeId> {
        let ast = self.ast;
        let mut res = Vec::new();
        let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if matches(&ast[node]) && self.admits(node, ctx) {
                res.push(node);
            }
            let mut children = Vec::new();
            ast.for_each_child(node, &mut |child| {
                if !captures(&ast[child]) {
                    children.push(child)
                }
            });
            stack.extend(children.into_iter().rev());
        }
        res
    }

    pub(super) fn filter_break_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        self.filter_statements(
            roots,
            ctx,
            |kind| matches!(kind, NodeKind::BreakStatement),
            captures_break,
        )
    }

    pub(super) fn filter_continue_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        self.filter_statements(
            roots,
            ctx,
            |kind| matches!(kind, NodeKind::ContinueStatement),
            captures_continue,
        )
    }

    pub(super) fn filter_case_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        self.filter_statements(
            roots,
            ctx,
            |kind| matches!(kind, NodeKind::CaseStatement { .. }),
            captures_case,
        )
    }

    pub(super) fn filter_default_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        self.filter_statements(
            roots,
            ctx,
            |kind| matches!(kind, NodeKind::DefaultStatement { .. }),
            captures_case,
        )
    }

    pub(super) fn filter_return_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        self.filter_statements(
            roots,
            ctx,
            |kind| matches!(kind, NodeKind::ReturnStatement { .. }),
            captures_function_scope,
        )
    }

    /// Label statements of one function; `name == None` matches every label
    /// (the target set of a computed goto)
    pub(super) fn filter_label_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
        name: Option<Symbol>,
    ) -> Vec<NodeId> {
        let ast = self.ast;
        self.filter_statements(
            roots,
            ctx,
            move |kind| match kind {
                NodeKind::LabelStatement { id } => match name {
                    Some(name) => ast.name(*id) == Some(name),
                    None => true,
                },
                _ => false,
            },
            captures_function_scope,
        )
    }

    /// Goto statements of one function targeting `name`
    pub(super) fn filter_goto_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
        name: Symbol,
    ) -> Vec<NodeId> {
        let ast = self.ast;
        self.filter_statements(
            roots,
            ctx,
            move |kind| match kind {
                NodeKind::GotoStatement { target } => ast.name(*target) == Some(name),
                _ => false,
            },
            captures_function_scope,
        )
    }

    /// Computed gotos (`goto *expr`) of one function
    pub(super) fn filter_computed_goto_statements(
        &mut self,
        roots: &[NodeId],
        ctx: FeatureId,
    ) -> Vec<NodeId> {
        let ast = self.ast;
        self.filter_statements(
            roots,
            ctx,
            move |kind| match kind {
                NodeKind::GotoStatement { target } => ast.name(*target).is_none(),
                _ => false,
            },
            captures_function_scope,
        )
    }
}
