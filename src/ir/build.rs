/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Programmatic AST construction.
//!
//! A parser front end produces nodes exclusively through this builder so every
//! node receives its identity from the arena. The convenience constructors cover
//! the common shapes; anything else can be pushed as a raw [`NodeKind`]

use crate::ir::ast::{Ast, Conditional, NodeKind, Opt};
use crate::ir::{NodeId, Push};
use crate::symbol::Symbol;

#[derive(Default)]
pub struct AstBuilder {
    pub ast: Ast,
}

impl AstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self { ast: Ast::new() }
    }

    pub fn finish(self) -> Ast {
        self.ast
    }

    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        self.ast.push(kind)
    }

    // expressions

    pub fn id(&mut self, name: &str) -> NodeId {
        let name = Symbol::intern(name);
        self.push(NodeKind::Id { name })
    }

    pub fn constant(&mut self, value: &str) -> NodeId {
        let value = Symbol::intern(value);
        self.push(NodeKind::Constant { value })
    }

    pub fn string_lit(&mut self, value: &str) -> NodeId {
        let value = Symbol::intern(value);
        self.push(NodeKind::StringLit { value })
    }

    pub fn assign(&mut self, target: NodeId, source: NodeId) -> NodeId {
        self.assign_op(target, "=", source)
    }

    pub fn assign_op(&mut self, target: NodeId, op: &str, source: NodeId) -> NodeId {
        let op = Symbol::intern(op);
        self.push(NodeKind::AssignExpr { target, op, source })
    }

    pub fn binary(&mut self, lhs: NodeId, op: &str, rhs: NodeId) -> NodeId {
        let op = Symbol::intern(op);
        let sub = self.push(NodeKind::NArySubExpr { op, expr: rhs });
        self.push(NodeKind::NAryExpr {
            expr: lhs,
            others: vec![Opt::always(sub)],
        })
    }

    pub fn unary(&mut self, op: &str, expr: NodeId) -> NodeId {
        let op = Symbol::intern(op);
        self.push(NodeKind::UnaryOpExpr { op, expr })
    }

    pub fn post_inc(&mut self, expr: NodeId) -> NodeId {
        let op = Symbol::intern("++");
        let suffix = self.push(NodeKind::SimplePostfixSuffix { op });
        self.push(NodeKind::PostfixExpr { expr, suffix })
    }

    pub fn call(&mut self, callee: NodeId, args: Vec<NodeId>) -> NodeId {
        let args = args.into_iter().map(Opt::always).collect();
        let suffix = self.push(NodeKind::FunctionCall { args });
        self.push(NodeKind::PostfixExpr {
            expr: callee,
            suffix,
        })
    }

    pub fn member_access(&mut self, expr: NodeId, member: &str, arrow: bool) -> (NodeId, NodeId) {
        let id = self.id(member);
        let suffix = self.push(NodeKind::PointerPostfixSuffix { arrow, id });
        let access = self.push(NodeKind::PostfixExpr { expr, suffix });
        (access, id)
    }

    pub fn deref(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::PointerDerefExpr { expr })
    }

    // declarations

    pub fn int_specifier(&mut self) -> NodeId {
        let keyword = Symbol::intern("int");
        self.push(NodeKind::PrimitiveTypeSpecifier { keyword })
    }

    pub fn typedef_specifier(&mut self) -> NodeId {
        let keyword = Symbol::intern("typedef");
        self.push(NodeKind::StorageClassSpecifier { keyword })
    }

    /// A plain named declarator; returns `(declarator, id)`
    pub fn declarator(&mut self, name: &str) -> (NodeId, NodeId) {
        let id = self.id(name);
        let declarator = self.push(NodeKind::AtomicNamedDeclarator {
            pointers: Vec::new(),
            id,
            extensions: Vec::new(),
        });
        (declarator, id)
    }

    /// `name = initializer`; returns `(init_declarator, id)`
    pub fn init_declarator(&mut self, name: &str, initializer: Option<NodeId>) -> (NodeId, NodeId) {
        let (declarator, id) = self.declarator(name);
        let init_declarator = self.push(NodeKind::InitDeclarator {
            declarator,
            initializer,
        });
        (init_declarator, id)
    }

    pub fn declaration(
        &mut self,
        specifiers: Vec<Opt<NodeId>>,
        init_declarators: Vec<Opt<NodeId>>,
    ) -> NodeId {
        self.push(NodeKind::Declaration {
            specifiers,
            init_declarators,
        })
    }

    /// `int name;` as a statement; returns `(statement, id)`
    pub fn int_var_decl(&mut self, name: &str) -> (NodeId, NodeId) {
        let specifier = self.int_specifier();
        let (init_declarator, id) = self.init_declarator(name, None);
        let declaration = self.declaration(
            vec![Opt::always(specifier)],
            vec![Opt::always(init_declarator)],
        );
        let statement = self.push(NodeKind::DeclarationStatement { declaration });
        (statement, id)
    }

    // statements

    pub fn expr_stmt(&mut self, expr: NodeId) -> NodeId {
        self.push(NodeKind::ExprStatement { expr })
    }

    pub fn compound(&mut self, items: Vec<Opt<NodeId>>) -> NodeId {
        self.push(NodeKind::CompoundStatement { items })
    }

    pub fn block(&mut self, items: &[NodeId]) -> NodeId {
        let items = items.iter().copied().map(Opt::always).collect();
        self.compound(items)
    }

    pub fn if_stmt(
        &mut self,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.push(NodeKind::IfStatement {
            condition: Conditional::one(condition),
            then_branch: Conditional::one(then_branch),
            elifs: Vec::new(),
            else_branch: else_branch.map(Conditional::one),
        })
    }

    pub fn while_stmt(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.push(NodeKind::WhileStatement {
            condition: Conditional::one(condition),
            body: Conditional::one(body),
        })
    }

    pub fn do_stmt(&mut self, body: NodeId, condition: NodeId) -> NodeId {
        self.push(NodeKind::DoStatement {
            condition: Conditional::one(condition),
            body: Conditional::one(body),
        })
    }

    pub fn for_stmt(
        &mut self,
        init: Option<NodeId>,
        condition: Option<NodeId>,
        increment: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        self.push(NodeKind::ForStatement {
            init: init.map(Conditional::one),
            condition: condition.map(Conditional::one),
            increment: increment.map(Conditional::one),
            body: Conditional::one(body),
        })
    }

    pub fn switch_stmt(&mut self, expr: NodeId, body: NodeId) -> NodeId {
        self.push(NodeKind::SwitchStatement {
            expr: Conditional::one(expr),
            body: Conditional::one(body),
        })
    }

    pub fn case_stmt(&mut self, expr: NodeId, body: Option<NodeId>) -> NodeId {
        self.push(NodeKind::CaseStatement {
            expr,
            body: body.map(Conditional::one),
        })
    }

    pub fn default_stmt(&mut self, body: Option<NodeId>) -> NodeId {
        self.push(NodeKind::DefaultStatement {
            body: body.map(Conditional::one),
        })
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.push(NodeKind::BreakStatement)
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.push(NodeKind::ContinueStatement)
    }

    pub fn return_stmt(&mut self, expr: Option<NodeId>) -> NodeId {
        self.push(NodeKind::ReturnStatement { expr })
    }

    /// `label:`; returns `(statement, id)`
    pub fn label_stmt(&mut self, name: &str) -> (NodeId, NodeId) {
        let id = self.id(name);
        let statement = self.push(NodeKind::LabelStatement { id });
        (statement, id)
    }

    /// `goto label;`; returns `(statement, id)`
    pub fn goto_stmt(&mut self, name: &str) -> (NodeId, NodeId) {
        let id = self.id(name);
        let statement = self.push(NodeKind::GotoStatement { target: id });
        (statement, id)
    }

    /// `int name() { body }`; returns `(function, id)`
    pub fn function_def(&mut self, name: &str, body: NodeId) -> (NodeId, NodeId) {
        let specifier = self.int_specifier();
        let (declarator, id) = self.declarator(name);
        let function = self.push(NodeKind::FunctionDef {
            specifiers: vec![Opt::always(specifier)],
            declarator,
            old_style_parameters: Vec::new(),
            body,
        });
        (function, id)
    }

    pub fn translation_unit(&mut self, items: Vec<Opt<NodeId>>) -> NodeId {
        self.push(NodeKind::TranslationUnit { items })
    }
}
