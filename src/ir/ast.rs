/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

use std::ops::{Index, IndexMut};

use index_vec::IndexVec;

use crate::fexpr::{self, FeatureId, Terms};
use crate::ir::{NodeId, Push};
use crate::symbol::Symbol;

/// An Ast representing one parsed C translation unit after conditional lifting.
///
/// It provides stable indices for every node because the tree is immutable once
/// created; the analyses borrow it read only
#[derive(Default)]
pub struct Ast {
    pub nodes: IndexVec<NodeId, NodeKind>,
}

impl Ast {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: IndexVec::with_capacity(512),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The name carried by an `Id` node
    pub fn name(&self, node: NodeId) -> Option<Symbol> {
        match self.nodes[node] {
            NodeKind::Id { name } => Some(name),
            _ => None,
        }
    }

    /// Calls `f` with every direct child id in source order
    pub fn for_each_child(&self, node: NodeId, f: &mut impl FnMut(NodeId)) {
        for group in self.nodes[node].children() {
            match group {
                ChildGroup::Plain(child) => f(child),
                ChildGroup::Cond(cond) => cond.for_each(&mut |&child| f(child)),
                ChildGroup::List(items) => {
                    for item in items {
                        f(item.value)
                    }
                }
            }
        }
    }
}

impl Index<NodeId> for Ast {
    type Output = NodeKind;
    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index]
    }
}

impl IndexMut<NodeId> for Ast {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}

impl Push<NodeKind> for Ast {
    type Key = NodeId;
    fn push(&mut self, value: NodeKind) -> NodeId {
        self.nodes.push(value)
    }
}

/// A value that only exists in some configurations.
///
/// `Choice` nests to arbitrary depth; the two arms describe the value under the
/// condition and under its negation. This is a tagged sum, not a collection:
/// every consumer matches it exhaustively and processes each arm independently
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Conditional<T> {
    One(T),
    Choice(FeatureId, Box<Conditional<T>>, Box<Conditional<T>>),
}

impl<T> Conditional<T> {
    pub fn one(value: T) -> Self {
        Conditional::One(value)
    }

    pub fn choice(condition: FeatureId, then: Conditional<T>, other: Conditional<T>) -> Self {
        Conditional::Choice(condition, Box::new(then), Box::new(other))
    }

    pub fn for_each(&self, f: &mut impl FnMut(&T)) {
        match self {
            Conditional::One(value) => f(value),
            Conditional::Choice(_, then, other) => {
                then.for_each(f);
                other.for_each(f);
            }
        }
    }

    /// Calls `f` with every leaf and the conjunction of the `Choice` branch
    /// conditions leading to it (starting from `base`)
    pub fn for_each_annotated(
        &self,
        terms: &mut Terms,
        base: FeatureId,
        f: &mut impl FnMut(FeatureId, &T),
    ) {
        match self {
            Conditional::One(value) => f(base, value),
            Conditional::Choice(condition, then, other) => {
                let then_cond = terms.and(base, *condition);
                then.for_each_annotated(terms, then_cond, f);
                let negated = terms.not(*condition);
                let other_cond = terms.and(base, negated);
                other.for_each_annotated(terms, other_cond, f);
            }
        }
    }

    /// The leftmost leaf
    pub fn first(&self) -> &T {
        match self {
            Conditional::One(value) => value,
            Conditional::Choice(_, then, _) => then.first(),
        }
    }
}

impl Conditional<NodeId> {
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut res = Vec::new();
        self.for_each(&mut |&node| res.push(node));
        res
    }

    pub fn contains(&self, node: NodeId) -> bool {
        let mut found = false;
        self.for_each(&mut |&leaf| found |= leaf == node);
        found
    }
}

/// An element of a homogeneous list that is only present when `condition` holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Opt<T> {
    pub condition: FeatureId,
    pub value: T,
}

impl<T> Opt<T> {
    pub fn new(condition: FeatureId, value: T) -> Self {
        Self { condition, value }
    }

    /// Present in every configuration
    pub fn always(value: T) -> Self {
        Self {
            condition: fexpr::always(),
            value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    TranslationUnit {
        items: Vec<Opt<NodeId>>,
    },

    // declarations
    Declaration {
        specifiers: Vec<Opt<NodeId>>,
        init_declarators: Vec<Opt<NodeId>>,
    },
    DeclarationStatement {
        declaration: NodeId,
    },
    InitDeclarator {
        declarator: NodeId,
        initializer: Option<NodeId>,
    },
    AtomicNamedDeclarator {
        pointers: Vec<Opt<NodeId>>,
        id: NodeId,
        extensions: Vec<Opt<NodeId>>,
    },
    NestedNamedDeclarator {
        pointers: Vec<Opt<NodeId>>,
        nested: NodeId,
        extensions: Vec<Opt<NodeId>>,
    },
    Pointer {
        specifiers: Vec<Opt<NodeId>>,
    },
    DeclParameterDeclList {
        declarations: Vec<Opt<NodeId>>,
    },
    ParameterDeclarationD {
        specifiers: Vec<Opt<NodeId>>,
        declarator: NodeId,
    },
    ParameterDeclarationAD {
        specifiers: Vec<Opt<NodeId>>,
        abstract_declarator: NodeId,
    },
    PlainParameterDeclaration {
        specifiers: Vec<Opt<NodeId>>,
    },
    DeclArrayAccess {
        size: Option<NodeId>,
    },
    TypeName {
        specifiers: Vec<Opt<NodeId>>,
        declarator: Option<NodeId>,
    },
    TypeDefTypeSpecifier {
        name: NodeId,
    },
    PrimitiveTypeSpecifier {
        keyword: Symbol,
    },
    StorageClassSpecifier {
        keyword: Symbol,
    },
    StructOrUnionSpecifier {
        is_union: bool,
        tag: Option<NodeId>,
        members: Option<Vec<Opt<NodeId>>>,
    },
    StructDeclaration {
        specifiers: Vec<Opt<NodeId>>,
        declarators: Vec<Opt<NodeId>>,
    },
    StructDeclarator {
        declarator: NodeId,
        bitfield: Option<NodeId>,
    },
    EnumSpecifier {
        tag: Option<NodeId>,
        enumerators: Option<Vec<Opt<NodeId>>>,
    },
    Enumerator {
        id: NodeId,
        value: Option<NodeId>,
    },

    // statements
    CompoundStatement {
        items: Vec<Opt<NodeId>>,
    },
    IfStatement {
        condition: Conditional<NodeId>,
        then_branch: Conditional<NodeId>,
        elifs: Vec<Opt<NodeId>>,
        else_branch: Option<Conditional<NodeId>>,
    },
    ElifStatement {
        condition: Conditional<NodeId>,
        then_branch: Conditional<NodeId>,
    },
    SwitchStatement {
        expr: Conditional<NodeId>,
        body: Conditional<NodeId>,
    },
    CaseStatement {
        expr: NodeId,
        body: Option<Conditional<NodeId>>,
    },
    DefaultStatement {
        body: Option<Conditional<NodeId>>,
    },
    WhileStatement {
        condition: Conditional<NodeId>,
        body: Conditional<NodeId>,
    },
    DoStatement {
        condition: Conditional<NodeId>,
        body: Conditional<NodeId>,
    },
    ForStatement {
        init: Option<Conditional<NodeId>>,
        condition: Option<Conditional<NodeId>>,
        increment: Option<Conditional<NodeId>>,
        body: Conditional<NodeId>,
    },
    BreakStatement,
    ContinueStatement,
    ReturnStatement {
        expr: Option<NodeId>,
    },
    GotoStatement {
        target: NodeId,
    },
    LabelStatement {
        id: NodeId,
    },
    ExprStatement {
        expr: NodeId,
    },
    FunctionDef {
        specifiers: Vec<Opt<NodeId>>,
        declarator: NodeId,
        old_style_parameters: Vec<Opt<NodeId>>,
        body: NodeId,
    },

    // expressions
    Id {
        name: Symbol,
    },
    Constant {
        value: Symbol,
    },
    StringLit {
        value: Symbol,
    },
    PostfixExpr {
        expr: NodeId,
        suffix: NodeId,
    },
    PointerPostfixSuffix {
        arrow: bool,
        id: NodeId,
    },
    SimplePostfixSuffix {
        op: Symbol,
    },
    FunctionCall {
        args: Vec<Opt<NodeId>>,
    },
    AssignExpr {
        target: NodeId,
        op: Symbol,
        source: NodeId,
    },
    UnaryOpExpr {
        op: Symbol,
        expr: NodeId,
    },
    NAryExpr {
        expr: NodeId,
        others: Vec<Opt<NodeId>>,
    },
    NArySubExpr {
        op: Symbol,
        expr: NodeId,
    },
    CastExpr {
        type_name: NodeId,
        expr: NodeId,
    },
    ConditionalExpr {
        condition: NodeId,
        then_expr: Option<Conditional<NodeId>>,
        else_expr: NodeId,
    },
    PointerDerefExpr {
        expr: NodeId,
    },
    SizeOfExprT {
        type_name: NodeId,
    },
    SizeOfExprU {
        expr: NodeId,
    },
    BuiltinOffsetof {
        type_name: NodeId,
        designators: Vec<Opt<NodeId>>,
    },
    OffsetofMemberDesignatorID {
        id: NodeId,
    },
    CompoundStatementExpr {
        compound: NodeId,
    },
}

/// One syntactic child position of a node.
///
/// `List` elements have previous/next siblings; `Cond` children carry the
/// `Choice` branch conditions; `Plain` children inherit their parent's presence
pub enum ChildGroup<'lt> {
    Plain(NodeId),
    Cond(&'lt Conditional<NodeId>),
    List(&'lt [Opt<NodeId>]),
}

impl NodeKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            NodeKind::TranslationUnit { .. } => "TranslationUnit",
            NodeKind::Declaration { .. } => "Declaration",
            NodeKind::DeclarationStatement { .. } => "DeclarationStatement",
            NodeKind::InitDeclarator { .. } => "InitDeclarator",
            NodeKind::AtomicNamedDeclarator { .. } => "AtomicNamedDeclarator",
            NodeKind::NestedNamedDeclarator { .. } => "NestedNamedDeclarator",
            NodeKind::Pointer { .. } => "Pointer",
            NodeKind::DeclParameterDeclList { .. } => "DeclParameterDeclList",
            NodeKind::ParameterDeclarationD { .. } => "ParameterDeclarationD",
            NodeKind::ParameterDeclarationAD { .. } => "ParameterDeclarationAD",
            NodeKind::PlainParameterDeclaration { .. } => "PlainParameterDeclaration",
            NodeKind::DeclArrayAccess { .. } => "DeclArrayAccess",
            NodeKind::TypeName { .. } => "TypeName",
            NodeKind::TypeDefTypeSpecifier { .. } => "TypeDefTypeSpecifier",
            NodeKind::PrimitiveTypeSpecifier { .. } => "PrimitiveTypeSpecifier",
            NodeKind::StorageClassSpecifier { .. } => "StorageClassSpecifier",
            NodeKind::StructOrUnionSpecifier { .. } => "StructOrUnionSpecifier",
            NodeKind::StructDeclaration { .. } => "StructDeclaration",
            NodeKind::StructDeclarator { .. } => "StructDeclarator",
            NodeKind::EnumSpecifier { .. } => "EnumSpecifier",
            NodeKind::Enumerator { .. } => "Enumerator",
            NodeKind::CompoundStatement { .. } => "CompoundStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ElifStatement { .. } => "ElifStatement",
            NodeKind::SwitchStatement { .. } => "SwitchStatement",
            NodeKind::CaseStatement { .. } => "CaseStatement",
            NodeKind::DefaultStatement { .. } => "DefaultStatement",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::DoStatement { .. } => "DoStatement",
            NodeKind::ForStatement { .. } => "ForStatement",
            NodeKind::BreakStatement => "BreakStatement",
            NodeKind::ContinueStatement => "ContinueStatement",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::GotoStatement { .. } => "GotoStatement",
            NodeKind::LabelStatement { .. } => "LabelStatement",
            NodeKind::ExprStatement { .. } => "ExprStatement",
            NodeKind::FunctionDef { .. } => "FunctionDef",
            NodeKind::Id { .. } => "Id",
            NodeKind::Constant { .. } => "Constant",
            NodeKind::StringLit { .. } => "StringLit",
            NodeKind::PostfixExpr { .. } => "PostfixExpr",
            NodeKind::PointerPostfixSuffix { .. } => "PointerPostfixSuffix",
            NodeKind::SimplePostfixSuffix { .. } => "SimplePostfixSuffix",
            NodeKind::FunctionCall { .. } => "FunctionCall",
            NodeKind::AssignExpr { .. } => "AssignExpr",
            NodeKind::UnaryOpExpr { .. } => "UnaryOpExpr",
            NodeKind::NAryExpr { .. } => "NAryExpr",
            NodeKind::NArySubExpr { .. } => "NArySubExpr",
            NodeKind::CastExpr { .. } => "CastExpr",
            NodeKind::ConditionalExpr { .. } => "ConditionalExpr",
            NodeKind::PointerDerefExpr { .. } => "PointerDerefExpr",
            NodeKind::SizeOfExprT { .. } => "SizeOfExprT",
            NodeKind::SizeOfExprU { .. } => "SizeOfExprU",
            NodeKind::BuiltinOffsetof { .. } => "BuiltinOffsetof",
            NodeKind::OffsetofMemberDesignatorID { .. } => "OffsetofMemberDesignatorID",
            NodeKind::CompoundStatementExpr { .. } => "CompoundStatementExpr",
        }
    }

    /// Direct children in source order, grouped by the kind of syntactic slot
    /// they occupy
    pub fn children(&self) -> Vec<ChildGroup<'_>> {
        let mut res = Vec::new();
        match self {
            NodeKind::TranslationUnit { items } => res.push(ChildGroup::List(items)),

            NodeKind::Declaration {
                specifiers,
                init_declarators,
            } => {
                res.push(ChildGroup::List(specifiers));
                res.push(ChildGroup::List(init_declarators));
            }
            NodeKind::DeclarationStatement { declaration } => {
                res.push(ChildGroup::Plain(*declaration))
            }
            NodeKind::InitDeclarator {
                declarator,
                initializer,
            } => {
                res.push(ChildGroup::Plain(*declarator));
                if let Some(initializer) = initializer {
                    res.push(ChildGroup::Plain(*initializer));
                }
            }
            NodeKind::AtomicNamedDeclarator {
                pointers,
                id,
                extensions,
            } => {
                res.push(ChildGroup::List(pointers));
                res.push(ChildGroup::Plain(*id));
                res.push(ChildGroup::List(extensions));
            }
            NodeKind::NestedNamedDeclarator {
                pointers,
                nested,
                extensions,
            } => {
                res.push(ChildGroup::List(pointers));
                res.push(ChildGroup::Plain(*nested));
                res.push(ChildGroup::List(extensions));
            }
            NodeKind::Pointer { specifiers } => res.push(ChildGroup::List(specifiers)),
            NodeKind::DeclParameterDeclList { declarations } => {
                res.push(ChildGroup::List(declarations))
            }
            NodeKind::ParameterDeclarationD {
                specifiers,
                declarator,
            } => {
                res.push(ChildGroup::List(specifiers));
                res.push(ChildGroup::Plain(*declarator));
            }
            NodeKind::ParameterDeclarationAD {
                specifiers,
                abstract_declarator,
            } => {
                res.push(ChildGroup::List(specifiers));
                res.push(ChildGroup::Plain(*abstract_declarator));
            }
            NodeKind::PlainParameterDeclaration { specifiers } => {
                res.push(ChildGroup::List(specifiers))
            }
            NodeKind::DeclArrayAccess { size } => {
                if let Some(size) = size {
                    res.push(ChildGroup::Plain(*size))
                }
            }
            NodeKind::TypeName {
                specifiers,
                declarator,
            } => {
                res.push(ChildGroup::List(specifiers));
                if let Some(declarator) = declarator {
                    res.push(ChildGroup::Plain(*declarator));
                }
            }
            NodeKind::TypeDefTypeSpecifier { name } => res.push(ChildGroup::Plain(*name)),
            NodeKind::PrimitiveTypeSpecifier { .. } | NodeKind::StorageClassSpecifier { .. } => (),
            NodeKind::StructOrUnionSpecifier { tag, members, .. } => {
                if let Some(tag) = tag {
                    res.push(ChildGroup::Plain(*tag));
                }
                if let Some(members) = members {
                    res.push(ChildGroup::List(members));
                }
            }
            NodeKind::StructDeclaration {
                specifiers,
                declarators,
            } => {
                res.push(ChildGroup::List(specifiers));
                res.push(ChildGroup::List(declarators));
            }
            NodeKind::StructDeclarator {
                declarator,
                bitfield,
            } => {
                res.push(ChildGroup::Plain(*declarator));
                if let Some(bitfield) = bitfield {
                    res.push(ChildGroup::Plain(*bitfield));
                }
            }
            NodeKind::EnumSpecifier { tag, enumerators } => {
                if let Some(tag) = tag {
                    res.push(ChildGroup::Plain(*tag));
                }
                if let Some(enumerators) = enumerators {
                    res.push(ChildGroup::List(enumerators));
                }
            }
            NodeKind::Enumerator { id, value } => {
                res.push(ChildGroup::Plain(*id));
                if let Some(value) = value {
                    res.push(ChildGroup::Plain(*value));
                }
            }

            NodeKind::CompoundStatement { items } => res.push(ChildGroup::List(items)),
            NodeKind::IfStatement {
                condition,
                then_branch,
                elifs,
                else_branch,
            } => {
                res.push(ChildGroup::Cond(condition));
                res.push(ChildGroup::Cond(then_branch));
                res.push(ChildGroup::List(elifs));
                if let Some(else_branch) = else_branch {
                    res.push(ChildGroup::Cond(else_branch));
                }
            }
            NodeKind::ElifStatement {
                condition,
                then_branch,
            } => {
                res.push(ChildGroup::Cond(condition));
                res.push(ChildGroup::Cond(then_branch));
            }
            NodeKind::SwitchStatement { expr, body } => {
                res.push(ChildGroup::Cond(expr));
                res.push(ChildGroup::Cond(body));
            }
            NodeKind::CaseStatement { expr, body } => {
                res.push(ChildGroup::Plain(*expr));
                if let Some(body) = body {
                    res.push(ChildGroup::Cond(body));
                }
            }
            NodeKind::DefaultStatement { body } => {
                if let Some(body) = body {
                    res.push(ChildGroup::Cond(body));
                }
            }
            NodeKind::WhileStatement { condition, body }
            | NodeKind::DoStatement { condition, body } => {
                res.push(ChildGroup::Cond(condition));
                res.push(ChildGroup::Cond(body));
            }
            NodeKind::ForStatement {
                init,
                condition,
                increment,
                body,
            } => {
                if let Some(init) = init {
                    res.push(ChildGroup::Cond(init));
                }
                if let Some(condition) = condition {
                    res.push(ChildGroup::Cond(condition));
                }
                if let Some(increment) = increment {
                    res.push(ChildGroup::Cond(increment));
                }
                res.push(ChildGroup::Cond(body));
            }
            NodeKind::BreakStatement | NodeKind::ContinueStatement => (),
            NodeKind::ReturnStatement { expr } => {
                if let Some(expr) = expr {
                    res.push(ChildGroup::Plain(*expr))
                }
            }
            NodeKind::GotoStatement { target } => res.push(ChildGroup::Plain(*target)),
            NodeKind::LabelStatement { id } => res.push(ChildGroup::Plain(*id)),
            NodeKind::ExprStatement { expr } => res.push(ChildGroup::Plain(*expr)),
            NodeKind::FunctionDef {
                specifiers,
                declarator,
                old_style_parameters,
                body,
            } => {
                res.push(ChildGroup::List(specifiers));
                res.push(ChildGroup::Plain(*declarator));
                res.push(ChildGroup::List(old_style_parameters));
                res.push(ChildGroup::Plain(*body));
            }

            NodeKind::Id { .. }
            | NodeKind::Constant { .. }
            | NodeKind::StringLit { .. }
            | NodeKind::SimplePostfixSuffix { .. } => (),
            NodeKind::PostfixExpr { expr, suffix } => {
                res.push(ChildGroup::Plain(*expr));
                res.push(ChildGroup::Plain(*suffix));
            }
            NodeKind::PointerPostfixSuffix { id, .. } => res.push(ChildGroup::Plain(*id)),
            NodeKind::FunctionCall { args } => res.push(ChildGroup::List(args)),
            NodeKind::AssignExpr { target, source, .. } => {
                res.push(ChildGroup::Plain(*target));
                res.push(ChildGroup::Plain(*source));
            }
            NodeKind::UnaryOpExpr { expr, .. } => res.push(ChildGroup::Plain(*expr)),
            NodeKind::NAryExpr { expr, others } => {
                res.push(ChildGroup::Plain(*expr));
                res.push(ChildGroup::List(others));
            }
            NodeKind::NArySubExpr { expr, .. } => res.push(ChildGroup::Plain(*expr)),
            NodeKind::CastExpr { type_name, expr } => {
                res.push(ChildGroup::Plain(*type_name));
                res.push(ChildGroup::Plain(*expr));
            }
            NodeKind::ConditionalExpr {
                condition,
                then_expr,
                else_expr,
            } => {
                res.push(ChildGroup::Plain(*condition));
                if let Some(then_expr) = then_expr {
                    res.push(ChildGroup::Cond(then_expr));
                }
                res.push(ChildGroup::Plain(*else_expr));
            }
            NodeKind::PointerDerefExpr { expr } => res.push(ChildGroup::Plain(*expr)),
            NodeKind::SizeOfExprT { type_name } => res.push(ChildGroup::Plain(*type_name)),
            NodeKind::SizeOfExprU { expr } => res.push(ChildGroup::Plain(*expr)),
            NodeKind::BuiltinOffsetof {
                type_name,
                designators,
            } => {
                res.push(ChildGroup::Plain(*type_name));
                res.push(ChildGroup::List(designators));
            }
            NodeKind::OffsetofMemberDesignatorID { id } => res.push(ChildGroup::Plain(*id)),
            NodeKind::CompoundStatementExpr { compound } => res.push(ChildGroup::Plain(*compound)),
        }
        res
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::WhileStatement { .. }
                | NodeKind::DoStatement { .. }
                | NodeKind::ForStatement { .. }
        )
    }
}
