/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Def-use chains.
//!
//! One traversal per translation unit associates every defining identifier
//! occurrence with the identifiers that refer to it. The builder maintains the
//! scope stack while walking; bindings are conditional, and a lookup that
//! resolves to several configuration arms records one use edge per arm. The
//! resulting map is variability agnostic: it carries identities, not presence
//! conditions.
//!
//! An identifier that does not resolve is registered as a self definition (a
//! synthetic root), never an error

use std::hash::BuildHasherDefault;

use indexmap::IndexMap;
use log::debug;
use rustc_hash::FxHasher;

use crate::ir::ast::{Ast, Conditional, NodeKind, Opt};
use crate::ir::{AstEnv, NodeId};
use crate::symbol::Symbol;
use crate::symbol_table::ScopeStack;

#[cfg(test)]
mod test;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Identity keyed map from defining identifiers to their uses.
///
/// Keys appear exactly once, in first-definition order; value lists preserve
/// the order in which the uses were encountered and may contain duplicates
#[derive(Default, Debug)]
pub struct DefUseChain {
    map: FxIndexMap<NodeId, Vec<NodeId>>,
}

impl DefUseChain {
    /// Registers `key` as a definition without any use yet
    pub fn ensure_def(&mut self, key: NodeId) {
        self.map.entry(key).or_default();
    }

    /// Appends `target` to the uses of `key`.
    ///
    /// When `key` is not registered but already appears as a use of other
    /// definitions, the target is appended to those lists instead (the repair
    /// path for late registered chains)
    pub fn add_to_def_use_map(&mut self, key: NodeId, target: NodeId) {
        if let Some(uses) = self.map.get_mut(&key) {
            uses.push(target);
            return;
        }
        let hosts: Vec<NodeId> = self
            .map
            .iter()
            .filter(|(_, uses)| uses.contains(&key))
            .map(|(&def, _)| def)
            .collect();
        if hosts.is_empty() {
            self.map.insert(key, vec![target]);
        } else {
            debug!("use {:?} reached through orphaned key {:?}", target, key);
            for host in hosts {
                self.map.get_mut(&host).unwrap().push(target);
            }
        }
    }

    pub fn is_def(&self, node: NodeId) -> bool {
        self.map.contains_key(&node)
    }

    pub fn uses_of(&self, def: NodeId) -> Option<&[NodeId]> {
        self.map.get(&def).map(Vec::as_slice)
    }

    /// The definitions whose use lists contain `node`
    pub fn defs_of_use(&self, node: NodeId) -> Vec<NodeId> {
        self.map
            .iter()
            .filter(|(_, uses)| uses.contains(&node))
            .map(|(&def, _)| def)
            .collect()
    }

    pub fn defs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.map.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[NodeId])> + '_ {
        self.map.iter().map(|(&def, uses)| (def, uses.as_slice()))
    }

    pub fn def_count(&self) -> usize {
        self.map.len()
    }
}

/// Summary of one declaration's specifier list
#[derive(Default, Clone, Copy)]
struct SpecifierInfo {
    typedef_storage: bool,
    declared_tag: Option<(Symbol, bool)>,
}

pub struct DefUseBuilder<'lt> {
    ast: &'lt Ast,
    env: &'lt AstEnv,
    scopes: ScopeStack,
    chain: DefUseChain,
    /// goto targets resolve against the complete label namespace at function end
    pending_gotos: Vec<(Symbol, NodeId)>,
}

impl<'lt> DefUseBuilder<'lt> {
    pub fn new(ast: &'lt Ast, env: &'lt AstEnv) -> Self {
        Self {
            ast,
            env,
            scopes: ScopeStack::new(),
            chain: DefUseChain::default(),
            pending_gotos: Vec::new(),
        }
    }

    pub fn run(mut self, root: NodeId) -> DefUseChain {
        let ast = self.ast;
        match &ast[root] {
            NodeKind::TranslationUnit { items } => {
                for item in items {
                    self.walk_external(item.value)
                }
            }
            _ => self.walk_external(root),
        }
        self.chain
    }

    fn walk_external(&mut self, node: NodeId) {
        let ast = self.ast;
        match &ast[node] {
            NodeKind::FunctionDef { .. } => self.add_def(node),
            NodeKind::Declaration { .. } | NodeKind::DeclarationStatement { .. } => {
                self.add_decl(node)
            }
            kind => debug!(
                "skipping unrecognized external declaration {:?} ({})",
                node,
                kind.variant_name()
            ),
        }
    }

    // ------------------------------------------------------------------
    // definitions

    /// Records a defining occurrence. The accepted shapes and their key
    /// selection mirror the environment's binding shapes
    pub fn add_def(&mut self, node: NodeId) {
        let ast = self.ast;
        match &ast[node] {
            NodeKind::FunctionDef { .. } => self.add_function_def(node),

            NodeKind::InitDeclarator { declarator, .. } => {
                if let Some(id) = self.declarator_id(*declarator) {
                    self.chain.ensure_def(id);
                    if let Some(name) = ast.name(id) {
                        let presence = self.env.presence(node);
                        self.scopes.declare_var(name, presence, node);
                    }
                }
            }

            NodeKind::AtomicNamedDeclarator { id, .. } => {
                let id = *id;
                self.chain.ensure_def(id);
                if let Some(name) = ast.name(id) {
                    let presence = self.env.presence(node);
                    self.scopes.declare_var(name, presence, node);
                }
            }

            NodeKind::Id { name } => {
                // a bare identifier keys itself unless it resolves to an
                // existing declarator
                self.record_use(node, *name)
            }

            NodeKind::StructDeclaration { .. } => self.add_struct_declaration(node, None, false),

            kind => debug!(
                "add_def: unrecognized shape {:?} ({})",
                node,
                kind.variant_name()
            ),
        }
    }

    fn add_function_def(&mut self, node: NodeId) {
        let ast = self.ast;
        let (declarator, body) = match &ast[node] {
            NodeKind::FunctionDef {
                declarator, body, ..
            } => (*declarator, *body),
            _ => return,
        };
        let id = match self.declarator_id(declarator) {
            Some(id) => id,
            None => {
                debug!("function definition {:?} without a named declarator", node);
                return;
            }
        };
        let name = match ast.name(id) {
            Some(name) => name,
            None => return,
        };
        let presence = self.env.presence(node);

        match self.scopes.lookup_var(name).cloned() {
            None => {
                self.chain.ensure_def(id);
                self.scopes.declare_var(name, presence, node);
            }
            Some(binding) => {
                // a prior declaration owns the chain; the definition's
                // identifier becomes its first use. Every configuration arm
                // keys separately
                let mut keyed = false;
                let mut arms = Vec::new();
                binding.for_each(&mut |arm| arms.push(*arm));
                for arm in arms {
                    match arm {
                        Some(prior) => {
                            if let Some(key) = self.binding_key(prior, name) {
                                self.chain.add_to_def_use_map(key, id);
                                keyed = true;
                            }
                        }
                        None => {
                            // unbound in this configuration: the definition
                            // itself is the key there
                            self.chain.ensure_def(id);
                            self.scopes.declare_var(name, presence, node);
                            keyed = true;
                        }
                    }
                }
                if !keyed {
                    self.chain.ensure_def(id);
                    self.scopes.declare_var(name, presence, node);
                }
            }
        }

        // parameters live in the function scope together with the body
        self.scopes.enter_function();
        self.scopes.enter_scope();
        self.add_declarator_extensions(declarator, true);
        if let NodeKind::FunctionDef {
            old_style_parameters,
            ..
        } = &ast[node]
        {
            for declaration in old_style_parameters {
                self.add_decl(declaration.value)
            }
        }
        self.walk_stmt(body);
        self.resolve_gotos();
        self.scopes.exit_scope();
    }

    /// Walks a declarator's extensions. Inside a function definition the
    /// parameters are registered as definitions; in a prototype only their
    /// type uses matter
    fn add_declarator_extensions(&mut self, declarator: NodeId, defining: bool) {
        let ast = self.ast;
        let (pointers, extensions) = match &ast[declarator] {
            NodeKind::AtomicNamedDeclarator {
                pointers,
                extensions,
                ..
            } => (pointers, extensions),
            NodeKind::NestedNamedDeclarator {
                pointers,
                nested,
                extensions,
            } => {
                self.add_declarator_extensions(*nested, defining);
                (pointers, extensions)
            }
            _ => return,
        };

        for pointer in pointers {
            if let NodeKind::Pointer { specifiers } = &ast[pointer.value] {
                self.walk_specifiers(specifiers);
            }
        }
        for extension in extensions {
            match &ast[extension.value] {
                NodeKind::DeclArrayAccess { size: Some(size) } => self.add_use(*size),
                NodeKind::DeclArrayAccess { size: None } => (),
                NodeKind::DeclParameterDeclList { declarations } => {
                    for declaration in declarations {
                        self.add_parameter_declaration(declaration.value, defining)
                    }
                }
                kind => debug!(
                    "unrecognized declarator extension {:?} ({})",
                    extension.value,
                    kind.variant_name()
                ),
            }
        }
    }

    fn add_parameter_declaration(&mut self, node: NodeId, defining: bool) {
        let ast = self.ast;
        match &ast[node] {
            NodeKind::ParameterDeclarationD {
                specifiers,
                declarator,
            } => {
                let info = self.walk_specifiers(specifiers);
                if defining {
                    if let Some(id) = self.declarator_id(*declarator) {
                        if let Some(name) = ast.name(id) {
                            let presence = self.env.presence(node);
                            self.chain.ensure_def(id);
                            let declarator = *declarator;
                            self.scopes.declare_var(name, presence, declarator);
                            if let Some((tag, is_union)) = info.declared_tag {
                                self.scopes.record_declared_tag(id, tag, is_union);
                            }
                        }
                    }
                }
                self.add_declarator_extensions(*declarator, false);
            }
            NodeKind::ParameterDeclarationAD {
                specifiers,
                abstract_declarator,
            } => {
                self.walk_specifiers(specifiers);
                self.add_declarator_extensions(*abstract_declarator, false);
            }
            NodeKind::PlainParameterDeclaration { specifiers } => {
                self.walk_specifiers(specifiers);
            }
            kind => debug!(
                "unrecognized parameter declaration {:?} ({})",
                node,
                kind.variant_name()
            ),
        }
    }

    /// Recursive dispatch over declaration syntax; delegates to the def/use
    /// operations at the leaf identifiers
    pub fn add_decl(&mut self, node: NodeId) {
        let ast = self.ast;
        match &ast[node] {
            NodeKind::DeclarationStatement { declaration } => self.add_decl(*declaration),

            NodeKind::Declaration {
                specifiers,
                init_declarators,
            } => {
                let info = self.walk_specifiers(specifiers);
                for init_declarator in init_declarators {
                    self.add_init_declarator(init_declarator.value, info)
                }
            }

            NodeKind::StructDeclaration { .. } => self.add_struct_declaration(node, None, false),

            kind => debug!(
                "add_decl: unrecognized shape {:?} ({})",
                node,
                kind.variant_name()
            ),
        }
    }

    fn add_init_declarator(&mut self, node: NodeId, info: SpecifierInfo) {
        let ast = self.ast;
        let (declarator, initializer) = match &ast[node] {
            NodeKind::InitDeclarator {
                declarator,
                initializer,
            } => (*declarator, *initializer),
            kind => {
                debug!(
                    "unrecognized init declarator {:?} ({})",
                    node,
                    kind.variant_name()
                );
                return;
            }
        };

        if let Some(id) = self.declarator_id(declarator) {
            if let Some(name) = ast.name(id) {
                let presence = self.env.presence(node);
                self.chain.ensure_def(id);
                if info.typedef_storage {
                    // the whole declaration is the typedef binding
                    let declaration = self.env.parent(node).unwrap_or(node);
                    self.scopes.declare_typedef(name, presence, declaration);
                } else {
                    self.scopes.declare_var(name, presence, node);
                    if let Some((tag, is_union)) = info.declared_tag {
                        self.scopes.record_declared_tag(id, tag, is_union);
                    }
                }
            }
        }
        self.add_declarator_extensions(declarator, false);
        if let Some(initializer) = initializer {
            self.add_use(initializer)
        }
    }

    fn add_struct_declaration(&mut self, node: NodeId, tag: Option<Symbol>, is_union: bool) {
        let ast = self.ast;
        let (specifiers, declarators) = match &ast[node] {
            NodeKind::StructDeclaration {
                specifiers,
                declarators,
            } => (specifiers, declarators),
            _ => return,
        };
        self.walk_specifiers(specifiers);
        for declarator in declarators {
            match &ast[declarator.value] {
                NodeKind::StructDeclarator {
                    declarator: inner,
                    bitfield,
                } => {
                    if let Some(id) = self.declarator_id(*inner) {
                        self.chain.ensure_def(id);
                        if let (Some(tag), Some(name)) = (tag, ast.name(id)) {
                            let presence = self.env.presence(declarator.value);
                            self.scopes.declare_field(tag, is_union, name, presence, id);
                        }
                    }
                    if let Some(bitfield) = bitfield {
                        self.add_use(*bitfield)
                    }
                }
                kind => debug!(
                    "unrecognized struct declarator {:?} ({})",
                    declarator.value,
                    kind.variant_name()
                ),
            }
        }
    }

    /// Walks a specifier list: typedef references become type uses, tagged
    /// struct/union/enum specifiers register their members and report the tag
    fn walk_specifiers(&mut self, specifiers: &[Opt<NodeId>]) -> SpecifierInfo {
        let ast = self.ast;
        let mut info = SpecifierInfo::default();
        for specifier in specifiers {
            let specifier = specifier.value;
            match &ast[specifier] {
                NodeKind::StorageClassSpecifier { keyword } => {
                    if keyword.as_str() == "typedef" {
                        info.typedef_storage = true;
                    }
                }
                NodeKind::PrimitiveTypeSpecifier { .. } => (),
                NodeKind::TypeDefTypeSpecifier { name } => self.add_type_use(*name),
                NodeKind::StructOrUnionSpecifier { .. } => {
                    if let Some(tag) = self.add_struct_specifier(specifier) {
                        info.declared_tag = Some(tag);
                    }
                }
                NodeKind::EnumSpecifier { .. } => self.add_enum_specifier(specifier),
                kind => debug!(
                    "unrecognized specifier {:?} ({})",
                    specifier,
                    kind.variant_name()
                ),
            }
        }
        info
    }

    fn add_struct_specifier(&mut self, node: NodeId) -> Option<(Symbol, bool)> {
        let ast = self.ast;
        let (is_union, tag, members) = match &ast[node] {
            NodeKind::StructOrUnionSpecifier {
                is_union,
                tag,
                members,
            } => (*is_union, *tag, members),
            _ => return None,
        };
        let tag_name = tag.and_then(|tag| ast.name(tag));

        if let (Some(tag), Some(name)) = (tag, tag_name) {
            match self.scopes.struct_tag_id(name, is_union) {
                // a later occurrence of a known tag refers to its definition
                Some(def) if def != tag => self.chain.add_to_def_use_map(def, tag),
                Some(_) => (),
                None => {
                    self.chain.ensure_def(tag);
                    self.scopes.declare_struct(name, is_union, Some(tag));
                }
            }
        }

        if let Some(members) = members {
            if let Some(name) = tag_name {
                self.scopes.declare_struct(name, is_union, tag);
            }
            for member in members {
                self.add_struct_declaration(member.value, tag_name, is_union)
            }
        }
        tag_name.map(|name| (name, is_union))
    }

    fn add_enum_specifier(&mut self, node: NodeId) {
        let ast = self.ast;
        let (tag, enumerators) = match &ast[node] {
            NodeKind::EnumSpecifier { tag, enumerators } => (*tag, enumerators),
            _ => return,
        };

        if let Some(tag) = tag {
            if let Some(name) = ast.name(tag) {
                match self.scopes.lookup_enum_tag(name) {
                    Some(def) if def != tag => self.chain.add_to_def_use_map(def, tag),
                    Some(_) => (),
                    None => {
                        self.chain.ensure_def(tag);
                        self.scopes.declare_enum_tag(name, tag);
                    }
                }
            }
        }

        if let Some(enumerators) = enumerators {
            for enumerator in enumerators {
                let enumerator = enumerator.value;
                if let NodeKind::Enumerator { id, value } = &ast[enumerator] {
                    self.chain.ensure_def(*id);
                    if let Some(name) = ast.name(*id) {
                        let presence = self.env.presence(enumerator);
                        self.scopes.declare_var(name, presence, enumerator);
                    }
                    if let Some(value) = value {
                        self.add_use(*value)
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // uses

    /// Walks an expression shaped node and records a use edge for every
    /// identifier that resolves through the environment. Explicit work list:
    /// expressions nest deeply
    pub fn add_use(&mut self, node: NodeId) {
        let ast = self.ast;
        let mut work = vec![node];
        while let Some(node) = work.pop() {
            match &ast[node] {
                NodeKind::Id { name } => self.record_use(node, *name),

                // literals and bare postfix operators contribute no uses
                NodeKind::Constant { .. }
                | NodeKind::StringLit { .. }
                | NodeKind::SimplePostfixSuffix { .. }
                | NodeKind::SizeOfExprT { .. } => (),

                NodeKind::PostfixExpr { expr, suffix } => match &ast[*suffix] {
                    NodeKind::PointerPostfixSuffix { id, .. } => {
                        self.add_member_use(*expr, *id);
                        work.push(*expr);
                    }
                    NodeKind::FunctionCall { args } => {
                        for arg in args.iter().rev() {
                            work.push(arg.value)
                        }
                        work.push(*expr);
                    }
                    _ => work.push(*expr),
                },

                NodeKind::FunctionCall { args } => {
                    for arg in args.iter().rev() {
                        work.push(arg.value)
                    }
                }

                NodeKind::AssignExpr { target, source, .. } => {
                    work.push(*source);
                    work.push(*target);
                }

                NodeKind::UnaryOpExpr { expr, .. }
                | NodeKind::NArySubExpr { expr, .. }
                | NodeKind::PointerDerefExpr { expr }
                | NodeKind::SizeOfExprU { expr } => work.push(*expr),

                NodeKind::NAryExpr { expr, others } => {
                    for other in others.iter().rev() {
                        work.push(other.value)
                    }
                    work.push(*expr);
                }

                NodeKind::CastExpr { type_name, expr } => {
                    work.push(*expr);
                    self.add_type_name_uses(*type_name);
                }

                NodeKind::ConditionalExpr {
                    condition,
                    then_expr,
                    else_expr,
                } => {
                    work.push(*else_expr);
                    if let Some(then_expr) = then_expr {
                        let mut leaves = then_expr.leaves();
                        leaves.reverse();
                        work.extend(leaves);
                    }
                    work.push(*condition);
                }

                NodeKind::BuiltinOffsetof {
                    type_name,
                    designators,
                } => {
                    self.add_type_name_uses(*type_name);
                    let member_tag = self.type_name_tag(*type_name);
                    for designator in designators {
                        if let NodeKind::OffsetofMemberDesignatorID { id } = &ast[designator.value]
                        {
                            match member_tag {
                                Some((tag, is_union)) => self.add_struct_use(*id, tag, is_union),
                                None => self.self_def(*id),
                            }
                        }
                    }
                }

                NodeKind::CompoundStatementExpr { compound } => self.walk_stmt(*compound),

                kind => {
                    debug!(
                        "add_use: unrecognized shape {:?} ({}); walking children",
                        node,
                        kind.variant_name()
                    );
                    let mut children = Vec::new();
                    ast.for_each_child(node, &mut |child| children.push(child));
                    work.extend(children.into_iter().rev());
                }
            }
        }
    }

    /// Resolves an identifier in the ordinary namespace and records the use,
    /// one edge per configuration arm
    fn record_use(&mut self, node: NodeId, name: Symbol) {
        match self.scopes.lookup_var(name).cloned() {
            Some(binding) => {
                let mut arms = Vec::new();
                binding.for_each(&mut |arm| arms.push(*arm));
                let mut resolved = false;
                for arm in arms.into_iter().flatten() {
                    if let Some(key) = self.binding_key(arm, name) {
                        self.chain.add_to_def_use_map(key, node);
                        resolved = true;
                    }
                }
                if !resolved {
                    self.self_def(node);
                }
            }
            None => self.self_def(node),
        }
    }

    /// Same as [`record_use`](Self::record_use) but in the typedef namespace
    pub fn add_type_use(&mut self, node: NodeId) {
        let name = match self.ast.name(node) {
            Some(name) => name,
            None => return,
        };
        match self.scopes.lookup_typedef(name).cloned() {
            Some(binding) => {
                let mut arms = Vec::new();
                binding.for_each(&mut |arm| arms.push(*arm));
                let mut resolved = false;
                for arm in arms.into_iter().flatten() {
                    if let Some(key) = self.binding_key(arm, name) {
                        self.chain.add_to_def_use_map(key, node);
                        resolved = true;
                    }
                }
                if !resolved {
                    self.self_def(node);
                }
            }
            None => self.self_def(node),
        }
    }

    /// Resolves a member identifier in the field environment of
    /// `(tag, is_union)`, falling back to the typedef namespace while the
    /// struct is not yet known (forward reference to a typedef'd struct)
    pub fn add_struct_use(&mut self, node: NodeId, tag: Symbol, is_union: bool) {
        let name = match self.ast.name(node) {
            Some(name) => name,
            None => return,
        };
        if !self.scopes.has_struct(tag, is_union) {
            self.add_type_use(node);
            return;
        }
        match self.scopes.lookup_field(tag, is_union, name).cloned() {
            Some(binding) => {
                let mut arms = Vec::new();
                binding.for_each(&mut |arm| arms.push(*arm));
                let mut resolved = false;
                for arm in arms.into_iter().flatten() {
                    if let Some(key) = self.binding_key(arm, name) {
                        self.chain.add_to_def_use_map(key, node);
                        resolved = true;
                    }
                }
                if !resolved {
                    self.self_def(node);
                }
            }
            None => self.self_def(node),
        }
    }

    /// A member access `base.id` / `base->id`: the struct tag comes from the
    /// declaration of the base variable when it is trackable
    fn add_member_use(&mut self, base: NodeId, member: NodeId) {
        match self.base_tag(base) {
            Some((tag, is_union)) => self.add_struct_use(member, tag, is_union),
            None => self.self_def(member),
        }
    }

    fn base_tag(&self, base: NodeId) -> Option<(Symbol, bool)> {
        let ast = self.ast;
        match &ast[base] {
            NodeKind::Id { name } => {
                let binding = self.scopes.lookup_var(*name)?;
                let mut res = None;
                binding.for_each(&mut |arm| {
                    if res.is_none() {
                        if let Some(binding) = arm {
                            if let Some(key) = self.binding_key_ref(*binding, *name) {
                                res = self.scopes.declared_tag(key);
                            }
                        }
                    }
                });
                res
            }
            NodeKind::PointerDerefExpr { expr } | NodeKind::UnaryOpExpr { expr, .. } => {
                self.base_tag(*expr)
            }
            _ => None,
        }
    }

    fn add_type_name_uses(&mut self, type_name: NodeId) {
        let ast = self.ast;
        if let NodeKind::TypeName { specifiers, .. } = &ast[type_name] {
            self.walk_specifiers(specifiers);
        }
    }

    fn type_name_tag(&self, type_name: NodeId) -> Option<(Symbol, bool)> {
        let ast = self.ast;
        if let NodeKind::TypeName { specifiers, .. } = &ast[type_name] {
            for specifier in specifiers {
                if let NodeKind::StructOrUnionSpecifier { is_union, tag, .. } =
                    &ast[specifier.value]
                {
                    let name = (*tag)?;
                    return ast.name(name).map(|name| (name, *is_union));
                }
            }
        }
        None
    }

    /// The unresolved-name recovery path: the identifier becomes its own key
    /// and a synthetic root for later uses of the same name
    fn self_def(&mut self, node: NodeId) {
        self.chain.ensure_def(node);
        if let Some(name) = self.ast.name(node) {
            let presence = self.env.presence(node);
            self.scopes.declare_var(name, presence, node);
        }
    }

    // ------------------------------------------------------------------
    // statements

    fn walk_stmt(&mut self, node: NodeId) {
        let ast = self.ast;
        match &ast[node] {
            NodeKind::CompoundStatement { items } => {
                self.scopes.enter_scope();
                for item in items {
                    self.walk_stmt(item.value)
                }
                self.scopes.exit_scope();
            }

            NodeKind::DeclarationStatement { .. } | NodeKind::Declaration { .. } => {
                self.add_decl(node)
            }

            NodeKind::ExprStatement { expr } => self.add_use(*expr),

            NodeKind::IfStatement {
                condition,
                then_branch,
                elifs,
                else_branch,
            } => {
                let mut exprs = Vec::new();
                condition.for_each(&mut |&expr| exprs.push(expr));
                for expr in exprs {
                    self.add_use(expr)
                }
                self.walk_branch(then_branch);
                for elif in elifs {
                    self.walk_stmt(elif.value)
                }
                if let Some(else_branch) = else_branch {
                    self.walk_branch(else_branch);
                }
            }

            NodeKind::ElifStatement {
                condition,
                then_branch,
            } => {
                let mut exprs = Vec::new();
                condition.for_each(&mut |&expr| exprs.push(expr));
                for expr in exprs {
                    self.add_use(expr)
                }
                self.walk_branch(then_branch);
            }

            NodeKind::SwitchStatement { expr, body } => {
                let mut exprs = Vec::new();
                expr.for_each(&mut |&expr| exprs.push(expr));
                for expr in exprs {
                    self.add_use(expr)
                }
                self.walk_branch(body);
            }

            NodeKind::CaseStatement { expr, body } => {
                self.add_use(*expr);
                if let Some(body) = body {
                    self.walk_branch(body);
                }
            }

            NodeKind::DefaultStatement { body } => {
                if let Some(body) = body {
                    self.walk_branch(body);
                }
            }

            NodeKind::WhileStatement { condition, body }
            | NodeKind::DoStatement { condition, body } => {
                let mut exprs = Vec::new();
                condition.for_each(&mut |&expr| exprs.push(expr));
                for expr in exprs {
                    self.add_use(expr)
                }
                self.walk_branch(body);
            }

            NodeKind::ForStatement {
                init,
                condition,
                increment,
                body,
            } => {
                // a C99 for introduces its own declaration scope
                self.scopes.enter_scope();
                for clause in [init, condition, increment]
                    .iter()
                    .filter_map(|clause| clause.as_ref())
                {
                    let mut exprs = Vec::new();
                    clause.for_each(&mut |&expr| exprs.push(expr));
                    for expr in exprs {
                        match &ast[expr] {
                            NodeKind::Declaration { .. } | NodeKind::DeclarationStatement { .. } => {
                                self.add_decl(expr)
                            }
                            _ => self.add_use(expr),
                        }
                    }
                }
                self.walk_branch(body);
                self.scopes.exit_scope();
            }

            NodeKind::ReturnStatement { expr } => {
                if let Some(expr) = expr {
                    self.add_use(*expr)
                }
            }

            NodeKind::GotoStatement { target } => match ast.name(*target) {
                Some(name) => self.pending_gotos.push((name, *target)),
                // computed goto: the target is an ordinary expression
                None => self.add_use(*target),
            },

            NodeKind::LabelStatement { id } => {
                self.chain.ensure_def(*id);
                if let Some(name) = ast.name(*id) {
                    let presence = self.env.presence(node);
                    self.scopes.declare_label(name, presence, *id);
                }
            }

            NodeKind::BreakStatement | NodeKind::ContinueStatement => (),

            // nested function definitions open their own chain entries
            NodeKind::FunctionDef { .. } => self.add_def(node),

            kind => debug!(
                "walk_stmt: unrecognized shape {:?} ({})",
                node,
                kind.variant_name()
            ),
        }
    }

    fn walk_branch(&mut self, branch: &Conditional<NodeId>) {
        let mut stmts = Vec::new();
        branch.for_each(&mut |&stmt| stmts.push(stmt));
        for stmt in stmts {
            self.walk_stmt(stmt)
        }
    }

    /// Goto targets are uses of the label identifier; unresolved ones key
    /// themselves
    fn resolve_gotos(&mut self) {
        let pending = std::mem::take(&mut self.pending_gotos);
        for (name, node) in pending {
            match self.scopes.lookup_label(name).cloned() {
                Some(binding) => {
                    let mut arms = Vec::new();
                    binding.for_each(&mut |arm| arms.push(*arm));
                    let mut resolved = false;
                    for arm in arms.into_iter().flatten() {
                        self.chain.add_to_def_use_map(arm, node);
                        resolved = true;
                    }
                    if !resolved {
                        self.chain.ensure_def(node);
                    }
                }
                None => self.chain.ensure_def(node),
            }
        }
    }

    // ------------------------------------------------------------------
    // binding shapes

    /// The defining identifier inside a binding node. All binding shapes the
    /// environment can hold are accepted; for a whole declaration the matching
    /// declarator is selected by name
    fn binding_key(&self, binding: NodeId, name: Symbol) -> Option<NodeId> {
        self.binding_key_ref(binding, name)
    }

    fn binding_key_ref(&self, binding: NodeId, name: Symbol) -> Option<NodeId> {
        let ast = self.ast;
        match &ast[binding] {
            NodeKind::InitDeclarator { declarator, .. }
            | NodeKind::StructDeclarator { declarator, .. }
            | NodeKind::FunctionDef { declarator, .. } => self.declarator_id(*declarator),
            NodeKind::AtomicNamedDeclarator { id, .. } => Some(*id),
            NodeKind::NestedNamedDeclarator { nested, .. } => self.declarator_id(*nested),
            NodeKind::Enumerator { id, .. } => Some(*id),
            NodeKind::Id { .. } => Some(binding),
            NodeKind::Declaration {
                init_declarators, ..
            } => init_declarators.iter().find_map(|init_declarator| {
                let id = match &ast[init_declarator.value] {
                    NodeKind::InitDeclarator { declarator, .. } => self.declarator_id(*declarator),
                    _ => None,
                }?;
                if ast.name(id) == Some(name) {
                    Some(id)
                } else {
                    None
                }
            }),
            kind => {
                debug!(
                    "unrecognized binding shape {:?} ({})",
                    binding,
                    kind.variant_name()
                );
                None
            }
        }
    }

    fn declarator_id(&self, declarator: NodeId) -> Option<NodeId> {
        let ast = self.ast;
        match &ast[declarator] {
            NodeKind::AtomicNamedDeclarator { id, .. } => Some(*id),
            NodeKind::NestedNamedDeclarator { nested, .. } => self.declarator_id(*nested),
            NodeKind::Id { .. } => Some(declarator),
            _ => None,
        }
    }
}
