/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! The name environment.
//!
//! Bindings are conditional: a single name may be bound to different declarators
//! under disjoint presence conditions. The binding value is the AST node that
//! introduced the name (init declarator, named declarator, function definition,
//! enumerator, typedef declaration or field identifier); consumers read the kind
//! off the node. `One(None)` marks configurations in which the name is not bound

use rustc_hash::FxHashMap;

use crate::fexpr::{self, FeatureId};
use crate::ir::ast::Conditional;
use crate::ir::NodeId;
use crate::symbol::Symbol;

pub type ConditionalBinding = Conditional<Option<NodeId>>;

/// Merges a new binding into a name map. An unconditional declaration shadows
/// whatever was visible; a conditional one keeps the previous binding as the
/// alternative arm
fn declare_in(
    map: &mut FxHashMap<Symbol, ConditionalBinding>,
    name: Symbol,
    condition: FeatureId,
    binding: NodeId,
) {
    let fresh = Conditional::one(Some(binding));
    if condition == fexpr::always() {
        map.insert(name, fresh);
        return;
    }
    let previous = map
        .remove(&name)
        .unwrap_or_else(|| Conditional::one(None));
    map.insert(name, Conditional::choice(condition, fresh, previous));
}

#[derive(Default)]
struct Frame {
    vars: FxHashMap<Symbol, ConditionalBinding>,
    typedefs: FxHashMap<Symbol, ConditionalBinding>,
}

#[derive(Default)]
pub struct StructEntry {
    /// the defining occurrence of the tag
    pub tag_id: Option<NodeId>,
    fields: FxHashMap<Symbol, ConditionalBinding>,
}

/// Scope stack plus the tag and label namespaces.
///
/// Ordinary identifiers and typedef names are scoped; struct/union tags index
/// their own field environments; labels live in a per-function namespace
pub struct ScopeStack {
    frames: Vec<Frame>,
    structs: FxHashMap<(Symbol, bool), StructEntry>,
    enum_tags: FxHashMap<Symbol, NodeId>,
    labels: FxHashMap<Symbol, ConditionalBinding>,
    /// declarator id -> struct/union tag its declaration specifier named
    declared_tags: FxHashMap<NodeId, (Symbol, bool)>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            structs: FxHashMap::default(),
            enum_tags: FxHashMap::default(),
            labels: FxHashMap::default(),
            declared_tags: FxHashMap::default(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default())
    }

    pub fn exit_scope(&mut self) {
        debug_assert!(self.frames.len() > 1, "cannot exit the global scope");
        self.frames.pop();
    }

    /// Labels are function scoped; entering a function resets the namespace
    pub fn enter_function(&mut self) {
        self.labels.clear()
    }

    pub fn declare_var(&mut self, name: Symbol, condition: FeatureId, binding: NodeId) {
        let frame = self.frames.last_mut().unwrap();
        declare_in(&mut frame.vars, name, condition, binding)
    }

    pub fn lookup_var(&self, name: Symbol) -> Option<&ConditionalBinding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.vars.get(&name))
    }

    pub fn declare_typedef(&mut self, name: Symbol, condition: FeatureId, binding: NodeId) {
        let frame = self.frames.last_mut().unwrap();
        declare_in(&mut frame.typedefs, name, condition, binding)
    }

    pub fn lookup_typedef(&self, name: Symbol) -> Option<&ConditionalBinding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.typedefs.get(&name))
    }

    /// Makes the tag known; the first definition wins as the tag's identity
    pub fn declare_struct(&mut self, tag: Symbol, is_union: bool, tag_id: Option<NodeId>) {
        let entry = self.structs.entry((tag, is_union)).or_default();
        if entry.tag_id.is_none() {
            entry.tag_id = tag_id;
        }
    }

    pub fn has_struct(&self, tag: Symbol, is_union: bool) -> bool {
        self.structs.contains_key(&(tag, is_union))
    }

    pub fn struct_tag_id(&self, tag: Symbol, is_union: bool) -> Option<NodeId> {
        self.structs.get(&(tag, is_union))?.tag_id
    }

    pub fn declare_field(
        &mut self,
        tag: Symbol,
        is_union: bool,
        name: Symbol,
        condition: FeatureId,
        binding: NodeId,
    ) {
        let entry = self.structs.entry((tag, is_union)).or_default();
        declare_in(&mut entry.fields, name, condition, binding)
    }

    pub fn lookup_field(
        &self,
        tag: Symbol,
        is_union: bool,
        name: Symbol,
    ) -> Option<&ConditionalBinding> {
        self.structs.get(&(tag, is_union))?.fields.get(&name)
    }

    pub fn declare_enum_tag(&mut self, tag: Symbol, tag_id: NodeId) {
        self.enum_tags.entry(tag).or_insert(tag_id);
    }

    pub fn lookup_enum_tag(&self, tag: Symbol) -> Option<NodeId> {
        self.enum_tags.get(&tag).copied()
    }

    pub fn declare_label(&mut self, name: Symbol, condition: FeatureId, binding: NodeId) {
        declare_in(&mut self.labels, name, condition, binding)
    }

    pub fn lookup_label(&self, name: Symbol) -> Option<&ConditionalBinding> {
        self.labels.get(&name)
    }

    /// Remembers that `declarator` was declared with type `struct tag`/`union tag`
    pub fn record_declared_tag(&mut self, declarator: NodeId, tag: Symbol, is_union: bool) {
        self.declared_tags.insert(declarator, (tag, is_union));
    }

    pub fn declared_tag(&self, declarator: NodeId) -> Option<(Symbol, bool)> {
        self.declared_tags.get(&declarator).copied()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fexpr::Features;

    #[test]
    fn conditional_shadowing() {
        let mut feats = Features::new();
        let config = feats.named_atom("CONFIG_X");
        let mut scopes = ScopeStack::new();
        let name = Symbol::intern("x");

        scopes.declare_var(name, config, NodeId::from_usize(1));
        match scopes.lookup_var(name).unwrap() {
            Conditional::Choice(condition, then, other) => {
                assert_eq!(*condition, config);
                assert_eq!(**then, Conditional::one(Some(NodeId::from_usize(1))));
                assert_eq!(**other, Conditional::one(None));
            }
            other => panic!("expected a choice, found {:?}", other),
        }

        // unconditional redeclaration shadows both arms
        scopes.declare_var(name, fexpr::always(), NodeId::from_usize(2));
        assert_eq!(
            scopes.lookup_var(name),
            Some(&Conditional::one(Some(NodeId::from_usize(2))))
        );

        // inner scopes shadow and restore
        scopes.enter_scope();
        scopes.declare_var(name, fexpr::always(), NodeId::from_usize(3));
        assert_eq!(
            scopes.lookup_var(name),
            Some(&Conditional::one(Some(NodeId::from_usize(3))))
        );
        scopes.exit_scope();
        assert_eq!(
            scopes.lookup_var(name),
            Some(&Conditional::one(Some(NodeId::from_usize(2))))
        );
    }
}
