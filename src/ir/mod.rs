/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! The variability aware C AST consumed by the analyses.
//!
//! All nodes live in one preallocated arena ([`ast::Ast`]); a [`NodeId`] is the
//! stable identity every analysis map is keyed on. Two syntactically equal nodes
//! always have distinct ids, so identity never collapses distinct occurrences

#[doc(no_inline)]
pub use ast::{Ast, Conditional, NodeKind, Opt};
#[doc(no_inline)]
pub use build::AstBuilder;
#[doc(no_inline)]
pub use env::AstEnv;

pub mod ast;
pub mod build;
pub mod env;

index_vec::define_index_type! {
    /// Identity of an AST node inside its [`Ast`](ast::Ast) arena
    pub struct NodeId = u32;
    DEBUG_FORMAT = "n{}";
}

/// Allows adding elements to arenas
pub trait Push<T> {
    type Key;
    fn push(&mut self, value: T) -> Self::Key;
}
