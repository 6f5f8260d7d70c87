/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Variability aware static analysis core for C translation units.
//!
//! A single AST annotated with presence conditions represents every
//! configuration reachable by `#ifdef` selection at once. On top of that AST
//! this crate computes
//!
//! * the conditional control flow graph: [`ControlFlow::succ`] and
//!   [`ControlFlow::pred`] per AST node, honoring C control flow combined with
//!   presence condition logic across `#ifdef` alternatives, and
//! * def-use chains: [`DefUseBuilder`] associates every defining identifier
//!   with the identifiers that refer to it through a scope stack of
//!   conditional bindings.
//!
//! Parsing, preprocessing and type checking are external collaborators; they
//! feed the [`ir::Ast`] arena through [`ir::AstBuilder`] and provide presence
//! conditions through [`fexpr::Features`].
//!
//! ```
//! use vacfa::{AstBuilder, AstEnv, ControlFlow, Features};
//!
//! let mut build = AstBuilder::new();
//! let cond = build.id("c");
//! let ret = build.return_stmt(None);
//! let body_block = build.block(&[ret]);
//! let while_stmt = build.while_stmt(cond, body_block);
//! let fn_body = build.block(&[while_stmt]);
//! let (function, _) = build.function_def("run", fn_body);
//! let ast = build.finish();
//!
//! let mut feats = Features::new();
//! let env = AstEnv::build(&ast, function, &mut feats);
//! let mut cfg = ControlFlow::new(&ast, &env, &mut feats);
//! assert_eq!(cfg.succ(ret), vec![function]);
//! ```

#[macro_use]
mod util;

pub mod analysis;
pub mod fexpr;
pub mod ir;
pub mod symbol;
pub mod symbol_table;

pub use analysis::{CfgDiagnostic, ControlFlow, DefUseBuilder, DefUseChain};
pub use fexpr::{FeatureId, Features};
pub use ir::{Ast, AstBuilder, AstEnv, NodeId};
pub use symbol::Symbol;
