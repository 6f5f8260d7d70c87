/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! The two analyses of this crate: the variability aware control flow graph and
//! def-use chains. Both borrow the AST and its environment read only and own
//! their result maps for the lifetime of one analysis session

pub use control_flow::{CfgDiagnostic, ControlFlow};
pub use def_use::{DefUseBuilder, DefUseChain};

pub mod control_flow;
pub mod def_use;
