/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

/// Reports a violated structural precondition (for example a `break` outside any loop).
/// The analyses are best effort: debug builds assert, release builds log a warning and
/// the caller continues with an empty result
macro_rules! structural_violation {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
        debug_assert!(false, $($arg)*);
    }};
}

macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}
