/*
 * ******************************************************************************************
 * Copyright (c) 2020 Pascal Kuthe. This file is part of the VACFA project.
 * It is subject to the license terms in the LICENSE file found in the top-level directory
 *  of this distribution and at  https://gitlab.com/DSPOM/VACFA/blob/master/LICENSE.
 *  No part of VACFA, including this file, may be copied, modified, propagated, or
 *  distributed except according to the terms contained in the LICENSE file.
 * *****************************************************************************************
 */

//! Variability aware sibling resolution.
//!
//! Consecutive siblings with pairwise equivalent presence conditions form one
//! ifdef block; control enters a block through its first element. Walking a
//! sibling sequence under a context means selecting, block by block, the
//! alternatives that can follow until the context is definitely covered

use log::trace;

use super::ControlFlow;
use crate::fexpr::FeatureId;
use crate::ir::NodeId;

/// A maximal run of consecutive siblings sharing an equivalent presence
/// condition, represented by the element control reaches first
#[derive(Debug, Clone, Copy)]
pub(super) struct IfdefBlock {
    pub head: NodeId,
    pub condition: FeatureId,
}

/// Result of walking a sibling sequence under a context.
///
/// `Complete` means the collected elements cover every configuration of the
/// context; `Partial` means flow may also continue past the sequence and the
/// caller has to keep climbing
pub(super) enum FollowingElements {
    Complete(Vec<NodeId>),
    Partial(Vec<NodeId>),
}

impl ControlFlow<'_> {
    /// Groups an ordered sibling sequence into ifdef blocks. For predecessor
    /// walks the caller passes the sequence in reverse source order; the head
    /// of each block is then the element control leaves last
    pub(super) fn group_ifdef_blocks(&mut self, siblings: &[NodeId]) -> Vec<IfdefBlock> {
        let mut res: Vec<IfdefBlock> = Vec::new();
        for &node in siblings {
            let condition = self.env.presence(node);
            let continues_run = match res.last() {
                Some(block) => {
                    let block_condition = block.condition;
                    self.feats.equivalent(block_condition, condition)
                }
                None => false,
            };
            if !continues_run {
                res.push(IfdefBlock {
                    head: node,
                    condition,
                });
            }
        }
        res
    }

    /// Selects the elements that can follow under `ctx` from an ordered sibling
    /// sequence; the head of each ifdef block is a candidate
    pub(super) fn following_elements(
        &mut self,
        siblings: &[NodeId],
        ctx: FeatureId,
    ) -> FollowingElements {
        let blocks = self.group_ifdef_blocks(siblings);
        let mut res = Vec::new();
        let mut accepted: Vec<FeatureId> = Vec::new();
        let mut covered = self.feats.never();

        'blocks: for block in blocks {
            if self.feats.equivalent(ctx, block.condition) {
                // a block with the same condition is the definite single
                // continuation under ctx
                res.push(block.head);
                return FollowingElements::Complete(res);
            }
            if !self.compatible(ctx, block.condition) {
                continue;
            }
            for i in 0..accepted.len() {
                if self.feats.equivalent(accepted[i], block.condition) {
                    // duplicate arm of an alternative already taken
                    continue 'blocks;
                }
            }
            res.push(block.head);
            accepted.push(block.condition);
            covered = self.feats.or(covered, block.condition);
            // a tautological disjunction (or one that at least covers ctx)
            // means flow cannot fall past the accepted alternatives
            if self.feats.implies(ctx, covered) {
                trace!("sibling walk covered all alternatives");
                return FollowingElements::Complete(res);
            }
        }
        FollowingElements::Partial(res)
    }
}
