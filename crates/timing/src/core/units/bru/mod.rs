//! Branch prediction collaborator.
//!
//! The ROB timer asks the predictor about every branch it receives and trains
//! it with the actual outcome when the branch commits. A branch counts as
//! mispredicted when the predicted direction differs, or when a taken
//! branch's predicted target differs.

pub use self::branch_predictor::BranchPredictor;

/// Predictor interface.
pub mod branch_predictor;

/// Branch Target Buffer.
pub mod btb;

/// Global-history predictor.
pub mod gshare;

/// Always-not-taken predictor.
pub mod static_bp;

use self::{gshare::GSharePredictor, static_bp::StaticPredictor};
use crate::config::{BranchPredictorConfig, BranchPredictorKind};
use crate::uop::instruction::BranchOutcome;

/// Statically dispatched predictor selection.
#[derive(Debug)]
pub enum BranchPredictorWrapper {
    /// Always not taken.
    Static(StaticPredictor),
    /// Global history XOR PC.
    GShare(GSharePredictor),
}

impl BranchPredictorWrapper {
    /// Builds the configured predictor, or `None` when prediction is disabled.
    pub fn new(config: &BranchPredictorConfig) -> Option<Self> {
        match config.kind {
            BranchPredictorKind::None => None,
            BranchPredictorKind::Static => Some(Self::Static(StaticPredictor::new(config.btb_size))),
            BranchPredictorKind::GShare => Some(Self::GShare(GSharePredictor::new(config.btb_size))),
        }
    }

    /// Predicts the branch at `ip` and reports whether `actual` contradicts it.
    pub fn is_mispredicted(&self, ip: u64, actual: BranchOutcome) -> bool {
        let (taken, target) = self.predict_branch(ip);
        taken != actual.taken || (actual.taken && target != Some(actual.target))
    }

    /// Trains the predictor with a resolved branch.
    pub fn train(&mut self, ip: u64, actual: BranchOutcome) {
        let target = actual.taken.then_some(actual.target);
        self.update_branch(ip, actual.taken, target);
    }
}

impl BranchPredictor for BranchPredictorWrapper {
    #[inline(always)]
    fn predict_branch(&self, ip: u64) -> (bool, Option<u64>) {
        match self {
            Self::Static(bp) => bp.predict_branch(ip),
            Self::GShare(bp) => bp.predict_branch(ip),
        }
    }

    #[inline(always)]
    fn update_branch(&mut self, ip: u64, taken: bool, target: Option<u64>) {
        match self {
            Self::Static(bp) => bp.update_branch(ip, taken, target),
            Self::GShare(bp) => bp.update_branch(ip, taken, target),
        }
    }

    #[inline(always)]
    fn predict_btb(&self, ip: u64) -> Option<u64> {
        match self {
            Self::Static(bp) => bp.predict_btb(ip),
            Self::GShare(bp) => bp.predict_btb(ip),
        }
    }
}
