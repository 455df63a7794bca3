//! Always-not-taken predictor.

use super::{BranchPredictor, btb::Btb};

/// Predicts every branch not taken; keeps a BTB for target queries.
#[derive(Debug)]
pub struct StaticPredictor {
    btb: Btb,
}

impl StaticPredictor {
    /// Creates the predictor with a `btb_size`-entry BTB.
    pub fn new(btb_size: usize) -> Self {
        Self {
            btb: Btb::new(btb_size),
        }
    }
}

impl BranchPredictor for StaticPredictor {
    fn predict_branch(&self, _ip: u64) -> (bool, Option<u64>) {
        (false, None)
    }

    fn update_branch(&mut self, ip: u64, _taken: bool, target: Option<u64>) {
        if let Some(target) = target {
            self.btb.update(ip, target);
        }
    }

    fn predict_btb(&self, ip: u64) -> Option<u64> {
        self.btb.lookup(ip)
    }
}
