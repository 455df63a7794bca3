//! Branch predictor interface.

/// Direction and target prediction.
pub trait BranchPredictor {
    /// Predicts the branch at `ip`.
    ///
    /// Returns `(taken, target)`; the target is only known for predicted-taken
    /// branches that hit in the BTB.
    fn predict_branch(&self, ip: u64) -> (bool, Option<u64>);

    /// Trains with the resolved outcome. `target` is `Some` for taken branches.
    fn update_branch(&mut self, ip: u64, taken: bool, target: Option<u64>);

    /// BTB target for `ip`, if any.
    fn predict_btb(&self, ip: u64) -> Option<u64>;
}
