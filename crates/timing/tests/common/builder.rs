use sniper_timing::config::{BranchPredictorKind, Config};
use sniper_timing::uop::{DynamicMicroOp, MicroOp, RegId};

/// Four-wide core with a 32-entry window at 1 GHz, commit log on.
pub fn small_core() -> Config {
    let mut config = Config::default();
    config.core.frequency_ghz = 1.0;
    config.core.dispatch_width = 4;
    config.core.window_size = 32;
    config.rob_timer.commit_width = 4;
    config.rob_timer.commit_log = true;
    config.branch_predictor.kind = BranchPredictorKind::None;
    config
}

/// `n` single-cycle adds, each reading the register the previous one wrote.
pub fn dependent_chain(n: usize) -> Vec<DynamicMicroOp> {
    (0..n)
        .map(|i| {
            DynamicMicroOp::new(
                MicroOp::execute(0x1000 + 4 * i as u64, 1)
                    .with_sources(&[1])
                    .with_destinations(&[1]),
            )
        })
        .collect()
}

/// `n` single-cycle adds with no register inputs.
pub fn independent(n: usize) -> Vec<DynamicMicroOp> {
    (0..n)
        .map(|i| {
            let dst = (i % 16) as RegId + 2;
            DynamicMicroOp::new(MicroOp::execute(0x2000 + 4 * i as u64, 1).with_destinations(&[dst]))
        })
        .collect()
}

/// Load of `address` into `dst`.
pub fn load(ip: u64, address: u64, dst: RegId) -> DynamicMicroOp {
    DynamicMicroOp::new(MicroOp::load(ip, 8).with_destinations(&[dst])).with_address(address)
}

/// Store of `src` to `address`.
pub fn store(ip: u64, address: u64, src: RegId) -> DynamicMicroOp {
    DynamicMicroOp::new(MicroOp::store(ip, 8).with_sources(&[src])).with_address(address)
}
