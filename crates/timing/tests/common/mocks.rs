use mockall::mock;
use sniper_timing::core::units::memory::{MemoryAccess, MemoryHierarchy, MemoryResult};

mock! {
    pub Memory {}
    impl MemoryHierarchy for Memory {
        fn access(&mut self, access: MemoryAccess) -> MemoryResult;
        fn read_instruction(&mut self, address: u64, size: u32) -> MemoryResult;
    }
}
