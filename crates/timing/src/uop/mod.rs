//! Front-end data model.
//!
//! This module describes what the timing models consume. It provides:
//! 1. **Micro-ops:** The static `MicroOp` and its dynamic instance `DynamicMicroOp`.
//! 2. **Hit locations:** `HitWhere`, the memory-hierarchy level that served an access.
//! 3. **Instructions:** Operands, dynamic memory information and branch outcomes.
//! 4. **Decode:** Cracking of one instruction into load/execute/store micro-ops.

/// Instruction to micro-op decomposition.
pub mod decode;

/// Dynamic micro-op instance.
pub mod dynamic;

/// Memory-hierarchy hit location.
pub mod hit_where;

/// Instructions, operands and dynamic memory information.
pub mod instruction;

/// Static micro-op description.
pub mod micro_op;

pub use dynamic::DynamicMicroOp;
pub use hit_where::HitWhere;
pub use micro_op::{MicroOp, RegId, UopSubtype};
