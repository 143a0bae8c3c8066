/// Module implementing the ARM (32-bit, ARM mode) architecture.
pub mod arm;
