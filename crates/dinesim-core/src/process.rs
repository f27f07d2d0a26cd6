//! Process identity.

/// Identifier of a simulation process.
///
/// Processes are numbered sequentially starting from 0 in the order of their registration.
pub type ProcessId = u64;
