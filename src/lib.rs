// Library exports for the bytebench engine.
//
// # Mutex Usage Policy
//
//   - `parking_lot::Mutex`  — use for the shared tab buffer and other
//                             sync-only state touched from both the
//                             ingestion path and macro worker threads.
//
//   - `std::sync::Mutex`    — used inside `bytebench-scripting` for the
//                             reader-thread buffers, with poison recovery.
//                             Prefer parking_lot for new engine code.

/// Engine version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod codec;
pub mod error;
pub mod filter;
pub mod scripting;
pub mod tab;
pub mod traits;
