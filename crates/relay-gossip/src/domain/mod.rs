//! # Domain Layer for Transaction Gossip
//!
//! Pure pool and policy logic with no I/O dependencies. This is the
//! innermost layer of the hexagonal architecture.
//!
//! ## Contents
//!
//! - **entities**: Core domain entities (`GroupId`, `TxKey`, `PooledTx`, `PeerId`)
//! - **cache**: Duplicate suppression (`SeenTxCache`)
//! - **config**: Group and broadcast configuration plus protocol constants
//! - **group**: One pending-transaction group (`TxGroup`)
//! - **registry**: The immutable group set (`GroupRegistry`)
//! - **errors**: Error taxonomy (`GossipError`, `WireError`, `ProtocolViolation`)
//!
//! ## Design Principles
//!
//! 1. **No I/O**: Admission takes the external check as a plain closure
//! 2. **Lock-light**: Queues and caches synchronize internally; everything
//!    here is shared by reference across tasks
//! 3. **Testable**: All logic unit-tests without mocks

mod cache;
mod config;
mod entities;
mod errors;
mod group;
mod registry;

pub use cache::*;
pub use config::*;
pub use entities::*;
pub use errors::*;
pub use group::*;
pub use registry::*;
