//! In-memory mock backend for rosterdb
//!
//! Snapshot isolation by structural cloning: each transaction works on a
//! full copy of the canonical tables and swaps it back atomically on
//! commit. A single transaction slot serializes all transactions — an
//! intentional single-writer simplification, not production MVCC.
//!
//! Referential integrity is emulated explicitly from the shared schema
//! registry, so deletes cascade, null, and restrict exactly like the SQL
//! backend's native foreign keys.

pub mod database;
pub mod store;
pub mod txn;

pub use database::MemoryDatabase;
pub use txn::MemoryTransaction;
