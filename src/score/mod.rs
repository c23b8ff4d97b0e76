//! Score data model (long and wide formats)
//!
//! ## Schema Overview
//!
//! ```text
//! ScoreTable (long)                     MergedTable (wide)
//! ─────────────────                     ──────────────────
//! one row per                           one row per
//! (sample, class, coding, alpha)  ──▶   (sample, class, alpha, analysis)
//!   performance / capacity               encoding / decoding / coding
//!                                        × performance / capacity
//! ```
//!
//! Both tables are transient, produced and consumed within a single call
//! chain. Ownership is purely by value: functions accept a table and produce
//! a new or mutated table, with no shared state.
//!
//! ## Usage
//!
//! ```rust
//! use cotejar::score::{Coding, ScoreRecord, ScoreTable};
//!
//! let mut table = ScoreTable::new();
//! table.push(
//!     ScoreRecord::builder("sub-01", "VIS", Coding::Encoding, 1.0)
//!         .performance(0.82)
//!         .capacity(11.5)
//!         .n_nodes(64.0)
//!         .analysis("reliability")
//!         .build(),
//! );
//! assert_eq!(table.len(), 1);
//! ```

mod merged;
mod record;
mod table;

pub use merged::{Channel, MergedRecord, MergedTable, MERGED_COLUMN_ORDER};
pub use record::{Coding, Metric, ScoreRecord, ScoreRecordBuilder};
pub use table::ScoreTable;
