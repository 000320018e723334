//! Transparency Recorder: one immutable attribution record per turn.
//!
//! ```text
//! router turn ──► TransparencyRecord::new(context, scores, result, ..)
//!                         │
//!                         ▼
//!                TransparencyRecorder::emit
//!                  ├─► TransparencyLog   (bounded, queryable, JSONL export)
//!                  ├─► LogSink           (log::debug!)
//!                  └─► custom TransparencySink (audit storage, ...)
//! ```
//!
//! Records are built after the decision is final and never feed back into
//! it. Every turn produces exactly one record, including fallback turns and
//! turns whose scorer failed.

pub mod store;
pub mod record;
pub mod recorder;

pub use store::{LogSink, TransparencyLog, TransparencySink};
pub use record::{Explanation, TransparencyRecord};
pub use recorder::TransparencyRecorder;
