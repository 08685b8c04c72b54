/// Board structure and ordering engine
///
/// The board document embeds an ordered list of [`Column`]s plus a
/// `column_order` permutation of their ids. Each column's `task_ids` list is
/// the authoritative position of tasks within that column.
///
/// The [`engine`] module contains the pure, I/O-free operations over that
/// structure. The server persistence layer (`models::board`, `models::task`)
/// and the client mirror store both drive the same engine, so the two sides
/// cannot disagree about structural semantics.

pub mod engine;

pub use engine::{Column, EngineError};
