//! Core engine for the daily stock-guessing game: document ingestion,
//! derived price metrics, chart layout, the guess/clue state machine and
//! lifetime stats. Presentation layers consume this crate and stay dumb.

pub mod chart;
pub mod feed;
pub mod game;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod roster;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ticks;
