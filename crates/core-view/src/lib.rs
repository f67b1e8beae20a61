//! Viewport geometry: text metrics, pixel/position mapping and scroll state.
//!
//! Everything in this crate is pure bookkeeping over pixel and line
//! arithmetic. No drawing, no timers, no document mutation; higher layers
//! decide when to consult it and what to do with the answers.

pub mod mapper;
pub mod viewport;

pub use mapper::{CoordinateMapper, LineRect, PixelPoint, TextMetrics, WordSpan, word_span, word_text};
pub use viewport::{DOCUMENT_IDEAL_SIZE, ViewportModel, WHEEL_LINES_DEFAULT};
