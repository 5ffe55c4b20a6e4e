// src/normalize/mod.rs
// Temporal normalization, shared by the aggregation service and the display
// client so the "lying source" correction exists exactly once.
pub mod dates;
pub mod zones;
