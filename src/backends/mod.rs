//! Built-in recognizer implementations.

#[cfg(feature = "whisper")]
pub mod whisper;
