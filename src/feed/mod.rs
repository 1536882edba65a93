//! Streaming side of the pipeline: watermark filtering and per-subscriber sessions

pub mod session;
pub mod sink;
pub mod watermark;

pub use session::{FeedSession, SessionSettings, SessionState, SessionSummary, StopReason};
pub use sink::{ChannelSink, FeedSink};
pub use watermark::WatermarkFilter;
