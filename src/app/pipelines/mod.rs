pub mod feed_pipeline;

pub use feed_pipeline::FeedPipeline;
