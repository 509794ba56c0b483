pub mod encoder;
pub mod job;
pub mod transcode;
