//! Network endpoints: the image server and the download probe.

pub mod downloader;
pub mod server;
