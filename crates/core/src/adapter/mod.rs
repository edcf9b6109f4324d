//! Workers wrapping external programs and network transfers.
//!
//! Each adapter exposes the [`Worker`](crate::worker::Worker) contract:
//! - [`MetadataProbe`]: eight downloader queries merged into one result
//! - [`MediaDownload`] / [`ThumbnailDownload`]: downloader runs with progress
//! - [`HttpThumbnail`]: direct thumbnail transfer
//! - [`Transcode`]: ffmpeg to tagged MP3
//! - [`IdListing`] / [`ToolUpdate`]: playlist expansion and self-update

mod download;
mod http;
mod listing;
mod probe;
mod process;
mod transcode;
mod update;

pub use download::{
    download_command, thumbnail_command, DownloadProgress, MediaDownload, ThumbnailDownload,
    ThumbnailLocator, BEST_AUDIO,
};
pub use http::HttpThumbnail;
pub use listing::{id_listing_command, IdCollector, IdListing};
pub use probe::{probe_command, MediaMetadata, MetadataProbe, ProbeCapture};
pub use process::{LineInterpreter, PassThrough, ProcessWorker};
pub use transcode::{
    transcode_args, BitrateMode, Mp3Encoding, TagMetadata, Transcode, TranscodeProgress,
    TranscodeRequest,
};
pub use update::ToolUpdate;
