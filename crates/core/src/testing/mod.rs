//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the external collaborator
//! traits, so adapters, jobs and the scheduler can be exercised without
//! spawning real tools or touching the network.
//!
//! # Example
//!
//! ```rust,ignore
//! use yayd_core::testing::{fixtures, MockFetcher, MockLauncher, ScriptedRun};
//!
//! let launcher = MockLauncher::new();
//! fixtures::script_probe(&launcher, "abc123", "A Song");
//! fixtures::script_download(&launcher, "A Song.webm");
//! let fetcher = MockFetcher::new();
//!
//! // Build a Toolbox from both and hand it to a PipelineJob...
//! ```

mod manual_worker;
mod mock_fetcher;
mod mock_launcher;

pub use manual_worker::ManualWorker;
pub use mock_fetcher::{MockFetcher, RecordedFetch};
pub use mock_launcher::{MockLauncher, ScriptedRun};

/// Scripted tool behavior shared by tests.
pub mod fixtures {
    use super::{MockLauncher, ScriptedRun};

    /// Answers every probe query for one item.
    pub fn script_probe(launcher: &MockLauncher, id: &str, title: &str) {
        launcher.on_args_containing("--get-id", ScriptedRun::exit(0).stdout(id));
        launcher.on_args_containing("--get-title", ScriptedRun::exit(0).stdout(title));
        launcher.on_args_containing("--get-duration", ScriptedRun::exit(0).stdout("3:25"));
        launcher.on_args_containing(
            "--get-thumbnail",
            ScriptedRun::exit(0).stdout(format!("https://img.example.com/{}.jpg", id)),
        );
        launcher.on_args_containing(
            "-F",
            ScriptedRun::exit(0)
                .stdout(format!("[info] Available formats for {}:", id))
                .stdout("ID  EXT  RESOLUTION")
                .stdout("---------------------")
                .stdout("251 webm audio only"),
        );
    }

    /// Makes the media download create `file_name` and report progress.
    pub fn script_download(launcher: &MockLauncher, file_name: &str) {
        launcher.on_args_containing(
            "-f bestaudio -o",
            ScriptedRun::exit(0)
                .stdout("[download]  42.0% of 3.00MiB at  1.00MiB/s ETA 00:02")
                .stdout("[download] 100.0% of 3.00MiB at  1.50MiB/s ETA 00:00")
                .creates_output_file(file_name),
        );
    }

    /// Makes the transcoder print a banner and one status line.
    pub fn script_transcode(launcher: &MockLauncher) {
        launcher.on_args_containing(
            "-id3v2_version",
            ScriptedRun::exit(0)
                .stderr("  Duration: 00:03:25.00, start: 0.000000, bitrate: 160 kb/s")
                .stderr("size=    1024kB time=00:01:42.50 bitrate= 81.9kbits/s speed=20.5x"),
        );
    }
}
