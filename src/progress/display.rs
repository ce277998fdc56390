//! Terminal progress rendering with indicatif.
//!
//! [`ConsoleProgress`] is a [`ProgressSink`] drawing one main bar for the
//! batch and one child bar per active transfer.
//!
//! # Examples
//!
//! ```rust
//! use haul::downloader::DownloaderBuilder;
//! use haul::progress::{ConsoleProgress, StyleOptions};
//!
//! let downloader = DownloaderBuilder::new()
//!     .progress(ConsoleProgress::new(StyleOptions::default()))
//!     .build();
//! ```

use super::sink::ProgressSink;
use super::style::StyleOptions;
use crate::transfer::TransferState;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Progress display drawing indicatif bars.
pub struct ConsoleProgress {
    multi: MultiProgress,
    main: ProgressBar,
    children: Mutex<HashMap<String, ProgressBar>>,
    style_options: StyleOptions,
}

impl ConsoleProgress {
    /// Create a new progress display.
    pub fn new(style_options: StyleOptions) -> Self {
        let multi = match style_options.is_enabled() {
            true => MultiProgress::new(),
            false => MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        };
        let main = multi.add(style_options.main().to_progress_bar(Some(0)));
        Self {
            multi,
            main,
            children: Mutex::new(HashMap::new()),
            style_options,
        }
    }

    fn children(&self) -> MutexGuard<'_, HashMap<String, ProgressBar>> {
        self.children.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish_child(&self, pb: ProgressBar) {
        if self.style_options.child().clear {
            pb.finish_and_clear();
        } else {
            pb.finish();
        }
    }
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("style_options", &self.style_options)
            .finish_non_exhaustive()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_transfer_start(&self, task: &str, resumed_from: u64, total: Option<u64>) {
        // A retry replaces the bar of the previous attempt.
        let pb = self
            .multi
            .insert_before(&self.main, self.style_options.child().to_progress_bar(total));
        pb.set_position(resumed_from);
        pb.set_message(display_name(task));
        if let Some(old) = self.children().insert(task.to_string(), pb) {
            old.finish_and_clear();
        }
    }

    fn on_byte_progress(&self, task: &str, bytes: u64, _total: Option<u64>) {
        if let Some(pb) = self.children().get(task) {
            pb.inc(bytes);
        }
    }

    fn on_task_status(&self, task: &str, state: &TransferState) {
        if state.is_terminal() {
            if let Some(pb) = self.children().remove(task) {
                self.finish_child(pb);
            }
            if matches!(state, TransferState::Failed | TransferState::Cancelled) {
                self.main.println(format!("{} {}", state, task));
            }
        } else if let Some(pb) = self.children().get(task) {
            pb.set_message(format!("{} {}", display_name(task), state));
        }
    }

    fn on_batch_progress(&self, completed: usize, total: usize) {
        self.main.set_length(total as u64);
        self.main.set_position(completed as u64);
        if completed >= total {
            if self.style_options.main().clear {
                self.main.finish_and_clear();
            } else {
                self.main.finish();
            }
        }
    }
}

/// Tasks are keyed by destination path; bars show the file name only.
fn display_name(task: &str) -> String {
    Path::new(task)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| task.to_string())
}
