use std::io::{self, Write};
use std::sync::LazyLock;
use std::time::Duration;

use bucketscout_common::events::{EventSink, ScanEvent, TracingSink};
use bucketscout_common::model::probe::ProbeKind;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

/// Hidden until a download starts.
pub static PROGRESS: LazyLock<ProgressBar> =
    LazyLock::new(|| ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden()));

fn download_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.blue} [{bar:32.green/bright_black}] {pos}/{len} {wide_msg:.dim}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .tick_strings(&[
        "▁▁▁▁▁",
        "▁▂▂▂▁",
        "▁▄▂▄▁",
        "▂▄▆▄▂",
        "▄▆█▆▄",
        "▂▄▆▄▂",
        "▁▄▂▄▁",
        "▁▂▂▂▁",
    ])
    .progress_chars("█▓░")
}

fn start_download(total: usize) {
    PROGRESS.set_style(download_style());
    PROGRESS.set_length(total as u64);
    PROGRESS.set_position(0);
    PROGRESS.set_draw_target(ProgressDrawTarget::stderr());
    PROGRESS.enable_steady_tick(Duration::from_millis(100));
}

fn finish_download() {
    PROGRESS.finish_and_clear();
    PROGRESS.set_draw_target(ProgressDrawTarget::hidden());
}

/// Terminal-side event sink: drives the download bar, then hands the event to
/// [`TracingSink`]. Listed objects are rendered as a table in the report
/// instead of one log line each.
#[derive(Default)]
pub struct ProgressSink {
    inner: TracingSink,
}

impl EventSink for ProgressSink {
    fn emit(&self, event: ScanEvent) {
        match &event {
            ScanEvent::ObjectListed { object } => {
                debug!("Listed {} ({} bytes)", object.key, object.size);
                return;
            }
            ScanEvent::DownloadStarted { total } => start_download(*total),
            ScanEvent::ObjectDownloaded { key, .. } | ScanEvent::ObjectFailed { key, .. } => {
                PROGRESS.set_message(key.clone());
                PROGRESS.inc(1);
            }
            ScanEvent::ProbeFinished {
                probe: ProbeKind::Download,
                ..
            } => finish_download(),
            _ => {}
        }
        self.inner.emit(event);
    }
}

/// Log writer that lifts the progress bar out of the way for each line.
pub struct ProgressWriter;

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        PROGRESS.suspend(|| io::stdout().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        PROGRESS.suspend(|| io::stdout().flush())
    }
}
