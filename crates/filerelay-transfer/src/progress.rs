//! Aggregate batch progress.

/// Integer progress in `[0, 100]` across a batch of files.
///
/// Recomputed after every emitted chunk as
/// `round(100 * (files_done + bytes_sent / file_size) / total_files)` and
/// never allowed to decrease.
#[derive(Debug, Clone)]
pub struct ProgressCounter {
    total_files: usize,
    files_done: usize,
    percent: u8,
}

impl ProgressCounter {
    /// Counter for a batch of `total_files` files.
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            files_done: 0,
            percent: 0,
        }
    }

    /// Current percentage.
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Files finished so far.
    pub fn files_done(&self) -> usize {
        self.files_done
    }

    /// Record that `bytes_sent` of the current file (of `file_size`) are out.
    pub fn chunk_sent(&mut self, bytes_sent: u64, file_size: u64) -> u8 {
        let fraction = if file_size == 0 {
            1.0
        } else {
            (bytes_sent as f64 / file_size as f64).min(1.0)
        };
        self.update(self.files_done as f64 + fraction)
    }

    /// Record that the current file is finished.
    pub fn file_done(&mut self) -> u8 {
        self.files_done = (self.files_done + 1).min(self.total_files);
        if self.files_done == self.total_files {
            self.percent = 100;
            return self.percent;
        }
        self.update(self.files_done as f64)
    }

    fn update(&mut self, completed: f64) -> u8 {
        if self.total_files == 0 {
            self.percent = 100;
            return self.percent;
        }
        let raw = (100.0 * completed / self.total_files as f64).round();
        let clamped = raw.clamp(0.0, 100.0) as u8;
        self.percent = self.percent.max(clamped);
        self.percent
    }
}
