use crate::domain::model::CapturedImage;
use crate::domain::ports::ImageSource;
use crate::utils::error::{ReconError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

const CAPTURE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Decode an image file into 8-bit luma.
pub fn load_gray(path: &Path) -> Result<CapturedImage> {
    if !path.is_file() {
        return Err(ReconError::input(format!(
            "image not found: {}",
            path.display()
        )));
    }
    let pixels = image::open(path)?.to_luma8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ReconError::input(format!("empty image: {}", path.display())));
    }
    tracing::debug!(
        "Decoded {} ({}x{})",
        path.display(),
        pixels.width(),
        pixels.height()
    );
    Ok(CapturedImage::new(path, pixels))
}

/// A specific image file.
pub struct FileImageSource {
    path: PathBuf,
}

impl FileImageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ImageSource for FileImageSource {
    fn acquire(&self) -> Result<CapturedImage> {
        load_gray(&self.path)
    }
}

/// The newest capture in a directory, waiting up to `wait_timeout` for one to appear.
pub struct CaptureDirectory {
    dir: PathBuf,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl CaptureDirectory {
    pub fn new(dir: impl Into<PathBuf>, wait_timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            wait_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Newest file with a capture extension, by modification time.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(ReconError::input(format!(
                "capture directory not found: {}",
                self.dir.display()
            )));
        }

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_capture(&path) {
                continue;
            }
            let modified = fs::metadata(&path)?.modified()?;
            if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}

impl ImageSource for CaptureDirectory {
    fn acquire(&self) -> Result<CapturedImage> {
        let started = Instant::now();
        loop {
            if let Some(path) = self.latest()? {
                return load_gray(&path);
            }
            if started.elapsed() >= self.wait_timeout {
                tracing::warn!(
                    "No capture appeared in {} within {:?}",
                    self.dir.display(),
                    self.wait_timeout
                );
                return Err(ReconError::AcquisitionTimeout {
                    seconds: self.wait_timeout.as_secs_f64(),
                });
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}

fn is_capture(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CAPTURE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 清空擷取與結果目錄 (不存在時建立)，回傳刪除的檔案數
pub fn reset_workspace(capture_dir: &Path, result_dir: &Path) -> Result<(usize, usize)> {
    let captures = clear_dir(capture_dir)?;
    let results = clear_dir(result_dir)?;
    tracing::info!(
        "Workspace reset: removed {} captures, {} results",
        captures,
        results
    );
    Ok((captures, results))
}

fn clear_dir(dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir)?;
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}
