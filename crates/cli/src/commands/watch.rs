use anyhow::{Context, Result};
use docanon_core::PdfOptions;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime};

pub const STABLE_ATTEMPTS: u32 = 6;
pub const STABLE_DELAY: Duration = Duration::from_millis(500);

pub struct WatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config: PathBuf,
    pub interval: Duration,
    pub ocr: bool,
    pub verify: bool,
    pub once: bool,
}

/// A file version already handled: path, size, modification time.
type FileKey = (PathBuf, u64, Option<SystemTime>);

fn file_key(path: &Path) -> Option<FileKey> {
    let meta = fs::metadata(path).ok()?;
    Some((path.to_path_buf(), meta.len(), meta.modified().ok()))
}

/// Waits until `path` is non-empty, keeps its size across `delay` and can be opened.
pub fn wait_until_stable(path: &Path, attempts: u32, delay: Duration) -> bool {
    for _ in 0..attempts {
        let before = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        thread::sleep(delay);
        let after = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if before > 0 && before == after && fs::File::open(path).is_ok() {
            return true;
        }
    }
    false
}

/// Regular files directly inside `dir`, sorted by name.
fn scan(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn process(path: &Path, opts: &WatchOptions) -> Result<()> {
    let name = path.file_name().context("file without a name")?;
    let output = opts.output_dir.join(name);
    let options = PdfOptions {
        use_ocr: opts.ocr,
        verify: opts.verify,
    };

    // rules are reloaded per file, so edits to the rule file apply to the next document
    if super::is_pdf(path) {
        docanon_pdf::anonymize_pdf_document(path, &output, &opts.config, &options)?;
    } else {
        docanon_text::anonymize_document_text(path, &output, &opts.config)?;
    }
    tracing::info!("✓ {} -> {}", path.display(), output.display());
    Ok(())
}

/// One pass over the input folder. Returns how many documents were written.
fn poll(opts: &WatchOptions, seen: &mut HashSet<FileKey>, delay: Duration) -> Result<usize> {
    let mut written = 0;
    for path in scan(&opts.input_dir)? {
        let Some(key) = file_key(&path) else {
            continue;
        };
        if seen.contains(&key) {
            continue;
        }
        if !wait_until_stable(&path, STABLE_ATTEMPTS, delay) {
            tracing::debug!("{} is not stable yet", path.display());
            continue;
        }
        // the file may have grown while we waited
        let key = file_key(&path).unwrap_or(key);
        seen.insert(key);

        if !super::is_pdf(&path) && !docanon_text::is_supported(&path) {
            tracing::warn!("skipping unsupported file {}", path.display());
            continue;
        }
        match process(&path, opts) {
            Ok(()) => written += 1,
            Err(e) => tracing::error!("failed to process {}: {:#}", path.display(), e),
        }
    }
    Ok(written)
}

pub fn handle(opts: WatchOptions) -> Result<()> {
    fs::create_dir_all(&opts.input_dir)
        .with_context(|| format!("creating {}", opts.input_dir.display()))?;
    fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("creating {}", opts.output_dir.display()))?;
    tracing::info!(
        "watching {} -> {} (rules {})",
        opts.input_dir.display(),
        opts.output_dir.display(),
        opts.config.display()
    );

    let mut seen = HashSet::new();
    loop {
        match poll(&opts, &mut seen, STABLE_DELAY) {
            Ok(n) if n > 0 => tracing::info!("processed {} documents", n),
            Ok(_) => {}
            Err(e) => tracing::error!("scan failed: {:#}", e),
        }
        if opts.once {
            return Ok(());
        }
        thread::sleep(opts.interval);
    }
}
