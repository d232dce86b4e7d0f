use crate::disk::{HumanSize, KB, MB};
use derive_more::Display;
use rand::RngCore;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DUMMY_FILE_PREFIX: &str = "dummy";
pub const SIZE_LIMIT_MB: u64 = 512;
pub const FALLBACK_SIZE_MB: u64 = 1;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[display("count: {count}, total size: {}", HumanSize(*total_size))]
pub struct DummyFilesStat {
    pub count: usize,
    pub total_size: u64,
}

/// Reads the `size` query value in MiB, falling back to 1 when it is absent
/// or not a non-negative integer.
pub fn parse_size(raw: Option<&str>) -> u64 {
    match raw.unwrap_or_default().parse::<u64>() {
        Ok(size) => size,
        Err(err) => {
            warn!("failed to parse size {:?}: {}", raw, err);
            FALLBACK_SIZE_MB
        }
    }
}

pub fn ensure_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    builder.create(dir)
}

/// Writes a new `dummy*` file of `size_mb` MiB filled with one random
/// kilobyte repeated.
pub fn create_dummy_file(dir: &Path, size_mb: u64) -> io::Result<PathBuf> {
    let mut block = [0u8; KB as usize];
    rand::thread_rng().fill_bytes(&mut block);

    let (file, path) = tempfile::Builder::new()
        .prefix(DUMMY_FILE_PREFIX)
        .tempfile_in(dir)?
        .keep()?;

    let mut writer = BufWriter::new(file);
    for _ in 0..size_mb * MB / KB {
        writer.write_all(&block)?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;

    debug!("created {} ({}MB)", path.display(), size_mb);
    Ok(path)
}

/// Counts regular entries named `dummy*`. A missing directory counts as empty.
pub fn stat_dummy_files(dir: &Path) -> io::Result<DummyFilesStat> {
    if !dir.is_dir() {
        return Ok(DummyFilesStat::default());
    }

    let mut stat = DummyFilesStat::default();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if !metadata.is_dir() && entry.file_name().to_string_lossy().starts_with(DUMMY_FILE_PREFIX)
        {
            stat.count += 1;
            stat.total_size += metadata.len();
        }
    }

    Ok(stat)
}
