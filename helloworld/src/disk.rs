use serde::Serialize;
use std::fmt;
use std::io;
use std::path::Path;
use utoipa::ToSchema;

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;

/// Byte count rendered with two decimals in the largest binary unit that fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanSize(pub u64);

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0;
        match bytes {
            b if b >= GB => write!(f, "{:.2}GB", b as f64 / GB as f64),
            b if b >= MB => write!(f, "{:.2}MB", b as f64 / MB as f64),
            b if b >= KB => write!(f, "{:.2}KB", b as f64 / KB as f64),
            b => write!(f, "{}B", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub size: u64,
    pub free: u64,
    /// Free space usable by unprivileged users
    pub available: u64,
}

impl DiskUsage {
    pub fn at(path: &Path) -> io::Result<Self> {
        let stats = fs2::statvfs(path)?;
        Ok(Self {
            size: stats.total_space(),
            free: stats.free_space(),
            available: stats.available_space(),
        })
    }

    pub fn used(&self) -> u64 {
        self.size.saturating_sub(self.free)
    }

    pub fn report(&self) -> DiskUsageReport {
        DiskUsageReport {
            size: HumanSize(self.size).to_string(),
            used: HumanSize(self.used()).to_string(),
            available: HumanSize(self.available).to_string(),
            free: HumanSize(self.free).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DiskUsageReport {
    #[schema(example = "9.78GB")]
    pub size: String,
    pub used: String,
    pub available: String,
    pub free: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size_units() {
        assert_eq!(HumanSize(0).to_string(), "0B");
        assert_eq!(HumanSize(1023).to_string(), "1023B");
        assert_eq!(HumanSize(KB).to_string(), "1.00KB");
        assert_eq!(HumanSize(1536).to_string(), "1.50KB");
        assert_eq!(HumanSize(5 * MB).to_string(), "5.00MB");
        assert_eq!(HumanSize(3 * GB + GB / 2).to_string(), "3.50GB");
    }

    #[test]
    fn test_report_derives_used_from_free() {
        let usage = DiskUsage {
            size: 10 * GB,
            free: 4 * GB,
            available: 3 * GB,
        };
        let report = usage.report();

        assert_eq!(usage.used(), 6 * GB);
        assert_eq!(report.size, "10.00GB");
        assert_eq!(report.used, "6.00GB");
        assert_eq!(report.available, "3.00GB");
        assert_eq!(report.free, "4.00GB");
    }

    #[test]
    fn test_statvfs_on_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let usage = DiskUsage::at(dir.path()).unwrap();
        assert!(usage.size > 0);
        assert!(usage.free <= usage.size);
        assert!(usage.available <= usage.free);
    }

    #[test]
    fn test_statvfs_on_missing_path() {
        assert!(DiskUsage::at(Path::new("/definitely/not/here")).is_err());
    }
}
