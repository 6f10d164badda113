use anyhow::Result;
use dotenvy::dotenv;
use std::path::{Path, PathBuf};

/// Logical name of the X-13ARIMA-SEATS executable, resolved through `PATH`.
pub const X13_BINARY: &str = "x13as";

const INPUT_DIR: &str = "input";
const OUTPUT_DIR: &str = "output";

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub x13_path: PathBuf,
    pub outlier_detection: bool,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let x13_path = std::env::var_os("X13PATH")
            .map(PathBuf::from)
            .map(|path| resolve_x13_path(&path))
            .unwrap_or_else(|| PathBuf::from(X13_BINARY));

        let root = root.into();
        if root.as_os_str().is_empty() {
            anyhow::bail!("Root folder must not be empty");
        }

        Ok(Self::with_x13_path(root, x13_path))
    }

    pub fn with_x13_path(root: PathBuf, x13_path: PathBuf) -> Self {
        Config {
            input_dir: root.join(INPUT_DIR),
            output_dir: root.join(OUTPUT_DIR),
            root,
            x13_path,
            outlier_detection: true,
        }
    }
}

/// `X13PATH` may name the binary itself or the directory holding it.
fn resolve_x13_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(X13_BINARY)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_input_and_output_dirs_from_root() {
        let config = Config::with_x13_path(PathBuf::from("/data/run"), PathBuf::from(X13_BINARY));
        assert_eq!(config.input_dir, PathBuf::from("/data/run/input"));
        assert_eq!(config.output_dir, PathBuf::from("/data/run/output"));
        assert!(config.outlier_detection);
    }

    #[test]
    fn x13_directory_resolves_to_binary_inside_it() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_x13_path(dir.path()), dir.path().join(X13_BINARY));

        let file = dir.path().join("x13as-custom");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(resolve_x13_path(&file), file);
    }
}
