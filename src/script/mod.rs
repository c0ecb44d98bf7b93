// file: src/script/mod.rs
// version: 1.0.0
// guid: b26e276a-7d7a-4bb4-959e-cc4a6b150fd9

//! Job script rendering and inspection

pub mod parse;
pub mod render;

pub use parse::parse_script;
pub use render::{join_command, quote_word, render_script};

use crate::config::JobSpec;
use crate::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Render `spec` and write it to disk
///
/// An existing directory as `target` gets `<job_name>.sh` inside it; any other
/// path is used as the script file itself. On unix the script is made
/// executable.
pub async fn write_script(target: &Path, spec: &JobSpec) -> Result<PathBuf> {
    let script = render_script(spec)?;

    let path = if target.is_dir() {
        target.join(format!("{}.sh", spec.scheduler.job_name))
    } else {
        target.to_path_buf()
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(&path, script).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).await?;
    }

    info!("Wrote job script to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_script_into_directory() -> Result<()> {
        let dir = TempDir::new()?;
        let spec = JobSpec::canonical();

        let path = write_script(dir.path(), &spec).await?;

        assert_eq!(path, dir.path().join("lab5.sh"));
        let written = fs::read_to_string(&path).await?;
        assert_eq!(written, render_script(&spec)?);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_written_script_is_executable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new()?;
        let path = write_script(&dir.path().join("jobs").join("run.sh"), &JobSpec::canonical()).await?;

        let mode = fs::metadata(&path).await?.permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_job_not_written() -> Result<()> {
        let dir = TempDir::new()?;
        let mut spec = JobSpec::canonical();
        spec.scheduler.partition.clear();

        assert!(write_script(dir.path(), &spec).await.is_err());
        assert!(!dir.path().join("lab5.sh").exists());
        Ok(())
    }
}
