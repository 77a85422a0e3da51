//! On-disk layout of a run: `<output>/`, `<output>/Logs/` and `<output>/Ports/`.

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;

use nwiz_common::config::Config;

/// Creates every directory the run writes into. Existing directories are reused.
pub fn prepare_directories(config: &Config) -> anyhow::Result<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = vec![
        config.output_dir.clone(),
        config.logs_dir(),
        config.ports_dir(),
    ];

    for dir in &dirs {
        std::fs::create_dir_all(dir).with_context(|| {
            format!(
                "Failed to create {}. Ensure you have permission to create directories there",
                dir.display()
            )
        })?;
        debug!(dir = %dir.display(), "directory ready");
    }

    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> Config {
        Config {
            output_dir: std::env::temp_dir().join(format!("nwiz-{name}-{}", std::process::id())),
            ..Config::default()
        }
    }

    #[test]
    fn creates_the_full_layout_and_tolerates_reruns() {
        let config = config("layout");
        let created = prepare_directories(&config).unwrap();
        assert_eq!(created.len(), 3);
        assert!(config.logs_dir().is_dir());
        assert!(config.ports_dir().is_dir());

        assert!(prepare_directories(&config).is_ok());
        let _ = std::fs::remove_dir_all(&config.output_dir);
    }

    #[test]
    fn a_file_in_the_way_is_an_error() {
        let config = config("blocked");
        std::fs::write(&config.output_dir, b"not a directory").unwrap();

        let error = prepare_directories(&config).unwrap_err();
        assert!(error.to_string().contains("Failed to create"));
        let _ = std::fs::remove_file(&config.output_dir);
    }
}
