//! Per-request scratch files for the external converter.
//!
//! Every conversion gets its own uuid and a set of files named after it in the
//! scratch directory. The files are owned by [`ScratchFiles`] and deleted when
//! it is dropped, whichever way the request ends.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempPath;
use uuid::Uuid;

/// The uniquely named files of one external conversion.
///
/// The output file is created empty up front, so a tool that exits
/// successfully without writing it is detected by its length.
#[derive(Debug)]
pub struct ScratchFiles {
    id: Uuid,
    input: Option<TempPath>,
    output: Option<TempPath>,
    browser_config: Option<TempPath>,
    mermaid_config: Option<TempPath>,
}

impl ScratchFiles {
    /// Creates `<id>.mmd`, `<id>.<output_extension>`, `<id>-puppeteer.json`
    /// and `<id>-mermaid.json` in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if any file cannot be created. Files created before
    /// the failure are removed.
    pub fn create(dir: &Path, output_extension: &str) -> std::io::Result<Self> {
        let id = Uuid::new_v4();
        let mut files = Self {
            id,
            input: None,
            output: None,
            browser_config: None,
            mermaid_config: None,
        };

        files.input = Some(create_named(dir, &id.to_string(), ".mmd")?);
        files.output = Some(create_named(dir, &id.to_string(), &format!(".{output_extension}"))?);
        files.browser_config = Some(create_named(dir, &format!("{id}-puppeteer"), ".json")?);
        files.mermaid_config = Some(create_named(dir, &format!("{id}-mermaid"), ".json")?);

        debug!(id:% = id, dir = dir.display().to_string(); "Created scratch files");
        Ok(files)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn input(&self) -> &Path {
        path_of(&self.input)
    }

    pub fn output(&self) -> &Path {
        path_of(&self.output)
    }

    pub fn browser_config(&self) -> &Path {
        path_of(&self.browser_config)
    }

    pub fn mermaid_config(&self) -> &Path {
        path_of(&self.mermaid_config)
    }

    /// Paths of all files, for logging and tests.
    pub fn paths(&self) -> Vec<PathBuf> {
        [
            &self.input,
            &self.output,
            &self.browser_config,
            &self.mermaid_config,
        ]
        .into_iter()
        .flatten()
        .map(|path| path.to_path_buf())
        .collect()
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        let files = [
            self.input.take(),
            self.output.take(),
            self.browser_config.take(),
            self.mermaid_config.take(),
        ];
        for path in files.into_iter().flatten() {
            let display = path.display().to_string();
            match path.close() {
                Ok(()) => debug!(path = display; "Removed scratch file"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = display, err:%; "Failed to remove scratch file"),
            }
        }
    }
}

fn create_named(dir: &Path, stem: &str, suffix: &str) -> std::io::Result<TempPath> {
    let file = tempfile::Builder::new()
        .prefix(stem)
        .suffix(suffix)
        .rand_bytes(0)
        .tempfile_in(dir)?;
    Ok(file.into_temp_path())
}

fn path_of(path: &Option<TempPath>) -> &Path {
    // Every field is set by `create` and only cleared in `drop`.
    path.as_deref().unwrap_or(Path::new(""))
}
