use anyhow::anyhow;
use formatx::formatx;
use std::fmt::Debug;
use std::fs::File;
use std::io;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Key of the morphed weather file among a run's outputs
pub const EPW_OUTPUT_KEY: &str = "epw";
/// Key of the hourly canyon results among a run's outputs
pub const HOURLY_OUTPUT_KEY: &str = "csv";

pub trait Output: Debug {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write>;
    /// Whether writing to this output can be skipped entirely.
    fn is_noop(&self) -> bool {
        false
    }
}

/// Files in one directory, named by filling the single `{}` of a template
/// with the output key, e.g. `Boston_UWG.{}` gives `Boston_UWG.epw`.
#[derive(Debug)]
pub struct FileOutput {
    directory_path: PathBuf,
    file_template: String,
}

impl FileOutput {
    pub fn new(directory_path: PathBuf, file_template: String) -> Self {
        Self {
            directory_path,
            file_template,
        }
    }

    pub fn path_for_location_key(&self, location_key: &str) -> anyhow::Result<PathBuf> {
        let file_name = formatx!(&self.file_template, location_key).map_err(|e| {
            anyhow!(
                "Output template '{}' could not be filled: {e:?}",
                self.file_template
            )
        })?;
        Ok(self.directory_path.join(file_name))
    }
}

impl Output for FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        Ok(BufWriter::new(File::create(
            self.path_for_location_key(location_key)?,
        )?))
    }
}

impl Output for &FileOutput {
    fn writer_for_location_key(&self, location_key: &str) -> anyhow::Result<impl Write> {
        <FileOutput as Output>::writer_for_location_key(self, location_key)
    }
}

/// An output that goes to nowhere/ a "sink"/ /dev/null.
#[derive(Debug, Default)]
pub struct SinkOutput;

impl Output for SinkOutput {
    fn writer_for_location_key(&self, _location_key: &str) -> anyhow::Result<impl Write> {
        Ok(io::sink())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn should_name_files_from_the_template() {
        let output = FileOutput::new(PathBuf::from("/data/out"), "Boston_UWG.{}".to_string());
        assert_eq!(
            output.path_for_location_key(EPW_OUTPUT_KEY).unwrap(),
            PathBuf::from("/data/out/Boston_UWG.epw")
        );
        assert_eq!(
            output.path_for_location_key(HOURLY_OUTPUT_KEY).unwrap(),
            PathBuf::from("/data/out/Boston_UWG.csv")
        );
    }

    #[rstest]
    fn should_swallow_everything_written_to_a_sink() {
        let output = SinkOutput;
        assert!(output.is_noop());
        let mut writer = output.writer_for_location_key(EPW_OUTPUT_KEY).unwrap();
        writer.write_all(b"anything").unwrap();
    }
}
