use anyhow::Context;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut temp: OsString = path.as_os_str().to_owned();
    temp.push("_temp");
    PathBuf::from(temp)
}

/// Writes `path` through a sibling `<path>_temp` file and renames it into place,
/// so readers see either the previous file or the complete new one.
pub fn write_atomically<F>(path: &Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> anyhow::Result<()>,
{
    let temp = temp_path_for(path);
    let file = File::create(&temp)
        .with_context(|| format!("can't create temporary file {}", temp.display()))?;
    let mut writer = BufWriter::new(file);
    let written = write(&mut writer).and_then(|_| {
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    });
    if let Err(err) = written {
        let _ = std::fs::remove_file(&temp);
        return Err(err.context(format!("can't write {}", temp.display())));
    }
    std::fs::rename(&temp, path)
        .with_context(|| format!("can't move {} over {}", temp.display(), path.display()))
}

pub fn read_json_from_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("can't open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("can't decode {}", path.display()))
}
