// Shared load/save helpers for the JSON file stores.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

/// Read a store file. Missing or unreadable files yield an empty store.
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return T::default(),
    };

    serde_json::from_reader(BufReader::new(file)).unwrap_or_else(|e| {
        tracing::error!(
            path = %path.display(),
            error = %e,
            "Store file could not be parsed, starting empty; the next write replaces it"
        );
        T::default()
    })
}

/// Rewrite the whole store file.
pub fn write_pretty<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()
}
