use std::fs;
use std::io;
use std::io::Read;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::read::GzDecoder;
use zip::ZipArchive;

use crate::error::ChebiError;

/// Extracts the first member of a zip archive into `target_dir` and returns
/// the path it was written to.
pub fn extract_zip_first(
    zip_path: &Utf8Path,
    target_dir: &Utf8Path,
) -> Result<Utf8PathBuf, ChebiError> {
    let file = fs::File::open(zip_path.as_std_path())
        .map_err(|err| ChebiError::Filesystem(format!("open zip {zip_path}: {err}")))?;
    let mut archive =
        ZipArchive::new(file).map_err(|err| ChebiError::Filesystem(err.to_string()))?;

    if archive.is_empty() {
        return Err(ChebiError::Filesystem(format!("zip {zip_path} is empty")));
    }
    let mut entry = archive
        .by_index(0)
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    let entry_path = match entry.enclosed_name() {
        Some(path) => target_dir.as_std_path().join(path),
        None => {
            return Err(ChebiError::Filesystem(
                "zip entry path traversal detected".to_string(),
            ));
        }
    };

    if let Some(parent) = entry_path.parent() {
        fs::create_dir_all(parent).map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    }
    let mut outfile =
        fs::File::create(&entry_path).map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    io::copy(&mut entry, &mut outfile).map_err(|err| ChebiError::Filesystem(err.to_string()))?;

    Utf8PathBuf::from_path_buf(entry_path)
        .map_err(|_| ChebiError::Filesystem("non-utf8 path in zip archive".to_string()))
}

/// Decompresses a gzip file to `destination` via a temp file so readers
/// never observe a partial write.
pub fn gunzip_to(gz_path: &Utf8Path, destination: &Utf8Path) -> Result<(), ChebiError> {
    let file = fs::File::open(gz_path.as_std_path())
        .map_err(|err| ChebiError::Filesystem(format!("open gzip {gz_path}: {err}")))?;
    let mut decoder = GzDecoder::new(file);

    let parent = destination
        .parent()
        .ok_or_else(|| ChebiError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("libchebi-gunzip")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    io::copy(&mut decoder, &mut temp).map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    temp.persist(destination.as_std_path())
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Streams `reader` to `destination` atomically (temp file, then rename).
pub fn write_atomic(reader: &mut dyn Read, destination: &Utf8Path) -> Result<(), ChebiError> {
    let parent = destination
        .parent()
        .ok_or_else(|| ChebiError::Filesystem("invalid destination path".to_string()))?;
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("libchebi-download")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    io::copy(reader, &mut temp).map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    temp.persist(destination.as_std_path())
        .map_err(|err| ChebiError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Reads a flat file as text. The ChEBI release is cp1252 encoded; a
/// bytewise latin-1 decode covers every column the indices consume.
pub fn read_text(path: &Utf8Path) -> Result<String, ChebiError> {
    let bytes = fs::read(path.as_std_path())
        .map_err(|err| ChebiError::Filesystem(format!("read {path}: {err}")))?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn gunzip_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let gz_path = dir.join("names.tsv.gz");
        let out_path = dir.join("names.tsv");

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"ID\tCOMPOUND_ID\nrow\n").unwrap();
        fs::write(gz_path.as_std_path(), encoder.finish().unwrap()).unwrap();

        gunzip_to(&gz_path, &out_path).unwrap();
        assert_eq!(read_text(&out_path).unwrap(), "ID\tCOMPOUND_ID\nrow\n");
    }

    #[test]
    fn zip_first_member_extraction() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let zip_path = dir.join("structures.zip");

        let file = fs::File::create(zip_path.as_std_path()).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file("structures.csv", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"ID,COMPOUND_ID\n1,100\n").unwrap();
        writer.finish().unwrap();

        let extracted = extract_zip_first(&zip_path, &dir).unwrap();
        assert_eq!(extracted, dir.join("structures.csv"));
        assert_eq!(read_text(&extracted).unwrap(), "ID,COMPOUND_ID\n1,100\n");
    }

    #[test]
    fn latin1_decode() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let path = dir.join("names.tsv");
        fs::write(path.as_std_path(), [b'c', 0xE9, b'r', b'o', b'l']).unwrap();
        assert_eq!(read_text(&path).unwrap(), "cérol");
    }
}
