use super::converter::{ConvertedImage, TargetFormat};
use crate::error::ArchiveError;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub fn entry_name(index: usize, format: TargetFormat) -> String {
    format!("converted_{}.{}", index + 1, format.extension())
}

pub fn archive_file_name(epoch_millis: i64) -> String {
    format!("converted_images_{}.zip", epoch_millis)
}

/// Packs the outputs as `converted_<n>.<ext>`. Returns `None` when there is
/// nothing to pack.
pub fn build_archive(outputs: &[ConvertedImage], format: TargetFormat) -> Result<Option<Vec<u8>>, ArchiveError> {
    if outputs.is_empty() {
        return Ok(None);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (idx, output) in outputs.iter().enumerate() {
        writer.start_file(entry_name(idx, format), options)?;
        writer.write_all(&output.bytes)?;
    }

    Ok(Some(writer.finish()?.into_inner()))
}

/// Writes the archive into `dest_dir`, stamped with the current time in
/// milliseconds. Nothing is written for an empty output list.
pub fn download_archive(
    outputs: &[ConvertedImage],
    format: TargetFormat,
    dest_dir: &Path,
) -> Result<Option<PathBuf>, ArchiveError> {
    let Some(bytes) = build_archive(outputs, format)? else {
        return Ok(None);
    };

    std::fs::create_dir_all(dest_dir)?;
    let path = dest_dir.join(archive_file_name(chrono::Utc::now().timestamp_millis()));
    std::fs::write(&path, &bytes)?;

    tracing::info!(path = %path.display(), entries = outputs.len(), bytes = bytes.len(), "archive written");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn output(bytes: &[u8], format: TargetFormat) -> ConvertedImage {
        ConvertedImage { bytes: bytes.to_vec(), format }
    }

    #[test]
    fn empty_outputs_build_nothing() {
        assert!(build_archive(&[], TargetFormat::Png).unwrap().is_none());
    }

    #[test]
    fn empty_outputs_download_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("downloads");

        let saved = download_archive(&[], TargetFormat::Webp, &dest).unwrap();

        assert!(saved.is_none());
        assert!(!dest.exists());
    }

    #[test]
    fn names_entries_by_position_and_format() {
        let outputs = [output(b"first", TargetFormat::Webp), output(b"second", TargetFormat::Webp)];
        let bytes = build_archive(&outputs, TargetFormat::Webp).unwrap().unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["converted_1.webp", "converted_2.webp"]);

        let mut contents = String::new();
        archive.by_name("converted_2.webp").unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "second");
    }

    #[test]
    fn jpeg_entries_use_jpeg_extension() {
        assert_eq!(entry_name(0, TargetFormat::Jpeg), "converted_1.jpeg");
        assert_eq!(entry_name(9, TargetFormat::Png), "converted_10.png");
    }

    #[test]
    fn download_writes_timestamped_zip() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = [output(b"png-bytes", TargetFormat::Png)];

        let path = download_archive(&outputs, TargetFormat::Png, dir.path()).unwrap().unwrap();

        let file_name = path.file_name().unwrap().to_str().unwrap();
        let stamp = file_name
            .strip_prefix("converted_images_")
            .and_then(|s| s.strip_suffix(".zip"))
            .unwrap();
        assert!(stamp.parse::<i64>().unwrap() > 0);

        let archive = ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
    }
}
