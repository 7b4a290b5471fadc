//! I/O helpers for grayscale frames and JSON records.
//!
//! - `load_grayscale_image`: read a TIFF/PNG/JPEG frame into an owned 8-bit buffer.
//! - `save_grayscale_u8`: write an owned 8-bit buffer (e.g. a background) to disk.
//! - `read_json_file` / `write_json_file`: (de)serialize records with path context.
use super::u8::GrayImageU8;
use image::{GrayImage, Luma};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk and convert to 8-bit grayscale.
pub fn load_grayscale_image(path: &Path) -> Result<GrayImageU8, String> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
        .into_luma8();
    let width = img.width() as usize;
    let height = img.height() as usize;
    GrayImageU8::new(width, height, img.into_raw())
        .ok_or_else(|| format!("Decoded buffer size mismatch for {}", path.display()))
}

/// Save an 8-bit grayscale buffer; the format follows the file extension.
pub fn save_grayscale_u8(buffer: &GrayImageU8, path: &Path) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(buffer.width() as u32, buffer.height() as u32);
    for (i, &px) in buffer.data().iter().enumerate() {
        let x = (i % buffer.width()) as u32;
        let y = (i / buffer.width()) as u32;
        out.put_pixel(x, y, Luma([px]));
    }
    out.save(path)
        .map_err(|e| format!("Failed to save {}: {e}", path.display()))
}

/// Deserialize a JSON document from `path`.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;

    #[test]
    fn json_roundtrip_through_disk() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested/regions.json");
        let regions = vec![Region::disk(1, [20.0, 30.0], 4.0)];
        write_json_file(&path, &regions).expect("write");
        let back: Vec<Region> = read_json_file(&path).expect("read");
        assert_eq!(back, regions);
    }

    #[test]
    fn grayscale_png_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bg.png");
        let buffer = GrayImageU8::new(3, 2, vec![0, 10, 20, 30, 40, 250]).expect("buffer");
        save_grayscale_u8(&buffer, &path).expect("save");
        let loaded = load_grayscale_image(&path).expect("load");
        assert_eq!(loaded, buffer);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_grayscale_image(Path::new("/nonexistent/frame_001.tif")).unwrap_err();
        assert!(err.contains("frame_001.tif"), "{err}");
    }
}
