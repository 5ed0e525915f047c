use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{bail, Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use mimi_contracts::describe::{CameraPermission, CapturedPhoto};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Where the describe screen gets its photos from.
pub trait PhotoSource {
    /// Last known permission, without probing.
    fn permission(&self) -> CameraPermission;
    /// Probes access again and returns the new permission.
    fn request_permission(&mut self) -> CameraPermission;
    fn take_picture(&mut self) -> Result<CapturedPhoto>;
    fn available_picture_sizes(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A path standing in for the lens.
///
/// A file is shot as-is. A directory works like a drop folder: each shot takes
/// its most recently modified image.
#[derive(Debug, Clone)]
pub struct FileCamera {
    path: PathBuf,
    permission: CameraPermission,
    jpeg_quality: u8,
    max_dim: u32,
}

impl FileCamera {
    pub fn new(path: impl Into<PathBuf>, jpeg_quality: u8, max_dim: u32) -> Self {
        Self {
            path: path.into(),
            permission: CameraPermission::Unknown,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            max_dim: max_dim.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn probe(&self) -> CameraPermission {
        let readable = if self.path.is_dir() {
            fs::read_dir(&self.path).is_ok()
        } else {
            fs::File::open(&self.path).is_ok()
        };
        if readable {
            CameraPermission::Granted
        } else {
            CameraPermission::Denied
        }
    }

    fn candidate_images(&self) -> Result<Vec<(PathBuf, SystemTime)>> {
        let mut out = Vec::new();
        let entries = fs::read_dir(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !has_image_extension(&path) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            out.push((path, modified));
        }
        Ok(out)
    }

    fn resolve_shot(&self) -> Result<PathBuf> {
        if !self.path.is_dir() {
            return Ok(self.path.clone());
        }
        self.candidate_images()?
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(path, _)| path)
            .with_context(|| format!("no images found in {}", self.path.display()))
    }
}

impl PhotoSource for FileCamera {
    fn permission(&self) -> CameraPermission {
        self.permission
    }

    fn request_permission(&mut self) -> CameraPermission {
        self.permission = self.probe();
        self.permission
    }

    fn take_picture(&mut self) -> Result<CapturedPhoto> {
        if self.permission != CameraPermission::Granted {
            bail!("camera permission is {}", self.permission.as_str());
        }
        let shot = self.resolve_shot()?;
        tracing::debug!(path = %shot.display(), "taking picture");
        encode_jpeg(&shot, self.max_dim, self.jpeg_quality)
    }

    fn available_picture_sizes(&self) -> Vec<String> {
        let paths: Vec<PathBuf> = if self.path.is_dir() {
            self.candidate_images()
                .map(|rows| rows.into_iter().map(|(path, _)| path).collect())
                .unwrap_or_default()
        } else {
            vec![self.path.clone()]
        };
        let mut sizes: Vec<(u32, u32)> = paths
            .iter()
            .filter_map(|path| image::image_dimensions(path).ok())
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
            .into_iter()
            .map(|(width, height)| format!("{width}x{height}"))
            .collect()
    }
}

/// Loads an image, flattens transparency onto white, caps the longest side at
/// `max_dim` and re-encodes it as JPEG.
pub fn encode_jpeg(path: &Path, max_dim: u32, quality: u8) -> Result<CapturedPhoto> {
    let image = image::open(path).with_context(|| format!("failed decoding {}", path.display()))?;
    let rgba = image.to_rgba8();
    let mut flattened = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    let flattened = if flattened.width().max(flattened.height()) > max_dim {
        DynamicImage::ImageRgb8(flattened)
            .resize(max_dim, max_dim, FilterType::Triangle)
            .to_rgb8()
    } else {
        flattened
    };

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode_image(&flattened)
        .with_context(|| format!("failed encoding {} as JPEG", path.display()))?;
    Ok(CapturedPhoto {
        bytes,
        mime_type: "image/jpeg".to_string(),
        width: flattened.width(),
        height: flattened.height(),
    })
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}
