use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::config::DerivativeConfig;

/// The two derivative sizes kept next to every source photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivativeSize {
    /// Thumbnail for the contact sheet.
    Small,
    /// Gallery-sized view.
    Large,
}

impl DerivativeSize {
    pub const ALL: [DerivativeSize; 2] = [DerivativeSize::Small, DerivativeSize::Large];

    /// Sub-directory of the project holding this size.
    pub fn dir_name(&self) -> &'static str {
        match self {
            DerivativeSize::Small => "small",
            DerivativeSize::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DerivativeSpec {
    max_dimension: u32,
    quality: u8,
}

/// Generates resized copies of project photos.
///
/// A derivative is written once and never refreshed: if the target file
/// exists it is reused as-is.
pub struct ThumbnailGenerator {
    small: DerivativeSpec,
    large: DerivativeSpec,
}

impl ThumbnailGenerator {
    pub fn new(config: &DerivativeConfig) -> Self {
        Self {
            small: DerivativeSpec {
                max_dimension: config.small_size,
                quality: config.small_quality,
            },
            large: DerivativeSpec {
                max_dimension: config.large_size,
                quality: config.large_quality,
            },
        }
    }

    fn spec(&self, size: DerivativeSize) -> DerivativeSpec {
        match size {
            DerivativeSize::Small => self.small,
            DerivativeSize::Large => self.large,
        }
    }

    /// `{project_dir}/{small|large}/{filename}`
    pub fn derivative_path(
        &self,
        project_dir: &Path,
        size: DerivativeSize,
        filename: &str,
    ) -> PathBuf {
        project_dir.join(size.dir_name()).join(filename)
    }

    /// Make sure `size` exists for `source`. Returns `true` if it was generated now.
    pub fn ensure(&self, source: &Path, target: &Path, size: DerivativeSize) -> Result<bool> {
        if target.exists() {
            return Ok(false);
        }

        let spec = self.spec(size);
        let img = load_image(source)?;
        let resized = fit_within(&img, spec.max_dimension);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        save_image(&resized, target, spec.quality)?;

        debug!(
            "Generated {} derivative {} ({}x{})",
            size.dir_name(),
            target.display(),
            resized.width(),
            resized.height()
        );
        Ok(true)
    }

    /// Make sure both sizes exist for `{project_dir}/{filename}`.
    /// Returns how many derivatives were generated.
    pub fn ensure_all(&self, project_dir: &Path, filename: &str) -> Result<usize> {
        let source = project_dir.join(filename);
        let mut generated = 0;
        for size in DerivativeSize::ALL {
            let target = self.derivative_path(project_dir, size, filename);
            if self.ensure(&source, &target, size)? {
                generated += 1;
            }
        }
        Ok(generated)
    }
}

fn load_image(path: &Path) -> Result<DynamicImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(img)
}

/// Dimensions of `(width, height)` scaled to fit a `max x max` box.
/// Images already inside the box keep their size.
pub fn fit_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let ratio = (max as f64 / width as f64).min(max as f64 / height as f64);
    let w = ((width as f64 * ratio).round() as u32).max(1);
    let h = ((height as f64 * ratio).round() as u32).max(1);
    (w, h)
}

fn fit_within(img: &DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (w, h) = fit_dimensions(width, height, max);
    if (w, h) == (width, height) {
        img.clone()
    } else {
        img.resize_exact(w, h, FilterType::Lanczos3)
    }
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Encode next to `path` and rename into place, so a crash never leaves a
/// truncated file that would later count as an existing derivative.
///
/// The temporary name is unique per call: two processes rendering the same
/// derivative each write their own file and the last rename wins.
fn save_image(img: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("Unsupported output format for {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}-{}.tmp",
        file_name,
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    let result = write_image_file(img, &tmp, format, quality)
        .with_context(|| format!("Failed to encode {}", path.display()))
        .and_then(|()| fs::rename(&tmp, path).map_err(Into::into));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_image_file(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: u8,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)?;
        }
        // PNG and GIF are lossless here; quality does not apply.
        _ => img.write_to(&mut writer, format)?,
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Fixture image writers shared by tests across the crate.
#[cfg(test)]
pub(crate) mod testing {
    use image::{Rgb, RgbImage};
    use std::path::Path;

    pub fn write_image(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        img.save(path).unwrap();
    }
}
