//! Raster asset handling for component presets and images.
//!
//! Production builds re-encode each image as lossy WebP and hand the bytes
//! back to the caller for registration. Development builds symlink the
//! output location to the source file instead.

use crate::error::{CompkitError, Result};
use crate::paths;
use crate::plan::BuildMode;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const WEBP_QUALITY: f32 = 80.0;

// ---------------------------------------------------------------------------
// ImageInfo
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

/// A resolved image plus the bytes to register, when the mode produces any.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub info: ImageInfo,
    pub encoded: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// AssetPipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AssetPipeline {
    mode: BuildMode,
    output_dir: PathBuf,
}

impl AssetPipeline {
    pub fn new(mode: BuildMode, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode,
            output_dir: output_dir.into(),
        }
    }

    /// Process `<base>/<relative>` for `component`. Returns `Ok(None)` when
    /// the source file does not exist.
    pub async fn process(
        &self,
        component: &str,
        base: &Path,
        relative: &str,
    ) -> Result<Option<ProcessedImage>> {
        let asset_name = paths::asset_path(component, relative)?;
        let source = base.join(relative);
        if !tokio::fs::try_exists(&source).await? {
            return Ok(None);
        }
        let source = source.as_path();

        let processed = match self.mode {
            BuildMode::Production => {
                let owned = source.to_path_buf();
                let (width, height, data) = run_blocking(source, move || encode_webp(&owned)).await?;
                ProcessedImage {
                    info: ImageInfo {
                        width,
                        height,
                        kind: "webp".to_string(),
                        path: asset_name,
                    },
                    encoded: Some(data),
                }
            }
            BuildMode::Development => {
                let owned = source.to_path_buf();
                let (width, height) =
                    run_blocking(source, move || Ok(image::image_dimensions(&owned)?)).await?;
                self.link(source, &asset_name).await?;
                ProcessedImage {
                    info: ImageInfo {
                        width,
                        height,
                        kind: source_format(source),
                        path: asset_name,
                    },
                    encoded: None,
                }
            }
        };
        Ok(Some(processed))
    }

    /// Symlink `<output>/<asset_name>` to the source. An existing destination
    /// is left untouched so repeated builds are no-ops.
    async fn link(&self, source: &Path, asset_name: &str) -> Result<()> {
        let dest = self.output_dir.join(asset_name);
        if tokio::fs::symlink_metadata(&dest).await.is_ok() {
            return Ok(());
        }
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let target = tokio::fs::canonicalize(source).await?;
        crate::io::symlink_file(&target, &dest)?;
        tracing::debug!(dest = %dest.display(), target = %target.display(), "linked asset");
        Ok(())
    }
}

async fn run_blocking<T, F>(source: &Path, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CompkitError::Encode {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?
}

fn encode_webp(source: &Path) -> Result<(u32, u32, Vec<u8>)> {
    let img = image::open(source)?;
    let (width, height) = (img.width(), img.height());
    // libwebp only accepts 8-bit RGB/RGBA input.
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder = webp::Encoder::from_image(&img).map_err(|reason| CompkitError::Encode {
        path: source.to_path_buf(),
        reason: reason.to_string(),
    })?;
    let data = encoder.encode(WEBP_QUALITY).to_vec();
    Ok((width, height, data))
}

fn source_format(source: &Path) -> String {
    match ImageFormat::from_path(source) {
        Ok(format) => format
            .extensions_str()
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_default(),
        Err(_) => source
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 90, 255]));
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[tokio::test]
    async fn missing_source_is_none() {
        let dir = TempDir::new().unwrap();
        let pipeline = AssetPipeline::new(BuildMode::Production, dir.path().join("out"));
        let result = pipeline
            .process("Button", dir.path(), "nope.png")
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn production_reencodes_to_webp() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("meta/icon.png");
        write_png(&source, 32, 24);

        let pipeline = AssetPipeline::new(BuildMode::Production, dir.path().join("out"));
        let meta = dir.path().join("meta");
        let processed = pipeline
            .process("Button", &meta, "icon.png")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            processed.info,
            ImageInfo {
                width: 32,
                height: 24,
                kind: "webp".to_string(),
                path: "assets/Button/icon.png".to_string(),
            }
        );
        let data = processed.encoded.unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WEBP");
        assert_ne!(data, std::fs::read(&source).unwrap());
        assert!(!dir.path().join("out").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn development_symlinks_to_source_idempotently() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("meta/hero.png");
        write_png(&source, 10, 5);
        let out = dir.path().join("out");

        let pipeline = AssetPipeline::new(BuildMode::Development, &out);
        let meta = dir.path().join("meta");
        let first = pipeline.process("Hero", &meta, "hero.png").await.unwrap().unwrap();
        assert!(first.encoded.is_none());
        assert_eq!(first.info.kind, "png");
        assert_eq!((first.info.width, first.info.height), (10, 5));

        let link = out.join("assets/Hero/hero.png");
        assert!(std::fs::symlink_metadata(&link)
            .unwrap()
            .file_type()
            .is_symlink());
        assert_eq!(
            std::fs::read_link(&link).unwrap(),
            std::fs::canonicalize(&source).unwrap()
        );

        // Second run must not fail on the existing link.
        pipeline.process("Hero", &meta, "hero.png").await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn corrupt_image_is_an_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"not an image").unwrap();
        let pipeline = AssetPipeline::new(BuildMode::Production, dir.path().join("out"));
        assert!(pipeline.process("Card", dir.path(), "broken.png").await.is_err());
    }

    #[tokio::test]
    async fn paths_outside_meta_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("secret.png"), 2, 2);
        let meta = dir.path().join("meta");
        std::fs::create_dir_all(&meta).unwrap();
        let pipeline = AssetPipeline::new(BuildMode::Production, dir.path().join("out"));
        let err = pipeline.process("Card", &meta, "../secret.png").await.unwrap_err();
        assert!(matches!(err, CompkitError::InvalidBuild(_)));
    }
}
