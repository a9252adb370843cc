//! # Rendition Regeneration
//!
//! Dopo un restore le size generate vanno ricreate dall'originale
//! ripristinato. Il collaboratore riceve `optimize_on_upload`: il restore
//! passa sempre `false`, così le nuove size non vengono ri-ottimizzate
//! automaticamente.
//!
//! `ImageRenditionGenerator` usa il crate `image` e nomina i file come
//! `<stem>-<larghezza>x<altezza>.<ext>` accanto all'originale.

use crate::attachment::{Attachment, Rendition};
use crate::config::RenditionSize;
use crate::error::{OptimizeError, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use image::GenericImageView;
use std::path::Path;
use tracing::debug;

/// Re-derives an attachment's renditions from its original file
#[async_trait]
pub trait RenditionGenerator: Send + Sync {
    async fn regenerate(&self, attachment: &Attachment, optimize_on_upload: bool) -> Result<Vec<Rendition>>;
}

/// Resizes the original with the `image` crate
pub struct ImageRenditionGenerator {
    sizes: Vec<RenditionSize>,
}

impl ImageRenditionGenerator {
    pub fn new(sizes: Vec<RenditionSize>) -> Self {
        Self { sizes }
    }

    fn generate(original: &Path, sizes: &[RenditionSize]) -> Result<Vec<Rendition>> {
        let source = image::open(original)?;
        let (width, height) = source.dimensions();

        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| OptimizeError::State(format!("Invalid file name: {}", original.display())))?;
        let ext = original
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = original.parent().unwrap_or_else(|| Path::new(""));

        let mut renditions = Vec::new();
        for size in sizes {
            // Never upscale
            if width <= size.width && height <= size.height {
                continue;
            }

            let resized = if size.crop {
                source.resize_to_fill(size.width, size.height, FilterType::Lanczos3)
            } else {
                source.resize(size.width, size.height, FilterType::Lanczos3)
            };

            let file = format!("{}-{}x{}.{}", stem, resized.width(), resized.height(), ext);
            resized.save(dir.join(&file))?;
            debug!("Generated {} ({})", file, size.label);
            renditions.push(Rendition::new(size.label.clone(), file));
        }

        Ok(renditions)
    }
}

#[async_trait]
impl RenditionGenerator for ImageRenditionGenerator {
    async fn regenerate(&self, attachment: &Attachment, optimize_on_upload: bool) -> Result<Vec<Rendition>> {
        debug!(
            "Regenerating sizes of attachment {} (optimize on upload: {})",
            attachment.id, optimize_on_upload
        );

        let original = attachment.file.clone();
        let sizes = self.sizes.clone();
        tokio::task::spawn_blocking(move || Self::generate(&original, &sizes))
            .await
            .map_err(|e| OptimizeError::State(format!("Regeneration task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attachment::AttachmentId;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_regenerates_smaller_sizes_only() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("photo.png");
        ImageBuffer::from_pixel(400, 200, Rgb([200u8, 10, 10])).save(&original).unwrap();

        let generator = ImageRenditionGenerator::new(vec![
            RenditionSize::new("thumbnail", 50, 50, true),
            RenditionSize::new("medium", 100, 100, false),
            RenditionSize::new("large", 1024, 1024, false),
        ]);
        let attachment = Attachment::new(AttachmentId(1), &original, "");

        let renditions = generator.regenerate(&attachment, false).await.unwrap();

        assert_eq!(
            renditions,
            vec![
                Rendition::new("thumbnail", "photo-50x50.png"),
                Rendition::new("medium", "photo-100x50.png"),
            ]
        );
        assert!(temp_dir.path().join("photo-50x50.png").exists());
        assert!(temp_dir.path().join("photo-100x50.png").exists());
    }

    #[tokio::test]
    async fn test_unreadable_original_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let original = temp_dir.path().join("broken.png");
        std::fs::write(&original, b"not an image").unwrap();

        let generator = ImageRenditionGenerator::new(vec![RenditionSize::new("thumbnail", 50, 50, true)]);
        let result = generator
            .regenerate(&Attachment::new(AttachmentId(1), &original, ""), false)
            .await;

        assert!(result.is_err());
    }
}
