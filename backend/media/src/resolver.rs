//! Content files on disk.
//!
//! Layout under the images directory:
//! - `quran_pages/0001.jpg` .. `quran_pages/0604.jpg`
//! - `bakarah_qiyam/001.jpg` ..
//! - `azkar/{morning_azkar,evening_azkar,surah_mulk}.jpg`
//!
//! and `surah_kahf.pdf` under the PDF directory. Images may be jpg, png or jpeg.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use wird_core::{ContentAsset, ContentBlob, ContentResolver, WirdError, WirdResult};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "png", "jpeg"];

pub struct FsContentResolver {
    images_dir: PathBuf,
    pdf_dir: PathBuf,
}

impl FsContentResolver {
    pub fn new(images_dir: impl Into<PathBuf>, pdf_dir: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: images_dir.into(),
            pdf_dir: pdf_dir.into(),
        }
    }

    /// Paths tried for `asset`, in order.
    pub fn candidates(&self, asset: ContentAsset) -> Vec<PathBuf> {
        let stem = match asset {
            ContentAsset::SurahKahf => return vec![self.pdf_dir.join("surah_kahf.pdf")],
            ContentAsset::QuranPage(n) => self.images_dir.join("quran_pages").join(format!("{n:04}")),
            ContentAsset::BaqarahPage(n) => {
                self.images_dir.join("bakarah_qiyam").join(format!("{n:03}"))
            }
            ContentAsset::MorningAzkar => self.images_dir.join("azkar").join("morning_azkar"),
            ContentAsset::EveningAzkar => self.images_dir.join("azkar").join("evening_azkar"),
            ContentAsset::SurahMulk => self.images_dir.join("azkar").join("surah_mulk"),
        };
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| stem.with_extension(ext))
            .collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl ContentResolver for FsContentResolver {
    async fn resolve(&self, asset: ContentAsset) -> WirdResult<Option<ContentBlob>> {
        for path in self.candidates(asset) {
            match tokio::fs::read(&path).await {
                Ok(data) => {
                    debug!(%asset, path = %path.display(), bytes = data.len(), "Resolved content");
                    return Ok(Some(ContentBlob::new(file_name(&path), data)));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(%asset, path = %path.display(), error = %e, "Failed to read content file");
                    return Err(WirdError::MissingContent(format!("{}: {e}", path.display())));
                }
            }
        }
        debug!(%asset, "Content not installed");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, FsContentResolver) {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        let pdfs = dir.path().join("pdfs");
        for sub in ["quran_pages", "bakarah_qiyam", "azkar"] {
            std::fs::create_dir_all(images.join(sub)).unwrap();
        }
        std::fs::create_dir_all(&pdfs).unwrap();
        let resolver = FsContentResolver::new(images, pdfs);
        (dir, resolver)
    }

    #[tokio::test]
    async fn resolves_padded_page_keys() {
        let (dir, resolver) = setup();
        let images = dir.path().join("images");
        std::fs::write(images.join("quran_pages/0007.png"), b"q7").unwrap();
        std::fs::write(images.join("bakarah_qiyam/011.jpeg"), b"b11").unwrap();

        let q = resolver.resolve(ContentAsset::QuranPage(7)).await.unwrap().unwrap();
        assert_eq!(q.file_name, "0007.png");
        assert_eq!(&q.data[..], b"q7");

        let b = resolver.resolve(ContentAsset::BaqarahPage(11)).await.unwrap().unwrap();
        assert_eq!(b.file_name, "011.jpeg");
    }

    #[tokio::test]
    async fn prefers_jpg_over_png() {
        let (dir, resolver) = setup();
        let azkar = dir.path().join("images/azkar");
        std::fs::write(azkar.join("surah_mulk.png"), b"png").unwrap();
        std::fs::write(azkar.join("surah_mulk.jpg"), b"jpg").unwrap();

        let blob = resolver.resolve(ContentAsset::SurahMulk).await.unwrap().unwrap();
        assert_eq!(&blob.data[..], b"jpg");
    }

    #[tokio::test]
    async fn missing_assets_are_none() {
        let (dir, resolver) = setup();
        assert!(resolver.resolve(ContentAsset::QuranPage(1)).await.unwrap().is_none());
        assert!(resolver.resolve(ContentAsset::SurahKahf).await.unwrap().is_none());

        std::fs::write(dir.path().join("pdfs/surah_kahf.pdf"), b"%PDF").unwrap();
        let pdf = resolver.resolve(ContentAsset::SurahKahf).await.unwrap().unwrap();
        assert_eq!(pdf.file_name, "surah_kahf.pdf");
    }
}
