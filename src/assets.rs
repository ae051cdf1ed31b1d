use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::error::AssetError;
use crate::geometry::{BoundingBox, Point};
use crate::render::ScanImage;
use crate::RoundId;

/// Annotations are authored against a 512x512 scan
pub const REFERENCE_RESOLUTION: f64 = 512.0;

/// Raw data for one round, in reference-resolution coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RoundAssets {
    pub image: ScanImage,
    pub truth: BoundingBox,
    pub predicted: BoundingBox,
}

impl RoundAssets {
    /// Rescale everything from the reference resolution to the canvas
    pub fn scaled_to(&self, canvas_size: f64) -> Self {
        let factor = canvas_size / REFERENCE_RESOLUTION;
        Self {
            image: self.image.scale(factor),
            truth: self.truth.scale(factor),
            predicted: self.predicted.scale(factor),
        }
    }
}

/// Source of round images and annotations
pub trait AssetProvider: Send + Sync {
    fn load_round(&self, id: RoundId) -> Result<RoundAssets, AssetError>;
}

#[derive(Debug, Deserialize)]
struct Annotation {
    truth: Vec<f64>,
    predicted: Vec<f64>,
}

fn parse_box(id: RoundId, field: &str, raw: &[f64]) -> Result<BoundingBox, AssetError> {
    let malformed = |reason: String| AssetError::Malformed { id, reason };

    let [x_min, y_min, x_max, y_max] = raw else {
        return Err(malformed(format!(
            "`{field}` needs 4 coordinates, found {}",
            raw.len()
        )));
    };
    if raw.iter().any(|v| !v.is_finite()) {
        return Err(malformed(format!("`{field}` has a non-finite coordinate")));
    }
    if x_min > x_max || y_min > y_max {
        return Err(malformed(format!("`{field}` corners are out of order")));
    }
    Ok(BoundingBox::new(*x_min, *y_min, *x_max, *y_max))
}

/// Rounds stored as `annotation/{id}.json` plus `images/{id}.png`
#[derive(Debug, Clone)]
pub struct FsAssetProvider {
    root: PathBuf,
}

impl FsAssetProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn annotation_path(&self, id: RoundId) -> PathBuf {
        self.root.join("annotation").join(format!("{id}.json"))
    }

    pub fn image_path(&self, id: RoundId) -> PathBuf {
        self.root.join("images").join(format!("{id}.png"))
    }
}

impl AssetProvider for FsAssetProvider {
    fn load_round(&self, id: RoundId) -> Result<RoundAssets, AssetError> {
        let image = self.image_path(id);
        if !image.exists() {
            return Err(AssetError::NotFound(id));
        }

        let bytes = fs::read(self.annotation_path(id)).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                AssetError::NotFound(id)
            } else {
                AssetError::Io { id, source }
            }
        })?;

        let annotation: Annotation =
            serde_json::from_slice(&bytes).map_err(|e| AssetError::Malformed {
                id,
                reason: e.to_string(),
            })?;

        Ok(RoundAssets {
            image: ScanImage::File(image),
            truth: parse_box(id, "truth", &annotation.truth)?,
            predicted: parse_box(id, "predicted", &annotation.predicted)?,
        })
    }
}

const BACKGROUND_SPECKLE: usize = 700;
const LESION_SPECKLE: usize = 160;
const MIN_LESION_SIDE: f64 = 40.0;
const MAX_LESION_SIDE: f64 = 120.0;

/// Generates a deterministic scan per round id so the game is playable
/// without a content pack
#[derive(Debug, Clone, Copy)]
pub struct SyntheticAssetProvider {
    seed: u64,
    pool_size: u32,
}

impl SyntheticAssetProvider {
    pub fn new(seed: u64, pool_size: u32) -> Self {
        Self { seed, pool_size }
    }

    fn random_box(rng: &mut StdRng) -> BoundingBox {
        let w = rng.gen_range(MIN_LESION_SIDE..=MAX_LESION_SIDE);
        let h = rng.gen_range(MIN_LESION_SIDE..=MAX_LESION_SIDE);
        let x = rng.gen_range(0.0..REFERENCE_RESOLUTION - w);
        let y = rng.gen_range(0.0..REFERENCE_RESOLUTION - h);
        BoundingBox::new(x, y, x + w, y + h)
    }

    fn prediction(rng: &mut StdRng, truth: &BoundingBox) -> BoundingBox {
        if rng.gen_bool(0.7) {
            let jitter = truth.width().min(truth.height()) * 0.25;
            let dx = rng.gen_range(-jitter..=jitter);
            let dy = rng.gen_range(-jitter..=jitter);
            let grow = rng.gen_range(-jitter..=jitter) / 2.0;
            BoundingBox::new(
                (truth.x_min + dx - grow).max(0.0),
                (truth.y_min + dy - grow).max(0.0),
                (truth.x_max + dx + grow).min(REFERENCE_RESOLUTION),
                (truth.y_max + dy + grow).min(REFERENCE_RESOLUTION),
            )
        } else {
            Self::random_box(rng)
        }
    }

    fn speckle(rng: &mut StdRng, lesion: &BoundingBox) -> Vec<Point> {
        let mut points = Vec::with_capacity(BACKGROUND_SPECKLE + LESION_SPECKLE);
        for _ in 0..BACKGROUND_SPECKLE {
            points.push(Point::new(
                rng.gen_range(0.0..REFERENCE_RESOLUTION),
                rng.gen_range(0.0..REFERENCE_RESOLUTION),
            ));
        }

        // dense cluster inside the lesion ellipse
        let center = lesion.center();
        let (rx, ry) = (lesion.width() / 2.0, lesion.height() / 2.0);
        while points.len() < BACKGROUND_SPECKLE + LESION_SPECKLE {
            let u: f64 = rng.gen_range(-1.0..=1.0);
            let v: f64 = rng.gen_range(-1.0..=1.0);
            if u * u + v * v <= 1.0 {
                points.push(center.offset(u * rx, v * ry));
            }
        }
        points
    }
}

impl AssetProvider for SyntheticAssetProvider {
    fn load_round(&self, id: RoundId) -> Result<RoundAssets, AssetError> {
        if id >= self.pool_size {
            return Err(AssetError::NotFound(id));
        }

        let mut rng = StdRng::seed_from_u64(self.seed ^ u64::from(id));
        let truth = Self::random_box(&mut rng);
        let predicted = Self::prediction(&mut rng, &truth);
        let image = ScanImage::Speckle(Self::speckle(&mut rng, &truth));

        Ok(RoundAssets {
            image,
            truth,
            predicted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    fn write_round(root: &Path, id: RoundId, annotation: &str) {
        fs::create_dir_all(root.join("annotation")).unwrap();
        fs::create_dir_all(root.join("images")).unwrap();
        fs::write(root.join("annotation").join(format!("{id}.json")), annotation).unwrap();
        fs::write(root.join("images").join(format!("{id}.png")), b"png").unwrap();
    }

    #[test]
    fn test_fs_provider_loads_round() {
        let dir = tempdir().unwrap();
        write_round(
            dir.path(),
            4,
            r#"{"truth":[100,100,200,200],"predicted":[110,110,210,210]}"#,
        );

        let provider = FsAssetProvider::new(dir.path());
        let assets = provider.load_round(4).unwrap();

        assert_eq!(assets.truth, BoundingBox::new(100.0, 100.0, 200.0, 200.0));
        assert_eq!(
            assets.predicted,
            BoundingBox::new(110.0, 110.0, 210.0, 210.0)
        );
        assert_eq!(assets.image, ScanImage::File(provider.image_path(4)));
    }

    #[test]
    fn test_fs_provider_missing_round() {
        let dir = tempdir().unwrap();
        let provider = FsAssetProvider::new(dir.path());
        assert_matches!(provider.load_round(9), Err(AssetError::NotFound(9)));
    }

    #[test]
    fn test_fs_provider_rejects_malformed_annotations() {
        let dir = tempdir().unwrap();
        write_round(dir.path(), 1, r#"{"truth":[1,2,3],"predicted":[0,0,1,1]}"#);
        write_round(dir.path(), 2, r#"{"truth":[50,0,10,10],"predicted":[0,0,1,1]}"#);
        write_round(dir.path(), 3, "not json");

        let provider = FsAssetProvider::new(dir.path());
        for id in 1..=3 {
            assert_matches!(
                provider.load_round(id),
                Err(AssetError::Malformed { id: got, .. }) if got == id
            );
        }
    }

    #[test]
    fn test_scaled_to_canvas() {
        let assets = RoundAssets {
            image: ScanImage::Speckle(vec![Point::new(512.0, 0.0)]),
            truth: BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            predicted: BoundingBox::new(0.0, 0.0, 512.0, 512.0),
        };
        let scaled = assets.scaled_to(256.0);
        assert_eq!(scaled.truth, BoundingBox::new(50.0, 50.0, 100.0, 100.0));
        assert_eq!(scaled.predicted, BoundingBox::new(0.0, 0.0, 256.0, 256.0));
        assert_eq!(
            scaled.image,
            ScanImage::Speckle(vec![Point::new(256.0, 0.0)])
        );
    }

    #[test]
    fn test_synthetic_provider_is_deterministic() {
        let provider = SyntheticAssetProvider::new(42, 101);
        assert_eq!(provider.load_round(5).unwrap(), provider.load_round(5).unwrap());
        assert_ne!(
            provider.load_round(5).unwrap().truth,
            provider.load_round(6).unwrap().truth
        );
    }

    #[test]
    fn test_synthetic_boxes_are_well_formed() {
        let provider = SyntheticAssetProvider::new(7, 101);
        for id in 0..101 {
            let assets = provider.load_round(id).unwrap();
            for b in [assets.truth, assets.predicted] {
                assert!(b.x_min <= b.x_max && b.y_min <= b.y_max);
                assert!(b.x_min >= 0.0 && b.x_max <= REFERENCE_RESOLUTION);
                assert!(b.y_min >= 0.0 && b.y_max <= REFERENCE_RESOLUTION);
            }
            match assets.image {
                ScanImage::Speckle(points) => {
                    assert_eq!(points.len(), BACKGROUND_SPECKLE + LESION_SPECKLE)
                }
                ScanImage::File(_) => panic!("synthetic scans are speckle"),
            }
        }
    }

    #[test]
    fn test_synthetic_provider_pool_bounds() {
        let provider = SyntheticAssetProvider::new(1, 101);
        assert!(provider.load_round(100).is_ok());
        assert_matches!(provider.load_round(101), Err(AssetError::NotFound(101)));
    }
}
