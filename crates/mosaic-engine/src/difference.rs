//! Novelty score between two chunks.

use image::{GenericImageView, Rgb};

use crate::types::{Dimensions, MirrorError};

/// Largest possible per-sample difference.
const MAX_SAMPLE: f64 = 255.0;

/// Mean absolute per-sample difference between two equally shaped
/// chunks, normalized to `[0, 1]`.
///
/// `0.0` means pixel-identical; `1.0` means every sample differs by the
/// full range (e.g. black against white). The score is symmetric.
///
/// # Errors
///
/// Returns [`MirrorError::ShapeMismatch`] if the chunks differ in size.
pub fn chunk_difference<A, B>(a: &A, b: &B) -> Result<f64, MirrorError>
where
    A: GenericImageView<Pixel = Rgb<u8>>,
    B: GenericImageView<Pixel = Rgb<u8>>,
{
    let expected = Dimensions::of(a);
    let actual = Dimensions::of(b);
    if expected != actual {
        return Err(MirrorError::ShapeMismatch { expected, actual });
    }

    let samples = expected.pixel_count() * 3;
    if samples == 0 {
        return Ok(0.0);
    }

    let mut total: u64 = 0;
    for y in 0..expected.height {
        for x in 0..expected.width {
            let Rgb(pa) = a.get_pixel(x, y);
            let Rgb(pb) = b.get_pixel(x, y);
            total += pa
                .iter()
                .zip(&pb)
                .map(|(&sa, &sb)| u64::from(sa.abs_diff(sb)))
                .sum::<u64>();
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let mean = total as f64 / samples as f64;
    Ok(mean / MAX_SAMPLE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RgbImage;

    fn gradient(size: u32, offset: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 13 + y * 29 + offset) % 256) as u8;
            Rgb([v, 255 - v, v / 3])
        })
    }

    #[test]
    fn identical_chunks_score_zero() {
        let a = gradient(16, 0);
        assert!(chunk_difference(&a, &a).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn black_and_white_score_one() {
        let black = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
        let white = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let score = chunk_difference(&black, &white).unwrap();
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_is_symmetric_and_bounded() {
        for offset in [1, 7, 64, 200] {
            let a = gradient(12, 0);
            let b = gradient(12, offset);
            let ab = chunk_difference(&a, &b).unwrap();
            let ba = chunk_difference(&b, &a).unwrap();
            assert!((ab - ba).abs() < f64::EPSILON);
            assert!((0.0..=1.0).contains(&ab), "score {ab} out of range");
        }
    }

    #[test]
    fn known_mean_difference() {
        // Every sample differs by 51 -> 51 / 255 = 0.2.
        let a = RgbImage::from_pixel(3, 5, Rgb([100, 100, 100]));
        let b = RgbImage::from_pixel(3, 5, Rgb([151, 49, 151]));
        let score = chunk_difference(&a, &b).unwrap();
        assert!((score - 0.2).abs() < 1e-12);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let a = RgbImage::new(4, 4);
        let b = RgbImage::new(4, 5);
        let result = chunk_difference(&a, &b);
        assert!(matches!(
            result,
            Err(MirrorError::ShapeMismatch { expected, actual })
                if expected == Dimensions::square(4) && actual == Dimensions::new(4, 5)
        ));
    }

    #[test]
    fn works_on_borrowed_views() {
        let frame = gradient(20, 0);
        let view = image::imageops::crop_imm(&frame, 4, 4, 8, 8);
        let copy = view.to_image();
        assert!(chunk_difference(&*view, &copy).unwrap().abs() < f64::EPSILON);
    }
}
