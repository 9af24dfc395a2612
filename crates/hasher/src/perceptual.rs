use image::DynamicImage;
use image::imageops::FilterType;
use std::f64::consts::PI;

const DCT_SIZE: usize = 32;
const HASH_SIZE: usize = 8;

/// 64-bit DCT hash: bit `i` is set when low-frequency coefficient `i` (row
/// major, 8×8 block including DC) is above the block's median.
pub fn perceptual_hash(img: &DynamicImage) -> u64 {
    let gray = img.resize_exact(DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Triangle).into_luma8();
    let pixels: Vec<f64> = gray.pixels().map(|p| f64::from(p.0[0])).collect();

    // Separable DCT-II, keeping only the first HASH_SIZE frequencies per axis.
    let cosines: Vec<f64> = (0..HASH_SIZE)
        .flat_map(|k| (0..DCT_SIZE).map(move |n| ((PI / DCT_SIZE as f64) * (n as f64 + 0.5) * k as f64).cos()))
        .collect();
    let mut rows = vec![0.0; DCT_SIZE * HASH_SIZE];
    for y in 0..DCT_SIZE {
        for k in 0..HASH_SIZE {
            rows[y * HASH_SIZE + k] = (0..DCT_SIZE).map(|x| pixels[y * DCT_SIZE + x] * cosines[k * DCT_SIZE + x]).sum();
        }
    }
    let mut block = [0.0; HASH_SIZE * HASH_SIZE];
    for v in 0..HASH_SIZE {
        for u in 0..HASH_SIZE {
            block[v * HASH_SIZE + u] = (0..DCT_SIZE).map(|y| rows[y * HASH_SIZE + u] * cosines[v * DCT_SIZE + y]).sum();
        }
    }

    let mut sorted = block;
    sorted.sort_by(f64::total_cmp);
    let median = (sorted[31] + sorted[32]) / 2.0;
    block.iter().enumerate().fold(0u64, |hash, (i, c)| if *c > median { hash | (1u64 << i) } else { hash })
}

/// 64-bit gradient hash: bit `i` is set when a pixel is brighter than its
/// right-hand neighbour on a 9×8 thumbnail.
pub fn difference_hash(img: &DynamicImage) -> u64 {
    let gray = img.resize_exact(HASH_SIZE as u32 + 1, HASH_SIZE as u32, FilterType::Triangle).into_luma8();
    let mut hash = 0u64;
    for y in 0..HASH_SIZE as u32 {
        for x in 0..HASH_SIZE as u32 {
            if gray.get_pixel(x, y).0[0] > gray.get_pixel(x + 1, y).0[0] {
                hash |= 1u64 << (y * HASH_SIZE as u32 + x);
            }
        }
    }
    hash
}

/// Number of differing bits between two hex-encoded 64-bit hashes, or `None`
/// if either is not valid hex.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    let a = u64::from_str_radix(a, 16).ok()?;
    let b = u64::from_str_radix(b, 16).ok()?;
    Some((a ^ b).count_ones())
}
