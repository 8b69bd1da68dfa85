use image_hasher::{HashAlg, HasherConfig, ImageHash};

use crate::error::GhostError;

/// DCT-preprocessed mean hash of an encoded frame (PNG, JPEG, ...), base64 encoded.
pub fn compute_phash(frame: &[u8]) -> Result<String, GhostError> {
    let img = image::load_from_memory(frame)?;
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .preproc_dct()
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&img);
    Ok(hash.to_base64())
}

/// Bit distance between two hashes; unparseable input counts as maximally different.
pub fn compute_hamming_distance(lhs: &str, rhs: &str) -> u32 {
    let Ok(h1) = ImageHash::<Vec<u8>>::from_base64(lhs) else {
        return u32::MAX;
    };
    let Ok(h2) = ImageHash::<Vec<u8>>::from_base64(rhs) else {
        return u32::MAX;
    };
    h1.dist(&h2)
}
