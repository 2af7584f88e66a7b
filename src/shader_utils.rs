//! Hash-based randomness shared by the compute shader and the host kernel.
//!
//! The WGSL in [`RANDOM_WGSL`] and the Rust functions below compute the same
//! values bit for bit, so a particle spawned on the GPU can be reproduced on
//! the CPU.
//!
//! - `hash(n: u32) -> u32` - integer avalanche hash
//! - `hash2(p: vec2<u32>) -> u32` - hash of two words
//! - `rand(seed: u32) -> f32` - uniform float in `[0, 1)`
//! - `rand_range(seed: u32, min: f32, max: f32) -> f32` - uniform float in `[min, max]`

/// WGSL code for random/hash functions.
pub const RANDOM_WGSL: &str = r#"
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn hash2(p: vec2<u32>) -> u32 {
    return hash(p.x + hash(p.y));
}

// Top 24 bits, exactly representable: never reaches 1.0.
fn rand(seed: u32) -> f32 {
    return f32(hash(seed) >> 8u) / 16777216.0;
}

fn rand_range(seed: u32, min_val: f32, max_val: f32) -> f32 {
    return min_val + rand(seed) * (max_val - min_val);
}
"#;

#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

#[inline]
pub fn hash2(a: u32, b: u32) -> u32 {
    hash(a.wrapping_add(hash(b)))
}

#[inline]
pub fn rand(seed: u32) -> f32 {
    (hash(seed) >> 8) as f32 / 16_777_216.0
}

#[inline]
pub fn rand_range(seed: u32, min: f32, max: f32) -> f32 {
    min + rand(seed) * (max - min)
}
