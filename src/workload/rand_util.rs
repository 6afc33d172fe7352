use rand::Rng;
use rand::rngs::SmallRng;

const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Run-time constants `C` of the non-uniform random function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NuRandConstants {
    pub c_last: i64,
    pub c_id: i64,
    pub ol_i_id: i64,
}

impl NuRandConstants {
    pub fn random(rng: &mut SmallRng) -> Self {
        Self {
            c_last: rng.gen_range(0..=255),
            c_id: rng.gen_range(0..=1023),
            ol_i_id: rng.gen_range(0..=8191),
        }
    }
}

/// `NURand(A, x, y)`: skewed integer in `[x, y]`.
pub fn nurand(rng: &mut SmallRng, a: i64, x: i64, y: i64, c: i64) -> i64 {
    (((rng.gen_range(0..=a) | rng.gen_range(x..=y)) + c) % (y - x + 1)) + x
}

/// Random letters, length in `[min, max]`.
pub fn astring(rng: &mut SmallRng, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    (0..len)
        .map(|_| ALPHA[rng.gen_range(0..ALPHA.len())] as char)
        .collect()
}

/// Random digits, length in `[min, max]`.
pub fn nstring(rng: &mut SmallRng, min: usize, max: usize) -> String {
    let len = rng.gen_range(min..=max);
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_nurand_stays_in_range() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..1_000 {
            let v = nurand(&mut rng, 1023, 1, 30, 259);
            assert!((1..=30).contains(&v));
        }
    }

    #[test]
    fn test_string_lengths() {
        let mut rng = SmallRng::seed_from_u64(2);
        let s = astring(&mut rng, 3, 5);
        assert!((3..=5).contains(&s.len()));
        assert!(s.chars().all(|c| c.is_ascii_alphabetic()));
        let n = nstring(&mut rng, 4, 4);
        assert_eq!(n.len(), 4);
        assert!(n.chars().all(|c| c.is_ascii_digit()));
    }
}
