//! # Parallel Sampling
//!
//! $$
//! \{x_k\}_{k=1}^{N}=\bigcup_{c=0}^{\lceil N/B\rceil-1}\{x_k\}_{k\in\text{chunk}_c}
//! $$
//!
//! Trials are split into fixed-size chunks, each with its own RNG derived from the base seed,
//! so the output only depends on `(seed, chunk_size)` and never on the thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use super::budget::Deadline;
use crate::error::Result;

fn chunk_seed(seed: u64, chunk: usize) -> u64 {
  seed ^ (chunk as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Draw `total` samples with `draw`, chunk by chunk across the rayon pool.
///
/// The deadline is checked before each chunk starts.
pub(crate) fn sample_chunks<T, F>(
  total: usize,
  chunk_size: usize,
  seed: u64,
  deadline: &Deadline,
  draw: F,
) -> Result<Vec<T>>
where
  T: Send,
  F: Fn(&mut StdRng) -> T + Sync + Send,
{
  let chunk_size = chunk_size.max(1);
  let n_chunks = total.div_ceil(chunk_size);

  let chunks = (0..n_chunks)
    .into_par_iter()
    .map(|c| {
      deadline.check()?;
      let len = chunk_size.min(total - c * chunk_size);
      let mut rng = StdRng::seed_from_u64(chunk_seed(seed, c));
      Ok((0..len).map(|_| draw(&mut rng)).collect::<Vec<T>>())
    })
    .collect::<Result<Vec<_>>>()?;

  Ok(chunks.into_iter().flatten().collect())
}
