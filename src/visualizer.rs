use rand::Rng;

const FLOOR: f32 = 0.2;
const SPAN: f32 = 0.8;

/// Placeholder visualization signal: fresh random band magnitudes per tick.
///
/// This is not derived from the audio in any way.
#[derive(Debug, Clone)]
pub struct SyntheticEnvelope {
    bands: usize,
}

impl SyntheticEnvelope {
    pub fn new(bands: usize) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// The resting envelope shown when nothing plays.
    pub fn neutral(&self) -> Vec<f32> {
        vec![0.0; self.bands]
    }

    /// Magnitudes in `[0.2, 1.0)`.
    pub fn sample(&self) -> Vec<f32> {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        (0..self.bands)
            .map(|_| rng.gen::<f32>() * SPAN + FLOOR)
            .collect()
    }
}
