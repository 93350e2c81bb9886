use std::error::Error;
use std::fs::File;

use ndarray::Array2;
use ndarray_npy::ReadNpyExt;

/// Command-line settings for the decomposition binary.
pub struct Config {
    // matrix to decompose, loaded from a .npy file
    matrix: Array2<f64>,
    // number of basis components
    rank: usize,
    // divergence exponent
    beta: f64,
    // fixed iteration count
    num_iterations: usize,
}

impl Config {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/spectrogram.npy 16 1.0 100
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> Result<Config, Box<dyn Error>> {
        // args:
        // 0: program name
        // 1: matrix path (.npy)
        // 2: rank
        // 3: beta
        // 4: iterations
        args.next();
        let path = args.next().ok_or("missing matrix path")?;
        let reader = File::open(path)?;
        let matrix = Array2::<f64>::read_npy(reader)?;
        let rank = args.next().ok_or("missing rank")?.parse::<usize>()?;
        let beta = args.next().ok_or("missing beta")?.parse::<f64>()?;
        let num_iterations = args
            .next()
            .ok_or("missing iteration count")?
            .parse::<usize>()?;

        Ok(Config {
            matrix,
            rank,
            beta,
            num_iterations,
        })
    }

    pub fn get_matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn get_rank(&self) -> usize {
        self.rank
    }

    pub fn get_beta(&self) -> f64 {
        self.beta
    }

    pub fn get_num_iterations(&self) -> usize {
        self.num_iterations
    }
}
