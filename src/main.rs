use std::env;
use std::error::Error;
use std::fs::File;
use std::process;

use log::{error, info, LevelFilter};
use ndarray::{Array1, Array2};
use ndarray_npy::WriteNpyExt;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use beta_nmf::{beta_nmf, Config, UpdateMode};

// Inputs are floored to this value so the multiplicative updates never divide
// by an exact zero.
const POSITIVITY_FLOOR: f64 = 1e-6;

fn timestamp() -> String {
    // Get the current time
    chrono::Local::now().format("%H:%M:%S").to_string()
}

fn decompose(config: &Config) -> Result<(), Box<dyn Error>> {
    let v = config.get_matrix().mapv(|e| e.max(POSITIVITY_FLOOR));
    let (f, n) = v.dim();
    let r = config.get_rank();
    info!(
        "[{}] loaded {}x{} matrix, rank {}, beta {}",
        timestamp(),
        f,
        n,
        r,
        config.get_beta()
    );

    let mut w: Array2<f64> = Array2::random((f, r), Uniform::new(0.0, 1.0));
    let mut h: Array2<f64> = Array2::random((r, n), Uniform::new(0.0, 1.0));

    let cost = beta_nmf(
        &v,
        config.get_beta(),
        config.get_num_iterations(),
        UpdateMode::UpdateBoth,
        &mut w,
        &mut h,
    )?;
    info!(
        "[{}] divergence {:.4} -> {:.4} after {} iterations",
        timestamp(),
        cost[0],
        cost[cost.len() - 1],
        config.get_num_iterations()
    );

    write_outputs(&w, &h, &cost)?;
    info!("[{}] wrote w.npy, h.npy, cost.npy", timestamp());
    Ok(())
}

fn write_outputs(
    w: &Array2<f64>,
    h: &Array2<f64>,
    cost: &Array1<f64>,
) -> Result<(), Box<dyn Error>> {
    w.write_npy(File::create("w.npy")?)?;
    h.write_npy(File::create("h.npy")?)?;
    cost.write_npy(File::create("cost.npy")?)?;
    Ok(())
}

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .expect("Failed to initialize logger");

    let config = match Config::new(env::args()) {
        Ok(config) => config,
        Err(e) => {
            error!("usage: beta_nmf <matrix.npy> <rank> <beta> <iterations> ({})", e);
            process::exit(1);
        }
    };

    if let Err(e) = decompose(&config) {
        error!("decomposition failed: {}", e);
        process::exit(1);
    }
}
