//! Non-negative matrix factorization minimizing the beta-divergence family
//! (Itakura-Saito, Kullback-Leibler, Euclidean, and the generic exponent)
//! with multiplicative update rules.

pub mod config;
pub mod divergence;
pub mod nmf;

// Re-exports for convenience
pub use config::Config;
pub use divergence::beta_divergence;
pub use nmf::{beta_nmf, beta_nmf_schedule, NmfError, UpdateMode};
