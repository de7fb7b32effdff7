pub const BOOTSTRAP_ITERS: usize = 1000;
pub const BLOCK_SIZE: usize = 2;
pub const MIN_BIN_SIZE: usize = 10;
pub const SIMPLEX_TOLERANCE: f64 = 1e-6;
pub const RANK_TOLERANCE: f64 = 1e-10;
