pub mod ascii;

pub use ascii::{load_points, write_run_log, write_scan, ASCII_CHUNK_SIZE};
