use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::GroundFilterError;
use crate::ground_filter::IterationReport;
use crate::point::Point;

/// Points are parsed in chunks of this size so memory does not scale with
/// file size beyond one chunk in flight (spec.md §6).
pub const ASCII_CHUNK_SIZE: usize = 100_000;

/// Parses a whitespace-separated ASCII point cloud. Accepted line arities are
/// 3 (`X Y Z`), 6 (`X Y Z R G B`), 7 (`X Y Z R G B is_ground`, the last field
/// ignored) and 9 (`X Y Z R G B nX nY nZ`, the last three ignored). Any other
/// arity is a fatal `InputFormat` error for the whole file — no output files
/// are written downstream (spec.md §7). `id`s are assigned densely starting
/// at 1 in input order.
pub fn load_points<P: AsRef<Path>>(path: P) -> Result<Vec<Point>, GroundFilterError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut points = Vec::new();
    let mut chunk = Vec::with_capacity(ASCII_CHUNK_SIZE);
    let mut id = 1u64;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let point = parse_point(id, &fields)?;
        chunk.push(point);
        id += 1;
        if chunk.len() == ASCII_CHUNK_SIZE {
            points.append(&mut chunk);
        }
    }
    points.append(&mut chunk);

    Ok(points)
}

fn parse_point(id: u64, fields: &[&str]) -> Result<Point, GroundFilterError> {
    match fields.len() {
        3 | 6 | 7 | 9 => {}
        n => {
            return Err(GroundFilterError::input_format(format!(
                "line has {} fields, expected 3, 6, 7 or 9",
                n
            )))
        }
    }

    let parse_f64 = |s: &str| -> Result<f64, GroundFilterError> {
        s.parse::<f64>()
            .map_err(|_| GroundFilterError::input_format(format!("could not parse '{}' as a float", s)))
    };
    let parse_u8 = |s: &str| -> Result<u8, GroundFilterError> {
        s.parse::<u8>()
            .map_err(|_| GroundFilterError::input_format(format!("could not parse '{}' as a byte", s)))
    };

    let x = parse_f64(fields[0])?;
    let y = parse_f64(fields[1])?;
    let z = parse_f64(fields[2])?;

    let (r, g, b) = if fields.len() >= 6 {
        (parse_u8(fields[3])?, parse_u8(fields[4])?, parse_u8(fields[5])?)
    } else {
        (0, 0, 0)
    };

    Ok(Point::new(id, x, y, z, r, g, b))
}

/// Writes the ground and not-ground partitions of `points` to
/// `<stem>_ground_points.txt` and `<stem>_not_ground_points.txt` beside
/// `stem_path`, in point-id order (spec.md §6). `is_active(i)` tells whether
/// `points[i]` belongs to the ground set.
pub fn write_scan<P: AsRef<Path>>(
    stem_path: P,
    points: &[Point],
    is_active: impl Fn(usize) -> bool,
) -> Result<(), GroundFilterError> {
    let stem_path = stem_path.as_ref();
    let ground_path = with_suffix(stem_path, "_ground_points.txt");
    let not_ground_path = with_suffix(stem_path, "_not_ground_points.txt");

    let mut ground_file = File::create(&ground_path)?;
    let mut not_ground_file = File::create(&not_ground_path)?;

    for (i, p) in points.iter().enumerate() {
        let line = format!("{} {} {} {} {} {}\n", p.x, p.y, p.z, p.r, p.g, p.b);
        if is_active(i) {
            ground_file.write_all(line.as_bytes())?;
        } else {
            not_ground_file.write_all(line.as_bytes())?;
        }
    }

    Ok(())
}

/// Appends one line per iteration to `<stem>_log.txt`, formatted per spec.md
/// §6. `MSE` and `Median` render as the literal string `null` when the
/// iteration was degenerate.
pub fn write_run_log<P: AsRef<Path>>(
    stem_path: P,
    reports: &[IterationReport],
) -> Result<(), GroundFilterError> {
    let log_path = with_suffix(stem_path.as_ref(), "_log.txt");
    let mut file = File::options().create(true).append(true).open(&log_path)?;

    for report in reports {
        let mse = report
            .mse_data
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "null".to_string());
        let median = report
            .median
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "null".to_string());
        let line = format!(
            "N:{}\tvm_name:{}\tscan_len:{}\tMSE:{}\tMedian:{}\n",
            report.iteration + 1,
            report.grid_id,
            report.active_count,
            mse,
            median
        );
        file.write_all(line.as_bytes())?;
    }

    Ok(())
}

fn with_suffix(stem_path: &Path, suffix: &str) -> std::path::PathBuf {
    let stem = stem_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let dir = stem_path.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("{}{}", stem, suffix))
}
