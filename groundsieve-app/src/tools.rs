use serde::Serialize;
use std::io::{Error, ErrorKind};
use std::time::Instant;

use groundsieve_common::utils::{get_formatted_elapsed_time, percent_complete};
use groundsieve_lidar::ground_filter::{GroundFilter, GroundFilterParams};
use groundsieve_lidar::io::{load_points, write_run_log, write_scan};
use groundsieve_lidar::point::PointStore;

/// Self-describing parameter metadata, in the style of `whitebox-tools`'
/// `ToolParameter` — each entry names its flags, type and default so a future
/// dialog or `--toolparameters` style introspection can be built over it
/// without re-deriving the CLI's own parsing rules.
#[derive(Serialize, Debug)]
pub struct ToolParameter {
    pub name: String,
    pub flags: Vec<String>,
    pub description: String,
    pub parameter_type: ParameterType,
    pub default_value: Option<String>,
    pub optional: bool,
}

#[derive(Serialize, Debug)]
pub enum ParameterType {
    ExistingFile,
    NewFile,
    Integer,
    Float,
    Boolean,
}

/// The ground-point-filtering tool: voxelizes an ASCII point cloud, runs
/// `GroundFilter` for `n` iterations, and writes the ground / non-ground
/// partitions plus a run log.
pub struct GroundPointFilter {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
}

impl GroundPointFilter {
    pub fn new() -> GroundPointFilter {
        let name = "GroundPointFilter".to_string();
        let description =
            "Filters ground points from an ASCII LiDAR point cloud using an iterative bilinear DEM fit."
                .to_string();

        let parameters = vec![
            ToolParameter {
                name: "Input File".to_owned(),
                flags: vec!["-i".to_owned(), "--input".to_owned()],
                description: "Input ASCII point cloud (*.txt, *.ascii).".to_owned(),
                parameter_type: ParameterType::ExistingFile,
                default_value: None,
                optional: false,
            },
            ToolParameter {
                name: "Iterations".to_owned(),
                flags: vec!["-n".to_owned(), "--iterations".to_owned()],
                description: "Number of filter iterations, in [1, 30].".to_owned(),
                parameter_type: ParameterType::Integer,
                default_value: Some("10".to_owned()),
                optional: true,
            },
            ToolParameter {
                name: "Cell Size".to_owned(),
                flags: vec!["--step".to_owned()],
                description: "Voxel grid cell size in metres, in [1, 20].".to_owned(),
                parameter_type: ParameterType::Float,
                default_value: Some("5.0".to_owned()),
                optional: true,
            },
            ToolParameter {
                name: "Intensity".to_owned(),
                flags: vec!["-k".to_owned(), "--k-value".to_owned()],
                description: "Median multiplier for the adaptive threshold, in [1, 6].".to_owned(),
                parameter_type: ParameterType::Float,
                default_value: Some("4.0".to_owned()),
                optional: true,
            },
            ToolParameter {
                name: "Absolute Fallback".to_owned(),
                flags: vec!["--max-v".to_owned()],
                description: "Absolute height threshold used when the adaptive one would be too loose."
                    .to_owned(),
                parameter_type: ParameterType::Float,
                default_value: Some("1.0".to_owned()),
                optional: true,
            },
            ToolParameter {
                name: "Phase-shifted Grids".to_owned(),
                flags: vec!["--n-vm".to_owned()],
                description: "Number of phase-shifted voxel grids cycled across iterations.".to_owned(),
                parameter_type: ParameterType::Integer,
                default_value: Some("4".to_owned()),
                optional: true,
            },
            ToolParameter {
                name: "Save Settings".to_owned(),
                flags: vec!["--save-settings".to_owned()],
                description: "Persist the supplied parameters as the new defaults.".to_owned(),
                parameter_type: ParameterType::Boolean,
                default_value: Some("false".to_owned()),
                optional: true,
            },
        ];

        GroundPointFilter {
            name,
            description,
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ToolParameter] {
        &self.parameters
    }

    /// Runs the tool end to end: load, filter, write. `verbose` gates
    /// progress printing, matching `WhiteboxTool::run`'s convention.
    pub fn run(&self, opts: &RunOptions, verbose: bool) -> Result<(), Error> {
        let start = Instant::now();

        if verbose {
            println!("Reading points from {}...", opts.input.display());
        }
        let points = load_points(&opts.input).map_err(|e| {
            if matches!(e, groundsieve_lidar::error::GroundFilterError::InputFormat { .. }) {
                eprintln!("CRITICAL: {}", e);
            }
            Error::new(ErrorKind::InvalidData, e.to_string())
        })?;
        // Empty input is Degenerate, not fatal (spec.md §7): the store starts
        // with zero active points, every iteration no-ops with null log
        // fields, and the run still emits both (empty) partition files.
        if points.is_empty() && verbose {
            println!("Input contains no points; writing empty partitions.");
        }
        let total = points.len();
        let mut store = PointStore::new(points);

        let params = GroundFilterParams::new(opts.n, opts.step, opts.k_value, opts.max_v, opts.n_vm);
        let gf = GroundFilter::new(&store, params);

        let mut reports = Vec::with_capacity(opts.n);
        let mut last_percent = -1i32;
        for report in gf.iter(&mut store) {
            if verbose {
                let percent = percent_complete(report.iteration + 1, opts.n);
                if percent != last_percent {
                    println!("Filtering: {}%", percent);
                    last_percent = percent;
                }
            }
            reports.push(report);
        }

        write_scan(&opts.input, store.points(), |i| store.is_active(i))
            .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;
        write_run_log(&opts.input, &reports).map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;

        if verbose {
            println!(
                "{} of {} points retained as ground.",
                store.active_count(),
                total
            );
            println!("Elapsed time: {}", get_formatted_elapsed_time(start));
        }

        Ok(())
    }
}

/// Resolved CLI/config parameters for one `GroundPointFilter::run` call.
pub struct RunOptions {
    pub input: std::path::PathBuf,
    pub n: usize,
    pub step: f64,
    pub k_value: f64,
    pub max_v: f64,
    pub n_vm: usize,
}

impl RunOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::new(ErrorKind::InvalidInput, "no input file specified"));
        }
        if !(1..=30).contains(&self.n) {
            return Err(Error::new(ErrorKind::InvalidInput, "iterations must be in [1, 30]"));
        }
        if !(1.0..=20.0).contains(&self.step) {
            return Err(Error::new(ErrorKind::InvalidInput, "step must be in [1, 20]"));
        }
        if !(1.0..=6.0).contains(&self.k_value) {
            return Err(Error::new(ErrorKind::InvalidInput, "k_value must be in [1, 6]"));
        }
        Ok(())
    }
}
