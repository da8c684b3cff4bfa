pub mod tools;

use std::env;
use std::io::{Error, ErrorKind};
use std::path::PathBuf;
use std::time::Instant;

use groundsieve_common::configs::{get_configs, save_configs};
use groundsieve_common::utils::get_formatted_elapsed_time;
use tools::{GroundPointFilter, RunOptions};

const SETTINGS_FILE: &str = "groundsieve_settings.json";

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), Error> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        help();
        return Ok(());
    }

    let mut configs = get_configs(SETTINGS_FILE)?;
    let mut configs_modified = false;

    let mut input_file = String::new();
    let mut n = configs.n;
    let mut step = configs.step;
    let mut k_value = configs.k_value;
    let mut max_v = configs.max_v;
    let mut n_vm = configs.n_vm;
    let mut verbose = configs.verbose_mode;
    let mut save_settings = false;

    for i in 0..args.len() {
        let mut arg = args[i].replace('"', "");
        arg = arg.replace('\'', "");
        if arg == "-h" || arg == "--help" {
            help();
            return Ok(());
        }
        let parts: Vec<&str> = arg.splitn(2, '=').collect();
        let keyval = parts.len() > 1;
        let flag = parts[0].to_lowercase().replace("--", "-");

        let value_of = |i: usize| -> String {
            if keyval {
                parts[1].to_string()
            } else {
                args.get(i + 1).cloned().unwrap_or_default()
            }
        };

        match flag.as_str() {
            "-i" | "-input" => input_file = value_of(i),
            "-n" | "-iterations" => {
                n = parse_flag(&value_of(i), "iterations")?;
            }
            "-step" => {
                step = parse_flag(&value_of(i), "step")?;
            }
            "-k" | "-k-value" | "-k_value" => {
                k_value = parse_flag(&value_of(i), "k-value")?;
            }
            "-max-v" | "-max_v" => {
                max_v = parse_flag(&value_of(i), "max-v")?;
            }
            "-n-vm" | "-n_vm" => {
                n_vm = parse_flag(&value_of(i), "n-vm")?;
            }
            "-v" | "-verbose" => verbose = true,
            "-save-settings" | "-save_settings" => save_settings = true,
            _ => {}
        }
    }

    if input_file.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            "no input file specified; use -i/--input <file>",
        ));
    }

    if save_settings {
        configs.n = n;
        configs.step = step;
        configs.k_value = k_value;
        configs.max_v = max_v;
        configs.n_vm = n_vm;
        configs.verbose_mode = verbose;
        configs_modified = true;
    }
    if configs_modified {
        save_configs(&configs, SETTINGS_FILE)?;
    }

    let opts = RunOptions {
        input: PathBuf::from(input_file),
        n,
        step,
        k_value,
        max_v,
        n_vm,
    };
    opts.validate()?;

    let start = Instant::now();
    let tool = GroundPointFilter::new();
    tool.run(&opts, verbose)?;

    if verbose {
        println!("Total elapsed time: {}", get_formatted_elapsed_time(start));
    }

    Ok(())
}

fn parse_flag<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, Error> {
    raw.parse::<T>()
        .map_err(|_| Error::new(ErrorKind::InvalidInput, format!("could not parse '{}' for --{}", raw, name)))
}

fn help() {
    println!("groundsieve: filters ground points from an ASCII LiDAR point cloud.\n");
    println!("Usage:");
    println!("  groundsieve -i=input.txt [options]\n");
    println!("Options:");
    println!("  -i, --input <file>       Input ASCII point cloud (*.txt).");
    println!("  -n, --iterations <n>     Number of filter iterations [1, 30]. Default 10.");
    println!("  --step <f>               Voxel grid cell size in metres [1, 20]. Default 5.0.");
    println!("  -k, --k-value <f>        Median multiplier for the adaptive threshold [1, 6]. Default 4.0.");
    println!("  --max-v <f>              Absolute height threshold fallback. Default 1.0.");
    println!("  --n-vm <n>               Number of phase-shifted voxel grids. Default 4.");
    println!("  -v, --verbose            Print progress.");
    println!("  --save-settings          Persist the supplied parameters as new defaults.");
    println!("  -h, --help               Print this message.");
}
