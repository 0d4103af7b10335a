//! CLI front-end: argument parsing, file I/O, listfile recombination,
//! and console/progress output (spec §6 "External collaborators" — not
//! part of the core engine, but its only caller).
//!
//! Grounded on `examples/original_source/src/main.cpp`'s `main()`: the
//! same flag table, the same "try to parse `-n` as a hex digest, fall
//! back to a `file_data_id;hex` file" logic, the same `Data/`,
//! `Alternate/`, `Test/` prefix probe and case-insensitive path/base
//! cross product for listfile-only mode. Argument parsing itself uses
//! `clap`'s derive API (the idiom the rest of the retrieval pack's
//! miners use) rather than the original's hand-rolled `argv` loop, but
//! every cross-field validation the original does by hand after
//! parsing is kept exactly as hand-rolled validation here too (spec
//! `SPEC_FULL.md` §8 "Configuration / CLI").

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};

use namehash_finder::alphabet::Alphabet;
use namehash_finder::cpu_pool;
use namehash_finder::error::{FinderError, Result};
use namehash_finder::gpu::{DevicePool, DevicePoolConfig};
use namehash_finder::hash;
use namehash_finder::hash_string::HashString;
use namehash_finder::pattern::Pattern;
use namehash_finder::progress::Progress;
use namehash_finder::sink::{ConsoleSink, Match, MatchSink};
use namehash_finder::target_index::TargetIndex;

const USAGE: &str = "Usage: namehash-bruteforcer -n <name_hash|name_hash_file> [-a alphabet] [-c cpu_threads] [-l listfile] [-p pattern]... [-f pattern_file] [-g] [-w work_size] [-m max_results] [-q] [-?]";

const LISTFILE_PREFIXES: [&str; 3] = ["Data/", "Alternate/", "Test/"];

#[derive(Parser, Debug)]
#[command(
    name = "namehash-bruteforcer",
    disable_help_flag = true,
    about = "Brute-force preimage finder for the Jenkins hashlittle2 string hash"
)]
struct Cli {
    /// One 64-bit target: a hex digest, or a path to a `file_data_id;hex` file.
    #[arg(short = 'n')]
    name_hash: Option<String>,

    /// Add a pattern to search for (repeatable).
    #[arg(short = 'p')]
    patterns: Vec<String>,

    /// Read patterns (and optional per-line `;alphabet`) from a file.
    #[arg(short = 'f')]
    pattern_file: Option<PathBuf>,

    /// Alphabet preset (`default`, `digits`/`numbers`, `letters`, `hex`) or a literal.
    #[arg(short = 'a')]
    alphabet: Option<String>,

    /// Listfile of `file_data_id;name` pairs, for recombination mode and `-n` filtering.
    #[arg(short = 'l')]
    listfile: Option<PathBuf>,

    /// Cap the number of CPU threads used (must be <= hardware parallelism, > 0).
    #[arg(short = 'c')]
    cpu_threads: Option<usize>,

    /// Enable GPU mode.
    #[arg(short = 'g')]
    gpu: bool,

    /// GPU batch work size.
    #[arg(short = 'w')]
    work_size: Option<usize>,

    /// Per-batch max match capacity.
    #[arg(short = 'm')]
    max_results: Option<u32>,

    /// Suppress progress output.
    #[arg(short = 'q')]
    quiet: bool,

    /// Print help and exit 0.
    #[arg(short = '?', long = "help", action = ArgAction::Help)]
    help: Option<bool>,
}

/// A pattern paired with the alphabet it should be enumerated with —
/// `-p` patterns all share `-a`'s (or the default) alphabet; `-f`
/// lines may override it per-line (spec §6 "`-f` ... optional
/// `;alphabet`").
struct PatternSpec {
    text: String,
    alphabet: String,
}

/// `main` converts the library's `Result<T, FinderError>` into
/// `eyre::Result` so non-usage failures (a device error, a kernel
/// build failure) keep their chain through `ocl::Error` when printed,
/// while usage errors get the short, chain-free usage message the CLI
/// is expected to produce (spec §7 "usage error").
fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        if let FinderError::Usage(ref msg) = err {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
        return Err(err.into());
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_alphabet = cli.alphabet.clone().unwrap_or_else(|| "default".to_string());

    let num_cpus_available = num_cpus::get();
    let cpu_threads = match cli.cpu_threads {
        Some(n) if n == 0 => {
            return Err(FinderError::Usage(format!(
                "provided number of threads ({n}) must be greater than zero"
            )))
        }
        Some(n) if n > num_cpus_available => {
            return Err(FinderError::Usage(format!(
                "provided number of threads ({n}) was greater than system recommended limit of {num_cpus_available}"
            )))
        }
        Some(n) => n,
        None => num_cpus_available,
    };

    let name_hash_arg = cli
        .name_hash
        .as_deref()
        .ok_or_else(|| FinderError::Usage("missing required -n flag".to_string()))?;

    let listfile = match &cli.listfile {
        Some(path) => parse_listfile(path)?,
        None => HashMap::new(),
    };

    let mut pattern_specs: Vec<PatternSpec> = cli
        .patterns
        .iter()
        .map(|p| PatternSpec {
            text: p.clone(),
            alphabet: default_alphabet.clone(),
        })
        .collect();
    if let Some(path) = &cli.pattern_file {
        pattern_specs.extend(parse_pattern_file(path, &default_alphabet)?);
    }

    if pattern_specs.is_empty() && listfile.is_empty() {
        return Err(FinderError::Usage(
            "either a listfile or pattern must be provided".to_string(),
        ));
    }

    let targets = load_targets(name_hash_arg, &listfile)?;
    if targets.is_empty() {
        return Err(FinderError::Usage(
            "at least one name hash must be provided".to_string(),
        ));
    }

    let sink = ConsoleSink::new();

    if pattern_specs.is_empty() {
        run_listfile_recombination(&listfile, &targets, &sink, cpu_threads, cli.quiet)?;
    } else {
        for spec in &pattern_specs {
            run_pattern_search(spec, &targets, &sink, &cli, cpu_threads)?;
        }
    }

    Ok(())
}

/// Parse `-n`: first try it as a bare hex digest; if that fails, treat
/// it as a path to a `file_data_id;hex` file. When a listfile was also
/// given, a hash whose `file_data_id` maps to a listfile name that
/// already hashes to it is dropped — it's already known, no need to
/// search for it (spec §6 `-l`'s "this will also filter the given name
/// hash file to ignore names that are already known").
fn load_targets(name_hash_arg: &str, listfile: &HashMap<u32, String>) -> Result<TargetIndex> {
    if let Ok(digest) = u64::from_str_radix(name_hash_arg.trim_start_matches("0x").trim_start_matches("0X"), 16) {
        return Ok(TargetIndex::with_labels([(digest, 0u32)]));
    }

    let path = Path::new(name_hash_arg);
    let data = read_text_file(path)?;

    let mut pairs = Vec::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, ';');
        let (Some(id_str), Some(hash_str)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(file_data_id) = id_str.trim().parse::<u32>() else {
            continue;
        };
        let Ok(digest) = u64::from_str_radix(hash_str.trim(), 16) else {
            continue;
        };

        let already_known = listfile
            .get(&file_data_id)
            .map(|name| hash::hash_full(&HashString::new(name)) == digest)
            .unwrap_or(false);
        if !already_known {
            pairs.push((digest, file_data_id));
        }
    }

    Ok(TargetIndex::with_labels(pairs))
}

fn parse_listfile(path: &Path) -> Result<HashMap<u32, String>> {
    let data = read_text_file(path)?;
    let mut listfile = HashMap::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(2, ';');
        if let (Some(id_str), Some(name)) = (parts.next(), parts.next()) {
            if let Ok(file_data_id) = id_str.trim().parse::<u32>() {
                listfile.insert(file_data_id, name.to_string());
            }
        }
    }
    Ok(listfile)
}

fn parse_pattern_file(path: &Path, default_alphabet: &str) -> Result<Vec<PatternSpec>> {
    let data = read_text_file(path)?;
    let mut specs = Vec::new();
    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, ';');
        let text = parts.next().unwrap_or("").to_string();
        let alphabet = parts.next().map(str::to_string).unwrap_or_else(|| default_alphabet.to_string());
        specs.push(PatternSpec { text, alphabet });
    }
    Ok(specs)
}

fn read_text_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| FinderError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn run_pattern_search(
    spec: &PatternSpec,
    targets: &TargetIndex,
    sink: &dyn MatchSink,
    cli: &Cli,
    cpu_threads: usize,
) -> Result<()> {
    let alphabet = Alphabet::parse(&spec.alphabet);
    let pattern = Pattern::new(&spec.text, alphabet);
    let total = namehash_finder::enumerator::total_combinations(pattern.alphabet.len(), pattern.wildcard_width());
    let progress = Progress::new(total);

    let reporter = (!cli.quiet).then(|| spawn_progress_reporter(progress.clone()));

    if cli.gpu {
        let pool = DevicePool::discover()?;
        log::info!("GPU devices: {}", pool.device_names().join(", "));
        let config = DevicePoolConfig {
            work_size: cli.work_size.unwrap_or(1usize << 31),
            max_results: cli.max_results.unwrap_or(1024),
            num_slots: 2,
        };
        pool.search(&pattern, targets, &progress, sink, &config)?;
    } else {
        cpu_pool::search(&pattern, targets, &progress, sink, cpu_threads);
    }

    if let Some((done, handle)) = reporter {
        done.store(true, Ordering::Relaxed);
        let _ = handle.join();
    }

    Ok(())
}

/// Listfile-only recombination mode (spec §1, `SPEC_FULL.md` §9): for
/// every known `path/base` name, probe three fixed directory prefixes
/// directly, then cross every distinct path with every distinct base
/// name (case-insensitively de-duplicated) looking for an unknown
/// target.
fn run_listfile_recombination(
    listfile: &HashMap<u32, String>,
    targets: &TargetIndex,
    sink: &dyn MatchSink,
    num_threads: usize,
    quiet: bool,
) -> Result<()> {
    // Keyed by lowercased form for case-insensitive dedup/ordering only
    // (`main.cpp`'s `str_lt_ci`-ordered set comparator); the stored
    // value keeps whichever original-case spelling was inserted first,
    // exactly as the original's comparator-only dedup does.
    let mut path_names: BTreeMap<String, String> = BTreeMap::new();
    let mut base_names: BTreeMap<String, String> = BTreeMap::new();

    for name in listfile.values() {
        for prefix in LISTFILE_PREFIXES {
            let candidate = format!("{prefix}{name}");
            let digest = hash::hash_full(&HashString::new(&candidate));
            if targets.contains(digest) {
                sink.report(Match {
                    digest,
                    text: candidate,
                    label: targets.label_for_output(digest),
                });
            }
        }

        if let Some(slash) = name.rfind('/') {
            let path = &name[..slash];
            let base = &name[slash + 1..];
            path_names.entry(path.to_ascii_lowercase()).or_insert_with(|| path.to_string());
            base_names.entry(base.to_ascii_lowercase()).or_insert_with(|| base.to_string());
        }
    }

    let base_names: Vec<String> = base_names.into_values().collect();
    let path_names: Vec<String> = path_names.into_values().collect();
    let total = (path_names.len() as u128) * (base_names.len() as u128);
    let progress = Progress::new(total);
    let reporter = (!quiet).then(|| spawn_progress_reporter(progress.clone()));

    std::thread::scope(|scope| {
        for t in 0..num_threads.max(1) {
            let path_names = &path_names;
            let base_names = &base_names;
            let progress = &progress;
            scope.spawn(move || {
                let mut b = t;
                while b < base_names.len() {
                    for path in path_names {
                        let candidate = format!("{path}/{}", base_names[b]);
                        let digest = hash::hash_full(&HashString::new(&candidate));
                        if targets.contains(digest) {
                            sink.report(Match {
                                digest,
                                text: candidate,
                                label: targets.label_for_output(digest),
                            });
                        }
                    }
                    progress.add(path_names.len() as u64);
                    b += num_threads.max(1);
                }
            });
        }
    });

    if let Some((done, handle)) = reporter {
        done.store(true, Ordering::Relaxed);
        let _ = handle.join();
    }

    Ok(())
}

/// Spawn a one-off thread that sleeps 100ms (spec §5 "Suspension
/// points") and writes a rate/ETA line to stderr — kept off the match
/// sink's stdout entirely (spec §7: "independent sinks").
fn spawn_progress_reporter(progress: Arc<Progress>) -> (Arc<AtomicBool>, std::thread::JoinHandle<()>) {
    let done = Arc::new(AtomicBool::new(false));
    let done_for_thread = done.clone();
    let handle = std::thread::spawn(move || {
        while !done_for_thread.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(100));
            let pct = if progress.total() > 0 {
                (progress.completed() as f64) / (progress.total() as f64) * 100.0
            } else {
                100.0
            };
            match progress.eta_secs() {
                Some(eta) => eprint!(
                    "\r[{pct:>6.2}%] {:.0}s remaining, {}          ",
                    eta,
                    progress.hash_rate_string()
                ),
                None => eprint!("\r[{pct:>6.2}%] {}          ", progress.hash_rate_string()),
            }
        }
        eprintln!();
    });
    (done, handle)
}
