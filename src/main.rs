//! CLI entrypoint for `saltsim`.
//!
//! Parses command-line arguments, loads the optional TOML config, runs the
//! requested simulation through the library, prints a terminal report and
//! optionally writes JSON/CSV exports when an output directory is provided.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{LevelFilter, error, warn};
use saltsim::{
    api,
    batch::{self, BatchOptions, DEFAULT_ATTACKER_SPEEDS},
    config::SimConfig,
    corpus::{CorpusLoader, FileCorpus, SampleCorpus},
    crack::{CrackTimeProjector, format_duration},
    entropy::{estimate, generate_password},
    error::SimError,
    export::{save_report_csv, save_report_json, save_sweep_csv, timestamped_path},
    io::{self, DEFAULT_MMAP_THRESHOLD_BYTES},
    kdf::{
        AbortToken, Argon2Params, BcryptParams, Confirm, KdfHarness, KdfKind, KdfParams,
        KdfRegistry, Preapproved, ScryptParams, abort_pair,
    },
    report::{
        SIMPLIFICATION_NOTE, render_attack, render_batch_summary, render_benchmark, render_demo,
        render_strength, render_sweep,
    },
    salting::SaltingEngine,
    session::{DemoRequest, Session},
};

const EXIT_INPUT: i32 = 2;
const EXIT_SIMULATION: i32 = 3;
const EXIT_OUTPUT_DIR: i32 = 4;
const EXIT_EXPORT: i32 = 5;

#[derive(Parser, Debug)]
#[command(
    name = "saltsim",
    version,
    about = "Salt vs. no-salt simulator: rainbow tables, KDF cost and crack-time projection"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// TOML configuration file
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Suppress report output (still writes exports if -o is provided)
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

/// KDF parameter overrides shared by `demo` and `bench`.
#[derive(Args, Debug, Default)]
struct KdfArgs {
    /// Argon2id time cost (iterations)
    #[arg(long = "argon-time")]
    argon_time: Option<u32>,
    /// Argon2id memory in KiB
    #[arg(long = "argon-mem")]
    argon_mem: Option<u32>,
    /// Argon2id parallelism
    #[arg(long = "argon-par")]
    argon_par: Option<u32>,
    /// bcrypt cost (rounds, clamped to 4..=15)
    #[arg(long = "bcrypt-rounds")]
    bcrypt_rounds: Option<u32>,
    /// scrypt N (rounded up to a power of two, at least 1024)
    #[arg(long = "scrypt-n")]
    scrypt_n: Option<u64>,
    #[arg(long = "scrypt-r")]
    scrypt_r: Option<u32>,
    #[arg(long = "scrypt-p")]
    scrypt_p: Option<u32>,
}

impl KdfArgs {
    fn apply(&self, params: KdfParams) -> KdfParams {
        match params {
            KdfParams::Argon2id(mut p) => {
                p.time_cost = self.argon_time.unwrap_or(p.time_cost);
                p.memory_kib = self.argon_mem.unwrap_or(p.memory_kib);
                p.parallelism = self.argon_par.unwrap_or(p.parallelism);
                KdfParams::Argon2id(p)
            }
            KdfParams::Bcrypt(mut p) => {
                p.rounds = self.bcrypt_rounds.unwrap_or(p.rounds);
                KdfParams::Bcrypt(p)
            }
            KdfParams::Scrypt(mut p) => {
                p.n = self.scrypt_n.unwrap_or(p.n);
                p.r = self.scrypt_r.unwrap_or(p.r);
                p.p = self.scrypt_p.unwrap_or(p.p);
                KdfParams::Scrypt(p)
            }
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate entropy and strength of a password
    Strength { password: String },

    /// Generate a random password
    Generate {
        #[arg(long = "length", default_value_t = 16)]
        length: usize,
    },

    /// Full demo: hashing, salting, rainbow lookup and KDF crack-time estimates
    Demo {
        password: String,
        /// Simulated users sharing the password
        #[arg(short = 'u', long = "users")]
        users: Option<usize>,
        /// KDFs to measure (default: all)
        #[arg(long = "kdf")]
        kdfs: Vec<KdfKind>,
        #[command(flatten)]
        kdf_args: KdfArgs,
        /// Use the server-assisted path instead of local KDFs (insecure demo)
        #[arg(long = "server")]
        server: bool,
        /// Answer yes to resource-risk prompts
        #[arg(short = 'y', long = "yes")]
        yes: bool,
        /// Common-password corpus file(s) for the rainbow lookup
        #[arg(short = 'c', long = "corpus")]
        corpus: Vec<PathBuf>,
    },

    /// Rainbow-table attack against unsalted and salted storage
    Rainbow {
        #[arg(short = 'c', long = "corpus")]
        corpus: Vec<PathBuf>,
        #[arg(short = 'u', long = "users")]
        users: Option<usize>,
        /// Attack with an empty table
        #[arg(long = "no-precomputed")]
        no_precomputed: bool,
        /// Override mmap threshold in bytes. If zero, disable mmap.
        #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
        mmap_threshold: u64,
    },

    /// Batch simulation report over a password list
    Report {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[arg(short = 'u', long = "users", default_value_t = 100)]
        users: usize,
        /// Attacker speeds in guesses/second (default: 1e7 and 1e9)
        #[arg(long = "speed")]
        speeds: Vec<f64>,
        /// Output directory for JSON/CSV exports
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        /// Compute rows in parallel
        #[arg(long = "parallel")]
        parallel: bool,
        /// Pretty-print the JSON export
        #[arg(long = "pretty")]
        pretty: bool,
        #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
        mmap_threshold: u64,
    },

    /// Benchmark KDFs: min/avg/max seconds per hash
    Bench {
        #[arg(long = "password", default_value = "password")]
        password: String,
        #[arg(long = "repeats", default_value_t = 3)]
        repeats: usize,
        #[arg(long = "kdf")]
        kdfs: Vec<KdfKind>,
        #[command(flatten)]
        kdf_args: KdfArgs,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Sweep one KDF parameter and project crack time at a fixed entropy
    Sweep {
        #[arg(long = "kdf")]
        kdf: KdfKind,
        #[arg(long = "entropy", default_value_t = 60)]
        entropy: u32,
        #[arg(long = "password", default_value = "password")]
        password: String,
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Server-assisted hash records as JSON (sends plaintext; demo only)
    Hash {
        passwords: Vec<String>,
        /// JSON request body: {"passwords": [...]}
        #[arg(long = "request")]
        request: Option<PathBuf>,
    },
}

struct Failure {
    code: i32,
    error: anyhow::Error,
}

trait WithExitCode<T> {
    fn code(self, code: i32) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> WithExitCode<T> for Result<T, E> {
    fn code(self, code: i32) -> Result<T, Failure> {
        self.map_err(|e| Failure {
            code,
            error: e.into(),
        })
    }
}

/// Interactive yes/no; declines when there is no terminal.
struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                warn!("cannot prompt ({e}); declining");
                false
            })
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(Preapproved(true))
    } else {
        Box::new(TerminalConfirm)
    }
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    match path {
        Some(p) => SimConfig::load(p),
        None => Ok(SimConfig::default()),
    }
}

fn selected(kinds: &[KdfKind]) -> Vec<KdfKind> {
    if kinds.is_empty() {
        KdfKind::ALL.to_vec()
    } else {
        let mut v = kinds.to_vec();
        v.sort();
        v.dedup();
        v
    }
}

/// Lighter defaults for repeated benchmark runs.
fn bench_params(kind: KdfKind) -> KdfParams {
    match kind {
        KdfKind::Argon2id => KdfParams::Argon2id(Argon2Params {
            time_cost: 1,
            memory_kib: 32768,
            parallelism: 1,
            hash_len: 32,
        }),
        KdfKind::Bcrypt => KdfParams::Bcrypt(BcryptParams { rounds: 10 }),
        KdfKind::Scrypt => KdfParams::Scrypt(ScryptParams::default()),
    }
}

fn corpus_loader(paths: &[PathBuf], mmap_threshold: u64) -> Arc<dyn CorpusLoader> {
    if paths.is_empty() {
        Arc::new(SampleCorpus)
    } else {
        Arc::new(FileCorpus::new(paths.to_vec()).with_mmap_threshold(mmap_threshold))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), Failure> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))
        .code(EXIT_OUTPUT_DIR)
}

fn emit(quiet: bool, text: &str) {
    if !quiet {
        println!("{text}");
    }
}

async fn run(cli: Cli, config: SimConfig, abort: AbortToken) -> Result<(), Failure> {
    let quiet = cli.quiet;
    match cli.command {
        Command::Strength { password } => {
            let bits = estimate(&password);
            let projector =
                CrackTimeProjector::new(config.attacker_guesses_per_second)
                    .code(EXIT_INPUT)?;
            let est = projector.plain(bits);
            emit(
                quiet,
                &format!(
                    "{}\nBrute force at {:e} guesses/s: {}\n{}",
                    render_strength(bits),
                    projector.guesses_per_second(),
                    format_duration(est.estimated),
                    SIMPLIFICATION_NOTE
                ),
            );
        }

        Command::Generate { length } => {
            if length == 0 {
                return Err(anyhow::anyhow!("--length must be at least 1")).code(EXIT_INPUT);
            }
            let pw = generate_password(length);
            println!("{pw}");
            emit(quiet, &render_strength(estimate(&pw)));
        }

        Command::Demo {
            password,
            users,
            kdfs,
            kdf_args,
            server,
            yes,
            corpus,
        } => {
            let mut request = DemoRequest::from_config(&config);
            request.users = users.unwrap_or(request.users);
            request.kdfs = selected(&kdfs)
                .into_iter()
                .map(|k| kdf_args.apply(config.params_for(k)))
                .collect();
            request.local_only = !server;
            if server {
                warn!("server-assisted mode hashes plaintext passwords; demo only");
            }
            let session = Session::new(
                config,
                corpus_loader(&corpus, DEFAULT_MMAP_THRESHOLD_BYTES),
            )
            .code(EXIT_INPUT)?;
            let confirm = confirmer(yes);
            let outcome = match session
                .run_demo(&password, &request, confirm.as_ref(), &abort)
                .await
            {
                Ok(o) => o,
                Err(e @ SimError::EmptyPassword) => return Err(e).code(EXIT_INPUT),
                Err(e) => return Err(e).code(EXIT_SIMULATION),
            };
            emit(quiet, &render_demo(&outcome));
        }

        Command::Rainbow {
            corpus,
            users,
            no_precomputed,
            mmap_threshold,
        } => {
            let users = users.unwrap_or(config.rainbow_users);
            let session =
                Session::new(config, corpus_loader(&corpus, mmap_threshold)).code(EXIT_INPUT)?;
            let run = session
                .run_rainbow(users, !no_precomputed)
                .await
                .code(EXIT_SIMULATION)?;
            emit(quiet, &render_attack(&run));
        }

        Command::Report {
            input,
            users,
            speeds,
            output,
            parallel,
            pretty,
            mmap_threshold,
        } => {
            if !input.exists() {
                return Err(anyhow::anyhow!("input file not found: {}", input.display()))
                    .code(EXIT_INPUT);
            }
            let mut passwords = Vec::new();
            for line in io::lines(&input, mmap_threshold).code(EXIT_INPUT)? {
                let line = line
                    .with_context(|| format!("read {}", input.display()))
                    .code(EXIT_INPUT)?;
                let line = line.trim();
                if !line.is_empty() {
                    passwords.push(line.to_string());
                }
            }
            let opts = BatchOptions {
                users_per_password: users,
                attacker_speeds: if speeds.is_empty() {
                    DEFAULT_ATTACKER_SPEEDS.to_vec()
                } else {
                    speeds
                },
                parallel,
            };
            let engine = SaltingEngine::new().with_salt_len(config.salt_len);
            let report = batch::simulate(&engine, &passwords, &opts).code(EXIT_SIMULATION)?;
            emit(quiet, &render_batch_summary(&report));

            if let Some(outdir) = output {
                ensure_dir(&outdir)?;
                let json = timestamped_path(&outdir, "report", "json");
                let csv = timestamped_path(&outdir, "report", "csv");
                save_report_json(&report, &json, pretty)
                    .with_context(|| format!("failed to write {}", json.display()))
                    .code(EXIT_EXPORT)?;
                save_report_csv(&report, &csv)
                    .with_context(|| format!("failed to write {}", csv.display()))
                    .code(EXIT_EXPORT)?;
                emit(quiet, &format!("Wrote {} and {}", json.display(), csv.display()));
            }
        }

        Command::Bench {
            password,
            repeats,
            kdfs,
            kdf_args,
            yes,
        } => {
            let harness = KdfHarness::new(KdfRegistry::default(), config.memory_confirm_threshold_kib);
            let salt = SaltingEngine::new()
                .with_salt_len(config.salt_len)
                .generate_salt()
                .code(EXIT_SIMULATION)?;
            let confirm = confirmer(yes);
            let mut rows = Vec::new();
            for kind in selected(&kdfs) {
                let params = kdf_args.apply(bench_params(kind));
                let res = harness
                    .benchmark(&password, salt.as_bytes(), params, repeats, confirm.as_ref(), &abort)
                    .await;
                if let Err(e) = &res {
                    warn!("{kind} skipped: {e}");
                }
                rows.push((kind, params.clamped().describe(), res));
            }
            emit(quiet, &render_benchmark(&rows));
        }

        Command::Sweep {
            kdf,
            entropy,
            password,
            output,
            yes,
        } => {
            let projector =
                CrackTimeProjector::new(config.attacker_guesses_per_second)
                    .code(EXIT_INPUT)?;
            let harness = KdfHarness::new(KdfRegistry::default(), config.memory_confirm_threshold_kib);
            let salt = SaltingEngine::new()
                .with_salt_len(config.salt_len)
                .generate_salt()
                .code(EXIT_SIMULATION)?;
            let confirm = confirmer(yes);
            let points = harness
                .sweep(
                    kdf,
                    &password,
                    salt.as_bytes(),
                    entropy,
                    &projector,
                    confirm.as_ref(),
                    &abort,
                )
                .await;
            emit(quiet, &render_sweep(kdf, entropy, &points));
            if let Some(outdir) = output {
                ensure_dir(&outdir)?;
                let csv = timestamped_path(&outdir, &format!("sweep_{kdf}"), "csv");
                save_sweep_csv(kdf, &points, &csv)
                    .with_context(|| format!("failed to write {}", csv.display()))
                    .code(EXIT_EXPORT)?;
            }
        }

        Command::Hash {
            mut passwords,
            request,
        } => {
            if let Some(path) = request {
                let body = fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()))
                    .code(EXIT_INPUT)?;
                passwords.extend(api::parse_request(&body).code(EXIT_INPUT)?);
            }
            if passwords.is_empty() {
                return Err(anyhow::anyhow!("no passwords given")).code(EXIT_INPUT);
            }
            let engine = SaltingEngine::new().with_salt_len(config.salt_len);
            let records = api::hash_batch(&engine, &passwords).code(EXIT_SIMULATION)?;
            let json = serde_json::to_string_pretty(&records).code(EXIT_SIMULATION)?;
            println!("{json}");
        }
    }
    Ok(())
}

fn verify_config(cli: &Cli) -> anyhow::Result<SimConfig> {
    let config = load_config(cli.config.as_deref())?;
    if let Command::Report { users: 0, .. } = cli.command {
        bail!("--users must be at least 1");
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    // Configure color policy
    match cli.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    let config = match verify_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_INPUT);
        }
    };

    let (handle, token) = abort_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; aborting in-flight KDF work");
            handle.abort();
        }
    });

    if let Err(failure) = run(cli, config, token).await {
        error!("{:#}", failure.error);
        std::process::exit(failure.code);
    }
}
