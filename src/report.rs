//! Human-readable report rendering for terminal output.
//!
//! Every renderer returns a `String`; the binary decides whether to print it.
//! Failed KDF branches are shown inline as diagnostics, never as numbers.
use colored::*;

use crate::batch::BatchReport;
use crate::corpus::CorpusSource;
use crate::crack::{CrackEstimate, CrackTime, format_duration};
use crate::entropy::Strength;
use crate::error::SimError;
use crate::kdf::{KdfKind, KdfResult, SweepPoint, Timing};
use crate::session::{DemoOutcome, RainbowRun};

/// Shown under every crack-time figure.
pub const SIMPLIFICATION_NOTE: &str = "Note: estimates assume a uniform random-guessing attacker; \
dictionary and rule-based attacks on real passwords are often much faster.";

/// Printable width of `s`. `colored` wraps text in SGR sequences
/// (`ESC [ params m`) that take no columns, so those are skipped.
fn visible_len(s: &str) -> usize {
    let mut len = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\u{1b}' {
            len += 1;
            continue;
        }
        chars.next_if_eq(&'[');
        // everything up to and including the terminating 'm' is the escape
        chars.by_ref().find(|&c| c == 'm');
    }
    len
}

/// Title underlined to its printable width, padded by blank lines.
fn section_header(title: &str) -> String {
    format!("\n{title}\n{}\n\n", "─".repeat(visible_len(title)))
}

fn push_section(out: &mut String, title: ColoredString, lines: Vec<String>) {
    out.push_str(&section_header(&title.to_string()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

fn strength_colored(strength: Strength) -> ColoredString {
    match strength {
        Strength::VeryWeak => strength.label().red(),
        Strength::Weak => strength.label().yellow(),
        Strength::Moderate => strength.label().cyan(),
        Strength::Strong => strength.label().green(),
    }
}

fn failure(e: &SimError) -> ColoredString {
    format!("(error: {e})").red()
}

fn estimate_line(label: &str, est: &CrackEstimate) -> String {
    format!(
        "  {}: {} per guess, {} to exhaust 2^{}",
        label,
        format_duration(CrackTime::Seconds(est.per_guess_seconds)),
        format_duration(est.estimated).bold(),
        est.entropy_bits
    )
}

pub fn render_strength(bits: u32) -> String {
    let strength = Strength::from_bits(bits);
    format!("Entropy: {} bits ({})", bits, strength_colored(strength))
}

fn kdf_line(res: &KdfResult) -> String {
    let shown = res.encoded.clone().unwrap_or_else(|| res.derived_hex());
    format!(
        "  {} [{}] in {:.3}s: {}",
        res.kind,
        res.params.describe(),
        res.per_guess_seconds(),
        shown.dimmed()
    )
}

pub fn render_demo(demo: &DemoOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Salt vs No-Salt Demonstration".bold().cyan()));

    push_section(
        &mut out,
        "Password Strength".bold().yellow(),
        vec![render_strength(demo.entropy_bits)],
    );

    push_section(
        &mut out,
        "Hashing".bold().cyan(),
        vec![
            format!("Unsalted SHA-256: {}", demo.unsalted),
            format!("Salt: {}", demo.sample_user.salt.to_hex()),
            format!("Salted SHA-256:   {}", demo.sample_user.salted_digest),
        ],
    );

    let pop = &demo.population;
    push_section(
        &mut out,
        format!("Salting ({} users, same password)", pop.len()).bold().cyan(),
        vec![
            format!("Unique unsalted hashes: {}", pop.unique_unsalted()),
            format!("Unique salted hashes: {}", pop.unique_salted()),
        ],
    );

    let rainbow = if demo.rainbow_hit {
        "found in precomputed table: cracked instantly when unsalted".red()
    } else {
        "not in precomputed table".green()
    };
    push_section(
        &mut out,
        "Rainbow Table".bold().cyan(),
        vec![
            format!("Unsalted hash {rainbow}"),
            "Salted hash: a precomputed table never matches".to_string(),
        ],
    );

    let mut est_lines = vec![estimate_line("Plain SHA-256", &demo.plain)];
    for branch in &demo.kdfs {
        match &branch.outcome {
            Ok((_, est)) => est_lines.push(estimate_line(branch.kind.name(), est)),
            Err(e) => est_lines.push(format!("  {}: {}", branch.kind, failure(e))),
        }
    }
    est_lines.push(String::new());
    est_lines.push(SIMPLIFICATION_NOTE.dimmed().to_string());
    push_section(&mut out, "Crack-Time Estimates".bold().magenta(), est_lines);

    if !demo.kdfs.is_empty() {
        let lines = demo
            .kdfs
            .iter()
            .map(|b| match &b.outcome {
                Ok((res, _)) => kdf_line(res),
                Err(e) => format!("  {}: {}", b.kind, failure(e)),
            })
            .collect();
        push_section(&mut out, "KDF Outputs".bold().cyan(), lines);
    }

    if let Some(server) = &demo.server {
        let lines = match server {
            Ok(rec) => vec![
                format!("Unsalted SHA-256: {}", rec.unsalted_sha256),
                format!("Salt: {}", rec.salted.salt_hex),
                format!("Salted SHA-256:   {}", rec.salted.salted_sha256),
                format!("Argon2: {}", rec.argon2_hash.dimmed()),
            ],
            Err(e) => vec![failure(e).to_string()],
        };
        push_section(&mut out, "Server-Assisted Record (insecure demo)".bold().red(), lines);
    }
    out
}

pub fn render_attack(run: &RainbowRun) -> String {
    let o = &run.outcome;
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Rainbow Table Attack Simulation".bold().cyan()));
    let source = match run.source {
        CorpusSource::Loaded => "loaded",
        CorpusSource::Sample => "built-in sample",
    };
    push_section(
        &mut out,
        "Corpus".bold().yellow(),
        vec![
            format!("Passwords: {} ({})", o.corpus_size, source),
            format!("Precomputed table: {}", if o.used_precomputed { "yes" } else { "no" }),
            format!("Total users: {}", o.total_users),
        ],
    );
    push_section(
        &mut out,
        "Instant Compromises".bold().cyan(),
        vec![
            format!(
                "Unsalted storage: {}/{}",
                o.cracked_unsalted.to_string().red(),
                o.total_users
            ),
            format!(
                "Salted storage:   {}/{}",
                o.cracked_salted.to_string().green(),
                o.total_users
            ),
        ],
    );
    out
}

pub fn render_batch_summary(report: &BatchReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Batch Simulation Report".bold().cyan()));
    let mut lines = vec![
        format!("Total passwords: {}", s.total_passwords),
        format!("Distinct passwords: {}", report.per_password.len()),
        format!("Users per password: {}", s.users_simulated_per_password),
        format!("Rainbow hits (unsalted): {}", s.total_rainbow_hits_unsalted),
        format!("Avg entropy bits: {:.2}", s.avg_entropy_bits),
    ];
    if let Some((pw, row)) = report.per_password.iter().next() {
        lines.push(format!("Sample entry: {pw}"));
        lines.push(format!("  unsalted: {}", row.unsalted_sha256));
        lines.push(format!("  salted unique: {}", row.salted_unique_count));
        for (speed, t) in &row.crack_times_sec {
            lines.push(format!("  crack @ {speed}/s: {}", format_duration(*t)));
        }
    }
    push_section(&mut out, "Summary".bold().yellow(), lines);
    out
}

pub fn render_benchmark(rows: &[(KdfKind, String, Result<Timing, SimError>)]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "KDF Benchmark".bold().cyan()));
    let lines = rows
        .iter()
        .map(|(kind, params, res)| match res {
            Ok(t) => format!(
                "  {kind} [{params}]: min {:.4}s, avg {:.4}s, max {:.4}s ({} runs)",
                t.min, t.avg, t.max, t.repeats
            ),
            Err(e) => format!("  {kind} [{params}]: {}", failure(e)),
        })
        .collect();
    push_section(&mut out, "Seconds per Hash".bold().yellow(), lines);
    out
}

pub fn render_sweep(kind: KdfKind, entropy_bits: u32, points: &[SweepPoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        format!("{kind} Crack-Time Sweep at {entropy_bits} bits").bold().cyan()
    ));
    let mut lines: Vec<String> = points
        .iter()
        .map(|p| match &p.result {
            Ok(est) => estimate_line(&p.params.describe(), est),
            Err(e) => format!("  {}: {}", p.params.describe(), failure(e)),
        })
        .collect();
    lines.push(String::new());
    lines.push(SIMPLIFICATION_NOTE.dimmed().to_string());
    push_section(&mut out, "Estimates".bold().yellow(), lines);
    out
}
