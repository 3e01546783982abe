//! Export helpers for writing reports to JSON and CSV files.
//!
//! - `save_report_json` writes the full batch report.
//! - `save_report_csv` writes one row per distinct password.
//! - `save_sweep_csv` writes one row per sweep point, failures included.
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use crate::batch::BatchReport;
use crate::kdf::{KdfKind, SweepPoint};

/// Local timestamp used in export file names.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y.%m.%d_%H.%M.%S").to_string()
}

/// `<dir>/saltsim_<stem>_<timestamp>.<ext>`
pub fn timestamped_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    dir.join(format!("saltsim_{}_{}.{}", stem, timestamp(), ext))
}

pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P, pretty: bool) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    if pretty {
        serde_json::to_writer_pretty(&mut w, value)?;
    } else {
        serde_json::to_writer(&mut w, value)?;
    }
    writeln!(w)?;
    w.flush()?;
    Ok(())
}

pub fn save_report_json<P: AsRef<Path>>(report: &BatchReport, path: P, pretty: bool) -> Result<()> {
    save_json(report, path, pretty)
}

pub fn save_report_csv<P: AsRef<Path>>(report: &BatchReport, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    // every row carries the same speeds
    let speeds: Vec<String> = report
        .per_password
        .values()
        .next()
        .map(|r| r.crack_times_sec.keys().cloned().collect())
        .unwrap_or_default();
    let mut header = vec![
        "Password".to_string(),
        "UnsaltedSha256".to_string(),
        "SaltedUniqueCount".to_string(),
        "RainbowHitUnsalted".to_string(),
        "EntropyBits".to_string(),
    ];
    header.extend(speeds.iter().map(|s| format!("CrackSeconds@{s}")));
    wtr.write_record(&header)?;
    for (pw, row) in &report.per_password {
        let mut rec = vec![
            pw.clone(),
            row.unsalted_sha256.to_hex(),
            row.salted_unique_count.to_string(),
            row.rainbow_hit_unsalted.to_string(),
            row.entropy_bits.to_string(),
        ];
        for s in &speeds {
            rec.push(match row.crack_times_sec.get(s).and_then(|t| t.seconds()) {
                Some(sec) => sec.to_string(),
                None => "unbounded".to_string(),
            });
        }
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

fn sweep_column(kind: KdfKind) -> &'static str {
    match kind {
        KdfKind::Argon2id => "TimeCost",
        KdfKind::Bcrypt => "Rounds",
        KdfKind::Scrypt => "N",
    }
}

pub fn save_sweep_csv<P: AsRef<Path>>(kind: KdfKind, points: &[SweepPoint], path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    wtr.write_record([sweep_column(kind), "PerGuessSeconds", "CrackSeconds", "Error"])?;
    for p in points {
        let value = p.value.to_string();
        match &p.result {
            Ok(est) => {
                let per_guess = est.per_guess_seconds.to_string();
                let crack = est
                    .estimated
                    .seconds()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unbounded".to_string());
                wtr.write_record([value.as_str(), per_guess.as_str(), crack.as_str(), ""])?;
            }
            Err(e) => {
                let msg = e.to_string();
                wtr.write_record([value.as_str(), "", "", msg.as_str()])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchOptions, simulate};
    use crate::crack::{CrackEstimate, CrackTime};
    use crate::error::SimError;
    use crate::kdf::{BcryptParams, KdfParams};
    use crate::salting::SaltingEngine;
    use tempfile::tempdir;

    #[test]
    fn writes_json_and_csv() {
        let opts = BatchOptions {
            users_per_password: 3,
            ..Default::default()
        };
        let report = simulate(
            &SaltingEngine::new(),
            &["password".to_string(), "123456".to_string()],
            &opts,
        )
        .unwrap();
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("report.json");
        let csv_path = dir.path().join("report.csv");
        save_report_json(&report, &json_path, true).unwrap();
        save_report_csv(&report, &csv_path).unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(v["summary"]["total_passwords"], 2);
        assert_eq!(v["per_password"]["password"]["entropy_bits"], 38);
        assert_eq!(v["per_password"]["password"]["salted_unique_count"], 3);
        assert!(v["per_password"]["123456"]["crack_times_sec"]["1000000000"].is_f64());

        let csv_content = std::fs::read_to_string(csv_path).unwrap();
        let mut lines = csv_content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Password,UnsaltedSha256,SaltedUniqueCount,RainbowHitUnsalted,EntropyBits,CrackSeconds@10000000,CrackSeconds@1000000000"
        );
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn sweep_csv_keeps_failures() {
        let points = vec![
            SweepPoint {
                params: KdfParams::Bcrypt(BcryptParams { rounds: 6 }),
                value: 6,
                result: Ok(CrackEstimate {
                    entropy_bits: 1,
                    per_guess_seconds: 0.5,
                    estimated: CrackTime::Seconds(1.0),
                }),
            },
            SweepPoint {
                params: KdfParams::Bcrypt(BcryptParams { rounds: 7 }),
                value: 7,
                result: Err(SimError::UserCancelled { kdf: KdfKind::Bcrypt }),
            },
        ];
        let dir = tempdir().unwrap();
        let p = dir.path().join("sweep.csv");
        save_sweep_csv(KdfKind::Bcrypt, &points, &p).unwrap();
        let content = std::fs::read_to_string(p).unwrap();
        assert!(content.starts_with("Rounds,PerGuessSeconds,CrackSeconds,Error\n6,0.5,1,\n"));
        assert!(content.contains("7,,,bcrypt cancelled by user"));
    }

    #[test]
    fn timestamped_names() {
        let p = timestamped_path(Path::new("out"), "report", "json");
        let name = p.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("saltsim_report_"));
        assert!(name.ends_with(".json"));
        assert_eq!(p.parent().unwrap(), Path::new("out"));
    }
}
