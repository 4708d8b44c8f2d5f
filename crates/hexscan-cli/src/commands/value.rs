//! Value command implementation: typed first and next scans.
//!
//! A first scan walks the selected regions and can `--save` its hits to a
//! JSON file. `--next <FILE>` re-reads only those addresses, narrowing them
//! with a comparison against the values recorded in the file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use hexscan::{
    Access, Comparison, RegionFilter, ScanConfig, ValueScanResults, ValueScanner, ValueType,
};
use owo_colors::OwoColorize;
use strum::{Display, EnumString};

use super::hex_utils::format_hex_address;
use crate::target::Target;

/// Hits listed in text output
const DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum CompareOp {
    Equal,
    Bigger,
    Smaller,
    Range,
    Increased,
    IncreasedBy,
    Decreased,
    DecreasedBy,
    Changed,
    Unchanged,
    Unknown,
}

impl CompareOp {
    /// Build the comparison from `operands` parsed as `value_type`.
    pub fn to_comparison(self, value_type: ValueType, operands: &[String]) -> Result<Comparison> {
        let expected = match self {
            Self::Range => 2,
            Self::Equal | Self::Bigger | Self::Smaller | Self::IncreasedBy | Self::DecreasedBy => 1,
            _ => 0,
        };
        if operands.len() != expected {
            bail!(
                "{} takes {} value(s), got {}",
                self,
                expected,
                operands.len()
            );
        }

        let values = operands
            .iter()
            .map(|text| value_type.parse(text))
            .collect::<hexscan::Result<Vec<_>>>()?;

        Ok(match self {
            Self::Equal => Comparison::Equal(values[0]),
            Self::Bigger => Comparison::Bigger(values[0]),
            Self::Smaller => Comparison::Smaller(values[0]),
            Self::Range => Comparison::Range(values[0], values[1]),
            Self::Increased => Comparison::Increased,
            Self::IncreasedBy => Comparison::IncreasedBy(values[0]),
            Self::Decreased => Comparison::Decreased,
            Self::DecreasedBy => Comparison::DecreasedBy(values[0]),
            Self::Changed => Comparison::Changed,
            Self::Unchanged => Comparison::Unchanged,
            Self::Unknown => Comparison::Unknown,
        })
    }
}

/// Arguments of one value scan
#[derive(Debug)]
pub struct ValueArgs {
    pub op: CompareOp,
    pub operands: Vec<String>,
    pub value_type: Option<ValueType>,
    pub alignment: Option<usize>,
    pub filter: RegionFilter,
    pub next: Option<PathBuf>,
    pub save: Option<PathBuf>,
    pub config: ScanConfig,
    pub json: bool,
}

pub fn run(target: &Target, args: &ValueArgs) -> Result<()> {
    run_to(&mut io::stdout().lock(), target, args)
}

fn run_to<W: Write>(out: &mut W, target: &Target, args: &ValueArgs) -> Result<()> {
    let previous = args.next.as_deref().map(load_results).transpose()?;
    let value_type = args
        .value_type
        .or(previous.as_ref().map(|p| p.value_type))
        .unwrap_or(ValueType::I32);
    // Operands are checked before the process is touched
    let comparison = args.op.to_comparison(value_type, &args.operands)?;

    let process = target.open()?;
    let stream = process.open_memory(Access::Read)?;
    let mut scanner = ValueScanner::new(&stream, value_type, args.config.clone());
    if let Some(alignment) = args.alignment {
        scanner = scanner.alignment(alignment);
    }

    let results = match previous {
        Some(ref previous) => scanner.next_scan(previous, &comparison)?,
        None => scanner.first_scan(&process.regions(args.filter)?, &comparison)?,
    };

    if let Some(ref path) = args.save {
        save_results(path, &results)?;
    }

    if args.json {
        serde_json::to_writer_pretty(&mut *out, &results)?;
        writeln!(out)?;
        return Ok(());
    }

    for hit in results.hits.iter().take(DISPLAY_LIMIT) {
        writeln!(out, "{} = {}", format_hex_address(hit.address).green(), hit.value)?;
    }
    if results.hits.len() > DISPLAY_LIMIT {
        writeln!(out, "... {} more", results.hits.len() - DISPLAY_LIMIT)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "{} of {} {} candidate(s) match {}",
        results.hits.len(),
        results.scanned,
        value_type,
        args.op
    )?;
    if let Some(ref path) = args.save {
        writeln!(out, "Saved to {} (continue with --next)", path.display())?;
    }

    Ok(())
}

fn load_results(path: &Path) -> Result<ValueScanResults> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scan results: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid scan results: {}", path.display()))
}

fn save_results(path: &Path, results: &ValueScanResults) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::os::unix::fs::FileExt;

    use hexscan::Value;
    use tempfile::TempDir;

    use super::*;
    use crate::commands::test_support::{fake_process, target_by_name};

    fn args(op: CompareOp, operands: &[&str]) -> ValueArgs {
        ValueArgs {
            op,
            operands: operands.iter().map(|s| s.to_string()).collect(),
            value_type: None,
            alignment: None,
            filter: RegionFilter::Data,
            next: None,
            save: None,
            config: ScanConfig::default(),
            json: true,
        }
    }

    fn poke(dir: &TempDir, pid: u32, address: u64, data: &[u8]) {
        let mem = dir.path().join(pid.to_string()).join("mem");
        let file = OpenOptions::new().write(true).open(mem).unwrap();
        file.write_all_at(data, address).unwrap();
    }

    #[test]
    fn test_compare_op_from_str() {
        assert_eq!("increased-by".parse::<CompareOp>().unwrap(), CompareOp::IncreasedBy);
        assert_eq!("Equal".parse::<CompareOp>().unwrap(), CompareOp::Equal);
        assert!("equals".parse::<CompareOp>().is_err());
    }

    #[test]
    fn test_to_comparison() {
        let range = CompareOp::Range
            .to_comparison(ValueType::U8, &["1".to_string(), "9".to_string()])
            .unwrap();
        assert_eq!(range, Comparison::Range(Value::U8(1), Value::U8(9)));
        assert_eq!(
            CompareOp::Changed.to_comparison(ValueType::I32, &[]).unwrap(),
            Comparison::Changed
        );
    }

    #[test]
    fn test_to_comparison_checks_operands() {
        assert!(CompareOp::Equal.to_comparison(ValueType::I32, &[]).is_err());
        assert!(
            CompareOp::Changed
                .to_comparison(ValueType::I32, &["1".to_string()])
                .is_err()
        );
        assert!(
            CompareOp::Equal
                .to_comparison(ValueType::U8, &["300".to_string()])
                .is_err()
        );
    }

    #[test]
    fn test_first_then_next_scan() {
        let mut data = vec![0u8; 0x40];
        data[0x08..0x0C].copy_from_slice(&100i32.to_le_bytes());
        data[0x20..0x24].copy_from_slice(&100i32.to_le_bytes());
        let dir = fake_process(
            4242,
            "supertux2",
            "1000-1040 rw-p 00000000 00:00 0 [heap]\n",
            &[(0x1000, data.as_slice())],
        );
        let target = target_by_name(&dir, "supertux2");
        let saved = dir.path().join("coins.json");

        let mut first = args(CompareOp::Equal, &["100"]);
        first.save = Some(saved.clone());
        let mut out = Vec::new();
        run_to(&mut out, &target, &first).unwrap();
        let results: ValueScanResults = serde_json::from_slice(&out).unwrap();
        assert_eq!(results.addresses().collect::<Vec<_>>(), vec![0x1008, 0x1020]);

        poke(&dir, 4242, 0x1020, &90i32.to_le_bytes());

        let mut next = args(CompareOp::DecreasedBy, &["10"]);
        next.next = Some(saved);
        let mut out = Vec::new();
        run_to(&mut out, &target, &next).unwrap();
        let results: ValueScanResults = serde_json::from_slice(&out).unwrap();
        assert_eq!(results.hits.len(), 1);
        assert_eq!(results.hits[0].address, 0x1020);
        assert_eq!(results.hits[0].value, Value::I32(90));
    }

    #[test]
    fn test_next_scan_missing_file() {
        let dir = fake_process(4242, "supertux2", "", &[]);
        let mut next = args(CompareOp::Changed, &[]);
        next.next = Some(dir.path().join("missing.json"));
        let err = run_to(&mut Vec::new(), &target_by_name(&dir, "supertux2"), &next).unwrap_err();
        assert!(err.to_string().contains("Failed to read scan results"));
    }

    #[test]
    fn test_text_output_lists_hits() {
        let dir = fake_process(
            4242,
            "supertux2",
            "1000-1004 rw-p 00000000 00:00 0\n",
            &[(0x1000, 7u32.to_le_bytes().as_slice())],
        );
        let mut first = args(CompareOp::Equal, &["7"]);
        first.value_type = Some(ValueType::U32);
        first.json = false;

        let mut out = Vec::new();
        run_to(&mut out, &target_by_name(&dir, "supertux2"), &first).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("= 7"));
        assert!(text.contains("1 of 1 u32 candidate(s) match equal"));
    }
}
