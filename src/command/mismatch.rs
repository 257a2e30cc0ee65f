use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use clap::Args;
use log::info;
use serde::Serialize;

use crate::fileformat::read_reference;
use crate::fileformat::CountTable;
use crate::utils::escape_html;

#[derive(Args)]
pub struct MismatchCMD {
    #[arg(long = "fasta", value_parser)]
    /// Reference miRNA sequences
    pub path_reference: PathBuf,

    #[arg(long = "counts", value_parser)]
    /// Count table made by the count or map command
    pub path_counts: PathBuf,

    #[arg(long = "mirna")]
    /// miRNA to report, e.g. mmu-let-7a-5p
    pub mirna: String,

    #[arg(long = "sample")]
    /// Sample column to use. Defaults to the first sample of the table
    pub sample: Option<String>,

    #[arg(short = 'o', long = "output", value_parser, default_value = ".")]
    /// Directory for the table and the chart
    pub path_out: PathBuf,
}

impl MismatchCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let distribution = MismatchDistribution::run(&MismatchDistribution {
            path_reference: self.path_reference.clone(),
            path_counts: self.path_counts.clone(),
            mirna: self.mirna.clone(),
            sample: self.sample.clone(),
            path_out: self.path_out.clone(),
        })?;

        println!("{}\tTotal reads: {}", distribution.mirna, distribution.total_reads);
        for row in &distribution.rows {
            println!("  Pos {} {}: {} reads", row.position, row.observed_base, row.count);
        }
        Ok(())
    }
}

/// Reads with a given observed base at one miRNA position
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub position: usize,
    pub canonical_base: char,
    pub observed_base: char,
    pub count: u64,
    pub freq_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub mirna: String,
    pub sample: String,
    pub total_reads: u64,
    pub rows: Vec<DistributionRow>,
}

///////////////////////////////
/// Where along one miRNA the mismatches fall, and which base was read instead
pub struct MismatchDistribution {
    pub path_reference: PathBuf,
    pub path_counts: PathBuf,
    pub mirna: String,
    pub sample: Option<String>,
    pub path_out: PathBuf,
}

impl MismatchDistribution {
    pub fn run(params: &MismatchDistribution) -> Result<Distribution> {
        let reference = read_reference(&params.path_reference)?;
        let table = CountTable::read_tsv(&params.path_counts)?;

        let canonical = match reference.get(&params.mirna) {
            Some(seq) => seq,
            None => bail!(
                "miRNA '{}' not found in {}",
                params.mirna,
                params.path_reference.display()
            ),
        };
        let distribution = compute_distribution(&table, &params.mirna, params.sample.as_deref(), canonical)?;

        fs::create_dir_all(&params.path_out)?;
        let path_tsv = params
            .path_out
            .join(format!("{}_mismatch_distribution.tsv", params.mirna));
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path_tsv)?;
        for row in &distribution.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let path_svg = params
            .path_out
            .join(format!("{}_mismatch_distribution.svg", params.mirna));
        fs::write(&path_svg, render_svg(&distribution))?;

        info!("Wrote {} and {}", path_tsv.display(), path_svg.display());
        Ok(distribution)
    }
}

///////////////////////////////
/// Sum read counts per (position, observed base) over all mismatch patterns of the miRNA
pub fn compute_distribution(
    table: &CountTable,
    mirna: &str,
    sample: Option<&str>,
    canonical: &str,
) -> Result<Distribution> {
    let sample_index = match sample {
        Some(s) => match table.sample_index(s) {
            Some(i) => i,
            None => bail!("Sample '{}' is not in the count table", s),
        },
        None => {
            if table.samples.is_empty() {
                bail!("The count table has no sample columns");
            }
            0
        }
    };

    let mut total_reads = 0;
    let mut found = false;
    let mut per_position: BTreeMap<usize, BTreeMap<char, u64>> = BTreeMap::new();
    for (mutations, counts) in table.rows_for_mirna(mirna) {
        found = true;
        let count = counts[sample_index];
        total_reads += count;
        for m in &mutations.0 {
            if let Some(observed) = m.observed_base() {
                *per_position
                    .entry(m.position)
                    .or_default()
                    .entry(observed)
                    .or_insert(0) += count;
            }
        }
    }
    if !found {
        bail!("miRNA '{}' not found in the count table", mirna);
    }

    let canonical: Vec<char> = canonical.chars().collect();
    let mut rows = Vec::new();
    for (position, observed) in per_position {
        //Positions are 1-based
        let canonical_base = position
            .checked_sub(1)
            .and_then(|i| canonical.get(i))
            .copied()
            .unwrap_or('N');
        for (observed_base, count) in observed {
            let freq_pct = if total_reads == 0 {
                0.0
            } else {
                count as f64 / total_reads as f64 * 100.0
            };
            rows.push(DistributionRow {
                position,
                canonical_base,
                observed_base,
                count,
                freq_pct,
            });
        }
    }

    Ok(Distribution {
        mirna: mirna.to_string(),
        sample: table.samples[sample_index].clone(),
        total_reads,
        rows,
    })
}

const SVG_WIDTH: f64 = 1000.0;
const SVG_HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 120.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Observed T, the G>T candidates, in red
fn base_color(base: char) -> &'static str {
    if base == 'T' {
        "red"
    } else {
        "gray"
    }
}

///////////////////////////////
/// Grouped bar chart: one group per mismatched position, one bar per observed base
pub fn render_svg(distribution: &Distribution) -> String {
    let plot_w = SVG_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = SVG_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let positions: Vec<(usize, char)> = {
        let mut p: Vec<(usize, char)> = distribution
            .rows
            .iter()
            .map(|r| (r.position, r.canonical_base))
            .collect();
        p.dedup();
        p
    };
    let max_freq = distribution
        .rows
        .iter()
        .map(|r| r.freq_pct)
        .fold(0.0_f64, f64::max);
    let y_max = if max_freq > 0.0 { max_freq * 1.1 } else { 1.0 };

    let mut svg = String::new();
    _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = SVG_WIDTH,
        h = SVG_HEIGHT
    );
    _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);
    _ = writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="18">Mismatch Distribution for {}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        MARGIN_TOP / 2.0 + 6.0,
        escape_html(&distribution.mirna)
    );

    //Axes
    let x0 = MARGIN_LEFT;
    let y0 = MARGIN_TOP + plot_h;
    _ = writeln!(svg, r#"<line x1="{x0}" y1="{MARGIN_TOP}" x2="{x0}" y2="{y0}" stroke="black"/>"#);
    _ = writeln!(svg, r#"<line x1="{x0}" y1="{y0}" x2="{}" y2="{y0}" stroke="black"/>"#, x0 + plot_w);
    for tick in 0..=4 {
        let value = y_max * tick as f64 / 4.0;
        let y = y0 - plot_h * tick as f64 / 4.0;
        _ = writeln!(
            svg,
            r#"<text x="{}" y="{:.1}" text-anchor="end" font-size="11">{:.1}</text>"#,
            x0 - 6.0,
            y + 4.0,
            value
        );
    }
    _ = writeln!(
        svg,
        r#"<text transform="translate(18,{:.1}) rotate(-90)" text-anchor="middle" font-size="13">Mismatch Percentage (%)</text>"#,
        MARGIN_TOP + plot_h / 2.0
    );
    _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{}" text-anchor="middle" font-size="13">Canonical Base</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        SVG_HEIGHT - 12.0
    );

    //Bars
    if !positions.is_empty() {
        let group_w = plot_w / positions.len() as f64;
        let bar_w = group_w * 0.8 / BASES.len() as f64;
        for (gi, (position, canonical)) in positions.iter().enumerate() {
            let gx = x0 + group_w * gi as f64 + group_w * 0.1;
            for (bi, base) in BASES.iter().enumerate() {
                let freq = distribution
                    .rows
                    .iter()
                    .find(|r| r.position == *position && r.observed_base == *base)
                    .map(|r| r.freq_pct)
                    .unwrap_or(0.0);
                if freq <= 0.0 {
                    continue;
                }
                let h = plot_h * freq / y_max;
                _ = writeln!(
                    svg,
                    r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>pos {} {}: {:.2}%</title></rect>"#,
                    gx + bar_w * bi as f64,
                    y0 - h,
                    bar_w,
                    h,
                    base_color(*base),
                    position,
                    base,
                    freq
                );
            }
            _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{}" text-anchor="middle" font-size="12">{}</text>"#,
                x0 + group_w * (gi as f64 + 0.5),
                y0 + 18.0,
                canonical
            );
        }
    }

    //Legend
    let lx = SVG_WIDTH - MARGIN_RIGHT + 20.0;
    _ = writeln!(svg, r#"<text x="{lx}" y="{}" font-size="12">Observed Base</text>"#, MARGIN_TOP);
    for (i, base) in BASES.iter().enumerate() {
        let ly = MARGIN_TOP + 14.0 + 18.0 * i as f64;
        _ = writeln!(
            svg,
            r#"<rect x="{lx}" y="{ly}" width="12" height="12" fill="{}"/><text x="{}" y="{}" font-size="12">{}</text>"#,
            base_color(*base),
            lx + 18.0,
            ly + 10.0,
            base
        );
    }
    svg.push_str("</svg>\n");
    svg
}
