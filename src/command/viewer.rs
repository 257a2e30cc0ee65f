use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Result;
use clap::Args;
use log::info;
use log::warn;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::command::constants::{DEFAULT_VIEWER_TITLE, FIGURE_EXTENSIONS};
use crate::runtime::Error;
use crate::utils::escape_html;
use crate::utils::expand_and_resolve;

#[derive(Args)]
pub struct ViewerCMD {
    #[arg(short = 'd', value_parser)]
    /// Directory with the figures
    pub path_figures: PathBuf,

    #[arg(short = 'm', value_parser)]
    /// TSV with columns file, title, description and optionally note. Lists all images of the directory if not given
    pub path_manifest: Option<PathBuf>,

    #[arg(long = "title", default_value = DEFAULT_VIEWER_TITLE)]
    pub title: String,

    #[arg(long = "stat")]
    /// Summary box, as LABEL=VALUE. Can be given several times
    pub stats: Vec<String>,

    #[arg(short = 'o', value_parser)]
    /// HTML file to write
    pub path_out: PathBuf,
}

impl ViewerCMD {
    pub fn try_execute(&mut self) -> Result<()> {
        let figures = match &self.path_manifest {
            Some(path) => read_manifest(path)?,
            None => list_figures(&self.path_figures)?,
        };
        let stats = self
            .stats
            .iter()
            .map(|s| parse_stat(s))
            .collect::<Result<Vec<_>>>()?;

        let num_included = Viewer::run(&Viewer {
            path_figures: self.path_figures.clone(),
            figures,
            title: self.title.clone(),
            stats,
            path_out: self.path_out.clone(),
        })?;

        info!("Viewer written to {}", self.path_out.display());
        info!("Figures included: {}", num_included);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FigureEntry {
    pub file: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub note: Option<String>,
}

pub fn read_manifest(path: &Path) -> Result<Vec<FigureEntry>> {
    if !path.exists() {
        return Err(Error::file_not_found(path).into());
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_path(path)?;
    let mut entries = Vec::new();
    for entry in reader.deserialize() {
        let entry: FigureEntry = entry.map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;
        entries.push(entry);
    }
    Ok(entries)
}

///////////////////////////////
/// All images directly in a directory, in name order, titled by file stem
pub fn list_figures(dir: &Path) -> Result<Vec<FigureEntry>> {
    if !dir.is_dir() {
        return Err(Error::file_not_found(dir).into());
    }
    let entries = WalkDir::new(dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| {
                    let ext = ext.to_string_lossy().to_lowercase();
                    FIGURE_EXTENSIONS.contains(&ext.as_str())
                })
                .unwrap_or(false)
        })
        .map(|e| {
            let path = e.path();
            FigureEntry {
                file: e.file_name().to_string_lossy().into_owned(),
                title: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                description: String::new(),
                note: None,
            }
        })
        .collect();
    Ok(entries)
}

pub fn parse_stat(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((label, value)) => Ok((label.trim().to_string(), value.trim().to_string())),
        None => bail!("Summary statistic '{}' is not of the form LABEL=VALUE", s),
    }
}

///////////////////////////////
/// Static HTML page showing a list of figures with titles and descriptions
pub struct Viewer {
    pub path_figures: PathBuf,
    pub figures: Vec<FigureEntry>,
    pub title: String,
    pub stats: Vec<(String, String)>,
    pub path_out: PathBuf,
}

impl Viewer {
    /// Returns the number of figures that were found and included
    pub fn run(params: &Viewer) -> Result<usize> {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let (html, num_included) = Self::render(params, &timestamp)?;

        if let Some(parent) = params.path_out.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&params.path_out, html)?;
        Ok(num_included)
    }

    pub fn render(params: &Viewer, timestamp: &str) -> Result<(String, usize)> {
        let title = escape_html(&params.title);
        let mut lines: Vec<String> = vec![
            "<!DOCTYPE html>".into(),
            "<html lang=\"en\">".into(),
            "<head>".into(),
            "    <meta charset=\"UTF-8\">".into(),
            "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">".into(),
            format!("    <title>{}</title>", title),
            "    <style>".into(),
            STYLE.into(),
            "    </style>".into(),
            "</head>".into(),
            "<body>".into(),
            "    <div class=\"container\">".into(),
            format!("        <h1>{}</h1>", title),
        ];

        if !params.stats.is_empty() {
            lines.push("        <div class=\"summary\">".into());
            lines.push("            <h2>Summary Statistics</h2>".into());
            for (label, value) in &params.stats {
                lines.push("            <div class=\"stat-box\">".into());
                lines.push(format!("                <strong>{}</strong><br>", escape_html(value)));
                lines.push(format!("                {}", escape_html(label)));
                lines.push("            </div>".into());
            }
            lines.push("        </div>".into());
        }

        let mut num_included = 0;
        for figure in &params.figures {
            let path = params.path_figures.join(&figure.file);
            if !path.exists() {
                warn!("{} not found, leaving it out", path.display());
                continue;
            }
            let abs_path = expand_and_resolve(&path)?;
            let title = escape_html(&figure.title);

            lines.push("        <div class=\"figure-container\">".into());
            lines.push(format!("            <div class=\"figure-title\">{}</div>", title));
            if !figure.description.is_empty() {
                lines.push(format!(
                    "            <div class=\"figure-description\">{}</div>",
                    escape_html(&figure.description)
                ));
            }
            lines.push(format!(
                "            <img src=\"file://{}\" alt=\"{}\" style=\"max-width: 100%; height: auto;\">",
                escape_html(&abs_path.to_string_lossy()),
                title
            ));
            if let Some(note) = figure.note.as_ref().filter(|n| !n.is_empty()) {
                lines.push(format!("            <div class=\"figure-note\">{}</div>", escape_html(note)));
            }
            lines.push("        </div>".into());
            num_included += 1;
        }

        lines.push("        <div class=\"footer\">".into());
        lines.push(format!("            <p>Generated: {}</p>", escape_html(timestamp)));
        lines.push("        </div>".into());
        lines.push("    </div>".into());
        lines.push("</body>".into());
        lines.push("</html>".into());

        Ok((lines.join("\n") + "\n", num_included))
    }
}

const STYLE: &str = r#"        body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif; line-height: 1.6; margin: 0; padding: 20px; background: #f5f5f5; }
        .container { max-width: 1600px; margin: 0 auto; background: white; padding: 40px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        h1 { color: #D62728; border-bottom: 3px solid #D62728; padding-bottom: 10px; }
        h2 { color: #333; margin-top: 40px; border-bottom: 2px solid #ddd; padding-bottom: 5px; }
        .summary { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .stat-box { display: inline-block; margin: 10px 20px 10px 0; padding: 15px 25px; background: white; border-radius: 5px; text-align: center; }
        .figure-container { margin: 40px 0; text-align: center; }
        .figure-title { font-size: 1.2em; font-weight: bold; margin-bottom: 10px; }
        .figure-description { color: #666; font-size: 0.95em; margin: 0 auto 20px auto; max-width: 1200px; text-align: left; }
        .figure-note { background: #f0f8ff; padding: 15px; border-radius: 5px; margin: 10px 0; font-size: 0.9em; text-align: left; }
        .footer { margin-top: 40px; padding-top: 20px; border-top: 1px solid #ddd; text-align: center; color: #666; }"#;
