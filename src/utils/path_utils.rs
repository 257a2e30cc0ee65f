use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

///////////////////////////////
/// Expand ~ and environment variables, then make the path absolute.
/// The path does not have to exist. Paths that are not UTF-8 are used as given
pub fn expand_and_resolve<P: AsRef<Path>>(input: P) -> Result<PathBuf> {
    let input = input.as_ref();
    let expanded: PathBuf = match input.to_str() {
        Some(s) => match shellexpand::full(s) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                log::warn!("Could not expand path {:?} ({}); using it as given", input, e);
                input.to_path_buf()
            }
        },
        None => {
            log::warn!("Path {:?} is not valid UTF-8; skipping expansion", input);
            input.to_path_buf()
        }
    };

    if let Ok(absolute) = fs::canonicalize(&expanded) {
        return Ok(absolute);
    }
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(env::current_dir()
            .context("Failed to get current directory")?
            .join(expanded))
    }
}

///////////////////////////////
/// "out/liver_1" + ".col.fa" => "out/liver_1.col.fa"
pub fn with_suffix<P: AsRef<Path>>(prefix: P, suffix: &str) -> PathBuf {
    let mut s = prefix.as_ref().as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_appended_not_replaced() {
        assert_eq!(
            with_suffix("out/liver_1", ".bowtie_mapped.txt"),
            PathBuf::from("out/liver_1.bowtie_mapped.txt")
        );
    }

    #[test]
    fn relative_paths_become_absolute() {
        let p = expand_and_resolve("surely/not/existing.png").unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("surely/not/existing.png"));
    }
}
