use std::process::Command;
use std::process::Output;

use log::debug;
use log::info;

use crate::runtime::Error;

/// Render a command the way it would be typed in a shell, for logs and error messages
pub fn command_to_string(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args = cmd
        .get_args()
        .map(|arg| arg.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", program, args)
}

///////////////////////////////
/// Check that a utility can be started at all. The exit status of `--version` is not inspected
pub fn check_software(utility: &str) -> Result<(), Error> {
    debug!("Checking for {}", utility);
    match Command::new(utility).arg("--version").output() {
        Ok(_) => {
            info!("Found {}", utility);
            Ok(())
        }
        Err(_) => Err(Error::utility_not_executable(utility)),
    }
}

pub fn check_bowtie() -> Result<(), Error> {
    check_software("bowtie-build")?;
    check_software("bowtie")
}

///////////////////////////////
/// Run to completion. A non-zero exit becomes an error carrying the command line and stderr
pub fn run_checked(utility: &str, cmd: &mut Command) -> Result<Output, Error> {
    let cmd_string = command_to_string(cmd);
    debug!("Running {}", cmd_string);

    let output = cmd
        .output()
        .map_err(|_| Error::utility_not_executable(utility))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let msg = if stderr.trim().is_empty() {
            format!("exit status {}", output.status)
        } else {
            format!("exit status {}: {}", output.status, stderr.trim())
        };
        return Err(Error::utility_execution_error(utility, cmd_string, Some(msg)));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_string() {
        let mut cmd = Command::new("bowtie");
        cmd.arg("idx").arg("--norc").arg("-l").arg("7");
        assert_eq!(command_to_string(&cmd), "bowtie idx --norc -l 7");
    }

    #[test]
    fn missing_utility_is_reported() {
        let e = check_software("surely-not-an-installed-aligner").unwrap_err();
        assert!(matches!(e, Error::UtilityNotExecutable { .. }));
    }
}
