use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::warn;

use super::job::ScanType;
use super::settings::ScannerSettings;
use super::target::{ValidatedTarget, validate_target};
use crate::error::{Result, ScanError};

pub const OPTION_OPEN_PORTS: &str = "open_ports";
pub const OPTION_VERSION_DETECTION: &str = "version_detection";

/// How a scanner is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Program plus discrete arguments; nothing is shell interpreted.
    Exec { program: String, args: Vec<String> },
    /// A command line handed to `sh -c`.
    Shell(String),
}

impl CommandSpec {
    fn exec<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exec {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_shell(&self) -> bool {
        matches!(self, CommandSpec::Shell(_))
    }

    /// Tokio command with stdin closed; output wiring is left to the caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = match self {
            CommandSpec::Exec { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            CommandSpec::Shell(line) => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(line);
                cmd
            }
        };
        cmd.stdin(Stdio::null());
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Exec { program, args } => {
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            CommandSpec::Shell(line) => write!(f, "sh -c {line:?}"),
        }
    }
}

/// Maps a scan request onto the command line for its tool.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    settings: Arc<ScannerSettings>,
}

impl CommandBuilder {
    pub fn new(settings: Arc<ScannerSettings>) -> Self {
        Self { settings }
    }

    /// Validate the raw request and build its command. The target is checked
    /// first, so a bad target wins over a bad scan type.
    pub fn prepare(
        &self,
        scan_type: &str,
        target: &str,
        option: &str,
    ) -> Result<(ScanType, ValidatedTarget, CommandSpec)> {
        let target = validate_target(target)?;
        let scan_type: ScanType = scan_type.parse()?;
        let command = self.build(scan_type, &target, option)?;
        Ok((scan_type, target, command))
    }

    pub fn build(
        &self,
        scan_type: ScanType,
        target: &ValidatedTarget,
        option: &str,
    ) -> Result<CommandSpec> {
        let tools = &self.settings.tools;
        match scan_type {
            ScanType::Portscan => match option {
                OPTION_OPEN_PORTS => {
                    Ok(CommandSpec::exec(&tools.nmap, [target.as_str()]))
                }
                OPTION_VERSION_DETECTION => Ok(CommandSpec::exec(
                    &tools.nmap,
                    ["-sV", target.as_str()],
                )),
                other => Err(ScanError::config(format!(
                    "Invalid scan option for Nmap: {other}"
                ))),
            },
            ScanType::Webscan => {
                Ok(CommandSpec::exec(&tools.nikto, ["-h", target.as_str()]))
            }
            ScanType::Fuzzscan => {
                ensure_dir(&self.settings.logs_dir)?;
                let url = target.as_url();
                let report = self.settings.fuzz_report_path.display();
                if self.settings.legacy_shell_commands {
                    warn_shell_mode(scan_type);
                    return Ok(CommandSpec::Shell(format!(
                        "{} -u {url} -m all -f html -o {report}",
                        tools.wapiti
                    )));
                }
                Ok(CommandSpec::exec(
                    &tools.wapiti,
                    [
                        "-u".to_string(),
                        url,
                        "-m".to_string(),
                        "all".to_string(),
                        "-f".to_string(),
                        "html".to_string(),
                        "-o".to_string(),
                        report.to_string(),
                    ],
                ))
            }
            ScanType::Dirscan => {
                ensure_dir(&self.settings.results_dir)?;
                let url = format!("{}/FUZZ", target.as_url());
                let wordlist = self.settings.wordlist.display();
                let report = self.settings.dir_report_path.display();
                if self.settings.legacy_shell_commands {
                    warn_shell_mode(scan_type);
                    return Ok(CommandSpec::Shell(format!(
                        "{} -u {url} -w {wordlist} -fc 404 -o {report} -of html",
                        tools.ffuf
                    )));
                }
                Ok(CommandSpec::exec(
                    &tools.ffuf,
                    [
                        "-u".to_string(),
                        url,
                        "-w".to_string(),
                        wordlist.to_string(),
                        "-fc".to_string(),
                        "404".to_string(),
                        "-o".to_string(),
                        report.to_string(),
                        "-of".to_string(),
                        "html".to_string(),
                    ],
                ))
            }
        }
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|err| {
        ScanError::execution(
            format!(
                "Failed to start scan: cannot create {}: {err}",
                path.display()
            ),
            None,
        )
    })
}

fn warn_shell_mode(scan_type: ScanType) {
    warn!(
        scan_type = %scan_type,
        "building shell command with unescaped target; legacy_shell_commands is an injection risk"
    );
}
