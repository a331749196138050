//! Shell completions and man pages.

use std::io::Write;
use std::path::PathBuf;

use clap::CommandFactory;

use crate::Cli;

fn cli_command() -> clap::Command {
    Cli::command()
}

fn completion_script(shell: clap_complete::Shell) -> Vec<u8> {
    let mut cmd = cli_command();
    let mut out = Vec::new();
    clap_complete::generate(shell, &mut cmd, "fipe-sync", &mut out);
    out
}

fn main_man_page() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let man = clap_mangen::Man::new(cli_command());
    let mut out = Vec::new();
    man.render(&mut out)?;
    Ok(out)
}

pub(crate) fn handle_completions(
    shell: clap_complete::Shell,
) -> Result<(), Box<dyn std::error::Error>> {
    std::io::stdout().write_all(&completion_script(shell))?;
    Ok(())
}

pub(crate) fn handle_man(output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            clap_mangen::generate_to(cli_command(), &dir)?;
            println!("Generated man pages in: {}", dir.display());
        }
        None => {
            std::io::stdout().write_all(&main_man_page()?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_script_names_binary() {
        let script = String::from_utf8(completion_script(clap_complete::Shell::Zsh)).unwrap();
        assert!(script.contains("fipe-sync"));
        assert!(script.contains("sync"));
    }

    #[test]
    fn test_man_page_title() {
        let page = String::from_utf8(main_man_page().unwrap()).unwrap();
        assert!(page.to_lowercase().contains(".th fipe-sync"));
    }

    #[test]
    fn test_man_pages_written_for_subcommands() {
        let dir = tempfile::tempdir().unwrap();
        handle_man(Some(dir.path().join("man"))).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("man"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n == "fipe-sync.1"));
        assert!(names.iter().any(|n| n.starts_with("fipe-sync-sync")));
    }
}
