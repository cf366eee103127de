use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use modernize_core::{
    init_tracing, CancelToken, FrameworkTag, Mode, ModernizeConfig, Modernizer, VersionTag,
};
use tracing::{debug, warn};

mod render;
use render::Format;

/// Exit status when the run could not complete at all
const FATAL_EXIT: u8 = 3;

fn cli() -> Command {
    Command::new("modernize")
        .version(modernize_core::VERSION)
        .about("Rewrite legacy Java idioms into their modern equivalents")
        .arg(
            Arg::new("root")
                .value_name("ROOT")
                .help("Project root containing the build descriptor")
                .value_parser(value_parser!(PathBuf))
                .default_value(".")
                .index(1),
        )
        .arg(
            Arg::new("apply")
                .long("apply")
                .help("Write rewritten files instead of only reporting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Report format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("java")
                .long("java")
                .value_name("VERSION")
                .help("Java release to target instead of the declared one")
                .value_parser(|s: &str| s.parse::<VersionTag>()),
        )
        .arg(
            Arg::new("framework")
                .long("framework")
                .value_name("NAME")
                .help("Framework in use; replaces detection when given")
                .value_parser(|s: &str| s.parse::<FrameworkTag>())
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("disable")
                .long("disable")
                .value_name("RULE")
                .help("Rule id to skip")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Configuration file (defaults to ROOT/modernize.toml)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("N")
                .help("Worker threads")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("list-rules")
                .long("list-rules")
                .help("Print the rule catalog and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

/// File configuration with command-line overrides applied
fn load_config(matches: &ArgMatches, root: &Path) -> Result<ModernizeConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ModernizeConfig::load(path)?,
        None => ModernizeConfig::discover(root)?,
    };

    if let Some(version) = matches.get_one::<VersionTag>("java") {
        config.version = Some(*version);
    }
    if let Some(frameworks) = matches.get_many::<FrameworkTag>("framework") {
        config.frameworks = Some(frameworks.copied().collect());
    }
    if let Some(rules) = matches.get_many::<String>("disable") {
        config.disabled_rules.extend(rules.cloned());
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.threads = Some(*threads);
    }
    debug!(?config, "Resolved configuration");
    Ok(config)
}

async fn run(matches: ArgMatches) -> Result<u8> {
    let root = matches
        .get_one::<PathBuf>("root")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let config = load_config(&matches, &root)?;
    let modernizer = Modernizer::new(config);

    if matches.get_flag("list-rules") {
        let (version, _) = modernizer.resolve_version(&root);
        let frameworks = modernizer.resolve_frameworks(&root);
        print!("{}", render::render_rules(modernizer.catalog(), version, &frameworks));
        return Ok(0);
    }

    let mode = if matches.get_flag("apply") {
        Mode::Apply
    } else {
        Mode::ScanOnly
    };
    let format: Format = matches
        .get_one::<String>("format")
        .map(|s| s.parse())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or(Format::Text);

    // Ctrl-C stops new units from starting; units in progress finish
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing files already in progress");
            on_interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || {
        modernizer.run_with_cancel(&root, mode, &cancel)
    })
    .await
    .context("modernization task failed")??;

    println!("{}", render::render(&result, format)?);
    let code = result.status().exit_code();
    Ok(u8::try_from(code).unwrap_or(FATAL_EXIT))
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    match run(matches).await {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(FATAL_EXIT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("modernize.toml"),
            "version = \"11\"\ndisabled_rules = [\"explicit-type-to-var\"]\n",
        )
        .unwrap();
        let root = dir.path().to_string_lossy().into_owned();

        let matches = cli().get_matches_from([
            "modernize",
            root.as_str(),
            "--java",
            "21",
            "--framework",
            "spring",
            "--disable",
            "loop-any-match",
            "--threads",
            "2",
        ]);
        let config = load_config(&matches, dir.path()).unwrap();
        assert_eq!(config.version, Some(VersionTag::Java21));
        assert_eq!(config.frameworks, Some(vec![FrameworkTag::Spring]));
        assert_eq!(
            config.disabled_rules,
            vec!["explicit-type-to-var".to_string(), "loop-any-match".to_string()]
        );
        assert_eq!(config.threads, Some(2));
    }

    #[test]
    fn file_values_stand_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("modernize.toml"), "version = \"17\"\n").unwrap();
        let root = dir.path().to_string_lossy().into_owned();

        let matches = cli().get_matches_from(["modernize", root.as_str()]);
        let config = load_config(&matches, dir.path()).unwrap();
        assert_eq!(config.version, Some(VersionTag::Java17));
        assert_eq!(config.frameworks, None);
    }

    #[test]
    fn unknown_versions_are_rejected() {
        assert!(cli()
            .try_get_matches_from(["modernize", "--java", "latest"])
            .is_err());
    }
}
