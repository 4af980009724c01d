//! skillcue: rule-driven skill activation hooks.
//!
//! Each event subcommand reads one hook JSON object on stdin and writes one
//! JSON object on stdout. Anything that goes wrong is logged to stderr and
//! answered with `{}`.

mod handlers;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use handlers::Hooks;
use skillcue_config::{
    CliOverrides, SKILLS_DIR, SkillcueConfig, load_rules_file, resolve_project_root, try_load,
};
use skillcue_hooks::{HookInput, HookOutput};
use skillcue_matcher::RuleMatcher;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

/// Env var holding a tracing filter directive; overrides every other level source.
const LOG_ENV: &str = "SKILLCUE_LOG";

#[derive(Parser)]
#[command(
    name = "skillcue",
    version,
    about = "Rule-driven skill activation hooks for AI coding assistants"
)]
struct Cli {
    /// Project root (overrides CLAUDE_PROJECT_DIR and the hook's cwd)
    #[arg(long, global = true)]
    project_dir: Option<PathBuf>,

    /// Rule file to use instead of .claude/skills/skill-rules.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "SKILLCUE_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// UserPromptSubmit hook
    PromptSubmit,
    /// PreToolUse hook
    PreToolUse,
    /// PostToolUse hook
    PostToolUse,
    /// Stop hook
    Stop,
    /// Remove expired session records
    Cleanup,
    /// Validate the rule file and list its skills
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::CheckConfig => check_config(&cli),
        Command::Cleanup => cleanup(&cli).await,
        event => {
            let output = run_event(&cli, event).await;
            println!("{}", output.to_json());
            ExitCode::SUCCESS
        }
    }
}

/// Handle one hook event. Never fails: errors become `{}`.
async fn run_event(cli: &Cli, event: Command) -> HookOutput {
    let input = read_stdin()
        .await
        .and_then(|raw| HookInput::parse(&raw).context("Invalid hook input"));
    let hook_cwd = input.as_ref().ok().and_then(|i| i.cwd.clone());
    let config = load_config(cli, hook_cwd.as_deref());

    let result = match input {
        Ok(input) => dispatch(config, event, &input).await,
        Err(e) => Err(e),
    };
    result.unwrap_or_else(|e| {
        tracing::warn!("{event:?} failed, answering with no decision: {e:#}");
        HookOutput::empty()
    })
}

async fn dispatch(
    config: SkillcueConfig,
    event: Command,
    input: &HookInput,
) -> Result<HookOutput> {
    let hooks = match event {
        Command::PreToolUse => return Ok(handlers::pre_tool_use(&config, input)),
        Command::Cleanup | Command::CheckConfig => return Ok(HookOutput::empty()),
        Command::PromptSubmit | Command::PostToolUse | Command::Stop => {
            Hooks::open(config).await?
        }
    };
    match event {
        Command::PromptSubmit => hooks.prompt_submit(input).await,
        Command::PostToolUse => hooks.post_tool_use(input).await,
        Command::Stop => hooks.stop(input).await,
        Command::PreToolUse | Command::Cleanup | Command::CheckConfig => Ok(HookOutput::empty()),
    }
}

async fn read_stdin() -> Result<String> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("Failed to read hook input")?;
    Ok(raw)
}

async fn cleanup(cli: &Cli) -> ExitCode {
    let config = load_config(cli, None);
    let result = async {
        let hooks = Hooks::open(config).await?;
        hooks.cleanup().await
    }
    .await;
    match result {
        Ok(removed) => {
            eprintln!("Removed {removed} session record(s)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Cleanup failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Strict load: unlike the hooks, a parse failure is reported and fails.
fn check_config(cli: &Cli) -> ExitCode {
    init_logging(cli, cli.verbose);
    let project_root = resolve_project_root(cli.project_dir.clone(), None);
    let loaded = match &cli.config {
        Some(path) => load_rules_file(path).map(|rules| Some((path.clone(), rules))),
        None => try_load(&project_root),
    };

    let (path, rules) = match loaded {
        Ok(Some(found)) => found,
        Ok(None) => {
            eprintln!(
                "No rule file under {}; built-in defaults apply",
                project_root.join(SKILLS_DIR).display()
            );
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Bad patterns are reported as warnings while compiling.
    let matcher = RuleMatcher::new(&rules, project_root.clone());

    eprintln!("{}: {} skill(s)", path.display(), rules.skills.len());
    for (name, rule) in &rules.skills {
        let body = if skillcue_config::skill_exists(&project_root, name) {
            ""
        } else {
            " (no SKILL.md)"
        };
        let (triggers, validations) = matcher
            .skill(name)
            .map(|s| (s.triggers.len(), s.validations.len()))
            .unwrap_or_default();
        eprintln!(
            "  {name}: {:?}/{:?}/{}, {triggers} trigger(s), {validations}/{} validation rule(s){body}",
            rule.skill_type,
            rule.enforcement,
            rule.priority.as_str(),
            rule.validation_rules.len()
        );
    }
    ExitCode::SUCCESS
}

/// Load configuration under a temporary subscriber so load-time warnings
/// are not lost, then install the global subscriber at the final level.
fn load_config(cli: &Cli, hook_cwd: Option<&str>) -> SkillcueConfig {
    let overrides = CliOverrides {
        project_dir: cli.project_dir.clone(),
        config_path: cli.config.clone(),
    };
    let config = tracing::subscriber::with_default(subscriber(cli, cli.verbose), || {
        SkillcueConfig::load(overrides, hook_cwd)
    });
    init_logging(cli, cli.verbose || config.rules.settings.enable_debug_logging);
    config
}

fn init_logging(cli: &Cli, debug: bool) {
    if let Err(e) = tracing::subscriber::set_global_default(subscriber(cli, debug)) {
        eprintln!("skillcue: failed to install logger: {e}");
    }
}

/// Level: `SKILLCUE_LOG` > `debug` flag > warn. Always writes to stderr.
fn subscriber(cli: &Cli, debug: bool) -> Box<dyn tracing::Subscriber + Send + Sync> {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if cli.log_json {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.finish())
    }
}
