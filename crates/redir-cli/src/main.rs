//! Redirect Rules CLI
//!
//! CLI tool for testing rules and maintaining rule list files.

use std::fs;
use std::io::Write;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

use redir_core::{apply, ChainStatus, MatchMode, ResolveOptions, Rule, RuleSet, DEFAULT_MAX_ITERATIONS};
use redir_rules::{dedupe_rules, export_rule_list, optimize_rules, parse_rule_list, validate_rules, Severity};

#[derive(Parser)]
#[command(name = "redir-cli")]
#[command(about = "Redirect rule tester and rule list tools")]
struct Cli {
    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve URLs against a rule list file
    Check {
        /// Rule list JSON file
        #[arg(short, long)]
        rules: String,

        /// URLs to resolve
        #[arg(required = true)]
        urls: Vec<String>,

        /// Maximum redirects followed per URL
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,

        /// Print results as JSON lines
        #[arg(long)]
        json: bool,

        /// Fail when any URL ends in a circular or infinite redirect
        #[arg(long)]
        deny_loops: bool,
    },

    /// Apply a single rule given on the command line
    TestRule {
        /// Pattern to match
        #[arg(long)]
        from: String,

        /// Replacement template
        #[arg(long)]
        to: String,

        /// How to interpret the pattern
        #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
        mode: ModeArg,

        /// URLs to test
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Report rules that can never match or look broken
    Validate {
        /// Rule list JSON file
        #[arg(short, long)]
        rules: String,
    },

    /// Rewrite a rule list with every default spelled out
    Normalize {
        /// Rule list JSON file
        #[arg(short, long)]
        input: String,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Drop exact duplicate rules
        #[arg(long)]
        dedupe: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Auto,
    Regex,
    UrlPattern,
}

impl From<ModeArg> for MatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => MatchMode::Auto,
            ModeArg::Regex => MatchMode::Regex,
            ModeArg::UrlPattern => MatchMode::UrlPattern,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check {
            rules,
            urls,
            max_iterations,
            json,
            deny_loops,
        } => cmd_check(&rules, &urls, max_iterations, json, deny_loops),
        Commands::TestRule { from, to, mode, urls } => cmd_test_rule(from, to, mode.into(), &urls),
        Commands::Validate { rules } => cmd_validate(&rules),
        Commands::Normalize { input, output, dedupe } => cmd_normalize(&input, output.as_deref(), dedupe),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_rules(path: &str) -> Result<Vec<Rule>, String> {
    let content = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    parse_rule_list(&content).map_err(|e| format!("Failed to parse '{}': {}", path, e))
}

fn cmd_check(
    rules_path: &str,
    urls: &[String],
    max_iterations: u32,
    json: bool,
    deny_loops: bool,
) -> Result<(), String> {
    let start = Instant::now();
    let mut rules = load_rules(rules_path)?;
    let stats = optimize_rules(&mut rules);
    let set = RuleSet::compile(&rules);
    log::info!(
        "Loaded {} rules ({} active) in {:.1}ms",
        stats.before,
        stats.after,
        start.elapsed().as_secs_f64() * 1000.0
    );

    let options = ResolveOptions { max_iterations };
    let mut loops = 0usize;

    for url in urls {
        let result = set.resolve_with(url, &options);
        if matches!(result.status, ChainStatus::Circular | ChainStatus::Infinite) {
            loops += 1;
        }

        if json {
            let line = serde_json::json!({ "url": url, "status": result.status, "urls": result.urls });
            println!("{line}");
            continue;
        }

        println!("{url}");
        println!("  Status:   {}", result.status);
        for (hop, target) in result.urls.iter().enumerate() {
            println!("  [{}] {}", hop + 1, target);
        }
        if let Some(target) = result.terminal_url() {
            println!("  Redirect: {target}");
        }
    }

    if deny_loops && loops > 0 {
        return Err(format!("{loops} URL(s) ended in a redirect loop"));
    }

    Ok(())
}

fn cmd_test_rule(from: String, to: String, mode: MatchMode, urls: &[String]) -> Result<(), String> {
    let rule = Rule::new(from, to).with_mode(mode);
    for url in urls {
        let outcome = apply(&rule, url);
        if outcome.matched {
            println!("match    {url} -> {}", outcome.url);
        } else {
            println!("no match {url}");
        }
    }
    Ok(())
}

fn cmd_validate(rules_path: &str) -> Result<(), String> {
    let rules = load_rules(rules_path)?;
    let diagnostics = validate_rules(&rules);

    for diagnostic in &diagnostics {
        println!("{diagnostic}");
    }

    let errors = diagnostics
        .iter()
        .filter(|diagnostic| diagnostic.severity == Severity::Error)
        .count();
    let warnings = diagnostics.len() - errors;
    println!("Checked {} rules: {} errors, {} warnings", rules.len(), errors, warnings);

    if errors > 0 {
        return Err(format!("'{}' has {} invalid rule(s)", rules_path, errors));
    }
    Ok(())
}

fn cmd_normalize(input: &str, output: Option<&str>, dedupe: bool) -> Result<(), String> {
    let mut rules = load_rules(input)?;
    let before = rules.len();
    if dedupe {
        let removed = dedupe_rules(&mut rules);
        log::info!("Removed {removed} duplicate rules");
    }

    let json = export_rule_list(&rules).map_err(|e| format!("Failed to serialize rules: {}", e))?;

    match output {
        Some(path) => {
            let mut file = fs::File::create(path).map_err(|e| format!("Failed to create '{}': {}", path, e))?;
            file.write_all(json.as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            println!("Normalized {} rules -> {} rules in '{}'", before, rules.len(), path);
        }
        None => println!("{json}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_test_rule_args() {
        let cli = Cli::parse_from([
            "redir-cli",
            "test-rule",
            "--from",
            "https://youtu.be/:id",
            "--to",
            "{{pathname.groups.id}}",
            "--mode",
            "url-pattern",
            "https://youtu.be/abc",
        ]);
        match cli.command {
            Commands::TestRule { mode, urls, .. } => {
                assert_eq!(MatchMode::from(mode), MatchMode::UrlPattern);
                assert_eq!(urls, vec!["https://youtu.be/abc".to_string()]);
            }
            _ => panic!("expected test-rule"),
        }
    }

    #[test]
    fn test_check_defaults() {
        let cli = Cli::parse_from(["redir-cli", "-v", "check", "-r", "rules.json", "https://a.com/"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Check { max_iterations, json, deny_loops, .. } => {
                assert_eq!(max_iterations, DEFAULT_MAX_ITERATIONS);
                assert!(!json);
                assert!(!deny_loops);
            }
            _ => panic!("expected check"),
        }
    }
}
