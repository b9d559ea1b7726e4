//! Template Analyzer CLI - Command-line interface for infrastructure template analysis
//!
//! CDD Principle: Application Layer - CLI coordinates user interactions with domain services
//! - Translates user commands to analyzer operations
//! - Handles external concerns like file I/O, process exit codes, and terminal output
//! - Keeps rule selection and formatting decisions out of the library

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use template_analyzer::{
    AnalyzerConfig, AnalyzerResult, OutputFormat, ReportFormatter, ReportOptions, RuleCategory,
    RuleSelection, Severity, TemplateAnalyzer,
};

const DEFAULT_CONFIG_FILES: [&str; 3] =
    ["template_analyzer.yaml", "template_analyzer.yml", ".template_analyzer.yaml"];

/// Template Analyzer - Rule analysis for compiled infrastructure templates
#[derive(Parser)]
#[command(name = "template-analyzer")]
#[command(version)]
#[command(about = "Analyze compiled infrastructure templates for security and best-practice violations")]
#[command(long_about = "Template Analyzer runs rules against compiled (expanded) infrastructure templates and reports each failure at its line in the template you authored, using the compiler's source map when one is supplied.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a compiled template
    Analyze {
        /// Compiled (expanded) JSON template
        template: PathBuf,

        /// Source map emitted by the compiler
        #[arg(long)]
        source_map: Option<PathBuf>,

        /// Template as authored, before compilation
        #[arg(long)]
        original: Option<PathBuf>,

        /// Run only security rules
        #[arg(long)]
        security_only: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormatArg,

        /// Minimum severity level to report
        #[arg(short, long, value_enum)]
        severity: Option<SeverityArg>,

        /// Include passing rules in the output
        #[arg(long)]
        show_passed: bool,
    },

    /// List available rules
    Rules {
        /// Show only enabled rules
        #[arg(long)]
        enabled_only: bool,

        /// Filter by category
        #[arg(long, value_enum)]
        category: Option<CategoryArg>,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule id or name to explain
        rule_id: String,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config_file: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum SeverityArg {
    Info,
    Warning,
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Info => Severity::Info,
            SeverityArg::Warning => Severity::Warning,
            SeverityArg::Error => Severity::Error,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum CategoryArg {
    Security,
    General,
}

impl From<CategoryArg> for RuleCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Security => RuleCategory::Security,
            CategoryArg::General => RuleCategory::General,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn run_command(cli: Cli) -> AnalyzerResult<i32> {
    match cli.command {
        Commands::Analyze { template, source_map, original, security_only, format, severity, show_passed } => {
            let options = ReportOptions {
                use_colors: !cli.no_color,
                show_passed,
                min_severity: severity.map(Severity::from),
                ..Default::default()
            };
            run_analyze(
                cli.config,
                &template,
                source_map.as_deref(),
                original.as_deref(),
                RuleSelection::from_all_rules(!security_only),
                format.into(),
                options,
            )
        }
        Commands::Rules { enabled_only, category } => {
            run_list_rules(cli.config, enabled_only, category.map(RuleCategory::from))
        }
        Commands::Explain { rule_id } => run_explain(cli.config, &rule_id),
        Commands::ValidateConfig { config_file } => run_validate_config(config_file.or(cli.config)),
    }
}

fn run_analyze(
    config_path: Option<PathBuf>,
    template: &Path,
    source_map: Option<&Path>,
    original: Option<&Path>,
    selection: RuleSelection,
    format: OutputFormat,
    options: ReportOptions,
) -> AnalyzerResult<i32> {
    let config = load_config(config_path)?;

    let analyzer = TemplateAnalyzer::new(config, selection)?
        .with_report_formatter(ReportFormatter::new(options));

    let report = analyzer.analyze_file(template, source_map, original)?;

    println!("{}", analyzer.format_report(&report, format)?);

    if report.has_errors() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn run_list_rules(
    config_path: Option<PathBuf>,
    enabled_only: bool,
    category_filter: Option<RuleCategory>,
) -> AnalyzerResult<i32> {
    let config = load_config(config_path)?;

    println!("Available Rules\n");

    for rule in &config.rules {
        if enabled_only && !rule.enabled {
            continue;
        }
        if category_filter.is_some_and(|category| category != rule.category) {
            continue;
        }

        let status = if rule.enabled { "enabled " } else { "disabled" };
        println!(
            "  {} {} {} [{}, {}] - {}",
            status,
            rule.id,
            rule.name,
            rule.category.as_str(),
            rule.severity.as_str(),
            rule.description
        );
    }

    Ok(0)
}

fn run_explain(config_path: Option<PathBuf>, rule_id: &str) -> AnalyzerResult<i32> {
    let config = load_config(config_path)?;

    let Some(rule) = config.find_rule(rule_id) else {
        eprintln!("Rule '{}' not found", rule_id);
        println!();
        println!("Available rules:");
        for rule in &config.rules {
            println!("  - {} ({})", rule.id, rule.name);
        }
        return Ok(1);
    };

    println!("Rule: {} ({})", rule.id, rule.name);
    println!("Category: {}", rule.category.as_str());
    println!("Severity: {}", rule.severity.as_str());
    println!("Enabled: {}", rule.enabled);
    println!("Applies to: {}", rule.resource_type.as_deref().unwrap_or("template"));
    println!();
    println!("Description:");
    println!("   {}", rule.description);
    println!();
    println!("Check:");
    println!("   {} {:?}", rule.check.path, rule.check.condition);
    if let Some(default) = &rule.check.default {
        println!("   (assumed {} when absent)", default);
    }
    println!();
    println!("Recommendation:");
    println!("   {}", rule.recommendation);
    println!("   {}", rule.help_uri);

    Ok(0)
}

fn run_validate_config(config_path: Option<PathBuf>) -> AnalyzerResult<i32> {
    let config_path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));

    println!("Validating configuration: {}", config_path.display());

    match AnalyzerConfig::load_from_file(&config_path) {
        Ok(config) => {
            println!("Configuration is valid");

            let enabled = config.enabled_rules().count();
            let security = config
                .enabled_rules()
                .filter(|rule| rule.category == RuleCategory::Security)
                .count();

            println!("Configuration summary:");
            println!("  Rules: {} total, {} enabled, {} security", config.rules.len(), enabled, security);
            println!("  Baseline: {}", config.baseline_path().display());

            Ok(0)
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {}", e);
            Ok(1)
        }
    }
}

/// Load an explicit config, else the first default config file present, else built-in rules
fn load_config(config_path: Option<PathBuf>) -> AnalyzerResult<AnalyzerConfig> {
    if let Some(path) = config_path {
        return AnalyzerConfig::load_from_file(path);
    }

    match DEFAULT_CONFIG_FILES.iter().find(|name| Path::new(name).exists()) {
        Some(name) => {
            tracing::debug!("Using configuration file {}", name);
            AnalyzerConfig::load_from_file(name)
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
