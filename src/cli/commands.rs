//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::application::services::{Outcome, PlannerService, Step, StepReport};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::render::TreeDisplay;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Build, Denial};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let project_dir = resolve_project_dir(cli)?;
    match &cli.command {
        Some(Commands::Show) => cmd_show(&container(cli, &project_dir)?),
        Some(Commands::Plan { steps, strict }) => {
            cmd_plan(&container(cli, &project_dir)?, steps, *strict)
        }
        Some(Commands::Inspect { target, steps }) => {
            cmd_inspect(&container(cli, &project_dir)?, target, steps)
        }
        Some(Commands::Config { command }) => cmd_config(command, &project_dir),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

fn resolve_project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(InfraError::io("resolve current directory", e))),
    }
}

fn container(cli: &Cli, project_dir: &Path) -> CliResult<ServiceContainer> {
    let mut settings = Settings::load(Some(project_dir))?;
    if let Some(catalog) = &cli.catalog {
        settings.catalog = Some(catalog.clone());
    }
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

fn parse_steps(steps: &[String]) -> CliResult<Vec<Step>> {
    steps
        .iter()
        .map(|s| s.parse::<Step>().map_err(CliError::from))
        .collect()
}

fn print_build(build: &Build) {
    for tree in build.trees() {
        output::info(&tree.to_tree_string(build.rules()));
    }
    output::info(&format!("Points: {}", build.totals()));
}

#[instrument(skip(services))]
fn cmd_show(services: &ServiceContainer) -> CliResult<()> {
    let planner = services.planner()?;
    print_build(&planner.snapshot()?);
    Ok(())
}

fn print_report(report: &StepReport) {
    match &report.outcome {
        Outcome::Applied(totals) => output::success(&format!("{}  {}", report.step, totals)),
        Outcome::Declined(denial) => output::failure(&format!("{}  {}", report.step, denial)),
    }
}

fn declined_reports(reports: &[StepReport]) -> Vec<&StepReport> {
    reports.iter().filter(|r| !r.outcome.is_applied()).collect()
}

#[instrument(skip(services))]
fn cmd_plan(services: &ServiceContainer, steps: &[String], strict: bool) -> CliResult<()> {
    let steps = parse_steps(steps)?;
    let planner = services.planner()?;
    let reports = planner.apply(&steps)?;

    output::header("Steps");
    for report in &reports {
        print_report(report);
    }
    print_build(&planner.snapshot()?);

    let declined = declined_reports(&reports).len();
    if strict && declined > 0 {
        return Err(CliError::Denied(declined));
    }
    Ok(())
}

fn verdict(decision: &Result<(), Denial>) -> String {
    match decision {
        Ok(()) => "yes".to_string(),
        Err(denial) => format!("no ({denial})"),
    }
}

#[instrument(skip(services))]
fn cmd_inspect(services: &ServiceContainer, target: &str, steps: &[String]) -> CliResult<()> {
    let (tree, node) = target
        .split_once(':')
        .ok_or_else(|| CliError::InvalidArgs(format!("expected tree:talent, got {target}")))?;
    let steps = parse_steps(steps)?;
    let planner: PlannerService = services.planner()?;
    let reports = planner.apply(&steps)?;
    let declined = declined_reports(&reports);
    if !declined.is_empty() {
        output::header("Declined steps");
        for report in declined {
            print_report(report);
        }
    }

    let view = planner.node_view(tree, node)?;
    let build = planner.snapshot()?;
    let talent = build.node(tree, node).map_err(ApplicationError::from)?;

    output::header(&format!("{} ({}:{})", talent.name, tree, talent.id));
    output::field("rank", &format!("{}/{}", talent.current_rank(), talent.max_rank));
    let required = talent.required_points(build.rules());
    if required > 0 {
        output::field("requires", &format!("{required} points in {tree}"));
    }
    if let Some(prerequisite) = build
        .prerequisite_of(tree, node)
        .map_err(ApplicationError::from)?
    {
        output::field("requires", &prerequisite.name);
    }
    if let Some(current) = talent.current_description() {
        output::field("current", &current);
    }
    if let Some(next) = talent.next_description() {
        output::field("next", &next);
    } else {
        output::field("next", &"talent maxed");
    }
    output::field("unlocked", &if view.unlocked { "yes" } else { "no" });
    output::field("learn", &verdict(&view.increase));
    output::field("unlearn", &verdict(&view.decrease));
    Ok(())
}

fn cmd_config(command: &ConfigCommands, project_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(Some(project_dir))?;
            output::info(&settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::field("global", &p.display()),
                None => output::field("global", &"(unavailable)"),
            }
            output::field("local", &local_config_path(project_dir).display());
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config_path(project_dir)
            };
            let services = ServiceContainer::new(Settings::default());
            if services.fs.exists(&path) {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            services
                .fs
                .ensure_parent(&path)
                .and_then(|_| services.fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}
