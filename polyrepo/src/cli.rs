use crate::commands;
use crate::create_runtime_config;
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, ColorChoice, Command};

pub struct PolyCli;

impl PolyCli {
    pub fn new() -> Self {
        Self
    }

    pub fn build_app(&self) -> Command {
        let styles = clap::builder::styling::Styles::styled()
            .header(
                clap::builder::styling::AnsiColor::BrightCyan.on_default()
                    | clap::builder::styling::Effects::BOLD,
            )
            .usage(
                clap::builder::styling::AnsiColor::BrightGreen.on_default()
                    | clap::builder::styling::Effects::BOLD,
            )
            .literal(clap::builder::styling::AnsiColor::BrightWhite.on_default())
            .placeholder(clap::builder::styling::AnsiColor::BrightYellow.on_default())
            .error(
                clap::builder::styling::AnsiColor::BrightRed.on_default()
                    | clap::builder::styling::Effects::BOLD,
            );

        Command::new("poly")
            .version(env!("CARGO_PKG_VERSION"))
            .about("A tool for managing groups of repositories and fanning commands out across them")
            .styles(styles)
            .color(ColorChoice::Always)
            .disable_help_subcommand(true)
            .subcommand_precedence_over_arg(true)
            .subcommand(Command::new("init").about("Create a .polyrepo manifest in the current directory"))
            .subcommand(repo_command())
            .subcommand(cmd_command())
            .subcommand(const_command())
            .subcommand(venv_command())
            .subcommand(exec_command())
            .subcommand(run_command())
    }

    pub fn run(&self, args: Vec<String>) -> Result<()> {
        self.init_logging();

        let app = self.build_app();
        let matches = app.try_get_matches_from(args)?;

        let mut config = create_runtime_config()?;

        match matches.subcommand() {
            Some(("init", _)) => commands::repo::init(&config),
            Some(("repo", sub)) => route_repo(&mut config, sub),
            Some(("cmd", sub)) => route_cmd(&mut config, sub),
            Some(("const", sub)) => route_const(&mut config, sub),
            Some(("venv", sub)) => route_venv(&mut config, sub),
            Some(("exec", sub)) => commands::apply::exec(&config, exec_options(sub)),
            Some(("run", sub)) => {
                let name = required(sub, "name");
                let repos = string_list(sub, "repos");
                commands::apply::run_named(&config, &name, &repos)
            }
            _ => {
                let mut app = self.build_app();
                app.print_help()?;
                println!();
                Ok(())
            }
        }
    }

    fn init_logging(&self) {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("polyrepo=info"));

        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .init();
    }
}

impl Default for PolyCli {
    fn default() -> Self {
        Self::new()
    }
}

fn repo_command() -> Command {
    Command::new("repo")
        .about("Manage tracked repositories")
        .subcommand(
            Command::new("add")
                .about("Track a child repository")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("url").long("url").value_name("URL"))
                .arg(
                    Arg::new("path")
                        .long("path")
                        .value_name("PATH")
                        .help("Path relative to the project root (defaults to the name)"),
                )
                .arg(
                    Arg::new("tags")
                        .long("tags")
                        .short('t')
                        .value_delimiter(',')
                        .value_name("TAGS"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Stop tracking a repository")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(Command::new("list").about("List tracked repositories"))
        .subcommand(
            Command::new("tag")
                .about("Add tags to a repository")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("tags").required(true).num_args(1..)),
        )
        .subcommand(
            Command::new("untag")
                .about("Remove tags from a repository")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("tags").required(true).num_args(1..)),
        )
}

fn cmd_command() -> Command {
    Command::new("cmd")
        .about("Manage stored command templates")
        .subcommand(
            Command::new("add")
                .about("Store a reusable command template")
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("command")
                        .long("command")
                        .short('c')
                        .action(ArgAction::Append)
                        .required(true)
                        .value_name("TEMPLATE"),
                )
                .arg(Arg::new("description").long("description").short('d'))
                .arg(Arg::new("tags").long("tags").short('t').value_delimiter(','))
                .arg(Arg::new("repos").long("repos").short('r').value_delimiter(','))
                .arg(Arg::new("all").long("all").action(ArgAction::SetTrue))
                .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
                .arg(Arg::new("shell").long("shell").action(ArgAction::SetTrue))
                .arg(Arg::new("python").long("python").action(ArgAction::SetTrue))
                .arg(Arg::new("venv").long("venv").value_name("NAME"))
                .arg(
                    Arg::new("no-raise")
                        .long("no-raise")
                        .action(ArgAction::SetTrue)
                        .help("Report per-repository failures and keep going"),
                ),
        )
        .subcommand(
            Command::new("remove")
                .about("Delete a stored command template")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(Command::new("list").about("List stored command templates"))
}

fn const_command() -> Command {
    Command::new("const")
        .about("Manage project constants")
        .subcommand(
            Command::new("set")
                .about("Set a project constant")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("value").required(true)),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a project constant")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(Command::new("list").about("List project constants"))
}

fn venv_command() -> Command {
    Command::new("venv")
        .about("Manage registered virtualenvs")
        .subcommand(
            Command::new("add")
                .about("Register a virtualenv by absolute path")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("path").required(true)),
        )
        .subcommand(
            Command::new("remove")
                .about("Unregister a virtualenv")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(Command::new("list").about("List registered virtualenvs"))
}

fn exec_command() -> Command {
    Command::new("exec")
        .visible_aliases(["x"])
        .about("Fan an ad-hoc command template out across repositories")
        .arg(
            Arg::new("template")
                .required(true)
                .num_args(1..)
                .value_name("TEMPLATE"),
        )
        .arg(
            Arg::new("repos")
                .long("repos")
                .short('r')
                .value_delimiter(',')
                .value_name("REPOS")
                .help("Comma-separated repository names (default: all)"),
        )
        .arg(Arg::new("shell").long("shell").action(ArgAction::SetTrue))
        .arg(Arg::new("python").long("python").action(ArgAction::SetTrue))
        .arg(Arg::new("venv").long("venv").value_name("NAME"))
        .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
        .arg(Arg::new("no-raise").long("no-raise").action(ArgAction::SetTrue))
}

fn run_command() -> Command {
    Command::new("run")
        .about("Fan a stored command template out across its repositories")
        .arg(Arg::new("name").required(true))
        .arg(
            Arg::new("repos")
                .long("repos")
                .short('r')
                .value_delimiter(',')
                .value_name("REPOS")
                .help("Override the template's target repositories"),
        )
}

fn route_repo(config: &mut polyrepo_core::RuntimeConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub)) => commands::repo::add(
            config,
            &required(sub, "name"),
            sub.get_one::<String>("url").cloned(),
            sub.get_one::<String>("path").cloned(),
            string_list(sub, "tags"),
        ),
        Some(("remove", sub)) => commands::repo::remove(config, &required(sub, "name")),
        Some(("tag", sub)) => {
            commands::repo::tag(config, &required(sub, "name"), &string_list(sub, "tags"))
        }
        Some(("untag", sub)) => {
            commands::repo::untag(config, &required(sub, "name"), &string_list(sub, "tags"))
        }
        _ => commands::repo::list(config),
    }
}

fn route_cmd(config: &mut polyrepo_core::RuntimeConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub)) => {
            let mut record = polyrepo_core::CommandRecord::new(string_list(sub, "command"));
            record.description = sub.get_one::<String>("description").cloned().unwrap_or_default();
            record.tags = string_list(sub, "tags");
            record.repositories = string_list(sub, "repos");
            record.all = sub.get_flag("all");
            record.verbose = sub.get_flag("verbose");
            record.shell = sub.get_flag("shell");
            record.python = sub.get_flag("python");
            record.venv = sub.get_one::<String>("venv").cloned();
            record.raise_errors = !sub.get_flag("no-raise");
            commands::cmd::add(config, &required(sub, "name"), record)
        }
        Some(("remove", sub)) => commands::cmd::remove(config, &required(sub, "name")),
        _ => commands::cmd::list(config),
    }
}

fn route_const(config: &mut polyrepo_core::RuntimeConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("set", sub)) => {
            commands::store::const_set(config, &required(sub, "name"), &required(sub, "value"))
        }
        Some(("remove", sub)) => commands::store::const_remove(config, &required(sub, "name")),
        _ => commands::store::const_list(config),
    }
}

fn route_venv(config: &mut polyrepo_core::RuntimeConfig, matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("add", sub)) => {
            commands::store::venv_add(config, &required(sub, "name"), &required(sub, "path"))
        }
        Some(("remove", sub)) => commands::store::venv_remove(config, &required(sub, "name")),
        _ => commands::store::venv_list(config),
    }
}

fn exec_options(matches: &ArgMatches) -> commands::apply::ApplyOptions {
    commands::apply::ApplyOptions {
        commands: string_list(matches, "template"),
        targets: string_list(matches, "repos"),
        shell: matches.get_flag("shell"),
        python: matches.get_flag("python"),
        venv: matches.get_one::<String>("venv").cloned(),
        verbose: matches.get_flag("verbose"),
        raise_errors: !matches.get_flag("no-raise"),
    }
}

fn required(matches: &ArgMatches, id: &str) -> String {
    matches
        .get_one::<String>(id)
        .cloned()
        .unwrap_or_default()
}

fn string_list(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}
