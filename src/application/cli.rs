#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use yansi::Paint;

use super::repl;
use super::repl::Repl;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ControllerError;
use crate::domain::models::Event;
use crate::domain::models::Progress;
use crate::domain::models::SendOutcome;
use crate::domain::models::SessionKind;
use crate::domain::models::SessionStore;
use crate::domain::models::TaskDraft;
use crate::domain::services::TaskRunner;
use crate::infrastructure::api::AgentD;

/// What `main` should do once the command line has been handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Launch {
    Done,
    Repl { new_session: bool },
}

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    return Ok(());
}

fn required_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    if let Some(val) = matches.get_one::<String>(name) {
        return Ok(val.as_str());
    }

    bail!(format!("Missing required argument --{name}"));
}

async fn print_sessions_list() -> Result<()> {
    let sessions = AgentD::default()
        .list_sessions(Config::session_kind()?)
        .await?
        .iter()
        .map(|session| {
            return repl::format_session(session);
        })
        .collect::<Vec<String>>();

    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
    } else {
        println!("{}", sessions.join("\n"));
    }

    return Ok(());
}

async fn select_session_interactive() -> Result<Option<String>> {
    let sessions = AgentD::default()
        .list_sessions(Config::session_kind()?)
        .await?;

    if sessions.is_empty() {
        println!("There are no sessions available. You should start your first one!");
        return Ok(None);
    }

    let session_options = sessions
        .iter()
        .map(|session| {
            return repl::format_session(session);
        })
        .collect::<Vec<String>>();

    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which session would you like to open?")
        .default(0)
        .items(&session_options)
        .interact_opt()?;

    return Ok(idx.map(|idx| return sessions[idx].id.to_string()));
}

async fn delete_all_sessions() -> Result<()> {
    let backend = AgentD::default();
    let sessions = backend.list_sessions(Config::session_kind()?).await?;
    for session in sessions.iter() {
        backend.delete_session(&session.id).await?;
    }

    println!("Deleted {} sessions", sessions.len());
    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn run_task(task_id: &str) -> Result<()> {
    let backend = Arc::new(AgentD::default());
    let task = match backend
        .list_tasks()
        .await?
        .into_iter()
        .find(|e| return e.id == task_id)
    {
        Some(task) => task,
        None => bail!(format!("No task found for id {task_id}")),
    };

    let (event_tx, _event_rx) = mpsc::unbounded_channel::<Event>();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<Progress>();
    let runner = TaskRunner::new(backend.clone(), backend, event_tx).with_progress(progress_tx);

    let printer = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            println!("{}", Paint::new(repl::format_progress(&progress)).dimmed());
        }
    });

    println!("Running {}...", task.name);
    let finished = runner.run(&task).await;
    drop(runner);
    printer.await?;

    println!("Status: {}", repl::format_task_status(finished.status));
    if let Some(last_result) = finished.last_result {
        println!("{last_result}");
    }

    return Ok(());
}

async fn watch_metrics(backend: &AgentD) -> Result<()> {
    let interval = Config::get_duration(ConfigKey::MetricsInterval)?;
    loop {
        match backend.system_metrics().await {
            Ok(metrics) => print_json(&metrics)?,
            Err(err) => {
                tracing::warn!(error = ?err, "Failed to poll system metrics");
                eprintln!("{}", Paint::red(err.to_string()));
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Chat with the agent. Sends MESSAGE and prints the reply, or starts an interactive chat when no message is given.")
        .arg(
            clap::Arg::new(ConfigKey::SessionID.to_string())
                .short('i')
                .long("id")
                .help("Session ID to continue.")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("new")
                .short('n')
                .long("new")
                .help("Start a new session instead of continuing the most recent one.")
                .action(ArgAction::SetTrue)
                .conflicts_with(ConfigKey::SessionID.to_string()),
        )
        .arg(
            clap::Arg::new("message")
                .help("Message to send.")
                .num_args(0..)
                .trailing_var_arg(true),
        );
}

fn subcommand_sessions_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all sessions.")
        .arg(
            clap::Arg::new(ConfigKey::SessionID.to_string())
                .short('i')
                .long("id")
                .help("Session ID")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("all")
                .long("all")
                .help("Delete all sessions.")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("delete-args")
                .args([ConfigKey::SessionID.to_string(), "all".to_string()])
                .required(true),
        );
}

fn subcommand_sessions() -> Command {
    return Command::new("sessions")
        .about("Manage chat sessions stored by the backend.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all sessions with their ids and titles."))
        .subcommand(
            Command::new("open")
                .about("Open a session by ID. Omit passing any session ID to load an interactive selection.")
                .arg(
                    clap::Arg::new(ConfigKey::SessionID.to_string())
                        .short('i')
                        .long("id")
                        .help("Session ID")
                        .required(false),
                ),
        )
        .subcommand(subcommand_sessions_delete());
}

fn args_task_draft(cmd: Command) -> Command {
    return cmd
        .arg(
            clap::Arg::new("name")
                .long("name")
                .help("Task name.")
                .num_args(1)
                .required(true),
        )
        .arg(
            clap::Arg::new("description")
                .long("description")
                .help("Optional task description.")
                .num_args(1)
                .default_value(""),
        )
        .arg(
            clap::Arg::new("task")
                .long("task")
                .help("Instructions handed to the agent when the task runs.")
                .num_args(1)
                .required(true),
        );
}

fn arg_task_id() -> Arg {
    return clap::Arg::new("task-id")
        .short('i')
        .long("id")
        .help("Task ID")
        .num_args(1)
        .required(true);
}

fn subcommand_tasks() -> Command {
    return Command::new("tasks")
        .about("Manage and run saved agent tasks.")
        .arg_required_else_help(true)
        .subcommand(Command::new("list").about("List all saved tasks."))
        .subcommand(args_task_draft(
            Command::new("create").about("Save a new task."),
        ))
        .subcommand(args_task_draft(
            Command::new("update").about("Replace a task's name, description and instructions.").arg(arg_task_id()),
        ))
        .subcommand(Command::new("delete").about("Delete a task.").arg(arg_task_id()))
        .subcommand(
            Command::new("run")
                .about("Run a task in a new agent session and print its result.")
                .arg(arg_task_id()),
        );
}

fn subcommand_mcp() -> Command {
    return Command::new("mcp")
        .about("MCP tool server configuration.")
        .arg_required_else_help(true)
        .subcommand(Command::new("get").about("Print the MCP configuration."))
        .subcommand(
            Command::new("add")
                .about("Register an MCP server.")
                .arg(
                    clap::Arg::new("name")
                        .long("name")
                        .help("Server name.")
                        .num_args(1)
                        .required(true),
                )
                .arg(
                    clap::Arg::new("config")
                        .long("config")
                        .help("Server configuration as JSON, e.g. '{\"command\": \"npx\", \"args\": [\"@browsermcp/mcp\"]}'.")
                        .num_args(1)
                        .required(true),
                ),
        );
}

fn subcommand_zapier() -> Command {
    return Command::new("zapier")
        .about("Zapier MCP configuration.")
        .arg_required_else_help(true)
        .subcommand(Command::new("get").about("Print the configured Zapier MCP URL."))
        .subcommand(
            Command::new("set").about("Save the Zapier MCP URL.").arg(
                clap::Arg::new("url")
                    .long("url")
                    .help("Zapier actions URL, starting with https://actions.zapier.com/mcp/.")
                    .num_args(1)
                    .required(true),
            ),
        );
}

fn subcommand_metrics() -> Command {
    return Command::new("metrics")
        .about("Print system metrics reported by the backend.")
        .arg(
            clap::Arg::new("history")
                .long("history")
                .help("Print historical metrics for a time range, e.g. 1h or 24h.")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("watch")
                .short('w')
                .long("watch")
                .help("Keep polling the current metrics until interrupted.")
                .action(ArgAction::SetTrue)
                .conflicts_with("history"),
        );
}

pub fn build() -> Command {
    let commands_text = repl::help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}\nCommit: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    );

    return Command::new("agentd")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_mcp())
        .subcommand(subcommand_metrics())
        .subcommand(subcommand_sessions())
        .subcommand(subcommand_tasks())
        .subcommand(subcommand_zapier())
        .arg(
            Arg::new(ConfigKey::ApiURL.to_string())
                .short('u')
                .long(ConfigKey::ApiURL.to_string())
                .env("AGENTD_API_URL")
                .num_args(1)
                .help(format!("Base URL of the AgentD backend. [default: {}]", Config::default(ConfigKey::ApiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("AGENTD_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::MetricsInterval.to_string())
                .long(ConfigKey::MetricsInterval.to_string())
                .env("AGENTD_METRICS_INTERVAL")
                .num_args(1)
                .help(format!("Time in milliseconds between polls when watching metrics. [default: {}]", Config::default(ConfigKey::MetricsInterval)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("AGENTD_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before timing out a backend request. Streaming chat replies are not limited. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::SessionType.to_string())
                .short('t')
                .long(ConfigKey::SessionType.to_string())
                .env("AGENTD_SESSION_TYPE")
                .num_args(1)
                .help(format!("Which sessions to list and continue. [default: {}]", Config::default(ConfigKey::SessionType)))
                .value_parser(PossibleValuesParser::new(SessionKind::VARIANTS))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::TypingDelay.to_string())
                .long(ConfigKey::TypingDelay.to_string())
                .env("AGENTD_TYPING_DELAY")
                .num_args(1)
                .help(format!("Delay in milliseconds between revealed lines of a reply. 0 prints replies at once. [default: {}]", Config::default(ConfigKey::TypingDelay)))
                .global(true),
        );
}

async fn parse_tasks(subcmd_matches: &ArgMatches) -> Result<()> {
    let backend = AgentD::default();

    match subcmd_matches.subcommand() {
        Some(("list", _)) => {
            let tasks = backend.list_tasks().await?;
            if tasks.is_empty() {
                println!("There are no saved tasks yet.");
            } else {
                let lines = tasks
                    .iter()
                    .map(|task| return repl::format_task(task))
                    .collect::<Vec<String>>();
                println!("{}", lines.join("\n"));
            }
        }
        Some(("create", create_matches)) => {
            let draft = TaskDraft::new(
                required_arg(create_matches, "name")?,
                required_arg(create_matches, "description")?,
                required_arg(create_matches, "task")?,
            );
            let task = backend.create_task(&draft).await?;
            println!("Created task {}", task.id);
        }
        Some(("update", update_matches)) => {
            let task_id = required_arg(update_matches, "task-id")?;
            let draft = TaskDraft::new(
                required_arg(update_matches, "name")?,
                required_arg(update_matches, "description")?,
                required_arg(update_matches, "task")?,
            );
            backend.update_task(task_id, &draft).await?;
            println!("Updated task {task_id}");
        }
        Some(("delete", delete_matches)) => {
            let task_id = required_arg(delete_matches, "task-id")?;
            backend.delete_task(task_id).await?;
            println!("Deleted task {task_id}");
        }
        Some(("run", run_matches)) => {
            run_task(required_arg(run_matches, "task-id")?).await?;
        }
        _ => {
            subcommand_tasks().print_long_help()?;
        }
    }

    return Ok(());
}

async fn parse_mcp(subcmd_matches: &ArgMatches) -> Result<()> {
    let backend = AgentD::default();

    match subcmd_matches.subcommand() {
        Some(("get", _)) => {
            print_json(&backend.get_mcp_config().await?)?;
        }
        Some(("add", add_matches)) => {
            let name = required_arg(add_matches, "name")?;
            let config = serde_json::from_str::<serde_json::Value>(required_arg(add_matches, "config")?)
                .map_err(|err| {
                    return ControllerError::Config(format!("Invalid MCP server config: {err}"));
                })?;
            backend.add_mcp_server(name, config).await?;
            println!("Added MCP server {name}");
        }
        _ => {
            subcommand_mcp().print_long_help()?;
        }
    }

    return Ok(());
}

async fn parse_zapier(subcmd_matches: &ArgMatches) -> Result<()> {
    let backend = AgentD::default();

    match subcmd_matches.subcommand() {
        Some(("get", _)) => {
            let url = backend.get_zapier_url().await?;
            if url.is_empty() {
                println!("No Zapier MCP URL configured.");
            } else {
                println!("{url}");
            }
        }
        Some(("set", set_matches)) => {
            let url = backend.set_zapier_url(required_arg(set_matches, "url")?).await?;
            println!("Saved Zapier MCP URL {url}");
        }
        _ => {
            subcommand_zapier().print_long_help()?;
        }
    }

    return Ok(());
}

async fn parse_metrics(subcmd_matches: &ArgMatches) -> Result<()> {
    let backend = AgentD::default();

    if let Some(range) = subcmd_matches.get_one::<String>("history") {
        print_json(&backend.historical_metrics(range).await?)?;
    } else if subcmd_matches.get_flag("watch") {
        watch_metrics(&backend).await?;
    } else {
        print_json(&backend.system_metrics().await?)?;
    }

    return Ok(());
}

async fn parse_chat(subcmd_matches: &ArgMatches) -> Result<Launch> {
    let new_session = subcmd_matches.get_flag("new");
    let message = subcmd_matches
        .get_many::<String>("message")
        .map(|e| return e.map(|part| return part.to_string()).collect::<Vec<String>>())
        .unwrap_or_default()
        .join(" ");

    if message.trim().is_empty() {
        return Ok(Launch::Repl { new_session });
    }

    let mut repl = Repl::connect(new_session).await?;
    if let Some(SendOutcome::Failed { error_text }) = repl.send(&message).await? {
        return Err(ControllerError::Send(error_text).into());
    }

    return Ok(Launch::Done);
}

pub async fn parse() -> Result<Launch> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            return parse_chat(subcmd_matches).await;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(Launch::Done);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(Launch::Done);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(Launch::Done);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(Launch::Done);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(Launch::Done);
            }
        },
        Some(("mcp", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            parse_mcp(subcmd_matches).await?;
            return Ok(Launch::Done);
        }
        Some(("metrics", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            parse_metrics(subcmd_matches).await?;
            return Ok(Launch::Done);
        }
        Some(("sessions", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            match subcmd_matches.subcommand() {
                Some(("list", _)) => {
                    print_sessions_list().await?;
                    return Ok(Launch::Done);
                }
                Some(("open", open_matches)) => {
                    let session_id = match open_matches.get_one::<String>(&ConfigKey::SessionID.to_string()) {
                        Some(session_id) => Some(session_id.to_string()),
                        None => select_session_interactive().await?,
                    };
                    if let Some(session_id) = session_id {
                        Config::set(ConfigKey::SessionID, &session_id);
                        return Ok(Launch::Repl { new_session: false });
                    }
                    return Ok(Launch::Done);
                }
                Some(("delete", delete_matches)) => {
                    if let Some(session_id) = delete_matches.get_one::<String>(&ConfigKey::SessionID.to_string()) {
                        AgentD::default().delete_session(session_id).await?;
                        println!("Deleted session {session_id}");
                    } else if delete_matches.get_flag("all") {
                        delete_all_sessions().await?;
                    } else {
                        subcommand_sessions_delete().print_long_help()?;
                    }
                    return Ok(Launch::Done);
                }
                _ => {
                    subcommand_sessions().print_long_help()?;
                    return Ok(Launch::Done);
                }
            }
        }
        Some(("tasks", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            parse_tasks(subcmd_matches).await?;
            return Ok(Launch::Done);
        }
        Some(("zapier", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            parse_zapier(subcmd_matches).await?;
            return Ok(Launch::Done);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(Launch::Repl { new_session: false });
}

