mod render;

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pixchat_contracts::chat::{help_lines, parse_command, ChatCommand};
use pixchat_contracts::conversation::ConversationStore;
use pixchat_contracts::events::{json_object, EventWriter, SessionEvent};
use pixchat_contracts::settings::{Dimension, GuidanceScale, ModelKind, Steps};
use pixchat_engine::{
    EndpointConfig, HttpStatusProbe, SessionController, SessionPhase, SessionState, StatusProbe,
    SubmitError, TurnOutcome,
};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pixchat",
    version,
    about = "Chat-style client for a remote text-to-image service"
)]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive prompt loop.
    Chat(ChatArgs),
    /// Generate one image and save it.
    Generate(GenerateArgs),
    /// Probe the configured endpoints.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct EndpointArgs {
    #[arg(long)]
    base_url: Option<String>,
    #[arg(long)]
    finetuned_url: Option<String>,
    #[arg(long, default_value_t = 3000)]
    probe_timeout_ms: u64,
    #[arg(long, default_value_t = 60)]
    generation_timeout_secs: u64,
}

impl EndpointArgs {
    fn resolve(&self) -> Result<EndpointConfig> {
        Ok(
            EndpointConfig::resolve(self.base_url.as_deref(), self.finetuned_url.as_deref())?
                .with_probe_timeout(Duration::from_millis(self.probe_timeout_ms))
                .with_generation_timeout(Duration::from_secs(self.generation_timeout_secs)),
        )
    }
}

#[derive(Debug, Args)]
struct SelectionArgs {
    #[arg(long, default_value = "base")]
    model: ModelKind,
    #[arg(long, default_value = "Custom")]
    preset: String,
    #[arg(long, default_value = "512")]
    width: Dimension,
    #[arg(long, default_value = "512")]
    height: Dimension,
}

#[derive(Debug, Args)]
struct ChatArgs {
    #[command(flatten)]
    endpoints: EndpointArgs,
    #[command(flatten)]
    selection: SelectionArgs,
    /// Directory for /download.
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[command(flatten)]
    endpoints: EndpointArgs,
    #[command(flatten)]
    selection: SelectionArgs,
    #[arg(long)]
    steps: Option<Steps>,
    #[arg(long)]
    guidance: Option<GuidanceScale>,
    #[arg(long)]
    negative: Option<String>,
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[command(flatten)]
    endpoints: EndpointArgs,
    /// Probe only this model's endpoint.
    #[arg(long)]
    model: Option<ModelKind>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("pixchat error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    load_env_file(cli.env_file.as_deref())?;
    init_tracing();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Generate(args) => run_generate(args),
        Command::Status(args) => run_status(args),
    }
}

fn load_env_file(path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        dotenvy::from_path(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err).context("failed to load .env"),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_controller(
    endpoints: &EndpointArgs,
    selection: &SelectionArgs,
    events: Option<&Path>,
) -> Result<SessionController> {
    let mut state = SessionState::new();
    state.selected_model = selection.model;
    state.width = selection.width;
    state.height = selection.height;
    let session_id = state.session_id.clone();

    let mut controller = SessionController::over_http(endpoints.resolve()?)?.with_state(state);
    if let Some(path) = events {
        controller = controller.with_events(EventWriter::new(path, session_id));
    }
    let preset = controller.select_preset(&selection.preset);
    if let Some(reason) = preset.fallback_reason {
        println!("{reason}");
    }
    controller.emit_session_started();
    Ok(controller)
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut controller =
        build_controller(&args.endpoints, &args.selection, args.events.as_deref())?;

    let stdin = io::stdin();
    let mut line = String::new();

    println!("pixchat started. Type a prompt, or /help for commands.");
    println!("{}", controller.check_status().message);

    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        match parse_command(input) {
            ChatCommand::Noop => {}
            ChatCommand::Submit { prompt } => {
                let result = controller.submit_with_progress(&prompt, &mut print_phase);
                print_submission(controller.state().store(), result);
            }
            ChatCommand::Regenerate => {
                let result = controller.regenerate(&mut print_phase);
                print_submission(controller.state().store(), result);
            }
            ChatCommand::Help => {
                for help in help_lines() {
                    println!("{help}");
                }
            }
            ChatCommand::SetModel(model) => {
                controller.state_mut().selected_model = model;
                println!("Model set to {model}");
            }
            ChatCommand::ListModels => {
                print_lines(render::model_lines(controller.state().selected_model));
            }
            ChatCommand::SetPreset(name) => {
                let selection = controller.select_preset(&name);
                match selection.fallback_reason {
                    Some(reason) => println!("{reason}"),
                    None => println!("Preset set to {}", selection.preset.name),
                }
            }
            ChatCommand::ListPresets => {
                print_lines(render::preset_lines(
                    &controller.resolver().registry,
                    &controller.state().preset,
                ));
            }
            ChatCommand::SetSteps(steps) => {
                controller.state_mut().overrides.steps = Some(steps);
                println!("Steps set to {}", steps.get());
            }
            ChatCommand::SetGuidance(guidance) => {
                controller.state_mut().overrides.guidance_scale = Some(guidance);
                println!("Guidance scale set to {guidance}");
            }
            ChatCommand::SetWidth(width) => {
                controller.state_mut().width = width;
                println!("Width set to {}", width.get());
            }
            ChatCommand::SetHeight(height) => {
                controller.state_mut().height = height;
                println!("Height set to {}", height.get());
            }
            ChatCommand::SetNegative(text) => {
                if text.is_empty() {
                    println!("Negative prompt cleared");
                } else {
                    println!("Negative prompt set to {text}");
                }
                controller.state_mut().overrides.negative_prompt = Some(text);
            }
            ChatCommand::ResetOverrides => {
                controller.state_mut().overrides = Default::default();
                println!("Overrides cleared; using {} defaults", controller.state().preset);
            }
            ChatCommand::ShowSettings => {
                let pending = controller.pending_settings("");
                print_lines(render::settings_lines(controller.state(), &pending));
            }
            ChatCommand::Status => {
                let model = controller.state().selected_model;
                let status = controller.check_status();
                println!("{model}: {}", status.message);
            }
            ChatCommand::Stats => {
                println!("{}", render::stats_line(controller.state().store()));
            }
            ChatCommand::History => {
                print_lines(render::history_lines(controller.state().store()));
            }
            ChatCommand::Download { number, dir } => {
                let dir = dir.map(PathBuf::from).unwrap_or_else(|| args.out.clone());
                let store = controller.state().store();
                match download_result(store, number, &dir, controller.events()) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(err) => println!("Download failed: {err:#}"),
                }
            }
            ChatCommand::Quit => break,
            ChatCommand::Invalid { command, reason } => {
                println!("/{command}: {reason}");
            }
            ChatCommand::Unknown { command, .. } => {
                println!("Unknown command: /{command} (try /help)");
            }
        }
    }

    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let mut controller =
        build_controller(&args.endpoints, &args.selection, args.events.as_deref())?;
    {
        let overrides = &mut controller.state_mut().overrides;
        overrides.steps = args.steps;
        overrides.guidance_scale = args.guidance;
        overrides.negative_prompt = args.negative.clone();
    }

    let outcome = controller.submit_with_progress(&args.prompt, &mut print_phase)?;
    let store = controller.state().store();
    match outcome {
        TurnOutcome::Succeeded { .. } => {
            if let Some(result) = store.latest_result() {
                print_lines(render::generation_details(result));
            }
            let path = download_result(store, None, &args.out, controller.events())?;
            println!("Saved {}", path.display());
            Ok(0)
        }
        TurnOutcome::Unreachable(status) => {
            eprintln!("{}", status.message);
            Ok(1)
        }
        TurnOutcome::Failed(err) => {
            eprintln!("{err}");
            Ok(1)
        }
    }
}

fn run_status(args: StatusArgs) -> Result<i32> {
    let endpoints = args.endpoints.resolve()?;
    let probe = HttpStatusProbe::new(endpoints.probe_timeout)?;
    let models: Vec<ModelKind> = match args.model {
        Some(model) => vec![model],
        None => ModelKind::ALL.to_vec(),
    };
    let mut all_reachable = true;
    for model in models {
        let endpoint = endpoints.endpoint_for(model);
        let status = probe.check(endpoint);
        all_reachable &= status.reachable;
        println!("{model} ({endpoint}): {}", status.message);
    }
    Ok(if all_reachable { 0 } else { 1 })
}

fn print_phase(phase: SessionPhase) {
    match phase {
        SessionPhase::CheckingStatus | SessionPhase::Generating => println!("{phase}"),
        _ => {}
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn print_submission(store: &ConversationStore, result: Result<TurnOutcome, SubmitError>) {
    match result {
        Ok(_) => {
            let number = store.results().count();
            if let Some(turn) = store.all().last() {
                let result_number = turn.as_result().map(|_| number);
                print_lines(render::turn_lines(turn, result_number));
            }
        }
        Err(err) => println!("{err}"),
    }
}

/// Writes result `number` (1-based, default latest) into `dir`.
fn download_result(
    store: &ConversationStore,
    number: Option<usize>,
    dir: &Path,
    events: Option<&EventWriter>,
) -> Result<PathBuf> {
    let result = match number {
        Some(number) => store
            .result(number)
            .with_context(|| format!("no image #{number} in this session"))?,
        None => store
            .latest_result()
            .context("no images generated yet")?,
    };
    let artifact = result.download();
    let path = artifact.save_in(dir)?;
    if let Some(events) = events {
        let payload = json_object(json!({
            "file_name": artifact.file_name,
            "mime_type": artifact.mime_type,
            "path": path.to_string_lossy().to_string(),
            "bytes": artifact.bytes.len(),
            "timestamp": result.timestamp,
        }));
        if let Err(err) = events.emit(SessionEvent::ImageDownloaded, payload) {
            warn!(error = %err, "failed to write download event");
        }
    }
    Ok(path)
}
