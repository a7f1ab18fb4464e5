use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::{Args, Parser, Subcommand};
use routekit::{
    Context, Message,
    config::{ConfigManager, EnvConfigManager},
    logger::{LogConfig, LogLevel, init_tracing},
    parse,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "routekit", about = "Run and inspect routekit routes", version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace). RUST_LOG overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    /// Also write a rolling text log and a JSON exchange report here
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Environment file read into the context configuration
    #[arg(long, global = true, default_value = ".env")]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send messages through mock:start -> direct:a -> direct:b -> mock:out
    Run(RunArgs),

    /// Print how an endpoint address is split up, as JSON
    Parse { address: String },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// How many messages to send
    #[arg(long, short = 'n', default_value_t = 3)]
    messages: usize,

    /// Text body of every message
    #[arg(long, default_value = "hello")]
    body: String,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            messages: 3,
            body: "hello".to_string(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guards = init_tracing(&LogConfig::new(cli.log_level, cli.log_dir.clone()))?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(&cli.env_file, args),
        Commands::Parse { address } => {
            println!("{}", serde_json::to_string_pretty(&parse(&address))?);
            Ok(())
        }
    }
}

fn run(env_file: &Path, args: RunArgs) -> anyhow::Result<()> {
    let config = ConfigManager(EnvConfigManager::new(env_file.to_path_buf()));
    let mut context = Context::from_config(config);
    context.register(component_direct::component_creator)?;
    let mocker = context.register(component_mock::component_creator)?;

    let tapped = Arc::new(AtomicUsize::new(0));
    let tap = tapped.clone();
    context.add(move |builder| {
        builder.from("mock:start").to("direct:a");
        builder.from("direct:a").to("direct:b");
        builder
            .from("direct:b")
            .process_fn(move |_| {
                tap.fetch_add(1, Ordering::Relaxed);
            })
            .to("mock:out");
    });

    context.init()?;
    context.start()?;

    for n in 0..args.messages {
        mocker.send("mock:start", Message::text(format!("{} #{n}", args.body)))?;
    }

    let (delivered, messages) = mocker.producer_stats("mock:out");
    info!(sent = args.messages, delivered, "demo run finished");
    println!("sent:      {}", args.messages);
    println!("tapped:    {}", tapped.load(Ordering::Relaxed));
    println!("delivered: {delivered}");
    for message in messages {
        println!("  {}", message.text_body());
    }

    context.stop()?;
    context.close()?;
    Ok(())
}
