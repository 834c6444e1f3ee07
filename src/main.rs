use clap::Parser;
use gatekeeper::cli::{
    handle_classify, handle_completions, handle_config_init, handle_route, Cli, Commands,
    ConfigCommands,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => gatekeeper::cli::serve::run_serve(args).await,
        Commands::Classify(args) => {
            println!("{}", handle_classify(&args));
            Ok(())
        }
        Commands::Route(args) => handle_route(&args).map(|output| println!("{}", output)),
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
