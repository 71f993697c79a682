//! `tubecost` - CLI for the production cost ledger
//!
//! This binary serves the HTTP API and provides direct access to the stored
//! records from the command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::Context;
use clap::Parser;

use tubecost::cli::{self, Cli, Command, ConfigCommand};
use tubecost::{init_logging, storage, Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Config commands must work even when the configuration is broken
    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(cli.config, config_cmd),
        command => command,
    };

    let config = Config::load_from(cli.config).context("failed to load configuration")?;

    if let Command::Calc(cmd) = &command {
        let inputs = cli::read_inputs(&cmd.file)
            .with_context(|| format!("failed to read inputs from {}", cmd.file.display()))?;
        let record = tubecost::calculate(&inputs, &config.costing);
        println!("{}", cli::render_calculation(&record, cmd.json)?);
        return Ok(());
    }

    let store = storage::open(&config)
        .await
        .context("failed to open record store")?;
    let ledger = Ledger::new(store, config.costing);

    let result = run(&command, &config, &ledger).await;
    if !matches!(command, Command::Serve(_)) {
        ledger.close().await?;
    }
    result
}

async fn run(command: &Command, config: &Config, ledger: &Ledger) -> anyhow::Result<()> {
    match command {
        Command::Serve(cmd) => {
            let addr = match &cmd.bind {
                Some(bind) => bind
                    .parse()
                    .with_context(|| format!("invalid bind address: {bind}"))?,
                None => config.bind_addr()?,
            };
            tubecost::server::serve(ledger.clone(), addr).await?;
        }
        Command::List(cmd) => {
            let records = ledger.list().await?;
            println!("{}", cli::render_records(&records, cmd.format)?);
        }
        Command::Show(cmd) => match ledger.get(cmd.id).await? {
            Some(record) => println!("{}", cli::render_record(&record, cmd.json)?),
            None => anyhow::bail!("Record not found: {}", cmd.id),
        },
        Command::Add(cmd) => {
            let inputs = cli::read_inputs(&cmd.file)
                .with_context(|| format!("failed to read inputs from {}", cmd.file.display()))?;
            let (id, record) = ledger.create(&inputs).await?;
            println!(
                "Created record {id} for {} (total per tube {:.2})",
                record.inputs.date, record.costs.grand_total_cost_per_tube
            );
        }
        Command::Edit(cmd) => {
            let inputs = cli::read_inputs(&cmd.file)
                .with_context(|| format!("failed to read inputs from {}", cmd.file.display()))?;
            let record = ledger.update(cmd.id, &inputs).await?;
            println!(
                "Updated record {} for {} (total per tube {:.2})",
                cmd.id, record.inputs.date, record.costs.grand_total_cost_per_tube
            );
        }
        Command::Delete(cmd) => {
            ledger.delete(cmd.id).await?;
            println!("Deleted record {}", cmd.id);
        }
        Command::Calc(_) | Command::Config(_) => {}
    }
    Ok(())
}

fn handle_config(path: Option<std::path::PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                let hosted = &config.storage.hosted;
                let costing = &config.costing;
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Server]");
                println!("  Bind:               {}", config.server.bind);
                println!();
                println!("[Storage]");
                println!("  Backend:            {}", config.storage.backend);
                println!("  Database path:      {}", config.database_path().display());
                println!("  Hosted base URL:    {}", hosted.base_url);
                println!("  Hosted account:     {}", hosted.account_id);
                println!("  Hosted database:    {}", hosted.database_id);
                println!(
                    "  Hosted API token:   {}",
                    if hosted.api_token.is_some() { "set" } else { "not set" }
                );
                println!();
                println!("[Costing]");
                println!("  Paper:              {}", costing.paper);
                println!("  Paste:              {}", costing.paste);
                println!("  Outer paste:        {}", costing.outer_paste);
                println!("  Packing:            {}", costing.packing);
                println!("  Labour:             {}", costing.labour);
                println!("  Electricity:        {}", costing.electricity);
                println!("  Overheads:          {}", costing.overheads);
                println!("  Food:               {}", costing.food);
            }
        }
        ConfigCommand::Path => {
            println!(
                "{}",
                path.unwrap_or_else(Config::default_config_path).display()
            );
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => anyhow::bail!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
