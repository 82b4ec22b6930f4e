use anyhow::Result;
use clap::Parser;
use msgenctl::cli::commands::{CancelCommand, StatusCommand, SubmitCommand, WaitCommand};
use msgenctl::cli::{Cli, Commands};
use msgenctl::{
    create_operation_span, generate_correlation_id, init_telemetry, MsgenctlSettings,
    ServiceClient, ServiceConfig, SubmitConfig, WorkflowsClient,
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    MsgenctlSettings::load_env_file()?;
    let settings = MsgenctlSettings::load(cli.config.as_deref(), &cli.overrides())?;

    init_telemetry(settings.logging.format)?;

    let correlation_id = generate_correlation_id();
    let span = create_operation_span(
        cli.command.name(),
        cli.command.workflow_id().map(|id| id.0),
        Some(&correlation_id),
    );

    run(cli.command, settings).instrument(span).await
}

async fn run(command: Commands, settings: MsgenctlSettings) -> Result<()> {
    let service = ServiceConfig::from_settings(&settings)?;
    let repository =
        WorkflowsClient::new(ServiceClient::new(&service)?).with_span(tracing::Span::current());
    let mut stdout = std::io::stdout();

    match command {
        Commands::Submit(_) => {
            let config = SubmitConfig::from_settings(&settings)?;
            SubmitCommand::new(&repository, config)
                .execute(&mut stdout)
                .await?;
        }
        Commands::Status { workflow_id } => {
            StatusCommand::new(&repository)
                .with_workflow_id(workflow_id)
                .execute(&mut stdout)
                .await?;
        }
        Commands::Cancel { workflow_id } => {
            CancelCommand::new(&repository, workflow_id)
                .execute(&mut stdout)
                .await?;
        }
        Commands::Wait(args) => {
            let options = settings.wait_options()?;
            let cancellation = CancellationToken::new();
            let on_signal = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Received Ctrl+C signal");
                    on_signal.cancel();
                }
            });

            WaitCommand::new(&repository, args.workflow_id, options)
                .with_cancellation(cancellation)
                .execute()
                .await?;
        }
    }

    Ok(())
}
