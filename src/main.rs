//! `leadgen-broker` binary: serve the JSON API, run a one-shot export, or manage accounts.

// std
use std::{fs, path::PathBuf, sync::Arc};
// crates.io
use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use leadgen_broker::{
	account::{AccountId, FormId},
	api,
	config::{Config, Pacing},
	export::ExportFormat,
	flow::{LeadPipeline, PipelineRequest},
	graph::LeadWindow,
	service::LeadService,
};

const DEFAULT_LOG_FILTER: &str = "leadgen_broker=info";

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Serve the JSON API.
	Serve,
	/// Convert the token, pick a page, and download one form's leads.
	Export(ExportArgs),
	/// Inspect or switch stored accounts.
	Accounts {
		#[command(subcommand)]
		command: AccountsCommand,
	},
}

#[derive(Debug, Args)]
struct ExportArgs {
	/// Page to export from, by id.
	#[arg(long, conflicts_with = "page_index")]
	page_id: Option<String>,
	/// Page to export from, by position in the managed page list.
	#[arg(long)]
	page_index: Option<usize>,
	/// Form to download; defaults to the page's first form.
	#[arg(long)]
	form_id: Option<FormId>,
	/// Only download leads created during the previous UTC day.
	#[arg(long)]
	yesterday: bool,
	/// Output format.
	#[arg(long, default_value = "csv")]
	format: ExportFormat,
	/// Output file; defaults to the suggested download name.
	#[arg(short, long)]
	output: Option<PathBuf>,
	/// Reuse the stored long-lived token instead of exchanging the short-lived one.
	#[arg(long)]
	skip_convert: bool,
	/// Disable the pacing delays between Graph calls.
	#[arg(long)]
	no_delay: bool,
}

#[derive(Debug, Subcommand)]
enum AccountsCommand {
	/// List stored accounts without their tokens.
	List,
	/// Make an account the current one.
	Select {
		/// Account identifier.
		id: AccountId,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
		)
		.init();

	let cli = Cli::parse();
	let mut config = Config::from_env()?;

	match cli.command {
		Command::Serve => {
			let address = config.bind_address();
			let service = Arc::new(LeadService::from_config(&config)?);

			api::serve(service, &address).await?;
		},
		Command::Export(args) => {
			if args.no_delay {
				config.pacing = Pacing::immediate();
			}

			let service = LeadService::from_config(&config)?;
			let report = LeadPipeline::new(&service)
				.run(PipelineRequest {
					skip_convert: args.skip_convert,
					page_id: args.page_id,
					page_index: args.page_index,
					form_id: args.form_id,
					window: LeadWindow::from_flag(args.yesterday),
					format: args.format,
				})
				.await?;
			let output = args.output.unwrap_or_else(|| PathBuf::from(&report.export.filename));

			fs::write(&output, &report.export.body)?;

			println!(
				"Exported {} leads from form {} ({}) on page {} to {}{}.",
				report.export.lead_count,
				report.form.id,
				report.form.name,
				report.page.page_name,
				output.display(),
				if report.forms.mock { " using fallback forms" } else { "" },
			);
		},
		Command::Accounts { command } => {
			let service = LeadService::from_config(&config)?;
			let store = service.resolver().store();

			match command {
				AccountsCommand::List => {
					let current = store.current_account().await?.map(|account| account.id);

					for account in store.list_accounts().await? {
						let marker = if current.as_ref() == Some(&account.id) { "*" } else { " " };
						let summary = account.summary(marker == "*");

						println!(
							"{marker} {} {} pages={} long-lived={}",
							summary.id,
							summary.name,
							summary.pages.len(),
							if summary.has_long_lived_token { "yes" } else { "no" },
						);
					}
				},
				AccountsCommand::Select { id } => {
					store.set_current_account(&id).await?;

					println!("Current account: {id}.");
				},
			}
		},
	}

	Ok(())
}
