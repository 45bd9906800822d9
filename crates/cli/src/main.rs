//! Headless directory explorer.
//!
//! Opens a connection against the configured backend, runs group and user
//! searches through the explorer core, optionally expands results or loads a
//! group roster, and prints what the presentation loop receives.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use adex_directory::{ConnectionSettings, MemoryDirectory, MemoryDirectoryFactory, RepositoryFactory};
use adex_explorer::{EventLoop, Explorer, ExplorerEvent, Fault, RequestHandle, channel};
use clap::Parser;
use tracing::info;

use crate::config::{Backend, ExplorerConfig};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "adex")]
#[command(about = "Browse directory groups and users")]
#[command(version)]
struct Args {
	/// Configuration file (defaults to $XDG_CONFIG_HOME/adex/config.toml)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Domain to connect to
	#[arg(short, long)]
	domain: Option<String>,

	/// User name for the connection
	#[arg(short, long)]
	user: Option<String>,

	/// Password for the connection
	#[arg(short, long)]
	password: Option<String>,

	/// Search groups by name prefix (empty lists all)
	#[arg(short, long, value_name = "TERM")]
	groups: Option<String>,

	/// Search users by name prefix (empty lists all)
	#[arg(long, value_name = "TERM")]
	users: Option<String>,

	/// Expand the first N group and user results
	#[arg(short, long, default_value_t = 0, value_name = "N")]
	expand: usize,

	/// Print the member roster of a group
	#[arg(long, value_name = "GROUP")]
	roster: Option<String>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config_path = args.config.clone().or_else(config::default_path);
	let config = match &config_path {
		Some(path) => ExplorerConfig::load(path)?,
		None => ExplorerConfig::default(),
	};
	info!(path = ?config_path, "starting adex");

	let factory = build_factory(&config);
	let (events, mut presentation) = channel();
	let mut explorer = Explorer::new(factory, events, config.search_options());
	connect(&mut explorer, &args, &config)?;

	let mut searches = Vec::new();
	if let Some(term) = args.groups.as_deref() {
		searches.push(explorer.retrieve_groups(Some(term))?);
	}
	if let Some(term) = args.users.as_deref() {
		searches.push(explorer.retrieve_users(Some(term))?);
	}
	drive(&mut presentation, searches).await;

	if args.expand > 0 {
		expand_results(&explorer, args.expand).await?;
		presentation.pump();
		for fault in presentation.take_faults() {
			print_fault(&fault);
		}
	}
	print_results(&explorer);

	if let Some(group) = args.roster.as_deref() {
		let mut roster = explorer.group_roster()?;
		drive(&mut presentation, vec![roster.set_group(group)]).await;
		println!("roster of {group}");
		for user in roster.members().snapshot() {
			println!("  member      {:<32} {}", user.full_name, user.name);
		}
		for user in roster.non_members().snapshot() {
			println!("  non-member  {:<32} {}", user.full_name, user.name);
		}
	}

	explorer.shutdown();
	explorer.settle().await;
	for event in presentation.pump() {
		print_event(&event);
	}
	Ok(())
}

fn build_factory(config: &ExplorerConfig) -> Arc<dyn RepositoryFactory> {
	match config.directory.backend {
		Backend::Memory => {
			let domain = config.connection.domain.as_deref().unwrap_or("corp.example");
			let directory = MemoryDirectory::synthetic(
				domain,
				config.directory.synthetic_groups,
				config.directory.synthetic_users,
				config.directory.seed,
			);
			let mut factory = MemoryDirectoryFactory::new(Arc::new(directory));
			if let (Some(user), Some(password)) = (&config.connection.user, &config.connection.password) {
				factory = factory.with_credentials(user, password);
			}
			Arc::new(factory)
		}
	}
}

/// Tries the command-line settings, then the configured ones, then the ambient domain.
fn connect(explorer: &mut Explorer, args: &Args, config: &ExplorerConfig) -> Result<(), Box<dyn std::error::Error>> {
	let configured = config.connection_settings();
	let requested = ConnectionSettings {
		domain: args.domain.clone().or_else(|| configured.domain.clone()),
		user: args.user.clone().or_else(|| configured.user.clone()),
		password: args.password.clone().or_else(|| configured.password.clone()),
	};
	let mut attempts = vec![requested, configured, ConnectionSettings::default()];
	attempts.dedup();

	let mut last_error = None;
	for settings in attempts {
		match explorer.open_connection(&settings) {
			Ok(server) => {
				println!("connected to {server}");
				return Ok(());
			}
			Err(err) => {
				tracing::warn!(domain = settings.domain.as_deref(), error = %err, "connect.retry");
				last_error = Some(err);
			}
		}
	}
	Err(last_error.map_or_else(|| "no connection settings to try".into(), Into::into))
}

/// Presentation loop: prints events until every request has settled.
async fn drive(presentation: &mut EventLoop, requests: Vec<RequestHandle>) {
	let mut pending = Box::pin(async move {
		for request in requests {
			request.join().await;
		}
	});
	loop {
		tokio::select! {
			biased;
			event = presentation.next() => match event {
				Some(event) => print_event(&event),
				None => break,
			},
			() = &mut pending => break,
		}
	}
	for event in presentation.pump() {
		print_event(&event);
	}
	for fault in presentation.take_faults() {
		print_fault(&fault);
	}
}

async fn expand_results(explorer: &Explorer, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
	let mut expansions = Vec::new();
	for group in explorer.groups().results().snapshot().iter().take(limit) {
		expansions.extend(explorer.expand_group(group)?);
	}
	for user in explorer.users().results().snapshot().iter().take(limit) {
		expansions.extend(explorer.expand_user(user)?);
	}
	for expansion in expansions {
		if let Err(err) = expansion.await {
			tracing::warn!(error = %err, "expand.join_failed");
			eprintln!("error: expansion task failed: {err}");
		}
	}
	Ok(())
}

fn print_results(explorer: &Explorer) {
	let groups = explorer.groups().results().snapshot();
	if !groups.is_empty() {
		println!("groups ({})", groups.len());
	}
	for group in &groups {
		println!("  {}", group.name);
		if group.members.is_loaded() {
			for member in group.members.list().snapshot() {
				println!("    {:<32} {}", member.full_name, member.name);
			}
		}
	}

	let users = explorer.users().results().snapshot();
	if !users.is_empty() {
		println!("users ({})", users.len());
	}
	for user in &users {
		println!("  {:<32} {}", user.full_name, user.name);
		if user.groups.is_loaded() {
			for group in user.groups.list().snapshot() {
				println!("    {}", group.name);
			}
		}
	}
}

fn print_event(event: &ExplorerEvent) {
	match event {
		ExplorerEvent::Searching { domain, active: true, .. } => println!("searching {domain}..."),
		ExplorerEvent::Searching { domain, active: false, .. } => println!("searching {domain} done"),
		ExplorerEvent::ConnectionOpened { server } => tracing::debug!(%server, "event.connection_opened"),
		ExplorerEvent::MembershipChanged { group, user, member } => {
			println!("{user} {} {group}", if *member { "added to" } else { "removed from" })
		}
		ExplorerEvent::Fault(_) => {}
	}
}

fn print_fault(fault: &Fault) {
	eprintln!("error: {fault}");
	if let Some(detail) = &fault.detail {
		eprintln!("  {detail}");
	}
}

fn setup_tracing(verbose: bool) {
	use std::fs::OpenOptions;

	use tracing_subscriber::EnvFilter;
	use tracing_subscriber::prelude::*;

	let filter = || {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("adex=debug,adex_explorer=debug,adex_directory=debug,adex_worker=trace,info")
			} else {
				EnvFilter::new("warn")
			}
		})
	};

	if let Some(log_dir) = std::env::var("ADEX_LOG_DIR").ok().map(PathBuf::from)
		&& std::fs::create_dir_all(&log_dir).is_ok()
	{
		let log_path = log_dir.join(format!("adex.{}.log", std::process::id()));
		if let Ok(file) = OpenOptions::new().create(true).append(true).open(&log_path) {
			let file_layer = tracing_subscriber::fmt::layer()
				.with_writer(file)
				.with_ansi(false)
				.with_target(true);
			tracing_subscriber::registry().with(filter()).with(file_layer).init();
			tracing::info!(path = ?log_path, "tracing initialized");
			return;
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(filter())
		.with_writer(std::io::stderr)
		.init();
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_consistent() {
		Args::command().debug_assert();
	}

	#[test]
	fn search_flags_parse() {
		let args = Args::try_parse_from(["adex", "--groups", "adm", "--users", "", "-e", "2", "-v"]).expect("valid args");
		assert_eq!(args.groups.as_deref(), Some("adm"));
		assert_eq!(args.users.as_deref(), Some(""));
		assert_eq!(args.expand, 2);
		assert!(args.verbose);
		assert!(args.roster.is_none());
	}
}
