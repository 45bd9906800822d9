mod common;

use std::sync::Arc;

use adex_directory::{ConnectionSettings, DirectoryError, MemoryDirectory, MemoryDirectoryFactory};
use adex_explorer::{Domain, Explorer, ExplorerError, ExplorerEvent, Operation, RequestOutcome, SearchOptions, channel};
use common::{DOMAIN, GatedDirectory, connected, sample_directory};
use pretty_assertions::assert_eq;

fn explorer_over(directory: MemoryDirectory) -> (Explorer, adex_explorer::EventLoop) {
	let (events, rx) = channel();
	let factory = MemoryDirectoryFactory::new(Arc::new(directory)).with_credentials("admin", "secret");
	(Explorer::new(Arc::new(factory), events, SearchOptions::default()), rx)
}

fn settings(domain: Option<&str>, password: &str) -> ConnectionSettings {
	ConnectionSettings {
		domain: domain.map(str::to_owned),
		user: Some("admin".into()),
		password: Some(password.into()),
	}
}

#[test]
fn searching_before_connecting_is_rejected() {
	let (mut explorer, _rx) = explorer_over(sample_directory());
	assert!(!explorer.is_connected());
	assert_eq!(
		explorer.retrieve_groups(Some("a")).err(),
		Some(ExplorerError::NotConnected {
			operation: Operation::SearchGroups
		})
	);
	assert!(explorer.member_search().is_err());
}

#[test]
fn connection_failures_are_returned_synchronously() {
	let (mut explorer, mut rx) = explorer_over(sample_directory());

	let wrong_password = explorer.open_connection(&settings(None, "nope"));
	assert!(matches!(
		wrong_password,
		Err(ExplorerError::Directory(DirectoryError::Connection { .. }))
	));
	let wrong_domain = explorer.open_connection(&settings(Some("other.example"), "secret"));
	assert!(matches!(
		wrong_domain,
		Err(ExplorerError::Directory(DirectoryError::Connection { .. }))
	));
	assert!(!explorer.is_connected());
	assert!(rx.pump().is_empty());

	// Retrying with good credentials succeeds.
	let server = explorer.open_connection(&settings(Some(DOMAIN), "secret")).expect("valid credentials");
	assert_eq!(server, DOMAIN);
	assert_eq!(explorer.server_name(), Some(DOMAIN));
	assert_eq!(rx.pump(), vec![ExplorerEvent::ConnectionOpened { server: DOMAIN.into() }]);
}

#[test]
fn unreachable_directory_fails_the_probe() {
	let directory = sample_directory();
	directory.set_offline(true);
	let (mut explorer, _rx) = explorer_over(directory);
	let err = explorer.open_connection(&settings(None, "secret")).expect_err("probe fails");
	assert!(matches!(err, ExplorerError::Directory(DirectoryError::Connection { .. })));
	assert!(!explorer.is_connected());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backend_fault_is_reported_once_and_flag_settles() {
	let directory = GatedDirectory::new(sample_directory());
	let (mut explorer, mut events) = connected(&directory, SearchOptions::default());
	directory.inner().set_offline(true);

	let outcome = explorer.retrieve_users(Some("a")).expect("connected").join().await;
	assert_eq!(outcome, RequestOutcome::Failed);
	events.pump();
	assert!(!events.is_searching(Domain::Users));
	let faults = events.take_faults();
	assert_eq!(faults.len(), 1);
	assert_eq!(faults[0].operation, Operation::SearchUsers);
	assert_eq!(faults[0].subject.as_deref(), Some("a"));

	// The system stays usable after the operator dismisses the fault.
	directory.inner().set_offline(false);
	let outcome = explorer.retrieve_users(Some("a")).expect("connected").join().await;
	assert_eq!(outcome, RequestOutcome::Completed { inserted: 2 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stale_fault_is_dropped() {
	let directory = GatedDirectory::new(sample_directory());
	let (mut explorer, mut events) = connected(&directory, SearchOptions::default());

	directory.hold("groups:a");
	let stale = explorer.retrieve_groups(Some("a")).expect("connected");
	directory.wait_entered("groups:a").await;
	directory.inner().set_offline(true);
	let fresh = explorer.retrieve_groups(Some("b")).expect("connected");
	assert_eq!(fresh.join().await, RequestOutcome::Failed);
	directory.release("groups:a");
	assert_eq!(stale.join().await, RequestOutcome::Superseded);
	explorer.settle().await;

	events.pump();
	assert_eq!(events.take_faults().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_silences_in_flight_work() {
	let directory = GatedDirectory::new(sample_directory());
	let (mut explorer, mut events) = connected(&directory, SearchOptions::default());

	directory.hold("users:");
	let handle = explorer.retrieve_users(None).expect("connected");
	directory.wait_entered("users:").await;
	explorer.shutdown();
	assert_eq!(handle.join().await, RequestOutcome::Superseded);
	directory.release("users:");
	explorer.settle().await;

	assert!(explorer.users().results().is_empty());
	events.pump();
	assert!(!events.is_searching(Domain::Users));
	assert!(events.take_faults().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_search_empties_the_pane() {
	let directory = GatedDirectory::new(sample_directory());
	let (mut explorer, mut events) = connected(&directory, SearchOptions::default());
	let outcome = explorer.retrieve_groups(Some("a")).expect("connected").join().await;
	assert_eq!(outcome, RequestOutcome::Completed { inserted: 2 });

	directory.inner().set_offline(true);
	let outcome = explorer.retrieve_groups(Some("b")).expect("connected").join().await;
	assert_eq!(outcome, RequestOutcome::Failed);
	assert!(explorer.groups().results().is_empty());
	events.pump();
	assert!(!events.is_searching(Domain::Groups));
	assert_eq!(events.take_faults().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn search_after_shutdown_settles_its_flag() {
	let directory = GatedDirectory::new(sample_directory());
	let (mut explorer, mut events) = connected(&directory, SearchOptions::default());
	explorer.shutdown();

	let handle = explorer.retrieve_groups(Some("a")).expect("connected");
	assert_eq!(handle.join().await, RequestOutcome::Superseded);
	explorer.settle().await;

	assert!(explorer.groups().results().is_empty());
	events.pump();
	assert!(!events.is_searching(Domain::Groups));
	assert!(events.take_faults().is_empty());
}
