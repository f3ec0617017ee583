use std::time::Duration;

use tokio::process::Command;
use tokio::signal::unix::SignalKind;

use crate::signal::SignalHandler;

#[tokio::test]
async fn test_signal() {
	let mut handler = SignalHandler::new()
		.with_signal(SignalKind::interrupt())
		.with_signal(SignalKind::terminate());

	let pid = std::process::id();

	for signal in ["SIGINT", "SIGTERM"] {
		Command::new("kill")
			.arg("-s")
			.arg(signal)
			.arg(pid.to_string())
			.status()
			.await
			.expect("failed to send signal");

		tokio::time::timeout(Duration::from_secs(1), handler.recv())
			.await
			.expect("failed to receive signal");
	}
}
