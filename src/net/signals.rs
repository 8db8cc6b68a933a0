/// Waits for a shutdown signal, after which the server stops accepting
/// connections and finishes the requests in flight
pub async fn listen() {
	match wait().await {
		Ok(signal) => info!("{signal} received. Waiting for graceful shutdown..."),
		Err(e) => error!("Failed to listen to shutdown signals: {e}"),
	}
}

#[cfg(unix)]
async fn wait() -> std::io::Result<&'static str> {
	// Import the OS signals
	use tokio::signal::unix::{SignalKind, signal};
	// Get the operating system signal types
	let mut sighup = signal(SignalKind::hangup())?;
	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigterm = signal(SignalKind::terminate())?;
	// Listen and wait for the system signals
	tokio::select! {
		// Wait for a SIGHUP signal
		_ = sighup.recv() => Ok("SIGHUP"),
		// Wait for a SIGINT signal
		_ = sigint.recv() => Ok("SIGINT"),
		// Wait for a SIGTERM signal
		_ = sigterm.recv() => Ok("SIGTERM"),
	}
}

#[cfg(not(unix))]
async fn wait() -> std::io::Result<&'static str> {
	tokio::signal::ctrl_c().await?;
	Ok("CTRL-C")
}
