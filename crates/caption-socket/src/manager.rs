use crate::{Channel, ConnectionError, ConnectionState, Connector, RetryConfig, RetryPolicy, StateChange, StateTransition};
use caption_events::{ClientEvent, ServerEvent};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
	pub retry: RetryConfig,
	/// Decoded server events buffered for the consumer
	pub event_capacity: usize,
	/// State changes buffered per subscriber; the oldest are dropped on overflow
	pub change_capacity: usize,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self {
			retry: RetryConfig::default(),
			event_capacity: 256,
			change_capacity: 32,
		}
	}
}

#[derive(Debug)]
enum Command {
	Connect(oneshot::Sender<()>),
	Send(ClientEvent, oneshot::Sender<Result<(), ConnectionError>>),
	Disconnect(oneshot::Sender<()>),
	Shutdown,
}

/// Handle to the connection actor. Cheap to clone; the actor stops once every handle is
/// dropped or [`ConnectionManager::shutdown`] is called.
#[derive(Clone)]
pub struct ConnectionManager {
	commands: mpsc::Sender<Command>,
	state: watch::Receiver<ConnectionState>,
	changes: async_broadcast::InactiveReceiver<StateChange>,
	max_attempts: u32,
}

impl ConnectionManager {
	/// Spawn the actor in the `closed` state. Decoded server events arrive on the returned
	/// receiver, one per frame, in receipt order.
	pub fn spawn<C: Connector>(connector: C, config: ConnectionConfig) -> (Self, mpsc::Receiver<ServerEvent>) {
		let (command_tx, command_rx) = mpsc::channel(32);
		let (event_tx, event_rx) = mpsc::channel(config.event_capacity.max(1));
		let (state_tx, state_rx) = watch::channel(ConnectionState::Closed);
		let (mut change_tx, change_rx) = async_broadcast::broadcast(config.change_capacity.max(1));
		change_tx.set_overflow(true);
		change_tx.set_await_active(false);

		let max_attempts = config.retry.max_attempts;
		let actor = ConnectionActor {
			connector: Arc::new(connector),
			policy: RetryPolicy::new(config.retry),
			state: ConnectionState::Closed,
			commands: command_rx,
			state_tx,
			changes: change_tx,
			events: event_tx,
		};
		tokio::spawn(actor.run());

		let manager = Self {
			commands: command_tx,
			state: state_rx,
			changes: change_rx.deactivate(),
			max_attempts,
		};
		(manager, event_rx)
	}

	/// Start connecting if the channel is closed, including after reconnects were
	/// exhausted. A no-op while connecting, reconnecting or open.
	pub async fn connect(&self) -> Result<(), ConnectionError> {
		let (tx, rx) = oneshot::channel();
		self.commands.send(Command::Connect(tx)).await.map_err(|_| ConnectionError::ActorUnavailable)?;
		rx.await.map_err(|_| ConnectionError::ActorUnavailable)
	}

	/// Transmit an event. Only succeeds while the channel is open; otherwise the event is
	/// dropped and `NotConnected` returned.
	pub async fn send(&self, event: ClientEvent) -> Result<(), ConnectionError> {
		if !self.state().is_open() {
			debug!(event = %event.kind(), state = %self.state(), "dropping event, channel not open");
			return Err(ConnectionError::NotConnected);
		}

		let (tx, rx) = oneshot::channel();
		self.commands.send(Command::Send(event, tx)).await.map_err(|_| ConnectionError::ActorUnavailable)?;
		rx.await.map_err(|_| ConnectionError::ActorUnavailable)?
	}

	/// Tear down the channel and cancel any pending reconnect
	pub async fn disconnect(&self) -> Result<(), ConnectionError> {
		let (tx, rx) = oneshot::channel();
		self.commands.send(Command::Disconnect(tx)).await.map_err(|_| ConnectionError::ActorUnavailable)?;
		rx.await.map_err(|_| ConnectionError::ActorUnavailable)
	}

	/// Close the channel and stop the actor
	pub async fn shutdown(&self) {
		let _ = self.commands.send(Command::Shutdown).await;
	}

	pub fn state(&self) -> ConnectionState {
		*self.state.borrow()
	}

	pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
		self.state.clone()
	}

	/// Every state change from now on
	pub fn subscribe(&self) -> async_broadcast::Receiver<StateChange> {
		self.changes.activate_cloned()
	}

	pub const fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Resolve once the channel is open. Fails when it closes instead.
	pub async fn wait_until_open(&self) -> Result<(), ConnectionError> {
		let mut changes = self.subscribe();

		match self.state() {
			ConnectionState::Open => return Ok(()),
			ConnectionState::Closed => return Err(ConnectionError::NotConnected),
			ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => {}
		}

		loop {
			match changes.recv().await {
				Ok(change) if change.to.is_open() => return Ok(()),
				Ok(change) if change.is_exhausted() => {
					return Err(ConnectionError::ReconnectExhausted { attempts: self.max_attempts });
				}
				Ok(change) if change.to.is_closed() => return Err(ConnectionError::NotConnected),
				Ok(_) | Err(async_broadcast::RecvError::Overflowed(_)) => {}
				Err(async_broadcast::RecvError::Closed) => return Err(ConnectionError::ActorUnavailable),
			}
		}
	}
}

enum Interrupted<T> {
	Completed(T),
	Disconnected,
	Shutdown,
}

enum OpenStep {
	Frame(Option<Result<String, crate::TransportError>>),
	Command(Option<Command>),
}

struct ConnectionActor<C> {
	connector: Arc<C>,
	policy: RetryPolicy,
	state: ConnectionState,
	commands: mpsc::Receiver<Command>,
	state_tx: watch::Sender<ConnectionState>,
	changes: async_broadcast::Sender<StateChange>,
	events: mpsc::Sender<ServerEvent>,
}

impl<C: Connector> ConnectionActor<C> {
	async fn run(mut self) {
		let mut channel: Option<Box<dyn Channel>> = None;

		loop {
			match self.state {
				ConnectionState::Closed => match self.commands.recv().await {
					Some(Command::Connect(reply)) => {
						self.apply(StateTransition::ConnectRequested);
						let _ = reply.send(());
					}
					Some(Command::Send(_, reply)) => {
						let _ = reply.send(Err(ConnectionError::NotConnected));
					}
					Some(Command::Disconnect(reply)) => {
						let _ = reply.send(());
					}
					Some(Command::Shutdown) | None => break,
				},
				ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => {
					if let ConnectionState::Reconnecting { attempt } = self.state {
						let delay = self.policy.delay_for(attempt);
						warn!(attempt, max_attempts = self.policy.max_attempts(), ?delay, "reconnecting after backoff");

						match self.wait_or_interrupt(tokio::time::sleep(delay)).await {
							Interrupted::Completed(()) => {}
							Interrupted::Disconnected => continue,
							Interrupted::Shutdown => break,
						}
					}

					let connector = Arc::clone(&self.connector);
					match self.wait_or_interrupt(async move { connector.connect().await }).await {
						Interrupted::Completed(Ok(established)) => {
							channel = Some(established);
							self.apply(StateTransition::HandshakeSucceeded);
						}
						Interrupted::Completed(Err(e)) => {
							warn!(error = %e, "handshake failed");
							self.apply(StateTransition::HandshakeFailed);
						}
						Interrupted::Disconnected => continue,
						Interrupted::Shutdown => break,
					}
				}
				ConnectionState::Open => {
					let Some(open) = channel.as_mut() else {
						// open without a channel cannot be kept up
						self.apply(StateTransition::UnexpectedClose);
						continue;
					};

					let step = tokio::select! {
						frame = open.recv_text() => OpenStep::Frame(frame),
						command = self.commands.recv() => OpenStep::Command(command),
					};

					match step {
						OpenStep::Frame(Some(Ok(text))) => self.dispatch(&text).await,
						OpenStep::Frame(Some(Err(e))) => {
							warn!(error = %e, "channel read failed");
							channel = None;
							self.apply(StateTransition::UnexpectedClose);
						}
						OpenStep::Frame(None) => {
							info!("channel closed by remote");
							channel = None;
							self.apply(StateTransition::UnexpectedClose);
						}
						OpenStep::Command(Some(Command::Connect(reply))) => {
							let _ = reply.send(());
						}
						OpenStep::Command(Some(Command::Send(event, reply))) => {
							let result = Self::transmit(open.as_mut(), &event).await;
							if let Err(ConnectionError::Transport(e)) = &result {
								warn!(error = %e, event = %event.kind(), "send failed, treating channel as lost");
								channel = None;
								self.apply(StateTransition::UnexpectedClose);
							}
							let _ = reply.send(result);
						}
						OpenStep::Command(Some(Command::Disconnect(reply))) => {
							if let Err(e) = open.close().await {
								debug!(error = %e, "close handshake failed");
							}
							channel = None;
							self.apply(StateTransition::DisconnectRequested);
							let _ = reply.send(());
						}
						OpenStep::Command(Some(Command::Shutdown) | None) => {
							let _ = open.close().await;
							channel = None;
							self.apply(StateTransition::DisconnectRequested);
							break;
						}
					}
				}
			}
		}

		debug!("connection actor stopped");
	}

	async fn transmit(channel: &mut dyn Channel, event: &ClientEvent) -> Result<(), ConnectionError> {
		let text = event.encode()?;
		channel.send_text(text).await?;
		trace!(event = %event.kind(), "event sent");
		Ok(())
	}

	/// Decode one frame and hand it to the consumer. Malformed frames are logged and dropped.
	async fn dispatch(&self, text: &str) {
		let event = match ServerEvent::decode(text) {
			Ok(ServerEvent::Lifecycle(signal)) => {
				debug!(?signal, "ignoring lifecycle frame from server");
				return;
			}
			Ok(event) => event,
			Err(e) => {
				warn!(error = %e, frame_len = text.len(), "dropping malformed event");
				return;
			}
		};

		trace!(event = %event.kind(), "event received");
		if self.events.send(event).await.is_err() {
			trace!("event receiver dropped");
		}
	}

	/// Await `work` while still serving commands. Disconnect and shutdown abandon `work`.
	async fn wait_or_interrupt<F: Future>(&mut self, work: F) -> Interrupted<F::Output> {
		tokio::pin!(work);

		loop {
			tokio::select! {
				output = &mut work => return Interrupted::Completed(output),
				command = self.commands.recv() => match command {
					Some(Command::Connect(reply)) => {
						let _ = reply.send(());
					}
					Some(Command::Send(_, reply)) => {
						let _ = reply.send(Err(ConnectionError::NotConnected));
					}
					Some(Command::Disconnect(reply)) => {
						self.apply(StateTransition::DisconnectRequested);
						let _ = reply.send(());
						return Interrupted::Disconnected;
					}
					Some(Command::Shutdown) | None => {
						self.apply(StateTransition::DisconnectRequested);
						return Interrupted::Shutdown;
					}
				}
			}
		}
	}

	fn apply(&mut self, trigger: StateTransition) {
		let from = self.state;
		let to = from.transition(trigger, self.policy.max_attempts());
		if from == to {
			return;
		}

		self.state = to;
		let change = StateChange { from, to, trigger };

		if change.is_exhausted() {
			error!(max_attempts = self.policy.max_attempts(), "reconnect attempts exhausted, channel closed");
		} else {
			debug!(%from, %to, ?trigger, "connection state changed");
		}

		self.state_tx.send_replace(to);
		let _ = self.changes.try_broadcast(change);
	}
}
