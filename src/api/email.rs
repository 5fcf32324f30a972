//! Outbound email queue and its delivery worker.
//!
//! Handlers push messages into an [`Outbox`] and move on; they never wait for
//! SMTP. A single background task owns the receiving side and is the only
//! writer to the mail relay, so SMTP authentication state is never shared
//! between connections.
//!
//! ### Delivery Semantics
//!
//! - **Ordering:** messages are attempted in enqueue order (FIFO across all producers).
//! - **Attempts:** exactly one delivery attempt per message. Failures are logged
//!   and dropped; they never reach the request that enqueued the message.
//! - **Shutdown:** [`Dispatcher::shutdown`] closes the queue, attempts every message
//!   already buffered, and only then stops the worker.
//!
//! The default sender when no relay is configured is [`LogEmailSender`], which
//! logs and returns `Ok(())`.
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
    address::Envelope,
    message::Mailbox,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{Tls, TlsParameters},
    },
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{Instrument, error, info, info_span, warn};

/// A fully rendered message: envelope recipients plus the raw RFC 5322 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: Vec<String>,
    pub content: Vec<u8>,
}

/// Email delivery abstraction used by the dispatcher.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message; an error is logged by the dispatcher and the message dropped.
    async fn send(&self, message: &OutboundMessage) -> Result<()>;
}

/// Local dev sender that logs instead of talking to a relay.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        info!(
            to = ?message.to,
            bytes = message.content.len(),
            "email logged instead of sent"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct MailConfig {
    host: String,
    port: u16,
    identity: Option<String>,
    user: String,
    password: SecretString,
    sender: String,
}

impl MailConfig {
    /// Relay settings; the sender address defaults to the relay user.
    #[must_use]
    pub fn new(host: String, port: u16, user: String, password: SecretString) -> Self {
        Self {
            host,
            port,
            identity: None,
            sender: user.clone(),
            user,
            password,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_sender(mut self, sender: Option<String>) -> Self {
        if let Some(sender) = sender {
            self.sender = sender;
        }
        self
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn sender(&self) -> &str {
        &self.sender
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("identity", &self.identity)
            .field("user", &self.user)
            .field("password", &"***")
            .field("sender", &self.sender)
            .finish()
    }
}

/// SMTP relay sender: PLAIN auth, STARTTLS when the relay offers it.
#[derive(Clone)]
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Address,
}

impl SmtpEmailSender {
    /// # Errors
    /// Returns an error if the sender address or TLS parameters are invalid.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let tls = TlsParameters::new(config.host.clone())
            .context("Failed to build TLS parameters for mail host")?;
        let sender: Mailbox = config
            .sender
            .parse()
            .with_context(|| format!("Invalid mail sender address: {}", config.sender))?;

        if let Some(identity) = config.identity.as_deref()
            && identity != config.user
        {
            // PLAIN is sent without an authorization identity; the relay user acts for itself.
            warn!("mail identity {identity} differs from mail user and is not sent to the relay");
        }

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(config.host.as_str())
            .port(config.port)
            .tls(Tls::Opportunistic(tls))
            .credentials(Credentials::new(
                config.user.clone(),
                config.password.expose_secret().to_string(),
            ))
            .authentication(vec![Mechanism::Plain])
            .build();

        Ok(Self {
            transport,
            sender: sender.email,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let recipients = message
            .to
            .iter()
            .map(|address| address.parse::<Address>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid recipient address")?;
        let envelope =
            Envelope::new(Some(self.sender.clone()), recipients).context("invalid envelope")?;

        self.transport
            .send_raw(&envelope, &message.content)
            .await
            .context("SMTP relay rejected the message")?;

        Ok(())
    }
}

/// Producer handle. Cheap to clone; pass one to every component that sends mail.
#[derive(Clone, Debug)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl Outbox {
    /// Queue a message for delivery. Never blocks and never fails the caller.
    pub fn enqueue(&self, message: OutboundMessage) {
        if let Err(err) = self.tx.send(message) {
            warn!(
                recipients = err.0.to.len(),
                "email dispatcher has stopped, dropping message"
            );
        }
    }
}

/// Consumer side of the queue, handed to exactly one [`Dispatcher`].
#[derive(Debug)]
pub struct Inbox {
    rx: mpsc::UnboundedReceiver<OutboundMessage>,
}

#[must_use]
pub fn channel() -> (Outbox, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Outbox { tx }, Inbox { rx })
}

/// Handle to the running delivery task.
///
/// Dropping the handle without calling [`Dispatcher::shutdown`] also closes the
/// queue; buffered messages are still attempted.
#[derive(Debug)]
pub struct Dispatcher {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<usize>,
}

impl Dispatcher {
    /// Close the queue, drain what is buffered, and wait for the worker.
    /// Returns the number of delivery attempts made over the worker's lifetime.
    ///
    /// # Errors
    /// Returns an error if the worker task panicked.
    pub async fn shutdown(self) -> Result<usize> {
        let Self { shutdown, handle } = self;
        // The worker may already be gone if every Outbox was dropped.
        let _ = shutdown.send(());
        handle.await.context("email dispatcher task failed")
    }
}

/// Spawn the single background task that delivers queued messages.
pub fn spawn_dispatcher(inbox: Inbox, sender: Arc<dyn EmailSender>) -> Dispatcher {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let Inbox { mut rx } = inbox;

    let handle = tokio::spawn(async move {
        let mut attempted = 0usize;

        loop {
            tokio::select! {
                biased;

                message = rx.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    deliver(sender.as_ref(), &message).await;
                    attempted += 1;
                }

                _ = &mut shutdown_rx => {
                    rx.close();
                    while let Some(message) = rx.recv().await {
                        deliver(sender.as_ref(), &message).await;
                        attempted += 1;
                    }
                    break;
                }
            }
        }

        info!(attempted, "email dispatcher stopped");
        attempted
    });

    Dispatcher {
        shutdown: shutdown_tx,
        handle,
    }
}

async fn deliver(sender: &dyn EmailSender, message: &OutboundMessage) {
    let span = info_span!("mail.send", recipients = message.to.len());
    if let Err(err) = sender.send(message).instrument(span).await {
        error!("email delivery failed: {err:#}");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{EmailSender, OutboundMessage};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every message it is asked to send.
    #[derive(Default)]
    pub(crate) struct RecordingSender {
        sent: Mutex<Vec<OutboundMessage>>,
    }

    impl RecordingSender {
        pub(crate) fn sent(&self) -> Vec<OutboundMessage> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, message: &OutboundMessage) -> Result<()> {
            self.sent
                .lock()
                .map_err(|_| anyhow!("recording sender poisoned"))?
                .push(message.clone());
            Ok(())
        }
    }

    /// Fails every other message, recording the ones it accepted.
    #[derive(Default)]
    pub(crate) struct FlakySender {
        calls: Mutex<usize>,
        pub(crate) inner: RecordingSender,
    }

    #[async_trait]
    impl EmailSender for FlakySender {
        async fn send(&self, message: &OutboundMessage) -> Result<()> {
            let call = {
                let mut calls = self.calls.lock().map_err(|_| anyhow!("poisoned"))?;
                *calls += 1;
                *calls
            };
            if call % 2 == 1 {
                return Err(anyhow!("relay refused connection"));
            }
            self.inner.send(message).await
        }
    }
}
