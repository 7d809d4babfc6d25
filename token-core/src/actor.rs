//! Actor-based concurrency for the token
//!
//! The contract assumes calls run one at a time. When many tasks talk to one
//! deployment, this module provides that ordering with the single-writer
//! pattern:
//! - One task owns the [`Token`] and processes messages in arrival order
//! - Bounded mailbox gives callers backpressure
//! - Replies travel back over oneshot channels
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │        Callers (RPC handlers, tests, scripts)         │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               TokenHandle (Clone)                     │
//! │         Sends messages to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │               TokenActor (Single Task)                │
//! │   Token::execute / read closures, one at a time      │
//! │                       │                               │
//! │                       ▼                               │
//! │             StateStore::commit()                      │
//! │          (atomic write per call)                      │
//! └───────────────────────────────────────────────────────┘
//! ```

use crate::{
    contract::{Call, CallOutput, Token},
    storage::StateStore,
    types::{AccountId, Balance, CallContext},
    Error, Result,
};
use tokio::sync::{mpsc, oneshot};

/// Read-only access to the token, run on the actor task
pub type ReadFn<S> = Box<dyn FnOnce(&Token<S>) + Send>;

/// Message sent to the token actor
pub enum TokenMessage<S: StateStore> {
    /// Run a mutating call
    Execute {
        ctx: CallContext,
        call: Call,
        response: oneshot::Sender<Result<CallOutput>>,
    },

    /// Run a read
    Read(ReadFn<S>),

    /// Shutdown actor
    Shutdown,
}

/// Actor that owns the token
pub struct TokenActor<S: StateStore> {
    /// The deployment
    token: Token<S>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<TokenMessage<S>>,
}

impl<S: StateStore> TokenActor<S> {
    /// Create new actor
    pub fn new(token: Token<S>, mailbox: mpsc::Receiver<TokenMessage<S>>) -> Self {
        Self { token, mailbox }
    }

    /// Run the actor event loop; returns the token when stopped
    pub async fn run(mut self) -> Token<S> {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                TokenMessage::Execute {
                    ctx,
                    call,
                    response,
                } => {
                    let result = self.token.execute(&ctx, call);
                    let _ = response.send(result);
                }
                TokenMessage::Read(read) => read(&self.token),
                TokenMessage::Shutdown => break,
            }
        }

        tracing::debug!("Token actor stopped");
        self.token
    }
}

/// Handle for sending messages to the actor
pub struct TokenHandle<S: StateStore> {
    sender: mpsc::Sender<TokenMessage<S>>,
}

impl<S: StateStore> Clone for TokenHandle<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<S: StateStore + 'static> TokenHandle<S> {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<TokenMessage<S>>) -> Self {
        Self { sender }
    }

    async fn send(&self, msg: TokenMessage<S>) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }

    /// Run a mutating call
    pub async fn execute(&self, ctx: CallContext, call: Call) -> Result<CallOutput> {
        let (tx, rx) = oneshot::channel();
        self.send(TokenMessage::Execute {
            ctx,
            call,
            response: tx,
        })
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Run a read against the current state
    pub async fn read<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&Token<S>) -> Result<R> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.send(TokenMessage::Read(Box::new(move |token: &Token<S>| {
            let _ = tx.send(f(token));
        })))
        .await?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Balance of `account`
    pub async fn balance_of(&self, account: AccountId) -> Result<Balance> {
        self.read(move |token| token.balance_of(&account)).await
    }

    /// Total supply
    pub async fn total_supply(&self) -> Result<Balance> {
        self.read(|token| token.total_supply()).await
    }

    /// Transfer from the context caller
    pub async fn transfer(&self, ctx: CallContext, to: AccountId, value: Balance) -> Result<()> {
        self.execute(
            ctx,
            Call::Transfer {
                to,
                value,
                data: Vec::new(),
            },
        )
        .await
        .map(|_| ())
    }

    /// Buy with the attached value; returns the amount minted
    pub async fn buy(&self, ctx: CallContext) -> Result<Balance> {
        expect_amount(self.execute(ctx, Call::Buy).await?)
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(TokenMessage::Shutdown).await
    }
}

fn expect_amount(output: CallOutput) -> Result<Balance> {
    match output {
        CallOutput::Amount(amount) => Ok(amount),
        CallOutput::Unit => Err(Error::Concurrency(
            "Unexpected call output: expected an amount".to_string(),
        )),
    }
}

/// Spawn the token actor
///
/// The join handle yields the token back after shutdown.
pub fn spawn_token_actor<S>(
    token: Token<S>,
    mailbox_capacity: usize,
) -> (TokenHandle<S>, tokio::task::JoinHandle<Token<S>>)
where
    S: StateStore + Send + 'static,
{
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = TokenActor::new(token, rx);

    let join = tokio::spawn(actor.run());

    (TokenHandle::new(tx), join)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::TokenInit;
    use crate::storage::MemoryStore;
    use crate::types::FeatureFlags;

    fn create_test_token() -> Token<MemoryStore> {
        let alice = AccountId::from_uri("//Alice");
        Token::deploy(
            MemoryStore::new(),
            &CallContext::new(alice, 0),
            TokenInit::new(1_000, FeatureFlags::all()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let (handle, join) = spawn_token_actor(create_test_token(), 16);

        handle.shutdown().await.unwrap();
        let token = join.await.unwrap();
        assert_eq!(token.total_supply().unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_actor_transfer_and_read() {
        let alice = AccountId::from_uri("//Alice");
        let bob = AccountId::from_uri("//Bob");
        let (handle, _join) = spawn_token_actor(create_test_token(), 16);

        handle
            .transfer(CallContext::new(alice, 1), bob, 100)
            .await
            .unwrap();
        assert_eq!(handle.balance_of(bob).await.unwrap(), 100);
        assert_eq!(handle.balance_of(alice).await.unwrap(), 900);

        let err = handle
            .transfer(CallContext::new(bob, 2), alice, 101)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientBalance));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_buy_returns_minted_amount() {
        let alice = AccountId::from_uri("//Alice");
        let bob = AccountId::from_uri("//Bob");
        let mut token = create_test_token();
        token
            .set_sale_options(&CallContext::new(alice, 0), 2, 10_000, 0, 100)
            .unwrap();
        let (handle, _join) = spawn_token_actor(token, 16);

        let bought = handle
            .buy(CallContext::new(bob, 10).with_value(9))
            .await
            .unwrap();
        assert_eq!(bought, 4);
        assert_eq!(handle.balance_of(bob).await.unwrap(), 4);

        handle.shutdown().await.unwrap();
    }

    #[test]
    fn test_unit_output_is_not_an_amount() {
        assert_eq!(expect_amount(CallOutput::Amount(7)).unwrap(), 7);
        assert!(matches!(
            expect_amount(CallOutput::Unit),
            Err(Error::Concurrency(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_reports_closed_mailbox() {
        let (handle, join) = spawn_token_actor(create_test_token(), 16);
        handle.shutdown().await.unwrap();
        join.await.unwrap();

        let err = handle.total_supply().await.unwrap_err();
        assert!(matches!(err, Error::Concurrency(_)));
    }

    #[tokio::test]
    async fn test_concurrent_transfers_conserve_supply() {
        let alice = AccountId::from_uri("//Alice");
        let (handle, _join) = spawn_token_actor(create_test_token(), 8);

        let mut tasks = Vec::new();
        for i in 0..20u8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                let to = AccountId::new([i + 1; 32]);
                handle.transfer(CallContext::new(alice, 1), to, 10).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(handle.balance_of(alice).await.unwrap(), 800);
        let conserved = handle
            .read(|token| token.check_supply_conservation())
            .await
            .unwrap();
        assert!(conserved);

        handle.shutdown().await.unwrap();
    }
}
