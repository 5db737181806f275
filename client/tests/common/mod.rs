//! Shared helpers for the integration tests.

use std::sync::{Arc, Mutex};

use cardforce_client::{Config, EmailMessage, MemoryRemote, Notifier, Storefront};
use cardforce_engine::CachedUser;

/// Notifier that records every hand-off for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<EmailMessage>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("notifier lock").clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.subject).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn deliver(&self, message: EmailMessage) {
        self.messages.lock().expect("notifier lock").push(message);
    }
}

/// A storefront over an in-memory remote with zeroed sync delays.
pub fn storefront() -> (Storefront, Arc<MemoryRemote>, Arc<RecordingNotifier>) {
    let remote = Arc::new(MemoryRemote::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let store = Storefront::new(
        Arc::clone(&remote) as Arc<dyn cardforce_client::RemoteStore>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Config::immediate(),
    );
    (store, remote, notifier)
}

/// Sign in a buyer with notifications-worthy details.
pub fn sign_in_buyer(store: &Storefront) -> CachedUser {
    let user = CachedUser::new("u1", "buyer@example.com");
    store.session().sign_in(&user);
    user
}
