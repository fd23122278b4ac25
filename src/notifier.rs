// src/notifier.rs

use std::collections::HashMap;

use actix::prelude::*;
use log::{debug, info};
use serde::Serialize;

use crate::models::EntityKind;

/// Emitted by the data store after every successful save.
#[derive(Message, Debug, Clone, PartialEq, Eq)]
#[rtype(result = "()")]
pub struct CollectionChanged {
    pub kind: EntityKind,
    pub scope: String,
}

/// What a connected client receives.
#[derive(Message, Serialize, Debug, Clone, PartialEq, Eq)]
#[rtype(result = "()")]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotice {
    #[serde(rename = "type")]
    pub event: &'static str,
    pub entity_kind: EntityKind,
}

impl ChangeNotice {
    pub fn new(entity_kind: EntityKind) -> Self {
        ChangeNotice {
            event: "dataStoreUpdated",
            entity_kind,
        }
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub scope: String,
    pub addr: Recipient<ChangeNotice>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub scope: String,
    pub addr: Recipient<ChangeNotice>,
}

/// Number of listeners currently registered for a scope.
#[cfg(test)]
#[derive(Message)]
#[rtype(result = "usize")]
pub struct ListenerCount {
    pub scope: String,
}

/// Fans change events out to every listener registered for the scope.
#[derive(Default)]
pub struct ChangeHub {
    // Several browser tabs may listen on the same scope.
    sessions: HashMap<String, Vec<Recipient<ChangeNotice>>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for ChangeHub {
    type Context = Context<Self>;
}

impl Handler<Connect> for ChangeHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("Listener connected on scope {}", msg.scope);
        self.sessions.entry(msg.scope).or_default().push(msg.addr);
    }
}

impl Handler<Disconnect> for ChangeHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("Listener disconnected from scope {}", msg.scope);
        if let Some(addrs) = self.sessions.get_mut(&msg.scope) {
            addrs.retain(|a| a != &msg.addr);
            if addrs.is_empty() {
                self.sessions.remove(&msg.scope);
            }
        }
    }
}

impl Handler<CollectionChanged> for ChangeHub {
    type Result = ();

    fn handle(&mut self, msg: CollectionChanged, _: &mut Context<Self>) {
        let Some(addrs) = self.sessions.get(&msg.scope) else {
            return;
        };
        debug!(
            "Broadcasting {} change to {} listener(s) on scope {}",
            msg.kind,
            addrs.len(),
            msg.scope
        );
        for addr in addrs {
            addr.do_send(ChangeNotice::new(msg.kind));
        }
    }
}

#[cfg(test)]
impl Handler<ListenerCount> for ChangeHub {
    type Result = usize;

    fn handle(&mut self, msg: ListenerCount, _: &mut Context<Self>) -> usize {
        self.sessions.get(&msg.scope).map_or(0, Vec::len)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Test listener that records everything it is sent.
    pub(crate) struct Recorder<M> {
        pub seen: Arc<Mutex<Vec<M>>>,
    }

    impl<M: Unpin + 'static> Actor for Recorder<M> {
        type Context = Context<Self>;
    }

    impl Handler<ChangeNotice> for Recorder<ChangeNotice> {
        type Result = ();

        fn handle(&mut self, msg: ChangeNotice, _: &mut Context<Self>) {
            self.seen.lock().unwrap().push(msg);
        }
    }

    impl Handler<CollectionChanged> for Recorder<CollectionChanged> {
        type Result = ();

        fn handle(&mut self, msg: CollectionChanged, _: &mut Context<Self>) {
            self.seen.lock().unwrap().push(msg);
        }
    }

    pub(crate) fn recorder<M>() -> (Addr<Recorder<M>>, Arc<Mutex<Vec<M>>>)
    where
        M: Unpin + 'static,
        Recorder<M>: Actor<Context = Context<Recorder<M>>>,
    {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let addr = Recorder { seen: seen.clone() }.start();
        (addr, seen)
    }

    #[actix_web::test]
    async fn broadcasts_only_to_matching_scope() {
        let hub = ChangeHub::new().start();
        let (alice, alice_seen) = recorder::<ChangeNotice>();
        let (bob, bob_seen) = recorder::<ChangeNotice>();

        hub.send(Connect { scope: "alice".into(), addr: alice.clone().recipient() })
            .await
            .unwrap();
        hub.send(Connect { scope: "bob".into(), addr: bob.recipient() })
            .await
            .unwrap();
        hub.send(CollectionChanged { kind: EntityKind::Tasks, scope: "alice".into() })
            .await
            .unwrap();
        // Let the recorder drain its mailbox.
        alice.send(ChangeNotice::new(EntityKind::Members)).await.unwrap();

        let seen = alice_seen.lock().unwrap().clone();
        assert_eq!(seen[0], ChangeNotice::new(EntityKind::Tasks));
        assert!(bob_seen.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn disconnect_drops_listener() {
        let hub = ChangeHub::new().start();
        let (alice, _) = recorder::<ChangeNotice>();
        hub.send(Connect { scope: "alice".into(), addr: alice.clone().recipient() })
            .await
            .unwrap();
        assert_eq!(hub.send(ListenerCount { scope: "alice".into() }).await.unwrap(), 1);
        hub.send(Disconnect { scope: "alice".into(), addr: alice.recipient() })
            .await
            .unwrap();
        assert_eq!(hub.send(ListenerCount { scope: "alice".into() }).await.unwrap(), 0);
    }

    #[test]
    fn notice_serializes_like_browser_event() {
        let json = serde_json::to_string(&ChangeNotice::new(EntityKind::Projects)).unwrap();
        assert_eq!(json, r#"{"type":"dataStoreUpdated","entityKind":"projects"}"#);
    }
}
