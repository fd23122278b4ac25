use mongodb::{bson::doc, options::ClientOptions, Client, Collection, Database};

use crate::storage::{KvEntry, StorageError};

pub struct MongoDB {
    pub db: Database,
}

impl MongoDB {
    /// Connects and pings the database so a bad URI fails at startup.
    pub async fn init(uri: &str, db_name: &str) -> Result<Self, StorageError> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }).await?;
        Ok(MongoDB { db })
    }

    pub fn kv_collection(&self) -> Collection<KvEntry> {
        self.db.collection::<KvEntry>("kv_store")
    }
}
