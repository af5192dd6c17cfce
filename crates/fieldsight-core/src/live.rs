//! Self-refreshing table snapshots.
//!
//! A [`LiveTable`] holds the full contents of one log table and refetches all
//! of it whenever the store reports a change to that table. Events are never
//! applied as deltas, and a receiver that lagged behind refetches too.

use std::sync::{Arc, Weak};

use tokio::sync::{RwLock, broadcast, broadcast::error::RecvError};

use crate::{
  record::Record,
  store::{ChangeEvent, RecordStore, Topic},
  table::Table,
};

pub struct LiveTable<S> {
  store: Arc<S>,
  table: Table,
  rows:  RwLock<Arc<Vec<Record>>>,
}

impl<S: RecordStore + 'static> LiveTable<S> {
  /// Fetch `table` and keep it fresh in a background task.
  ///
  /// The subscription is taken before the first fetch so no write can slip
  /// between the two. The background task stops once the returned handle is
  /// dropped.
  pub async fn open(store: Arc<S>, table: Table) -> Result<Arc<Self>, S::Error> {
    let rx = store.subscribe();
    let live = Arc::new(Self {
      store,
      table,
      rows: RwLock::new(Arc::new(Vec::new())),
    });
    live.refresh().await?;
    tokio::spawn(follow(Arc::downgrade(&live), table, rx));
    Ok(live)
  }

  pub fn table(&self) -> Table { self.table }

  /// The current snapshot, newest first.
  pub async fn rows(&self) -> Arc<Vec<Record>> { Arc::clone(&*self.rows.read().await) }

  /// Refetch the whole table.
  pub async fn refresh(&self) -> Result<(), S::Error> {
    let rows = self.store.list(self.table).await?;
    tracing::debug!(table = %self.table, count = rows.len(), "live table refreshed");
    *self.rows.write().await = Arc::new(rows);
    Ok(())
  }
}

async fn follow<S: RecordStore + 'static>(
  live: Weak<LiveTable<S>>,
  table: Table,
  mut rx: broadcast::Receiver<ChangeEvent>,
) {
  loop {
    let stale = match rx.recv().await {
      Ok(event) => event.topic == Topic::Log(table),
      Err(RecvError::Lagged(missed)) => {
        tracing::debug!(%table, missed, "change feed lagged");
        true
      }
      Err(RecvError::Closed) => break,
    };
    if !stale {
      continue;
    }

    let Some(live) = live.upgrade() else { break };
    if let Err(e) = live.refresh().await {
      tracing::warn!(%table, error = %e, "live table refresh failed");
    }
  }
}
