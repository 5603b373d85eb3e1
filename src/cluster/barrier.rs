use anyhow::{Context, Result};
use tokio::sync::{Mutex, watch};

/// Epoch-counting barrier hosted on rank 0.
///
/// Local arrivals call [`arrive`](Self::arrive) directly; remote arrivals
/// reach it through the fabric dispatch of a barrier-arrive request. The
/// release is published on a watch channel, so an arrival that subscribes
/// late still observes the epoch advance.
pub struct BarrierCoordinator {
    world: u32,
    arrived: Mutex<u32>,
    epoch: watch::Sender<u64>,
}

impl BarrierCoordinator {
    pub fn new(world: u32) -> Self {
        let (epoch, _) = watch::channel(0);
        Self {
            world,
            arrived: Mutex::new(0),
            epoch,
        }
    }

    /// Blocks until all `world` ranks have arrived at the current epoch.
    pub async fn arrive(&self) -> Result<()> {
        let mut epochs = self.epoch.subscribe();
        let target = {
            let mut arrived = self.arrived.lock().await;
            *arrived += 1;
            let current = *self.epoch.borrow();
            if *arrived == self.world {
                *arrived = 0;
                self.epoch.send_replace(current + 1);
            }
            current + 1
        };
        epochs
            .wait_for(|epoch| *epoch >= target)
            .await
            .context("barrier coordinator shut down")?;
        Ok(())
    }
}
