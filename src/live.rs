//! Shared transform that can be refitted while readers keep using it

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Result, TransformError};
use crate::factory::TransformFactory;
use crate::gcp::{GeoPoint, GroundControlPoint, PixelPoint};
use crate::polynomial::Order;
use crate::transform::ImageryTransform;

/// Current transform plus a serialized refit path.
///
/// Readers clone an `Arc` under a short read lock, so a refit never blocks
/// evaluation for longer than the pointer swap.
pub struct LiveTransform {
    factory: TransformFactory,
    current: RwLock<Option<Arc<ImageryTransform>>>,
    /// Held for the whole fit so concurrent refits run one at a time
    fit_lock: Mutex<()>,
    /// Bumped under `fit_lock`, readable without it
    revision: AtomicU64,
}

impl LiveTransform {
    pub fn new(factory: TransformFactory) -> Self {
        Self {
            factory,
            current: RwLock::new(None),
            fit_lock: Mutex::new(()),
            revision: AtomicU64::new(0),
        }
    }

    /// Fit from `gcps` and publish the result.
    ///
    /// If no order can be fitted the previous transform stays current and
    /// `Ok(None)` is returned.
    pub fn refit(
        &self,
        gcps: &[GroundControlPoint],
        requested: Order,
    ) -> Result<Option<Arc<ImageryTransform>>> {
        let _guard = self.fit_lock.lock();

        let Some(transform) = self.factory.create_highest_feasible(gcps, requested)? else {
            debug!(
                "Refit produced no transform, keeping revision {}",
                self.revision.load(Ordering::SeqCst)
            );
            return Ok(None);
        };

        let transform = Arc::new(transform);
        *self.current.write() = Some(transform.clone());
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "Published transform revision {} (order {}, rmse {:.3} m)",
            revision,
            transform.order(),
            transform.rmse_meters()
        );
        Ok(Some(transform))
    }

    pub fn snapshot(&self) -> Result<Arc<ImageryTransform>> {
        self.current.read().clone().ok_or(TransformError::NotFitted)
    }

    /// Number of transforms published by [`refit`](Self::refit)
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn pixel_to_geo(&self, x: f64, y: f64) -> Result<GeoPoint> {
        Ok(self.snapshot()?.pixel_to_geo(x, y))
    }

    pub fn geo_to_pixel(&self, lon: f64, lat: f64) -> Result<PixelPoint> {
        Ok(self.snapshot()?.geo_to_pixel(lon, lat))
    }
}
