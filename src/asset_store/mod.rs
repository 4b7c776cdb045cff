//! AssetStore - Bed/Asset Data Service Adapter
//!
//! ## Responsibilities
//!
//! - Fetch the camera record assigned to a bed
//! - Fetch the saved presets for a bed
//! - Write back operator-saved presets and the computed boundary preset
//!
//! Persistence lives entirely in the external asset service; this adapter
//! only speaks its request/response API.

use crate::boundary::BoundaryRegion;
use crate::error::{Error, Result};
use crate::models::{CameraDevice, Preset, PresetKind};
use std::time::Duration;

/// Asset service adapter
pub struct AssetStore {
    client: reqwest::Client,
    base_url: String,
}

impl AssetStore {
    pub fn new(base_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client, base_url }
    }

    /// Asset service reachability probe
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Camera record assigned to a bed
    pub async fn get_camera(&self, bed_id: &str) -> Result<CameraDevice> {
        let url = format!("{}/api/beds/{}/camera", self.base_url, bed_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Asset service request failed: {}", e)))?;

        if resp.status().as_u16() == 404 {
            return Err(Error::NotFound(format!("No camera assigned to bed {}", bed_id)));
        }
        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "Asset service returned {} for bed {}",
                resp.status(),
                bed_id
            )));
        }

        Ok(resp.json::<CameraDevice>().await?)
    }

    /// All saved presets for a bed (normal and boundary)
    pub async fn list_presets(&self, bed_id: &str) -> Result<Vec<Preset>> {
        let url = format!("{}/api/beds/{}/presets", self.base_url, bed_id);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Asset service request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "Asset service returned {} listing presets for bed {}",
                resp.status(),
                bed_id
            )));
        }

        Ok(resp.json::<Vec<Preset>>().await?)
    }

    /// Save an operator preset
    pub async fn save_preset(&self, preset: &Preset) -> Result<()> {
        let url = format!("{}/api/beds/{}/presets", self.base_url, preset.bed_id);
        let resp = self
            .client
            .post(&url)
            .json(preset)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Asset service request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "Asset service rejected preset '{}': {}",
                preset.name,
                resp.status()
            )));
        }

        tracing::info!(
            bed_id = %preset.bed_id,
            preset = %preset.name,
            "Preset saved"
        );
        Ok(())
    }

    /// Upsert the single boundary preset for a bed.
    /// At most one boundary preset exists per bed; the asset service
    /// replaces any previous one under the same slot.
    pub async fn save_boundary(&self, bed_id: &str, region: &BoundaryRegion) -> Result<()> {
        let preset = Preset {
            name: "boundary".to_string(),
            kind: PresetKind::Boundary,
            bed_id: bed_id.to_string(),
            position: None,
            boundary: Some(*region),
        };

        let url = format!("{}/api/beds/{}/presets/boundary", self.base_url, bed_id);
        let resp = self
            .client
            .put(&url)
            .json(&preset)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Asset service request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "Asset service rejected boundary for bed {}: {}",
                bed_id,
                resp.status()
            )));
        }

        tracing::info!(bed_id = %bed_id, ?region, "Boundary preset saved");
        Ok(())
    }
}
