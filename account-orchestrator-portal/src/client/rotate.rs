//! Credential rotation: login with the old credentials, apply the new ones,
//! verify against a fresh snapshot.

use crate::browser::BrowserPage;
use crate::error::{PortalError, Result};
use crate::types::{RotationOutcome, RotationRequest};

use super::{PortalClient, SETTINGS_PATH};

impl PortalClient {
    /// One rotation attempt on an already-launched page.
    ///
    /// The caller owns retry policy; this performs exactly one settings
    /// update and one verification fetch.
    pub(crate) async fn rotate_on_page(
        &self,
        page: &mut dyn BrowserPage,
        rotation: &RotationRequest,
    ) -> Result<RotationOutcome> {
        page.goto("/").await?;

        let (user_id, _) = self
            .login(page, &rotation.old_username, &rotation.old_password)
            .await?;

        self.action_pause().await;
        self.submit_settings(page, rotation).await?;

        self.action_pause().await;
        // Verification is mandatory here: the settings ack alone is not
        // authoritative. The snapshot's username is what gets reported.
        let snapshot = self.self_info(page).await?;

        if let Some(new_username) = rotation
            .new_username
            .as_deref()
            .filter(|u| !u.is_empty())
        {
            if snapshot.username != new_username {
                return Err(PortalError::ApiError {
                    raw_code: None,
                    raw_message: format!(
                        "settings update accepted but username is still '{}'",
                        snapshot.username
                    ),
                });
            }
        }

        log::info!("rotated credentials for user {user_id}");
        Ok(RotationOutcome { user_id, snapshot })
    }

    async fn submit_settings(
        &self,
        page: &mut dyn BrowserPage,
        rotation: &RotationRequest,
    ) -> Result<()> {
        let mut body = serde_json::Map::new();
        if let Some(username) = rotation.new_username.as_deref().filter(|u| !u.is_empty()) {
            body.insert("username".to_string(), username.into());
        }
        if let Some(password) = rotation.new_password.as_deref().filter(|p| !p.is_empty()) {
            body.insert("password".to_string(), password.into());
        }

        let response = page
            .post_json(SETTINGS_PATH, &serde_json::Value::Object(body))
            .await?;

        let envelope = Self::decode::<serde_json::Value>(&response, "settings-update")?;
        Self::check_code(
            &envelope,
            "settings-update",
            rotation.new_username.as_deref(),
        )
    }
}
