//! Design API client: template customization.
//!
//! One customization request is sent per participant. The platform renders
//! the customized designs on its side; exporting them as images is done by
//! the operator, outside this program.

use serde::Serialize;
use tracing::{debug, info, warn};

use certgen_core::Participant;

use crate::error::{ProviderError, ProviderResult};

use super::config::CanvaConfig;

/// JSON body of a customization request.
#[derive(Debug, Serialize)]
struct CustomizeRequest<'a> {
    template_url: &'a str,
    customizations: &'a Participant,
}

/// Result of the customization request for one participant.
#[derive(Debug)]
pub struct CustomizationOutcome {
    /// 1-based position of the participant in the spreadsheet.
    pub index: usize,
    /// The participant the request was made for.
    pub participant: Participant,
    /// `Ok` if the API accepted the request.
    pub result: ProviderResult<()>,
}

impl CustomizationOutcome {
    /// Returns true if the customization succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Counts successful and failed outcomes, as `(succeeded, failed)`.
pub fn summarize(outcomes: &[CustomizationOutcome]) -> (usize, usize) {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    (succeeded, outcomes.len() - succeeded)
}

/// Client for the design platform's REST API.
#[derive(Debug, Clone)]
pub struct DesignClient {
    http_client: reqwest::Client,
    customize_url: String,
}

impl DesignClient {
    /// Creates a new client for the given configuration.
    pub fn new(config: &CanvaConfig) -> ProviderResult<Self> {
        Ok(Self::with_http_client(config, config.http_client()?))
    }

    /// Creates a new client sharing an existing HTTP client.
    pub fn with_http_client(config: &CanvaConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            customize_url: config.customize_url(),
        }
    }

    /// Requests a customized copy of `template_ref` for one participant.
    ///
    /// Only HTTP 200 counts as success.
    ///
    /// # Errors
    ///
    /// - `CustomizationFailed` with the response body for any other status
    /// - `NetworkError` if the request cannot be sent or read
    pub async fn customize_template(
        &self,
        template_ref: &str,
        participant: &Participant,
        access_token: &str,
    ) -> ProviderResult<()> {
        let payload = CustomizeRequest {
            template_url: template_ref,
            customizations: participant,
        };

        let response = self
            .http_client
            .post(&self.customize_url)
            .bearer_auth(access_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::transport("customization request", e))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::transport("reading customization response", e))?;
        Err(ProviderError::customization(body).with_status(status.as_u16()))
    }

    /// Requests a customized template for every participant, in order.
    ///
    /// Requests are sent one after another. A failure is logged and recorded
    /// in its outcome; it never stops the remaining requests, and nothing is
    /// retried.
    pub async fn generate_templates(
        &self,
        participants: &[Participant],
        template_ref: &str,
        access_token: &str,
    ) -> Vec<CustomizationOutcome> {
        let mut outcomes = Vec::with_capacity(participants.len());

        for (index, participant) in participants.iter().enumerate().map(|(i, p)| (i + 1, p)) {
            debug!(index, name = %participant.name, "requesting customization");
            let result = self
                .customize_template(template_ref, participant, access_token)
                .await;

            match &result {
                Ok(()) => info!("template customized for {}", participant.name),
                Err(e) => warn!(
                    "failed to customize template for {}: {}",
                    participant.name,
                    e.message()
                ),
            }

            outcomes.push(CustomizationOutcome {
                index,
                participant: participant.clone(),
                result,
            });
        }

        let (succeeded, failed) = summarize(&outcomes);
        info!(
            succeeded,
            failed, "templates generated, download them manually before renaming"
        );
        outcomes
    }
}
