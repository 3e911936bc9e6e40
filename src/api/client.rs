use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::call::CallEvent;
use super::errors::CallError;
use super::models::{
    AddNoteRequest, AddNoteResponse, AppConfigResponse, BookNowRequest, BookNowResponse,
    CreateLeadRequest, CreateLeadResponse, HealthCheckResponse, MediaListResponse,
    PackageDetailResponse, PackageListResponse, PackageQuery, SendEmailRequest, SendEmailResponse,
    SendMessageRequest, SendMessageResponse, UpdateLeadRequest, UpdateLeadResponse,
    VoiceConversationRequest, VoiceConversationResponse, VoiceGenerateSpeechRequest,
    VoiceGenerateSpeechResponse, VoiceTranscribeRequest, VoiceTranscribeResponse,
};
use super::validation::{
    estimated_audio_bytes, format_phone_number, is_valid_date, is_valid_email, is_valid_name,
    is_valid_phone, new_session_id, MAX_AUDIO_BYTES,
};
use crate::config::Config;
use crate::pipeline::rate_limit::RateLimitTracker;
use crate::pipeline::request::{AttemptOutcome, OutgoingRequest};
use crate::pipeline::transport::TransportError;
use crate::pipeline::RequestPipeline;
use crate::settings::PipelineConfig;

const EVENT_CAPACITY: usize = 64;

pub const DEFAULT_COUNTRY_CODE: &str = "+971";

const LEAD_PHONE_MESSAGE: &str =
    "Invalid phone number format. Use international format (e.g., +971501234567)";
const PHONE_MESSAGE: &str = "Invalid phone number format";
const EMAIL_MESSAGE: &str = "Invalid email format";
const NAME_MESSAGE: &str = "Name must be between 2 and 100 characters";
const DATE_MESSAGE: &str = "Invalid date format. Use YYYY-MM-DD";
const AUDIO_TOO_LARGE_MESSAGE: &str =
    "Audio file is too large (max 5MB). Please record a shorter audio.";

/// Typed facade over the kiosk backend.
///
/// Every operation validates what it can locally, runs through the
/// [`RequestPipeline`] and normalises the result into `Ok(body)` or a
/// [`CallError`]. Progress is reported on the [`CallEvent`] stream returned by
/// [`ApiClient::subscribe`]; a call rejected by local validation emits no
/// events.
#[derive(Debug)]
pub struct ApiClient {
    pipeline: RequestPipeline,
    country_code: String,
    events: broadcast::Sender<CallEvent>,
    next_call: AtomicU64,
    shutdown: CancellationToken,
}

impl ApiClient {
    #[must_use]
    pub fn new(pipeline: RequestPipeline) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            pipeline,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            events,
            next_call: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Build a client over a `reqwest` pipeline from file/env config
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let pipeline = RequestPipeline::from_config(config)?;
        Ok(Self::new(pipeline).with_country_code(&config.api.country_code))
    }

    #[must_use]
    pub fn with_country_code(mut self, country_code: &str) -> Self {
        if !country_code.trim().is_empty() {
            self.country_code = country_code.trim().to_string();
        }
        self
    }

    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Runtime base URL and API key shared with the pipeline stages
    #[must_use]
    pub const fn config(&self) -> &Arc<PipelineConfig> {
        self.pipeline.config()
    }

    /// Last known server quota, for callers that want to pre-check throttling
    #[must_use]
    pub const fn rate_limit(&self) -> &Arc<RateLimitTracker> {
        self.pipeline.rate_limits()
    }

    #[must_use]
    pub const fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// Receive `Started`/`Finished` notifications for every call that reaches
    /// the network
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    /// Abandon every in-flight call, including ones sleeping between retries
    pub fn shutdown(&self) {
        debug!("Cancelling outstanding API calls");
        self.shutdown.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub(crate) const fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Normalise a locally typed phone number with the configured country code
    #[must_use]
    pub fn format_phone(&self, phone: &str) -> String {
        format_phone_number(phone, &self.country_code)
    }

    // --- voice ---

    /// # Errors
    ///
    /// Fails locally on an empty or oversized audio payload, otherwise see
    /// [`CallError`]
    pub async fn transcribe_voice(
        &self,
        request: &VoiceTranscribeRequest,
    ) -> Result<VoiceTranscribeResponse, CallError> {
        check_audio(&request.audio)?;
        let request = OutgoingRequest::post("voice.transcribe").with_json(request);
        self.dispatch("transcribe_voice", request).await
    }

    /// # Errors
    ///
    /// Fails locally on blank text, otherwise see [`CallError`]
    pub async fn generate_speech(
        &self,
        request: &VoiceGenerateSpeechRequest,
    ) -> Result<VoiceGenerateSpeechResponse, CallError> {
        if request.text.trim().is_empty() {
            return Err(CallError::validation("text", "Text must not be empty"));
        }
        let request = OutgoingRequest::post("voice.generateSpeech").with_json(request);
        self.dispatch("generate_speech", request).await
    }

    /// A blank `session_id` is replaced with a fresh one
    ///
    /// # Errors
    ///
    /// Fails locally on an empty or oversized audio payload, otherwise see
    /// [`CallError`]
    pub async fn voice_conversation(
        &self,
        request: &VoiceConversationRequest,
    ) -> Result<VoiceConversationResponse, CallError> {
        check_audio(&request.audio)?;
        let mut request = request.clone();
        if request.session_id.trim().is_empty() {
            request.session_id = new_session_id();
        }
        let request = OutgoingRequest::post("voice.conversation").with_json(&request);
        self.dispatch("voice_conversation", request).await
    }

    // --- packages ---

    /// # Errors
    ///
    /// Fails locally if `min_price` exceeds `max_price`, otherwise see
    /// [`CallError`]
    pub async fn get_packages(
        &self,
        query: &PackageQuery,
    ) -> Result<PackageListResponse, CallError> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(CallError::validation(
                    "min_price",
                    "Minimum price cannot exceed maximum price",
                ));
            }
        }
        let request = OutgoingRequest::get("packages")
            .with_optional_query("category", query.category.as_deref())
            .with_optional_query("min_price", query.min_price)
            .with_optional_query("max_price", query.max_price)
            .with_optional_query("limit", query.limit);
        self.dispatch("get_packages", Ok(request)).await
    }

    /// # Errors
    ///
    /// Fails locally on a blank or malformed id, otherwise see [`CallError`]
    pub async fn get_package_detail(
        &self,
        package_id: &str,
    ) -> Result<PackageDetailResponse, CallError> {
        let package_id = check_id("package_id", package_id)?;
        let request = OutgoingRequest::get(&format!("packages/{package_id}"));
        self.dispatch("get_package_detail", Ok(request)).await
    }

    // --- CRM ---

    /// # Errors
    ///
    /// Fails locally on an invalid name, phone, email or travel date,
    /// otherwise see [`CallError`]
    pub async fn create_lead(
        &self,
        request: &CreateLeadRequest,
    ) -> Result<CreateLeadResponse, CallError> {
        if !is_valid_name(&request.name) {
            return Err(CallError::validation("name", NAME_MESSAGE));
        }
        if !is_valid_phone(&request.phone) {
            return Err(CallError::validation("phone", LEAD_PHONE_MESSAGE));
        }
        if let Some(email) = &request.email {
            if !is_valid_email(email) {
                return Err(CallError::validation("email", EMAIL_MESSAGE));
            }
        }
        if let Some(date) = &request.travel_date {
            if !is_valid_date(date) {
                return Err(CallError::validation("travel_date", DATE_MESSAGE));
            }
        }
        let request = OutgoingRequest::post("crm/leads").with_json(request);
        self.dispatch("create_lead", request).await
    }

    /// # Errors
    ///
    /// Fails locally on a blank or malformed lead id, otherwise see
    /// [`CallError`]
    pub async fn update_lead(
        &self,
        lead_id: &str,
        request: &UpdateLeadRequest,
    ) -> Result<UpdateLeadResponse, CallError> {
        let lead_id = check_id("lead_id", lead_id)?;
        let request = OutgoingRequest::put(&format!("crm/leads/{lead_id}")).with_json(request);
        self.dispatch("update_lead", request).await
    }

    /// # Errors
    ///
    /// Fails locally on a bad lead id or a blank note, otherwise see
    /// [`CallError`]
    pub async fn add_note_to_lead(
        &self,
        lead_id: &str,
        request: &AddNoteRequest,
    ) -> Result<AddNoteResponse, CallError> {
        let lead_id = check_id("lead_id", lead_id)?;
        if request.note.trim().is_empty() {
            return Err(CallError::validation("note", "Note must not be empty"));
        }
        let request =
            OutgoingRequest::post(&format!("crm/leads/{lead_id}/notes")).with_json(request);
        self.dispatch("add_note_to_lead", request).await
    }

    // --- actions ---

    /// # Errors
    ///
    /// Fails locally on an invalid phone number, otherwise see [`CallError`]
    pub async fn send_sms(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, CallError> {
        check_message(request)?;
        let request = OutgoingRequest::post("actions/send-sms").with_json(request);
        self.dispatch("send_sms", request).await
    }

    /// # Errors
    ///
    /// Fails locally on an invalid phone number, otherwise see [`CallError`]
    pub async fn send_whatsapp(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, CallError> {
        check_message(request)?;
        let request = OutgoingRequest::post("actions/send-whatsapp").with_json(request);
        self.dispatch("send_whatsapp", request).await
    }

    /// # Errors
    ///
    /// Fails locally on a missing or invalid address, or when no package is
    /// selected, otherwise see [`CallError`]
    pub async fn send_email(
        &self,
        request: &SendEmailRequest,
    ) -> Result<SendEmailResponse, CallError> {
        if request.email.trim().is_empty() || !is_valid_email(&request.email) {
            return Err(CallError::validation("email", EMAIL_MESSAGE));
        }
        if request.package_ids.is_empty() {
            return Err(CallError::validation(
                "package_ids",
                "At least one package must be selected",
            ));
        }
        let request = OutgoingRequest::post("actions/send-email").with_json(request);
        self.dispatch("send_email", request).await
    }

    /// # Errors
    ///
    /// Fails locally on missing ids, a malformed travel date or fewer than
    /// one traveller, otherwise see [`CallError`]
    pub async fn book_now(&self, request: &BookNowRequest) -> Result<BookNowResponse, CallError> {
        check_id("lead_id", &request.lead_id)?;
        check_id("package_id", &request.package_id)?;
        if request.travel_date.trim().is_empty() || !is_valid_date(&request.travel_date) {
            return Err(CallError::validation("travel_date", DATE_MESSAGE));
        }
        if request.number_of_people == 0 {
            return Err(CallError::validation(
                "number_of_people",
                "At least one person is required",
            ));
        }
        let request = OutgoingRequest::post("actions/book-now").with_json(request);
        self.dispatch("book_now", request).await
    }

    // --- media, config, health ---

    /// # Errors
    ///
    /// See [`CallError`]
    pub async fn get_media(
        &self,
        media_type: Option<&str>,
        category: Option<&str>,
    ) -> Result<MediaListResponse, CallError> {
        let request = OutgoingRequest::get("media")
            .with_optional_query("type", media_type)
            .with_optional_query("category", category);
        self.dispatch("get_media", Ok(request)).await
    }

    /// Remote kiosk configuration (feature flags, welcome text)
    ///
    /// # Errors
    ///
    /// See [`CallError`]
    pub async fn get_config(&self) -> Result<AppConfigResponse, CallError> {
        self.dispatch("get_config", Ok(OutgoingRequest::get("config")))
            .await
    }

    /// # Errors
    ///
    /// See [`CallError`]
    pub async fn health_check(&self) -> Result<HealthCheckResponse, CallError> {
        self.dispatch("health_check", Ok(OutgoingRequest::get("health")))
            .await
    }

    /// Run one validated request through the pipeline and decode the result
    async fn dispatch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: Result<OutgoingRequest, serde_json::Error>,
    ) -> Result<T, CallError> {
        let request = request.map_err(|e| CallError::unknown(e.to_string()))?;
        let id = self.next_call.fetch_add(1, Ordering::Relaxed);

        debug!(id, operation, url = %request.target(), "API call started");
        self.emit(CallEvent::Started { id, operation });

        let outcome = self.pipeline.execute(&request, &self.call_token()).await;
        let result = decode_outcome(outcome);

        match &result {
            Ok(_) => debug!(id, operation, "API call succeeded"),
            Err(error) => debug!(
                id,
                operation,
                code = error.code(),
                error = %error,
                "API call failed"
            ),
        }
        self.emit(CallEvent::Finished {
            id,
            operation,
            outcome: result.as_ref().map(|_| ()).map_err(Clone::clone),
        });
        result
    }

    fn emit(&self, event: CallEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Turn the final attempt into a typed body or a [`CallError`]
///
/// # Errors
///
/// Returns a [`CallError`] for every outcome other than a successful response
/// with a decodable body
pub fn decode_outcome<T: DeserializeOwned>(outcome: AttemptOutcome) -> Result<T, CallError> {
    match outcome {
        AttemptOutcome::Response(response) if response.is_success() => {
            if response.body.trim().is_empty() {
                return Err(CallError::EmptyBody);
            }
            serde_json::from_str(&response.body).map_err(|e| CallError::Decode(e.to_string()))
        }
        AttemptOutcome::Response(response) => Err(CallError::from_status(
            response.status,
            response.status_text(),
            &response.body,
        )),
        AttemptOutcome::TransportFailure(TransportError::Io(cause)) => {
            Err(CallError::Network(cause))
        }
        AttemptOutcome::TransportFailure(TransportError::Cancelled) => Err(CallError::Cancelled),
        AttemptOutcome::TransportFailure(other) => Err(CallError::unknown(other.to_string())),
    }
}

fn check_audio(audio: &str) -> Result<(), CallError> {
    if audio.trim().is_empty() {
        return Err(CallError::validation("audio", "Audio recording is empty"));
    }
    if estimated_audio_bytes(audio.len()) > MAX_AUDIO_BYTES {
        return Err(CallError::validation("audio", AUDIO_TOO_LARGE_MESSAGE));
    }
    Ok(())
}

fn check_message(request: &SendMessageRequest) -> Result<(), CallError> {
    if !is_valid_phone(&request.phone) {
        return Err(CallError::validation("phone", PHONE_MESSAGE));
    }
    check_id("package_id", &request.package_id)?;
    Ok(())
}

/// Ids end up as path segments, so reject anything that would change the path
fn check_id<'a>(field: &'static str, id: &'a str) -> Result<&'a str, CallError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CallError::validation(field, format!("{field} must not be empty")));
    }
    if id.contains(['/', '?', '#', '%']) || id.chars().any(char::is_whitespace) {
        return Err(CallError::validation(field, format!("Invalid {field}")));
    }
    Ok(id)
}
