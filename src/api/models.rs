//! Wire DTOs for the kiosk backend.
//!
//! Field names are snake_case on the wire. Every response carries `success`
//! and, on failure, an `error` envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structured error body returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

/// `{"success": false, "error": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

fn default_audio_format() -> String {
    "wav".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_voice() -> String {
    "alloy".to_string()
}
fn default_source() -> String {
    "Sanbot".to_string()
}
fn default_message_template() -> String {
    "package_details".to_string()
}
fn default_email_template() -> String {
    "quote".to_string()
}

// --- voice ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTranscribeRequest {
    /// Base64 encoded audio
    pub audio: String,
    #[serde(default = "default_audio_format")]
    pub format: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl VoiceTranscribeRequest {
    #[must_use]
    pub fn new(audio: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
            format: default_audio_format(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTranscribeResponse {
    pub success: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceGenerateSpeechRequest {
    pub text: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_language")]
    pub language: String,
}

impl VoiceGenerateSpeechRequest {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: default_voice(),
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceGenerateSpeechResponse {
    pub success: bool,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConversationRequest {
    pub audio: String,
    #[serde(default = "default_audio_format")]
    pub format: String,
    pub session_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_voice")]
    pub voice: String,
}

impl VoiceConversationRequest {
    #[must_use]
    pub fn new(audio: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            audio: audio.into(),
            format: default_audio_format(),
            session_id: session_id.into(),
            language: default_language(),
            voice: default_voice(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceReply {
    pub text: String,
    pub audio_url: String,
    pub duration_seconds: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConversationResponse {
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub response: Option<VoiceReply>,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

// --- packages ---

/// Filters for the package listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageQuery {
    pub category: Option<String>,
    pub min_price: Option<u32>,
    pub max_price: Option<u32>,
    pub limit: Option<u32>,
}

impl Default for PackageQuery {
    fn default() -> Self {
        Self {
            category: None,
            min_price: None,
            max_price: None,
            limit: Some(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourPackage {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: u32,
    pub currency: String,
    pub duration: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub description: String,
    pub rating: f32,
    pub reviews_count: u32,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryItem {
    pub time: String,
    pub activity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourPackageDetail {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: u32,
    pub currency: String,
    pub duration: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub description: String,
    #[serde(default)]
    pub itinerary: Vec<ItineraryItem>,
    #[serde(default)]
    pub inclusions: Vec<String>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    pub rating: f32,
    pub reviews_count: u32,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageListResponse {
    pub success: bool,
    #[serde(default)]
    pub total_count: Option<u32>,
    #[serde(default)]
    pub packages: Option<Vec<TourPackage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDetailResponse {
    pub success: bool,
    #[serde(default, rename = "package")]
    pub tour_package: Option<TourPackageDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

// --- CRM ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interested_packages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_travelers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_date: Option<String>,
}

impl CreateLeadRequest {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: None,
            source: default_source(),
            location: location.into(),
            interested_packages: None,
            notes: None,
            preferred_contact: None,
            destination: None,
            number_of_travelers: None,
            travel_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLeadResponse {
    pub success: bool,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLeadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interested_packages: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLeadResponse {
    pub success: bool,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteRequest {
    pub note: String,
    #[serde(default = "default_source")]
    pub author: String,
}

impl AddNoteRequest {
    #[must_use]
    pub fn new(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            author: default_source(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNoteResponse {
    pub success: bool,
    #[serde(default)]
    pub note_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

// --- actions ---

/// Body shared by the SMS and WhatsApp actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub phone: String,
    pub package_id: String,
    #[serde(default = "default_message_template")]
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

impl SendMessageRequest {
    #[must_use]
    pub fn new(phone: impl Into<String>, package_id: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            package_id: package_id.into(),
            template: default_message_template(),
            lead_id: None,
        }
    }
}

/// Response shared by the SMS and WhatsApp actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub success: bool,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailRequest {
    pub email: String,
    pub package_ids: Vec<String>,
    #[serde(default = "default_email_template")]
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
    pub customer_name: String,
}

impl SendEmailRequest {
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        package_ids: Vec<String>,
        customer_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            package_ids,
            template: default_email_template(),
            lead_id: None,
            customer_name: customer_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailResponse {
    pub success: bool,
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookNowRequest {
    pub lead_id: String,
    pub package_id: String,
    pub travel_date: String,
    pub number_of_people: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookNowResponse {
    pub success: bool,
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

// --- media & config ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaListResponse {
    pub success: bool,
    #[serde(default)]
    pub media: Option<Vec<MediaItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppFeatures {
    pub voice_enabled: bool,
    pub video_enabled: bool,
    pub whatsapp_enabled: bool,
    pub sms_enabled: bool,
    pub email_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app_version: String,
    pub min_supported_version: String,
    pub welcome_message: String,
    pub idle_timeout_seconds: u32,
    pub default_language: String,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    pub features: AppFeatures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfigResponse {
    pub success: bool,
    #[serde(default)]
    pub config: Option<AppConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// The health endpoint is the one response without a `success` flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}
