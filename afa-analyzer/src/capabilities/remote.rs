//! HTTP clients for remote inference services
//!
//! Each service receives the normalized 16-bit mono WAV as base64 JSON:
//!
//! ```text
//! POST {base}/transcribe  {"sample_rate": 16000, "audio_wav_base64": "..."}
//!   -> {"text": "..."}
//! POST {base}/verify      {"first": {...}, "second": {...}}
//!   -> {"score": 0.83, "same_speaker": true}
//! POST {base}/classify    {"sample_rate": 16000, "audio_wav_base64": "..."}
//!   -> {"label": "fake", "confidence": 0.97}
//! POST {base}/traits      {"sample_rate": 16000, "audio_wav_base64": "..."}
//!   -> {"gender": "female", "age_group": "adult"}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CapabilityError, Classification, SpeakerTraitClassifier, SpeakerVerification,
    SpeakerVerifier, SpeechToText, SyntheticSpeechClassifier, TraitEstimate,
};
use crate::types::AudioAsset;

#[derive(Debug, Serialize)]
struct AudioPayload {
    sample_rate: u32,
    audio_wav_base64: String,
}

impl AudioPayload {
    fn from_asset(asset: &AudioAsset) -> Result<Self, CapabilityError> {
        let wav = asset
            .wav_bytes()
            .map_err(|e| CapabilityError::Rejected(format!("cannot encode audio: {}", e)))?;
        Ok(Self {
            sample_rate: asset.sample_rate(),
            audio_wav_base64: STANDARD.encode(wav),
        })
    }
}

#[derive(Debug, Serialize)]
struct PairPayload {
    first: AudioPayload,
    second: AudioPayload,
}

#[derive(Debug, Deserialize)]
struct TranscribeResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    score: f64,
    same_speaker: bool,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    label: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct TraitsResponse {
    gender: String,
    age_group: String,
}

/// Shared JSON-over-HTTP plumbing
#[derive(Debug, Clone)]
struct Endpoint {
    http_client: Client,
    base_url: String,
}

impl Endpoint {
    fn new(base_url: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Unavailable(format!("HTTP client init failed: {}", e)))?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, CapabilityError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, "Calling inference service");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_status(status, detail));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CapabilityError::InvalidResponse(format!("{}: {}", url, e)))
    }
}

fn classify_status(status: StatusCode, detail: String) -> CapabilityError {
    let message = if detail.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, detail)
    };
    if status.is_client_error() {
        CapabilityError::Rejected(message)
    } else {
        CapabilityError::Unavailable(message)
    }
}

/// Remote speech-to-text service
#[derive(Debug, Clone)]
pub struct RemoteSpeechToText {
    endpoint: Endpoint,
}

impl RemoteSpeechToText {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl SpeechToText for RemoteSpeechToText {
    fn name(&self) -> &'static str {
        "remote-speech-to-text"
    }

    async fn transcribe(&self, audio: &AudioAsset) -> Result<String, CapabilityError> {
        let payload = AudioPayload::from_asset(audio)?;
        let reply: TranscribeResponse = self.endpoint.post("transcribe", &payload).await?;
        Ok(reply.text)
    }
}

/// Remote speaker verification service
#[derive(Debug, Clone)]
pub struct RemoteSpeakerVerifier {
    endpoint: Endpoint,
}

impl RemoteSpeakerVerifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl SpeakerVerifier for RemoteSpeakerVerifier {
    fn name(&self) -> &'static str {
        "remote-speaker-verifier"
    }

    async fn verify(
        &self,
        first: &AudioAsset,
        second: &AudioAsset,
    ) -> Result<SpeakerVerification, CapabilityError> {
        let payload = PairPayload {
            first: AudioPayload::from_asset(first)?,
            second: AudioPayload::from_asset(second)?,
        };
        let reply: VerifyResponse = self.endpoint.post("verify", &payload).await?;
        if !reply.score.is_finite() {
            return Err(CapabilityError::InvalidResponse(format!(
                "non-finite score {}",
                reply.score
            )));
        }
        Ok(SpeakerVerification {
            score: reply.score,
            same_speaker: reply.same_speaker,
        })
    }
}

/// Remote synthetic speech classifier
#[derive(Debug, Clone)]
pub struct RemoteSyntheticClassifier {
    endpoint: Endpoint,
}

impl RemoteSyntheticClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl SyntheticSpeechClassifier for RemoteSyntheticClassifier {
    fn name(&self) -> &'static str {
        "remote-synthetic-classifier"
    }

    async fn classify(&self, audio: &AudioAsset) -> Result<Classification, CapabilityError> {
        let payload = AudioPayload::from_asset(audio)?;
        let reply: ClassifyResponse = self.endpoint.post("classify", &payload).await?;
        if !reply.confidence.is_finite() {
            return Err(CapabilityError::InvalidResponse(format!(
                "non-finite confidence {}",
                reply.confidence
            )));
        }
        Ok(Classification {
            label: reply.label,
            confidence: reply.confidence,
        })
    }
}

/// Remote gender and age group estimator
#[derive(Debug, Clone)]
pub struct RemoteSpeakerTraits {
    endpoint: Endpoint,
}

impl RemoteSpeakerTraits {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        Ok(Self {
            endpoint: Endpoint::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl SpeakerTraitClassifier for RemoteSpeakerTraits {
    fn name(&self) -> &'static str {
        "remote-speaker-traits"
    }

    async fn estimate(&self, audio: &AudioAsset) -> Result<TraitEstimate, CapabilityError> {
        let payload = AudioPayload::from_asset(audio)?;
        let reply: TraitsResponse = self.endpoint.post("traits", &payload).await?;
        debug!(gender = %reply.gender, age_group = %reply.age_group, "Speaker traits estimated");
        Ok(TraitEstimate {
            gender: reply.gender,
            age_group: reply.age_group,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "too short".into()),
            CapabilityError::Rejected(ref m) if m.contains("too short")
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            CapabilityError::Unavailable(_)
        ));
    }

    #[test]
    fn test_payload_carries_wav() {
        let asset = AudioAsset::from_samples(vec![0.0; 160], 16_000).unwrap();
        let payload = AudioPayload::from_asset(&asset).unwrap();
        assert_eq!(payload.sample_rate, 16_000);
        let wav = STANDARD.decode(payload.audio_wav_base64).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let endpoint = Endpoint::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(endpoint.base_url, "http://localhost:8000");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 9 (discard) is not listening in test environments
        let stt = RemoteSpeechToText::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let asset = AudioAsset::from_samples(vec![0.0; 160], 16_000).unwrap();
        let err = stt.transcribe(&asset).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Transport(_)));
    }

    #[test]
    fn test_traits_reply_parses() {
        let reply: TraitsResponse =
            serde_json::from_str(r#"{"gender": "male", "age_group": "senior"}"#).unwrap();
        assert_eq!(reply.gender, "male");
        assert_eq!(reply.age_group, "senior");
    }
}
