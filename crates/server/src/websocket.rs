//! WebSocket transport
//!
//! One connection per caller. The receive loop ingests audio chunks
//! strictly in order; a forwarder task pushes session events back to the
//! client concurrently, so barge-in signals are never stuck behind an
//! in-flight model call.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use voice_assist_core::LanguagePreference;
use voice_assist_pipeline::{AudioMetadata, SessionEvent, VoiceSession};

use crate::metrics;
use crate::state::AppState;

/// Messages exchanged with the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Client → server: one audio chunk
    AudioChunk { data: AudioChunkData },
    /// Server → client: session id, sent once after connect
    SessionInfo { session_id: String },
    /// Server → client: new transcript text
    Transcription { data: TranscriptionData },
    /// Server → client: synthesized reply
    Voice { data: VoiceData },
    /// Server → client: structured error
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_details: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunkData {
    /// Base64 S16LE PCM; empty string means a silent keepalive chunk
    #[serde(default)]
    pub current_audio_chunk: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Language tag or "auto"
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_language() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionData {
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceData {
    pub llm_processing: LlmProcessing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProcessing {
    pub input_text: String,
    pub llm_response: String,
    pub action: String,
    pub audio_b64: String,
    pub audio_meta: AudioMetadata,
    pub end_conversation: bool,
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4().to_string();

    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(tokio::sync::Mutex::new(sender));

    let session_config = state.get_config().session.clone();
    let collaborators = &state.collaborators;
    let created = state.sessions.get_or_create(&session_id, || {
        let mut session = VoiceSession::new(
            &session_id,
            session_config,
            collaborators.transcriber.clone(),
            collaborators.synthesizer.clone(),
            collaborators.planner.clone(),
            state.pool.clone(),
        );
        if let Some(detector) = &collaborators.detector {
            session = session.with_detector(detector.clone());
        }
        if let Some(denoiser) = &collaborators.denoiser {
            session = session.with_denoiser(denoiser.clone());
        }
        session
    });
    let session = match created {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "rejecting connection");
            send_message(
                &sender,
                &WsMessage::Error {
                    message: "server at capacity".to_string(),
                    error_details: None,
                },
            )
            .await;
            return;
        }
    };

    send_message(
        &sender,
        &WsMessage::SessionInfo {
            session_id: session_id.clone(),
        },
    )
    .await;

    // Forward session events to the client
    let mut events = session.subscribe();
    let sender_for_events = sender.clone();
    let forwarder_id = session_id.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %forwarder_id, skipped, "event receiver lagged");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            let (message, terminal) = match event {
                SessionEvent::Transcript { text, language } => {
                    metrics::record_transcript();
                    (
                        WsMessage::Transcription {
                            data: TranscriptionData {
                                text,
                                language: language.as_str().to_string(),
                            },
                        },
                        false,
                    )
                }
                SessionEvent::Reply {
                    input_text,
                    reply_text,
                    action,
                    audio,
                    end_conversation,
                } => {
                    metrics::record_reply(&action);
                    (
                        WsMessage::Voice {
                            data: VoiceData {
                                llm_processing: LlmProcessing {
                                    input_text,
                                    llm_response: reply_text,
                                    action,
                                    audio_b64: audio.audio_b64,
                                    audio_meta: audio.audio_meta,
                                    end_conversation,
                                },
                            },
                        },
                        end_conversation,
                    )
                }
                SessionEvent::Error { kind, message } => {
                    metrics::record_error(&kind);
                    (
                        WsMessage::Error {
                            message,
                            error_details: Some(kind),
                        },
                        false,
                    )
                }
            };

            send_message(&sender_for_events, &message).await;

            if terminal {
                tracing::info!(session_id = %forwarder_id, "conversation ended, closing");
                let mut s = sender_for_events.lock().await;
                let _ = s.send(Message::Close(None)).await;
                break;
            }
        }
    });

    // Receive loop: chunks are processed strictly in order
    while let Some(received) = receiver.next().await {
        let message = match received {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "socket read error");
                break;
            }
        };

        match message {
            Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::AudioChunk { data }) => {
                    metrics::record_chunk(data.current_audio_chunk.len());
                    let preference = LanguagePreference::parse(&data.language);
                    if let Err(e) = session
                        .process_chunk(&data.current_audio_chunk, data.sample_rate, preference)
                        .await
                    {
                        metrics::record_error("chunk_ingestion");
                        tracing::warn!(session_id = %session_id, error = %e, "chunk rejected");
                        send_message(
                            &sender,
                            &WsMessage::Error {
                                message: "audio chunk could not be processed".to_string(),
                                error_details: Some(e.to_string()),
                            },
                        )
                        .await;
                    }
                }
                Ok(other) => {
                    tracing::debug!(session_id = %session_id, message = ?other, "ignoring non-chunk message");
                }
                Err(e) => {
                    send_message(
                        &sender,
                        &WsMessage::Error {
                            message: "malformed message".to_string(),
                            error_details: Some(e.to_string()),
                        },
                    )
                    .await;
                }
            },
            Message::Close(_) => break,
            // Axum answers pings itself; binary frames are not part of
            // the protocol
            _ => {}
        }
    }

    forwarder.abort();
    state.sessions.remove(&session_id).await;
    tracing::info!(session_id = %session_id, "connection closed");
}

async fn send_message(
    sender: &Arc<tokio::sync::Mutex<futures::stream::SplitSink<WebSocket, Message>>>,
    message: &WsMessage,
) {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize message");
            return;
        }
    };
    let mut s = sender.lock().await;
    if let Err(e) = s.send(Message::Text(text)).await {
        tracing::debug!(error = %e, "failed to send message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_chunk_parses_with_defaults() {
        let raw = r#"{"type":"audio_chunk","data":{"current_audio_chunk":"QUJD"}}"#;
        let message: WsMessage = serde_json::from_str(raw).unwrap();
        match message {
            WsMessage::AudioChunk { data } => {
                assert_eq!(data.current_audio_chunk, "QUJD");
                assert_eq!(data.sample_rate, 16_000);
                assert_eq!(data.language, "auto");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_voice_message_shape() {
        let message = WsMessage::Voice {
            data: VoiceData {
                llm_processing: LlmProcessing {
                    input_text: "hi".to_string(),
                    llm_response: "hello".to_string(),
                    action: "ai_reply".to_string(),
                    audio_b64: "AAAA".to_string(),
                    audio_meta: AudioMetadata::raw_pcm(24_000),
                    end_conversation: false,
                },
            },
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "voice");
        assert_eq!(json["data"]["llm_processing"]["llm_response"], "hello");
        assert_eq!(
            json["data"]["llm_processing"]["audio_meta"]["container"],
            "RAW_PCM"
        );
        assert_eq!(
            json["data"]["llm_processing"]["audio_meta"]["sample_format"],
            "S16LE"
        );
    }

    #[test]
    fn test_error_message_omits_empty_details() {
        let message = WsMessage::Error {
            message: "boom".to_string(),
            error_details: None,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "error");
        assert!(json.get("error_details").is_none());
    }
}
