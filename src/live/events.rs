// Wire protocol for the live conversation endpoint.
//
// The endpoint speaks JSON over a duplex connection: one setup message at
// open, then base64 PCM chunks upstream and a tagged union of server
// events downstream. The serde types here mirror the wire shape; the rest
// of the crate only sees `ServerEvent`.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Typed server events, one per action the session must take.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Endpoint acknowledged the setup message
    SetupComplete,
    /// Transcription fragment of the user's speech
    InputTranscript(String),
    /// Transcription fragment of the model's speech
    OutputTranscript(String),
    /// Base64 PCM audio fragment at 24 kHz
    AudioFragment(String),
    /// The current turn finished; accumulated transcripts are final
    TurnComplete,
    /// The model barged in; all pending playback must be cancelled
    Interrupted,
    /// The connection closed normally from the remote side
    Closed(Option<String>),
    /// The connection failed mid-session with a transport error
    ConnectionLost(String),
}

/// Session-open configuration sent as the first message.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub model: String,
    pub voice: String,
    pub system_instruction: String,
}

impl SessionSetup {
    /// Build the wire setup message: audio-only responses, a fixed voice,
    /// the system instruction, and transcription enabled both ways.
    pub fn to_message(&self) -> SetupMessage {
        SetupMessage {
            setup: Setup {
                model: self.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                    speech_config: SpeechConfig {
                        voice_config: VoiceConfig {
                            prebuilt_voice_config: PrebuiltVoiceConfig {
                                voice_name: self.voice.clone(),
                            },
                        },
                    },
                },
                system_instruction: SystemInstruction {
                    parts: vec![TextPart {
                        text: self.system_instruction.clone(),
                    }],
                },
                input_audio_transcription: EmptyObject {},
                output_audio_transcription: EmptyObject {},
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SetupMessage {
    pub setup: Setup,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: SystemInstruction,
    pub input_audio_transcription: EmptyObject,
    pub output_audio_transcription: EmptyObject,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

#[derive(Debug, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
pub struct TextPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EmptyObject {}

/// One microphone frame on the wire: base64 PCM plus its MIME tag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInputMessage {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

impl RealtimeInputMessage {
    pub fn audio(mime_type: &str, data: String) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: mime_type.to_string(),
                    data,
                }],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    turn_complete: Option<bool>,
    interrupted: Option<bool>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
}

#[derive(Debug, Deserialize)]
struct ModelTurn {
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentPart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct Transcription {
    text: String,
}

/// Parse one inbound JSON message into zero or more server events.
///
/// A single wire message can carry several payloads (a transcription
/// fragment alongside audio, say); events come out in processing order.
pub fn parse_server_message(text: &str) -> Result<Vec<ServerEvent>, SessionError> {
    let message: ServerMessage = serde_json::from_str(text)
        .map_err(|e| SessionError::Decode(format!("malformed server message: {}", e)))?;

    let mut events = Vec::new();

    if message.setup_complete.is_some() {
        events.push(ServerEvent::SetupComplete);
    }

    if let Some(content) = message.server_content {
        if let Some(transcription) = content.input_transcription {
            if !transcription.text.is_empty() {
                events.push(ServerEvent::InputTranscript(transcription.text));
            }
        }
        if let Some(transcription) = content.output_transcription {
            if !transcription.text.is_empty() {
                events.push(ServerEvent::OutputTranscript(transcription.text));
            }
        }
        if content.interrupted == Some(true) {
            events.push(ServerEvent::Interrupted);
        }
        if let Some(turn) = content.model_turn {
            for part in turn.parts {
                if let Some(inline) = part.inline_data {
                    events.push(ServerEvent::AudioFragment(inline.data));
                }
            }
        }
        if content.turn_complete == Some(true) {
            events.push(ServerEvent::TurnComplete);
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_setup_complete() {
        let events = parse_server_message(r#"{"setupComplete":{}}"#).unwrap();
        assert_eq!(events, vec![ServerEvent::SetupComplete]);
    }

    #[test]
    fn test_parse_transcriptions_and_turn() {
        let text = r#"{
            "serverContent": {
                "inputTranscription": {"text": "hello"},
                "outputTranscription": {"text": "hi there"},
                "turnComplete": true
            }
        }"#;
        let events = parse_server_message(text).unwrap();
        assert_eq!(
            events,
            vec![
                ServerEvent::InputTranscript("hello".to_string()),
                ServerEvent::OutputTranscript("hi there".to_string()),
                ServerEvent::TurnComplete,
            ]
        );
    }

    #[test]
    fn test_parse_audio_fragment() {
        let text = r#"{
            "serverContent": {
                "modelTurn": {
                    "parts": [{"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AAA="}}]
                }
            }
        }"#;
        let events = parse_server_message(text).unwrap();
        assert_eq!(events, vec![ServerEvent::AudioFragment("AAA=".to_string())]);
    }

    #[test]
    fn test_parse_interrupted() {
        let text = r#"{"serverContent": {"interrupted": true}}"#;
        let events = parse_server_message(text).unwrap();
        assert_eq!(events, vec![ServerEvent::Interrupted]);
    }

    #[test]
    fn test_malformed_message_is_decode_error() {
        let err = parse_server_message("not json").unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }

    #[test]
    fn test_setup_message_shape() {
        let setup = SessionSetup {
            model: "models/test".to_string(),
            voice: "Orus".to_string(),
            system_instruction: "Be brief.".to_string(),
        };
        let json = serde_json::to_value(setup.to_message()).unwrap();
        assert_eq!(
            json["setup"]["generationConfig"]["responseModalities"][0],
            "AUDIO"
        );
        assert_eq!(
            json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]
                ["prebuiltVoiceConfig"]["voiceName"],
            "Orus"
        );
        assert_eq!(json["setup"]["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert!(json["setup"]["inputAudioTranscription"].is_object());
        assert!(json["setup"]["outputAudioTranscription"].is_object());
    }
}
