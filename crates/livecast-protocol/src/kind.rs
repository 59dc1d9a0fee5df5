//! Routed message kinds.
//!
//! The method table is closed: [`MessageKind::from_method`] returns `None`
//! for anything not listed here, and callers ignore those messages.

use std::fmt;

use prost::Message as _;

use crate::error::Result;
use crate::proto;

/// Control status that means the broadcast has ended.
pub const STREAM_ENDED_STATUS: i32 = 3;

/// Method tags the router understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Viewer chat.
    Chat,
    /// Gift sent.
    Gift,
    /// Likes.
    Like,
    /// Viewer entered the room.
    Member,
    /// Viewer followed the anchor.
    Social,
    /// Viewer counts.
    RoomUserSeq,
    /// Fan club activity.
    Fansclub,
    /// Stream status.
    Control,
    /// Emoji chat.
    EmojiChat,
    /// Room notice.
    Room,
    /// Room statistics.
    RoomStats,
    /// Rank list.
    RoomRank,
}

impl MessageKind {
    /// Every routed kind.
    pub const ALL: [Self; 12] = [
        Self::Chat,
        Self::Gift,
        Self::Like,
        Self::Member,
        Self::Social,
        Self::RoomUserSeq,
        Self::Fansclub,
        Self::Control,
        Self::EmojiChat,
        Self::Room,
        Self::RoomStats,
        Self::RoomRank,
    ];

    /// Look up a wire method name.
    pub fn from_method(method: &str) -> Option<Self> {
        Some(match method {
            "WebcastChatMessage" => Self::Chat,
            "WebcastGiftMessage" => Self::Gift,
            "WebcastLikeMessage" => Self::Like,
            "WebcastMemberMessage" => Self::Member,
            "WebcastSocialMessage" => Self::Social,
            "WebcastRoomUserSeqMessage" => Self::RoomUserSeq,
            "WebcastFansclubMessage" => Self::Fansclub,
            "WebcastControlMessage" => Self::Control,
            "WebcastEmojiChatMessage" => Self::EmojiChat,
            "WebcastRoomMessage" => Self::Room,
            "WebcastRoomStatsMessage" => Self::RoomStats,
            "WebcastRoomRankMessage" => Self::RoomRank,
            _ => return None,
        })
    }

    /// Wire method name.
    pub fn method(self) -> &'static str {
        match self {
            Self::Chat => "WebcastChatMessage",
            Self::Gift => "WebcastGiftMessage",
            Self::Like => "WebcastLikeMessage",
            Self::Member => "WebcastMemberMessage",
            Self::Social => "WebcastSocialMessage",
            Self::RoomUserSeq => "WebcastRoomUserSeqMessage",
            Self::Fansclub => "WebcastFansclubMessage",
            Self::Control => "WebcastControlMessage",
            Self::EmojiChat => "WebcastEmojiChatMessage",
            Self::Room => "WebcastRoomMessage",
            Self::RoomStats => "WebcastRoomStatsMessage",
            Self::RoomRank => "WebcastRoomRankMessage",
        }
    }

    /// Decode `payload` as this kind's typed message.
    pub fn decode(self, payload: &[u8]) -> Result<LiveEvent> {
        Ok(match self {
            Self::Chat => LiveEvent::Chat(proto::ChatMessage::decode(payload)?),
            Self::Gift => LiveEvent::Gift(proto::GiftMessage::decode(payload)?),
            Self::Like => LiveEvent::Like(proto::LikeMessage::decode(payload)?),
            Self::Member => LiveEvent::Member(proto::MemberMessage::decode(payload)?),
            Self::Social => LiveEvent::Social(proto::SocialMessage::decode(payload)?),
            Self::RoomUserSeq => {
                LiveEvent::RoomUserSeq(proto::RoomUserSeqMessage::decode(payload)?)
            }
            Self::Fansclub => LiveEvent::Fansclub(proto::FansclubMessage::decode(payload)?),
            Self::Control => LiveEvent::Control(proto::ControlMessage::decode(payload)?),
            Self::EmojiChat => LiveEvent::EmojiChat(proto::EmojiChatMessage::decode(payload)?),
            Self::Room => LiveEvent::Room(proto::RoomMessage::decode(payload)?),
            Self::RoomStats => LiveEvent::RoomStats(proto::RoomStatsMessage::decode(payload)?),
            Self::RoomRank => LiveEvent::RoomRank(proto::RoomRankMessage::decode(payload)?),
        })
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

/// A decoded room message.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum LiveEvent {
    Chat(proto::ChatMessage),
    Gift(proto::GiftMessage),
    Like(proto::LikeMessage),
    Member(proto::MemberMessage),
    Social(proto::SocialMessage),
    RoomUserSeq(proto::RoomUserSeqMessage),
    Fansclub(proto::FansclubMessage),
    Control(proto::ControlMessage),
    EmojiChat(proto::EmojiChatMessage),
    Room(proto::RoomMessage),
    RoomStats(proto::RoomStatsMessage),
    RoomRank(proto::RoomRankMessage),
}

impl LiveEvent {
    /// Kind tag of this event.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Chat(_) => MessageKind::Chat,
            Self::Gift(_) => MessageKind::Gift,
            Self::Like(_) => MessageKind::Like,
            Self::Member(_) => MessageKind::Member,
            Self::Social(_) => MessageKind::Social,
            Self::RoomUserSeq(_) => MessageKind::RoomUserSeq,
            Self::Fansclub(_) => MessageKind::Fansclub,
            Self::Control(_) => MessageKind::Control,
            Self::EmojiChat(_) => MessageKind::EmojiChat,
            Self::Room(_) => MessageKind::Room,
            Self::RoomStats(_) => MessageKind::RoomStats,
            Self::RoomRank(_) => MessageKind::RoomRank,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::FrameError;

    #[test]
    fn method_table_is_bijective() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_method(kind.method()), Some(kind));
        }
    }

    #[test]
    fn unknown_methods_are_not_routed() {
        assert_eq!(MessageKind::from_method("WebcastLinkMicMethod"), None);
        assert_eq!(MessageKind::from_method(""), None);
        assert_eq!(MessageKind::from_method("webcastchatmessage"), None);
    }

    #[test]
    fn decode_control_status() {
        let payload = proto::ControlMessage {
            status: STREAM_ENDED_STATUS,
            ..proto::ControlMessage::default()
        }
        .encode_to_vec();
        let event = MessageKind::Control.decode(&payload).unwrap();
        assert_eq!(event.kind(), MessageKind::Control);
        assert_matches!(event, LiveEvent::Control(c) if c.status == 3);
    }

    #[test]
    fn decode_truncated_payload_fails() {
        let payload = proto::ChatMessage {
            content: "hello there".into(),
            ..proto::ChatMessage::default()
        }
        .encode_to_vec();
        let truncated = &payload[..payload.len() - 3];
        assert_matches!(
            MessageKind::Chat.decode(truncated),
            Err(FrameError::MalformedFrame(_))
        );
    }
}
