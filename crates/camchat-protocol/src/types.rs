//! Core protocol types: packet type tags, payloads, and the decoded packet.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, escape};

// ---------------------------------------------------------------------------
// Wire constants
// ---------------------------------------------------------------------------

/// Marker that opens every packet on the wire.
pub const MAGIC: i32 = -2_027_771_214;

/// Protocol version sent in `arg1` of the login command.
pub const LOGIN_VERSION: i32 = 20_071_025;

/// Well-known TCP port of the chat servers.
pub const DEFAULT_PORT: u16 = 8100;

/// Ids at or above this value are room ids; ids below are user ids.
///
/// A user's own room id is their user id plus this offset.
pub const ROOM_ID_OFFSET: i32 = 100_000_000;

/// `arg2` of a `JOINCHAN` command that joins the room.
pub const CHANNEL_JOIN: i32 = 1;

/// `arg2` of a `JOINCHAN` command that leaves the room.
pub const CHANNEL_PART: i32 = 2;

/// Byte length of the fixed packet header (seven 32-bit fields).
pub const HEADER_LEN: usize = 28;

// ---------------------------------------------------------------------------
// PacketType
// ---------------------------------------------------------------------------

macro_rules! packet_types {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)*) => {
        /// The type tag of a packet.
        ///
        /// Known tags get a named variant; anything else decodes to
        /// [`PacketType::Other`] so that new server-side types still route.
        /// Equality and hashing go through [`PacketType::code`], so
        /// `Other(50)` and `Cmesg` are the same key.
        #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
        #[serde(from = "i32", into = "i32")]
        pub enum PacketType {
            $($(#[$doc])* $name,)*
            /// A tag this client has no name for.
            Other(i32),
        }

        impl PacketType {
            /// Returns the wire value of this tag.
            pub fn code(self) -> i32 {
                match self {
                    $(Self::$name => $code,)*
                    Self::Other(code) => code,
                }
            }

            /// Maps a wire value to its tag.
            pub fn from_code(code: i32) -> Self {
                match code {
                    $($code => Self::$name,)*
                    other => Self::Other(other),
                }
            }
        }
    };
}

packet_types! {
    /// No-op; used as the keepalive.
    Null = 0,
    /// Login request (outbound) and login response (inbound).
    Login = 1,
    AddFriend = 2,
    /// Private message between two users.
    Pmesg = 3,
    Status = 4,
    Details = 5,
    TokenInc = 6,
    AddIgnore = 7,
    Privacy = 8,
    AddFriendReq = 9,
    UsernameLookup = 10,
    BroadcastNews = 12,
    Announce = 13,
    ManageList = 14,
    Inbox = 15,
    ReloadSettings = 17,
    HideUsers = 18,
    RuleViolation = 19,
    /// Partial state update for one model; `arg2` is the model id.
    SessionState = 20,
    RequestPvt = 21,
    AcceptPvt = 22,
    RejectPvt = 23,
    EndSession = 24,
    TxProfile = 25,
    StartVoyeur = 26,
    ServerRefresh = 27,
    Setting = 28,
    BwStats = 29,
    Tkx = 30,
    SetTextOpt = 31,
    ServerConfig = 32,
    ModelGroup = 33,
    RequestGrp = 34,
    StatusGrp = 35,
    GroupChat = 36,
    CloseGrp = 37,
    Ucr = 38,
    MyUcr = 39,
    RoomData = 44,
    NewsItem = 45,
    GuestCount = 46,
    PreLoginQ = 47,
    ModelGroupSz = 48,
    RoomHelper = 49,
    /// Chat message in a room.
    Cmesg = 50,
    /// Join or leave a room.
    JoinChan = 51,
    CreateChan = 52,
    InviteChan = 53,
    KickChan = 54,
    QuietChan = 55,
    BanChan = 56,
    PreviewChan = 57,
    Shutdown = 58,
    ListBans = 59,
    Unban = 60,
    SetWelcome = 61,
    ChanOp = 62,
    ListChan = 63,
    /// Tag update: payload maps model id to tag data.
    Tags = 64,
    SetPcode = 65,
    SetMinTip = 66,
    UeOpt = 67,
    HdVideo = 68,
    Metrics = 69,
    OfferCam = 70,
    RequestCam = 71,
    MyWebcam = 72,
    MyCamState = 73,
    PmHistory = 74,
    ChatFlash = 75,
    TruePvt = 76,
    Bookmarks = 77,
    Event = 78,
    StateDump = 79,
    Recommend = 80,
    ExtData = 81,
    Logout = 99,
}

impl PartialEq for PacketType {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for PacketType {}

impl Hash for PacketType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl PacketType {
    /// The named variant for this code, if there is one.
    ///
    /// `Other(50)` compares equal to `Cmesg` but does not match the
    /// `Cmesg` pattern; normalize before matching on variants.
    pub fn canonical(self) -> Self {
        Self::from_code(self.code())
    }
}

impl From<i32> for PacketType {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<PacketType> for i32 {
    fn from(packet_type: PacketType) -> Self {
        packet_type.code()
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(code) => write!(f, "type-{code}"),
            named => write!(f, "{named:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// The body of a packet.
///
/// On decode the text is first tried as a JSON object or array (directly,
/// then after percent-unescaping). Anything else, including bare JSON
/// scalars, is kept as text. A failed structured parse is never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Payload {
    /// Zero-length payload.
    #[default]
    None,
    /// A structured JSON object or array.
    Json(Value),
    /// Opaque text.
    Text(String),
}

impl Payload {
    /// Decodes payload bytes taken straight off the wire.
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.is_empty() {
            return Self::None;
        }
        let text = String::from_utf8_lossy(bytes);

        if let Some(value) = parse_structured(&text) {
            return Self::Json(value);
        }
        if text.contains('%') {
            if let Some(value) = parse_structured(&escape::unescape_text(&text))
            {
                return Self::Json(value);
            }
        }
        Self::Text(text.into_owned())
    }

    /// Builds a text payload, mapping empty text to [`Payload::None`].
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::None
        } else {
            Self::Text(text)
        }
    }

    /// Returns `true` for a zero-length payload.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the structured value, if the payload parsed as one.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the raw text, if the payload stayed textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Renders the payload the way it travels on the wire.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if a structured value cannot be
    /// serialized.
    pub fn to_wire_text(&self) -> Result<Cow<'_, str>, ProtocolError> {
        match self {
            Self::None => Ok(Cow::Borrowed("")),
            Self::Text(text) => Ok(Cow::Borrowed(text)),
            Self::Json(value) => serde_json::to_string(value)
                .map(Cow::Owned)
                .map_err(ProtocolError::Encode),
        }
    }
}

fn parse_structured(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|value| value.is_object() || value.is_array())
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// One decoded protocol unit. Immutable once decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Type tag.
    pub packet_type: PacketType,
    /// Sender id (the session id on outbound packets).
    pub from: i32,
    /// Recipient user or room id.
    pub to: i32,
    /// Type-dependent argument.
    pub arg1: i32,
    /// Type-dependent argument.
    pub arg2: i32,
    /// Optional body.
    pub payload: Payload,
}

impl Packet {
    /// Creates a packet with all numeric fields zeroed and no payload.
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            from: 0,
            to: 0,
            arg1: 0,
            arg2: 0,
            payload: Payload::None,
        }
    }

    /// Extracts the human-readable text of a chat or private message.
    ///
    /// The server sends chat as a JSON object whose `msg` field is
    /// percent-escaped. Returns `None` for other packet types or when the
    /// field is missing.
    pub fn chat_text(&self) -> Option<String> {
        if !matches!(
            self.packet_type.canonical(),
            PacketType::Cmesg | PacketType::Pmesg
        ) {
            return None;
        }
        let msg = self.payload.as_json()?.get("msg")?.as_str()?;
        Some(escape::unescape_text(msg))
    }
}
