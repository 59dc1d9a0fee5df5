//! Speech feature toggles.
//!
//! Each toggle is an independent atomic flag. Writers (the control surface)
//! and readers (router handlers) use relaxed ordering: a flip racing a
//! handler takes effect at most one message late.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Which kind of room event gets announced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechFeature {
    /// Read chat messages aloud.
    Chat,
    /// Thank viewers for gifts.
    Gift,
    /// Thank viewers for following.
    Follow,
    /// Welcome viewers entering the room.
    Welcome,
}

impl SpeechFeature {
    /// All features, in display order.
    pub const ALL: [Self; 4] = [Self::Chat, Self::Gift, Self::Follow, Self::Welcome];

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Gift => "gift",
            Self::Follow => "follow",
            Self::Welcome => "welcome",
        }
    }
}

impl fmt::Display for SpeechFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeechFeature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "gift" => Ok(Self::Gift),
            "follow" => Ok(Self::Follow),
            "welcome" => Ok(Self::Welcome),
            other => Err(format!("unknown speech feature '{other}'")),
        }
    }
}

/// Four independent on/off switches, shared between the control surface
/// and the message router.
#[derive(Debug, Default)]
pub struct SpeechToggles {
    chat: AtomicBool,
    gift: AtomicBool,
    follow: AtomicBool,
    welcome: AtomicBool,
}

impl SpeechToggles {
    /// All toggles off.
    pub fn new() -> Self {
        Self::default()
    }

    fn flag(&self, feature: SpeechFeature) -> &AtomicBool {
        match feature {
            SpeechFeature::Chat => &self.chat,
            SpeechFeature::Gift => &self.gift,
            SpeechFeature::Follow => &self.follow,
            SpeechFeature::Welcome => &self.welcome,
        }
    }

    /// Whether `feature` is currently on.
    pub fn is_enabled(&self, feature: SpeechFeature) -> bool {
        self.flag(feature).load(Ordering::Relaxed)
    }

    /// Switch `feature` on or off.
    pub fn set(&self, feature: SpeechFeature, enabled: bool) {
        self.flag(feature).store(enabled, Ordering::Relaxed);
    }

    /// Flip `feature` and return the new value.
    pub fn toggle(&self, feature: SpeechFeature) -> bool {
        !self.flag(feature).fetch_xor(true, Ordering::Relaxed)
    }

    /// Current value of every toggle, in [`SpeechFeature::ALL`] order.
    pub fn snapshot(&self) -> [(SpeechFeature, bool); 4] {
        SpeechFeature::ALL.map(|f| (f, self.is_enabled(f)))
    }
}
