//! Traffic classification.
//!
//! Outbound frames are mapped to an 802.1D user priority (UP), which doubles as the TID, and
//! from there to one of the four WMM access categories. If the access point requires admission
//! control for a category, that we haven't been admitted to, the frame is downgraded.
use macro_bits::{bit, check_bit, serializable_enum};

use crate::frame::{FrameKind, TxFrame};

serializable_enum! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    /// A WMM access category.
    ///
    /// The numeric value is the index used by the firmware and in the ACM bitmap. It also
    /// reflects the rank of the category, with background being the lowest.
    pub enum AccessCategory: u8 {
        Background => 0,
        #[default]
        BestEffort => 1,
        Video => 2,
        Voice => 3
    }
}
impl AccessCategory {
    /// The number of access categories.
    pub const COUNT: usize = 4;
    /// All access categories, ordered from lowest to highest rank.
    pub const ALL: [Self; Self::COUNT] =
        [Self::Background, Self::BestEffort, Self::Video, Self::Voice];

    /// The index of this access category.
    pub const fn index(self) -> usize {
        self.into_bits() as usize
    }
    /// Map an 802.1D user priority to the access category.
    pub const fn from_user_priority(up: u8) -> Self {
        match up & 0b111 {
            1 | 2 => Self::Background,
            0 | 3 => Self::BestEffort,
            4 | 5 => Self::Video,
            _ => Self::Voice,
        }
    }
    /// The user priority used, when a frame is moved into this access category.
    pub const fn default_tid(self) -> u8 {
        match self {
            Self::Background => 1,
            Self::Video => 5,
            Self::Voice => 6,
            _ => 0,
        }
    }
    /// The access category one rank below this one, or `None` for background.
    pub const fn lower(self) -> Option<Self> {
        match self {
            Self::Voice => Some(Self::Video),
            Self::Video => Some(Self::BestEffort),
            Self::BestEffort => Some(Self::Background),
            _ => None,
        }
    }
    /// Check if this is one of the latency sensitive categories.
    pub const fn is_vi_or_vo(self) -> bool {
        matches!(self, Self::Video | Self::Voice)
    }
}

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_IPV6: u16 = 0x86dd;
pub const ETHERTYPE_EAPOL: u16 = 0x888e;
pub const ETHERTYPE_WAPI: u16 = 0x88b4;

/// Highest user priority, used for management and authentication frames.
const UP_HIGHEST: u8 = 7;
/// The user priority for everything, we can't classify.
const UP_BEST_EFFORT: u8 = 0;

/// Derive the user priority from the ethertype and the first bytes of the payload.
fn user_priority_for_payload(ethertype: u16, payload: &[u8]) -> u8 {
    match ethertype {
        ETHERTYPE_EAPOL | ETHERTYPE_WAPI => UP_HIGHEST,
        // The precedence bits of the TOS byte.
        ETHERTYPE_IPV4 => match payload.get(1) {
            Some(tos) if payload[0] >> 4 == 4 => tos >> 5,
            _ => UP_BEST_EFFORT,
        },
        // The traffic class straddles the first two bytes. We only need the upper three bits.
        ETHERTYPE_IPV6 => match payload.first() {
            Some(first) if first >> 4 == 6 => (first >> 1) & 0b111,
            _ => UP_BEST_EFFORT,
        },
        // The PCP field of the TCI. The inner ethertype follows, but the tag wins.
        ETHERTYPE_VLAN => match payload.first() {
            Some(tci_high) => tci_high >> 5,
            None => UP_BEST_EFFORT,
        },
        _ => UP_BEST_EFFORT,
    }
}

/// Returns the 802.1D user priority of the frame.
///
/// This is also used as the TID.
pub fn user_priority(frame: &TxFrame) -> u8 {
    if frame.kind() == FrameKind::Management {
        return UP_HIGHEST;
    }
    user_priority_for_payload(frame.ethertype(), frame.head_segment())
}

/// Classify a frame into an access category.
///
/// This doesn't take admission control into account, see [downgrade] for that.
pub fn classify(frame: &TxFrame) -> AccessCategory {
    AccessCategory::from_user_priority(user_priority(frame))
}

/// Step down from `ac`, while the AP requires admission control for the current category.
///
/// Bit `n` of `acm_bitmap` corresponds to the access category with index `n`. Background is
/// never downgraded further, even if admission control is required for it.
pub fn downgrade(ac: AccessCategory, acm_bitmap: u8) -> AccessCategory {
    let mut ac = ac;
    while check_bit!(acm_bitmap, bit!(ac.index())) {
        let Some(lower) = ac.lower() else {
            break;
        };
        trace!("ACM set for AC {}, downgrading.", ac.index());
        ac = lower;
    }
    ac
}
