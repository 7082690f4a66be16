//! Command codes understood by the reader
//!
//! Only the commands a passive listener receives are named here. Anything
//! else decodes to [`Command::Unknown`] and is observed and ignored.

use crate::cards::{self, CardLayout};
use crate::{ACK, NAK};

/// Command code of a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Command {
    /// Transmitted punch record from an SRR station (0xD3)
    RadioPunch,
    /// Reply to "get SI5 data" (0xB1)
    GetSi5Data,
    /// Reply to "get SI6 data" (0xE1)
    GetSi6Data,
    /// Reply to "get SI8/9/10/11/SIAC/pCard data" (0xEF)
    GetSi8Data,
    /// Acknowledge
    Ack,
    /// Negative acknowledge
    Nak,
    /// Anything else
    Unknown(u8),
}

impl Command {
    pub const RADIO_PUNCH: u8 = 0xD3;
    pub const GET_SI5_DATA: u8 = 0xB1;
    pub const GET_SI6_DATA: u8 = 0xE1;
    pub const GET_SI8_DATA: u8 = 0xEF;

    /// Wire code of this command
    pub fn code(&self) -> u8 {
        match self {
            Command::RadioPunch => Self::RADIO_PUNCH,
            Command::GetSi5Data => Self::GET_SI5_DATA,
            Command::GetSi6Data => Self::GET_SI6_DATA,
            Command::GetSi8Data => Self::GET_SI8_DATA,
            Command::Ack => ACK,
            Command::Nak => NAK,
            Command::Unknown(code) => *code,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Command::RadioPunch => "radio punch",
            Command::GetSi5Data => "SI5 data",
            Command::GetSi6Data => "SI6 data",
            Command::GetSi8Data => "SI8/9 data",
            Command::Ack => "ACK",
            Command::Nak => "NAK",
            Command::Unknown(_) => "unknown",
        }
    }

    /// Returns true for commands whose payload carries a punch
    pub fn carries_punch(&self) -> bool {
        matches!(
            self,
            Command::RadioPunch | Command::GetSi5Data | Command::GetSi6Data | Command::GetSi8Data
        )
    }

    /// Card layout for card-data replies
    ///
    /// `series` is the card-series byte, only consulted for 0xEF replies
    /// where SI8/9 and pCard share a command code.
    pub fn card_layout(&self, series: Option<u8>) -> Option<&'static CardLayout> {
        match self {
            Command::GetSi5Data => Some(&cards::SI5),
            Command::GetSi6Data => Some(&cards::SI6),
            Command::GetSi8Data => match series {
                Some(cards::PCARD_SERIES) => Some(&cards::PCARD),
                _ => Some(&cards::SI8),
            },
            _ => None,
        }
    }
}

impl From<u8> for Command {
    fn from(value: u8) -> Self {
        match value {
            Self::RADIO_PUNCH => Command::RadioPunch,
            Self::GET_SI5_DATA => Command::GetSi5Data,
            Self::GET_SI6_DATA => Command::GetSi6Data,
            Self::GET_SI8_DATA => Command::GetSi8Data,
            ACK => Command::Ack,
            NAK => Command::Nak,
            other => Command::Unknown(other),
        }
    }
}
