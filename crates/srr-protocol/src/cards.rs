//! Static byte layouts of card-data replies
//!
//! Each card generation stores its card number and punch records at fixed
//! offsets. Offsets below are relative to the start of the frame payload,
//! which begins with the two-byte station code (and, for block-based cards,
//! a block number) ahead of the card memory image.

/// A big-endian unsigned field inside a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: usize,
    pub width: usize,
}

impl Field {
    pub const fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    /// One past the last byte of this field
    pub const fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Read this field from `payload`, `None` if the payload is too short
    pub fn read(&self, payload: &[u8]) -> Option<u32> {
        payload
            .get(self.offset..self.end())
            .map(|bytes| bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }
}

/// Where a card generation keeps the values a punch is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardLayout {
    /// Display name of the card generation
    pub name: &'static str,
    /// Card number field (2, 3 or 4 bytes depending on generation)
    pub card_number: Field,
    /// Card series byte folded into the number as `series * 100000` when > 1
    pub series_multiplier: Option<Field>,
    /// Control code of the punch record
    pub control_code: Field,
    /// 12-hour seconds of the punch record
    pub punch_time: Field,
    /// Day/flags byte of the punch record, bit 0 marks PM
    pub day_flags: Option<Field>,
}

impl CardLayout {
    /// Minimum payload length covering every field of this layout
    pub fn min_len(&self) -> usize {
        [
            Some(self.card_number),
            self.series_multiplier,
            Some(self.control_code),
            Some(self.punch_time),
            self.day_flags,
        ]
        .into_iter()
        .flatten()
        .map(|f| f.end())
        .max()
        .unwrap_or(0)
    }
}

/// Station code preceding the SI5 memory image
const SI5_BASE: usize = 2;
/// Station code and block number preceding SI6/SI8 memory blocks
const BLOCK_BASE: usize = 3;

/// Offset of the card-series byte in 0xEF replies
pub const SI8_SERIES: Field = Field::new(BLOCK_BASE + 0x18, 1);

/// Card-series value identifying a pCard
pub const PCARD_SERIES: u8 = 0x04;

/// SI-Card 5: 2-byte number plus series, first punch slot
pub const SI5: CardLayout = CardLayout {
    name: "SI5",
    card_number: Field::new(SI5_BASE + 0x04, 2),
    series_multiplier: Some(Field::new(SI5_BASE + 0x06, 1)),
    control_code: Field::new(SI5_BASE + 0x21, 1),
    punch_time: Field::new(SI5_BASE + 0x22, 2),
    day_flags: None,
};

/// SI-Card 6: 4-byte number, last punch record of block 0
pub const SI6: CardLayout = CardLayout {
    name: "SI6",
    card_number: Field::new(BLOCK_BASE + 0x0A, 4),
    series_multiplier: None,
    control_code: Field::new(BLOCK_BASE + 0x19, 1),
    punch_time: Field::new(BLOCK_BASE + 0x1A, 2),
    day_flags: Some(Field::new(BLOCK_BASE + 0x18, 1)),
};

/// SI-Card 8/9/10/11 and SIAC: 3-byte number, finish record of block 0
pub const SI8: CardLayout = CardLayout {
    name: "SI8/9",
    card_number: Field::new(BLOCK_BASE + 0x19, 3),
    series_multiplier: None,
    control_code: Field::new(BLOCK_BASE + 0x11, 1),
    punch_time: Field::new(BLOCK_BASE + 0x12, 2),
    day_flags: Some(Field::new(BLOCK_BASE + 0x10, 1)),
};

/// pCard: 3-byte number, first punch record of block 0
pub const PCARD: CardLayout = CardLayout {
    name: "pCard",
    card_number: Field::new(BLOCK_BASE + 0x19, 3),
    series_multiplier: None,
    control_code: Field::new(BLOCK_BASE + 0x2D, 1),
    punch_time: Field::new(BLOCK_BASE + 0x2E, 2),
    day_flags: Some(Field::new(BLOCK_BASE + 0x2C, 1)),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_read() {
        let payload = [0x00, 0x12, 0x34, 0x56];
        assert_eq!(Field::new(1, 3).read(&payload), Some(0x123456));
        assert_eq!(Field::new(2, 1).read(&payload), Some(0x34));
        assert_eq!(Field::new(3, 2).read(&payload), None);
    }

    #[test]
    fn test_min_len() {
        assert_eq!(SI5.min_len(), SI5_BASE + 0x24);
        assert_eq!(SI6.min_len(), BLOCK_BASE + 0x1C);
        assert_eq!(SI8.min_len(), BLOCK_BASE + 0x1C);
        assert_eq!(PCARD.min_len(), BLOCK_BASE + 0x30);
    }
}
