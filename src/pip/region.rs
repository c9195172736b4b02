//! The 47 prefectures used as polygon-caching shards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HazardError;

const PREFECTURE_NAMES: [&str; 47] = [
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県", "茨城県", "栃木県",
    "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県", "新潟県", "富山県", "石川県", "福井県",
    "山梨県", "長野県", "岐阜県", "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府",
    "兵庫県", "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県", "徳島県",
    "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県",
    "鹿児島県", "沖縄県",
];

/// Prefecture code, 1 (Hokkaido) through 47 (Okinawa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RegionCode(u8);

impl RegionCode {
    pub const COUNT: u8 = 47;

    pub fn new(code: u8) -> Option<Self> {
        (1..=Self::COUNT).contains(&code).then_some(Self(code))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        PREFECTURE_NAMES[(self.0 - 1) as usize]
    }

    pub fn all() -> impl Iterator<Item = RegionCode> {
        (1..=Self::COUNT).map(RegionCode)
    }

    /// Find the prefecture named in a postal address.
    pub fn from_address(address: &str) -> Option<Self> {
        Self::all().find(|code| address.contains(code.name()))
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for RegionCode {
    type Err = HazardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(RegionCode::new)
            .ok_or_else(|| HazardError::InvalidInput(format!("bad region code \"{}\"", s)))
    }
}

impl TryFrom<u8> for RegionCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        RegionCode::new(value).ok_or_else(|| format!("region code {} out of range", value))
    }
}

impl From<RegionCode> for u8 {
    fn from(code: RegionCode) -> u8 {
        code.0
    }
}
