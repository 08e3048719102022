use std::fmt;

use bytes::Bytes;

/// Addressable content the resolver can look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentAsset {
    /// Page of the rotating Qur'an corpus, 1..=604 (4-digit file key).
    QuranPage(u32),
    /// Page of the Surah al-Baqarah set read after prayers (3-digit file key).
    BaqarahPage(u32),
    MorningAzkar,
    EveningAzkar,
    SurahMulk,
    /// Surah al-Kahf as a PDF document.
    SurahKahf,
}

impl fmt::Display for ContentAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentAsset::QuranPage(n) => write!(f, "quran_page:{n:04}"),
            ContentAsset::BaqarahPage(n) => write!(f, "baqarah_page:{n:03}"),
            ContentAsset::MorningAzkar => f.write_str("morning_azkar"),
            ContentAsset::EveningAzkar => f.write_str("evening_azkar"),
            ContentAsset::SurahMulk => f.write_str("surah_mulk"),
            ContentAsset::SurahKahf => f.write_str("surah_kahf"),
        }
    }
}

/// Raw bytes of a resolved asset plus the file name it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlob {
    pub file_name: String,
    pub data: Bytes,
}

impl ContentBlob {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// One element of an outbound media group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub blob: ContentBlob,
    pub caption: Option<String>,
}
