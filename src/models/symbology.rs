use serde::Serialize;
use std::fmt;

/// Supported 1D symbologies
///
/// Only EAN-13, EAN-8 and UPC-A are checksum-verified on their own. The
/// others are trusted from the engine unless their numeric payload has the
/// length of a checksummed retail code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Symbology {
    /// EAN-13 / GTIN-13
    #[serde(rename = "EAN_13")]
    Ean13,
    /// EAN-8 / GTIN-8
    #[serde(rename = "EAN_8")]
    Ean8,
    /// UPC-A / GTIN-12
    #[serde(rename = "UPC_A")]
    UpcA,
    /// Zero-suppressed UPC-E
    #[serde(rename = "UPC_E")]
    UpcE,
    /// Code 128
    #[serde(rename = "CODE_128")]
    Code128,
    /// Code 39
    #[serde(rename = "CODE_39")]
    Code39,
    /// Interleaved 2 of 5
    #[serde(rename = "ITF")]
    Itf,
}

impl Symbology {
    /// Every supported symbology, in the order engines are told about them
    pub const ALL: [Symbology; 7] = [
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::UpcA,
        Symbology::UpcE,
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Itf,
    ];

    /// Canonical upper-case name, e.g. `EAN_13`
    pub fn as_str(&self) -> &'static str {
        match self {
            Symbology::Ean13 => "EAN_13",
            Symbology::Ean8 => "EAN_8",
            Symbology::UpcA => "UPC_A",
            Symbology::UpcE => "UPC_E",
            Symbology::Code128 => "CODE_128",
            Symbology::Code39 => "CODE_39",
            Symbology::Itf => "ITF",
        }
    }

    /// Whether the symbology carries its own mod-10 check digit rule here
    pub fn has_checksum(&self) -> bool {
        matches!(self, Symbology::Ean13 | Symbology::Ean8 | Symbology::UpcA)
    }

    /// Parse names as engines and tools report them (`EAN-13`, `ean13`, `UPC_A`, ...)
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match key.as_str() {
            "EAN13" | "JAN13" | "GTIN13" => Some(Symbology::Ean13),
            "EAN8" | "GTIN8" => Some(Symbology::Ean8),
            "UPCA" | "GTIN12" => Some(Symbology::UpcA),
            "UPCE" => Some(Symbology::UpcE),
            "CODE128" => Some(Symbology::Code128),
            "CODE39" => Some(Symbology::Code39),
            "ITF" | "ITF14" | "I25" | "INTERLEAVED2OF5" => Some(Symbology::Itf),
            _ => None,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
