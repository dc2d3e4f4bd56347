/// Sector error flags and quality scores

use std::fmt;

/// Error flags collected while decoding a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorFlags(pub u8);

impl ErrorFlags {
    /// Sector was never seen on the track
    pub const NOT_FOUND: u8 = 0x01;

    /// Illegal code or clock bits while decoding
    pub const ENCODING: u8 = 0x02;

    /// Volume or disk id did not match
    pub const ID: u8 = 0x04;

    /// Track number in the header did not match
    pub const NUMBERING: u8 = 0x08;

    /// Sector size field did not match
    pub const SIZE: u8 = 0x10;

    /// Header or data checksum mismatch
    pub const CHECKSUM: u8 = 0x20;

    /// Create flags from a raw byte
    #[inline]
    pub fn new(value: u8) -> Self {
        ErrorFlags(value)
    }

    /// Check if the not-found flag is set
    #[inline]
    pub fn not_found(&self) -> bool {
        (self.0 & Self::NOT_FOUND) != 0
    }

    /// Check if the encoding flag is set
    #[inline]
    pub fn encoding(&self) -> bool {
        (self.0 & Self::ENCODING) != 0
    }

    /// Check if the id flag is set
    #[inline]
    pub fn id(&self) -> bool {
        (self.0 & Self::ID) != 0
    }

    /// Check if the numbering flag is set
    #[inline]
    pub fn numbering(&self) -> bool {
        (self.0 & Self::NUMBERING) != 0
    }

    /// Check if the size flag is set
    #[inline]
    pub fn size(&self) -> bool {
        (self.0 & Self::SIZE) != 0
    }

    /// Check if the checksum flag is set
    #[inline]
    pub fn checksum(&self) -> bool {
        (self.0 & Self::CHECKSUM) != 0
    }

    /// Two-letter reason code used in bad-sector detail lines
    ///
    /// A single flag maps to its own code, several flags to "mx".
    pub fn reason(&self) -> &'static str {
        match self.0 {
            Self::NOT_FOUND => "nf",
            Self::ENCODING => "en",
            Self::ID => "id",
            Self::NUMBERING => "nu",
            Self::SIZE => "si",
            Self::CHECKSUM => "cs",
            _ => "mx",
        }
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "OK");
        }
        let mut flags = Vec::new();
        if self.not_found() {
            flags.push("NF");
        }
        if self.encoding() {
            flags.push("EN");
        }
        if self.id() {
            flags.push("ID");
        }
        if self.numbering() {
            flags.push("NU");
        }
        if self.size() {
            flags.push("SI");
        }
        if self.checksum() {
            flags.push("CS");
        }
        write!(f, "{}", flags.join("|"))
    }
}

/// Quality of one decoded sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectorQuality {
    /// Error categories seen
    pub flags: ErrorFlags,
    /// Number of errors
    pub errors: u32,
    /// Number of problems downgraded to warnings
    pub warnings: u32,
}

impl SectorQuality {
    /// Quality of a sector slot nothing has been read into yet
    pub fn not_found() -> Self {
        Self {
            flags: ErrorFlags(ErrorFlags::NOT_FOUND),
            errors: u32::MAX,
            warnings: 0,
        }
    }

    /// Quality of a sector slot about to be written
    pub fn for_write() -> Self {
        Self {
            flags: ErrorFlags(ErrorFlags::NOT_FOUND),
            errors: 0,
            warnings: 0,
        }
    }

    /// Add errors under a flag; zero counts leave the flag clear
    pub fn add_error(&mut self, flag: u8, count: u32) {
        if count > 0 {
            self.flags.0 |= flag;
            self.errors = self.errors.saturating_add(count);
        }
    }

    /// Add warnings
    pub fn add_warning(&mut self, count: u32) {
        self.warnings = self.warnings.saturating_add(count);
    }

    /// Count as an error, or as a warning when `ignore` is set
    pub fn add(&mut self, flag: u8, count: u32, ignore: bool) {
        if ignore {
            self.add_warning(count);
        } else {
            self.add_error(flag, count);
        }
    }

    /// Check whether a candidate may replace this stored quality
    ///
    /// Fewer errors wins, equal errors fall back to fewer warnings and a
    /// full tie lets the candidate through.
    pub fn accepts(&self, candidate: &SectorQuality) -> bool {
        !((self.errors == candidate.errors && self.warnings < candidate.warnings)
            || self.errors < candidate.errors)
    }

    /// Good means no errors and no warnings
    pub fn is_good(&self) -> bool {
        self.errors == 0 && self.warnings == 0
    }

    /// Weak means no errors but some warnings
    pub fn is_weak(&self) -> bool {
        self.errors == 0 && self.warnings > 0
    }

    /// Bad means at least one error
    pub fn is_bad(&self) -> bool {
        self.errors > 0
    }
}
