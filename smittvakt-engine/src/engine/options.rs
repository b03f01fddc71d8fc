//! Scan option flags.

use bitflags::bitflags;

bitflags! {
    /// Options controlling one scan invocation.
    ///
    /// `STANDARD` is an intentional alias: the recommended composite of the
    /// container and format flags rather than a bit of its own.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ScanOptions: u32 {
        /// Disable support for special file formats; match raw bytes only.
        const RAW = 1 << 1;
        /// Transparently scan archive members.
        const ARCHIVE = 1 << 2;
        /// Report encrypted archives as detections.
        const BLOCK_ENCRYPTED = 1 << 3;
        /// Scan mail files.
        const SCAN_MAIL = 1 << 4;
        /// Scan OLE2 containers.
        const OLE2 = 1 << 5;
        /// Scan PDF files.
        const PDF = 1 << 6;
        /// Deep scanning of Portable Executable files.
        const PE = 1 << 7;
        /// Support for ELF executables.
        const ELF = 1 << 8;
        /// Report broken executables and archives as detections.
        const BLOCK_BROKEN = 1 << 9;
        /// HTML normalisation.
        const HTML = 1 << 10;
        /// Algorithmic detection.
        const ALGORITHMIC = 1 << 11;
        /// Always block SSL mismatches in URLs.
        const PHISHING_BLOCK_SSL = 1 << 12;
        /// Always block cloaked URLs.
        const PHISHING_BLOCK_CLOAK = 1 << 13;
        /// Structured data detection (credit card numbers, SSNs).
        const STRUCTURED = 1 << 14;
        /// Search for SSNs formatted xx-yy-zzzz.
        const STRUCTURED_SSN_NORMAL = 1 << 15;
        /// Search for SSNs formatted xxyyzzzz.
        const STRUCTURED_SSN_STRIPPED = 1 << 16;
        /// Scan RFC1341 messages split over many emails.
        const PARTIAL_MESSAGE = 1 << 17;
        /// Allow heuristic matches to take precedence.
        const HEURISTIC_PRECEDENCE = 1 << 18;
        /// Collect every confirmed hit instead of stopping at the first.
        const ALL_MATCHES = 1 << 19;
        /// Recommended composite set.
        const STANDARD = Self::ARCHIVE.bits()
            | Self::SCAN_MAIL.bits()
            | Self::OLE2.bits()
            | Self::PDF.bits()
            | Self::PE.bits()
            | Self::ELF.bits()
            | Self::HTML.bits()
            | Self::ALGORITHMIC.bits();
    }
}
